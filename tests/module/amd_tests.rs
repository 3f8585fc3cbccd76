//! Foreign declaration adapter tests

use std::cell::Cell;
use std::rc::Rc;

use deferred_loader::module::{AmdFactory, Exports, Require};
use deferred_loader::{AdapterConfig, Loader, LoaderConfig, ModuleError};

fn deps(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn boxed<F>(factory: F) -> AmdFactory
where
    F: FnOnce(&Require, &mut Exports, &[Rc<Exports>]) -> anyhow::Result<()> + 'static,
{
    Box::new(factory)
}

#[test]
fn test_foreign_module_depends_on_native() {
    let loader = Loader::new();
    loader.define("core", Vec::<String>::new(), |exports, _, _| {
        exports.set("greeting", "hello".to_string());
        Ok(())
    });
    loader
        .amd("widgets", |define| {
            define(
                deps(&["require", "exports", "./core"]),
                boxed(|require, exports, injected| {
                    assert!(require.require("core").is_none());
                    let greeting = injected[0].get::<String>("greeting").cloned().unwrap_or_default();
                    exports.set("banner", format!("{}, world", greeting));
                    Ok(())
                }),
            )
        })
        .unwrap();
    assert_eq!(loader.manager().module_state("widgets"), deferred_loader::ModuleState::Pending);

    loader.run_named("widgets");
    let banner = loader.exports("widgets").unwrap();
    assert_eq!(banner.get::<String>("banner").map(String::as_str), Some("hello, world"));
}

#[test]
fn test_foreign_runner() {
    let loader = Loader::new();
    loader.define("config", Vec::<String>::new(), |exports, _, _| {
        exports.set("debug", true);
        Ok(())
    });
    let ran = Rc::new(Cell::new(false));
    let flag = Rc::clone(&ran);
    loader
        .run_amd(move |define| {
            define(
                deps(&["require", "exports", "config"]),
                boxed(move |_, _, injected| {
                    flag.set(injected[0].get::<bool>("debug") == Some(&true));
                    Ok(())
                }),
            )
        })
        .unwrap();
    assert!(ran.get());
}

#[test]
fn test_known_name_skips_discovery() {
    let loader = Loader::new();
    loader.define("dup", Vec::<String>::new(), |_, _, _| Ok(()));

    let discovered = Rc::new(Cell::new(false));
    let flag = Rc::clone(&discovered);
    loader
        .amd("dup", move |_define| {
            flag.set(true);
        })
        .unwrap();
    assert!(!discovered.get());
}

#[test]
fn test_discovery_without_declaration_fails() {
    let loader = Loader::new();
    let result = loader.amd("silent", |_define| {});
    assert!(matches!(result, Err(ModuleError::DiscoveryFailed(_))));
    assert!(!loader.is_known("silent"));
}

#[test]
fn test_last_declaration_wins() {
    let loader = Loader::new();
    loader
        .amd("twice", |define| {
            define(
                deps(&["require", "exports"]),
                boxed(|_, exports, _| {
                    exports.set("value", 1u32);
                    Ok(())
                }),
            );
            define(
                deps(&["require", "exports"]),
                boxed(|_, exports, _| {
                    exports.set("value", 2u32);
                    Ok(())
                }),
            );
        })
        .unwrap();
    loader.run_named("twice");
    assert_eq!(loader.exports("twice").unwrap().get::<u32>("value"), Some(&2));
}

#[test]
fn test_configured_adapter() {
    let config = LoaderConfig {
        adapter: AdapterConfig {
            reserved_dependencies: 0,
            relative_prefix: "lib/".to_string(),
        },
        ..LoaderConfig::default()
    };
    let loader = Loader::with_config(&config).unwrap();
    loader
        .amd("app", |define| {
            define(deps(&["lib/base", "./kept"]), boxed(|_, _, _| Ok(())))
        })
        .unwrap();

    let report = loader.manager().report();
    assert!(report.is_settled());
    loader.run_named("app");
    let report = loader.debug();
    let names: Vec<_> = report.waiting[0]
        .unresolved[0]
        .waiting_on
        .iter()
        .map(|dep| dep.name.as_str())
        .collect();
    assert_eq!(names, vec!["base", "./kept"]);
}
