//! Freezing, manifests and declarative triggers

use deferred_loader::module::ModuleManifest;
use deferred_loader::{Loader, LoaderConfig, ModuleDefinition};
use tempfile::TempDir;

use super::test_utils::*;

fn define_from(loader: &Loader, name: &str, deps: &[&str], origin: &str) {
    loader.define_module(
        ModuleDefinition::new(name, deps.iter().copied(), |_, _, _| Ok(())).with_origin(origin),
    );
}

#[test]
fn test_freeze_renders_load_order() {
    let loader = Loader::new();
    define_from(&loader, "page", &["widgets", "core"], "page.js");
    define_from(&loader, "widgets", &["core"], "widgets.js");
    define_from(&loader, "core", &[], "vendor.js");
    loader.run_named("page");

    let frozen = loader.freeze(&[]);
    assert_eq!(
        frozen.render_declarations(),
        concat!(
            "define(\"core\", []); // vendor.js\n",
            "define(\"widgets\", [\"core\"]); // widgets.js\n",
            "define(\"page\", [\"widgets\", \"core\"]); // page.js\n",
        )
    );

    let trimmed = loader.freeze(&["vendor.js".to_string()]);
    let names: Vec<_> = trimmed.modules.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["widgets", "page"]);
}

#[test]
fn test_frozen_manifest_reloads() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("frozen.toml");

    let loader = Loader::new();
    define_from(&loader, "b", &["a"], "b.js");
    define_from(&loader, "a", &[], "a.js");
    loader.run_named("b");
    loader.freeze(&[]).to_file(&path).unwrap();

    let manifest = ModuleManifest::from_file(&path).unwrap();
    assert_eq!(manifest.modules.len(), 2);
    assert_eq!(manifest.modules[0].name, "a");
    assert_eq!(manifest.modules[1].dependencies, vec!["a"]);

    // Replaying the frozen manifest in order needs no resolution work
    let replay = LoaderFixture::new();
    for module in &manifest.modules {
        let deps: Vec<&str> = module.dependencies.iter().map(String::as_str).collect();
        replay.define_counting(&module.name, &deps);
    }
    replay.loader.run_named("b");
    assert_eq!(replay.calls(), vec!["a", "b"]);
}

#[test]
fn test_unloaded_modules_not_frozen() {
    let loader = Loader::new();
    define_from(&loader, "idle", &[], "idle.js");
    assert!(loader.freeze(&[]).modules.is_empty());
}

#[test]
fn test_triggers_run_named_entry_points() {
    let fixture = LoaderFixture::new();
    fixture.define_counting("page.home", &["widgets.menu"]);
    fixture.define_counting("widgets.menu", &[]);

    let names = fixture.loader.run_triggers(
        r#"<body data-hr-run="page.home"><nav data-hr-run="widgets.menu"></nav>
           <div data-hr-run="page.home"></div><aside data-hr-run="later"></aside></body>"#,
    );
    assert_eq!(names, vec!["page.home", "widgets.menu", "page.home", "later"]);
    assert_eq!(fixture.calls(), vec!["widgets.menu", "page.home"]);

    // The trigger for an undefined module waits, labelled by its name
    assert_eq!(
        fixture.loader.debug_dump(),
        "Runner waiting later\n later module not yet loaded.\n"
    );
    fixture.define_counting("later", &[]);
    assert!(fixture.loader.debug().is_settled());
}

#[test]
fn test_config_file_drives_loader() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("loader.toml");
    std::fs::write(
        &path,
        r#"
runner_blockers = ["dom-ready"]

[triggers]
attribute = "data-run"
"#,
    )
    .unwrap();

    let config = LoaderConfig::from_file(&path).unwrap();
    let loader = Loader::with_config(&config).unwrap();
    loader.define("app", Vec::<String>::new(), |_, _, _| Ok(()));
    assert_eq!(
        loader.run_triggers(r#"<main data-run="app" data-hr-run="ignored">"#),
        vec!["app"]
    );
    assert!(!loader.is_loaded("app"));

    assert!(loader.remove_runner_blocker("dom-ready"));
    assert!(loader.is_loaded("app"));
}
