#![no_main]
use deferred_loader::module::ModuleManifest;
use deferred_loader::{Loader, ModuleDefinition};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(manifest) = ModuleManifest::from_toml_str(text) else {
        return;
    };

    // Arbitrary graphs (cycles, unknown names) must stall, never panic
    let loader = Loader::new();
    for module in &manifest.modules {
        loader.define_module(ModuleDefinition::new(
            module.name.as_str(),
            module.dependencies.iter().cloned(),
            |_, _, _| Ok(()),
        ));
    }
    for runner in &manifest.runners {
        loader.run(runner.dependencies.iter().cloned(), |_, _, _| Ok(()));
    }
    let _ = loader.debug_dump();
    let _ = manifest.render_declarations();
});
