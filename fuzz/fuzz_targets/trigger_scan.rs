#![no_main]
use deferred_loader::module::TriggerScanner;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(markup) = std::str::from_utf8(data) else {
        return;
    };

    let scanner = TriggerScanner::default();
    for name in scanner.scan(markup) {
        // Values are trimmed and never empty
        assert!(!name.is_empty());
        assert_eq!(name.trim(), name);
    }
});
