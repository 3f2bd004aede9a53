#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse errors are fine; neither parsing nor validation may panic.
    if let Ok(cfg) = nezha_config::load_toml(data) {
        let _ = cfg.validate();
    }
});
