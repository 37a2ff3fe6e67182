#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Arbitrary text must either fail to parse or validate without panicking.
    if let Ok(cfg) = stainer_config::load_toml(data) {
        let _ = cfg.validate();
    }
});
