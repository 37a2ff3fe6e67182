#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(sc) = stainer_config::load_scenario_toml(data) {
        let _ = sc.validate();
    }
});
