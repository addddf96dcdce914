//! Fuzz target: settings document parsing
//!
//! Any byte string either fails to parse or yields settings that pass
//! validation after a successful round trip.
//!
//! cargo fuzz run fuzz_settings_json

#![no_main]

use brewctl::config::Settings;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(settings) = serde_json::from_slice::<Settings>(data) else {
        return;
    };
    if settings.validate().is_err() {
        return;
    }
    let bytes = serde_json::to_vec(&settings).expect("valid settings serialise");
    let again: Settings = serde_json::from_slice(&bytes).expect("own output parses");
    assert_eq!(again, settings);
});
