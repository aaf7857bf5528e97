// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fuzz FaultlineConfig TOML parsing and validation.
//!
//! Verifies:
//! 1. `parse_toml` never panics on arbitrary input.
//! 2. Successfully parsed configs can be validated without panics.
//! 3. Round-trip: serialize back to TOML and re-parse produces the same config.
#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    // --- Property 1: parse_toml never panics ---
    let Ok(config) = faultline_config::parse_toml(s) else {
        return;
    };

    // --- Property 2: validate_config never panics ---
    match faultline_config::validate_config(&config) {
        Ok(warnings) => {
            for w in &warnings {
                let _ = format!("{w}");
            }
        }
        Err(e) => {
            let _ = format!("{e}");
        }
    }

    // --- Property 3: round-trip through TOML serialization ---
    if let Ok(toml_str) = toml::to_string(&config) {
        if let Ok(rt) = faultline_config::parse_toml(&toml_str) {
            assert_eq!(config, rt, "TOML round-trip must be lossless");
        }
    }
});
