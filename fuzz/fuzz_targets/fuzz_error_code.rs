// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fuzz ErrorCode parsing and ErrorRecord construction.
//!
//! Verifies:
//! 1. Parsing arbitrary strings as ErrorCode never panics.
//! 2. A parsed code's string form parses back to the same code.
//! 3. Records built from any code carry a 4xx/5xx status.
#![no_main]
use faultline_taxonomy::{ErrorCode, ErrorRecord};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    // --- Property 1 & 2 ---
    if let Ok(code) = s.parse::<ErrorCode>() {
        assert_eq!(code.as_str().parse::<ErrorCode>().ok(), Some(code));
        assert_eq!(code.to_string(), code.as_str());
    }

    // --- Property 3 ---
    let idx = data.first().copied().unwrap_or(0) as usize % ErrorCode::ALL.len();
    let code = ErrorCode::ALL[idx];
    let record = ErrorRecord::new(code, s).with_detail("fuzz", s);
    assert!((400..=599).contains(&record.status()));
    assert_eq!(record.kind(), code.kind());
});
