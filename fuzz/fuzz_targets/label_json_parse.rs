//! Fuzz target for label JSON parsing.
//!
//! Run with:
//!   cargo +nightly fuzz run label_json_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use rslabel::label::io_label_json::{from_label_slice, to_label_string};

fuzz_target!(|data: &[u8]| {
    // 10MB is generous for one label file.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    // Anything that parses must serialize again.
    if let Ok(label) = from_label_slice(data) {
        let _ = to_label_string(&label);
    }
});
