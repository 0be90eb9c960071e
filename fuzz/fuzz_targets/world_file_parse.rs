//! Fuzz target for world file parsing.
//!
//! Run with:
//!   cargo +nightly fuzz run world_file_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use rslabel::raster::parse_world_file;

fuzz_target!(|data: &[u8]| {
    if data.len() > 64 * 1024 {
        return;
    }
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let _ = parse_world_file(text);
});
