//! Fuzz target for JSON-variant (`.tf.json`) document building.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_json_builder
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = tfsentry_document::fuzz::build_json(data);
});
