//! Fuzz target for `# METADATA` annotation parsing in rule modules.
//!
//! Goal: The parser should **never panic** on any input.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_annotation_parser
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = tfsentry_policy::fuzz::parse_annotations(data);
});
