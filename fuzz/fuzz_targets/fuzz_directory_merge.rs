//! Fuzz target for building and merging several files as one directory document.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_directory_merge
//! ```

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

/// Structured input: the contents of each file in a directory, in file order.
#[derive(Arbitrary, Debug)]
struct DirectoryInput {
    files: Vec<String>,
}

fuzz_target!(|input: DirectoryInput| {
    if input.files.len() > 16 {
        return;
    }

    let sources: Vec<&[u8]> = input
        .files
        .iter()
        .filter(|f| f.len() <= 4096)
        .map(|f| f.as_bytes())
        .collect();

    let merged = tfsentry_document::fuzz::build_and_merge(&sources);
    assert!(merged <= sources.len());
});
