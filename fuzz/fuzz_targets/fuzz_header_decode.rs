#![no_main]

use asar_rs::{archive, ArchiveReader};
use libfuzzer_sys::fuzz_target;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

fuzz_target!(|data: &[u8]| {
    // In-memory decode - should never panic
    let _ = archive::decode(data);

    let mut temp_file = match NamedTempFile::new() {
        Ok(f) => f,
        Err(_) => return,
    };
    if temp_file.write_all(data).is_err() || temp_file.flush().is_err() {
        return;
    }

    let reader = match ArchiveReader::open(temp_file.path()) {
        Ok(r) => r,
        Err(_) => return, // Expected for invalid data
    };

    // Every listed path should be readable or fail cleanly
    for path in reader.list_files() {
        let _ = reader.read_file(&path);
    }

    let _ = reader.contains("../../../etc/passwd");

    // Extraction must stay inside the scratch directory
    if let Ok(dest) = TempDir::new() {
        let _ = reader.extract_all(dest.path());
    }
});
