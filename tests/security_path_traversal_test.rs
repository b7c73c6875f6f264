//! Path traversal prevention
//!
//! Entry names come from untrusted metadata; none of them may escape the
//! extraction directory.

use asar_rs::{unpack, ArchiveWriter, AsarError};
use std::fs;
use tempfile::TempDir;

fn raw_archive(json: &str, data: &[u8]) -> Vec<u8> {
    let padded = (json.len() + 3) / 4 * 4;
    let mut bytes = Vec::new();
    for field in [4u32, 8 + padded as u32, 4 + padded as u32, json.len() as u32] {
        bytes.extend_from_slice(&field.to_le_bytes());
    }
    bytes.extend_from_slice(json.as_bytes());
    bytes.resize(16 + padded, 0);
    bytes.extend_from_slice(data);
    bytes
}

fn assert_rejected(name: &str) {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("evil.asar");
    let json = serde_json::json!({
        "files": { name: { "offset": "0", "size": 4 } }
    })
    .to_string();
    fs::write(&archive, raw_archive(&json, b"evil")).unwrap();

    let dest = temp.path().join("a/b/dest");
    match unpack(&archive, &dest) {
        Err(AsarError::Extraction(_)) => {}
        other => panic!("Expected Extraction error for {:?}, got: {:?}", name, other),
    }
    assert!(!temp.path().join("a/b/evil").exists());
    assert!(!temp.path().join("evil").exists());
}

#[test]
fn test_dot_dot_name() {
    assert_rejected("..");
}

#[test]
fn test_name_with_separator() {
    assert_rejected("../../evil");
    assert_rejected("sub/../../evil");
}

#[test]
fn test_absolute_name() {
    assert_rejected("/tmp/evil");
}

#[test]
fn test_backslash_name() {
    assert_rejected("..\\..\\evil");
}

#[test]
fn test_empty_and_dot_names() {
    assert_rejected("");
    assert_rejected(".");
}

#[test]
fn test_nested_dot_dot_directory() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("evil.asar");
    let json = r#"{"files":{"ok":{"files":{"..":{"files":{"..":{"files":{"evil":{"offset":"0","size":4}}}}}}}}}"#;
    fs::write(&archive, raw_archive(json, b"evil")).unwrap();

    let dest = temp.path().join("x/dest");
    assert!(matches!(
        unpack(&archive, &dest),
        Err(AsarError::Extraction(_))
    ));
    assert!(!temp.path().join("x/evil").exists());
}

#[test]
fn test_writer_rejects_traversal() {
    let temp = TempDir::new().unwrap();
    let disk = temp.path().join("data");
    fs::write(&disk, b"data").unwrap();

    let mut writer = ArchiveWriter::new(temp.path().join("out.asar"));
    for path in ["../etc/passwd", "a/../../b", "a/./b", "", "/"] {
        assert!(
            matches!(writer.add_file_from_disk(path, &disk), Err(AsarError::Path(_))),
            "accepted {:?}",
            path
        );
    }
    // Leading separators are stripped, not treated as absolute
    writer.add_file_from_disk("/etc/passwd", &disk).unwrap();
    assert!(writer.root().get("etc/passwd").is_some());
}
