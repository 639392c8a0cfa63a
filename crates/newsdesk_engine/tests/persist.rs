use std::fs;

use newsdesk_engine::{ensure_state_dir, AtomicFileWriter};
use tempfile::TempDir;

#[test]
fn creates_missing_state_dir() {
    let temp = TempDir::new().unwrap();
    let state_dir = temp.path().join("state");
    assert!(!state_dir.exists());
    ensure_state_dir(&state_dir).unwrap();
    assert!(state_dir.is_dir());
}

#[test]
fn rewrite_replaces_previous_contents() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write(".registry.ron", "{}").unwrap();
    assert_eq!(fs::read_to_string(&first).unwrap(), "{}");

    let second = writer.write(".registry.ron", "{42: ()}").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "{42: ()}");
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[test]
fn state_path_that_is_a_file_is_rejected() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write(".registry.ron", "{}").is_err());
    assert!(!file_path.with_file_name(".registry.ron").exists());
}
