//! Tests for the real FileSystem implementation used by the session cache

use cloudland::infrastructure::traits::{FileSystem, RealFileSystem};
use std::fs;
use tempfile::TempDir;

// ============================================================
// replace tests
// ============================================================

#[test]
fn given_missing_file_when_replace_then_creates_it() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("session.json");
    let fs = RealFileSystem;

    // Act
    fs.replace(&path, "{}").unwrap();

    // Assert
    assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
}

#[test]
fn given_existing_file_when_replace_then_content_swapped_and_no_temp_left() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("session.json");
    fs::write(&path, "old content that is longer").unwrap();
    let fs = RealFileSystem;

    // Act
    fs.replace(&path, "new").unwrap();

    // Assert
    assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    let entries = fs::read_dir(temp.path()).unwrap().count();
    assert_eq!(entries, 1, "temporary file should have been renamed");
}

#[cfg(unix)]
#[test]
fn given_replace_when_written_then_owner_only_permissions() {
    use std::os::unix::fs::PermissionsExt;

    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("session.json");

    // Act
    RealFileSystem.replace(&path, "{}").unwrap();

    // Assert
    let mode = fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o077, 0);
}

// ============================================================
// ensure_parent / remove_file tests
// ============================================================

#[test]
fn given_nested_path_when_ensure_parent_then_directories_created() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("a/b/c/session.json");
    let fs = RealFileSystem;

    // Act
    fs.ensure_parent(&path).unwrap();

    // Assert
    assert!(temp.path().join("a/b/c").is_dir());
    assert!(!fs.exists(&path));
}

#[test]
fn given_file_when_remove_file_then_gone() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("session.json");
    fs::write(&path, "x").unwrap();
    let fs = RealFileSystem;

    // Act
    fs.remove_file(&path).unwrap();

    // Assert
    assert!(!fs.exists(&path));
    assert!(fs.remove_file(&path).is_err());
}
