use std::fs;

use tempfile::TempDir;
use timeline_engine::{snapshot_filename, Platform, SnapshotWriter};

#[test]
fn filename_is_deterministic_per_platform_and_url() {
    let first = snapshot_filename(Platform::Twitter, "https://x.com/nasa");
    let second = snapshot_filename(Platform::Twitter, "https://x.com/nasa");
    let other = snapshot_filename(Platform::Twitter, "https://x.com/esa");

    assert_eq!(first, second);
    assert_ne!(first, other);
    assert!(first.starts_with("twitter-"));
    assert!(first.ends_with(".html"));
}

#[test]
fn write_creates_the_directory_and_replaces_existing() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("snapshots");
    let writer = SnapshotWriter::new(dir.clone());

    let first = writer
        .write(Platform::LinkedIn, "https://www.linkedin.com/company/nasa", "<html>1</html>")
        .unwrap();
    assert!(dir.is_dir());
    assert_eq!(fs::read_to_string(&first).unwrap(), "<html>1</html>");

    let second = writer
        .write(Platform::LinkedIn, "https://www.linkedin.com/company/nasa", "<html>2</html>")
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "<html>2</html>");
}

#[test]
fn write_fails_cleanly_when_the_path_is_a_file() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("blocked");
    fs::write(&blocker, "x").unwrap();

    let writer = SnapshotWriter::new(blocker);
    let result = writer.write(Platform::Facebook, "https://www.facebook.com/nasa", "<html></html>");
    assert!(result.is_err());
}
