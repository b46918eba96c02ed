use tempfile::TempDir;
use trellis_util::fs::{find_ancestor_with, read_to_string, write_string};

#[test]
fn finds_manifest_in_ancestor() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("Trellis.toml"), "").unwrap();
    let nested = tmp.path().join("a").join("b");
    std::fs::create_dir_all(&nested).unwrap();

    let found = find_ancestor_with(&nested, "Trellis.toml").unwrap();
    assert_eq!(found, tmp.path());
}

#[test]
fn missing_manifest_returns_none() {
    let tmp = TempDir::new().unwrap();
    assert!(find_ancestor_with(tmp.path(), "definitely-not-here.toml").is_none());
}

#[test]
fn write_creates_parent_directories() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("out").join("Trellis.lock");
    write_string(&path, "hello").unwrap();
    assert_eq!(read_to_string(&path, "lockfile").unwrap(), "hello");
}

#[test]
fn read_error_names_the_file() {
    let tmp = TempDir::new().unwrap();
    let err = read_to_string(&tmp.path().join("nope.toml"), "manifest").unwrap_err();
    assert!(err.to_string().contains("Failed to read manifest"));
}
