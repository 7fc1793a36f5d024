use super::*;

#[test]
fn dir_fingerprint_changes_when_a_file_is_added() {
    let dir = tempfile::tempdir().unwrap();
    let before = dir_fingerprint(dir.path());
    std::thread::sleep(Duration::from_millis(10));
    std::fs::write(dir.path().join("new.yaml"), "name: x\nsteps: []\n").unwrap();
    let after = dir_fingerprint(dir.path());
    assert_ne!(before, after);
}

#[test]
fn dir_fingerprint_is_none_for_a_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");
    assert_eq!(dir_fingerprint(&missing), None);
}

#[test]
fn file_fingerprint_changes_on_rewrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grimoire-matchers.yaml");
    std::fs::write(&path, "rules: []\ndefault_grimoire: quick-fix\n").unwrap();
    let before = file_fingerprint(&path);
    std::thread::sleep(Duration::from_millis(10));
    std::fs::write(&path, "rules: []\ndefault_grimoire: implement-with-tests\n").unwrap();
    let after = file_fingerprint(&path);
    assert_ne!(before, after);
}
