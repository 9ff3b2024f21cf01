mod common;

use common::TestRepo;
use predicates::str::contains;

#[test]
fn init_creates_sod_directory() {
    let repo = TestRepo::init();
    assert!(repo.exists(".sod"));
}

#[test]
fn status_in_non_repository_is_a_user_error() {
    let dir = tempfile::tempdir().unwrap();
    assert_cmd::Command::cargo_bin("sod")
        .unwrap()
        .current_dir(dir.path())
        .arg("status")
        .assert()
        .failure()
        .code(1)
        .stderr(contains("error:"));
}
