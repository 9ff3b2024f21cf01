mod common;

use common::TestRepo;
use predicates::str::contains;

#[test]
fn diff_head_staged_shows_added_file() {
    let repo = TestRepo::init();
    repo.write("a.txt", "hello");
    repo.sod(&["add", "a.txt"]).success();

    repo.sod(&["diff"]).success().stdout(contains("A")).stdout(contains("a.txt"));
}

#[test]
fn diff_raw_is_tab_separated() {
    let repo = TestRepo::init();
    repo.write("a.txt", "hello");
    repo.sod(&["add", "a.txt"]).success();

    let output = repo.sod(&["diff", "--raw"]).success();
    let text = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    assert!(text.starts_with("A "));
    assert!(text.contains('\t'));
}

#[test]
fn diff_filter_restricts_to_requested_statuses() {
    let repo = TestRepo::init();
    repo.write("a.txt", "hello");
    repo.sod(&["add", "a.txt"]).success();
    repo.sod(&["commit", "-m", "first"]).success();

    repo.write("a.txt", "goodbye");
    repo.sod(&["add", "a.txt"]).success();

    repo.sod(&["diff", "--filter", "D"]).success().stdout(predicates::str::is_empty());
}

#[test]
fn diff_filter_with_multiple_uppercase_letters_is_a_union() {
    let repo = TestRepo::init();
    repo.write("a.txt", "hello");
    repo.write("b.txt", "world");
    repo.sod(&["add", "a.txt", "b.txt"]).success();
    repo.sod(&["commit", "-m", "first"]).success();

    std::fs::remove_file(repo.path().join("a.txt")).unwrap();
    repo.write("c.txt", "new");
    repo.sod(&["add", "a.txt", "c.txt"]).success();

    let output = repo.sod(&["diff", "--filter", "AD"]).success();
    let text = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    assert!(text.contains('A'));
    assert!(text.contains('D'));
    assert!(text.contains("c.txt"));
    assert!(text.contains("a.txt"));
    assert!(!text.contains("b.txt"));
}

#[test]
fn diff_abbreviates_digest_to_minimum_width_of_ten() {
    let repo = TestRepo::init();
    repo.write("a.txt", "hello");
    repo.sod(&["add", "a.txt"]).success();

    let output = repo.sod(&["diff"]).success();
    let text = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let digest_text = text.split_whitespace().nth(1).expect("status letter, digest, path");
    assert_eq!(digest_text.len(), 10);
    assert!(digest_text.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn diff_rejects_invalid_filter_letter() {
    let repo = TestRepo::init();
    repo.sod(&["diff", "--filter", "Z"]).failure().code(1).stderr(contains("error:"));
}
