mod common;

use common::TestRepo;
use predicates::str::contains;

#[test]
fn commit_refuses_when_nothing_is_staged() {
    let repo = TestRepo::init();
    repo.sod(&["commit", "-m", "empty"]).failure().code(1).stderr(contains("error:"));
}

#[test]
fn commit_writes_a_commit_and_clears_the_index() {
    let repo = TestRepo::init();
    repo.write("a.txt", "hello");
    repo.sod(&["add", "a.txt"]).success();

    repo.sod(&["commit", "-m", "first"]).success().stdout(contains("committed"));
    repo.sod(&["status"]).success().stdout(contains("clean"));
    repo.sod(&["log"]).success().stdout(contains("first"));
}

#[test]
fn second_commit_chains_onto_head() {
    let repo = TestRepo::init();
    repo.write("a.txt", "hello");
    repo.sod(&["add", "a.txt"]).success();
    repo.sod(&["commit", "-m", "first"]).success();

    repo.write("b.txt", "world");
    repo.sod(&["add", "b.txt"]).success();
    repo.sod(&["commit", "-m", "second"]).success();

    let output = repo.sod(&["log"]).success();
    let text = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(text.contains("second"));
    assert!(text.contains("first"));
}
