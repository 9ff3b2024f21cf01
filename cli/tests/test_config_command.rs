mod common;

use common::TestRepo;
use predicates::str::contains;

#[test]
fn config_get_unset_key_is_an_error() {
    let repo = TestRepo::init();
    repo.sod(&["config", "get", "user.name"]).failure().code(1);
}

#[test]
fn config_set_then_get_roundtrips() {
    let repo = TestRepo::init();
    repo.sod(&["config", "set", "user.name", "jane"]).success();
    repo.sod(&["config", "get", "user.name"]).success().stdout(contains("jane"));
}

#[test]
fn config_set_rejects_unknown_key() {
    let repo = TestRepo::init();
    repo.sod(&["config", "set", "bogus.key", "x"]).failure().code(1).stderr(contains("error:"));
}

#[test]
fn config_list_shows_defaults() {
    let repo = TestRepo::init();
    repo.sod(&["config", "list"]).success().stdout(contains("diff.renameLimit"));
}
