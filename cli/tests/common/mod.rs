//! Minimal test harness: spawns the `sod` binary against a temp directory.
//! Grounded on the template's own `TestEnvironment`/`work_dir` split, pared
//! down to what `assert_cmd` needs directly since sod has no multi-repo or
//! git-colocation scenarios to set up.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use assert_cmd::assert::Assert;
use tempfile::TempDir;

pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    /// Creates a fresh temp directory and runs `sod init` in it.
    pub fn init() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = Self { dir };
        repo.sod(&["init"]).success();
        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, rel_path: &str, contents: &str) {
        let full = self.path().join(rel_path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(full, contents).expect("write file");
    }

    pub fn read(&self, rel_path: &str) -> String {
        fs::read_to_string(self.path().join(rel_path)).expect("read file")
    }

    pub fn exists(&self, rel_path: &str) -> bool {
        self.path().join(rel_path).exists()
    }

    pub fn sod(&self, args: &[&str]) -> Assert {
        Command::cargo_bin("sod").expect("sod binary").current_dir(self.path()).args(args).assert()
    }
}
