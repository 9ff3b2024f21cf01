//! Maps a [`SodError`] to a process exit code and renders it to stderr
//! (spec.md §7). Grounded on the template's own `CommandError` → exit-code
//! mapping, collapsed to sod's four-kind scheme.

use sod_lib::SodError;

use crate::ui::Ui;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_USER_ERROR: i32 = 1;
pub const EXIT_INTERNAL_ERROR: i32 = 2;
pub const EXIT_LOCK_CONTENTION: i32 = 3;

fn exit_code(error: &SodError) -> i32 {
    match error {
        SodError::NotARepository | SodError::BadArgument(_) | SodError::NoMatch(_) | SodError::NothingToCommit => {
            EXIT_USER_ERROR
        }
        SodError::LockContention => EXIT_LOCK_CONTENTION,
        SodError::ObjectStoreCorruption(_) | SodError::IoFailure { .. } | SodError::RemoteFailure(_) => {
            EXIT_INTERNAL_ERROR
        }
        // A hook failure is surfaced as a warning and never fails the
        // invocation that produced it (spec.md §4.H); it only reaches this
        // function if a caller chooses to report it as a terminal error.
        SodError::HookFailure(_) => EXIT_SUCCESS,
    }
}

/// Prints `error` to `ui`'s stderr and returns the exit code the process
/// should use.
pub fn report(ui: &mut Ui, error: &SodError) -> i32 {
    match error {
        SodError::HookFailure(message) => {
            ui.warn(message);
            EXIT_SUCCESS
        }
        other => {
            ui.writeln_stderr(&format!("error: {other}"));
            exit_code(other)
        }
    }
}
