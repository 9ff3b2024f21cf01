//! Output plumbing: plain stdout/stderr writers. Grounded on the
//! template's own `Ui` (separate stdout/stderr handles, a `--debug`-gated
//! tracing layer installed once at startup), stripped of the pager and
//! formatter layers since sod's output is unstyled text/records, never a
//! colorized revision graph.

use std::io;
use std::io::Write as _;

/// The process's output handles. A thin wrapper mainly so command code
/// writes through one seam instead of calling `println!`/`eprintln!`
/// directly, matching the template's own convention.
pub struct Ui {
    stdout: io::Stdout,
    stderr: io::Stderr,
}

impl Default for Ui {
    fn default() -> Self {
        Self::new()
    }
}

impl Ui {
    pub fn new() -> Self {
        Self { stdout: io::stdout(), stderr: io::stderr() }
    }

    pub fn write_stdout(&mut self, text: &str) {
        let _ = self.stdout.write_all(text.as_bytes());
    }

    pub fn write_stdout_bytes(&mut self, bytes: &[u8]) {
        let _ = self.stdout.write_all(bytes);
    }

    pub fn writeln_stdout(&mut self, text: &str) {
        self.write_stdout(text);
        self.write_stdout("\n");
    }

    pub fn write_stderr(&mut self, text: &str) {
        let _ = self.stderr.write_all(text.as_bytes());
    }

    pub fn writeln_stderr(&mut self, text: &str) {
        self.write_stderr(text);
        self.write_stderr("\n");
    }

    pub fn warn(&mut self, text: &str) {
        self.writeln_stderr(&format!("warning: {text}"));
    }
}

/// Installs the `tracing-subscriber` `fmt` layer, gated on `--debug` or
/// `SOD_DEBUG=1` (spec.md §6), exactly as the template gates its own
/// verbose tracing output.
pub fn init_tracing(debug: bool) {
    let debug = debug || std::env::var("SOD_DEBUG").as_deref() == Ok("1");
    if !debug {
        return;
    }
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
