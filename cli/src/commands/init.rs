use std::path::Path;
use std::path::PathBuf;

use clap::Args;

use sod_lib::Repo;
use sod_lib::SodError;

use crate::ui::Ui;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (defaults to the current directory).
    pub path: Option<PathBuf>,
}

pub fn run(args: &InitArgs, cwd: &Path, ui: &mut Ui) -> Result<(), SodError> {
    let root = match &args.path {
        Some(path) if path.is_absolute() => path.clone(),
        Some(path) => cwd.join(path),
        None => cwd.to_path_buf(),
    };
    std::fs::create_dir_all(&root).map_err(|source| SodError::IoFailure { path: root.clone(), source })?;
    Repo::init(&root)?;
    ui.writeln_stdout(&format!("initialized sod repository in {}", root.display()));
    Ok(())
}
