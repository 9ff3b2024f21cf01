use std::path::Path;

use clap::Args;
use clap::Subcommand;

use sod_lib::SodError;
use sod_lib::aux::update_store;

use crate::cli_util::discover_repo;
use crate::ui::Ui;

#[derive(Args, Debug)]
pub struct AuxArgs {
    #[command(subcommand)]
    pub action: AuxAction,
}

#[derive(Subcommand, Debug)]
pub enum AuxAction {
    /// Register a new auxiliary snapshot store.
    Add {
        /// Transport kind; only `plain` is currently supported.
        #[arg(long = "type", default_value = "plain")]
        store_type: String,
        name: String,
        url: String,
    },
    /// Re-enumerate one, several, or all stores and rebuild their caches.
    Update {
        /// Update every registered store.
        #[arg(long)]
        all: bool,
        names: Vec<String>,
    },
    /// Print every registered store.
    List,
    /// Unregister a store.
    Remove { name: String },
}

pub fn run(args: &AuxArgs, cwd: &Path, ui: &mut Ui) -> Result<(), SodError> {
    let mut repo = discover_repo(cwd)?;
    match &args.action {
        AuxAction::Add { store_type, name, url } => {
            if store_type != "plain" {
                return Err(SodError::BadArgument(format!("unsupported store type `{store_type}`, expected `plain`")));
            }
            repo.aux_registry.add(name, url)?;
            repo.save_aux_registry()?;
            ui.writeln_stdout(&format!("added auxiliary store `{name}`"));
        }
        AuxAction::Update { all, names } => {
            let targets: Vec<_> = if *all || names.is_empty() {
                repo.aux_registry.stores().to_vec()
            } else {
                names.iter().map(|name| repo.aux_registry.get(name).cloned()).collect::<Result<_, _>>()?
            };
            for store in &targets {
                let cache_dir = repo.aux_cache_dir(&store.name);
                let snapshots = update_store(store, &cache_dir)?;
                ui.writeln_stdout(&format!("{}: {} snapshot(s)", store.name, snapshots.len()));
            }
        }
        AuxAction::List => {
            for store in repo.aux_registry.stores() {
                ui.writeln_stdout(&format!("{} {:?} {}", store.name, store.kind, store.url_template));
            }
        }
        AuxAction::Remove { name } => {
            repo.aux_registry.remove(name)?;
            repo.save_aux_registry()?;
            ui.writeln_stdout(&format!("removed auxiliary store `{name}`"));
        }
    }
    Ok(())
}
