//! CLI entry: settings file first, flags on top, then dispatch.

use anyhow::Result;
use log::debug;

use crate::engine::arg_parser::{Cli, Commands};
use crate::engine::handlers::{
    RunEnv, handle_add, handle_backup, handle_check, handle_db, handle_delete, handle_init,
    handle_like, handle_list, handle_orphan, handle_rename, handle_search,
};
use crate::utils::{load_settings, setup_logging};

fn setup_env(cli: &Cli) -> RunEnv {
    let settings = load_settings(&cli.dir);
    let verbose = cli.verbose || settings.verbose;
    setup_logging(verbose);
    debug!(
        "{} SETTINGS:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        settings
    );
    RunEnv {
        dir: cli.dir.clone(),
        verbose,
        settings,
    }
}

pub fn handle_run(cli: &Cli) -> Result<()> {
    let env = setup_env(cli);
    match &cli.command {
        Commands::Init { name, backup } => handle_init(&env, name, *backup),
        Commands::Add { danger } => handle_add(&env, *danger),
        Commands::Delete { id, name, danger } => handle_delete(&env, id, name, *danger),
        Commands::Rename { id, name } => handle_rename(&env, id, name),
        Commands::Like { id, n } => handle_like(&env, id, *n),
        Commands::Orphan => handle_orphan(&env),
        Commands::Db { action } => handle_db(&env, *action),
        Commands::Check(args) => handle_check(&env, args),
        Commands::Backup(args) => handle_backup(&env, args),
        Commands::Search(args) => handle_search(&env, args),
        Commands::List(args) => handle_list(&env, args),
    }
}
