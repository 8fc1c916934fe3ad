//! Stowage CLI: manage an archival project.

use anyhow::Result;
use clap::Parser;
use std::time::Instant;
use stowage::engine::arg_parser::Cli;
use stowage::engine::handle_run;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
