//! odoodoc - documentation builder for Odoo deployments.

mod build;
mod cli;
mod config;
mod doctree;
mod metadata;
mod reference;
mod serve;
mod transform;
mod utils;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use config::DocConfig;
use metadata::OdooRpc;

fn main() -> Result<()> {
    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));
    utils::log::set_verbose(cli.verbose);
    let config = load_config(cli)?;

    match &cli.command {
        Commands::Build { .. } => {
            let rpc = OdooRpc::connect(&config.odoo)?;
            build::run(&config, &rpc)
        }
        Commands::Transform { dir, .. } => {
            let rpc = OdooRpc::connect(&config.odoo)?;
            let dir = dir.as_deref().unwrap_or(&config.build.output);
            transform::run(dir, &rpc, &config)
        }
        Commands::Serve { .. } => serve::serve(&config),
    }
}

/// Load and validate configuration from CLI arguments
fn load_config(cli: &'static Cli) -> Result<DocConfig> {
    let config = DocConfig::load(cli)?;
    config.validate()?;
    Ok(config)
}
