//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// odoodoc documentation builder CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory (default: current directory)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Config file name (default: odoodoc.toml)
    #[arg(short = 'C', long, default_value = "odoodoc.toml")]
    pub config: PathBuf,

    /// Print remote lookup failures and other debug output
    #[arg(short, long)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Connection overrides for the Odoo server
#[derive(clap::Args, Debug, Clone, Default)]
pub struct OdooArgs {
    /// Server URL
    #[arg(long)]
    pub server: Option<String>,

    /// Database name
    #[arg(long)]
    pub db: Option<String>,

    /// Login of the user performing the lookups
    #[arg(long)]
    pub user: Option<String>,

    /// Password of the user
    #[arg(long, env = "ODOODOC_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Odoo language code of the lookups (e.g. es_ES)
    #[arg(long = "odoo-lang")]
    pub odoo_lang: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Sync sources, render the generator config and build the documentation
    Build {
        #[command(flatten)]
        odoo: OdooArgs,

        /// Documentation language folder (<module>/doc/<lang>)
        #[arg(short, long)]
        lang: Option<String>,

        /// Generator builder name
        #[arg(short, long)]
        format: Option<String>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep the temporary checkout and build root
        #[arg(long)]
        keep_temp: bool,

        /// Resolve references in every text node
        #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        plaintext: Option<bool>,
    },

    /// Resolve references in already rendered pages
    Transform {
        /// Directory of rendered pages (default: [build.output])
        dir: Option<PathBuf>,

        #[command(flatten)]
        odoo: OdooArgs,

        /// Resolve references in every text node
        #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        plaintext: Option<bool>,
    },

    /// Serve the built documentation
    Serve {
        /// Interface to bind on
        #[arg(short, long)]
        interface: Option<String>,

        /// The port you should provide
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory to serve (default: [build.output])
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[allow(unused)]
impl Cli {
    pub const fn is_build(&self) -> bool {
        matches!(self.command, Commands::Build { .. })
    }
    pub const fn is_transform(&self) -> bool {
        matches!(self.command, Commands::Transform { .. })
    }
    pub const fn is_serve(&self) -> bool {
        matches!(self.command, Commands::Serve { .. })
    }
}
