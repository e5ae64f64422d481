//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

use crate::pipeline::TaskName;

/// brook asset pipeline CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (searched upward from the current directory)
    #[arg(
        short = 'C',
        long,
        global = true,
        default_value = "brook.toml",
        value_hint = clap::ValueHint::FilePath
    )]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands (defaults to `default`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build every asset class once, then serve and watch
    #[command(visible_alias = "d")]
    Default {
        #[command(flatten)]
        serve_args: ServeArgs,
    },

    /// Build every asset class once and exit
    #[command(visible_alias = "b")]
    Build,

    /// Run the named tasks once, in order
    #[command(visible_alias = "r")]
    Run {
        /// Task names (scripts, stylelint, styles, images, fonts)
        #[arg(required = true, value_enum)]
        tasks: Vec<TaskName>,
    },
}

/// Dev server overrides for the default command
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
    #[arg(short, long)]
    pub interface: Option<std::net::IpAddr>,

    /// Port number to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Proxy target URL (overrides `localhost` in the config)
    #[arg(long, value_hint = clap::ValueHint::Url, conflicts_with = "no_proxy")]
    pub proxy: Option<String>,

    /// Serve the destination root directly instead of proxying
    #[arg(long)]
    pub no_proxy: bool,
}

impl Cli {
    /// The command to run, with `default` filled in when none was given.
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Default {
            serve_args: ServeArgs::default(),
        })
    }

    /// Dev server overrides, when the command serves.
    pub fn serve_args(&self) -> Option<ServeArgs> {
        match self.command() {
            Commands::Default { serve_args } => Some(serve_args),
            _ => None,
        }
    }
}
