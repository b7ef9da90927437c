use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::commands;

/// Devlens - dev server lifecycle with a live editor preview
#[derive(Parser)]
#[command(name = "devlens")]
#[command(version)]
#[command(about = "Devlens - runs your dev server and keeps a preview on the current document")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Show verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the dev server session and the editor bridge
    Run(RunArgs),

    /// Send a command to a running session
    Ctl(CtlArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to devlens.toml (defaults to ./devlens.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Editor bridge socket path
    #[arg(long, env = "DEVLENS_SOCKET")]
    pub socket: Option<PathBuf>,

    /// Don't start the server even if auto_start is set
    #[arg(long)]
    pub no_auto_start: bool,
}

#[derive(Args, Debug)]
pub struct CtlArgs {
    /// Editor bridge socket path
    #[arg(long, env = "DEVLENS_SOCKET")]
    pub socket: Option<PathBuf>,

    #[command(subcommand)]
    pub action: CtlAction,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CtlAction {
    /// Start the dev server
    Start,
    /// Stop the dev server
    Stop,
    /// Start if stopped, stop otherwise
    Toggle,
    /// Show the session state
    Status,
    /// Report PATH as the active document
    Open { path: PathBuf },
    /// Report that the terminal named NAME was closed
    Closed { name: String },
}

impl Cli {
    pub fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let rt = tokio::runtime::Runtime::new()?;
        match self.command {
            Commands::Run(args) => rt.block_on(commands::run::run(args)),
            Commands::Ctl(args) => rt.block_on(commands::ctl::run(args)),
        }
    }
}
