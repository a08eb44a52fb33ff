//! Command line argument parsing
//!
//! Subcommands:
//! - `run`: Launch a container sharing the host namespaces
//! - `ulimits`: Print the resolved ulimit set
//! - `parse-image`: Print the scheme and path of an image reference
//! - `show-config`: Show configuration discovery information

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug)]
pub enum ExecutionMode {
    Run(RunConfig),
    Ulimits { ulimits: Vec<String>, json: bool },
    ParseImage(String),
    ShowConfig,
}

#[derive(Debug)]
pub struct RunConfig {
    /// Explicit container name; generated when absent
    pub name: Option<String>,
    pub image: String,
    pub entrypoint: Vec<String>,
    pub command: Vec<String>,
    pub ulimits: Vec<String>,
    pub envdirs: Vec<PathBuf>,
    pub volumes: Vec<String>,
    pub detach: bool,
    pub no_pull: bool,
    pub keep_stale: bool,
    pub config_override: Option<PathBuf>,
    pub verbose: bool,
}

#[derive(Debug, Parser)]
#[command(name = "hostlaunch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Launch containers that share the host's network, IPC and PID namespaces"
)]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create, start and (by default) wait for a container
    Run {
        /// Container name (default: hostlaunch-<uuid>)
        #[arg(short = 'n', long = "name")]
        name: Option<String>,
        /// Image reference: name, docker:///name, docker://host:port/name or file:///archive.tar
        #[arg(short = 'i', long = "image")]
        image: String,
        /// Entrypoint override (repeat for each argument)
        #[arg(long = "entrypoint", value_name = "ARG", allow_hyphen_values = true)]
        entrypoint: Vec<String>,
        /// ulimit override name:soft:hard (repeatable; replaces host defaults entirely)
        #[arg(long = "ulimit", value_name = "NAME:SOFT:HARD")]
        ulimits: Vec<String>,
        /// Directory of one-file-per-variable environment definitions (repeatable)
        #[arg(long = "envdir", value_name = "DIR")]
        envdirs: Vec<PathBuf>,
        /// Bind mount host:container[:mode] (repeatable)
        #[arg(long = "volume", value_name = "BIND")]
        volumes: Vec<String>,
        /// Return after start instead of waiting for the container to exit
        #[arg(short = 'd', long = "detach")]
        detach: bool,
        /// Fail instead of pulling a missing image
        #[arg(long = "no-pull")]
        no_pull: bool,
        /// Do not remove an existing container with the same name
        #[arg(long = "keep-stale")]
        keep_stale: bool,
        /// Configuration file path
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
        /// Enable verbose output
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
        /// Command passed to the entrypoint
        #[arg(last = true, value_name = "COMMAND")]
        command: Vec<String>,
    },
    /// Print the ulimits a launch would apply
    Ulimits {
        /// ulimit override name:soft:hard (repeatable)
        #[arg(long = "ulimit", value_name = "NAME:SOFT:HARD")]
        ulimits: Vec<String>,
        /// Print as JSON
        #[arg(long = "json")]
        json: bool,
    },
    /// Print the scheme and path of an image reference
    ParseImage {
        /// Image reference
        reference: String,
    },
    /// Show configuration discovery information
    ShowConfig,
}

impl Args {
    pub fn parse() -> Self {
        Parser::parse()
    }

    pub fn mode(self) -> Result<ExecutionMode, String> {
        match self.command {
            Some(Commands::Run {
                name,
                image,
                entrypoint,
                ulimits,
                envdirs,
                volumes,
                detach,
                no_pull,
                keep_stale,
                config,
                verbose,
                command,
            }) => Ok(ExecutionMode::Run(RunConfig {
                name,
                image,
                entrypoint,
                command,
                ulimits,
                envdirs,
                volumes,
                detach,
                no_pull,
                keep_stale,
                config_override: config,
                verbose,
            })),
            Some(Commands::Ulimits { ulimits, json }) => Ok(ExecutionMode::Ulimits { ulimits, json }),
            Some(Commands::ParseImage { reference }) => Ok(ExecutionMode::ParseImage(reference)),
            Some(Commands::ShowConfig) => Ok(ExecutionMode::ShowConfig),
            None => Err(
                "No command specified. Use 'hostlaunch --help' to see available commands."
                    .to_string(),
            ),
        }
    }
}
