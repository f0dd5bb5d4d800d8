//! The `kestrel` command line interface.
//!
//! # Examples
//!
//! ```bash
//! # Watch the pods of the current namespace
//! kestrel watch pods
//!
//! # Watch pods everywhere, sorted by restarts, showing only troubled ones
//! kestrel watch pods -A --toast --sort RESTARTS --desc
//!
//! # Print the nodes once with their role and zone labels as columns
//! kestrel watch nodes --once --labels node-role.kubernetes.io/control-plane,zone
//! ```

pub mod error;
mod watch;

use std::{io::Write, path::PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use futures::FutureExt;
use kestrel_base::{CLI_PROGRAM_NAME, PROJECT_NAME_WITH_INITIAL_CAPITAL, PROJECT_SEMVER};
use snafu::ResultExt;
use tokio::runtime::Runtime;

pub use self::error::Error;
use self::watch::WatchCommand;
use crate::config::Config;

/// `Cli` is the main entry point for the Kestrel command line interface.
#[derive(Parser)]
#[command(
    name = CLI_PROGRAM_NAME,
    author,
    version,
    about = "Kestrel: a live, diff-aware resource table for Kubernetes.",
    long_about = "Kestrel keeps a table of Kubernetes resources in sync with the cluster. \
                  Every refresh is reconciled against the rows already shown, so only \
                  changed cells are highlighted and the table is only redrawn when \
                  something changed.",
    color = clap::ColorChoice::Always
)]
pub struct Cli {
    #[clap(subcommand)]
    commands: Option<Commands>,

    #[clap(
        long = "config",
        short = 'c',
        env = "KESTREL_CONFIG_FILE_PATH",
        help = "Specify a configuration file. Defaults to ~/.config/kestrel/config.yaml or \
                KESTREL_CONFIG_FILE_PATH env var."
    )]
    config_file: Option<PathBuf>,

    #[clap(
        long = "log-level",
        env = "KESTREL_LOG_LEVEL",
        help = "Set the logging level (e.g., info, debug, trace)."
    )]
    log_level: Option<tracing::Level>,
}

/// The subcommands of `kestrel`.
#[derive(Clone, Subcommand)]
pub enum Commands {
    #[command(about = "Display client and server version information")]
    Version {
        #[clap(long = "client", help = "If true, shows client version only (no server required).")]
        client: bool,
    },

    #[command(about = "Generate shell completion script for the specified shell (bash, zsh, fish)")]
    Completions { shell: clap_complete::Shell },

    #[command(about = "Output the default configuration in YAML format")]
    DefaultConfig,

    /// Keeps a resource table in sync with the cluster and prints it on
    /// every change.
    #[command(alias = "w", about = "Watch a resource and print its table whenever it changes")]
    Watch(WatchCommand),
}

impl Default for Cli {
    fn default() -> Self { Self::parse() }
}

impl Cli {
    /// Loads the configuration file, falling back to the defaults when no
    /// file is given and none is found. `--log-level` overrides the file.
    fn load_config(&self) -> Result<Config, Error> {
        let path = self.config_file.clone().or_else(Config::search_config_file_path);
        let mut config = match path {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(log_level) = self.log_level {
            config.log.level = log_level;
        }

        Ok(config)
    }

    fn client_version() -> String {
        format!("{PROJECT_NAME_WITH_INITIAL_CAPITAL} Client Version: {}\n", *PROJECT_SEMVER)
    }

    /// Runs the parsed command and returns the process exit code.
    ///
    /// # Errors
    ///
    /// Fails when the configuration cannot be loaded, the Kubernetes client
    /// or the tokio runtime cannot be initialized, or the command fails.
    pub fn run(self) -> Result<i32, Error> {
        let mut stdout = std::io::stdout();
        match self.commands {
            Some(Commands::Version { client }) if client => {
                stdout.write_all(Self::client_version().as_bytes()).context(error::WriteStdoutSnafu)?;
                return Ok(0);
            }
            Some(Commands::Completions { shell }) => {
                let mut app = Self::command();
                let bin_name = app.get_name().to_string();
                clap_complete::generate(shell, &mut app, bin_name, &mut stdout);
                return Ok(0);
            }
            Some(Commands::DefaultConfig) => {
                stdout.write_all(Config::template_basic().as_slice()).context(error::WriteStdoutSnafu)?;
                return Ok(0);
            }
            None => {
                let help = Self::command().render_long_help().ansi().to_string();
                std::io::stderr().write_all(help.as_bytes()).context(error::WriteStdoutSnafu)?;
                return Ok(-1);
            }
            _ => {}
        }

        let config = self.load_config()?;
        if config.log.has_sink() {
            config.log.registry();
        }

        let fut = async move {
            let kube_client = kube::Client::try_default().await.context(error::KubeConfigSnafu)?;
            match self.commands {
                Some(Commands::Version { .. }) => {
                    let server_version = kube_client.apiserver_version().await.map_or_else(
                        |_| "unknown".to_string(),
                        |info| format!("{}.{}", info.major, info.minor),
                    );
                    let info =
                        format!("{}Server Version: {server_version}\n", Self::client_version());
                    std::io::stdout().write_all(info.as_bytes()).context(error::WriteStdoutSnafu)?;
                }
                Some(Commands::Watch(cmd)) => cmd.run(kube_client, config).boxed().await?,
                Some(Commands::Completions { .. } | Commands::DefaultConfig) | None => {}
            }

            Ok(0)
        };

        Runtime::new().context(error::InitializeTokioRuntimeSnafu)?.block_on(fut)
    }
}
