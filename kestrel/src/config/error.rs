use std::path::PathBuf;

use snafu::Snafu;

/// Errors raised while loading the configuration file.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Failed to open config from {}, error: {source}", filename.display()))]
    OpenConfig { filename: PathBuf, source: std::io::Error },

    #[snafu(display("Failed to parse config from {}, error: {source}", filename.display()))]
    ParseConfig { filename: PathBuf, source: serde_yaml::Error },

    #[snafu(display("Invalid config from {}, refreshInterval must be at least 1 second", filename.display()))]
    ZeroRefreshInterval { filename: PathBuf },

    /// The path does not exist or cannot be accessed.
    #[snafu(display("Failed to resolve file path {}, error: {source}", file_path.display()))]
    ResolveFilePath { file_path: PathBuf, source: std::io::Error },
}
