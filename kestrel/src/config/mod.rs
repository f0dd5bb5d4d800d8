mod error;

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};

use kestrel_cli::config::LogConfig;
use kestrel_model::ViewSetting;
use resolve_path::PathResolveExt;
use serde::{Deserialize, Serialize};
use serde_with::{DurationSeconds, serde_as};
use snafu::ResultExt;

pub use self::error::Error;

/// Settings read from `config.yaml`. Every field falls back to its default
/// when absent from the file.
#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Seconds between two fetches of the watched resource.
    #[serde(default = "default_refresh_interval")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub refresh_interval: Duration,

    /// Persisted view settings keyed by resource name, e.g. `pods`.
    #[serde(default = "BTreeMap::new")]
    pub views: BTreeMap<String, ViewSetting>,

    #[serde(default = "LogConfig::default")]
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval: default_refresh_interval(),
            views: BTreeMap::new(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Returns the first existing configuration file among the default path
    /// and the fallback directories.
    pub fn search_config_file_path() -> Option<PathBuf> {
        std::iter::once(Self::default_path())
            .chain(kestrel_base::fallback_project_config_directories().into_iter().map(|mut path| {
                path.push(kestrel_base::CLI_CONFIG_NAME);
                path
            }))
            .find(|path| path.try_exists().unwrap_or(false))
    }

    /// `config.yaml` under the project configuration directory.
    #[inline]
    pub fn default_path() -> PathBuf {
        [kestrel_base::PROJECT_CONFIG_DIR.to_path_buf(), PathBuf::from(kestrel_base::CLI_CONFIG_NAME)]
            .into_iter()
            .collect()
    }

    /// Reads and validates the configuration file at `path`. A leading `~`
    /// in `path` or in `log.filePath` is expanded.
    ///
    /// # Errors
    ///
    /// Fails when a path cannot be resolved, the file cannot be read or is
    /// not valid YAML, or `refreshInterval` is zero.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path
            .as_ref()
            .try_resolve()
            .map(|path| path.to_path_buf())
            .with_context(|_| error::ResolveFilePathSnafu { file_path: path.as_ref().to_path_buf() })?;
        let data = std::fs::read(&path).context(error::OpenConfigSnafu { filename: path.clone() })?;
        Self::from_slice(&data, path)
    }

    fn from_slice(data: &[u8], path: PathBuf) -> Result<Self, Error> {
        let mut config: Self =
            serde_yaml::from_slice(data).context(error::ParseConfigSnafu { filename: path.clone() })?;
        snafu::ensure!(
            !config.refresh_interval.is_zero(),
            error::ZeroRefreshIntervalSnafu { filename: path }
        );

        config.log.file_path = config
            .log
            .file_path
            .map(|path| {
                path.try_resolve()
                    .map(|resolved| resolved.to_path_buf())
                    .with_context(|_| error::ResolveFilePathSnafu { file_path: path.clone() })
            })
            .transpose()?;

        Ok(config)
    }

    /// The persisted view setting of `resource`, if any.
    pub fn view_setting(&self, resource: &str) -> Option<&ViewSetting> { self.views.get(resource) }

    /// A sample configuration with one persisted view per resource.
    pub fn template_basic() -> Vec<u8> {
        let views = [
            ("pods", ViewSetting { columns: Vec::new(), sort_column: "AGE:desc".to_string() }),
            ("nodes", ViewSetting {
                columns: ["NAME", "STATUS", "ROLES", "CPU", "MEMORY", "AGE"]
                    .map(String::from)
                    .to_vec(),
                sort_column: "NAME:asc".to_string(),
            }),
        ];
        let config = Self {
            views: views.into_iter().map(|(name, view)| (name.to_string(), view)).collect(),
            ..Self::default()
        };
        serde_yaml::to_string(&config).unwrap_or_default().into_bytes()
    }
}

const fn default_refresh_interval() -> Duration { Duration::from_secs(2) }
