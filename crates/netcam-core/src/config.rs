use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_STORE: &str = "/var/lib/netcam";
pub const DEFAULT_BACKEND: &str = "session";
pub const DEFAULT_MODULE_PATH: &str = "/usr/lib/netcam/libnetcam_source.so";

pub const STORE_ENV: &str = "NETCAM_STORE";
pub const BACKEND_ENV: &str = "NETCAM_BACKEND";

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub store: Option<PathBuf>,
    pub backend: Option<String>,
    pub module_path: Option<PathBuf>,
}

/// Values given on the command line; they win over everything else.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub store: Option<PathBuf>,
    pub backend: Option<String>,
    pub module_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub store: PathBuf,
    pub backend: String,
    pub module_path: PathBuf,
    /// The config file that was read, if any.
    pub config_file: Option<PathBuf>,
}

impl Settings {
    /// `$XDG_CONFIG_HOME/netcam/config.toml`, else `~/.config/netcam/config.toml`.
    pub fn config_path() -> Option<PathBuf> {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("netcam").join("config.toml"))
    }

    /// Defaults, then the user config file, then the environment, then `overrides`.
    pub fn load(overrides: Overrides) -> Result<Self, CoreError> {
        Self::resolve(
            Self::config_path().as_deref(),
            |key| std::env::var(key).ok(),
            overrides,
        )
    }

    pub fn resolve(
        config_path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
        overrides: Overrides,
    ) -> Result<Self, CoreError> {
        let (file, config_file) = match config_path {
            Some(path) if path.is_file() => (read_config_file(path)?, Some(path.to_path_buf())),
            _ => (ConfigFile::default(), None),
        };

        let env = |key: &str| env(key).filter(|v| !v.is_empty());

        let store = overrides
            .store
            .or_else(|| env(STORE_ENV).map(PathBuf::from))
            .or(file.store)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE));
        let backend = overrides
            .backend
            .or_else(|| env(BACKEND_ENV))
            .or(file.backend)
            .unwrap_or_else(|| DEFAULT_BACKEND.to_owned());
        let module_path = overrides
            .module_path
            .or(file.module_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODULE_PATH));

        debug!(
            "settings: store={} backend={backend} module={}",
            store.display(),
            module_path.display()
        );
        Ok(Self {
            store,
            backend,
            module_path,
            config_file,
        })
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile, CoreError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CoreError::Config(format!("cannot read {}: {e}", path.display())))?;
    toml::from_str(&content)
        .map_err(|e| CoreError::Config(format!("invalid {}: {e}", path.display())))
}
