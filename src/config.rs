use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TodoError};

/// Environment variable overriding the configured database path.
pub const DB_ENV: &str = "TODUST_DB";

/// Returns the per-user directory holding the config and default database
/// (`~/.todust`, or `./.todust` when no home directory is known).
pub fn app_dir() -> PathBuf {
    let mut p = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    p.push(".todust");
    p
}

/// Returns the path of the persisted config file.
pub fn config_path() -> PathBuf {
    app_dir().join("config.json")
}

/// Returns the database path used when nothing else is configured.
pub fn default_db_path() -> PathBuf {
    app_dir().join("tasks.json")
}

/// Persisted settings.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Permanent database path set with `config set-db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
}

impl Config {
    /// Reads the config at `path`. A missing file is the default config.
    pub fn load_from(path: &Path) -> Result<Config> {
        match fs::read_to_string(path) {
            Ok(s) if s.trim().is_empty() => Ok(Config::default()),
            Ok(s) => serde_json::from_str(&s).map_err(|e| {
                TodoError::Config(format!("failed to parse {}: {}", path.display(), e))
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Config::default()),
            Err(e) => Err(TodoError::io(path, e)),
        }
    }

    /// Writes the config to `path`, creating its directory.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| TodoError::io(dir, e))?;
        }
        let s = serde_json::to_string_pretty(self).map_err(TodoError::Encode)?;
        fs::write(path, s).map_err(|e| TodoError::io(path, e))
    }
}

/// Where the effective database path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSource {
    Flag,
    Env,
    Config,
    Default,
}

impl fmt::Display for PathSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PathSource::Flag => "--db flag",
            PathSource::Env => DB_ENV,
            PathSource::Config => "config file",
            PathSource::Default => "default",
        };
        f.write_str(s)
    }
}

/// Picks the database path: flag, then environment, then config, then default.
pub fn choose_db_path(
    flag: Option<PathBuf>,
    env_value: Option<PathBuf>,
    config: &Config,
    default: PathBuf,
) -> (PathBuf, PathSource) {
    if let Some(p) = flag {
        return (p, PathSource::Flag);
    }
    if let Some(p) = env_value.filter(|p| !p.as_os_str().is_empty()) {
        return (p, PathSource::Env);
    }
    if let Some(p) = config.db_path.clone() {
        return (p, PathSource::Config);
    }
    (default, PathSource::Default)
}

/// Resolves the database path for this invocation. The config file is only
/// read when neither the flag nor the environment variable is set.
pub fn resolve_db_path(flag: Option<PathBuf>) -> Result<(PathBuf, PathSource)> {
    let env_value = env::var_os(DB_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    let config = if flag.is_some() || env_value.is_some() {
        Config::default()
    } else {
        Config::load_from(&config_path())?
    };
    Ok(choose_db_path(flag, env_value, &config, default_db_path()))
}

/// Checks that a database can be created at `db_path`: its directory is
/// created if needed and must accept a scratch file.
pub fn check_writable(db_path: &Path) -> Result<()> {
    let dir = match db_path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| TodoError::io(dir, e))?;
    let scratch = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| TodoError::Config(format!("{} is not writable: {}", dir.display(), e)))?;
    scratch
        .close()
        .map_err(|e| TodoError::io(dir, e))
}
