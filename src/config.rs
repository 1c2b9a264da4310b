//! Configuration: optional `tickets.toml`, overridden by command-line flags.
//!
//! The file is looked up in this order: `--config`, the `TICKETS_TUI_CONFIG`
//! environment variable, then `tickets.toml` in the working directory and
//! each of its ancestors. Every field is optional.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    error::ConfigError,
    input::{Action, SWIPE_THRESHOLD},
    loader::TICKETS_URL,
    net::Origin,
    ui::ThemeKind,
    worker::{default_manifest, WorkerConfig, DEFAULT_CACHE_NAME},
};

pub const CONFIG_FILE_NAME: &str = "tickets.toml";
pub const CONFIG_ENV: &str = "TICKETS_TUI_CONFIG";
const APP_DIR: &str = "tickets-tui";

/// Raw contents of `tickets.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// HTTP base URL or directory holding `tickets.json` and the page assets.
    pub origin: Option<String>,
    pub data_file: Option<String>,
    pub storage_path: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub cache_name: Option<String>,
    pub manifest: Option<Vec<String>>,
    pub swipe_threshold: Option<f64>,
    pub theme: Option<ThemeKind>,
    pub offline_cache: Option<bool>,
    /// Extra single-character bindings: `f = "flip"`.
    pub keys: HashMap<String, String>,
}

impl FileConfig {
    pub fn parse(s: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let s = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&s, path)
    }
}

/// Command-line values that win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub origin: Option<String>,
    pub theme: Option<ThemeKind>,
    pub no_cache: bool,
}

/// Fully resolved settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub origin: Origin,
    pub data_file: String,
    pub storage_path: PathBuf,
    pub cache_dir: PathBuf,
    pub cache_name: String,
    pub manifest: Vec<String>,
    pub swipe_threshold: f64,
    pub theme: ThemeKind,
    pub offline_cache: bool,
    pub keymap: HashMap<char, Action>,
}

/// `<local data dir>/tickets-tui`, or `./.tickets-tui` when the platform has none.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(format!(".{APP_DIR}")))
}

/// Finds the config file to use, if any.
pub fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }
    if let Ok(p) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(p));
    }
    let cwd = std::env::current_dir().ok()?;
    cwd.ancestors()
        .map(|anc| anc.join(CONFIG_FILE_NAME))
        .find(|p| p.exists())
}

fn parse_keymap(map: &HashMap<String, String>) -> HashMap<char, Action> {
    let mut out = HashMap::new();
    for (k, v) in map {
        let mut chars = k.chars();
        match (chars.next(), chars.next(), Action::from_name(v)) {
            (Some(ch), None, Some(action)) => {
                out.insert(ch, action);
            }
            _ => warn!(key = %k, action = %v, "ignoring key binding"),
        }
    }
    out
}

impl Config {
    /// Loads the config file (if any) and applies `overrides`.
    pub fn load(explicit: Option<&Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
        let file = match find_config_file(explicit) {
            Some(path) => {
                debug!(path = %path.display(), "loading config");
                FileConfig::from_path(&path)?
            }
            None => FileConfig::default(),
        };
        Self::resolve(file, overrides)
    }

    pub fn resolve(file: FileConfig, overrides: &Overrides) -> Result<Self, ConfigError> {
        let data_dir = default_data_dir();
        let origin_str = overrides
            .origin
            .clone()
            .or(file.origin)
            .unwrap_or_else(|| ".".into());
        let origin = Origin::parse(&origin_str)?;

        let swipe_threshold = file.swipe_threshold.unwrap_or(SWIPE_THRESHOLD);
        if !(swipe_threshold.is_finite() && swipe_threshold > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "swipe_threshold must be positive, got {swipe_threshold}"
            )));
        }
        let cache_name = file.cache_name.unwrap_or_else(|| DEFAULT_CACHE_NAME.into());
        if cache_name.is_empty() || cache_name.contains(&['/', '\\'][..]) {
            return Err(ConfigError::Invalid(format!("bad cache_name {cache_name:?}")));
        }

        Ok(Self {
            origin,
            data_file: file.data_file.unwrap_or_else(|| TICKETS_URL.into()),
            storage_path: file
                .storage_path
                .unwrap_or_else(|| data_dir.join("storage.json")),
            cache_dir: file.cache_dir.unwrap_or_else(|| data_dir.join("caches")),
            cache_name,
            manifest: file.manifest.unwrap_or_else(default_manifest),
            swipe_threshold,
            theme: overrides.theme.or(file.theme).unwrap_or(ThemeKind::Dark),
            offline_cache: !overrides.no_cache && file.offline_cache.unwrap_or(true),
            keymap: parse_keymap(&file.keys),
        })
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            cache_name: self.cache_name.clone(),
            manifest: self.manifest.clone(),
            cache_dir: self.cache_dir.clone(),
        }
    }

    /// Log file next to the storage file.
    pub fn log_path(&self) -> PathBuf {
        self.storage_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .join("tickets-tui.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Command;

    #[test]
    fn defaults() {
        let c = Config::resolve(FileConfig::default(), &Overrides::default()).unwrap();
        assert_eq!(c.origin, Origin::Dir(PathBuf::from(".")));
        assert_eq!(c.data_file, "./tickets.json");
        assert_eq!(c.cache_name, "spe-tickets-v1");
        assert_eq!(c.manifest.len(), 8);
        assert!(c.offline_cache);
        assert_eq!(c.theme, ThemeKind::Dark);
        assert!((c.swipe_threshold - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn file_values_and_overrides() {
        let toml = r#"
            origin = "https://example.org/spe/"
            cache_name = "spe-tickets-v2"
            swipe_threshold = 30.0
            theme = "light"
            storage_path = "/tmp/x/storage.json"

            [keys]
            f = "flip"
            n = "advance"
            zz = "flip"
            k = "dance"
        "#;
        let file = FileConfig::parse(toml, Path::new("tickets.toml")).unwrap();
        let c = Config::resolve(
            file.clone(),
            &Overrides {
                origin: Some("site".into()),
                no_cache: true,
                ..Overrides::default()
            },
        )
        .unwrap();
        assert_eq!(c.origin, Origin::Dir(PathBuf::from("site")));
        assert_eq!(c.cache_name, "spe-tickets-v2");
        assert_eq!(c.theme, ThemeKind::Light);
        assert!(!c.offline_cache);
        assert_eq!(c.keymap.len(), 2);
        assert_eq!(c.keymap[&'f'], Action::Card(Command::Flip));
        assert_eq!(c.log_path(), PathBuf::from("/tmp/x/tickets-tui.log"));

        let c = Config::resolve(file, &Overrides::default()).unwrap();
        assert!(matches!(c.origin, Origin::Http(_)));
    }

    #[test]
    fn rejects_bad_values() {
        let file = FileConfig {
            swipe_threshold: Some(0.0),
            ..FileConfig::default()
        };
        assert!(Config::resolve(file, &Overrides::default()).is_err());
        let file = FileConfig {
            cache_name: Some("../up".into()),
            ..FileConfig::default()
        };
        assert!(Config::resolve(file, &Overrides::default()).is_err());
        assert!(FileConfig::parse("theme = 3", Path::new("x.toml")).is_err());
    }
}
