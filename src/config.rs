use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::module_id::IdentifierRules;
use crate::watcher::BatchPolicy;

/// File name looked up at the project root.
pub const CONFIG_FILE: &str = "ext-reload.toml";

/// Configuration loaded from `ext-reload.toml` at the project root.
///
/// Every field is optional; command-line flags take precedence.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ReloaderConfig {
    /// Files and directories to track, relative to the project root.
    pub paths: Option<Vec<PathBuf>>,
    /// Files and directories to exclude from tracking.
    pub ignore: Option<Vec<PathBuf>>,
    /// Tracked source extension without the dot (default `py`).
    pub extension: Option<String>,
    /// Namespace separator for module identifiers (default `.`).
    pub separator: Option<String>,
    /// Directory names whose events are never acted on (default `__pycache__`).
    pub artifact_dirs: Option<Vec<String>>,
    pub batch: Option<BatchPolicy>,
    pub debounce_ms: Option<u64>,
    pub debug: bool,
    pub commands: CommandsConfig,
    pub logging: LoggingConfig,
}

/// Shell commands the binary runs to load or reload a unit.
///
/// `{module}` is replaced by the identifier; it is also exported as
/// `EXT_RELOAD_MODULE`.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CommandsConfig {
    pub load: Option<String>,
    pub reload: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level for everything (`error`, `warn`, `info`, `debug`, `trace`).
    pub default: String,
    /// Per-target overrides, e.g. `ext_reload = "debug"`.
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: "warn".to_string(),
            modules: BTreeMap::new(),
        }
    }
}

impl ReloaderConfig {
    /// Load configuration from `ext-reload.toml` in the given root directory.
    ///
    /// Returns a default (empty) configuration if the file does not exist or cannot be parsed.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    eprintln!("warning: failed to parse {CONFIG_FILE}: {err}. Using defaults.");
                    Self::default()
                }
            },
            Err(err) => {
                eprintln!("warning: failed to read {CONFIG_FILE}: {err}. Using defaults.");
                Self::default()
            }
        }
    }

    /// Identifier rules with defaults filled in.
    pub fn rules(&self) -> IdentifierRules {
        let defaults = IdentifierRules::default();
        IdentifierRules {
            extension: self.extension.clone().unwrap_or(defaults.extension),
            separator: self.separator.clone().unwrap_or(defaults.separator),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ReloaderConfig::load(dir.path());
        assert!(config.paths.is_none());
        assert!(!config.debug);
        assert_eq!(config.rules(), IdentifierRules::default());
        assert_eq!(config.logging.default, "warn");
    }

    #[test]
    fn test_full_file_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"
paths = ["cogs", "extra/tools.py"]
ignore = ["cogs/__init__.py"]
extension = "lua"
separator = "/"
artifact_dirs = ["__pycache__", "build"]
batch = "first"
debounce_ms = 200
debug = true

[commands]
load = "host-cli load {module}"
reload = "host-cli reload {module}"

[logging]
default = "info"

[logging.modules]
ext_reload = "debug"
"#,
        )
        .unwrap();

        let config = ReloaderConfig::load(dir.path());
        assert_eq!(
            config.paths,
            Some(vec![PathBuf::from("cogs"), PathBuf::from("extra/tools.py")])
        );
        assert_eq!(config.ignore, Some(vec![PathBuf::from("cogs/__init__.py")]));
        assert_eq!(config.rules().extension, "lua");
        assert_eq!(config.rules().separator, "/");
        assert_eq!(config.batch, Some(BatchPolicy::FirstEvent));
        assert_eq!(config.debounce_ms, Some(200));
        assert!(config.debug);
        assert_eq!(config.commands.load.as_deref(), Some("host-cli load {module}"));
        assert_eq!(config.logging.default, "info");
        assert_eq!(config.logging.modules.get("ext_reload").map(String::as_str), Some("debug"));
    }

    #[test]
    fn test_batch_all_is_parsed() {
        let config: ReloaderConfig = toml::from_str(r#"batch = "all""#).unwrap();
        assert_eq!(config.batch, Some(BatchPolicy::All));
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "paths = 42").unwrap();
        let config = ReloaderConfig::load(dir.path());
        assert!(config.paths.is_none());
    }
}
