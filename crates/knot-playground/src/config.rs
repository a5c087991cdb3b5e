//! Application configuration loaded from `knot-playground.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::pipeline::SecondaryTool;

/// File name looked up in the project root.
pub const CONFIG_FILE: &str = "knot-playground.toml";

const DEFAULT_ANALYSIS_DEBOUNCE_MS: u64 = 150;
const DEFAULT_AUTOSAVE_DEBOUNCE_MS: u64 = 500;
const DEFAULT_AUTOSAVE_PATH: &str = ".knot-playground/session.json";
const DEFAULT_SHARE_DIRECTORY: &str = ".knot-playground/shared";
const DEFAULT_LOG_FILTER: &str = "info";

/// Why `knot-playground.toml` could not be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file is not valid TOML or has the wrong shape.
    #[error("failed to parse {}: {}", CONFIG_FILE, .0)]
    Toml(#[from] toml::de::Error),

    /// `analysis.secondary_tool` names no known tool.
    #[error("invalid secondary tool: {0}")]
    SecondaryTool(String),
}

/// Playground configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaygroundConfig {
    /// Directory relative paths are resolved against.
    pub root: PathBuf,
    /// Config file path (if found).
    pub config_path: Option<PathBuf>,
    /// Analysis scheduling.
    pub analysis: AnalysisConfig,
    /// Local autosave.
    pub autosave: AutosaveConfig,
    /// Share storage.
    pub share: ShareConfig,
    /// Log filtering.
    pub logging: LoggingConfig,
}

/// `[analysis]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Quiet period before edits reach the analysis pipeline.
    pub debounce: Duration,
    /// Secondary tool active at startup.
    pub secondary_tool: Option<SecondaryTool>,
}

/// `[autosave]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutosaveConfig {
    /// Whether the session is written to `path` at all.
    pub enabled: bool,
    /// Quiet period before a snapshot is written.
    pub debounce: Duration,
    /// Snapshot file.
    pub path: PathBuf,
}

/// `[share]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareConfig {
    /// Directory holding shared snapshots.
    pub directory: PathBuf,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl PlaygroundConfig {
    /// Defaults for `root`.
    pub fn base(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            config_path: None,
            analysis: AnalysisConfig {
                debounce: Duration::from_millis(DEFAULT_ANALYSIS_DEBOUNCE_MS),
                secondary_tool: None,
            },
            autosave: AutosaveConfig {
                enabled: true,
                debounce: Duration::from_millis(DEFAULT_AUTOSAVE_DEBOUNCE_MS),
                path: root.join(DEFAULT_AUTOSAVE_PATH),
            },
            share: ShareConfig {
                directory: root.join(DEFAULT_SHARE_DIRECTORY),
            },
            logging: LoggingConfig {
                filter: DEFAULT_LOG_FILTER.to_string(),
            },
        }
    }

    /// Loads `knot-playground.toml` from `root`, falling back to defaults if
    /// the file is missing or unreadable.
    pub fn load(root: &Path) -> Self {
        let path = root.join(CONFIG_FILE);
        if !path.is_file() {
            return Self::base(root);
        }
        let Ok(contents) = std::fs::read_to_string(&path) else {
            warn!("Failed to read playground config at {}", path.display());
            return Self::base(root);
        };
        Self::from_contents(root, Some(path), &contents)
    }

    /// Parses `contents`, logging and falling back to defaults on error.
    pub fn from_contents(root: &Path, config_path: Option<PathBuf>, contents: &str) -> Self {
        match Self::parse(root, contents) {
            Ok(mut config) => {
                config.config_path = config_path;
                config
            }
            Err(err) => {
                match &config_path {
                    Some(path) => {
                        warn!("Failed to load playground config at {}: {err}", path.display());
                    }
                    None => warn!("Failed to load playground config: {err}"),
                }
                let mut config = Self::base(root);
                config.config_path = config_path;
                config
            }
        }
    }

    /// Parses `contents`, returning the first error.
    pub fn parse(root: &Path, contents: &str) -> Result<Self, ConfigError> {
        let parsed: ConfigFile = toml::from_str(contents)?;
        let mut config = Self::base(root);

        if let Some(ms) = parsed.analysis.debounce_ms {
            config.analysis.debounce = Duration::from_millis(ms);
        }
        config.analysis.secondary_tool = parsed
            .analysis
            .secondary_tool
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(ConfigError::SecondaryTool)?;

        if let Some(enabled) = parsed.autosave.enabled {
            config.autosave.enabled = enabled;
        }
        if let Some(ms) = parsed.autosave.debounce_ms {
            config.autosave.debounce = Duration::from_millis(ms);
        }
        if let Some(path) = parsed.autosave.path {
            config.autosave.path = resolve_path(root, &path);
        }
        if let Some(directory) = parsed.share.directory {
            config.share.directory = resolve_path(root, &directory);
        }
        if let Some(filter) = parsed.logging.filter {
            config.logging.filter = filter;
        }
        Ok(config)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    analysis: AnalysisSection,
    #[serde(default)]
    autosave: AutosaveSection,
    #[serde(default)]
    share: ShareSection,
    #[serde(default)]
    logging: LoggingSection,
}

#[derive(Debug, Default, Deserialize)]
struct AnalysisSection {
    debounce_ms: Option<u64>,
    secondary_tool: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AutosaveSection {
    enabled: Option<bool>,
    debounce_ms: Option<u64>,
    path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ShareSection {
    directory: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingSection {
    filter: Option<String>,
}

fn resolve_path(root: &Path, entry: &str) -> PathBuf {
    let path = PathBuf::from(entry);
    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}
