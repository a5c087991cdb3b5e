//! Engine settings read from the reserved `knot.json` file.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Oldest supported Python version.
pub const MIN_PYTHON_VERSION: PythonVersion = PythonVersion::new(3, 7);
/// Newest supported Python version.
pub const MAX_PYTHON_VERSION: PythonVersion = PythonVersion::new(3, 13);

/// Settings text used for new sessions.
pub const DEFAULT_SETTINGS_TEXT: &str = r#"{
  "environment": {
    "python-version": "3.13"
  }
}"#;

/// Why settings text was rejected.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// JSON the settings schema rejects.
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    /// A section is not a JSON object.
    #[error("expected a JSON object for '{section}', found {found}")]
    NotAnObject {
        /// Offending section.
        section: &'static str,
        /// Kind of JSON value found instead.
        found: &'static str,
    },

    /// Well-formed but outside the supported range.
    #[error(
        "unsupported python-version '{version}' (expected {} through {})",
        MIN_PYTHON_VERSION,
        MAX_PYTHON_VERSION
    )]
    UnsupportedPythonVersion {
        /// The rejected version.
        version: PythonVersion,
    },
}

/// Parsed contents of the settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Settings {
    /// The `environment` section.
    #[serde(default)]
    pub environment: EnvironmentSettings,
}

/// The `environment` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct EnvironmentSettings {
    /// Target Python version. `None` leaves the choice to the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python_version: Option<PythonVersion>,
}

impl Settings {
    /// Parses settings text. Blank text means default settings.
    pub fn parse(text: &str) -> Result<Self, SettingsError> {
        if text.trim().is_empty() {
            return Ok(Settings::default());
        }
        let value: Value = serde_json::from_str(text)?;
        expect_object(&value, "knot.json")?;
        if let Some(environment) = value.get("environment") {
            expect_object(environment, "environment")?;
        }
        let settings = Settings::deserialize(value)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks constraints serde cannot express.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if let Some(version) = self.environment.python_version {
            if version < MIN_PYTHON_VERSION || version > MAX_PYTHON_VERSION {
                return Err(SettingsError::UnsupportedPythonVersion { version });
            }
        }
        Ok(())
    }
}

/// Serde's derived visitors also accept sequences, so arrays are refused
/// before deserializing.
fn expect_object(value: &Value, section: &'static str) -> Result<(), SettingsError> {
    let found = match value {
        Value::Object(_) => return Ok(()),
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
    };
    Err(SettingsError::NotAnObject { section, found })
}

/// A `major.minor` Python version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PythonVersion {
    /// Major version.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
}

impl PythonVersion {
    /// Creates `major.minor`.
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for PythonVersion {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("invalid python-version '{value}' (expected '<major>.<minor>')");
        let (major, minor) = value.split_once('.').ok_or_else(invalid)?;
        let major = major.parse().map_err(|_| invalid())?;
        let minor = minor.parse().map_err(|_| invalid())?;
        Ok(PythonVersion { major, minor })
    }
}

impl TryFrom<String> for PythonVersion {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PythonVersion> for String {
    fn from(value: PythonVersion) -> Self {
        value.to_string()
    }
}
