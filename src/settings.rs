//! File-backed settings. Every field has a default so an absent or partial
//! TOML file is valid; environment overrides are layered on top by
//! [`crate::config::AnalyticsConfig::resolve`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub analytics: AnalyticsSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsSettings {
    pub currency: String,
    pub display_dp: u32,
    pub log_format: String,
    pub snapshot_path: Option<String>,
    pub enquiry_id_prefix: String,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            currency: "SAR".to_string(),
            display_dp: 2,
            log_format: "pretty".to_string(),
            snapshot_path: None,
            enquiry_id_prefix: "ENQ".to_string(),
        }
    }
}

impl Settings {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&raw)
    }

    /// Load `path` if given, otherwise defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::Settings;
    use crate::error::ConfigError;

    #[test]
    fn partial_file_keeps_defaults() {
        let settings = Settings::from_toml_str("[analytics]\ncurrency = \"USD\"\n").expect("parse");
        assert_eq!(settings.analytics.currency, "USD");
        assert_eq!(settings.analytics.display_dp, 2);
        assert_eq!(settings.analytics.enquiry_id_prefix, "ENQ");
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "[analytics]\ndisplay_dp = 0\nlog_format = \"json\"").expect("write");
        let settings = Settings::load(file.path()).expect("load");
        assert_eq!(settings.analytics.display_dp, 0);
        assert_eq!(settings.analytics.log_format, "json");
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let err = Settings::from_toml_str("[analytics\n").expect_err("bad toml");
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
