//! Site configuration.
//!
//! A single optional `config.toml` at the input root. Every option has a
//! default, so the file can be sparse or absent entirely; unknown keys are
//! rejected to catch typos early.
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! start_location = "menu/start"  # Adventure entry point (qualified name)
//! outline_marker = ";"           # Record marker in adventure scripts
//! gzip_min_bytes = 500           # Outputs this large get a .gz companion
//! recent_days = 7                # Window for `build --recent`
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Qualified name of the adventure start location.
    pub start_location: String,
    /// Marker character opening records in adventure scripts.
    pub outline_marker: char,
    /// Minimum output size, in bytes, that earns a gzip companion.
    pub gzip_min_bytes: u64,
    /// How far back `--recent` reaches, in days.
    pub recent_days: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            start_location: crate::adventure::DEFAULT_START.to_string(),
            outline_marker: crate::outline::DEFAULT_MARKER,
            gzip_min_bytes: crate::document::DEFAULT_GZIP_MIN_BYTES,
            recent_days: 7,
        }
    }
}

impl SiteConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_location.is_empty() {
            return Err(ConfigError::Validation(
                "start_location must not be empty".to_string(),
            ));
        }
        if self.outline_marker.is_alphanumeric() || self.outline_marker.is_whitespace() {
            return Err(ConfigError::Validation(format!(
                "outline_marker {:?} would be indistinguishable from body text",
                self.outline_marker
            )));
        }
        if self.recent_days == 0 {
            return Err(ConfigError::Validation(
                "recent_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load `config.toml` from the input root; defaults if the file is absent.
pub fn load_config(input_dir: &Path) -> Result<SiteConfig, ConfigError> {
    let path = input_dir.join("config.toml");
    let config = if path.exists() {
        toml::from_str(&fs::read_to_string(&path)?)?
    } else {
        SiteConfig::default()
    };
    config.validate()?;
    Ok(config)
}

/// A fully documented stock config, printed by `websmith gen-config`.
pub fn stock_config_toml() -> &'static str {
    r#"# websmith site configuration
# All options are optional - the values below are the defaults.

# Qualified name (<file>/<location>) of the location adventure games
# open at. The redirect index points here.
start_location = "menu/start"

# Marker character that opens a record in adventure scripts. Repeated
# N times it opens a record at depth N.
outline_marker = ";"

# Outputs at least this many bytes get a precompressed .gz companion
# next to them; smaller outputs have any stale companion removed.
gzip_min_bytes = 500

# `websmith build --recent` only processes documents modified within
# this many days.
recent_days = 7
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.start_location, "menu/start");
        assert_eq!(config.outline_marker, ';');
        assert_eq!(config.gzip_min_bytes, 500);
        assert_eq!(config.recent_days, 7);
    }

    #[test]
    fn sparse_config_overrides_only_named_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            "start_location = \"intro/first\"\n",
        )
        .unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.start_location, "intro/first");
        assert_eq!(config.outline_marker, ';');
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "start_loc = \"oops\"\n").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn alphanumeric_marker_is_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "outline_marker = \"a\"\n").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn stock_config_parses_to_defaults() {
        let parsed: SiteConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = SiteConfig::default();
        assert_eq!(parsed.start_location, defaults.start_location);
        assert_eq!(parsed.outline_marker, defaults.outline_marker);
        assert_eq!(parsed.gzip_min_bytes, defaults.gzip_min_bytes);
        assert_eq!(parsed.recent_days, defaults.recent_days);
    }
}
