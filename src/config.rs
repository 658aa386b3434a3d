use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::{ConfigError, Result},
    template::{Template, TemplateRegistry},
    version::VersionManager,
};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "SHOTPATH_CONFIG";

/// Environment variable selecting a built-in template registry when no
/// configuration file is given.
pub const MODE_ENV: &str = "SHOTPATH_MODE";

/// Which built-in template registry is active. Chosen once at startup by the
/// host environment; never switched mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Full studio layout: project root, render_master tree, camera exports.
    Studio,
    /// Flat per-project layout for standalone work.
    Local,
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, ConfigError> {
        match s.to_ascii_lowercase().as_str() {
            "studio" => Ok(Self::Studio),
            "local" => Ok(Self::Local),
            other => Err(ConfigError::UnknownMode {
                mode: other.to_string(),
            }),
        }
    }
}

/// Main configuration for the shotpath engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Template registry: template id -> path pattern
    pub templates: BTreeMap<String, String>,

    /// Version directory naming and contention policy
    pub versions: VersionConfig,
}

/// Version directory settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionConfig {
    /// Fixed prefix of version directory names
    pub prefix: String,

    /// Zero-padded digit width used when creating version directories
    pub padding: usize,

    /// Bounded retry count for contended version creation
    pub max_retries: usize,
}

impl Default for VersionConfig {
    fn default() -> Self {
        Self {
            prefix: "v".to_string(),
            padding: 3,
            max_retries: 32,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::for_mode(Mode::Studio)
    }
}

impl Config {
    /// Built-in configuration for a pipeline mode.
    pub fn for_mode(mode: Mode) -> Self {
        let templates: &[(&str, &str)] = match mode {
            Mode::Studio => &[
                (
                    "render",
                    "{root}/render/render_master/{project}/{shot}/{task}/v{version:03}/{shot}_{task}.{frame:04}.{ext}",
                ),
                (
                    "task",
                    "{root}/render/render_master/{project}/{shot}/{task}/v{version:03}",
                ),
                (
                    "camera",
                    "{root}/render/render_master/{project}/{shot}/cam/v{version:03}/{shot}_camera.abc",
                ),
            ],
            Mode::Local => &[
                (
                    "render",
                    "{project}/{shot}/{task}/v{version:03}/{frame:04}.{ext}",
                ),
                ("task", "{project}/{shot}/{task}/v{version:03}"),
            ],
        };

        Self {
            templates: templates
                .iter()
                .map(|(id, raw)| (id.to_string(), raw.to_string()))
                .collect(),
            versions: VersionConfig::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|_| ConfigError::ParseFailed {
            path: path.display().to_string(),
        })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            key: "config".to_string(),
            value: e.to_string(),
        })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Initialize from the host environment: an explicit file named by
    /// `SHOTPATH_CONFIG` wins; otherwise `SHOTPATH_MODE` picks a built-in
    /// registry, defaulting to studio.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            info!("Loading configuration from {} ({})", path, CONFIG_ENV);
            return Self::from_file(&path);
        }

        let mode = match std::env::var(MODE_ENV) {
            Ok(value) => value.parse()?,
            Err(_) => Mode::Studio,
        };
        info!("Using built-in {:?} configuration", mode);
        Ok(Self::for_mode(mode))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.templates.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "templates".to_string(),
                value: "empty".to_string(),
            }
            .into());
        }

        for (id, raw) in &self.templates {
            Template::parse(id, raw)?;
        }

        if self.versions.prefix.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "versions.prefix".to_string(),
                value: "empty".to_string(),
            }
            .into());
        }

        if !(1..=6).contains(&self.versions.padding) {
            return Err(ConfigError::InvalidValue {
                key: "versions.padding".to_string(),
                value: self.versions.padding.to_string(),
            }
            .into());
        }

        if self.versions.max_retries == 0 {
            return Err(ConfigError::InvalidValue {
                key: "versions.max_retries".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Build the read-only template registry from this configuration.
    pub fn registry(&self) -> Result<TemplateRegistry> {
        TemplateRegistry::from_strings(
            self.templates.iter().map(|(id, raw)| (id.as_str(), raw.as_str())),
        )
    }

    /// Build the version manager this configuration describes.
    pub fn version_manager(&self) -> VersionManager {
        VersionManager::new(
            self.versions.prefix.clone(),
            self.versions.padding,
            self.versions.max_retries,
        )
    }
}
