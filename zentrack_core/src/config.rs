//! Configuration file support for ZenTrack.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/zentrack/config.toml`.

use crate::{CalibrationSet, Error, ModelKind, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub assessment: AssessmentConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Classifier configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelConfig {
    /// `random_forest` or `svm`; validated when the engine is built
    #[serde(default = "default_model_kind")]
    pub kind: String,

    /// Artifact directory; defaults to `<data_dir>/models`
    #[serde(default)]
    pub artifact_dir: Option<PathBuf>,

    /// Replacement calibration table (CSV)
    #[serde(default)]
    pub calibration_csv: Option<PathBuf>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            kind: default_model_kind(),
            artifact_dir: None,
            calibration_csv: None,
        }
    }
}

/// Assessment parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssessmentConfig {
    /// Anxiety score fed to the classifier when the caller supplies none
    #[serde(default = "default_anxiety_score")]
    pub default_anxiety_score: u32,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            default_anxiety_score: default_anxiety_score(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| match std::env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(".local/share"),
        Err(_) => PathBuf::from("."),
    });
    base.join("zentrack")
}

fn default_model_kind() -> String {
    ModelKind::RandomForest.as_str().into()
}

fn default_anxiety_score() -> u32 {
    10
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| match std::env::var("HOME") {
            Ok(home) => PathBuf::from(home).join(".config"),
            Err(_) => PathBuf::from("."),
        });
        base.join("zentrack").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Parsed classifier kind
    pub fn model_kind(&self) -> Result<ModelKind> {
        self.model.kind.parse()
    }

    /// Directory holding persisted model artifacts
    pub fn artifact_dir(&self) -> PathBuf {
        self.model
            .artifact_dir
            .clone()
            .unwrap_or_else(|| self.data.data_dir.join("models"))
    }

    /// Assessment journal location
    pub fn journal_path(&self) -> PathBuf {
        self.data.data_dir.join("assessments.jsonl")
    }

    /// Calibration set to train on: the configured CSV or the built-in table
    pub fn calibration(&self) -> Result<Cow<'static, CalibrationSet>> {
        match &self.model.calibration_csv {
            Some(path) => Ok(Cow::Owned(CalibrationSet::from_csv(path)?)),
            None => Ok(Cow::Borrowed(CalibrationSet::synthetic())),
        }
    }
}
