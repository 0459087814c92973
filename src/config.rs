//! A module for loading and validating the analysis configuration.
//!
//! The configuration is optional. It tunes the histogram that is written next to
//! the statistics and overrides or extends the built-in material table. YAML and
//! TOML files are accepted:
//!
//! ```yaml
//! histogram:
//!   bins: 40
//! materials:
//!   titanium:
//!     yield_stress: 880.0
//!     ultimate_stress: 950.0
//! ```

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::material::{MaterialLimits, MaterialTable};

/// Represents the configuration of a stress analysis run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub histogram: HistogramConfig,
    /// Entries replacing or extending the built-in material table.
    pub materials: BTreeMap<String, MaterialLimits>,
}

impl Config {
    /// Validates the entire configuration.
    pub fn validate(&self) -> Result<()> {
        self.histogram.validate()?;
        self.material_table()?;
        Ok(())
    }

    /// The built-in material table with the configured entries applied.
    pub fn material_table(&self) -> Result<MaterialTable> {
        MaterialTable::builtin().with_overrides(&self.materials)
    }
}

/// Settings of the stress histogram image.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistogramConfig {
    /// Number of equal-width bins between the smallest and largest stress.
    pub bins: usize,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        HistogramConfig {
            bins: 50,
            width: 1000,
            height: 600,
        }
    }
}

impl HistogramConfig {
    /// Validates the histogram settings.
    ///
    /// At least one bin is required and the image must be large enough to hold
    /// the axes and the legend (200 x 150 pixels).
    pub fn validate(&self) -> Result<()> {
        if self.bins == 0 {
            return Err(anyhow!("bins must be greater than 0, got {}", self.bins));
        }
        if self.width < 200 {
            return Err(anyhow!("width must be at least 200, got {}", self.width));
        }
        if self.height < 150 {
            return Err(anyhow!("height must be at least 150, got {}", self.height));
        }
        Ok(())
    }
}

/// Loads the configuration from a YAML (`.yaml`, `.yml`) or TOML (`.toml`) file.
///
/// # Errors
///
/// This function will return an error if the extension is not recognized, or if
/// reading or parsing the configuration file fails.
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<Config> {
    let path = config_path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration {}", path.display()))?;

    let config: Config = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&content)
            .with_context(|| format!("invalid YAML in {}", path.display()))?,
        "toml" => toml::from_str(&content)
            .with_context(|| format!("invalid TOML in {}", path.display()))?,
        _ => {
            return Err(anyhow!(
                "configuration {} must be a .yaml, .yml or .toml file",
                path.display()
            ))
        }
    };
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("create temp config");
        file.write_all(contents.as_bytes()).expect("write temp config");
        file
    }

    #[test]
    fn test_load_config() {
        let config_path = "tests/config.yaml";
        let config = load_config(config_path).expect("Failed to load config");
        assert!(config.validate().is_ok(), "Expected Ok(()) but got Err with {:?}", config.validate());
        assert_eq!(config.histogram.bins, 40);
        let table = config.material_table().expect("valid table");
        assert_eq!(table.get("titanium"), Some(MaterialLimits::new(880.0, 950.0)));
        assert_eq!(table.get("bone"), Some(MaterialLimits::new(80.0, 120.0)));
    }

    #[test]
    fn test_yaml_and_toml_agree() {
        let yaml = write_config(
            ".yml",
            "histogram:\n  bins: 20\nmaterials:\n  peek:\n    yield_stress: 100\n    ultimate_stress: 110\n",
        );
        let toml = write_config(
            ".toml",
            "[histogram]\nbins = 20\n\n[materials.peek]\nyield_stress = 100.0\nultimate_stress = 110.0\n",
        );
        let from_yaml = load_config(yaml.path()).expect("yaml loads");
        let from_toml = load_config(toml.path()).expect("toml loads");
        assert_eq!(from_yaml, from_toml);
        assert_eq!(from_yaml.histogram.width, 1000, "unset keys keep their defaults");
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let file = write_config(".yaml", "{}\n");
        assert_eq!(load_config(file.path()).expect("loads"), Config::default());
    }

    #[test]
    fn test_rejects_unknown_keys_and_extensions() {
        let file = write_config(".yaml", "histogram:\n  buckets: 10\n");
        assert!(load_config(file.path()).is_err());

        let file = write_config(".json", "{}");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains(".toml"), "{err}");
    }

    #[test]
    fn test_validate_histogram_and_materials() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.histogram.bins = 0;
        assert!(config.validate().is_err());

        config.histogram = HistogramConfig::default();
        config
            .materials
            .insert("bone".into(), MaterialLimits::new(-1.0, 120.0));
        assert!(config.validate().is_err());
    }
}
