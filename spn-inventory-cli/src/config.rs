//! Configuration loading and parsing

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use spn_inventory::AnalysisConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
///
/// Every section is optional; command-line flags override file values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// SPN catalog snapshot (JSON)
    pub catalog: Option<PathBuf>,
    /// Vehicle observation documents analysed when none are given on the command line
    #[serde(default)]
    pub inputs: Vec<PathBuf>,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// Write reports here instead of stdout
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl AppConfig {
    /// Make relative paths relative to the directory holding the config file
    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let Some(catalog) = self.catalog.as_mut() {
            resolve(catalog);
        }
        self.inputs.iter_mut().for_each(resolve);
        if let Some(file) = self.output.file.as_mut() {
            resolve(file);
        }
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    if let Some(base) = path.parent() {
        config.resolve_paths(base);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            catalog = "j1939_catalog.json"
            inputs = ["volvo_fh.json", "daf_xf.json"]

            [analysis]
            parallel = false
            default_brand = "Other"

            [output]
            format = "json"
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.inputs.len(), 2);
        assert!(!config.analysis.parallel);
        assert_eq!(config.analysis.default_brand, "Other");
        // Unset analysis fields keep their defaults
        assert_eq!(config.analysis.display_precision, 3);
        assert_eq!(config.analysis.brand_for("volvo fh"), "Volvo");
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_empty_config() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(config.catalog.is_none());
        assert_eq!(config.output.format, OutputFormat::Text);
    }

    #[test]
    fn test_paths_resolve_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "catalog = \"catalog.json\"\ninputs = [\"/abs/vehicle.json\"]\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.catalog, Some(dir.path().join("catalog.json")));
        assert_eq!(config.inputs, vec![PathBuf::from("/abs/vehicle.json")]);
    }

    #[test]
    fn test_missing_config_file() {
        let err = load_config(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
