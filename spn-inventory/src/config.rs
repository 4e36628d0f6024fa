//! Analysis configuration types
//!
//! The engine needs very little configuration: how to name and brand vehicles
//! that arrive without that metadata, whether to fan a batch out across
//! threads, and how many decimals to show for physical values.

use serde::{Deserialize, Serialize};

/// Configuration for the aggregation engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Aggregate the vehicles of a batch in parallel
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Brand used when neither the input nor an alias supplies one
    #[serde(default = "default_brand")]
    pub default_brand: String,

    /// Keyword → brand table used to infer a brand from the vehicle name
    #[serde(default = "default_brand_aliases")]
    pub brand_aliases: Vec<BrandAlias>,

    /// Decimal places used when rendering physical values as text
    #[serde(default = "default_display_precision")]
    pub display_precision: u32,
}

fn default_true() -> bool {
    true
}

fn default_brand() -> String {
    "Unknown".to_string()
}

fn default_display_precision() -> u32 {
    3
}

fn default_brand_aliases() -> Vec<BrandAlias> {
    [
        ("daf", "DAF"),
        ("hino", "HINO"),
        ("volvo", "Volvo"),
        ("scania", "Scania"),
        ("mercedes", "Mercedes"),
        ("man", "MAN"),
        ("iveco", "Iveco"),
        ("kenworth", "Kenworth"),
        ("peterbilt", "Peterbilt"),
    ]
    .into_iter()
    .map(|(keyword, brand)| BrandAlias::new(keyword, brand))
    .collect()
}

/// Maps a keyword found in a vehicle name to a brand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandAlias {
    /// Case-insensitive word to look for in the vehicle name
    pub keyword: String,
    /// Brand reported when the keyword matches
    pub brand: String,
}

impl BrandAlias {
    pub fn new(keyword: impl Into<String>, brand: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            brand: brand.into(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            default_brand: default_brand(),
            brand_aliases: default_brand_aliases(),
            display_precision: default_display_precision(),
        }
    }
}

impl AnalysisConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: enable or disable parallel batch aggregation
    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    /// Builder method: set the fallback brand
    pub fn with_default_brand(mut self, brand: impl Into<String>) -> Self {
        self.default_brand = brand.into();
        self
    }

    /// Builder method: add a brand alias (checked after the existing ones)
    pub fn add_brand_alias(mut self, keyword: impl Into<String>, brand: impl Into<String>) -> Self {
        self.brand_aliases.push(BrandAlias::new(keyword, brand));
        self
    }

    /// Builder method: set display precision for physical values
    pub fn with_display_precision(mut self, places: u32) -> Self {
        self.display_precision = places;
        self
    }

    /// Infer a brand from a vehicle name
    ///
    /// The name is split into alphanumeric words and the first alias whose
    /// keyword equals one of them wins. Falls back to `default_brand`.
    pub fn brand_for(&self, name: &str) -> String {
        let words: Vec<String> = name
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();

        self.brand_aliases
            .iter()
            .find(|alias| {
                let keyword = alias.keyword.to_lowercase();
                words.iter().any(|w| *w == keyword)
            })
            .map(|alias| alias.brand.clone())
            .unwrap_or_else(|| self.default_brand.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_config_builder() {
        let config = AnalysisConfig::new()
            .with_parallel(false)
            .with_default_brand("N/A")
            .add_brand_alias("freightliner", "Freightliner")
            .with_display_precision(2);

        assert!(!config.parallel);
        assert_eq!(config.default_brand, "N/A");
        assert_eq!(config.display_precision, 2);
        assert_eq!(config.brand_for("Freightliner Cascadia"), "Freightliner");
    }

    #[test]
    fn test_brand_inference() {
        let config = AnalysisConfig::new();
        assert_eq!(config.brand_for("Volvo FH16 2019"), "Volvo");
        assert_eq!(config.brand_for("truck_MAN_tgx"), "MAN");
        // Substrings inside other words do not count
        assert_eq!(config.brand_for("Germany fleet 7"), "Unknown");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: AnalysisConfig = serde_json::from_str(r#"{"parallel": false}"#).unwrap();
        assert!(!config.parallel);
        assert_eq!(config.default_brand, "Unknown");
        assert_eq!(config.brand_aliases.len(), 9);
        assert_eq!(config.display_precision, 3);
    }
}
