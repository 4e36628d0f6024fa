//! Core types for the SPN inventory library
//!
//! This module defines the error taxonomy and the input records the library
//! consumes. Catalog, analysis and export records live next to the code that
//! produces them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Timestamp type used throughout the library
pub type Timestamp = DateTime<Utc>;

/// Result type for library operations
pub type Result<T> = std::result::Result<T, InventoryError>;

/// Errors surfaced to callers of the library
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Failed to parse catalog: {0}")]
    CatalogParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A catalog record that violates the bit-field invariants
///
/// Reported once at catalog build time. The offending definition is
/// excluded from lookups; the rest of the catalog is unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum DefinitionError {
    #[error("SPN {spn}: start byte must be >= 1 (got {start_byte})")]
    InvalidStartByte { spn: u32, start_byte: u32 },

    #[error("SPN {spn}: start bit must be within 0..=7 (got {start_bit})")]
    InvalidStartBit { spn: u32, start_bit: u8 },

    #[error("SPN {spn}: bit length must be >= 1")]
    ZeroBitLength { spn: u32 },

    #[error("SPN {spn}: PGN columns disagree (decimal {decimal}, hex {hex})")]
    PgnMismatch { spn: u32, decimal: u32, hex: String },

    #[error("SPN {spn}: PGN '{token}' is not a valid PGN")]
    UnparseablePgn { spn: u32, token: String },

    /// Record that could not be read as a catalog row at all
    #[error("Catalog record #{index}: {reason}")]
    Malformed {
        index: usize,
        spn: Option<u32>,
        reason: String,
    },
}

impl DefinitionError {
    /// SPN number of the rejected definition, when it could be read
    pub fn spn(&self) -> Option<u32> {
        match self {
            DefinitionError::InvalidStartByte { spn, .. }
            | DefinitionError::InvalidStartBit { spn, .. }
            | DefinitionError::ZeroBitLength { spn }
            | DefinitionError::PgnMismatch { spn, .. }
            | DefinitionError::UnparseablePgn { spn, .. } => Some(*spn),
            DefinitionError::Malformed { spn, .. } => *spn,
        }
    }
}

/// Reverse-lookup query that is not a non-negative integer
///
/// Kept distinct from a lookup that parsed fine but matched nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupInputError {
    #[error("Enter an SPN number to search")]
    Empty,

    #[error("'{0}' is not a valid SPN number")]
    NotANumber(String),
}

/// A PGN token as it arrives from the upstream ingester
///
/// Ingesters emit either JSON numbers or free text ("0xF004", "F004",
/// "61444"); both are accepted and normalized later. Any other JSON value
/// (floats, negatives, null) is kept as `Other` and degrades during
/// normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PgnToken {
    Number(u64),
    Text(String),
    Other(serde_json::Value),
}

impl Default for PgnToken {
    fn default() -> Self {
        PgnToken::Other(serde_json::Value::Null)
    }
}

impl PgnToken {
    /// Textual form handed to the normalizer
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            PgnToken::Number(n) => Cow::Owned(n.to_string()),
            PgnToken::Text(s) => Cow::Borrowed(s.as_str()),
            PgnToken::Other(value) => Cow::Owned(value.to_string()),
        }
    }
}

impl fmt::Display for PgnToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<u32> for PgnToken {
    fn from(value: u32) -> Self {
        PgnToken::Number(u64::from(value))
    }
}

impl From<&str> for PgnToken {
    fn from(value: &str) -> Self {
        PgnToken::Text(value.to_string())
    }
}

/// One raw PGN observation (one bus message seen in the uploaded file)
///
/// Every other field the ingester attaches is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PgnObservation {
    #[serde(default)]
    pub pgn: PgnToken,
}

impl PgnObservation {
    pub fn new(pgn: impl Into<PgnToken>) -> Self {
        Self { pgn: pgn.into() }
    }
}

/// Everything known about one uploaded vehicle/file before analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleInput {
    /// Display name; derived from `source_file` when absent
    #[serde(default)]
    pub name: Option<String>,
    /// Brand; derived from the name when absent
    #[serde(default)]
    pub brand: Option<String>,
    /// Name of the uploaded file the observations came from
    #[serde(default)]
    pub source_file: String,
    /// When the file was uploaded (passed through untouched)
    #[serde(default)]
    pub uploaded_at: Option<Timestamp>,
    /// Raw PGN observations in file order, duplicates included
    #[serde(default)]
    pub observations: Vec<PgnObservation>,
}

impl VehicleInput {
    /// Create an input for a source file with no observations yet
    pub fn new(source_file: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            ..Self::default()
        }
    }

    /// Builder method: set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder method: set the brand
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    /// Builder method: append observations
    pub fn with_observations<I, T>(mut self, pgns: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<PgnToken>,
    {
        self.observations
            .extend(pgns.into_iter().map(PgnObservation::new));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pgn_token_deserializes_numbers_and_text() {
        let obs: Vec<PgnObservation> =
            serde_json::from_str(r#"[{"pgn": 61444}, {"pgn": "0xF004", "source": 3}]"#).unwrap();
        assert_eq!(obs[0].pgn, PgnToken::Number(61444));
        assert_eq!(obs[1].pgn, PgnToken::Text("0xF004".to_string()));
        assert_eq!(obs[0].pgn.as_text(), "61444");
    }

    #[test]
    fn test_odd_pgn_tokens_do_not_fail_the_document() {
        let input: VehicleInput = serde_json::from_str(
            r#"{"observations": [{"pgn": 61444}, {"pgn": 61443.0}, {"pgn": -5}, {"pgn": null}, {}]}"#,
        )
        .unwrap();
        assert_eq!(input.observations.len(), 5);
        assert_eq!(input.observations[0].pgn, PgnToken::Number(61444));
        assert_eq!(input.observations[1].pgn.as_text(), "61443.0");
        assert_eq!(input.observations[2].pgn.as_text(), "-5");
        assert_eq!(input.observations[3].pgn.as_text(), "null");
        assert_eq!(input.observations[4].pgn, PgnToken::default());
    }

    #[test]
    fn test_vehicle_input_builder() {
        let input = VehicleInput::new("daf_xf.csv")
            .with_name("DAF XF")
            .with_observations([61444u32, 61443]);
        assert_eq!(input.observations.len(), 2);
        assert_eq!(input.name.as_deref(), Some("DAF XF"));
        assert!(input.brand.is_none());
    }

    #[test]
    fn test_definition_error_reports_spn() {
        let err = DefinitionError::InvalidStartBit { spn: 190, start_bit: 9 };
        assert_eq!(err.spn(), Some(190));
        assert!(err.to_string().contains("0..=7"));

        let err = DefinitionError::Malformed {
            index: 3,
            spn: None,
            reason: "missing field `Bit_Length`".to_string(),
        };
        assert_eq!(err.spn(), None);
        assert!(err.to_string().starts_with("Catalog record #3"));
    }
}
