//! JSON catalog snapshot loader
//!
//! Reads the flat parameter-definition table (one record per SPN, using the
//! J1939-71 column names) and groups it into an [`SpnCatalog`].

use crate::catalog::database::{SpnCatalog, SpnDefinition};
use crate::normalize::normalize_pgn;
use crate::types::{DefinitionError, InventoryError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// One row of the parameter-definition table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    #[serde(rename = "SPN_Number")]
    pub spn: u32,
    #[serde(rename = "PGN_DEC", default)]
    pub pgn_decimal: Option<u32>,
    #[serde(rename = "PGN_HEX", default)]
    pub pgn_hex: Option<String>,
    #[serde(rename = "PGN_Name", default)]
    pub pgn_name: Option<String>,
    #[serde(rename = "SPN_Description", default)]
    pub description: String,
    #[serde(rename = "Unit", default)]
    pub unit: Option<String>,
    #[serde(rename = "Data_Length_Bytes", default)]
    pub data_length_bytes: Option<u32>,
    #[serde(rename = "Start_Byte")]
    pub start_byte: u32,
    #[serde(rename = "Start_Bit", default)]
    pub start_bit: u8,
    #[serde(rename = "Bit_Length")]
    pub bit_length: u32,
    #[serde(rename = "Resolution", default)]
    pub resolution: Option<Decimal>,
    #[serde(rename = "Offset", default)]
    pub offset: Option<Decimal>,
    #[serde(rename = "Min_Value", default)]
    pub min_value: Option<Decimal>,
    #[serde(rename = "Max_Value", default)]
    pub max_value: Option<Decimal>,
}

impl CatalogRecord {
    /// Resolve the PGN from the decimal and/or hex column
    fn resolve_pgn(&self) -> std::result::Result<u32, DefinitionError> {
        let from_hex = match self.pgn_hex.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => {
                let normalized = normalize_pgn(token);
                let value = normalized
                    .value()
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(|| DefinitionError::UnparseablePgn {
                        spn: self.spn,
                        token: token.to_string(),
                    })?;
                Some(value)
            }
            _ => None,
        };

        match (self.pgn_decimal, from_hex) {
            (Some(decimal), Some(hex)) if decimal != hex => Err(DefinitionError::PgnMismatch {
                spn: self.spn,
                decimal,
                hex: self.pgn_hex.clone().unwrap_or_default(),
            }),
            (Some(decimal), _) => Ok(decimal),
            (None, Some(hex)) => Ok(hex),
            (None, None) => Err(DefinitionError::UnparseablePgn {
                spn: self.spn,
                token: String::new(),
            }),
        }
    }

    fn into_definition(self) -> SpnDefinition {
        SpnDefinition {
            spn: self.spn,
            description: self.description,
            unit: self.unit.filter(|u| !u.trim().is_empty()),
            resolution: self.resolution,
            offset: self.offset,
            start_byte: self.start_byte,
            start_bit: self.start_bit,
            bit_length: self.bit_length,
            data_length_bytes: self.data_length_bytes,
            min_value: self.min_value,
            max_value: self.max_value,
        }
    }
}

impl SpnCatalog {
    /// Build a catalog from parameter records, in order
    ///
    /// Bad records are rejected one by one; see [`SpnCatalog::rejected`].
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = CatalogRecord>,
    {
        Self::from_parsed(records.into_iter().map(Ok))
    }

    fn from_parsed<I>(records: I) -> Self
    where
        I: IntoIterator<Item = std::result::Result<CatalogRecord, DefinitionError>>,
    {
        let mut catalog = SpnCatalog::new();

        for record in records {
            let resolved = record.and_then(|r| r.resolve_pgn().map(|pgn| (pgn, r)));
            let (pgn, record) = match resolved {
                Ok(resolved) => resolved,
                Err(e) => {
                    log::warn!("Rejecting catalog record: {}", e);
                    catalog.reject(e);
                    continue;
                }
            };
            let pgn_name = record.pgn_name.clone();
            // Validation failures are recorded by the catalog itself
            let _ = catalog.add_definition(pgn, pgn_name, record.into_definition());
        }

        let stats = catalog.stats();
        log::info!(
            "Catalog built: {} PGNs, {} SPNs, {} rejected",
            stats.num_pgns,
            stats.num_spns,
            stats.num_rejected
        );
        catalog
    }

    /// Parse a JSON array of parameter records
    ///
    /// Only a document that is not a JSON array fails; a record with
    /// missing or mistyped fields is rejected as [`DefinitionError::Malformed`].
    pub fn from_json_str(content: &str) -> Result<Self> {
        let values: Vec<Value> = serde_json::from_str(content)
            .map_err(|e| InventoryError::CatalogParse(e.to_string()))?;

        let records = values.into_iter().enumerate().map(|(index, value)| {
            let spn = value
                .get("SPN_Number")
                .and_then(Value::as_u64)
                .and_then(|v| u32::try_from(v).ok());
            serde_json::from_value::<CatalogRecord>(value).map_err(|e| DefinitionError::Malformed {
                index,
                spn,
                reason: e.to_string(),
            })
        });
        Ok(Self::from_parsed(records))
    }

    /// Load a catalog snapshot from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        log::info!("Loading SPN catalog: {:?}", path);

        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content).map_err(|e| match e {
            InventoryError::CatalogParse(msg) => {
                InventoryError::CatalogParse(format!("{:?}: {}", path, msg))
            }
            other => other,
        })
    }
}
