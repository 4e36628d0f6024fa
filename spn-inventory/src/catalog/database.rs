//! SPN catalog
//!
//! Static reference data: PGN → ordered SPN definitions. Built once, never
//! mutated afterwards, and shared read-only by every aggregation run.

use crate::bitfield::SpnDecoder;
use crate::normalize::canonical_hex;
use crate::types::DefinitionError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single SPN definition as authored in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpnDefinition {
    /// Suspect Parameter Number
    pub spn: u32,
    /// Human-readable parameter name
    pub description: String,
    /// Engineering unit (e.g. "rpm", "km/h", "%")
    pub unit: Option<String>,
    /// Scale factor applied to the raw value
    pub resolution: Option<Decimal>,
    /// Additive term applied after scaling
    pub offset: Option<Decimal>,
    /// 1-based byte index of the first byte of the field
    pub start_byte: u32,
    /// Bit offset within `start_byte` (0..=7)
    #[serde(default)]
    pub start_bit: u8,
    /// Field width in bits
    pub bit_length: u32,
    /// Declared data length in bytes
    pub data_length_bytes: Option<u32>,
    /// Documented operating range
    pub min_value: Option<Decimal>,
    pub max_value: Option<Decimal>,
}

impl SpnDefinition {
    /// Create a definition with no scaling, starting at bit 0 of `start_byte`
    pub fn new(spn: u32, description: impl Into<String>, start_byte: u32, bit_length: u32) -> Self {
        Self {
            spn,
            description: description.into(),
            unit: None,
            resolution: None,
            offset: None,
            start_byte,
            start_bit: 0,
            bit_length,
            data_length_bytes: None,
            min_value: None,
            max_value: None,
        }
    }

    pub fn with_start_bit(mut self, start_bit: u8) -> Self {
        self.start_bit = start_bit;
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_scaling(mut self, resolution: Decimal, offset: Decimal) -> Self {
        self.resolution = Some(resolution);
        self.offset = Some(offset);
        self
    }
}

/// A PGN with its SPNs in catalog authoring order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PgnEntry {
    pub pgn_decimal: u32,
    /// Always the same number as `pgn_decimal`
    pub pgn_hex: String,
    pub pgn_name: Option<String>,
    pub spns: Vec<SpnDefinition>,
}

impl PgnEntry {
    fn new(pgn: u32, pgn_name: Option<String>) -> Self {
        Self {
            pgn_decimal: pgn,
            pgn_hex: canonical_hex(pgn),
            pgn_name,
            spns: Vec::new(),
        }
    }
}

/// The SPN catalog
#[derive(Debug, Clone, Default)]
pub struct SpnCatalog {
    /// PGN entries in first-seen order
    entries: Vec<PgnEntry>,

    /// Key: PGN, Value: index into `entries`
    pgn_lookup: HashMap<u32, usize>,

    /// Key: SPN, Value: (entry index, SPN index) of its first occurrence
    spn_lookup: HashMap<u32, (usize, usize)>,

    /// Definitions rejected at build time
    rejected: Vec<DefinitionError>,
}

impl SpnCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition under `pgn`
    ///
    /// Definitions that fail the bit-field invariants are recorded in
    /// [`SpnCatalog::rejected`] and left out of every lookup.
    pub fn add_definition(
        &mut self,
        pgn: u32,
        pgn_name: Option<String>,
        definition: SpnDefinition,
    ) -> Result<(), DefinitionError> {
        if let Err(e) = SpnDecoder::validate(&definition) {
            log::warn!("Rejecting catalog definition under PGN {}: {}", pgn, e);
            self.rejected.push(e.clone());
            return Err(e);
        }

        if definition.offset.is_some() && definition.resolution.is_none() {
            log::warn!(
                "SPN {} has an offset but no resolution; physical values will be unavailable",
                definition.spn
            );
        }

        let entry_idx = match self.pgn_lookup.get(&pgn) {
            Some(idx) => *idx,
            None => {
                self.entries.push(PgnEntry::new(pgn, None));
                let idx = self.entries.len() - 1;
                self.pgn_lookup.insert(pgn, idx);
                idx
            }
        };

        if let Some((other_idx, _)) = self.spn_lookup.get(&definition.spn) {
            if *other_idx != entry_idx {
                log::warn!(
                    "SPN {} appears under PGN {} and PGN {}; reverse lookups use the first",
                    definition.spn,
                    self.entries[*other_idx].pgn_decimal,
                    pgn
                );
            }
        }

        let entry = &mut self.entries[entry_idx];
        if entry.pgn_name.is_none() {
            entry.pgn_name = pgn_name;
        }

        let spn_idx = entry.spns.len();
        self.spn_lookup
            .entry(definition.spn)
            .or_insert((entry_idx, spn_idx));
        entry.spns.push(definition);
        Ok(())
    }

    /// Record a definition that was rejected before it reached the catalog
    pub(crate) fn reject(&mut self, error: DefinitionError) {
        self.rejected.push(error);
    }

    /// Get the entry for a PGN
    pub fn get_pgn(&self, pgn: u32) -> Option<&PgnEntry> {
        self.pgn_lookup.get(&pgn).map(|idx| &self.entries[*idx])
    }

    /// Find the first PGN carrying an SPN, with the definition
    pub fn find_spn(&self, spn: u32) -> Option<(&PgnEntry, &SpnDefinition)> {
        self.spn_lookup.get(&spn).map(|(entry_idx, spn_idx)| {
            let entry = &self.entries[*entry_idx];
            (entry, &entry.spns[*spn_idx])
        })
    }

    /// All entries in first-seen order
    pub fn entries(&self) -> &[PgnEntry] {
        &self.entries
    }

    /// Definitions rejected while building
    pub fn rejected(&self) -> &[DefinitionError] {
        &self.rejected
    }

    /// Get catalog statistics
    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            num_pgns: self.entries.len(),
            num_spns: self.entries.iter().map(|e| e.spns.len()).sum(),
            num_unique_spns: self.spn_lookup.len(),
            num_rejected: self.rejected.len(),
        }
    }
}

/// Catalog statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    /// Number of PGNs with at least one valid definition
    pub num_pgns: usize,
    /// Number of valid definitions
    pub num_spns: usize,
    /// Number of distinct SPN numbers
    pub num_unique_spns: usize,
    /// Number of rejected definitions
    pub num_rejected: usize,
}
