//! Aggregation engine
//!
//! Turns per-vehicle raw PGN observations into [`VehicleAnalysis`] records:
//! message counts, distinct PGNs, and the deduplicated list of SPNs those
//! PGNs carry according to the catalog.

use crate::bitfield::{
    BitRange, DecodedField, LinearTransform, PhysicalRange, PhysicalValue, SpnDecoder,
};
use crate::catalog::{PgnEntry, SpnCatalog, SpnDefinition};
use crate::config::AnalysisConfig;
use crate::normalize::{normalize_pgn, NormalizedPgn};
use crate::types::{Timestamp, VehicleInput};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

/// One SPN observed on a vehicle, with its decoded bit field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpnDetail {
    /// PGN that contributed this SPN
    pub pgn: u32,
    pub pgn_hex: String,
    #[serde(flatten)]
    pub definition: SpnDefinition,
    pub bit_range: BitRange,
    pub transform: Option<LinearTransform>,
    pub physical_range: Option<PhysicalRange>,
}

impl SpnDetail {
    fn new(entry: &PgnEntry, definition: &SpnDefinition) -> Self {
        let DecodedField {
            bit_range,
            transform,
            physical_range,
        } = SpnDecoder::decode(definition);

        Self {
            pgn: entry.pgn_decimal,
            pgn_hex: entry.pgn_hex.clone(),
            definition: definition.clone(),
            bit_range,
            transform,
            physical_range,
        }
    }

    pub fn spn(&self) -> u32 {
        self.definition.spn
    }

    /// Formula text, or the unavailable marker
    pub fn formula(&self) -> String {
        DecodedField {
            bit_range: self.bit_range,
            transform: self.transform,
            physical_range: self.physical_range,
        }
        .formula()
    }

    /// Physical value for a raw field value
    pub fn physical_value(&self, raw: u64) -> PhysicalValue {
        SpnDecoder::physical_value(&self.definition, raw)
    }
}

/// How an observed PGN relates to the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingStatus {
    /// PGN found in the catalog
    Mapped,
    /// PGN is valid but the catalog has no SPN data for it
    NoSpnData,
    /// PGN token could not be normalized
    Unnormalized,
}

impl fmt::Display for MappingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingStatus::Mapped => write!(f, "Mapped"),
            MappingStatus::NoSpnData => write!(f, "No SPN data available"),
            MappingStatus::Unnormalized => write!(f, "Unrecognized PGN"),
        }
    }
}

/// One distinct PGN observed on a vehicle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PgnMapping {
    pub pgn: NormalizedPgn,
    pub pgn_name: Option<String>,
    /// Raw observations of this PGN, duplicates included
    pub occurrences: usize,
    pub status: MappingStatus,
    /// Every catalog SPN of this PGN, in catalog order
    pub spns: Vec<SpnDetail>,
}

impl PgnMapping {
    fn new(pgn: NormalizedPgn, catalog: &SpnCatalog) -> Self {
        let entry = pgn
            .value()
            .and_then(|v| u32::try_from(v).ok())
            .and_then(|v| catalog.get_pgn(v));

        let (status, pgn_name, spns) = match entry {
            Some(entry) => (
                MappingStatus::Mapped,
                entry.pgn_name.clone(),
                entry.spns.iter().map(|d| SpnDetail::new(entry, d)).collect(),
            ),
            None if pgn.is_degraded() => (MappingStatus::Unnormalized, None, Vec::new()),
            None => (MappingStatus::NoSpnData, None, Vec::new()),
        };

        if status != MappingStatus::Mapped {
            log::trace!("PGN {} has no SPN data ({:?})", pgn.original, status);
        }

        Self {
            pgn,
            pgn_name,
            occurrences: 0,
            status,
            spns,
        }
    }

    /// Numeric PGN, when the token could be normalized
    pub fn pgn_value(&self) -> Option<u64> {
        self.pgn.value()
    }
}

/// Decoded, deduplicated inventory of one uploaded vehicle/file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VehicleAnalysis {
    pub name: String,
    pub brand: String,
    pub source_file: String,
    pub uploaded_at: Option<Timestamp>,
    /// All observations, duplicates counted
    pub total_pgn_messages: usize,
    /// Distinct PGNs by normalized decimal value
    pub unique_pgn_count: usize,
    /// Always `spn_details.len()`
    pub unique_spn_count: usize,
    /// Distinct SPNs (by number) carried by the observed PGNs
    pub spn_details: Vec<SpnDetail>,
    /// Distinct observed PGNs in first-seen order
    pub pgn_mappings: Vec<PgnMapping>,
}

impl VehicleAnalysis {
    /// True when `spn_details` contains `spn`
    pub fn has_spn(&self, spn: u32) -> bool {
        self.spn_details.iter().any(|d| d.spn() == spn)
    }

    /// Observed PGNs the catalog could not map
    pub fn unmapped_pgns(&self) -> impl Iterator<Item = &PgnMapping> {
        self.pgn_mappings
            .iter()
            .filter(|m| m.status != MappingStatus::Mapped)
    }
}

/// Batch-level sums; nothing is deduplicated across vehicles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregateTotals {
    pub total_vehicles: usize,
    /// Sum of per-vehicle `unique_spn_count`
    pub total_spn_count: usize,
    /// Sum of per-vehicle `total_pgn_messages`
    pub total_pgn_count: usize,
}

impl AggregateTotals {
    pub fn from_analyses(analyses: &[VehicleAnalysis]) -> Self {
        analyses.iter().fold(
            Self {
                total_vehicles: analyses.len(),
                ..Self::default()
            },
            |mut totals, a| {
                totals.total_spn_count += a.unique_spn_count;
                totals.total_pgn_count += a.total_pgn_messages;
                totals
            },
        )
    }
}

/// Analyses of one upload batch, in input order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchAnalysis {
    pub vehicles: Vec<VehicleAnalysis>,
    pub totals: AggregateTotals,
}

/// The aggregation engine - entry point for analysing vehicles
pub struct Analyzer<'a> {
    /// Shared, read-only catalog
    catalog: &'a SpnCatalog,
    config: AnalysisConfig,
}

impl<'a> Analyzer<'a> {
    /// Create an analyzer with default configuration
    pub fn new(catalog: &'a SpnCatalog) -> Self {
        Self::with_config(catalog, AnalysisConfig::default())
    }

    pub fn with_config(catalog: &'a SpnCatalog, config: AnalysisConfig) -> Self {
        Self { catalog, config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyse one vehicle
    ///
    /// An empty observation list yields a valid record with zero counts.
    /// When two observed PGNs carry the same SPN number, the definition from
    /// the PGN observed first wins.
    pub fn analyze(&self, input: &VehicleInput) -> VehicleAnalysis {
        let name = input
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| vehicle_name_from_file(&input.source_file));
        let brand = input
            .brand
            .clone()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| self.config.brand_for(&name));

        let mut pgn_mappings: Vec<PgnMapping> = Vec::new();
        let mut pgn_lookup: HashMap<String, usize> = HashMap::new();

        for observation in &input.observations {
            let normalized = normalize_pgn(&observation.pgn.as_text());
            let idx = match pgn_lookup.get(&normalized.decimal) {
                Some(idx) => *idx,
                None => {
                    let key = normalized.decimal.clone();
                    pgn_mappings.push(PgnMapping::new(normalized, self.catalog));
                    pgn_lookup.insert(key, pgn_mappings.len() - 1);
                    pgn_mappings.len() - 1
                }
            };
            pgn_mappings[idx].occurrences += 1;
        }

        let mut seen_spns: HashSet<u32> = HashSet::new();
        let spn_details: Vec<SpnDetail> = pgn_mappings
            .iter()
            .flat_map(|m| m.spns.iter())
            .filter(|d| seen_spns.insert(d.spn()))
            .cloned()
            .collect();

        log::debug!(
            "Analysed {:?}: {} messages, {} PGNs, {} SPNs",
            name,
            input.observations.len(),
            pgn_mappings.len(),
            spn_details.len()
        );

        VehicleAnalysis {
            name,
            brand,
            source_file: input.source_file.clone(),
            uploaded_at: input.uploaded_at,
            total_pgn_messages: input.observations.len(),
            unique_pgn_count: pgn_mappings.len(),
            unique_spn_count: spn_details.len(),
            spn_details,
            pgn_mappings,
        }
    }

    /// Analyse a batch of vehicles and sum the results
    ///
    /// Vehicles are independent; with `parallel` enabled they are analysed
    /// on the rayon pool. Output order always matches input order.
    pub fn analyze_batch(&self, inputs: &[VehicleInput]) -> BatchAnalysis {
        log::info!("Analysing batch of {} vehicles", inputs.len());

        let vehicles: Vec<VehicleAnalysis> = if self.config.parallel {
            inputs.par_iter().map(|input| self.analyze(input)).collect()
        } else {
            inputs.iter().map(|input| self.analyze(input)).collect()
        };
        let totals = AggregateTotals::from_analyses(&vehicles);

        log::info!(
            "Batch done: {} vehicles, {} SPNs, {} PGN messages",
            totals.total_vehicles,
            totals.total_spn_count,
            totals.total_pgn_count
        );

        BatchAnalysis { vehicles, totals }
    }
}

/// Derive a display name from an uploaded file name
///
/// `volvo_fh-16.csv` → `volvo fh 16`.
pub fn vehicle_name_from_file(source_file: &str) -> String {
    let stem = Path::new(source_file)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(source_file);

    let name = stem.replace(['_', '-'], " ");
    let name = name.trim();
    if name.is_empty() {
        "Unnamed".to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn catalog() -> SpnCatalog {
        let mut catalog = SpnCatalog::new();
        catalog
            .add_definition(
                61444,
                Some("EEC1".to_string()),
                SpnDefinition::new(190, "Engine Speed", 4, 16)
                    .with_unit("rpm")
                    .with_scaling(Decimal::new(125, 3), Decimal::ZERO),
            )
            .unwrap();
        catalog
            .add_definition(61444, None, SpnDefinition::new(899, "Engine Torque Mode", 1, 4))
            .unwrap();
        catalog
            .add_definition(61443, None, SpnDefinition::new(91, "Accelerator Pedal Position 1", 2, 8))
            .unwrap();
        // Same SPN number under another PGN: a data anomaly
        catalog
            .add_definition(65265, None, SpnDefinition::new(190, "Shadow Engine Speed", 1, 8))
            .unwrap();
        catalog
    }

    #[test]
    fn test_counts_and_dedup() {
        let catalog = catalog();
        let analyzer = Analyzer::new(&catalog);
        let input = VehicleInput::new("truck.csv").with_observations([61444u32, 61444, 61443]);
        let analysis = analyzer.analyze(&input);

        assert_eq!(analysis.total_pgn_messages, 3);
        assert_eq!(analysis.unique_pgn_count, 2);
        assert_eq!(analysis.unique_spn_count, 3);
        assert_eq!(analysis.unique_spn_count, analysis.spn_details.len());
        assert_eq!(analysis.pgn_mappings[0].occurrences, 2);
        assert_eq!(analysis.pgn_mappings[1].occurrences, 1);
    }

    #[test]
    fn test_hex_and_decimal_tokens_are_the_same_pgn() {
        let catalog = catalog();
        let analyzer = Analyzer::new(&catalog);
        let input = VehicleInput::new("mixed.csv").with_observations(["0xF004", "61444", "F004"]);
        let analysis = analyzer.analyze(&input);

        assert_eq!(analysis.total_pgn_messages, 3);
        assert_eq!(analysis.unique_pgn_count, 1);
        assert_eq!(analysis.pgn_mappings[0].pgn.hex, "0xF004");
    }

    #[test]
    fn test_first_encountered_spn_wins() {
        let catalog = catalog();
        let analyzer = Analyzer::new(&catalog);

        let input = VehicleInput::new("a.csv").with_observations([65265u32, 61444]);
        let analysis = analyzer.analyze(&input);
        let speed = analysis.spn_details.iter().find(|d| d.spn() == 190).unwrap();
        assert_eq!(speed.pgn, 65265);
        assert_eq!(speed.definition.description, "Shadow Engine Speed");
        assert_eq!(
            analysis.spn_details.iter().filter(|d| d.spn() == 190).count(),
            1
        );

        // The PGN mapping still lists everything its PGN carries
        assert_eq!(analysis.pgn_mappings[1].spns.len(), 2);
    }

    #[test]
    fn test_unknown_and_unreadable_pgns_are_reported() {
        let catalog = catalog();
        let analyzer = Analyzer::new(&catalog);
        let input = VehicleInput::new("b.csv").with_observations(["65000", "garbage", "61443"]);
        let analysis = analyzer.analyze(&input);

        assert_eq!(analysis.unique_pgn_count, 3);
        assert_eq!(analysis.pgn_mappings[0].status, MappingStatus::NoSpnData);
        assert_eq!(analysis.pgn_mappings[1].status, MappingStatus::Unnormalized);
        assert_eq!(analysis.pgn_mappings[1].pgn.decimal, "garbage");
        assert_eq!(analysis.pgn_mappings[2].status, MappingStatus::Mapped);
        assert_eq!(analysis.unmapped_pgns().count(), 2);
        assert_eq!(analysis.unique_spn_count, 1);
    }

    #[test]
    fn test_non_integer_json_tokens_degrade() {
        let catalog = catalog();
        let input: VehicleInput = serde_json::from_str(
            r#"{"source_file": "c.csv", "observations": [{"pgn": 61444}, {"pgn": 61443.0}, {"pgn": -5}]}"#,
        )
        .unwrap();
        let analysis = Analyzer::new(&catalog).analyze(&input);

        assert_eq!(analysis.total_pgn_messages, 3);
        assert_eq!(analysis.unique_pgn_count, 3);
        assert_eq!(analysis.pgn_mappings[0].status, MappingStatus::Mapped);
        assert_eq!(analysis.pgn_mappings[1].status, MappingStatus::Unnormalized);
        assert_eq!(analysis.pgn_mappings[1].pgn.original, "61443.0");
        assert_eq!(analysis.pgn_mappings[2].status, MappingStatus::Unnormalized);
        assert_eq!(analysis.unique_spn_count, 2);
    }

    #[test]
    fn test_empty_vehicle() {
        let catalog = catalog();
        let analysis = Analyzer::new(&catalog).analyze(&VehicleInput::new("empty.csv"));
        assert_eq!(analysis.total_pgn_messages, 0);
        assert_eq!(analysis.unique_pgn_count, 0);
        assert_eq!(analysis.unique_spn_count, 0);
        assert!(analysis.spn_details.is_empty());
    }

    #[test]
    fn test_name_and_brand_defaults() {
        let catalog = catalog();
        let analyzer = Analyzer::new(&catalog);

        let analysis = analyzer.analyze(&VehicleInput::new("scania_r450-2020.csv"));
        assert_eq!(analysis.name, "scania r450 2020");
        assert_eq!(analysis.brand, "Scania");

        let analysis = analyzer.analyze(&VehicleInput::new("fleet7.log"));
        assert_eq!(analysis.brand, "Unknown");

        let analysis = analyzer.analyze(
            &VehicleInput::new("x.csv").with_name("Truck 1").with_brand("DAF"),
        );
        assert_eq!(analysis.name, "Truck 1");
        assert_eq!(analysis.brand, "DAF");
    }

    #[test]
    fn test_batch_preserves_order_and_sums() {
        let catalog = catalog();
        let inputs: Vec<VehicleInput> = (0..32u32)
            .map(|i| {
                let pgns = if i % 2 == 0 { vec![61444u32, 61444] } else { vec![61443u32] };
                VehicleInput::new(format!("vehicle_{}.csv", i)).with_observations(pgns)
            })
            .collect();

        for parallel in [true, false] {
            let analyzer =
                Analyzer::with_config(&catalog, AnalysisConfig::new().with_parallel(parallel));
            let batch = analyzer.analyze_batch(&inputs);

            let names: Vec<&str> = batch.vehicles.iter().map(|v| v.source_file.as_str()).collect();
            let expected: Vec<String> = (0..32).map(|i| format!("vehicle_{}.csv", i)).collect();
            assert_eq!(names, expected);

            assert_eq!(batch.totals.total_vehicles, 32);
            assert_eq!(batch.totals.total_pgn_count, 16 * 2 + 16);
            assert_eq!(batch.totals.total_spn_count, 16 * 2 + 16);
        }
    }

    #[test]
    fn test_vehicle_name_from_file() {
        assert_eq!(vehicle_name_from_file("daf_xf-105.csv"), "daf xf 105");
        assert_eq!(vehicle_name_from_file("uploads/hino.txt"), "hino");
        assert_eq!(vehicle_name_from_file(""), "Unnamed");
    }
}
