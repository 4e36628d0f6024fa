//! Reverse SPN index
//!
//! Answers "which vehicles expose SPN N?" over a set of analyses, and
//! "which PGN carries SPN N?" over the catalog.

use crate::aggregate::{SpnDetail, VehicleAnalysis};
use crate::catalog::{PgnEntry, SpnCatalog, SpnDefinition};
use crate::types::LookupInputError;
use serde::Serialize;
use std::collections::HashMap;

/// A vehicle that exposes the searched SPN
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VehicleRef {
    pub name: String,
    pub brand: String,
    pub source_file: String,
}

impl VehicleRef {
    fn from_analysis(analysis: &VehicleAnalysis) -> Self {
        Self {
            name: analysis.name.clone(),
            brand: analysis.brand.clone(),
            source_file: analysis.source_file.clone(),
        }
    }
}

/// Successful lookup; `vehicles` may be empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpnLookup {
    pub spn: u32,
    /// Description from the first vehicle that has the SPN
    pub description: Option<String>,
    pub vehicles: Vec<VehicleRef>,
}

impl SpnLookup {
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }
}

/// Serializable lookup outcome for search front ends
///
/// `error` is only set when the query itself was invalid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpnLookupResponse {
    pub query: String,
    pub spn: Option<u32>,
    pub description: Option<String>,
    pub vehicles: Vec<VehicleRef>,
    pub error: Option<String>,
}

impl SpnLookupResponse {
    pub fn from_result(query: &str, result: Result<SpnLookup, LookupInputError>) -> Self {
        match result {
            Ok(lookup) => Self {
                query: query.to_string(),
                spn: Some(lookup.spn),
                description: lookup.description,
                vehicles: lookup.vehicles,
                error: None,
            },
            Err(e) => Self {
                query: query.to_string(),
                spn: None,
                description: None,
                vehicles: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }
}

/// Parse a reverse-lookup query into an SPN number
///
/// Surrounding whitespace is ignored. Anything other than ASCII digits
/// (signs, decimals, hex) is rejected.
pub fn parse_spn_query(query: &str) -> Result<u32, LookupInputError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(LookupInputError::Empty);
    }
    if !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(LookupInputError::NotANumber(trimmed.to_string()));
    }
    trimmed
        .parse::<u32>()
        .map_err(|_| LookupInputError::NotANumber(trimmed.to_string()))
}

/// One-shot lookup over a set of analyses
///
/// Vehicles are returned in the order of `analyses`.
pub fn find_vehicles(
    query: &str,
    analyses: &[VehicleAnalysis],
) -> Result<SpnLookup, LookupInputError> {
    let spn = parse_spn_query(query)?;

    let mut description = None;
    let mut vehicles = Vec::new();
    for analysis in analyses {
        if let Some(detail) = analysis.spn_details.iter().find(|d| d.spn() == spn) {
            if description.is_none() {
                description = Some(detail.definition.description.clone());
            }
            vehicles.push(VehicleRef::from_analysis(analysis));
        }
    }

    log::debug!("SPN {} found on {} vehicles", spn, vehicles.len());
    Ok(SpnLookup {
        spn,
        description,
        vehicles,
    })
}

/// Pre-built index for repeated lookups over one batch
pub struct SpnIndex<'a> {
    analyses: &'a [VehicleAnalysis],
    /// Key: SPN, Value: positions in `analyses`, ascending
    positions: HashMap<u32, Vec<usize>>,
}

impl<'a> SpnIndex<'a> {
    pub fn build(analyses: &'a [VehicleAnalysis]) -> Self {
        let mut positions: HashMap<u32, Vec<usize>> = HashMap::new();
        for (idx, analysis) in analyses.iter().enumerate() {
            for detail in &analysis.spn_details {
                positions.entry(detail.spn()).or_default().push(idx);
            }
        }
        Self {
            analyses,
            positions,
        }
    }

    pub fn lookup(&self, query: &str) -> Result<SpnLookup, LookupInputError> {
        let spn = parse_spn_query(query)?;
        let hits = self.positions.get(&spn).map(Vec::as_slice).unwrap_or(&[]);

        let description = hits
            .first()
            .and_then(|idx| self.detail(*idx, spn))
            .map(|d| d.definition.description.clone());
        let vehicles = hits
            .iter()
            .map(|idx| VehicleRef::from_analysis(&self.analyses[*idx]))
            .collect();

        Ok(SpnLookup {
            spn,
            description,
            vehicles,
        })
    }

    /// All SPN numbers present in the batch, ascending
    pub fn spn_numbers(&self) -> Vec<u32> {
        let mut spns: Vec<u32> = self.positions.keys().copied().collect();
        spns.sort_unstable();
        spns
    }

    fn detail(&self, idx: usize, spn: u32) -> Option<&SpnDetail> {
        self.analyses[idx].spn_details.iter().find(|d| d.spn() == spn)
    }
}

/// Catalog-level lookup: the PGN that carries an SPN
pub fn find_in_catalog<'c>(
    query: &str,
    catalog: &'c SpnCatalog,
) -> Result<Option<(&'c PgnEntry, &'c SpnDefinition)>, LookupInputError> {
    let spn = parse_spn_query(query)?;
    Ok(catalog.find_spn(spn))
}
