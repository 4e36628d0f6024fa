//! Search, sort and export over analysis output
//!
//! Works on SPN detail lists and PGN mapping lists. Search is a single
//! case-insensitive box over a fixed set of fields; sorting has one active
//! key and direction; export projects rows onto fixed, documented columns.

use crate::aggregate::{PgnMapping, SpnDetail, VehicleAnalysis};
use crate::bitfield::NOT_AVAILABLE;
use crate::reverse_index::SpnLookup;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Sortable columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Spn,
    Pgn,
    Description,
    Unit,
}

impl SortKey {
    /// Parse a column name; unknown names give `None`
    pub fn parse(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "spn" => Some(SortKey::Spn),
            "pgn" | "pgn_dec" => Some(SortKey::Pgn),
            "description" => Some(SortKey::Description),
            "unit" => Some(SortKey::Unit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Current sort column and direction
///
/// The key is kept as text so that unknown keys can be selected; sorting by
/// them leaves rows in their prior order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub key: String,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(key: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            key: key.into(),
            direction,
        }
    }

    /// Select a column: re-selecting the ascending key flips it to
    /// descending, anything else starts ascending
    pub fn select(&mut self, key: &str) {
        self.direction = if self.key == key && self.direction == SortDirection::Asc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        self.key = key.to_string();
    }
}

impl Default for SortState {
    fn default() -> Self {
        Self::new("spn", SortDirection::Asc)
    }
}

/// A row type the query surface can search and sort
pub trait QueryRow {
    /// Keys this row type can be sorted by
    const SORT_KEYS: &'static [SortKey];

    /// True when any searchable field contains `needle` (already lowercase)
    fn matches(&self, needle: &str) -> bool;

    /// Compare two rows on a key from [`QueryRow::SORT_KEYS`]
    fn compare_by(&self, other: &Self, key: SortKey) -> Ordering;
}

impl<T: QueryRow> QueryRow for &T {
    const SORT_KEYS: &'static [SortKey] = T::SORT_KEYS;

    fn matches(&self, needle: &str) -> bool {
        T::matches(*self, needle)
    }

    fn compare_by(&self, other: &Self, key: SortKey) -> Ordering {
        T::compare_by(*self, *other, key)
    }
}

/// Case-insensitive text order, ties broken by the raw text
///
/// Only approximates a locale collation: accents and other scripts sort by
/// their lowercased code points.
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn contains_lower(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

impl QueryRow for SpnDetail {
    const SORT_KEYS: &'static [SortKey] = &[
        SortKey::Spn,
        SortKey::Pgn,
        SortKey::Description,
        SortKey::Unit,
    ];

    fn matches(&self, needle: &str) -> bool {
        self.spn().to_string().contains(needle)
            || contains_lower(&self.definition.description, needle)
            || self
                .definition
                .unit
                .as_deref()
                .map_or(false, |u| contains_lower(u, needle))
            || self.pgn.to_string().contains(needle)
            || contains_lower(&self.pgn_hex, needle)
    }

    fn compare_by(&self, other: &Self, key: SortKey) -> Ordering {
        match key {
            SortKey::Spn => self.spn().cmp(&other.spn()),
            SortKey::Pgn => self.pgn.cmp(&other.pgn),
            SortKey::Description => {
                compare_text(&self.definition.description, &other.definition.description)
            }
            SortKey::Unit => self
                .definition
                .unit
                .as_deref()
                .unwrap_or("")
                .cmp(other.definition.unit.as_deref().unwrap_or("")),
        }
    }
}

impl QueryRow for PgnMapping {
    const SORT_KEYS: &'static [SortKey] = &[SortKey::Pgn];

    fn matches(&self, needle: &str) -> bool {
        contains_lower(&self.pgn.decimal, needle)
            || contains_lower(&self.pgn.hex, needle)
            || self.spns.iter().any(|d| {
                d.spn().to_string().contains(needle)
                    || contains_lower(&d.definition.description, needle)
            })
    }

    fn compare_by(&self, other: &Self, key: SortKey) -> Ordering {
        match key {
            // Unreadable PGNs sort after every numeric one
            SortKey::Pgn => match (self.pgn_value(), other.pgn_value()) {
                (Some(a), Some(b)) => a.cmp(&b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            _ => Ordering::Equal,
        }
    }
}

/// Rows whose fields contain `query`, case-insensitively, in input order
///
/// An empty query matches everything.
pub fn search<'r, T: QueryRow>(rows: &'r [T], query: &str) -> Vec<&'r T> {
    let needle = query.trim().to_lowercase();
    rows.iter()
        .filter(|row| needle.is_empty() || row.matches(&needle))
        .collect()
}

/// Stable sort by the current key and direction
///
/// Keys the row type does not support leave the order unchanged.
pub fn sort_rows<T: QueryRow>(rows: &mut [T], sort: &SortState) {
    let Some(key) = SortKey::parse(&sort.key) else {
        log::trace!("Ignoring unsupported sort key {:?}", sort.key);
        return;
    };
    if !T::SORT_KEYS.contains(&key) {
        log::trace!("Ignoring sort key {:?} for this row type", sort.key);
        return;
    }

    rows.sort_by(|a, b| {
        let ord = a.compare_by(b, key);
        match sort.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

/// Search then sort, the way a table view shows rows
pub fn query_rows<'r, T: QueryRow>(rows: &'r [T], query: &str, sort: &SortState) -> Vec<&'r T> {
    let mut hits = search(rows, query);
    sort_rows(&mut hits, sort);
    hits
}

/// Export targets and their fixed columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportTarget {
    SpnDetails,
    PgnMapping,
    SpnVehicles,
    VehicleSummary,
}

impl ExportTarget {
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            ExportTarget::SpnDetails => &[
                "SPN",
                "Description",
                "PGN",
                "PGN Hex",
                "Unit",
                "Physical Value",
                "Physical Range",
                "Bit Range",
                "Bit Length",
                "Resolution",
                "Offset",
            ],
            ExportTarget::PgnMapping => &[
                "PGN",
                "PGN Hex",
                "PGN Name",
                "Occurrences",
                "Status",
                "SPN",
                "Description",
                "Unit",
                "Bit Range",
            ],
            ExportTarget::SpnVehicles => &["Vehicle/File", "Brand", "Source File"],
            ExportTarget::VehicleSummary => &[
                "Vehicle",
                "Brand",
                "Source File",
                "Total PGN Messages",
                "Unique PGNs",
                "Unique SPNs",
            ],
        }
    }
}

impl FromStr for ExportTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "spn_details" => Ok(ExportTarget::SpnDetails),
            "pgn_mapping" => Ok(ExportTarget::PgnMapping),
            "spn_vehicles" => Ok(ExportTarget::SpnVehicles),
            "vehicle_summary" => Ok(ExportTarget::VehicleSummary),
            other => Err(format!("unknown export target: {}", other)),
        }
    }
}

/// A fully resolved table cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ExportCell {
    Integer(u64),
    Decimal(Decimal),
    Text(String),
}

impl ExportCell {
    fn text(value: impl Into<String>) -> Self {
        ExportCell::Text(value.into())
    }

    fn not_available() -> Self {
        ExportCell::Text(NOT_AVAILABLE.to_string())
    }

    fn optional_text(value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.trim().is_empty() => ExportCell::text(v),
            _ => ExportCell::not_available(),
        }
    }

    fn optional_decimal(value: Option<Decimal>) -> Self {
        value
            .map(|d| ExportCell::Decimal(d.normalize()))
            .unwrap_or_else(ExportCell::not_available)
    }
}

impl fmt::Display for ExportCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportCell::Integer(v) => write!(f, "{}", v),
            ExportCell::Decimal(v) => write!(f, "{}", v),
            ExportCell::Text(v) => f.write_str(v),
        }
    }
}

/// Ordered rows ready for an external CSV/spreadsheet/PDF writer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportTable {
    pub target: ExportTarget,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<ExportCell>>,
}

impl ExportTable {
    fn new(target: ExportTarget) -> Self {
        Self {
            target,
            columns: target.columns().iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    fn push_row(&mut self, row: Vec<ExportCell>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }
}

/// Project SPN details onto [`ExportTarget::SpnDetails`] columns
pub fn export_spn_details<'r, I>(rows: I, precision: u32) -> ExportTable
where
    I: IntoIterator<Item = &'r SpnDetail>,
{
    let mut table = ExportTable::new(ExportTarget::SpnDetails);
    for detail in rows {
        let def = &detail.definition;
        table.push_row(vec![
            ExportCell::Integer(u64::from(def.spn)),
            ExportCell::text(def.description.as_str()),
            ExportCell::Integer(u64::from(detail.pgn)),
            ExportCell::text(detail.pgn_hex.as_str()),
            ExportCell::optional_text(def.unit.as_deref()),
            ExportCell::Text(detail.formula()),
            detail
                .physical_range
                .map(|r| ExportCell::Text(r.to_display(precision)))
                .unwrap_or_else(ExportCell::not_available),
            ExportCell::Text(detail.bit_range.to_string()),
            ExportCell::Integer(u64::from(def.bit_length)),
            ExportCell::optional_decimal(def.resolution),
            ExportCell::optional_decimal(def.offset),
        ]);
    }
    table
}

/// Project PGN mappings onto [`ExportTarget::PgnMapping`] columns
///
/// One row per PGN × SPN; a PGN without SPNs still gets one row.
pub fn export_pgn_mappings<'r, I>(rows: I) -> ExportTable
where
    I: IntoIterator<Item = &'r PgnMapping>,
{
    let mut table = ExportTable::new(ExportTarget::PgnMapping);
    for mapping in rows {
        let pgn_cell = match mapping.pgn_value() {
            Some(v) => ExportCell::Integer(v),
            None => ExportCell::text(mapping.pgn.original.as_str()),
        };
        let prefix = vec![
            pgn_cell,
            ExportCell::text(mapping.pgn.hex.as_str()),
            ExportCell::optional_text(mapping.pgn_name.as_deref()),
            ExportCell::Integer(mapping.occurrences as u64),
            ExportCell::Text(mapping.status.to_string()),
        ];

        if mapping.spns.is_empty() {
            let mut row = prefix;
            row.extend((0..4).map(|_| ExportCell::not_available()));
            table.push_row(row);
            continue;
        }

        for detail in &mapping.spns {
            let mut row = prefix.clone();
            row.extend([
                ExportCell::Integer(u64::from(detail.spn())),
                ExportCell::text(detail.definition.description.as_str()),
                ExportCell::optional_text(detail.definition.unit.as_deref()),
                ExportCell::Text(detail.bit_range.to_string()),
            ]);
            table.push_row(row);
        }
    }
    table
}

/// Project a reverse-lookup result onto [`ExportTarget::SpnVehicles`] columns
pub fn export_spn_vehicles(lookup: &SpnLookup) -> ExportTable {
    let mut table = ExportTable::new(ExportTarget::SpnVehicles);
    for vehicle in &lookup.vehicles {
        table.push_row(vec![
            ExportCell::text(vehicle.name.as_str()),
            ExportCell::text(vehicle.brand.as_str()),
            ExportCell::text(vehicle.source_file.as_str()),
        ]);
    }
    table
}

/// Project analyses onto [`ExportTarget::VehicleSummary`] columns
pub fn export_vehicle_summary<'r, I>(rows: I) -> ExportTable
where
    I: IntoIterator<Item = &'r VehicleAnalysis>,
{
    let mut table = ExportTable::new(ExportTarget::VehicleSummary);
    for analysis in rows {
        table.push_row(vec![
            ExportCell::text(analysis.name.as_str()),
            ExportCell::text(analysis.brand.as_str()),
            ExportCell::text(analysis.source_file.as_str()),
            ExportCell::Integer(analysis.total_pgn_messages as u64),
            ExportCell::Integer(analysis.unique_pgn_count as u64),
            ExportCell::Integer(analysis.unique_spn_count as u64),
        ]);
    }
    table
}
