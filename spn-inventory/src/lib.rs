//! SPN Inventory Library
//!
//! Decodes and aggregates J1939 vehicle observations against a static SPN
//! catalog. Observations arrive already extracted (lists of PGNs seen per
//! vehicle); the library produces per-vehicle SPN/PGN inventories, bit-field
//! formulas for each SPN and a reverse "which vehicles expose SPN N" index.
//!
//! # Architecture
//!
//! - [`catalog`]: PGN → ordered SPN definitions, loaded once, read-only
//! - [`bitfield`]: bit spans and `resolution * raw + offset` transforms
//! - [`normalize`]: canonical `{hex, decimal}` form of PGN tokens
//! - [`aggregate`]: per-vehicle analysis and batch totals
//! - [`reverse_index`]: SPN → vehicles lookups
//! - [`query`]: search, sort and export-row projection
//!
//! The library does NOT:
//! - Parse uploaded CSV/TXT/LOG/XLSX files
//! - Decode raw CAN frame payloads
//! - Write CSV/spreadsheet/PDF documents
//!
//! # Example Usage
//!
//! ```no_run
//! use spn_inventory::{find_vehicles, Analyzer, SpnCatalog, VehicleInput};
//! use std::path::Path;
//!
//! let catalog = SpnCatalog::from_json_file(Path::new("j1939_catalog.json")).unwrap();
//! let analyzer = Analyzer::new(&catalog);
//!
//! let inputs = vec![
//!     VehicleInput::new("volvo_fh.csv").with_observations([61444u32, 61444, 61443]),
//!     VehicleInput::new("daf_xf.csv").with_observations(["0xFEF1", "F004"]),
//! ];
//! let batch = analyzer.analyze_batch(&inputs);
//! println!("{} SPNs across {} vehicles", batch.totals.total_spn_count, batch.totals.total_vehicles);
//!
//! match find_vehicles("190", &batch.vehicles) {
//!     Ok(lookup) => println!("SPN 190 on {} vehicles", lookup.vehicles.len()),
//!     Err(e) => eprintln!("Bad query: {}", e),
//! }
//! ```

// Public modules
pub mod aggregate;
pub mod bitfield;
pub mod catalog;
pub mod config;
pub mod normalize;
pub mod query;
pub mod reverse_index;
pub mod types;

// Re-export main types for convenience
pub use aggregate::{
    AggregateTotals, Analyzer, BatchAnalysis, MappingStatus, PgnMapping, SpnDetail,
    VehicleAnalysis,
};
pub use bitfield::{BitRange, LinearTransform, PhysicalValue, SpnDecoder, NOT_AVAILABLE};
pub use catalog::{CatalogRecord, CatalogStats, PgnEntry, SpnCatalog, SpnDefinition};
pub use config::{AnalysisConfig, BrandAlias};
pub use normalize::{normalize_pgn, NormalizedPgn};
pub use query::{
    ExportCell, ExportTable, ExportTarget, SortDirection, SortKey, SortState,
};
pub use reverse_index::{find_vehicles, SpnIndex, SpnLookup, SpnLookupResponse, VehicleRef};
pub use types::{
    DefinitionError, InventoryError, LookupInputError, PgnObservation, PgnToken, Result,
    Timestamp, VehicleInput,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
