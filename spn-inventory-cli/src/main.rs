//! SPN Inventory CLI Application
//!
//! Command-line front end for the spn-inventory library. It loads a catalog
//! snapshot and canonical vehicle observation documents (JSON) and adds:
//! - Batch analysis reports (text or JSON)
//! - Reverse SPN lookups
//! - Searchable, sortable export tables
//! - Catalog statistics and rejected definitions

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use spn_inventory::query::{
    export_pgn_mappings, export_spn_details, export_spn_vehicles, export_vehicle_summary,
    query_rows,
};
use spn_inventory::{
    Analyzer, BatchAnalysis, ExportTable, ExportTarget, PgnMapping, SortDirection, SortState,
    SpnCatalog, SpnDetail, SpnIndex, SpnLookupResponse, VehicleAnalysis,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

mod config;
mod input;
mod report;

use config::{AppConfig, OutputFormat};

/// SPN Inventory - J1939 SPN/PGN inventories for uploaded vehicles
#[derive(Parser, Debug)]
#[command(name = "spn-inventory")]
#[command(about = "Build J1939 SPN inventories from vehicle PGN observations", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Path to the SPN catalog snapshot (JSON)
    #[arg(long, value_name = "FILE", global = true)]
    catalog: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Output options shared by every subcommand
#[derive(clap::Args, Debug)]
struct OutputArgs {
    /// Output format (default: from config, else text)
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyse vehicle documents and report per-vehicle inventories
    Analyze {
        /// Vehicle observation documents (default: `inputs` from config)
        #[arg(value_name = "FILE")]
        inputs: Vec<PathBuf>,

        /// Analyse vehicles one after another instead of in parallel
        #[arg(long)]
        sequential: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// List the vehicles that expose an SPN
    Lookup {
        /// SPN number to search for
        #[arg(long, value_name = "SPN")]
        spn: String,

        #[arg(value_name = "FILE")]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Project analyses onto an export table
    Export {
        /// spn-details, pgn-mapping, spn-vehicles or vehicle-summary
        #[arg(long, value_name = "TARGET")]
        target: ExportTarget,

        /// Keep rows containing this text (case-insensitive)
        #[arg(long)]
        search: Option<String>,

        /// Sort column (spn, pgn, description, unit)
        #[arg(long, value_name = "KEY")]
        sort: Option<String>,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        /// SPN for the spn-vehicles target
        #[arg(long, value_name = "SPN")]
        spn: Option<String>,

        /// Only rows of the vehicle with this name
        #[arg(long, value_name = "NAME")]
        vehicle: Option<String>,

        #[arg(value_name = "FILE")]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show catalog statistics and rejected definitions
    Catalog {
        #[command(flatten)]
        output: OutputArgs,
    },
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("SPN Inventory CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using spn-inventory library v{}", spn_inventory::VERSION);

    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };
    if let Some(catalog) = &args.catalog {
        config.catalog = Some(catalog.clone());
    }

    let catalog = load_catalog(&config)?;

    match args.command {
        Command::Analyze {
            inputs,
            sequential,
            output,
        } => {
            if sequential {
                config.analysis.parallel = false;
            }
            let batch = analyze(&catalog, &config, &inputs)?;
            emit(&config, &output, &batch, |out| report::write_batch(out, &batch))
        }
        Command::Lookup {
            spn,
            inputs,
            output,
        } => {
            let batch = analyze(&catalog, &config, &inputs)?;
            let response =
                SpnLookupResponse::from_result(&spn, SpnIndex::build(&batch.vehicles).lookup(&spn));
            emit(&config, &output, &response, |out| {
                report::write_lookup(out, &response)
            })?;
            if let Some(error) = response.error {
                bail!(error);
            }
            Ok(())
        }
        Command::Export {
            target,
            search,
            sort,
            desc,
            spn,
            vehicle,
            inputs,
            output,
        } => {
            let batch = analyze(&catalog, &config, &inputs)?;
            let vehicles: Vec<&VehicleAnalysis> = batch
                .vehicles
                .iter()
                .filter(|v| vehicle.as_deref().map_or(true, |name| v.name == name))
                .collect();

            let direction = if desc {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            };
            let sort = match sort {
                Some(key) => SortState::new(key, direction),
                None => SortState {
                    direction,
                    ..SortState::default()
                },
            };
            let query = ExportQuery {
                search: search.unwrap_or_default(),
                sort,
                precision: config.analysis.display_precision,
            };

            let table = export(target, &vehicles, &query, spn.as_deref())?;
            emit(&config, &output, &table, |out| report::write_table(out, &table))
        }
        Command::Catalog { output } => {
            let summary = CatalogSummary {
                stats: catalog.stats(),
                rejected: catalog.rejected(),
            };
            emit(&config, &output, &summary, |out| {
                report::write_catalog(out, &catalog)
            })
        }
    }
}

#[derive(Serialize)]
struct CatalogSummary<'a> {
    stats: spn_inventory::CatalogStats,
    rejected: &'a [spn_inventory::DefinitionError],
}

struct ExportQuery {
    search: String,
    sort: SortState,
    precision: u32,
}

fn load_catalog(config: &AppConfig) -> Result<SpnCatalog> {
    let path = config
        .catalog
        .as_ref()
        .context("No catalog given: pass --catalog or set `catalog` in the config file")?;
    SpnCatalog::from_json_file(path).with_context(|| format!("Failed to load catalog: {:?}", path))
}

/// Load vehicle documents (command line first, then config) and analyse them
fn analyze(catalog: &SpnCatalog, config: &AppConfig, inputs: &[PathBuf]) -> Result<BatchAnalysis> {
    let paths = if inputs.is_empty() {
        config.inputs.as_slice()
    } else {
        inputs
    };
    if paths.is_empty() {
        bail!("No vehicle documents given: pass FILE arguments or set `inputs` in the config file");
    }

    let vehicles = input::load_documents(paths)?;
    let analyzer = Analyzer::with_config(catalog, config.analysis.clone());
    Ok(analyzer.analyze_batch(&vehicles))
}

fn export(
    target: ExportTarget,
    vehicles: &[&VehicleAnalysis],
    query: &ExportQuery,
    spn: Option<&str>,
) -> Result<ExportTable> {
    let table = match target {
        ExportTarget::SpnDetails => {
            let rows: Vec<&SpnDetail> = vehicles.iter().flat_map(|v| &v.spn_details).collect();
            let hits = query_rows(&rows, &query.search, &query.sort);
            export_spn_details(hits.into_iter().copied(), query.precision)
        }
        ExportTarget::PgnMapping => {
            let rows: Vec<&PgnMapping> = vehicles.iter().flat_map(|v| &v.pgn_mappings).collect();
            let hits = query_rows(&rows, &query.search, &query.sort);
            export_pgn_mappings(hits.into_iter().copied())
        }
        ExportTarget::SpnVehicles => {
            let spn = spn.context("--spn is required for the spn-vehicles target")?;
            let analyses: Vec<VehicleAnalysis> = vehicles.iter().map(|v| (*v).clone()).collect();
            let lookup = SpnIndex::build(&analyses).lookup(spn)?;
            export_spn_vehicles(&lookup)
        }
        ExportTarget::VehicleSummary => export_vehicle_summary(vehicles.iter().copied()),
    };
    log::debug!("Exported {} rows for {:?}", table.rows.len(), target);
    Ok(table)
}

/// Write `value` as JSON or run the text renderer, to stdout or a file
fn emit<T, F>(config: &AppConfig, args: &OutputArgs, value: &T, text: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let format = args.format.unwrap_or(config.output.format);
    let path = args.output.as_deref().or(config.output.file.as_deref());

    let mut out = open_output(path)?;
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputFormat::Text => text(out.as_mut())?,
    }
    out.flush()?;

    if let Some(path) = path {
        log::info!("Wrote report to {:?}", path);
    }
    Ok(())
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {:?}", path))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
