//! Text reports
//!
//! Plain-text renderings of batch analyses, lookups, catalog stats and
//! export tables. JSON output bypasses this module.

use spn_inventory::{BatchAnalysis, ExportTable, SpnCatalog, SpnLookupResponse, VehicleAnalysis};
use std::io::{self, Write};

const RULE: &str = "═══════════════════════════════════════════════";
const THIN_RULE: &str = "───────────────────────────────────────────────";

pub fn write_header(out: &mut dyn Write, title: &str) -> io::Result<()> {
    writeln!(out, "{}", RULE)?;
    writeln!(out, "  {}", title)?;
    writeln!(out, "{}\n", RULE)
}

/// Batch totals followed by one block per vehicle
pub fn write_batch(out: &mut dyn Write, batch: &BatchAnalysis) -> io::Result<()> {
    write_header(out, "SPN Inventory - Batch Analysis")?;

    writeln!(out, "📊 Totals:")?;
    writeln!(out, "  Vehicles:     {}", batch.totals.total_vehicles)?;
    writeln!(out, "  SPNs:         {}", batch.totals.total_spn_count)?;
    writeln!(out, "  PGN messages: {}", batch.totals.total_pgn_count)?;

    for vehicle in &batch.vehicles {
        writeln!(out)?;
        write_vehicle(out, vehicle)?;
    }
    Ok(())
}

fn write_vehicle(out: &mut dyn Write, vehicle: &VehicleAnalysis) -> io::Result<()> {
    writeln!(out, "🚚 {} ({})", vehicle.name, vehicle.brand)?;
    writeln!(out, "{}", THIN_RULE)?;
    writeln!(out, "  Source file:  {}", vehicle.source_file)?;
    if let Some(uploaded_at) = vehicle.uploaded_at {
        writeln!(out, "  Uploaded:     {}", uploaded_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
    }
    writeln!(out, "  PGN messages: {}", vehicle.total_pgn_messages)?;
    writeln!(out, "  Unique PGNs:  {}", vehicle.unique_pgn_count)?;
    writeln!(out, "  Unique SPNs:  {}", vehicle.unique_spn_count)?;

    let unmapped: Vec<String> = vehicle
        .unmapped_pgns()
        .map(|m| format!("{} ({})", m.pgn.original, m.status))
        .collect();
    if !unmapped.is_empty() {
        writeln!(out, "  ⚠️  Unmapped PGNs: {}", unmapped.join(", "))?;
    }
    Ok(())
}

pub fn write_lookup(out: &mut dyn Write, response: &SpnLookupResponse) -> io::Result<()> {
    write_header(out, "SPN Inventory - Reverse Lookup")?;

    if let Some(error) = &response.error {
        return writeln!(out, "✗ {}", error);
    }

    let spn = response.spn.map(|s| s.to_string()).unwrap_or_default();
    match &response.description {
        Some(description) => writeln!(out, "SPN {}: {}", spn, description)?,
        None => writeln!(out, "SPN {}", spn)?,
    }

    if response.vehicles.is_empty() {
        return writeln!(out, "  No vehicles expose this SPN");
    }
    writeln!(out, "  Found on {} vehicles:", response.vehicles.len())?;
    for vehicle in &response.vehicles {
        writeln!(
            out,
            "  • {} [{}] ({})",
            vehicle.name, vehicle.brand, vehicle.source_file
        )?;
    }
    Ok(())
}

pub fn write_catalog(out: &mut dyn Write, catalog: &SpnCatalog) -> io::Result<()> {
    write_header(out, "SPN Inventory - Catalog")?;

    let stats = catalog.stats();
    writeln!(out, "📊 SPN Catalog:")?;
    writeln!(out, "  PGNs:        {}", stats.num_pgns)?;
    writeln!(out, "  SPNs:        {}", stats.num_spns)?;
    writeln!(out, "  Unique SPNs: {}", stats.num_unique_spns)?;
    writeln!(out, "  Rejected:    {}", stats.num_rejected)?;

    for error in catalog.rejected() {
        writeln!(out, "  ✗ {}", error)?;
    }
    Ok(())
}

/// Column-aligned rendering of an export table
pub fn write_table(out: &mut dyn Write, table: &ExportTable) -> io::Result<()> {
    let cells: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .collect();

    let mut widths: Vec<usize> = table.columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    write_row(out, &table.columns, &widths)?;
    let separator: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    writeln!(out, "{}", separator.join("─┼─"))?;
    for row in &cells {
        write_row(out, row, &widths)?;
    }
    writeln!(out, "\n{} rows", cells.len())
}

fn write_row(out: &mut dyn Write, row: &[String], widths: &[usize]) -> io::Result<()> {
    let padded: Vec<String> = row
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{}{}", cell, " ".repeat(pad))
        })
        .collect();
    writeln!(out, "{}", padded.join(" │ ").trim_end())
}
