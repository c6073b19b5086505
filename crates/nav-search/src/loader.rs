//! CSV port loader.
//!
//! # CSV format
//!
//! One row per port.  Coordinates are integers; `mode` is any label accepted
//! by [`ModeType`]'s `FromStr`, case-insensitively.
//!
//! ```csv
//! origin_domain,ox,oy,oz,dest_domain,dx,dy,dz,mode,cost
//! overworld,10,64,10,nether,1,64,1,door,4.0
//! nether,1,64,1,overworld,10,64,10,door,4.0
//! overworld,0,64,0,overworld,0,80,0,climb,2.5
//! ```
//!
//! Rows whose origin equals their destination are rejected: a stationary
//! port carries no information for the port graph.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use nav_core::{Cell, ModeType, Port};

use crate::{SearchError, SearchResult};

// ── CSV record ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct PortRecord {
    origin_domain: String,
    ox:            i32,
    oy:            i32,
    oz:            i32,
    dest_domain:   String,
    dx:            i32,
    dy:            i32,
    dz:            i32,
    mode:          String,
    cost:          f64,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load ports from a CSV file.
pub fn load_ports_csv(path: &Path) -> SearchResult<Vec<Port>> {
    let file = std::fs::File::open(path)?;
    load_ports_reader(file)
}

/// Like [`load_ports_csv`] but accepts any `Read` source.
pub fn load_ports_reader<R: Read>(reader: R) -> SearchResult<Vec<Port>> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut ports = Vec::new();

    for (row, result) in csv_reader.deserialize::<PortRecord>().enumerate() {
        let record = result.map_err(|e| SearchError::Parse(e.to_string()))?;
        ports.push(to_port(record).map_err(|e| SearchError::Parse(format!("row {}: {e}", row + 1)))?);
    }
    Ok(ports)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn to_port(r: PortRecord) -> Result<Port, String> {
    let mode: ModeType = r.mode.parse().map_err(|e: nav_core::NavError| e.to_string())?;
    let origin = Cell::new(r.origin_domain.as_str(), r.ox, r.oy, r.oz);
    let destination = Cell::new(r.dest_domain.as_str(), r.dx, r.dy, r.dz);
    if origin == destination {
        return Err(format!("port at {origin} leads nowhere"));
    }
    Port::new(origin, destination, mode, r.cost).map_err(|e| e.to_string())
}
