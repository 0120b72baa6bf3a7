use crate::sanity::verify_distances;
use crate::*;
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Recorded heap dumps (.binpb.zst)
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Cross-check root distances with a breadth-first search
    #[arg(long, default_value_t = false)]
    pub verify: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Decimal or `0x` prefixed hexadecimal.
pub fn parse_address(s: &str) -> Result<Address, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => Address::from_str_radix(hex, 16),
        None => s.parse::<Address>(),
    };
    parsed.map_err(|e| format!("invalid address '{}': {}", s, e))
}

#[derive(Parser, Debug, Clone, Copy)]
pub struct StatsArgs {
    /// Only print the largest N classes
    #[arg(short, long)]
    pub limit: Option<usize>,
}

#[derive(Parser, Debug, Clone, Copy)]
pub struct ObjectsArgs {
    #[arg(short, long)]
    pub class_id: ClassId,
}

#[derive(Parser, Debug, Clone, Copy)]
pub struct RangeArgs {
    #[arg(short, long, value_parser = parse_address)]
    pub start: Address,
    #[arg(short, long, value_parser = parse_address)]
    pub end: Address,
}

#[derive(Parser, Debug, Clone, Copy)]
pub struct PathArgs {
    #[arg(short, long, value_parser = parse_address)]
    pub address: Address,
}

#[derive(Parser, Debug, Clone)]
pub struct DepthArgs {
    #[arg(short, long)]
    pub output_file: String,
}

#[derive(Parser, Debug, Clone)]
pub struct ExportArgs {
    #[arg(short, long)]
    pub output_path: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Per-class statistics
    Stats(StatsArgs),
    /// Instances of one class
    Objects(ObjectsArgs),
    /// Objects overlapping an address range
    Range(RangeArgs),
    /// Shortest reference chain from a root to an object
    Path(PathArgs),
    /// Root-distance histogram as parquet
    Depth(DepthArgs),
    /// Resolved reference graph as CSV
    Export(ExportArgs),
}

/// Replay one recorded heap dump into a fresh snapshot.
pub fn load_snapshot(path: &str, verify: bool) -> Result<Snapshot> {
    let mut conn = ReplayConnection::from_binpb_zst(path)?;
    let mut snapshot = Snapshot::new();
    snapshot.refresh(&mut conn, true)?;
    info!(
        "Loaded {}: {} objects, {} roots, converged in {} passes",
        path,
        snapshot.store().len(),
        snapshot.roots().count(),
        snapshot.propagation_passes()
    );
    if verify || cfg!(debug_assertions) {
        let mismatches = verify_distances(&snapshot);
        if mismatches > 0 {
            bail!("{} objects disagree with the sanity trace in {}", mismatches, path);
        }
        info!("Sanity trace agrees on all {} objects", snapshot.store().len());
    }
    Ok(snapshot)
}
