use crate::*;
use anyhow::Result;
use polars::functions::concat_df_diagonal;
use polars::prelude::*;
use std::{collections::BTreeMap, fs::File};

/// Root distance used for dead objects in the histogram.
pub const DEAD_DEPTH: i64 = -1;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DepthBucket {
    pub objects: u64,
    pub bytes: u64,
}

/// Objects and bytes at each root distance. Dead objects land at
/// [`DEAD_DEPTH`].
pub fn depth_histogram(snapshot: &Snapshot) -> BTreeMap<i64, DepthBucket> {
    let mut hist: BTreeMap<i64, DepthBucket> = BTreeMap::new();
    for o in snapshot.store().iter() {
        let depth = o.root_distance().map_or(DEAD_DEPTH, i64::from);
        let bucket = hist.entry(depth).or_default();
        bucket.objects += 1;
        bucket.bytes += o.size() as u64;
    }
    debug_assert_eq!(
        hist.values().map(|b| b.objects).sum::<u64>() as usize,
        snapshot.store().len()
    );
    hist
}

/// Write the root-distance histogram of every input to one parquet file.
pub fn object_depth(args: &Args, depth_args: &DepthArgs) -> Result<()> {
    let mut dfs = vec![];
    for (i, path) in args.paths.iter().enumerate() {
        let snapshot = load_snapshot(path, args.verify)?;
        let hist = depth_histogram(&snapshot);
        let depth_vec: Vec<i64> = hist.keys().copied().collect();
        let count_vec: Vec<u64> = hist.values().map(|b| b.objects).collect();
        let bytes_vec: Vec<u64> = hist.values().map(|b| b.bytes).collect();
        let mut df = df! {
            "depth" => depth_vec,
            "counts" => count_vec,
            "bytes" => bytes_vec
        }?;
        let iteration_series = Series::new("iteration", vec![i as u64; df.height()]);
        df.with_column(iteration_series)?;
        dfs.push(df);
    }
    let mut df = concat_df_diagonal(&dfs)?;
    df.as_single_chunk_par();
    let file = File::create(&depth_args.output_file)?;
    let writer = ParquetWriter::new(file);
    writer.finish(&mut df)?;
    info!(
        "Wrote {} depth rows to {}",
        df.height(),
        depth_args.output_file
    );
    Ok(())
}
