#[macro_use]
extern crate log;

use std::time::Instant;

use anyhow::Result;
use clap::Parser;

use memprof::*;

mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

fn get_git_info() -> String {
    match (built_info::GIT_COMMIT_HASH, built_info::GIT_DIRTY) {
        (Some(hash), Some(dirty)) => format!(
            "{}{}",
            hash.split_at(7).0,
            if dirty { "-dirty" } else { "" }
        ),
        (Some(hash), None) => format!("{}{}", hash.split_at(7).0, "-?"),
        _ => "unknown-git-version".to_string(),
    }
}

fn reified_main(args: Args) -> Result<()> {
    match &args.command {
        Commands::Depth(depth_args) => return analysis::object_depth(&args, depth_args),
        Commands::Export(export_args) => return export(&args, export_args),
        _ => {}
    }
    for path in &args.paths {
        let start = Instant::now();
        let snapshot = load_snapshot(path, args.verify)?;
        debug!(
            "Snapshot of {} ready in {} ms",
            path,
            start.elapsed().as_micros() as f64 / 1000f64
        );
        match &args.command {
            Commands::Stats(a) => print_stats(&snapshot, a),
            Commands::Objects(a) => print_objects_of_class(&snapshot, a),
            Commands::Range(a) => print_range(&snapshot, a)?,
            Commands::Path(a) => print_path(&snapshot, a)?,
            Commands::Depth(_) | Commands::Export(_) => unreachable!(),
        }
    }
    Ok(())
}

pub fn main() -> Result<()> {
    env_logger::init();
    println!("memprof {}", get_git_info());
    let args = Args::parse();
    reified_main(args)
}
