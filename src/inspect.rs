use crate::stats::BASIS_POINTS;
use crate::*;
use anyhow::{anyhow, Result};

/// `1234` basis points -> `12.34%`.
pub fn format_basis_points(bp: u64) -> String {
    format!("{}.{:02}%", bp / (BASIS_POINTS / 100), bp % (BASIS_POINTS / 100))
}

fn describe(snapshot: &Snapshot, o: &ObjectRecord) -> String {
    let distance = match o.root_distance() {
        Some(d) => d.to_string(),
        None => "dead".to_string(),
    };
    format!(
        "0x{:08x}\t{}\t{}\t{}",
        o.address(),
        o.size(),
        distance,
        snapshot.type_name(o)
    )
}

pub fn print_stats(snapshot: &Snapshot, args: &StatsArgs) {
    let report = snapshot.compute_statistics();
    let limit = args.limit.unwrap_or(usize::MAX);
    println!("============================ Tabulate Statistics ============================");
    println!("class\tcount\tsize\tavg\theap\tlive\told");
    for c in report.classes.iter().take(limit) {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            c.class_name,
            c.count,
            c.total_size,
            c.average_size(),
            format_basis_points(c.heap_percentage),
            format_basis_points(c.live_percentage()),
            format_basis_points(c.old_gen_percentage())
        );
    }
    println!(
        "total\t{}\t{}\tlive {}\tdead {}",
        report.total_objects(),
        report.total_heap_size,
        report.live_size(),
        report.dead_size()
    );
    println!("-------------------------- End Tabulate Statistics --------------------------");
}

pub fn print_objects_of_class(snapshot: &Snapshot, args: &ObjectsArgs) {
    let objects = snapshot.objects_of_class(args.class_id);
    info!(
        "{} instances of {}",
        objects.len(),
        snapshot.catalog().name_or_unknown(args.class_id)
    );
    for o in objects {
        println!("{}", describe(snapshot, o));
    }
}

pub fn print_range(snapshot: &Snapshot, args: &RangeArgs) -> Result<()> {
    for o in snapshot.objects_in_address_range(args.start, args.end)? {
        println!("{}", describe(snapshot, o));
    }
    Ok(())
}

pub fn print_path(snapshot: &Snapshot, args: &PathArgs) -> Result<()> {
    let obj = snapshot
        .object(args.address)
        .ok_or_else(|| anyhow!("no object at 0x{:x}", args.address))?;
    match snapshot.path_from_root(obj)? {
        Some(path) => {
            for o in path {
                println!("{}", describe(snapshot, o));
            }
        }
        None => println!("0x{:x} is not reachable from any root", args.address),
    }
    Ok(())
}
