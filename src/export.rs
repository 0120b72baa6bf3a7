use crate::*;
use anyhow::Result;
use std::io::Write;

/// Write every resolved reference of `snapshot` as a `source,target` line.
pub fn write_edges(snapshot: &Snapshot, mut out: impl Write) -> Result<usize> {
    writeln!(out, "source,target")?;
    let mut edges = 0;
    for o in snapshot.store().iter() {
        for t in snapshot.referents(o) {
            writeln!(out, "{},{}", o.address(), t.address())?;
            edges += 1;
        }
    }
    Ok(edges)
}

pub fn export(args: &Args, export_args: &ExportArgs) -> Result<()> {
    assert_eq!(args.paths.len(), 1, "Can only export one heap dump at a time");
    let snapshot = load_snapshot(&args.paths[0], args.verify)?;
    // Open the output file for writing
    let output_file = std::fs::File::create(&export_args.output_path)?;
    let edges = write_edges(&snapshot, std::io::BufWriter::new(output_file))?;
    info!("Exported {} edges to {}", edges, export_args.output_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap_data::RawHeapEntry;
    use crate::test_util::HeapDumpBuilder;

    #[test]
    fn test_only_resolved_edges_are_written() {
        let dump = HeapDumpBuilder::new()
            .object(RawHeapEntry::java(16, 8, 1, vec![32, 48, 9999]))
            .object(RawHeapEntry::java(32, 8, 1, vec![16]))
            .object(RawHeapEntry::java(48, 8, 1, vec![]))
            .build();
        let mut s = Snapshot::new();
        s.refresh(&mut ReplayConnection::new(dump), true).unwrap();
        let mut buf = vec![];
        assert_eq!(write_edges(&s, &mut buf).unwrap(), 3);
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "source,target\n16,32\n16,48\n32,16\n");
    }
}
