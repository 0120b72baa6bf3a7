use crate::object::{Address, ObjectId};
use crate::HeapObjectStore;

/// Give every root present in the store distance 0. Returns the distinct
/// root objects found; addresses with no object are skipped.
pub fn seed_roots(store: &mut HeapObjectStore, roots: &[Address]) -> Vec<ObjectId> {
    let mut seeded = vec![];
    let mut missing = 0usize;
    for r in roots {
        let Some(id) = store.id_of(*r) else {
            missing += 1;
            continue;
        };
        if store.records_mut()[id.index()].relax(0) {
            seeded.push(id);
        }
    }
    if missing > 0 {
        debug!("{} root addresses have no object in the snapshot", missing);
    }
    seeded
}

/// Relax root distances along forward edges until a full pass changes
/// nothing.
///
/// Edges all have unit weight and cycles are common, so this is a plain
/// Bellman-Ford style fixed point: distances only ever shrink and are
/// bounded below by zero, which guarantees termination. Objects that never
/// receive a distance are dead. Returns the number of passes, including the
/// final one that confirmed the fixed point.
pub fn propagate(store: &mut HeapObjectStore) -> usize {
    let objects = store.records_mut();
    let mut passes = 0;
    loop {
        passes += 1;
        let mut changed = false;
        for i in 0..objects.len() {
            let Some(d) = objects[i].root_distance else {
                continue;
            };
            for k in 0..objects[i].forward.len() {
                let t = objects[i].forward[k].index();
                changed |= objects[t].relax(d + 1);
            }
        }
        if !changed {
            break;
        }
    }
    debug!("Root distances converged after {} passes", passes);
    passes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap_data::RawHeapEntry;

    fn store_of(entries: Vec<RawHeapEntry>) -> HeapObjectStore {
        let mut store = HeapObjectStore::new();
        store.begin_load();
        for e in entries {
            store.insert(e);
        }
        store.finish_load();
        store
    }

    fn distance(store: &HeapObjectStore, a: Address) -> Option<u32> {
        store.get(a).unwrap().root_distance()
    }

    #[test]
    fn test_simple_chain() {
        let mut store = store_of(vec![
            RawHeapEntry::java(100, 8, 1, vec![200]),
            RawHeapEntry::java(200, 8, 1, vec![]),
            RawHeapEntry::java(300, 8, 1, vec![]),
        ]);
        let seeded = seed_roots(&mut store, &[100]);
        assert_eq!(seeded.len(), 1);
        propagate(&mut store);
        assert_eq!(distance(&store, 100), Some(0));
        assert_eq!(distance(&store, 200), Some(1));
        assert_eq!(distance(&store, 300), None);
        assert!(!store.get(300).unwrap().is_alive());
    }

    #[test]
    fn test_unreachable_cycle_stays_dead() {
        let mut store = store_of(vec![
            RawHeapEntry::java(0x10, 8, 1, vec![]),
            RawHeapEntry::java(0xd0, 8, 1, vec![0xe0]),
            RawHeapEntry::java(0xe0, 8, 1, vec![0xd0]),
        ]);
        seed_roots(&mut store, &[0x10]);
        let passes = propagate(&mut store);
        assert_eq!(passes, 1);
        assert_eq!(distance(&store, 0xd0), None);
        assert_eq!(distance(&store, 0xe0), None);
    }

    #[test]
    fn test_reachable_cycle_converges_to_minimum() {
        // root -> a -> b -> c -> a, plus root -> c
        let mut store = store_of(vec![
            RawHeapEntry::java(0x10, 8, 1, vec![0x20, 0x40]),
            RawHeapEntry::java(0x20, 8, 1, vec![0x30]),
            RawHeapEntry::java(0x30, 8, 1, vec![0x40]),
            RawHeapEntry::java(0x40, 8, 1, vec![0x20]),
        ]);
        seed_roots(&mut store, &[0x10]);
        propagate(&mut store);
        assert_eq!(distance(&store, 0x20), Some(1));
        assert_eq!(distance(&store, 0x30), Some(2));
        assert_eq!(distance(&store, 0x40), Some(1));
    }

    #[test]
    fn test_distance_tightens_when_found_through_later_object() {
        // Objects are scanned in address order; the long path is found first
        // and the short path only in a later pass.
        let mut store = store_of(vec![
            RawHeapEntry::java(0x10, 8, 1, vec![0x20]),
            RawHeapEntry::java(0x20, 8, 1, vec![0x30]),
            RawHeapEntry::java(0x30, 8, 1, vec![0x40]),
            RawHeapEntry::java(0x40, 8, 1, vec![]),
            RawHeapEntry::java(0x90, 8, 1, vec![0x80]),
            RawHeapEntry::java(0x80, 8, 1, vec![0x40]),
        ]);
        seed_roots(&mut store, &[0x10, 0x90]);
        propagate(&mut store);
        assert_eq!(distance(&store, 0x40), Some(2));
        assert_eq!(distance(&store, 0x80), Some(1));
    }

    #[test]
    fn test_missing_and_repeated_roots() {
        let mut store = store_of(vec![RawHeapEntry::java(0x10, 8, 1, vec![])]);
        let seeded = seed_roots(&mut store, &[0x10, 0x999, 0x10]);
        assert_eq!(seeded, vec![store.id_of(0x10).unwrap()]);
    }

    #[test]
    fn test_root_reached_by_edge_keeps_zero() {
        let mut store = store_of(vec![
            RawHeapEntry::java(0x10, 8, 1, vec![0x20]),
            RawHeapEntry::java(0x20, 8, 1, vec![0x10]),
        ]);
        seed_roots(&mut store, &[0x10, 0x20]);
        propagate(&mut store);
        assert_eq!(distance(&store, 0x10), Some(0));
        assert_eq!(distance(&store, 0x20), Some(0));
    }

    #[test]
    fn test_empty_store() {
        let mut store = store_of(vec![]);
        assert!(seed_roots(&mut store, &[1, 2, 3]).is_empty());
        assert_eq!(propagate(&mut store), 1);
    }
}
