use crate::object::ObjectId;
use crate::Snapshot;
use fixedbitset::FixedBitSet;
use std::collections::VecDeque;

/// Root distances computed with a plain breadth-first search from the
/// roots, indexed by object id.
pub fn sanity_distances(snapshot: &Snapshot) -> Vec<Option<u32>> {
    let store = snapshot.store();
    let mut distances: Vec<Option<u32>> = vec![None; store.len()];
    let mut visited = FixedBitSet::with_capacity(store.len());
    let mut queue: VecDeque<(ObjectId, u32)> = VecDeque::new();
    for root in snapshot.roots() {
        queue.push_back((root.id(), 0));
    }
    while let Some((o, depth)) = queue.pop_front() {
        if visited.put(o.index()) {
            continue;
        }
        distances[o.index()] = Some(depth);
        for child in store.record(o).forward_edges() {
            if !visited.contains(child.index()) {
                queue.push_back((*child, depth + 1));
            }
        }
    }
    distances
}

/// Compare propagated root distances with [`sanity_distances`] and report
/// every object that disagrees. Returns the number of mismatches.
pub fn verify_distances(snapshot: &Snapshot) -> usize {
    let expected = sanity_distances(snapshot);
    let mut mismatches = 0;
    for (o, want) in snapshot.store().iter().zip(expected.iter()) {
        if o.root_distance() != *want {
            info!(
                "0x{:x} has root distance {:?}, breadth-first search found {:?}",
                o.address(),
                o.root_distance(),
                want
            );
            mismatches += 1;
        }
    }
    mismatches
}
