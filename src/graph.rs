use crate::object::{Address, ObjectId, ObjectRecord};
use std::collections::HashMap;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EdgeStats {
    pub resolved: usize,
    /// References whose target is not part of the snapshot.
    pub dangling: usize,
}

/// Turn raw referenced addresses into forward and back edges.
///
/// Must only run once every object of the snapshot is present. Several
/// references from one object to the same target make a single edge.
pub(crate) fn resolve_edges(
    objects: &mut [ObjectRecord],
    index: &HashMap<Address, ObjectId>,
) -> EdgeStats {
    let mut stats = EdgeStats::default();
    for o in objects.iter_mut() {
        o.forward.clear();
        o.back.clear();
    }
    for i in 0..objects.len() {
        let mut targets: Vec<ObjectId> = Vec::with_capacity(objects[i].references.len());
        for r in &objects[i].references {
            match index.get(r) {
                Some(t) => targets.push(*t),
                None => stats.dangling += 1,
            }
        }
        targets.sort_unstable();
        targets.dedup();
        stats.resolved += targets.len();
        objects[i].forward = targets;
    }
    // sources are visited in id order, so back edges come out sorted
    for i in 0..objects.len() {
        let source = objects[i].id;
        for k in 0..objects[i].forward.len() {
            let t = objects[i].forward[k];
            objects[t.index()].back.push(source);
        }
    }
    stats
}
