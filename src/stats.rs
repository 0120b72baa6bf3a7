use crate::object::{Address, ClassId};
use crate::{ClassCatalog, HeapObjectStore};
use std::collections::BTreeMap;

pub const INTERNAL_BUCKET_NAME: &str = "Internal VM Objects";

/// Percentages are fixed point: 10000 means 100%.
pub const BASIS_POINTS: u64 = 10000;

fn basis_points(part: u64, whole: u64) -> u64 {
    if whole == 0 {
        0
    } else {
        part * BASIS_POINTS / whole
    }
}

/// Per-class rollup of one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassStatistics {
    /// `None` for the bucket holding every non-Java object.
    pub class_id: Option<ClassId>,
    pub class_name: String,
    pub count: u64,
    pub total_size: u64,
    pub dead_size: u64,
    pub old_gen_size: u64,
    /// Share of the whole heap, in basis points.
    pub heap_percentage: u64,
}

impl ClassStatistics {
    fn new(class_id: Option<ClassId>, class_name: &str) -> Self {
        ClassStatistics {
            class_id,
            class_name: class_name.to_string(),
            count: 0,
            total_size: 0,
            dead_size: 0,
            old_gen_size: 0,
            heap_percentage: 0,
        }
    }

    pub fn live_size(&self) -> u64 {
        self.total_size - self.dead_size
    }

    pub fn live_percentage(&self) -> u64 {
        basis_points(self.live_size(), self.total_size)
    }

    pub fn old_gen_percentage(&self) -> u64 {
        basis_points(self.old_gen_size, self.total_size)
    }

    pub fn average_size(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            self.total_size / self.count
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatisticsReport {
    /// Sorted by heap percentage, largest first.
    pub classes: Vec<ClassStatistics>,
    /// Sum of every bucket's `total_size`.
    pub total_heap_size: u64,
}

impl StatisticsReport {
    pub fn total_objects(&self) -> u64 {
        self.classes.iter().map(|c| c.count).sum()
    }

    pub fn dead_size(&self) -> u64 {
        self.classes.iter().map(|c| c.dead_size).sum()
    }

    pub fn live_size(&self) -> u64 {
        self.total_heap_size - self.dead_size()
    }

    pub fn get(&self, class_id: ClassId) -> Option<&ClassStatistics> {
        self.classes.iter().find(|c| c.class_id == Some(class_id))
    }

    pub fn internal(&self) -> Option<&ClassStatistics> {
        self.classes.iter().find(|c| c.class_id.is_none())
    }
}

/// Roll every object of the store up into per-class buckets.
///
/// Java objects of a class missing from the catalog get a bucket of their
/// own named "unknown", so bucket sizes always add up to the heap.
pub fn compute_all(
    store: &HeapObjectStore,
    catalog: &ClassCatalog,
    old_gen_end: Address,
) -> StatisticsReport {
    let mut buckets: BTreeMap<ClassId, ClassStatistics> = catalog
        .iter()
        .map(|(id, name)| (id, ClassStatistics::new(Some(id), name)))
        .collect();
    let mut internal = ClassStatistics::new(None, INTERNAL_BUCKET_NAME);
    let mut total_heap_size = 0u64;

    for o in store.iter() {
        let bucket = match o.class_id() {
            Some(id) => buckets
                .entry(id)
                .or_insert_with(|| ClassStatistics::new(Some(id), catalog.name_or_unknown(id))),
            None => &mut internal,
        };
        let size = o.size() as u64;
        bucket.count += 1;
        bucket.total_size += size;
        if !o.is_alive() {
            bucket.dead_size += size;
        }
        if o.address() < old_gen_end {
            bucket.old_gen_size += size;
        }
        total_heap_size += size;
    }

    let mut classes: Vec<ClassStatistics> = buckets.into_values().collect();
    classes.push(internal);
    for c in classes.iter_mut() {
        c.heap_percentage = basis_points(c.total_size, total_heap_size);
    }
    // stable: ties keep class id order, internal bucket last
    classes.sort_by(|a, b| b.heap_percentage.cmp(&a.heap_percentage));
    StatisticsReport {
        classes,
        total_heap_size,
    }
}
