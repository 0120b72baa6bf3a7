use crate::error::HeapError;
use crate::heap_data::{decode_root_list, BatchEnd};
use crate::heapdump::GlobalRanges;
use crate::liveness::{propagate, seed_roots};
use crate::object::{Address, ClassId, ObjectId, ObjectKind, ObjectRecord};
use crate::stats::{compute_all, StatisticsReport};
use crate::transport::VmConnection;
use crate::{ClassCatalog, HeapObjectStore};
use std::time::Instant;

pub const STACK_TYPE_NAME: &str = "Stack";
pub const VM_INTERNAL_TYPE_NAME: &str = "VM internal object";

/// One complete, consistent view of the target heap.
///
/// `refresh` takes `&mut self` and all queries take `&self`, so a refresh
/// can never interleave with a query. Sharing a snapshot across threads
/// needs a single lock around it.
#[derive(Debug, Default)]
pub struct Snapshot {
    catalog: ClassCatalog,
    store: HeapObjectStore,
    roots: Vec<ObjectId>,
    globals: GlobalRanges,
    passes: usize,
}

impl Snapshot {
    pub fn new() -> Self {
        Default::default()
    }

    /// Drop everything back to the empty snapshot.
    pub fn reset(&mut self) {
        *self = Snapshot::default();
    }

    /// Pause the target, pull a full snapshot and compute liveness.
    ///
    /// The new snapshot is built off to the side and only replaces the
    /// current one once complete. Any failure leaves the snapshot empty.
    /// With `resume_after` false the target stays suspended.
    pub fn refresh<C: VmConnection + ?Sized>(
        &mut self,
        conn: &mut C,
        resume_after: bool,
    ) -> Result<(), HeapError> {
        self.reset();
        let start = Instant::now();
        let loaded = conn
            .pause()
            .map_err(HeapError::from)
            .and_then(|_| Snapshot::load(conn));
        let snapshot = match loaded {
            Ok(s) => s,
            Err(e) => {
                if resume_after {
                    if let Err(resume_err) = conn.resume() {
                        warn!("Failed to resume target after a failed refresh: {}", resume_err);
                    }
                }
                return Err(e);
            }
        };
        if resume_after {
            conn.resume()?;
        }
        info!(
            "Snapshot of {} classes, {} objects ({} live) in {} ms",
            snapshot.catalog.len(),
            snapshot.store.len(),
            snapshot.live_count(),
            start.elapsed().as_micros() as f64 / 1000f64
        );
        *self = snapshot;
        Ok(())
    }

    fn load<C: VmConnection + ?Sized>(conn: &mut C) -> Result<Snapshot, HeapError> {
        let mut catalog = ClassCatalog::new();
        catalog.reload(conn.fetch_class_list()?);

        let mut store = HeapObjectStore::new();
        store.begin_load();
        let mut batches = 0;
        loop {
            let words = conn.fetch_heap_batch()?;
            batches += 1;
            if store.ingest_batch(&words)? == BatchEnd::End {
                break;
            }
        }
        debug!("Heap data arrived in {} batches", batches);
        store.finish_load();

        let root_addresses = decode_root_list(&conn.fetch_root_addresses()?);
        let globals = conn.fetch_global_ranges()?;
        let roots = seed_roots(&mut store, &root_addresses);
        let passes = propagate(&mut store);
        Ok(Snapshot {
            catalog,
            store,
            roots,
            globals,
            passes,
        })
    }

    pub fn catalog(&self) -> &ClassCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &HeapObjectStore {
        &self.store
    }

    #[cfg(test)]
    pub(crate) fn store_mut(&mut self) -> &mut HeapObjectStore {
        &mut self.store
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty() && self.catalog.is_empty()
    }

    pub fn object(&self, address: Address) -> Option<&ObjectRecord> {
        self.store.get(address)
    }

    /// Root objects present in the snapshot, in the order the VM reported them.
    pub fn roots(&self) -> impl Iterator<Item = &ObjectRecord> {
        self.roots.iter().map(|id| self.store.record(*id))
    }

    /// Passes the last liveness propagation needed to converge.
    pub fn propagation_passes(&self) -> usize {
        self.passes
    }

    pub fn live_count(&self) -> usize {
        self.store.iter().filter(|o| o.is_alive()).count()
    }

    pub fn dead_count(&self) -> usize {
        self.store.len() - self.live_count()
    }

    pub fn max_root_distance(&self) -> Option<u32> {
        self.store.iter().filter_map(|o| o.root_distance()).max()
    }

    /// Java objects of `class_id`, in address order.
    pub fn objects_of_class(&self, class_id: ClassId) -> Vec<&ObjectRecord> {
        self.store
            .iter()
            .filter(|o| o.class_id() == Some(class_id))
            .collect()
    }

    /// Objects whose extent overlaps `[start, end)`, in address order.
    pub fn objects_in_address_range(
        &self,
        start: Address,
        end: Address,
    ) -> Result<Vec<&ObjectRecord>, HeapError> {
        if start > end {
            return Err(HeapError::InvalidRange { start, end });
        }
        Ok(self
            .store
            .overlapping(start, end)
            .iter()
            .filter(|o| o.end() > start as u64 && o.address() < end)
            .collect())
    }

    /// Objects `obj` references.
    pub fn referents(&self, obj: &ObjectRecord) -> Vec<&ObjectRecord> {
        obj.forward_edges().iter().map(|id| self.store.record(*id)).collect()
    }

    /// Objects referencing `obj`.
    pub fn referrers(&self, obj: &ObjectRecord) -> Vec<&ObjectRecord> {
        obj.back_edges().iter().map(|id| self.store.record(*id)).collect()
    }

    /// A shortest reference chain from a root to `obj`, root first.
    ///
    /// `None` if `obj` is dead. `obj` must come from this snapshot.
    pub fn path_from_root<'a>(
        &'a self,
        obj: &'a ObjectRecord,
    ) -> Result<Option<Vec<&'a ObjectRecord>>, HeapError> {
        let Some(mut distance) = obj.root_distance() else {
            return Ok(None);
        };
        let mut path = Vec::with_capacity(distance as usize + 1);
        let mut current = obj;
        path.push(current);
        while distance > 0 {
            let predecessor = current
                .back_edges()
                .iter()
                .filter_map(|id| self.store.get_by_id(*id))
                .find(|p| p.root_distance() == Some(distance - 1));
            let Some(p) = predecessor else {
                error!(
                    "Object 0x{:x} at distance {} has no predecessor at distance {}",
                    current.address(),
                    distance,
                    distance - 1
                );
                return Err(HeapError::InternalInconsistency {
                    address: current.address(),
                    distance,
                });
            };
            current = p;
            distance -= 1;
            path.push(current);
        }
        path.reverse();
        Ok(Some(path))
    }

    pub fn type_name(&self, obj: &ObjectRecord) -> String {
        match obj.kind() {
            ObjectKind::Java { class_id } => self.catalog.name_or_unknown(*class_id).to_string(),
            ObjectKind::Statics { class_id } => {
                format!("Statics of class {}", self.catalog.name_or_unknown(*class_id))
            }
            ObjectKind::Stack { .. } => STACK_TYPE_NAME.to_string(),
            ObjectKind::VmInternal => VM_INTERNAL_TYPE_NAME.to_string(),
            ObjectKind::Unknown(tag) => format!("Unknown object type {}", tag),
        }
    }

    pub fn compute_statistics(&self) -> StatisticsReport {
        compute_all(&self.store, &self.catalog, self.globals.old_gen_end)
    }

    pub fn global_ranges(&self) -> GlobalRanges {
        self.globals
    }

    pub fn heap_start(&self) -> Address {
        self.globals.heap_start
    }

    pub fn heap_top(&self) -> Address {
        self.globals.heap_top
    }

    pub fn old_gen_end(&self) -> Address {
        self.globals.old_gen_end
    }

    pub fn allocation_top(&self) -> Address {
        self.globals.allocation_top
    }
}
