use crate::error::HeapError;
use crate::graph::resolve_edges;
use crate::heap_data::{BatchDecoder, BatchEnd, RawHeapEntry};
use crate::object::{Address, ObjectId, ObjectRecord};
use std::collections::HashMap;

/// All objects of one snapshot, keyed by address.
///
/// Loading happens in two phases. While loading, entries are collected by
/// address and may overwrite each other. [`finish_load`] then freezes the
/// store into an address-sorted arena and resolves references into edges,
/// since a reference may target an object that arrives later in the stream.
///
/// [`finish_load`]: HeapObjectStore::finish_load
#[derive(Debug, Default)]
pub struct HeapObjectStore {
    pending: HashMap<Address, ObjectRecord>,
    objects: Vec<ObjectRecord>,
    index: HashMap<Address, ObjectId>,
    max_object_size: u32,
    total_size: u64,
}

impl HeapObjectStore {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn begin_load(&mut self) {
        self.pending.clear();
        self.objects.clear();
        self.index.clear();
        self.max_object_size = 0;
        self.total_size = 0;
    }

    pub fn insert(&mut self, entry: RawHeapEntry) {
        let record = entry.into_record();
        if let Some(old) = self.pending.insert(record.address, record) {
            warn!("Object 0x{:x} reported twice, keeping the later entry", old.address);
        }
    }

    /// Decode one heap-data batch into the store.
    pub fn ingest_batch(&mut self, words: &[i32]) -> Result<BatchEnd, HeapError> {
        let mut decoder = BatchDecoder::new(words);
        let mut ingested = 0usize;
        while let Some(entry) = decoder.next_entry()? {
            self.insert(entry);
            ingested += 1;
        }
        if decoder.trailing_words() > 0 {
            debug!("Ignoring {} words after the batch sentinel", decoder.trailing_words());
        }
        debug!("Ingested {} heap entries", ingested);
        // next_entry only returns None once the sentinel is consumed
        Ok(decoder.end().unwrap_or(BatchEnd::End))
    }

    /// Freeze the store and resolve every reference into an edge.
    pub fn finish_load(&mut self) {
        let mut objects: Vec<ObjectRecord> = self.pending.drain().map(|(_, o)| o).collect();
        objects.sort_unstable_by_key(|o| o.address);
        self.index.clear();
        self.index.reserve(objects.len());
        self.max_object_size = 0;
        self.total_size = 0;
        for (i, o) in objects.iter_mut().enumerate() {
            o.id = ObjectId(i as u32);
            self.index.insert(o.address, o.id);
            self.max_object_size = self.max_object_size.max(o.size);
            self.total_size += o.size as u64;
        }
        self.objects = objects;
        let stats = resolve_edges(&mut self.objects, &self.index);
        debug!(
            "Resolved {} edges over {} objects, dropped {} dangling references",
            stats.resolved,
            self.objects.len(),
            stats.dangling
        );
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn id_of(&self, address: Address) -> Option<ObjectId> {
        self.index.get(&address).copied()
    }

    pub fn get(&self, address: Address) -> Option<&ObjectRecord> {
        self.id_of(address).map(|id| &self.objects[id.index()])
    }

    pub fn get_by_id(&self, id: ObjectId) -> Option<&ObjectRecord> {
        self.objects.get(id.index())
    }

    pub fn record(&self, id: ObjectId) -> &ObjectRecord {
        &self.objects[id.index()]
    }

    /// Objects in ascending address order.
    pub fn iter(&self) -> std::slice::Iter<'_, ObjectRecord> {
        self.objects.iter()
    }

    pub(crate) fn records_mut(&mut self) -> &mut [ObjectRecord] {
        &mut self.objects
    }

    /// Sum of all object sizes.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Objects whose extent `[address, address + size)` overlaps
    /// `[start, end)`, in address order. The caller checks `start <= end`.
    pub(crate) fn overlapping(&self, start: Address, end: Address) -> &[ObjectRecord] {
        // nothing starting more than max_object_size below `start` can reach it
        let lowest = start.saturating_sub(self.max_object_size);
        let from = self.objects.partition_point(|o| o.address < lowest);
        let to = self.objects.partition_point(|o| o.address < end);
        if from >= to {
            return &[];
        }
        &self.objects[from..to]
    }
}
