use crate::heap_data::{RawHeapEntry, END_OF_HEAP, END_OF_ROOTS, MORE_DATA};
use crate::heapdump::{ClassEntry, GlobalRanges, HeapBatch, HeapDump};
use crate::object::{Address, ClassId};
use crate::transport::VmConnection;
use anyhow::{bail, Result};

/// Builds recorded sessions for tests.
#[derive(Default)]
pub(crate) struct HeapDumpBuilder {
    classes: Vec<ClassEntry>,
    entries: Vec<RawHeapEntry>,
    roots: Vec<Address>,
    batch_size: Option<usize>,
    globals: GlobalRanges,
}

impl HeapDumpBuilder {
    pub(crate) fn new() -> Self {
        Default::default()
    }

    pub(crate) fn class(mut self, class_id: ClassId, jni_name: &str) -> Self {
        self.classes.push(ClassEntry {
            class_id,
            jni_name: jni_name.to_string(),
        });
        self
    }

    pub(crate) fn object(mut self, entry: RawHeapEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub(crate) fn roots(mut self, roots: &[Address]) -> Self {
        self.roots.extend_from_slice(roots);
        self
    }

    /// Split heap data into batches of at most `n` entries.
    pub(crate) fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = Some(n);
        self
    }

    pub(crate) fn globals(
        mut self,
        heap_start: u32,
        heap_top: u32,
        old_gen_end: u32,
        allocation_top: u32,
    ) -> Self {
        self.globals = GlobalRanges {
            heap_start,
            heap_top,
            old_gen_end,
            allocation_top,
        };
        self
    }

    pub(crate) fn build(self) -> HeapDump {
        let chunk = self.batch_size.unwrap_or(usize::MAX).max(1);
        let mut heap_batches: Vec<HeapBatch> = vec![];
        let mut words = vec![];
        let mut in_batch = 0;
        for e in &self.entries {
            if in_batch == chunk {
                words.push(MORE_DATA);
                heap_batches.push(HeapBatch {
                    words: std::mem::take(&mut words),
                });
                in_batch = 0;
            }
            e.encode(&mut words);
            in_batch += 1;
        }
        words.push(END_OF_HEAP);
        heap_batches.push(HeapBatch { words });
        let mut roots: Vec<i32> = self.roots.iter().map(|r| *r as i32).collect();
        roots.push(END_OF_ROOTS);
        HeapDump {
            classes: self.classes,
            heap_batches,
            roots,
            globals: Some(self.globals),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailAt {
    Pause,
    Classes,
    SecondBatch,
    Roots,
    Globals,
}

/// Wraps a connection and fails one request.
pub(crate) struct FailingConnection<C> {
    inner: C,
    fail_at: FailAt,
    batches: usize,
}

impl<C: VmConnection> FailingConnection<C> {
    pub(crate) fn new(inner: C, fail_at: FailAt) -> Self {
        FailingConnection {
            inner,
            fail_at,
            batches: 0,
        }
    }

    pub(crate) fn inner(&self) -> &C {
        &self.inner
    }

    fn check(&self, at: FailAt) -> Result<()> {
        if self.fail_at == at {
            bail!("connection dropped at {:?}", at);
        }
        Ok(())
    }
}

impl<C: VmConnection> VmConnection for FailingConnection<C> {
    fn pause(&mut self) -> Result<()> {
        self.check(FailAt::Pause)?;
        self.inner.pause()
    }

    fn resume(&mut self) -> Result<()> {
        self.inner.resume()
    }

    fn fetch_class_list(&mut self) -> Result<Vec<(ClassId, String)>> {
        self.check(FailAt::Classes)?;
        self.inner.fetch_class_list()
    }

    fn fetch_heap_batch(&mut self) -> Result<Vec<i32>> {
        self.batches += 1;
        if self.batches == 2 {
            self.check(FailAt::SecondBatch)?;
        }
        self.inner.fetch_heap_batch()
    }

    fn fetch_root_addresses(&mut self) -> Result<Vec<i32>> {
        self.check(FailAt::Roots)?;
        self.inner.fetch_root_addresses()
    }

    fn fetch_global_ranges(&mut self) -> Result<GlobalRanges> {
        self.check(FailAt::Globals)?;
        self.inner.fetch_global_ranges()
    }
}
