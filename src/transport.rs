use crate::heapdump::GlobalRanges;
use crate::object::ClassId;
use anyhow::Result;

/// The request/reply protocol to a debuggee VM, as far as building a
/// snapshot needs it.
///
/// Timeouts and retries belong to the implementation; any error it returns
/// makes the whole refresh fail.
pub trait VmConnection {
    fn pause(&mut self) -> Result<()>;
    fn resume(&mut self) -> Result<()>;
    /// `(class id, JNI class name)` for every loaded class.
    fn fetch_class_list(&mut self) -> Result<Vec<(ClassId, String)>>;
    /// One batch of packed heap words, ending in -1 (done) or -2 (fetch
    /// another batch).
    fn fetch_heap_batch(&mut self) -> Result<Vec<i32>>;
    /// Root addresses terminated by -1.
    fn fetch_root_addresses(&mut self) -> Result<Vec<i32>>;
    fn fetch_global_ranges(&mut self) -> Result<GlobalRanges>;
}

impl<C: VmConnection + ?Sized> VmConnection for &mut C {
    fn pause(&mut self) -> Result<()> {
        (**self).pause()
    }

    fn resume(&mut self) -> Result<()> {
        (**self).resume()
    }

    fn fetch_class_list(&mut self) -> Result<Vec<(ClassId, String)>> {
        (**self).fetch_class_list()
    }

    fn fetch_heap_batch(&mut self) -> Result<Vec<i32>> {
        (**self).fetch_heap_batch()
    }

    fn fetch_root_addresses(&mut self) -> Result<Vec<i32>> {
        (**self).fetch_root_addresses()
    }

    fn fetch_global_ranges(&mut self) -> Result<GlobalRanges> {
        (**self).fetch_global_ranges()
    }
}
