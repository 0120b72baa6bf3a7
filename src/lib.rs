#[macro_use]
extern crate log;

pub mod analysis;
mod catalog;
mod cli;
mod error;
mod export;
mod graph;
pub mod heap_data;
mod heapdump;
mod inspect;
pub mod liveness;
mod object;
pub mod sanity;
mod snapshot;
pub mod stats;
mod store;
#[cfg(test)]
mod test_util;
mod transport;

pub use crate::catalog::{jni_to_dotted, ClassCatalog, UNKNOWN_CLASS_NAME};
pub use crate::cli::*;
pub use crate::error::HeapError;
pub use crate::export::{export, write_edges};
pub use crate::graph::EdgeStats;
pub use crate::heap_data::{BatchEnd, RawHeapEntry};
pub use crate::heapdump::{ClassEntry, GlobalRanges, HeapBatch, HeapDump, ReplayConnection};
pub use crate::inspect::*;
pub use crate::object::{Address, ClassId, ObjectId, ObjectKind, ObjectRecord};
pub use crate::snapshot::{Snapshot, STACK_TYPE_NAME, VM_INTERNAL_TYPE_NAME};
pub use crate::stats::{ClassStatistics, StatisticsReport};
pub use crate::store::HeapObjectStore;
pub use crate::transport::VmConnection;
