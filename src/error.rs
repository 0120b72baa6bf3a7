use crate::object::Address;
use thiserror::Error;

/// Everything that can go wrong while building or querying a [`Snapshot`].
///
/// [`Snapshot`]: crate::Snapshot
#[derive(Debug, Error)]
pub enum HeapError {
    /// The connection to the target VM failed while fetching a snapshot.
    #[error("snapshot unavailable: {0}")]
    TransportFailure(#[from] anyhow::Error),

    /// A heap-data reply could not be decoded.
    #[error("malformed heap batch at word {offset}: {reason}")]
    MalformedBatch { offset: usize, reason: &'static str },

    #[error("invalid address range: start 0x{start:x} is past end 0x{end:x}")]
    InvalidRange { start: Address, end: Address },

    /// Root-path reconstruction found a live object with no predecessor one
    /// hop closer to the roots. Propagation guarantees one exists, so this
    /// means the graph is corrupt.
    #[error("object 0x{address:x} at root distance {distance} has no predecessor one hop closer")]
    InternalInconsistency { address: Address, distance: u32 },
}

impl HeapError {
    /// Failures that came from fetching or decoding snapshot data, as opposed
    /// to query misuse.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            HeapError::TransportFailure(_) | HeapError::MalformedBatch { .. }
        )
    }
}
