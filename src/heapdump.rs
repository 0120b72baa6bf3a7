//! Recorded profiler sessions.
//!
//! A [`HeapDump`] holds the replies a target VM gave to one snapshot
//! refresh, stored as zstd compressed protobuf (`.binpb.zst`). Replaying it
//! through [`ReplayConnection`] rebuilds the exact same snapshot offline.
use crate::object::ClassId;
use crate::transport::VmConnection;
use anyhow::{bail, Result};
use prost::Message;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

#[derive(Clone, PartialEq, Message)]
pub struct ClassEntry {
    #[prost(uint32, tag = "1")]
    pub class_id: u32,
    /// JNI form, e.g. `Ljava/lang/String;`.
    #[prost(string, tag = "2")]
    pub jni_name: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct HeapBatch {
    /// Packed entries followed by a sentinel, see [`crate::heap_data`].
    #[prost(int32, repeated, tag = "1")]
    pub words: Vec<i32>,
}

/// Address layout of the target heap.
#[derive(Clone, Copy, PartialEq, Eq, Message)]
pub struct GlobalRanges {
    #[prost(uint32, tag = "1")]
    pub heap_start: u32,
    #[prost(uint32, tag = "2")]
    pub heap_top: u32,
    /// Everything below this address is old generation.
    #[prost(uint32, tag = "3")]
    pub old_gen_end: u32,
    #[prost(uint32, tag = "4")]
    pub allocation_top: u32,
}

#[derive(Clone, PartialEq, Message)]
pub struct HeapDump {
    #[prost(message, repeated, tag = "1")]
    pub classes: Vec<ClassEntry>,
    #[prost(message, repeated, tag = "2")]
    pub heap_batches: Vec<HeapBatch>,
    /// Root addresses terminated by -1.
    #[prost(int32, repeated, tag = "3")]
    pub roots: Vec<i32>,
    #[prost(message, optional, tag = "4")]
    pub globals: Option<GlobalRanges>,
}

impl HeapDump {
    pub fn from_binpb_zst(p: impl AsRef<Path>) -> Result<HeapDump> {
        let file = File::open(p)?;
        let mut reader = zstd::Decoder::new(file)?;
        let mut buf = vec![];
        reader.read_to_end(&mut buf)?;
        Ok(HeapDump::decode(buf.as_slice())?)
    }

    pub fn write_binpb_zst(&self, p: impl AsRef<Path>) -> Result<()> {
        let file = File::create(p)?;
        let mut writer = zstd::Encoder::new(file, 0)?;
        writer.write_all(&self.encode_to_vec())?;
        writer.finish()?;
        Ok(())
    }
}

/// Serves the replies of a recorded [`HeapDump`] as if they came from a
/// live VM.
pub struct ReplayConnection {
    heapdump: HeapDump,
    next_batch: usize,
    paused: bool,
}

impl ReplayConnection {
    pub fn new(heapdump: HeapDump) -> Self {
        ReplayConnection {
            heapdump,
            next_batch: 0,
            paused: false,
        }
    }

    pub fn from_binpb_zst(p: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(HeapDump::from_binpb_zst(p)?))
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

impl VmConnection for ReplayConnection {
    fn pause(&mut self) -> Result<()> {
        self.paused = true;
        // every refresh replays the recording from the start
        self.next_batch = 0;
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        self.paused = false;
        Ok(())
    }

    fn fetch_class_list(&mut self) -> Result<Vec<(ClassId, String)>> {
        Ok(self
            .heapdump
            .classes
            .iter()
            .map(|c| (c.class_id, c.jni_name.clone()))
            .collect())
    }

    fn fetch_heap_batch(&mut self) -> Result<Vec<i32>> {
        let Some(batch) = self.heapdump.heap_batches.get(self.next_batch) else {
            bail!(
                "heap dump ran out of heap batches after {} batches",
                self.next_batch
            );
        };
        self.next_batch += 1;
        Ok(batch.words.clone())
    }

    fn fetch_root_addresses(&mut self) -> Result<Vec<i32>> {
        Ok(self.heapdump.roots.clone())
    }

    fn fetch_global_ranges(&mut self) -> Result<GlobalRanges> {
        match self.heapdump.globals {
            Some(g) => Ok(g),
            None => bail!("heap dump has no global address ranges"),
        }
    }
}
