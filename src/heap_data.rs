//! The packed word format heap data arrives in.
//!
//! A heap-data reply is a flat sequence of 32-bit words. Each entry is
//!
//! ```text
//! address, size, kind << 24 | class_id, reference_count, references...
//! ```
//!
//! where every reference of a stack entry is followed by its stack offset.
//! An entry address of [`END_OF_HEAP`] ends the heap, [`MORE_DATA`] ends the
//! current batch and means another batch must be fetched.
use crate::error::HeapError;
use crate::object::{Address, ObjectKind, ObjectRecord};
use smallvec::SmallVec;
use std::collections::BTreeMap;

pub const END_OF_HEAP: i32 = -1;
pub const MORE_DATA: i32 = -2;
/// Terminates the root address list.
pub const END_OF_ROOTS: i32 = -1;

pub const KIND_SHIFT: u32 = 24;
pub const CLASS_ID_MASK: u32 = 0x7F_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchEnd {
    /// The heap is complete.
    End,
    /// Another batch follows.
    More,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHeapEntry {
    pub address: Address,
    pub size: u32,
    pub kind_tag: u8,
    /// Low bits of the packed word: class id, stack id or owning class,
    /// depending on the kind.
    pub class_bits: u32,
    pub references: Vec<Address>,
    /// Stack entries only, one per reference.
    pub offsets: Vec<i32>,
}

impl RawHeapEntry {
    pub fn java(address: Address, size: u32, class_id: u32, references: Vec<Address>) -> Self {
        Self::plain(address, size, ObjectKind::TAG_JAVA, class_id, references)
    }

    pub fn statics(address: Address, size: u32, class_id: u32, references: Vec<Address>) -> Self {
        Self::plain(address, size, ObjectKind::TAG_STATICS, class_id, references)
    }

    pub fn vm_internal(address: Address, size: u32, references: Vec<Address>) -> Self {
        Self::plain(address, size, ObjectKind::TAG_VM_INTERNAL, 0, references)
    }

    pub fn stack(address: Address, size: u32, stack_id: u32, slots: Vec<(Address, i32)>) -> Self {
        let (references, offsets) = slots.into_iter().unzip();
        RawHeapEntry {
            address,
            size,
            kind_tag: ObjectKind::TAG_STACK,
            class_bits: stack_id,
            references,
            offsets,
        }
    }

    fn plain(address: Address, size: u32, kind_tag: u8, class_bits: u32, references: Vec<Address>) -> Self {
        RawHeapEntry {
            address,
            size,
            kind_tag,
            class_bits,
            references,
            offsets: vec![],
        }
    }

    fn is_stack(&self) -> bool {
        self.kind_tag == ObjectKind::TAG_STACK
    }

    pub fn packed_word(&self) -> i32 {
        (((self.kind_tag as u32) << KIND_SHIFT) | (self.class_bits & CLASS_ID_MASK)) as i32
    }

    pub fn encode(&self, out: &mut Vec<i32>) {
        out.push(self.address as i32);
        out.push(self.size as i32);
        out.push(self.packed_word());
        out.push(self.references.len() as i32);
        for (i, r) in self.references.iter().enumerate() {
            out.push(*r as i32);
            if self.is_stack() {
                out.push(self.offsets.get(i).copied().unwrap_or(0));
            }
        }
    }

    pub(crate) fn into_record(self) -> ObjectRecord {
        let kind = match self.kind_tag {
            ObjectKind::TAG_JAVA => ObjectKind::Java {
                class_id: self.class_bits,
            },
            ObjectKind::TAG_STATICS => ObjectKind::Statics {
                class_id: self.class_bits,
            },
            ObjectKind::TAG_STACK => {
                let mut offsets: BTreeMap<Address, i32> = BTreeMap::new();
                for (r, off) in self.references.iter().zip(self.offsets.iter()) {
                    let slot = offsets.entry(*r).or_insert(*off);
                    if *off > *slot {
                        *slot = *off;
                    }
                }
                ObjectKind::Stack {
                    stack_id: self.class_bits,
                    offsets,
                }
            }
            ObjectKind::TAG_VM_INTERNAL => ObjectKind::VmInternal,
            other => ObjectKind::Unknown(other),
        };
        let references: SmallVec<[Address; 4]> = self.references.into_iter().collect();
        ObjectRecord::new(self.address, self.size, kind, references)
    }
}

/// Walks one heap-data batch entry by entry.
pub struct BatchDecoder<'a> {
    words: &'a [i32],
    cursor: usize,
    end: Option<BatchEnd>,
}

impl<'a> BatchDecoder<'a> {
    pub fn new(words: &'a [i32]) -> Self {
        BatchDecoder {
            words,
            cursor: 0,
            end: None,
        }
    }

    /// How the batch was terminated, once the decoder has reached the
    /// sentinel.
    pub fn end(&self) -> Option<BatchEnd> {
        self.end
    }

    fn take(&mut self, reason: &'static str) -> Result<i32, HeapError> {
        match self.words.get(self.cursor) {
            Some(w) => {
                self.cursor += 1;
                Ok(*w)
            }
            None => Err(HeapError::MalformedBatch {
                offset: self.cursor,
                reason,
            }),
        }
    }

    /// The next entry, or `None` at the sentinel.
    pub fn next_entry(&mut self) -> Result<Option<RawHeapEntry>, HeapError> {
        if self.end.is_some() {
            return Ok(None);
        }
        let address = self.take("batch ended without a sentinel")?;
        match address {
            END_OF_HEAP => {
                self.end = Some(BatchEnd::End);
                return Ok(None);
            }
            MORE_DATA => {
                self.end = Some(BatchEnd::More);
                return Ok(None);
            }
            _ => {}
        }
        let start = self.cursor - 1;
        let size = self.take("truncated entry header")?;
        let packed = self.take("truncated entry header")? as u32;
        let count = self.take("truncated entry header")?;
        if size < 0 {
            return Err(HeapError::MalformedBatch {
                offset: start,
                reason: "negative object size",
            });
        }
        if count < 0 {
            return Err(HeapError::MalformedBatch {
                offset: start,
                reason: "negative reference count",
            });
        }
        // kind comes from the top bits, before the class id is masked out
        let kind_tag = (packed >> KIND_SHIFT) as u8;
        let class_bits = packed & CLASS_ID_MASK;
        let stack = kind_tag == ObjectKind::TAG_STACK;
        let mut references = Vec::with_capacity(count as usize);
        let mut offsets = vec![];
        for _ in 0..count {
            references.push(self.take("truncated reference list")? as Address);
            if stack {
                offsets.push(self.take("truncated reference list")?);
            }
        }
        Ok(Some(RawHeapEntry {
            address: address as Address,
            size: size as u32,
            kind_tag,
            class_bits,
            references,
            offsets,
        }))
    }

    /// Words left over after the sentinel.
    pub fn trailing_words(&self) -> usize {
        self.words.len() - self.cursor
    }
}

/// Root addresses up to the terminating [`END_OF_ROOTS`]. A missing
/// terminator is tolerated.
pub fn decode_root_list(words: &[i32]) -> Vec<Address> {
    words
        .iter()
        .take_while(|w| **w != END_OF_ROOTS)
        .map(|w| *w as Address)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(words: &[i32]) -> Result<(Vec<RawHeapEntry>, Option<BatchEnd>), HeapError> {
        let mut decoder = BatchDecoder::new(words);
        let mut entries = vec![];
        while let Some(e) = decoder.next_entry()? {
            entries.push(e);
        }
        Ok((entries, decoder.end()))
    }

    #[test]
    fn test_kind_is_taken_from_top_bits() {
        let words = [0x100, 24, (2 << 24) | 0x12, 1, 0x200, 8, END_OF_HEAP];
        let (entries, end) = decode_all(&words).unwrap();
        assert_eq!(end, Some(BatchEnd::End));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind_tag, ObjectKind::TAG_STACK);
        assert_eq!(entries[0].class_bits, 0x12);
        assert_eq!(entries[0].references, vec![0x200]);
        assert_eq!(entries[0].offsets, vec![8]);
    }

    #[test]
    fn test_encode_matches_decoder() {
        let entries = vec![
            RawHeapEntry::java(0x100, 16, 5, vec![0x200, 0x300]),
            RawHeapEntry::stack(0x400, 64, 1, vec![(0x100, 4), (0x100, 12)]),
            RawHeapEntry::vm_internal(0x500, 8, vec![]),
        ];
        let mut words = vec![];
        for e in &entries {
            e.encode(&mut words);
        }
        words.push(MORE_DATA);
        let (decoded, end) = decode_all(&words).unwrap();
        assert_eq!(end, Some(BatchEnd::More));
        assert_eq!(decoded, entries);
    }

    #[test]
    fn test_stack_offsets_keep_maximum() {
        let entry = RawHeapEntry::stack(0x400, 64, 3, vec![(0x100, 12), (0x200, 4), (0x100, 20), (0x100, 8)]);
        let record = entry.into_record();
        assert_eq!(record.stack_offset(0x100), Some(20));
        assert_eq!(record.stack_offset(0x200), Some(4));
        assert_eq!(record.class_id(), None);
        match record.kind() {
            ObjectKind::Stack { stack_id, .. } => assert_eq!(*stack_id, 3),
            k => panic!("unexpected kind {:?}", k),
        }
    }

    #[test]
    fn test_unknown_kind_is_kept() {
        let mut words = vec![];
        RawHeapEntry::plain(0x100, 8, 9, 0, vec![]).encode(&mut words);
        words.push(END_OF_HEAP);
        let (entries, _) = decode_all(&words).unwrap();
        let record = entries[0].clone().into_record();
        assert_eq!(record.kind(), &ObjectKind::Unknown(9));
    }

    #[test]
    fn test_missing_sentinel_is_malformed() {
        let words = [0x100, 16, 0, 0];
        assert!(matches!(
            decode_all(&words),
            Err(HeapError::MalformedBatch { offset: 4, .. })
        ));
    }

    #[test]
    fn test_truncated_references_are_malformed() {
        let words = [0x100, 16, 0, 3, 0x200];
        assert!(matches!(
            decode_all(&words),
            Err(HeapError::MalformedBatch {
                reason: "truncated reference list",
                ..
            })
        ));
    }

    #[test]
    fn test_negative_count_is_malformed() {
        let words = [0x100, 16, 0, -4, END_OF_HEAP];
        assert!(matches!(
            decode_all(&words),
            Err(HeapError::MalformedBatch { offset: 0, .. })
        ));
    }

    #[test]
    fn test_root_list_stops_at_terminator() {
        assert_eq!(decode_root_list(&[0x100, 0x200, END_OF_ROOTS, 0x300]), vec![0x100, 0x200]);
        assert_eq!(decode_root_list(&[0x100]), vec![0x100]);
        assert!(decode_root_list(&[END_OF_ROOTS]).is_empty());
    }
}
