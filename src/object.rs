use smallvec::SmallVec;
use std::collections::BTreeMap;

pub type Address = u32;
pub type ClassId = u32;

/// Index of an object in a frozen [`HeapObjectStore`].
///
/// Only meaningful for the store (and snapshot) that handed it out.
///
/// [`HeapObjectStore`]: crate::HeapObjectStore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ObjectId(pub(crate) u32);

impl ObjectId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// What kind of heap entry an object is, with the data only that kind has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    Java {
        class_id: ClassId,
    },
    /// The statics block of `class_id`. The class id only names the block;
    /// statics never show up in per-class listings.
    Statics {
        class_id: ClassId,
    },
    /// A thread stack. `offsets` maps each referenced address to the highest
    /// stack offset it was seen at.
    Stack {
        stack_id: u32,
        offsets: BTreeMap<Address, i32>,
    },
    VmInternal,
    Unknown(u8),
}

impl ObjectKind {
    pub const TAG_JAVA: u8 = 0;
    pub const TAG_STATICS: u8 = 1;
    pub const TAG_STACK: u8 = 2;
    pub const TAG_VM_INTERNAL: u8 = 3;

    pub fn tag(&self) -> u8 {
        match self {
            ObjectKind::Java { .. } => Self::TAG_JAVA,
            ObjectKind::Statics { .. } => Self::TAG_STATICS,
            ObjectKind::Stack { .. } => Self::TAG_STACK,
            ObjectKind::VmInternal => Self::TAG_VM_INTERNAL,
            ObjectKind::Unknown(tag) => *tag,
        }
    }

    pub fn is_java(&self) -> bool {
        matches!(self, ObjectKind::Java { .. })
    }
}

#[derive(Debug, Clone)]
pub struct ObjectRecord {
    pub(crate) id: ObjectId,
    pub(crate) address: Address,
    pub(crate) size: u32,
    pub(crate) kind: ObjectKind,
    pub(crate) references: SmallVec<[Address; 4]>,
    pub(crate) root_distance: Option<u32>,
    pub(crate) forward: Vec<ObjectId>,
    pub(crate) back: Vec<ObjectId>,
}

impl ObjectRecord {
    pub(crate) fn new(
        address: Address,
        size: u32,
        kind: ObjectKind,
        references: SmallVec<[Address; 4]>,
    ) -> Self {
        ObjectRecord {
            // assigned when the store is frozen
            id: ObjectId(u32::MAX),
            address,
            size,
            kind,
            references,
            root_distance: None,
            forward: vec![],
            back: vec![],
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// One past the last byte of the object.
    pub fn end(&self) -> u64 {
        self.address as u64 + self.size as u64
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    /// The class of a Java object; `None` for every other kind.
    pub fn class_id(&self) -> Option<ClassId> {
        match self.kind {
            ObjectKind::Java { class_id } => Some(class_id),
            _ => None,
        }
    }

    /// Raw referenced addresses in the order the VM reported them,
    /// including ones with no object in the snapshot.
    pub fn references(&self) -> &[Address] {
        &self.references
    }

    /// Hops from the nearest root, or `None` if unreachable.
    pub fn root_distance(&self) -> Option<u32> {
        self.root_distance
    }

    pub fn is_alive(&self) -> bool {
        self.root_distance.is_some()
    }

    pub fn is_root(&self) -> bool {
        self.root_distance == Some(0)
    }

    pub fn forward_edges(&self) -> &[ObjectId] {
        &self.forward
    }

    pub fn back_edges(&self) -> &[ObjectId] {
        &self.back
    }

    pub fn stack_offset(&self, referent: Address) -> Option<i32> {
        match &self.kind {
            ObjectKind::Stack { offsets, .. } => offsets.get(&referent).copied(),
            _ => None,
        }
    }

    /// Lower the root distance to `candidate` if that is an improvement.
    /// Returns whether anything changed.
    pub(crate) fn relax(&mut self, candidate: u32) -> bool {
        match self.root_distance {
            Some(current) if current <= candidate => false,
            _ => {
                self.root_distance = Some(candidate);
                true
            }
        }
    }
}
