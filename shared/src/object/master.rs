use crate::object::{
    dirty_bits::DirtyBits,
    object_version::{ObjectId, ObjectVersion, VERSION_FIRST},
    versioned::{ObjectDelta, Versioned},
};

/// The result of `Master::commit`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    /// The version the master holds after the commit
    pub version: u32,
    /// The changed fields, or `None` if nothing was dirty
    pub delta: Option<ObjectDelta>,
}

/// The authoritative instance of a versioned object.
///
/// Changes go through `modify`, which records which fields were touched.
/// `commit` turns the accumulated changes into a new version.
pub struct Master<T: Versioned> {
    id: ObjectId,
    version: u32,
    dirty: DirtyBits,
    value: T,
}

impl<T: Versioned> Master<T> {
    pub fn new(id: ObjectId, value: T) -> Self {
        Self {
            id,
            version: VERSION_FIRST,
            dirty: DirtyBits::NONE,
            value,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn object_version(&self) -> ObjectVersion {
        ObjectVersion::new(self.id, self.version)
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn dirty(&self) -> DirtyBits {
        self.dirty
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_clear()
    }

    /// Marks `bits` dirty and hands out the value for mutation
    pub fn modify(&mut self, bits: DirtyBits) -> &mut T {
        self.dirty.set(bits);
        &mut self.value
    }

    /// Publishes pending changes as a new version. A clean master keeps its
    /// current version and produces no delta.
    pub fn commit(&mut self) -> Commit {
        if !self.is_dirty() {
            return Commit {
                version: self.version,
                delta: None,
            };
        }

        self.version += 1;
        let delta = ObjectDelta::capture(self.id, self.version, self.dirty, &self.value);
        self.dirty.clear();

        Commit {
            version: self.version,
            delta: Some(delta),
        }
    }

    /// Every field at the current version, used to instantiate a new replica
    pub fn instance_data(&self) -> ObjectDelta {
        ObjectDelta::capture(self.id, self.version, DirtyBits::ALL, &self.value)
    }
}
