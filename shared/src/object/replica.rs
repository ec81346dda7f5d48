use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use log::trace;
use parking_lot::{Condvar, Mutex};

use crate::object::{
    error::ObjectError,
    object_version::{ObjectId, VERSION_NONE},
    versioned::{ObjectDelta, Versioned},
};

struct ReplicaState<T> {
    value: T,
    // last version deserialized into `value`
    applied: u32,
    // last version queued, applied or not
    received: u32,
    pending: VecDeque<ObjectDelta>,
    syncing: usize,
    detached: bool,
    // set once a delta failed to apply; `value` can no longer be trusted
    corrupted: Option<ObjectError>,
}

/// A read-only copy of a master object on another process.
///
/// Data pushed by the session is buffered in arrival order and only applied
/// when the owner calls `sync`, so the owner decides which version it sees.
pub struct Replica<T: Versioned> {
    id: ObjectId,
    state: Mutex<ReplicaState<T>>,
    changed: Condvar,
}

impl<T: Versioned> Replica<T> {
    /// A replica that holds `value` until its instance data has been applied
    pub fn new(id: ObjectId, value: T) -> Self {
        Self {
            id,
            state: Mutex::new(ReplicaState {
                value,
                applied: VERSION_NONE,
                received: VERSION_NONE,
                pending: VecDeque::new(),
                syncing: 0,
                detached: false,
                corrupted: None,
            }),
            changed: Condvar::new(),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// The version currently visible through `read`
    pub fn version(&self) -> u32 {
        self.state.lock().applied
    }

    /// The newest version that has arrived
    pub fn received_version(&self) -> u32 {
        self.state.lock().received
    }

    pub fn is_synced(&self) -> bool {
        self.version() != VERSION_NONE
    }

    pub fn is_detached(&self) -> bool {
        self.state.lock().detached
    }

    pub fn read<R>(&self, reader: impl FnOnce(&T) -> R) -> R {
        let state = self.state.lock();
        reader(&state.value)
    }

    /// Queues the full state of the master. Must precede every delta.
    pub fn push_instance(&self, instance: ObjectDelta) -> Result<(), ObjectError> {
        self.check_object(&instance)?;

        let mut state = self.state.lock();
        if state.received != VERSION_NONE {
            return Err(ObjectError::DuplicateInstance {
                object_id: self.id,
                received: instance.version,
            });
        }

        trace!("{} received instance version {}", self.id, instance.version);
        state.received = instance.version;
        state.pending.push_back(instance);
        self.changed.notify_all();
        Ok(())
    }

    /// Queues a delta. Deltas must arrive without gaps.
    pub fn push_delta(&self, delta: ObjectDelta) -> Result<(), ObjectError> {
        self.check_object(&delta)?;

        let mut state = self.state.lock();
        if state.received == VERSION_NONE {
            return Err(ObjectError::MissingInstance {
                object_id: self.id,
                received: delta.version,
            });
        }
        if delta.version != state.received + 1 {
            return Err(ObjectError::VersionGap {
                object_id: self.id,
                expected: state.received + 1,
                received: delta.version,
            });
        }

        trace!("{} received delta version {}", self.id, delta.version);
        state.received = delta.version;
        state.pending.push_back(delta);
        self.changed.notify_all();
        Ok(())
    }

    /// Applies buffered data up to `version`, blocking until it has arrived.
    /// Returns the applied version, which equals `version` on success.
    pub fn sync(&self, version: u32) -> Result<u32, ObjectError> {
        self.sync_until(version, None)
    }

    /// Like `sync`, but gives up after `timeout`
    pub fn sync_timeout(&self, version: u32, timeout: Duration) -> Result<u32, ObjectError> {
        self.sync_until(version, Some((Instant::now() + timeout, timeout)))
    }

    /// Applies everything that has arrived so far without blocking
    pub fn sync_head(&self) -> Result<u32, ObjectError> {
        let received = self.received_version();
        self.sync_until(received, None)
    }

    fn sync_until(
        &self,
        version: u32,
        deadline: Option<(Instant, Duration)>,
    ) -> Result<u32, ObjectError> {
        let mut state = self.state.lock();
        if state.detached {
            return Err(ObjectError::Unmapped { object_id: self.id });
        }
        if let Some(error) = &state.corrupted {
            return Err(error.clone());
        }
        if version < state.applied {
            return Err(ObjectError::StaleVersion {
                object_id: self.id,
                requested: version,
                applied: state.applied,
            });
        }

        state.syncing += 1;
        let result = loop {
            if let Err(error) = self.apply_pending(&mut state, version) {
                break Err(error);
            }
            if state.applied == version {
                break Ok(version);
            }
            if state.detached {
                break Err(ObjectError::Unmapped { object_id: self.id });
            }

            match deadline {
                None => self.changed.wait(&mut state),
                Some((deadline, timeout)) => {
                    if self.changed.wait_until(&mut state, deadline).timed_out()
                        && state.received < version
                    {
                        break Err(ObjectError::SyncTimeout {
                            object_id: self.id,
                            requested: version,
                            applied: state.applied,
                            timeout,
                        });
                    }
                }
            }
        };

        state.syncing -= 1;
        if state.syncing == 0 {
            self.changed.notify_all();
        }
        result
    }

    fn apply_pending(
        &self,
        state: &mut ReplicaState<T>,
        version: u32,
    ) -> Result<(), ObjectError> {
        if let Some(error) = &state.corrupted {
            return Err(error.clone());
        }
        while let Some(next) = state.pending.front() {
            if next.version > version {
                if state.applied == VERSION_NONE {
                    // the first data available is already newer than requested
                    return Err(ObjectError::StaleVersion {
                        object_id: self.id,
                        requested: version,
                        applied: next.version,
                    });
                }
                break;
            }

            let next_version = next.version;
            let ReplicaState { value, pending, .. } = &mut *state;
            let failed = pending.front().and_then(|next| next.apply_to(value).err());
            if let Some(error) = failed {
                state.corrupted = Some(error.clone());
                return Err(error);
            }
            state.pending.pop_front();
            state.applied = next_version;
        }
        Ok(())
    }

    /// Detaches the replica from its session. Waits for syncs that are
    /// already applying data; blocked syncs fail with `Unmapped`.
    pub fn detach(&self) {
        let mut state = self.state.lock();
        state.detached = true;
        self.changed.notify_all();
        while state.syncing > 0 {
            self.changed.wait(&mut state);
        }
        state.pending.clear();
    }

    fn check_object(&self, delta: &ObjectDelta) -> Result<(), ObjectError> {
        if delta.object_id != self.id {
            return Err(ObjectError::WrongObject {
                expected: self.id,
                actual: delta.object_id,
            });
        }
        Ok(())
    }
}

/// Type-erased view of a replica, used by the session to route incoming data
pub trait ReplicaSink: Send + Sync {
    fn object_id(&self) -> ObjectId;

    fn push_instance(&self, instance: ObjectDelta) -> Result<(), ObjectError>;

    fn push_delta(&self, delta: ObjectDelta) -> Result<(), ObjectError>;

    fn detach(&self);
}

impl<T: Versioned> ReplicaSink for Replica<T> {
    fn object_id(&self) -> ObjectId {
        self.id
    }

    fn push_instance(&self, instance: ObjectDelta) -> Result<(), ObjectError> {
        Replica::push_instance(self, instance)
    }

    fn push_delta(&self, delta: ObjectDelta) -> Result<(), ObjectError> {
        Replica::push_delta(self, delta)
    }

    fn detach(&self) {
        Replica::detach(self)
    }
}
