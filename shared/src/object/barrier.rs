use std::{
    collections::BTreeMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use log::{debug, trace};
use parking_lot::{Condvar, Mutex};

use crate::{
    object::{
        dirty_bits::DirtyBits,
        error::ObjectError,
        master::Master,
        object_version::{ObjectId, ObjectVersion},
        replica::Replica,
        session::ObjectSession,
        versioned::Versioned,
    },
    protocol::{
        packets::{BarrierEnterPacket, BarrierEnterReplyPacket},
        Packet,
    },
    transport::PacketSender,
    wire::{error::SerdeErr, reader::PacketReader, serde::Serde, writer::PacketWriter},
};

/// The replicated part of a barrier
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BarrierData {
    /// Number of participants that must enter a version before it is released
    pub height: u32,
}

impl BarrierData {
    pub const HEIGHT: DirtyBits = DirtyBits::custom(0);
}

impl Default for BarrierData {
    fn default() -> Self {
        Self { height: 1 }
    }
}

impl Versioned for BarrierData {
    fn serialize(&self, writer: &mut PacketWriter, dirty: DirtyBits) {
        if dirty.contains(Self::HEIGHT) {
            self.height.ser(writer);
        }
    }

    fn deserialize(&mut self, reader: &mut PacketReader, dirty: DirtyBits) -> Result<(), SerdeErr> {
        if dirty.contains(Self::HEIGHT) {
            self.height = u32::de(reader)?;
        }
        Ok(())
    }
}

enum BarrierRole {
    Master(Mutex<Master<BarrierData>>),
    Replica {
        data: Arc<Replica<BarrierData>>,
        master: SocketAddr,
    },
}

#[derive(Default)]
struct BarrierState {
    // `None` is a local participant
    arrivals: BTreeMap<u32, Vec<Option<SocketAddr>>>,
    released: u32,
}

/// Blocks `height` distributed participants until all of them entered the
/// same version.
///
/// The master instance counts arrivals and answers remote participants with
/// `BARRIER_ENTER_REPLY`. Replicas forward their arrival to the master and
/// wait for that reply. A released version also releases every older one.
pub struct Barrier {
    id: ObjectId,
    role: BarrierRole,
    sender: Box<dyn PacketSender>,
    state: Mutex<BarrierState>,
    released: Condvar,
}

impl Barrier {
    /// Creates the master instance and attaches it to `session`
    pub fn new_master(session: &ObjectSession, height: u32) -> Arc<Self> {
        let master = session.register_master(BarrierData { height });
        let barrier = Arc::new(Self {
            id: master.id(),
            role: BarrierRole::Master(Mutex::new(master)),
            sender: session.sender().clone_box(),
            state: Mutex::new(BarrierState::default()),
            released: Condvar::new(),
        });
        session.attach_barrier(barrier.clone());
        barrier
    }

    /// Maps a replica of barrier `id`, whose master lives at `master`
    pub fn map(
        session: &ObjectSession,
        id: ObjectId,
        master: SocketAddr,
    ) -> Result<Arc<Self>, ObjectError> {
        let data = session.map_object(id, BarrierData::default())?;
        let barrier = Arc::new(Self {
            id,
            role: BarrierRole::Replica { data, master },
            sender: session.sender().clone_box(),
            state: Mutex::new(BarrierState::default()),
            released: Condvar::new(),
        });
        session.attach_barrier(barrier.clone());
        Ok(barrier)
    }

    /// Detaches a replica barrier from `session`
    pub fn unmap(&self, session: &ObjectSession) {
        session.detach_barrier(self.id);
        if let BarrierRole::Replica { .. } = self.role {
            session.unmap_object(self.id);
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn is_master(&self) -> bool {
        matches!(self.role, BarrierRole::Master(_))
    }

    /// The version of the replicated barrier data
    pub fn version(&self) -> u32 {
        match &self.role {
            BarrierRole::Master(master) => master.lock().version(),
            BarrierRole::Replica { data, .. } => data.version(),
        }
    }

    pub fn object_version(&self) -> ObjectVersion {
        ObjectVersion::new(self.id, self.version())
    }

    pub fn height(&self) -> u32 {
        match &self.role {
            BarrierRole::Master(master) => master.lock().value().height,
            BarrierRole::Replica { data, .. } => data.read(|data| data.height),
        }
    }

    /// The newest released version
    pub fn released_version(&self) -> u32 {
        self.state.lock().released
    }

    // Master side

    /// Changes the height on the master. Takes effect for replicas once
    /// committed and synced.
    pub fn set_height(&self, height: u32) -> Result<(), ObjectError> {
        let BarrierRole::Master(master) = &self.role else {
            return Err(self.wrong_role("set_height"));
        };
        master.lock().modify(BarrierData::HEIGHT).height = height;

        // a lower height may complete versions that are already waiting
        let pending: Vec<u32> = self.state.lock().arrivals.keys().copied().collect();
        for version in pending {
            self.try_release(version)?;
        }
        Ok(())
    }

    /// Commits the barrier data, returning the new version
    pub fn commit(&self, session: &ObjectSession) -> Result<u32, ObjectError> {
        let BarrierRole::Master(master) = &self.role else {
            return Err(self.wrong_role("commit"));
        };
        let mut master = master.lock();
        session.commit(&mut *master)
    }

    /// Sends the barrier instance to a participant process
    pub fn subscribe(&self, session: &ObjectSession, peer: SocketAddr) -> Result<(), ObjectError> {
        let BarrierRole::Master(master) = &self.role else {
            return Err(self.wrong_role("subscribe"));
        };
        let master = master.lock();
        session.subscribe(&*master, peer)
    }

    /// Records the arrival of a remote participant
    pub fn handle_enter(&self, version: u32, from: SocketAddr) -> Result<(), ObjectError> {
        if !self.is_master() {
            return Err(self.wrong_role("handle_enter"));
        }
        trace!("{} entered by {} for version {}", self.id, from, version);

        {
            let mut state = self.state.lock();
            if version <= state.released {
                drop(state);
                return self.send_reply(&from, version);
            }
            state.arrivals.entry(version).or_default().push(Some(from));
        }
        self.try_release(version)
    }

    fn try_release(&self, version: u32) -> Result<(), ObjectError> {
        let height = self.height() as usize;

        let remotes = {
            let mut state = self.state.lock();
            let arrived = state.arrivals.get(&version).map_or(0, Vec::len);
            if arrived < height.max(1) {
                return Ok(());
            }

            let later = state.arrivals.split_off(&(version + 1));
            let released = std::mem::replace(&mut state.arrivals, later);
            state.released = state.released.max(version);
            self.released.notify_all();

            let mut remotes: Vec<SocketAddr> = released.into_values().flatten().flatten().collect();
            remotes.sort();
            remotes.dedup();
            remotes
        };

        debug!("{} released version {}", self.id, version);
        for remote in &remotes {
            self.send_reply(remote, version)?;
        }
        Ok(())
    }

    fn send_reply(&self, to: &SocketAddr, version: u32) -> Result<(), ObjectError> {
        let packet = BarrierEnterReplyPacket {
            barrier_id: self.id,
            version,
        };
        self.sender.send(to, &packet.encode())?;
        Ok(())
    }

    // Replica side

    /// Releases local waiters for `version` and everything older
    pub fn handle_reply(&self, version: u32) -> Result<(), ObjectError> {
        if self.is_master() {
            return Err(self.wrong_role("handle_reply"));
        }
        self.release_local(version);
        Ok(())
    }

    /// Syncs the replicated barrier data to `version`
    pub fn sync_data(&self, version: u32) -> Result<u32, ObjectError> {
        match &self.role {
            BarrierRole::Master(master) => Ok(master.lock().version()),
            BarrierRole::Replica { data, .. } => data.sync(version),
        }
    }

    fn release_local(&self, version: u32) {
        let mut state = self.state.lock();
        state.released = state.released.max(version);
        self.released.notify_all();
    }

    // Both sides

    /// Registers this participant's arrival for `version` without waiting
    pub fn enter(&self, version: u32) -> Result<(), ObjectError> {
        match &self.role {
            BarrierRole::Master(_) => {
                {
                    let mut state = self.state.lock();
                    if version <= state.released {
                        return Ok(());
                    }
                    state.arrivals.entry(version).or_default().push(None);
                }
                self.try_release(version)
            }
            BarrierRole::Replica { data, master } => {
                if !data.is_synced() {
                    return Err(ObjectError::NotSynced { object_id: self.id });
                }
                if data.read(|data| data.height) <= 1 {
                    self.release_local(version);
                    return Ok(());
                }
                let packet = BarrierEnterPacket {
                    barrier_id: self.id,
                    version,
                };
                self.sender.send(master, &packet.encode())?;
                Ok(())
            }
        }
    }

    /// Blocks until `version` has been released
    pub fn wait(&self, version: u32) {
        let mut state = self.state.lock();
        while state.released < version {
            self.released.wait(&mut state);
        }
    }

    pub fn wait_timeout(&self, version: u32, timeout: Duration) -> Result<(), ObjectError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while state.released < version {
            if self.released.wait_until(&mut state, deadline).timed_out()
                && state.released < version
            {
                return Err(ObjectError::BarrierTimeout {
                    barrier_id: self.id,
                    version,
                    timeout,
                });
            }
        }
        Ok(())
    }

    /// Enters the barrier and blocks until `version` is released. A missing
    /// participant blocks this call forever.
    pub fn sync(&self, version: u32) -> Result<(), ObjectError> {
        self.enter(version)?;
        self.wait(version);
        Ok(())
    }

    pub fn sync_timeout(&self, version: u32, timeout: Duration) -> Result<(), ObjectError> {
        self.enter(version)?;
        self.wait_timeout(version, timeout)
    }

    fn wrong_role(&self, operation: &'static str) -> ObjectError {
        ObjectError::WrongRole {
            object_id: self.id,
            operation,
        }
    }
}
