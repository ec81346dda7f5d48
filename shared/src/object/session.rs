use std::{
    collections::{HashMap, HashSet},
    net::SocketAddr,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
};

use log::{debug, trace, warn};
use parking_lot::Mutex;

use crate::{
    dispatch::{
        command::Command,
        dispatcher::{CommandDispatcher, CommandTarget},
        error::DispatchError,
    },
    object::{
        barrier::Barrier,
        error::ObjectError,
        master::Master,
        object_version::ObjectId,
        replica::{Replica, ReplicaSink},
        versioned::{ObjectDelta, Versioned},
    },
    protocol::{
        packets::{BarrierEnterPacket, BarrierEnterReplyPacket, ObjectDeltaPacket, ObjectInstancePacket},
        CommandId, Packet,
    },
    transport::PacketSender,
};

enum Incoming {
    Instance(ObjectDelta),
    Delta(ObjectDelta),
}

#[derive(Default)]
struct ReplicaTable {
    mapped: HashMap<ObjectId, Arc<dyn ReplicaSink>>,
    // data for ids nobody has mapped yet, replayed on `map_object`
    unmapped: HashMap<ObjectId, Vec<Incoming>>,
    // unmapped ids whose deltas are dropped until a new instance arrives
    retired: HashSet<ObjectId>,
}

struct MasterEntry {
    subscribers: Vec<SocketAddr>,
    // full state at the last commit, sent to late subscribers
    instance: ObjectDelta,
}

/// Tracks every distributed object a process takes part in: the masters it
/// owns together with their subscribers, the replicas it has mapped, and the
/// barriers that receive enter traffic.
pub struct ObjectSession {
    sender: Box<dyn PacketSender>,
    next_id: AtomicU32,
    masters: Mutex<HashMap<ObjectId, MasterEntry>>,
    replicas: Mutex<ReplicaTable>,
    barriers: Mutex<HashMap<ObjectId, Arc<Barrier>>>,
}

impl ObjectSession {
    pub const COMMANDS: [CommandId; 4] = [
        CommandId::ObjectInstance,
        CommandId::ObjectDelta,
        CommandId::BarrierEnter,
        CommandId::BarrierEnterReply,
    ];

    pub fn new(sender: Box<dyn PacketSender>) -> Self {
        Self {
            sender,
            next_id: AtomicU32::new(1),
            masters: Mutex::new(HashMap::new()),
            replicas: Mutex::new(ReplicaTable::default()),
            barriers: Mutex::new(HashMap::new()),
        }
    }

    pub fn sender(&self) -> &dyn PacketSender {
        self.sender.as_ref()
    }

    pub fn local_address(&self) -> SocketAddr {
        self.sender.local_address()
    }

    // Masters

    /// Allocates an id and wraps `value` in a master registered with this session
    pub fn register_master<T: Versioned>(&self, value: T) -> Master<T> {
        let id = ObjectId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let master = Master::new(id, value);
        self.masters.lock().insert(
            id,
            MasterEntry {
                subscribers: Vec::new(),
                instance: master.instance_data(),
            },
        );
        debug!("Registered master {}", id);
        master
    }

    pub fn deregister_master(&self, id: ObjectId) {
        self.masters.lock().remove(&id);
        self.barriers.lock().remove(&id);
    }

    pub fn is_master(&self, id: ObjectId) -> bool {
        self.masters.lock().contains_key(&id)
    }

    /// Sends the instance data of `master` to `peer` and forwards every later
    /// commit to it
    pub fn subscribe<T: Versioned>(
        &self,
        master: &Master<T>,
        peer: SocketAddr,
    ) -> Result<(), ObjectError> {
        let instance = {
            let mut masters = self.masters.lock();
            let Some(entry) = masters.get_mut(&master.id()) else {
                return Err(ObjectError::UnknownMaster {
                    object_id: master.id(),
                });
            };
            if entry.subscribers.contains(&peer) {
                return Ok(());
            }
            entry.subscribers.push(peer);
            entry.instance = master.instance_data();
            entry.instance.clone()
        };

        let packet = ObjectInstancePacket { delta: instance };
        self.sender.send(&peer, &packet.encode())?;
        Ok(())
    }

    /// Subscribes `peer` to every master of this session it does not follow
    /// yet, sending each the state of its last commit. Returns the ids that
    /// gained the subscriber.
    pub fn subscribe_peer(&self, peer: SocketAddr) -> Result<Vec<ObjectId>, ObjectError> {
        let instances: Vec<(ObjectId, ObjectDelta)> = {
            let mut masters = self.masters.lock();
            masters
                .iter_mut()
                .filter(|(_, entry)| !entry.subscribers.contains(&peer))
                .map(|(id, entry)| {
                    entry.subscribers.push(peer);
                    (*id, entry.instance.clone())
                })
                .collect()
        };

        let mut subscribed = Vec::with_capacity(instances.len());
        for (id, instance) in instances {
            let packet = ObjectInstancePacket { delta: instance };
            self.sender.send(&peer, &packet.encode())?;
            subscribed.push(id);
        }
        if !subscribed.is_empty() {
            debug!("Subscribed {} to {} masters", peer, subscribed.len());
        }
        Ok(subscribed)
    }

    pub fn unsubscribe(&self, id: ObjectId, peer: &SocketAddr) {
        if let Some(entry) = self.masters.lock().get_mut(&id) {
            entry.subscribers.retain(|subscriber| subscriber != peer);
        }
    }

    /// Stops forwarding commits of every master to `peer`
    pub fn unsubscribe_peer(&self, peer: &SocketAddr) {
        for entry in self.masters.lock().values_mut() {
            entry.subscribers.retain(|subscriber| subscriber != peer);
        }
        debug!("Unsubscribed {} from every master", peer);
    }

    pub fn subscribers(&self, id: ObjectId) -> Vec<SocketAddr> {
        self.masters
            .lock()
            .get(&id)
            .map(|entry| entry.subscribers.clone())
            .unwrap_or_default()
    }

    /// Commits `master` and sends the resulting delta to its subscribers.
    /// Returns the new version (unchanged if nothing was dirty).
    pub fn commit<T: Versioned>(&self, master: &mut Master<T>) -> Result<u32, ObjectError> {
        let commit = master.commit();
        let Some(delta) = commit.delta else {
            return Ok(commit.version);
        };

        let peers = match self.masters.lock().get_mut(&master.id()) {
            Some(entry) => {
                entry.instance = master.instance_data();
                entry.subscribers.clone()
            }
            None => Vec::new(),
        };
        if !peers.is_empty() {
            let bytes = ObjectDeltaPacket { delta }.encode();
            for peer in &peers {
                self.sender.send(peer, &bytes)?;
            }
        }
        trace!(
            "Committed {} version {} to {} subscribers",
            master.id(),
            commit.version,
            peers.len()
        );
        Ok(commit.version)
    }

    // Replicas

    /// Maps a replica of object `id`, replaying any data that arrived before
    /// the mapping
    pub fn map_object<T: Versioned>(
        &self,
        id: ObjectId,
        value: T,
    ) -> Result<Arc<Replica<T>>, ObjectError> {
        let mut table = self.replicas.lock();
        if table.mapped.contains_key(&id) {
            return Err(ObjectError::AlreadyMapped { object_id: id });
        }

        table.retired.remove(&id);
        let replica = Arc::new(Replica::new(id, value));
        if let Some(buffered) = table.unmapped.remove(&id) {
            for incoming in buffered {
                match incoming {
                    Incoming::Instance(instance) => replica.push_instance(instance)?,
                    Incoming::Delta(delta) => replica.push_delta(delta)?,
                }
            }
        }

        let sink: Arc<dyn ReplicaSink> = replica.clone();
        table.mapped.insert(id, sink);
        debug!("Mapped {}", id);
        Ok(replica)
    }

    /// Detaches the replica of `id` once in-flight syncs are done. Returns
    /// false if nothing was mapped.
    ///
    /// Deltas that still arrive for `id` are dropped. A new instance makes the
    /// id mappable again.
    pub fn unmap_object(&self, id: ObjectId) -> bool {
        let sink = {
            let mut table = self.replicas.lock();
            let sink = table.mapped.remove(&id);
            if sink.is_some() {
                table.retired.insert(id);
            }
            sink
        };
        match sink {
            Some(sink) => {
                sink.detach();
                debug!("Unmapped {}", id);
                true
            }
            None => false,
        }
    }

    pub fn is_mapped(&self, id: ObjectId) -> bool {
        self.replicas.lock().mapped.contains_key(&id)
    }

    fn route(&self, id: ObjectId, incoming: Incoming) -> Result<(), ObjectError> {
        let sink = {
            let mut table = self.replicas.lock();
            match table.mapped.get(&id) {
                Some(sink) => sink.clone(),
                None => {
                    match incoming {
                        // a new instance supersedes everything buffered before it
                        Incoming::Instance(_) => {
                            table.retired.remove(&id);
                            table.unmapped.remove(&id);
                        }
                        Incoming::Delta(_) if table.retired.contains(&id) => {
                            trace!("Dropping delta for unmapped {}", id);
                            return Ok(());
                        }
                        Incoming::Delta(_) => {}
                    }
                    trace!("Buffering data for unmapped {}", id);
                    table.unmapped.entry(id).or_default().push(incoming);
                    return Ok(());
                }
            }
        };

        match incoming {
            Incoming::Instance(instance) => sink.push_instance(instance),
            Incoming::Delta(delta) => sink.push_delta(delta),
        }
    }

    // Barriers

    /// Routes enter traffic for `barrier` through this session
    pub fn attach_barrier(&self, barrier: Arc<Barrier>) {
        self.barriers.lock().insert(barrier.id(), barrier);
    }

    pub fn detach_barrier(&self, id: ObjectId) -> Option<Arc<Barrier>> {
        self.barriers.lock().remove(&id)
    }

    pub fn barrier(&self, id: ObjectId) -> Option<Arc<Barrier>> {
        self.barriers.lock().get(&id).cloned()
    }

    // Incoming commands

    /// Routes `ObjectSession::COMMANDS` from `dispatcher` straight to this
    /// session on the dispatching thread, so replicas and barriers make
    /// progress while queue consumers block in `sync`.
    pub fn register_receivers(
        self: &Arc<Self>,
        dispatcher: &CommandDispatcher,
    ) -> Result<(), DispatchError> {
        for command in Self::COMMANDS {
            let session = self.clone();
            dispatcher.register_handler(
                command,
                CommandTarget::Receiver(Arc::new(move |command: Command| {
                    session.handle_command(&command).map_err(|error| {
                        warn!("{:?} from {} failed: {}", command.command(), command.source(), error);
                        DispatchError::HandlerFailed {
                            command: command.command(),
                            reason: error.to_string(),
                            protocol_violation: error.is_protocol_violation(),
                        }
                    })
                })),
            )?;
        }
        Ok(())
    }

    /// Handles one of `ObjectSession::COMMANDS`
    pub fn handle_command(&self, command: &Command) -> Result<(), ObjectError> {
        match command.command() {
            CommandId::ObjectInstance => {
                let packet = command.packet::<ObjectInstancePacket>()?;
                self.route(packet.delta.object_id, Incoming::Instance(packet.delta))
            }
            CommandId::ObjectDelta => {
                let packet = command.packet::<ObjectDeltaPacket>()?;
                self.route(packet.delta.object_id, Incoming::Delta(packet.delta))
            }
            CommandId::BarrierEnter => {
                let packet = command.packet::<BarrierEnterPacket>()?;
                match self.barrier(packet.barrier_id) {
                    Some(barrier) => barrier.handle_enter(packet.version, command.source()),
                    None => {
                        warn!(
                            "Barrier enter from {} for unknown {}",
                            command.source(),
                            packet.barrier_id
                        );
                        Err(ObjectError::UnknownMaster {
                            object_id: packet.barrier_id,
                        })
                    }
                }
            }
            CommandId::BarrierEnterReply => {
                let packet = command.packet::<BarrierEnterReplyPacket>()?;
                match self.barrier(packet.barrier_id) {
                    Some(barrier) => barrier.handle_reply(packet.version),
                    None => {
                        trace!("Ignoring late reply for {}", packet.barrier_id);
                        Ok(())
                    }
                }
            }
            command => Err(ObjectError::UnexpectedCommand { command }),
        }
    }
}
