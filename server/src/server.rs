use std::{
    collections::BTreeMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use log::{debug, info, warn};
use parking_lot::{Condvar, Mutex};

use lockstep_shared::{
    Barrier, Command, CommandDispatcher, CommandId, CommandTarget, DispatchError, FrameId,
    FrameNumber, InitId, Master, NodeConfigExitPacket, NodeConfigExitReplyPacket,
    NodeConfigInitPacket, NodeConfigInitReplyPacket, NodeCreatePipePacket, NodeDestroyPipePacket,
    NodeFrameDrawFinishPacket, NodeFrameFinishPacket, NodeFrameFinishReplyPacket, NodeKey,
    NodeFrameStartPacket, NodeFrameTasksFinishPacket, ObjectSession, Packet, PacketReceiver,
    PacketSender, ReceiverThread, RequestId, Versioned,
};

use crate::{
    config_description::{ConfigDescription, NodeDescription},
    events::Events,
    node_proxy::{NodeProxy, NodeState},
    LockstepServerError, ServerConfig,
};

struct ServerState {
    proxies: BTreeMap<NodeKey, NodeProxy>,
    events: Events,
}

/// State touched by both the receiver thread and the application thread
struct ServerShared {
    state: Mutex<ServerState>,
    changed: Condvar,
}

impl ServerShared {
    fn unknown_node(
        events: &mut Events,
        command: CommandId,
        node: NodeKey,
    ) -> Result<(), DispatchError> {
        warn!("{:?} from {}, which is not part of the configuration", command, node);
        let error = LockstepServerError::UnknownNode { node };
        let reason = error.to_string();
        events.push_error(error);
        Err(DispatchError::HandlerFailed {
            command,
            reason,
            protocol_violation: false,
        })
    }

    fn handle_init_reply(&self, command: Command) -> Result<(), DispatchError> {
        let reply: NodeConfigInitReplyPacket = command.packet()?;
        let mut state = self.state.lock();
        let ServerState { proxies, events } = &mut *state;
        let Some(proxy) = proxies.get_mut(&reply.node_id) else {
            return Self::unknown_node(events, command.command(), reply.node_id);
        };

        if !proxy.complete_init(reply.request_id, reply.result, &reply.error) {
            warn!("Ignoring stale CONFIG_INIT reply from {}", reply.node_id);
            return Ok(());
        }
        if reply.result {
            info!("{} is running", reply.node_id);
            events.push_init(reply.node_id, Ok(()));
        } else {
            warn!("{} failed to initialize: {}", reply.node_id, reply.error);
            events.push_init(reply.node_id, Err(reply.error));
        }
        self.changed.notify_all();
        Ok(())
    }

    fn handle_exit_reply(&self, command: Command) -> Result<(), DispatchError> {
        let reply: NodeConfigExitReplyPacket = command.packet()?;
        let mut state = self.state.lock();
        let ServerState { proxies, events } = &mut *state;
        let Some(proxy) = proxies.get_mut(&reply.node_id) else {
            return Self::unknown_node(events, command.command(), reply.node_id);
        };

        if !proxy.complete_exit(reply.request_id) {
            warn!("Ignoring stale CONFIG_EXIT reply from {}", reply.node_id);
            return Ok(());
        }
        info!("{} exited", reply.node_id);
        events.push_exit(reply.node_id, reply.result);
        self.changed.notify_all();
        Ok(())
    }

    fn handle_finish_reply(&self, command: Command) -> Result<(), DispatchError> {
        let reply: NodeFrameFinishReplyPacket = command.packet()?;
        let mut state = self.state.lock();
        let ServerState { proxies, events } = &mut *state;
        let Some(proxy) = proxies.get_mut(&reply.node_id) else {
            return Self::unknown_node(events, command.command(), reply.node_id);
        };

        if proxy.finish_frame(reply.frame_number) {
            events.push_finished_frame(reply.node_id, reply.frame_number);
            self.changed.notify_all();
        }
        Ok(())
    }

    fn handle_violation(&self, peer: SocketAddr, error: &DispatchError) {
        let mut state = self.state.lock();
        let ServerState { proxies, events } = &mut *state;
        let mut nodes = Vec::new();
        for proxy in proxies.values_mut() {
            if proxy.description().address == peer {
                proxy.disconnect();
                nodes.push(proxy.key());
            }
        }
        events.push_error(LockstepServerError::ProtocolViolation {
            peer,
            source: error.clone(),
        });
        events.push_disconnection(peer, nodes);
        self.changed.notify_all();
    }
}

/// The control process of a cluster: drives every node of a
/// `ConfigDescription` through init, frames and exit, and owns the master
/// copies of distributed objects.
pub struct Server {
    server_config: ServerConfig,
    description: ConfigDescription,
    session: Arc<ObjectSession>,
    dispatcher: Arc<CommandDispatcher>,
    shared: Arc<ServerShared>,
    receiver: Option<ReceiverThread>,
    next_request_id: RequestId,
    frame_id: FrameId,
    frame_number: FrameNumber,
}

impl Server {
    /// Create a new Server for `description` and start receiving on `receiver`
    pub fn new(
        server_config: ServerConfig,
        description: ConfigDescription,
        sender: Box<dyn PacketSender>,
        receiver: Box<dyn PacketReceiver>,
    ) -> Result<Self, LockstepServerError> {
        description.validate()?;

        let local_address = sender.local_address();
        let session = Arc::new(ObjectSession::new(sender));
        let dispatcher = Arc::new(CommandDispatcher::new());
        let shared = Arc::new(ServerShared {
            state: Mutex::new(ServerState {
                proxies: description
                    .nodes
                    .iter()
                    .map(|node| (node.key, NodeProxy::new(node.clone())))
                    .collect(),
                events: Events::new(),
            }),
            changed: Condvar::new(),
        });

        session.register_receivers(&dispatcher)?;
        let replies: [(CommandId, fn(&ServerShared, Command) -> Result<(), DispatchError>); 3] = [
            (CommandId::ConfigInitReply, ServerShared::handle_init_reply),
            (CommandId::ConfigExitReply, ServerShared::handle_exit_reply),
            (CommandId::FrameFinishReply, ServerShared::handle_finish_reply),
        ];
        for (command, handler) in replies {
            let shared = shared.clone();
            dispatcher.register_handler(
                command,
                CommandTarget::Receiver(Arc::new(move |command| handler(&shared, command))),
            )?;
        }

        let violation_shared = shared.clone();
        let receiver = ReceiverThread::spawn(
            format!("{}-receiver", local_address),
            receiver,
            dispatcher.clone(),
            server_config.receive_poll_interval,
            Some(Box::new(move |peer: SocketAddr, error: &DispatchError| {
                violation_shared.handle_violation(peer, error)
            })),
        )?;

        info!(
            "Control process listening at {} for {} nodes",
            local_address,
            description.nodes.len()
        );
        Ok(Self {
            server_config,
            description,
            session,
            dispatcher,
            shared,
            receiver: Some(receiver),
            next_request_id: 1,
            frame_id: 0,
            frame_number: 0,
        })
    }

    pub fn local_address(&self) -> SocketAddr {
        self.session.local_address()
    }

    pub fn description(&self) -> &ConfigDescription {
        &self.description
    }

    pub fn session(&self) -> &Arc<ObjectSession> {
        &self.session
    }

    pub fn dispatcher(&self) -> &Arc<CommandDispatcher> {
        &self.dispatcher
    }

    /// Must be called regularly, returns every event received since the last call
    pub fn receive(&mut self) -> Events {
        self.shared.state.lock().events.take()
    }

    // Nodes

    pub fn node_state(&self, node: NodeKey) -> Option<NodeState> {
        self.shared.state.lock().proxies.get(&node).map(NodeProxy::state)
    }

    pub fn node(&self, node: NodeKey) -> Option<NodeProxy> {
        self.shared.state.lock().proxies.get(&node).cloned()
    }

    pub fn running_nodes(&self) -> Vec<NodeKey> {
        self.shared
            .state
            .lock()
            .proxies
            .values()
            .filter(|proxy| proxy.is_running())
            .map(NodeProxy::key)
            .collect()
    }

    /// Newest frame that every running node has finished
    pub fn finished_frame(&self) -> FrameNumber {
        self.shared
            .state
            .lock()
            .proxies
            .values()
            .filter(|proxy| proxy.is_running())
            .map(NodeProxy::finished_frame)
            .min()
            .unwrap_or(0)
    }

    /// Newest started frame
    pub fn frame_number(&self) -> FrameNumber {
        self.frame_number
    }

    fn next_request(&mut self) -> RequestId {
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        request_id
    }

    fn send<P: Packet>(&self, address: &SocketAddr, packet: &P) -> Result<(), LockstepServerError> {
        self.session.sender().send(address, &packet.encode())?;
        Ok(())
    }

    // Init / Exit

    /// Creates every pipe of every stopped or failed node, then sends it
    /// CONFIG_INIT
    pub fn init(&mut self, init_id: InitId) -> Result<(), LockstepServerError> {
        self.frame_number = 0;
        let nodes: Vec<NodeDescription> = self.description.nodes.clone();
        for node in nodes {
            let state = self.node_state(node.key);
            if !matches!(state, Some(NodeState::Stopped) | Some(NodeState::Failed)) {
                debug!("Skipping init of {} in state {:?}", node.key, state);
                continue;
            }

            // objects committed while the node was down start over from an instance
            self.session.subscribe_peer(node.address)?;
            for pipe in &node.pipes {
                self.send(
                    &node.address,
                    &NodeCreatePipePacket {
                        node_id: node.key,
                        pipe_id: pipe.id,
                        threaded: pipe.threaded,
                    },
                )?;
            }

            let request_id = self.next_request();
            if let Some(proxy) = self.shared.state.lock().proxies.get_mut(&node.key) {
                proxy.begin_init(request_id);
            }
            self.send(
                &node.address,
                &NodeConfigInitPacket {
                    node_id: node.key,
                    request_id,
                    init_id,
                    name: node.name.clone(),
                    tasks: node.tasks,
                    thread_model: node.thread_model,
                },
            )?;
            debug!("Sent CONFIG_INIT {} to {}", request_id, node.key);
        }
        Ok(())
    }

    /// Blocks until every node answered CONFIG_INIT. Fails with the first
    /// node that could not initialize.
    pub fn wait_initialized(&self, timeout: Duration) -> Result<(), LockstepServerError> {
        self.wait_until("CONFIG_INIT replies", timeout, |state| {
            state
                .proxies
                .values()
                .all(|proxy| proxy.state() != NodeState::Initializing)
        })?;

        let state = self.shared.state.lock();
        match state
            .proxies
            .values()
            .find(|proxy| proxy.state() == NodeState::Failed)
        {
            Some(proxy) => Err(LockstepServerError::InitFailed {
                node: proxy.key(),
                reason: proxy.error().unwrap_or_default().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Destroys the pipes of every running node, then sends it CONFIG_EXIT.
    /// Processes left without a running node stop receiving object commits.
    pub fn exit(&mut self) -> Result<(), LockstepServerError> {
        let nodes: Vec<NodeDescription> = self.description.nodes.clone();
        let mut exited = Vec::new();
        for node in nodes {
            if self.node_state(node.key) != Some(NodeState::Running) {
                continue;
            }
            if !exited.contains(&node.address) {
                exited.push(node.address);
            }

            for pipe in &node.pipes {
                self.send(
                    &node.address,
                    &NodeDestroyPipePacket {
                        node_id: node.key,
                        pipe_id: pipe.id,
                    },
                )?;
            }

            let request_id = self.next_request();
            if let Some(proxy) = self.shared.state.lock().proxies.get_mut(&node.key) {
                proxy.begin_exit(request_id);
            }
            self.send(
                &node.address,
                &NodeConfigExitPacket {
                    node_id: node.key,
                    request_id,
                },
            )?;
        }

        for address in exited {
            let active = self.shared.state.lock().proxies.values().any(|proxy| {
                proxy.description().address == address
                    && matches!(proxy.state(), NodeState::Running | NodeState::Initializing)
            });
            if !active {
                self.session.unsubscribe_peer(&address);
            }
        }
        Ok(())
    }

    pub fn wait_exited(&self, timeout: Duration) -> Result<(), LockstepServerError> {
        self.wait_until("CONFIG_EXIT replies", timeout, |state| {
            state
                .proxies
                .values()
                .all(|proxy| proxy.state() != NodeState::Exiting)
        })
    }

    // Frames

    /// Starts the next frame on every running node and returns its number
    pub fn start_frame(&mut self, frame_id: FrameId) -> Result<FrameNumber, LockstepServerError> {
        self.frame_id = frame_id;
        self.frame_number += 1;
        let frame_number = self.frame_number;
        self.broadcast(|node_id| NodeFrameStartPacket {
            node_id,
            frame_id,
            frame_number,
        })?;
        Ok(frame_number)
    }

    pub fn draw_finish(&mut self) -> Result<(), LockstepServerError> {
        let (frame_id, frame_number) = (self.frame_id, self.frame_number);
        self.broadcast(|node_id| NodeFrameDrawFinishPacket {
            node_id,
            frame_id,
            frame_number,
        })
    }

    pub fn tasks_finish(&mut self) -> Result<(), LockstepServerError> {
        let (frame_id, frame_number) = (self.frame_id, self.frame_number);
        self.broadcast(|node_id| NodeFrameTasksFinishPacket {
            node_id,
            frame_id,
            frame_number,
        })
    }

    pub fn finish_frame(&mut self) -> Result<(), LockstepServerError> {
        let (frame_id, frame_number) = (self.frame_id, self.frame_number);
        let sync_global_finish = self.server_config.sync_global_finish;
        self.broadcast(|node_id| NodeFrameFinishPacket {
            node_id,
            frame_id,
            frame_number,
            sync_global_finish,
        })
    }

    /// Sends every stage of one frame, in order
    pub fn run_frame(&mut self, frame_id: FrameId) -> Result<FrameNumber, LockstepServerError> {
        let frame_number = self.start_frame(frame_id)?;
        self.draw_finish()?;
        self.tasks_finish()?;
        self.finish_frame()?;
        Ok(frame_number)
    }

    /// Blocks until every running node reported `frame_number` finished
    pub fn wait_frame_finished(
        &self,
        frame_number: FrameNumber,
        timeout: Duration,
    ) -> Result<(), LockstepServerError> {
        self.wait_until("FRAME_FINISH replies", timeout, |state| {
            state
                .proxies
                .values()
                .filter(|proxy| proxy.is_running())
                .all(|proxy| proxy.finished_frame() >= frame_number)
        })
    }

    fn broadcast<P: Packet>(
        &self,
        packet: impl Fn(NodeKey) -> P,
    ) -> Result<(), LockstepServerError> {
        let targets: Vec<(NodeKey, SocketAddr)> = self
            .shared
            .state
            .lock()
            .proxies
            .values()
            .filter(|proxy| proxy.is_running())
            .map(|proxy| (proxy.key(), proxy.description().address))
            .collect();

        for (node, address) in targets {
            self.send(&address, &packet(node))?;
        }
        Ok(())
    }

    fn wait_until(
        &self,
        what: &'static str,
        timeout: Duration,
        done: impl Fn(&ServerState) -> bool,
    ) -> Result<(), LockstepServerError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while !done(&*state) {
            if self.shared.changed.wait_until(&mut state, deadline).timed_out() && !done(&*state) {
                return Err(LockstepServerError::ReplyTimeout { what, timeout });
            }
        }
        Ok(())
    }

    // Objects

    /// Creates a barrier master and sends its instance to every worker process
    pub fn create_barrier(&self, height: u32) -> Result<Arc<Barrier>, LockstepServerError> {
        let barrier = Barrier::new_master(&self.session, height);
        for address in self.description.addresses() {
            barrier.subscribe(&self.session, address)?;
        }
        Ok(barrier)
    }

    /// Registers `value` as a master object and sends its instance to every
    /// worker process
    pub fn register_master<T: Versioned>(
        &self,
        value: T,
    ) -> Result<Master<T>, LockstepServerError> {
        let master = self.session.register_master(value);
        for address in self.description.addresses() {
            self.session.subscribe(&master, address)?;
        }
        Ok(master)
    }

    /// Commits `master` and sends the delta to its subscribers
    pub fn commit<T: Versioned>(&self, master: &mut Master<T>) -> Result<u32, LockstepServerError> {
        Ok(self.session.commit(master)?)
    }

    /// Peers whose connection was closed for a protocol violation
    pub fn closed_peers(&self) -> Vec<SocketAddr> {
        self.receiver
            .as_ref()
            .map(ReceiverThread::closed_peers)
            .unwrap_or_default()
    }

    pub fn shutdown(&mut self) {
        if let Some(mut receiver) = self.receiver.take() {
            receiver.stop();
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown();
    }
}
