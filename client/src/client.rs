use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
};

use log::{info, warn};
use parking_lot::{Mutex, RwLock};

use lockstep_shared::{
    Command, CommandDispatcher, CommandId, CommandQueue, CommandTarget, Decoder, DispatchError,
    FrameDataError, FrameDataTransmitPacket, NodeKey, ObjectSession,
    PacketReceiver, PacketSender, ReceiverThread,
};

use crate::{
    client_config::ClientConfig,
    config::Config,
    error::{LockstepClientError, NodeError},
    node::{
        frame_counters::FrameCounters,
        handlers::{addressed_node, NODE_COMMANDS},
        node::{FrameDataMap, Node},
    },
    node_thread::NodeThread,
};

/// Where the receiver thread finds the nodes of this process
#[derive(Default)]
struct NodeRoutes {
    queues: RwLock<HashMap<NodeKey, CommandQueue>>,
    frame_datas: RwLock<HashMap<NodeKey, FrameDataMap>>,
}

impl NodeRoutes {
    /// Queues a node command on the thread of the node it names
    fn route(&self, command: Command) -> Result<(), DispatchError> {
        let node = addressed_node(&command)?;

        let Some(queue) = self.queues.read().get(&node).cloned() else {
            warn!(
                "{:?} from {} for {}, which this process does not host",
                command.command(),
                command.source(),
                node
            );
            return Err(DispatchError::HandlerFailed {
                command: command.command(),
                reason: NodeError::UnknownNode { node }.to_string(),
                protocol_violation: false,
            });
        };

        let id = command.command();
        if queue.push(command) {
            Ok(())
        } else {
            Err(DispatchError::QueueClosed { command: id })
        }
    }

    /// Hands received images to the frame data they were sent for
    fn receive_transmit(&self, packet: FrameDataTransmitPacket, decoder: &mut Decoder) -> Result<(), DispatchError> {
        let object_id = packet.data.id;
        let data = self
            .frame_datas
            .read()
            .values()
            .find_map(|frame_datas| frame_datas.lock().get(&object_id).cloned());

        let Some(data) = data else {
            return Err(DispatchError::HandlerFailed {
                command: CommandId::FrameDataTransmit,
                reason: format!("no node of this process has mapped {}", object_id),
                protocol_violation: false,
            });
        };

        data.receive_transmit(packet, decoder).map_err(|error| {
            let protocol_violation = matches!(
                error,
                FrameDataError::Malformed { .. } | FrameDataError::Decoder(_)
            );
            DispatchError::HandlerFailed {
                command: CommandId::FrameDataTransmit,
                reason: error.to_string(),
                protocol_violation,
            }
        })
    }
}

/// A worker process: hosts nodes, receives commands for them, and runs each
/// node on its own thread.
pub struct Client {
    client_config: ClientConfig,
    config: Arc<Config>,
    session: Arc<ObjectSession>,
    dispatcher: Arc<CommandDispatcher>,
    routes: Arc<NodeRoutes>,
    nodes: HashMap<NodeKey, NodeThread>,
    receiver: Option<ReceiverThread>,
}

impl Client {
    /// Create a new Client and start receiving on `receiver`
    pub fn new(
        client_config: ClientConfig,
        sender: Box<dyn PacketSender>,
        receiver: Box<dyn PacketReceiver>,
    ) -> Result<Self, LockstepClientError> {
        let local_address = sender.local_address();
        let session = Arc::new(ObjectSession::new(sender));
        let dispatcher = Arc::new(CommandDispatcher::new());
        let routes = Arc::new(NodeRoutes::default());

        session.register_receivers(&dispatcher)?;
        for command in NODE_COMMANDS {
            let routes = routes.clone();
            dispatcher.register_handler(
                command,
                CommandTarget::Receiver(Arc::new(move |command| routes.route(command))),
            )?;
        }

        let decoder = Mutex::new(Decoder::try_new(client_config.node.compression.mode())?);
        let transmit_routes = routes.clone();
        dispatcher.register_handler(
            CommandId::FrameDataTransmit,
            CommandTarget::Receiver(Arc::new(move |command: Command| {
                let packet = command.packet::<FrameDataTransmitPacket>()?;
                transmit_routes.receive_transmit(packet, &mut decoder.lock())
            })),
        )?;

        let receiver = ReceiverThread::spawn(
            format!("{}-receiver", local_address),
            receiver,
            dispatcher.clone(),
            client_config.receive_poll_interval,
            None,
        )?;

        info!("Worker process listening at {}", local_address);
        Ok(Self {
            client_config,
            config: Arc::new(Config::new()),
            session,
            dispatcher,
            routes,
            nodes: HashMap::new(),
            receiver: Some(receiver),
        })
    }

    pub fn local_address(&self) -> SocketAddr {
        self.session.local_address()
    }

    /// The parent of every node of this process
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn session(&self) -> &Arc<ObjectSession> {
        &self.session
    }

    pub fn dispatcher(&self) -> &Arc<CommandDispatcher> {
        &self.dispatcher
    }

    // Nodes

    /// Creates node `key` and starts its thread. Commands for the node are
    /// accepted from now on.
    pub fn create_node(&mut self, key: NodeKey) -> Result<Arc<FrameCounters>, LockstepClientError> {
        if self.nodes.contains_key(&key) {
            return Err(LockstepClientError::NodeExists { node: key });
        }

        let node_config = self.client_config.node.clone();
        let hooks = node_config.factory.create_hooks(key);
        let frame_datas = FrameDataMap::default();
        let node = Node::new(
            key,
            self.config.clone(),
            self.session.clone(),
            frame_datas.clone(),
            node_config,
        );

        let queue = CommandQueue::new("node");
        let thread = NodeThread::spawn(node, hooks, queue.clone())?;
        let counters = thread.counters().clone();

        self.routes.frame_datas.write().insert(key, frame_datas);
        self.routes.queues.write().insert(key, queue);
        self.nodes.insert(key, thread);
        info!("Created {}", key);
        Ok(counters)
    }

    /// Stops node `key` once it has executed every command queued for it
    pub fn destroy_node(&mut self, key: NodeKey) -> bool {
        self.routes.queues.write().remove(&key);
        self.routes.frame_datas.write().remove(&key);
        let Some(mut thread) = self.nodes.remove(&key) else {
            return false;
        };
        thread.stop();
        info!("Destroyed {}", key);
        true
    }

    pub fn has_node(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(&key)
    }

    pub fn node_keys(&self) -> Vec<NodeKey> {
        self.nodes.keys().copied().collect()
    }

    /// Frame watermarks of node `key`
    pub fn counters(&self, key: NodeKey) -> Option<Arc<FrameCounters>> {
        self.nodes.get(&key).map(|thread| thread.counters().clone())
    }

    /// Peers whose connection was closed for a protocol violation
    pub fn closed_peers(&self) -> Vec<SocketAddr> {
        self.receiver
            .as_ref()
            .map(ReceiverThread::closed_peers)
            .unwrap_or_default()
    }

    /// Stops receiving, then stops every node
    pub fn shutdown(&mut self) {
        if let Some(mut receiver) = self.receiver.take() {
            receiver.stop();
        }
        let keys = self.node_keys();
        for key in keys {
            self.destroy_node(key);
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.shutdown();
    }
}
