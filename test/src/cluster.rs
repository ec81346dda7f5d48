use std::{collections::BTreeMap, net::SocketAddr, sync::Arc, time::Duration};

use thiserror::Error;

use lockstep_client::{Client, ClientConfig, FrameCounters, LockstepClientError, NodeConfig};
use lockstep_server::{
    ConfigDescription, LockstepServerError, NodeDescription, PipeDescription, Server,
    ServerConfig,
};
use lockstep_shared::{
    CompressionConfig, FrameId, FrameNumber, LocalNetwork, NodeKey, PipeId, ThreadModel,
    TransportError,
};

use crate::recording::{RecordingFactory, Scenario};

pub const SERVER_PORT: u16 = 5000;
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(10);

pub fn local_address(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

/// Address of the worker process hosting `node` (one process per node)
pub fn node_address(node: NodeKey) -> SocketAddr {
    local_address(6000 + node.to_u32() as u16)
}

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Server error: {0}")]
    Server(#[from] LockstepServerError),

    #[error("Client error: {0}")]
    Client(#[from] LockstepClientError),
}

struct NodeEntry {
    key: NodeKey,
    thread_model: Option<ThreadModel>,
    pipes: Vec<(PipeId, bool)>,
}

/// Builds a server and one worker process per node on a `LocalNetwork`
pub struct ClusterBuilder {
    nodes: Vec<NodeEntry>,
    server_config: ServerConfig,
    compression: CompressionConfig,
    scenario: Scenario,
}

impl ClusterBuilder {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            server_config: ServerConfig::default(),
            compression: CompressionConfig::default(),
            scenario: Scenario::default(),
        }
    }

    /// Adds a node with one threaded pipe, `PipeId(key * 10 + 1)`
    pub fn node(self, key: u32, thread_model: Option<ThreadModel>) -> Self {
        self.node_with_pipes(key, thread_model, &[(key * 10 + 1, true)])
    }

    pub fn node_with_pipes(
        mut self,
        key: u32,
        thread_model: Option<ThreadModel>,
        pipes: &[(u32, bool)],
    ) -> Self {
        self.nodes.push(NodeEntry {
            key: NodeKey::new(key),
            thread_model,
            pipes: pipes
                .iter()
                .map(|(id, threaded)| (PipeId::new(*id), *threaded))
                .collect(),
        });
        self
    }

    pub fn server_config(mut self, server_config: ServerConfig) -> Self {
        self.server_config = server_config;
        self
    }

    pub fn compression(mut self, compression: CompressionConfig) -> Self {
        self.compression = compression;
        self
    }

    pub fn scenario(mut self, scenario: Scenario) -> Self {
        self.scenario = scenario;
        self
    }

    pub fn build(self) -> Result<Cluster, ClusterError> {
        let network = LocalNetwork::new();
        let factory = RecordingFactory::new(self.scenario);

        let mut description = ConfigDescription::new();
        let mut clients = BTreeMap::new();
        for entry in &self.nodes {
            let address = node_address(entry.key);
            let mut node = NodeDescription::new(entry.key, format!("node-{}", entry.key.to_u32()), address);
            if let Some(thread_model) = entry.thread_model {
                node = node.with_thread_model(thread_model);
            }
            for (pipe, threaded) in &entry.pipes {
                node = node.with_pipe(PipeDescription::new(*pipe).threaded(*threaded));
            }
            description = description.with_node(node);

            let (sender, receiver) = network.bind(address)?;
            let client_config = ClientConfig {
                node: NodeConfig {
                    factory: Arc::new(factory.clone()),
                    compression: self.compression.clone(),
                },
                ..ClientConfig::default()
            };
            let mut client = Client::new(client_config, sender, receiver)?;
            client.create_node(entry.key)?;
            clients.insert(entry.key, client);
        }

        let (sender, receiver) = network.bind(local_address(SERVER_PORT))?;
        let server = Server::new(self.server_config, description, sender, receiver)?;

        Ok(Cluster {
            network,
            server,
            clients,
            factory,
        })
    }
}

impl Default for ClusterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Cluster {
    pub network: LocalNetwork,
    pub server: Server,
    pub clients: BTreeMap<NodeKey, Client>,
    pub factory: RecordingFactory,
}

impl Cluster {
    pub fn client(&self, node: NodeKey) -> Option<&Client> {
        self.clients.get(&node)
    }

    pub fn counters(&self, node: NodeKey) -> Option<Arc<FrameCounters>> {
        self.clients.get(&node)?.counters(node)
    }

    /// Initializes every node and waits for the replies
    pub fn init(&mut self) -> Result<(), LockstepServerError> {
        self.server.init(1)?;
        self.server.wait_initialized(WAIT_TIMEOUT)
    }

    /// Sends every stage of the next frame and waits until all nodes finished it
    pub fn run_frame(&mut self, frame_id: FrameId) -> Result<FrameNumber, LockstepServerError> {
        let frame_number = self.server.run_frame(frame_id)?;
        self.server.wait_frame_finished(frame_number, WAIT_TIMEOUT)?;
        Ok(frame_number)
    }

    pub fn exit(&mut self) -> Result<(), LockstepServerError> {
        self.server.exit()?;
        self.server.wait_exited(WAIT_TIMEOUT)
    }
}
