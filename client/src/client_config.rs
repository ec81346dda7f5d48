use std::{sync::Arc, time::Duration};

use lockstep_shared::CompressionConfig;

use crate::factory::{DefaultNodeFactory, NodeFactory};

/// Contains Config properties which will be used by a worker process
#[derive(Clone)]
pub struct ClientConfig {
    /// How long the receiver thread blocks on the transport before checking
    /// whether it should stop
    pub receive_poll_interval: Duration,
    /// Settings applied to every node created by the process
    pub node: NodeConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            receive_poll_interval: Duration::from_millis(10),
            node: NodeConfig::default(),
        }
    }
}

/// Per-node settings
#[derive(Clone)]
pub struct NodeConfig {
    /// Creates the application hooks of each node and the renderer of each pipe
    pub factory: Arc<dyn NodeFactory>,
    /// Compression of frame data sent by the node's transmit worker
    pub compression: CompressionConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            factory: Arc::new(DefaultNodeFactory),
            compression: CompressionConfig::default(),
        }
    }
}
