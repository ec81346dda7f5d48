//! The static configuration tree a control process is built from:
//! nodes, their pipes, the pipes' windows and the windows' channels.

use std::{collections::HashSet, net::SocketAddr};

use lockstep_shared::{NodeKey, PipeId, TaskMask, ThreadModel};

use crate::error::LockstepServerError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelDescription {
    pub name: String,
}

impl ChannelDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowDescription {
    pub name: String,
    pub channels: Vec<ChannelDescription>,
}

impl WindowDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channels: Vec::new(),
        }
    }

    pub fn with_channel(mut self, channel: ChannelDescription) -> Self {
        self.channels.push(channel);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipeDescription {
    pub id: PipeId,
    /// Whether the pipe renders on its own thread
    pub threaded: bool,
    pub windows: Vec<WindowDescription>,
}

impl PipeDescription {
    pub fn new(id: PipeId) -> Self {
        Self {
            id,
            threaded: true,
            windows: Vec::new(),
        }
    }

    pub fn threaded(mut self, threaded: bool) -> Self {
        self.threaded = threaded;
        self
    }

    pub fn with_window(mut self, window: WindowDescription) -> Self {
        self.windows.push(window);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeDescription {
    pub key: NodeKey,
    pub name: String,
    /// Where the worker process hosting this node receives commands
    pub address: SocketAddr,
    /// `None` lets the node fall back to `ThreadModel::DEFAULT`
    pub thread_model: Option<ThreadModel>,
    pub tasks: TaskMask,
    pub pipes: Vec<PipeDescription>,
}

impl NodeDescription {
    pub fn new(key: NodeKey, name: impl Into<String>, address: SocketAddr) -> Self {
        Self {
            key,
            name: name.into(),
            address,
            thread_model: None,
            tasks: TaskMask::CLEAR | TaskMask::DRAW,
            pipes: Vec::new(),
        }
    }

    pub fn with_thread_model(mut self, thread_model: ThreadModel) -> Self {
        self.thread_model = Some(thread_model);
        self
    }

    pub fn with_tasks(mut self, tasks: TaskMask) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn with_pipe(mut self, pipe: PipeDescription) -> Self {
        self.pipes.push(pipe);
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigDescription {
    pub nodes: Vec<NodeDescription>,
}

impl ConfigDescription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, node: NodeDescription) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn node(&self, key: NodeKey) -> Option<&NodeDescription> {
        self.nodes.iter().find(|node| node.key == key)
    }

    /// Distinct worker process addresses, in node order
    pub fn addresses(&self) -> Vec<SocketAddr> {
        let mut addresses = Vec::new();
        for node in &self.nodes {
            if !addresses.contains(&node.address) {
                addresses.push(node.address);
            }
        }
        addresses
    }

    pub fn channel_count(&self) -> usize {
        self.nodes
            .iter()
            .flat_map(|node| &node.pipes)
            .flat_map(|pipe| &pipe.windows)
            .map(|window| window.channels.len())
            .sum()
    }

    /// Checks that node keys and pipe ids are unique across the tree
    pub fn validate(&self) -> Result<(), LockstepServerError> {
        if self.nodes.is_empty() {
            return Err(LockstepServerError::InvalidConfig {
                reason: "the configuration has no nodes".to_string(),
            });
        }

        let mut nodes = HashSet::new();
        let mut pipes = HashSet::new();
        for node in &self.nodes {
            if !nodes.insert(node.key) {
                return Err(LockstepServerError::DuplicateNode { node: node.key });
            }
            for pipe in &node.pipes {
                if !pipes.insert(pipe.id) {
                    return Err(LockstepServerError::DuplicatePipe { pipe: pipe.id });
                }
            }
        }
        Ok(())
    }
}
