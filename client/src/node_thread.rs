use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};

use log::{debug, error, warn};

use lockstep_shared::{CommandQueue, NodeKey, QueueItem};

use crate::{
    error::LockstepClientError,
    factory::NodeHooks,
    node::{frame_counters::FrameCounters, handlers::node_handlers, node::Node},
};

/// Everything the node thread owns: the node and its application hooks
pub struct NodeWorker {
    pub(crate) node: Node,
    pub(crate) hooks: Box<dyn NodeHooks>,
}

/// Handle to the thread that services one node's command queue
pub struct NodeThread {
    key: NodeKey,
    queue: CommandQueue,
    counters: Arc<FrameCounters>,
    thread: Option<JoinHandle<()>>,
}

impl NodeThread {
    pub(crate) fn spawn(
        node: Node,
        hooks: Box<dyn NodeHooks>,
        queue: CommandQueue,
    ) -> Result<Self, LockstepClientError> {
        let key = node.key();
        let counters = node.counters().clone();
        let handlers = node_handlers()?;
        let consumer = queue.clone();
        let name = format!("{}", key);

        let thread = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let mut worker = NodeWorker { node, hooks };
                loop {
                    let command = match consumer.pop() {
                        QueueItem::Command(command) => command,
                        QueueItem::Close => break,
                    };
                    let id = command.command();
                    if let Err(error) = handlers.invoke(&mut worker, command) {
                        warn!("{} failed to execute {:?}: {}", key, id, error);
                    }
                }
                debug!("{} thread stops", key);
            })
            .map_err(|error| LockstepClientError::Spawn {
                name,
                message: error.to_string(),
            })?;

        Ok(Self {
            key,
            queue,
            counters,
            thread: Some(thread),
        })
    }

    pub fn key(&self) -> NodeKey {
        self.key
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    pub fn counters(&self) -> &Arc<FrameCounters> {
        &self.counters
    }

    /// Closes the queue behind every pending command and joins the thread.
    /// The node is dropped on its own thread.
    pub fn stop(&mut self) {
        self.queue.close();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("{} thread panicked", self.key);
            }
        }
    }
}

impl Drop for NodeThread {
    fn drop(&mut self) {
        self.stop();
    }
}
