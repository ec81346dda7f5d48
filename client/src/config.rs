use std::{
    collections::BTreeMap,
    time::{Duration, Instant},
};

use log::debug;
use parking_lot::{Condvar, Mutex};

use lockstep_shared::{FrameNumber, NodeKey};

use crate::error::NodeError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct NodeReadiness {
    unlocked: FrameNumber,
    finished: FrameNumber,
}

#[derive(Default)]
struct ConfigState {
    nodes: BTreeMap<NodeKey, NodeReadiness>,
    local_notifications: u64,
    finish_notifications: u64,
}

impl ConfigState {
    fn all(&self, ready: impl Fn(&NodeReadiness) -> bool) -> bool {
        self.nodes.values().all(ready)
    }
}

/// The parent of every node hosted by this process.
///
/// Nodes report their local and finished frames here, and the application
/// side waits on them.
#[derive(Default)]
pub struct Config {
    state: Mutex<ConfigState>,
    changed: Condvar,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    // Membership

    /// Returns false if the node was already a member
    pub fn add_node(&self, node: NodeKey) -> bool {
        let mut state = self.state.lock();
        if state.nodes.contains_key(&node) {
            return false;
        }
        state.nodes.insert(node, NodeReadiness::default());
        debug!("Config added {}", node);
        true
    }

    /// Returns false if the node was not a member
    pub fn remove_node(&self, node: NodeKey) -> bool {
        let removed = self.state.lock().nodes.remove(&node).is_some();
        if removed {
            debug!("Config removed {}", node);
            // waits on "every node" may be satisfied now
            self.changed.notify_all();
        }
        removed
    }

    pub fn contains_node(&self, node: NodeKey) -> bool {
        self.state.lock().nodes.contains_key(&node)
    }

    pub fn nodes(&self) -> Vec<NodeKey> {
        self.state.lock().nodes.keys().copied().collect()
    }

    // Notifications

    pub(crate) fn notify_frame_local(&self, node: NodeKey, frame_number: FrameNumber) {
        let mut state = self.state.lock();
        if let Some(readiness) = state.nodes.get_mut(&node) {
            readiness.unlocked = readiness.unlocked.max(frame_number);
        }
        state.local_notifications += 1;
        self.changed.notify_all();
    }

    pub(crate) fn notify_frame_finished(&self, node: NodeKey, frame_number: FrameNumber) {
        let mut state = self.state.lock();
        if let Some(readiness) = state.nodes.get_mut(&node) {
            readiness.finished = readiness.finished.max(frame_number);
        }
        state.finish_notifications += 1;
        self.changed.notify_all();
    }

    pub(crate) fn reset_node(&self, node: NodeKey) {
        if let Some(readiness) = self.state.lock().nodes.get_mut(&node) {
            *readiness = NodeReadiness::default();
        }
    }

    pub fn local_notifications(&self) -> u64 {
        self.state.lock().local_notifications
    }

    pub fn finish_notifications(&self) -> u64 {
        self.state.lock().finish_notifications
    }

    /// Oldest frame every node has finished
    pub fn finished_frame(&self) -> FrameNumber {
        let state = self.state.lock();
        state
            .nodes
            .values()
            .map(|readiness| readiness.finished)
            .min()
            .unwrap_or(0)
    }

    // Waits

    /// Blocks until every node released `frame_number` locally
    pub fn wait_frame_local(&self, frame_number: FrameNumber) {
        let mut state = self.state.lock();
        while !state.all(|readiness| readiness.unlocked >= frame_number) {
            self.changed.wait(&mut state);
        }
    }

    /// Blocks until every node finished `frame_number`
    pub fn wait_frame_finished(&self, frame_number: FrameNumber) {
        let mut state = self.state.lock();
        while !state.all(|readiness| readiness.finished >= frame_number) {
            self.changed.wait(&mut state);
        }
    }

    pub fn wait_frame_local_timeout(
        &self,
        frame_number: FrameNumber,
        timeout: Duration,
    ) -> Result<(), NodeError> {
        self.wait_until("local release", frame_number, timeout, |state| {
            state.all(|readiness| readiness.unlocked >= frame_number)
        })
    }

    pub fn wait_frame_finished_timeout(
        &self,
        frame_number: FrameNumber,
        timeout: Duration,
    ) -> Result<(), NodeError> {
        self.wait_until("finish", frame_number, timeout, |state| {
            state.all(|readiness| readiness.finished >= frame_number)
        })
    }

    pub fn wait_node_frame_local(
        &self,
        node: NodeKey,
        frame_number: FrameNumber,
        timeout: Duration,
    ) -> Result<(), NodeError> {
        self.wait_node(node, "local release", frame_number, timeout, |readiness| {
            readiness.unlocked >= frame_number
        })
    }

    pub fn wait_node_frame_finished(
        &self,
        node: NodeKey,
        frame_number: FrameNumber,
        timeout: Duration,
    ) -> Result<(), NodeError> {
        self.wait_node(node, "finish", frame_number, timeout, |readiness| {
            readiness.finished >= frame_number
        })
    }

    fn wait_node(
        &self,
        node: NodeKey,
        what: &'static str,
        frame_number: FrameNumber,
        timeout: Duration,
        ready: impl Fn(&NodeReadiness) -> bool,
    ) -> Result<(), NodeError> {
        if !self.contains_node(node) {
            return Err(NodeError::UnknownNode { node });
        }
        self.wait_until(what, frame_number, timeout, |state| {
            // a removed node no longer blocks anyone
            state.nodes.get(&node).map_or(true, &ready)
        })
    }

    fn wait_until(
        &self,
        what: &'static str,
        frame_number: FrameNumber,
        timeout: Duration,
        ready: impl Fn(&ConfigState) -> bool,
    ) -> Result<(), NodeError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !ready(&*state) {
            if self.changed.wait_until(&mut state, deadline).timed_out() && !ready(&*state) {
                return Err(NodeError::WaitTimeout {
                    what,
                    frame_number,
                    timeout,
                });
            }
        }
        Ok(())
    }
}
