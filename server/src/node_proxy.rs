use lockstep_shared::{FrameNumber, NodeKey, RequestId};

use crate::config_description::NodeDescription;

/// Where a node is in its lifecycle, as seen by the control process
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeState {
    Stopped,
    /// CONFIG_INIT sent, reply pending
    Initializing,
    Running,
    /// CONFIG_EXIT sent, reply pending
    Exiting,
    /// CONFIG_INIT failed; the node can be initialized again
    Failed,
    /// The connection to the node's process was closed
    Disconnected,
}

/// The control process's record of one node
#[derive(Clone, Debug)]
pub struct NodeProxy {
    description: NodeDescription,
    state: NodeState,
    pending_request: Option<RequestId>,
    finished_frame: FrameNumber,
    error: Option<String>,
}

impl NodeProxy {
    pub fn new(description: NodeDescription) -> Self {
        Self {
            description,
            state: NodeState::Stopped,
            pending_request: None,
            finished_frame: 0,
            error: None,
        }
    }

    pub fn key(&self) -> NodeKey {
        self.description.key
    }

    pub fn description(&self) -> &NodeDescription {
        &self.description
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn finished_frame(&self) -> FrameNumber {
        self.finished_frame
    }

    /// Message of the last failed CONFIG_INIT
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.state == NodeState::Running
    }

    pub(crate) fn begin_init(&mut self, request_id: RequestId) {
        self.state = NodeState::Initializing;
        self.pending_request = Some(request_id);
        self.finished_frame = 0;
        self.error = None;
    }

    pub(crate) fn begin_exit(&mut self, request_id: RequestId) {
        self.state = NodeState::Exiting;
        self.pending_request = Some(request_id);
    }

    /// Applies a CONFIG_INIT reply. Returns false for a reply that answers
    /// no pending request.
    pub(crate) fn complete_init(
        &mut self,
        request_id: RequestId,
        result: bool,
        error: &str,
    ) -> bool {
        if self.state != NodeState::Initializing || self.pending_request != Some(request_id) {
            return false;
        }
        self.pending_request = None;
        if result {
            self.state = NodeState::Running;
        } else {
            self.state = NodeState::Failed;
            self.error = Some(error.to_string());
        }
        true
    }

    pub(crate) fn complete_exit(&mut self, request_id: RequestId) -> bool {
        if self.state != NodeState::Exiting || self.pending_request != Some(request_id) {
            return false;
        }
        self.pending_request = None;
        self.state = NodeState::Stopped;
        true
    }

    /// Returns false if the frame was already known to be finished
    pub(crate) fn finish_frame(&mut self, frame_number: FrameNumber) -> bool {
        if frame_number <= self.finished_frame {
            return false;
        }
        self.finished_frame = frame_number;
        true
    }

    pub(crate) fn disconnect(&mut self) {
        self.state = NodeState::Disconnected;
        self.pending_request = None;
    }
}
