use lockstep_shared::{FrameId, FrameNumber, InitId, NodeKey, PipeId};

use crate::node::node::Node;

/// The work a pipe performs for each started frame
pub trait PipeRenderer: Send {
    fn draw(&mut self, _pipe: PipeId, _frame_number: FrameNumber) {}

    /// Work after drawing (readback, assembly) that the frame's finish waits for
    fn tasks(&mut self, _pipe: PipeId, _frame_number: FrameNumber) {}

    fn exit(&mut self, _pipe: PipeId) {}
}

/// What `NodeHooks::frame_finish` decided about the frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameRelease {
    /// Release the frame to the control process now
    Release,
    /// Leave the release to someone else
    Hold,
}

/// Application callbacks invoked by the node thread around each command.
///
/// Every method has a default that only lets the frame lifecycle proceed.
pub trait NodeHooks: Send {
    /// Returning an error fails CONFIG_INIT and reports the message back
    fn config_init(&mut self, _node: &mut Node, _init_id: InitId) -> Result<(), String> {
        Ok(())
    }

    fn config_exit(&mut self, _node: &mut Node) -> bool {
        true
    }

    fn frame_start(&mut self, _node: &mut Node, _frame_id: FrameId, _frame_number: FrameNumber) {}

    fn frame_draw_finish(
        &mut self,
        _node: &mut Node,
        _frame_id: FrameId,
        _frame_number: FrameNumber,
    ) {
    }

    fn frame_tasks_finish(
        &mut self,
        _node: &mut Node,
        _frame_id: FrameId,
        _frame_number: FrameNumber,
    ) {
    }

    fn frame_finish(
        &mut self,
        _node: &mut Node,
        _frame_id: FrameId,
        _frame_number: FrameNumber,
    ) -> FrameRelease {
        FrameRelease::Release
    }
}

/// Creates the application parts of nodes and pipes
pub trait NodeFactory: Send + Sync {
    fn create_hooks(&self, _node: NodeKey) -> Box<dyn NodeHooks> {
        Box::new(DefaultHooks)
    }

    fn create_renderer(&self, _node: NodeKey, _pipe: PipeId) -> Box<dyn PipeRenderer> {
        Box::new(IdleRenderer)
    }
}

pub struct DefaultHooks;

impl NodeHooks for DefaultHooks {}

pub struct IdleRenderer;

impl PipeRenderer for IdleRenderer {}

pub struct DefaultNodeFactory;

impl NodeFactory for DefaultNodeFactory {}
