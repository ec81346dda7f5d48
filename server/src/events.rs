use std::{mem, net::SocketAddr, vec::IntoIter};

use lockstep_shared::{FrameNumber, NodeKey};

use crate::LockstepServerError;

pub struct Events {
    inits: Vec<(NodeKey, Result<(), String>)>,
    exits: Vec<(NodeKey, bool)>,
    finished_frames: Vec<(NodeKey, FrameNumber)>,
    disconnections: Vec<(SocketAddr, Vec<NodeKey>)>,
    errors: Vec<LockstepServerError>,
    empty: bool,
}

impl Events {
    pub(crate) fn new() -> Self {
        Self {
            inits: Vec::new(),
            exits: Vec::new(),
            finished_frames: Vec::new(),
            disconnections: Vec::new(),
            errors: Vec::new(),
            empty: true,
        }
    }

    // Public

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn read<V: Event>(&mut self) -> V::Iter {
        V::iter(self)
    }

    pub fn has<V: Event>(&self) -> bool {
        V::has(self)
    }

    // Crate-public

    pub(crate) fn push_init(&mut self, node: NodeKey, result: Result<(), String>) {
        self.inits.push((node, result));
        self.empty = false;
    }

    pub(crate) fn push_exit(&mut self, node: NodeKey, result: bool) {
        self.exits.push((node, result));
        self.empty = false;
    }

    pub(crate) fn push_finished_frame(&mut self, node: NodeKey, frame_number: FrameNumber) {
        self.finished_frames.push((node, frame_number));
        self.empty = false;
    }

    pub(crate) fn push_disconnection(&mut self, peer: SocketAddr, nodes: Vec<NodeKey>) {
        self.disconnections.push((peer, nodes));
        self.empty = false;
    }

    pub(crate) fn push_error(&mut self, error: LockstepServerError) {
        self.errors.push(error);
        self.empty = false;
    }

    pub(crate) fn take(&mut self) -> Events {
        mem::replace(self, Events::new())
    }
}

// Event Trait
pub trait Event {
    type Iter;

    fn iter(events: &mut Events) -> Self::Iter;

    fn has(events: &Events) -> bool;
}

// InitEvent
pub struct InitEvent;
impl Event for InitEvent {
    type Iter = IntoIter<(NodeKey, Result<(), String>)>;

    fn iter(events: &mut Events) -> Self::Iter {
        let list = mem::take(&mut events.inits);
        IntoIterator::into_iter(list)
    }

    fn has(events: &Events) -> bool {
        !events.inits.is_empty()
    }
}

// ExitEvent
pub struct ExitEvent;
impl Event for ExitEvent {
    type Iter = IntoIter<(NodeKey, bool)>;

    fn iter(events: &mut Events) -> Self::Iter {
        let list = mem::take(&mut events.exits);
        IntoIterator::into_iter(list)
    }

    fn has(events: &Events) -> bool {
        !events.exits.is_empty()
    }
}

// FrameFinishedEvent
pub struct FrameFinishedEvent;
impl Event for FrameFinishedEvent {
    type Iter = IntoIter<(NodeKey, FrameNumber)>;

    fn iter(events: &mut Events) -> Self::Iter {
        let list = mem::take(&mut events.finished_frames);
        IntoIterator::into_iter(list)
    }

    fn has(events: &Events) -> bool {
        !events.finished_frames.is_empty()
    }
}

// DisconnectEvent
pub struct DisconnectEvent;
impl Event for DisconnectEvent {
    type Iter = IntoIter<(SocketAddr, Vec<NodeKey>)>;

    fn iter(events: &mut Events) -> Self::Iter {
        let list = mem::take(&mut events.disconnections);
        IntoIterator::into_iter(list)
    }

    fn has(events: &Events) -> bool {
        !events.disconnections.is_empty()
    }
}

// Error Event
pub struct ErrorEvent;
impl Event for ErrorEvent {
    type Iter = IntoIter<LockstepServerError>;

    fn iter(events: &mut Events) -> Self::Iter {
        let list = mem::take(&mut events.errors);
        IntoIterator::into_iter(list)
    }

    fn has(events: &Events) -> bool {
        !events.errors.is_empty()
    }
}
