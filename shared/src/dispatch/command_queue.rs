use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

use super::command::Command;

/// What a queue consumer pulls off a `CommandQueue`
#[derive(Debug)]
pub enum QueueItem {
    Command(Command),
    /// Asks the consumer to stop after everything queued before it
    Close,
}

/// A FIFO of commands serviced by exactly one consumer thread.
///
/// Cloning yields another handle to the same queue; producers (the
/// dispatcher) and the consumer each hold one.
#[derive(Clone)]
pub struct CommandQueue {
    name: &'static str,
    sender: Sender<QueueItem>,
    receiver: Receiver<QueueItem>,
    closed: Arc<AtomicBool>,
}

impl CommandQueue {
    pub fn new(name: &'static str) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            name,
            sender,
            receiver,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Appends a command. Returns false once the queue has been closed.
    pub fn push(&self, command: Command) -> bool {
        if self.is_closed() {
            return false;
        }
        self.sender.send(QueueItem::Command(command)).is_ok()
    }

    /// Enqueues the close marker behind every command already queued
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.sender.send(QueueItem::Close);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Blocks until the next item arrives
    pub fn pop(&self) -> QueueItem {
        self.receiver.recv().unwrap_or(QueueItem::Close)
    }

    pub fn try_pop(&self) -> Option<QueueItem> {
        match self.receiver.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(QueueItem::Close),
        }
    }

    pub fn pop_timeout(&self, timeout: Duration) -> Option<QueueItem> {
        match self.receiver.recv_timeout(timeout) {
            Ok(item) => Some(item),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(QueueItem::Close),
        }
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
