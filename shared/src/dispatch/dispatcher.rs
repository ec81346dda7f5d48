use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use log::{trace, warn};
use parking_lot::RwLock;

use crate::protocol::CommandId;

use super::{command::Command, command_queue::CommandQueue, error::DispatchError};

/// A handler run directly on the thread that calls `dispatch`, typically the
/// receiver thread. Used for commands that must make progress while every
/// queue consumer may be blocked, such as barrier replies and object data.
pub type ReceiverHandler = Arc<dyn Fn(Command) -> Result<(), DispatchError> + Send + Sync>;

/// Where a command goes once it has been received
#[derive(Clone)]
pub enum CommandTarget {
    /// Executed in arrival order by the queue's single consumer thread
    Queue(CommandQueue),
    /// Executed immediately on the dispatching thread
    Receiver(ReceiverHandler),
}

/// Maps command identifiers to the queue (or receiver handler) that executes them.
#[derive(Default)]
pub struct CommandDispatcher {
    routes: RwLock<HashMap<CommandId, CommandTarget>>,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates `command` with `target`
    pub fn register_handler(
        &self,
        command: CommandId,
        target: CommandTarget,
    ) -> Result<(), DispatchError> {
        let mut routes = self.routes.write();
        if routes.contains_key(&command) {
            return Err(DispatchError::AlreadyRegistered { command });
        }
        routes.insert(command, target);
        Ok(())
    }

    /// Convenience for `register_handler(command, CommandTarget::Queue(queue.clone()))`
    pub fn register_queue(
        &self,
        command: CommandId,
        queue: &CommandQueue,
    ) -> Result<(), DispatchError> {
        self.register_handler(command, CommandTarget::Queue(queue.clone()))
    }

    pub fn deregister_handler(&self, command: CommandId) -> bool {
        self.routes.write().remove(&command).is_some()
    }

    pub fn is_registered(&self, command: CommandId) -> bool {
        self.routes.read().contains_key(&command)
    }

    /// Routes a command to its target. An unregistered command is a protocol
    /// violation; the caller should close the connection it came from.
    pub fn dispatch(&self, command: Command) -> Result<(), DispatchError> {
        let target = {
            let routes = self.routes.read();
            let Some(target) = routes.get(&command.command()) else {
                warn!(
                    "Unknown command {:?} from {}",
                    command.command(),
                    command.source()
                );
                return Err(DispatchError::UnknownCommand {
                    command: command.command(),
                });
            };
            target.clone()
        };

        trace!("dispatch {:?} from {}", command.command(), command.source());
        match target {
            CommandTarget::Queue(queue) => {
                let id = command.command();
                if queue.push(command) {
                    Ok(())
                } else {
                    Err(DispatchError::QueueClosed { command: id })
                }
            }
            CommandTarget::Receiver(handler) => handler(command),
        }
    }

    /// Parses a raw packet and dispatches it
    pub fn dispatch_packet(&self, source: SocketAddr, packet: &[u8]) -> Result<(), DispatchError> {
        let command = Command::parse(source, packet)?;
        self.dispatch(command)
    }
}
