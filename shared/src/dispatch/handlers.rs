use std::collections::HashMap;

use crate::protocol::CommandId;

use super::{command::Command, error::DispatchError};

pub type CommandFunc<T, E> = Box<dyn Fn(&mut T, Command) -> Result<(), E> + Send>;

/// The per-queue registration table: command id -> function value.
///
/// The queue consumer owns the target `T` and passes it in by `&mut`, so
/// handlers for one queue never run concurrently and need no locking.
pub struct CommandHandlers<T, E> {
    funcs: HashMap<CommandId, CommandFunc<T, E>>,
}

impl<T, E: From<DispatchError>> CommandHandlers<T, E> {
    pub fn new() -> Self {
        Self {
            funcs: HashMap::new(),
        }
    }

    pub fn register<F>(&mut self, command: CommandId, func: F) -> Result<(), DispatchError>
    where
        F: Fn(&mut T, Command) -> Result<(), E> + Send + 'static,
    {
        if self.funcs.contains_key(&command) {
            return Err(DispatchError::AlreadyRegistered { command });
        }
        self.funcs.insert(command, Box::new(func));
        Ok(())
    }

    pub fn commands(&self) -> impl Iterator<Item = CommandId> + '_ {
        self.funcs.keys().copied()
    }

    pub fn contains(&self, command: CommandId) -> bool {
        self.funcs.contains_key(&command)
    }

    /// Runs the function registered for `command` against `target`
    pub fn invoke(&self, target: &mut T, command: Command) -> Result<(), E> {
        let Some(func) = self.funcs.get(&command.command()) else {
            return Err(DispatchError::NoHandlerFunction {
                command: command.command(),
            }
            .into());
        };
        func(target, command)
    }
}

impl<T, E: From<DispatchError>> Default for CommandHandlers<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use super::*;
    use crate::{protocol::packets::NodeFrameStartPacket, types::NodeKey};

    #[derive(Default)]
    struct Counter {
        frames: Vec<u32>,
    }

    fn start(frame_number: u32) -> Command {
        Command::from_packet(
            SocketAddr::from(([127, 0, 0, 1], 1)),
            &NodeFrameStartPacket {
                node_id: NodeKey::new(1),
                frame_id: 0,
                frame_number,
            },
        )
    }

    #[test]
    fn invokes_registered_function_with_target() {
        let mut handlers: CommandHandlers<Counter, DispatchError> = CommandHandlers::new();
        handlers
            .register(CommandId::FrameStart, |counter: &mut Counter, command| {
                let packet: NodeFrameStartPacket = command.packet()?;
                counter.frames.push(packet.frame_number);
                Ok(())
            })
            .expect("register");

        let mut counter = Counter::default();
        handlers.invoke(&mut counter, start(4)).expect("invoke");
        handlers.invoke(&mut counter, start(5)).expect("invoke");

        assert_eq!(counter.frames, vec![4, 5]);
    }

    #[test]
    fn missing_function_is_reported() {
        let handlers: CommandHandlers<Counter, DispatchError> = CommandHandlers::new();
        let mut counter = Counter::default();

        assert_eq!(
            handlers.invoke(&mut counter, start(1)),
            Err(DispatchError::NoHandlerFunction {
                command: CommandId::FrameStart
            })
        );
    }
}
