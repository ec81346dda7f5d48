pub mod command;
pub mod command_queue;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod receiver_thread;
