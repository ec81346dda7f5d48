//! # Lockstep Client
//! The worker side of a lockstep cluster. A process hosts one or more Nodes,
//! each driven by its own thread through the commands of the control
//! process. Nodes release frames according to their thread model, and send
//! frame data to each other through an asynchronous transmit worker.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod shared {
    pub use lockstep_shared::{
        CompressionConfig, CompressionMode, FrameData, FrameDataState, FrameId, FrameNumber,
        Image, InitId, LocalNetwork, NodeKey, ObjectId, ObjectVersion, PipeId, TaskMask,
        ThreadModel,
    };
}

mod client;
mod client_config;
mod config;
mod error;
mod factory;
mod node;
mod node_thread;
mod transmitter;

pub use client::Client;
pub use client_config::{ClientConfig, NodeConfig};
pub use config::Config;
pub use error::{LockstepClientError, NodeError, TransmitError};
pub use factory::{
    DefaultHooks, DefaultNodeFactory, FrameRelease, IdleRenderer, NodeFactory, NodeHooks,
    PipeRenderer,
};
pub use node::{
    frame_counters::{FrameCounters, FrameProgress},
    handlers::NODE_COMMANDS,
    node::{FrameDataMap, Node},
    pipe::Pipe,
};
pub use node_thread::{NodeThread, NodeWorker};
pub use transmitter::{TransmitEvent, TransmitTask, TransmitWorker};
