//! # Lockstep Server
//! The control process of a lockstep cluster. It is built from a static
//! configuration tree, initializes every node, broadcasts frame boundaries,
//! collects frame completion replies, and owns the master copies of
//! barriers and other distributed objects.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod shared {
    pub use lockstep_shared::{
        Barrier, DirtyBits, FrameId, FrameNumber, InitId, LocalNetwork, Master, NodeKey,
        ObjectVersion, PipeId, TaskMask, ThreadModel, Versioned,
    };
}

mod config_description;
mod error;
mod events;
mod node_proxy;
mod server;
mod server_config;

pub use config_description::{
    ChannelDescription, ConfigDescription, NodeDescription, PipeDescription, WindowDescription,
};
pub use error::LockstepServerError;
pub use events::{
    DisconnectEvent, ErrorEvent, Event, Events, ExitEvent, FrameFinishedEvent, InitEvent,
};
pub use node_proxy::{NodeProxy, NodeState};
pub use server::Server;
pub use server_config::ServerConfig;
