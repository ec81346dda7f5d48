//! In-process cluster harness: a control process and one worker process
//! per node, connected through a `LocalNetwork`, with a recording factory
//! that observes every hook.

pub mod cluster;
pub mod helpers;
pub mod log_capture;
pub mod recording;

pub use cluster::{
    local_address, node_address, Cluster, ClusterBuilder, ClusterError, SERVER_PORT,
    WAIT_TIMEOUT,
};
pub use helpers::{settle, wait_for};
pub use recording::{FrameDataPlan, Gate, PipeGates, Record, RecordingFactory, Scenario};
