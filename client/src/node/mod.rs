pub mod frame_counters;
pub mod handlers;
#[allow(clippy::module_inception)]
pub mod node;
pub mod pipe;
