use std::{default::Default, time::Duration};

/// Contains Config properties which will be used by the Server
#[derive(Clone)]
pub struct ServerConfig {
    /// How long the receiver thread blocks on the transport before checking
    /// whether it should stop
    pub receive_poll_interval: Duration,
    /// Sent with every FRAME_FINISH: nodes also wait until all nodes of their
    /// process finished the frame
    pub sync_global_finish: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            receive_poll_interval: Duration::from_millis(10),
            sync_global_finish: false,
        }
    }
}
