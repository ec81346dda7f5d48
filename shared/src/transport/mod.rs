//! The reliable, ordered, connection-oriented channel between two processes
//! of the cluster. Everything above this module only ever sees framed packets
//! and the `SocketAddr` of the peer that sent them.

use std::{net::SocketAddr, time::Duration};

pub mod channel;
pub mod error;

pub use channel::LocalNetwork;
pub use error::{RecvError, SendError, TransportError};

/// Used to send packets to a peer
pub trait PacketSender: PacketSenderClone + Send + Sync {
    /// The address peers see as the source of packets sent through this sender
    fn local_address(&self) -> SocketAddr;

    /// Sends a framed packet to the given address
    fn send(&self, address: &SocketAddr, payload: &[u8]) -> Result<(), SendError>;
}

/// Used to receive packets from any peer
pub trait PacketReceiver: Send {
    /// Returns the next packet if one is waiting, without blocking
    fn receive(&mut self) -> Result<Option<(SocketAddr, Box<[u8]>)>, RecvError>;

    /// Blocks up to `timeout` for the next packet
    fn receive_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<(SocketAddr, Box<[u8]>)>, RecvError>;
}

/// Used to clone boxed PacketSenders
pub trait PacketSenderClone {
    fn clone_box(&self) -> Box<dyn PacketSender>;
}

impl<T: 'static + PacketSender + Clone> PacketSenderClone for T {
    fn clone_box(&self) -> Box<dyn PacketSender> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn PacketSender> {
    fn clone(&self) -> Box<dyn PacketSender> {
        PacketSenderClone::clone_box(self.as_ref())
    }
}
