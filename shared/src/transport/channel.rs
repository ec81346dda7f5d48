use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::Duration,
};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::trace;
use parking_lot::RwLock;

use super::{
    error::{RecvError, SendError, TransportError},
    PacketReceiver, PacketSender,
};

type Datagram = (SocketAddr, Box<[u8]>);

/// An in-process network of endpoints, each bound at a `SocketAddr`.
///
/// Every endpoint has a single unbounded FIFO queue, so packets between any
/// pair of endpoints arrive in the order they were sent. Used by tests and by
/// clusters that run every process inside one address space.
#[derive(Clone, Default)]
pub struct LocalNetwork {
    endpoints: Arc<RwLock<HashMap<SocketAddr, Sender<Datagram>>>>,
}

impl LocalNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a new endpoint, returning its sender and receiver halves
    pub fn bind(
        &self,
        address: SocketAddr,
    ) -> Result<(Box<dyn PacketSender>, Box<dyn PacketReceiver>), TransportError> {
        let mut endpoints = self.endpoints.write();
        if endpoints.contains_key(&address) {
            return Err(TransportError::AddressInUse { address });
        }

        let (sender, receiver) = unbounded();
        endpoints.insert(address, sender);

        let packet_sender = ChannelSender {
            local_address: address,
            endpoints: self.endpoints.clone(),
        };
        let packet_receiver = ChannelReceiver { address, receiver };

        Ok((Box::new(packet_sender), Box::new(packet_receiver)))
    }

    /// Removes an endpoint. Packets sent to it afterwards fail with `Unreachable`.
    pub fn unbind(&self, address: &SocketAddr) {
        self.endpoints.write().remove(address);
    }

    pub fn is_bound(&self, address: &SocketAddr) -> bool {
        self.endpoints.read().contains_key(address)
    }
}

#[derive(Clone)]
struct ChannelSender {
    local_address: SocketAddr,
    endpoints: Arc<RwLock<HashMap<SocketAddr, Sender<Datagram>>>>,
}

impl PacketSender for ChannelSender {
    fn local_address(&self) -> SocketAddr {
        self.local_address
    }

    fn send(&self, address: &SocketAddr, payload: &[u8]) -> Result<(), SendError> {
        let endpoints = self.endpoints.read();
        let Some(sender) = endpoints.get(address) else {
            return Err(SendError::Unreachable { address: *address });
        };

        trace!(
            "{} -> {}: {} bytes",
            self.local_address,
            address,
            payload.len()
        );
        sender
            .send((self.local_address, payload.into()))
            .map_err(|_| SendError::Disconnected { address: *address })
    }
}

struct ChannelReceiver {
    address: SocketAddr,
    receiver: Receiver<Datagram>,
}

impl PacketReceiver for ChannelReceiver {
    fn receive(&mut self) -> Result<Option<Datagram>, RecvError> {
        match self.receiver.try_recv() {
            Ok(datagram) => Ok(Some(datagram)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(RecvError::Disconnected {
                address: self.address,
            }),
        }
    }

    fn receive_timeout(&mut self, timeout: Duration) -> Result<Option<Datagram>, RecvError> {
        match self.receiver.recv_timeout(timeout) {
            Ok(datagram) => Ok(Some(datagram)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(RecvError::Disconnected {
                address: self.address,
            }),
        }
    }
}
