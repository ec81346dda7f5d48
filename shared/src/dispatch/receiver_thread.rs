use std::{
    collections::HashSet,
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, error, info, trace, warn};
use parking_lot::Mutex;

use crate::transport::PacketReceiver;

use super::{dispatcher::CommandDispatcher, error::DispatchError};

/// Called once for every peer whose connection is closed for a protocol violation
pub type ViolationHandler = Box<dyn Fn(SocketAddr, &DispatchError) + Send>;

/// Pulls packets off a `PacketReceiver` and dispatches them.
///
/// A protocol violation closes the connection to the offending peer: its
/// later packets are dropped unread. Other dispatch failures are logged and
/// the connection is kept.
pub struct ReceiverThread {
    name: String,
    running: Arc<AtomicBool>,
    closed_peers: Arc<Mutex<HashSet<SocketAddr>>>,
    thread: Option<JoinHandle<()>>,
}

impl ReceiverThread {
    pub fn spawn(
        name: String,
        mut receiver: Box<dyn PacketReceiver>,
        dispatcher: Arc<CommandDispatcher>,
        poll_interval: Duration,
        on_violation: Option<ViolationHandler>,
    ) -> Result<Self, DispatchError> {
        let running = Arc::new(AtomicBool::new(true));
        let closed_peers = Arc::new(Mutex::new(HashSet::new()));

        let thread_running = running.clone();
        let thread_closed = closed_peers.clone();
        let thread_name = name.clone();
        let thread = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                while thread_running.load(Ordering::Acquire) {
                    let (source, packet) = match receiver.receive_timeout(poll_interval) {
                        Ok(Some(datagram)) => datagram,
                        Ok(None) => continue,
                        Err(error) => {
                            info!("{} stops: {}", thread_name, error);
                            break;
                        }
                    };

                    if thread_closed.lock().contains(&source) {
                        trace!("Dropping packet from closed connection {}", source);
                        continue;
                    }

                    let Err(dispatch_error) = dispatcher.dispatch_packet(source, &packet) else {
                        continue;
                    };
                    if dispatch_error.is_protocol_violation() {
                        error!(
                            "Closing connection to {}: {}",
                            source, dispatch_error
                        );
                        if let Some(handler) = &on_violation {
                            handler(source, &dispatch_error);
                        }
                        thread_closed.lock().insert(source);
                    } else {
                        warn!("Command from {} failed: {}", source, dispatch_error);
                    }
                }
            })
            .map_err(|error| DispatchError::Spawn {
                name: name.clone(),
                message: error.to_string(),
            })?;

        debug!("{} started", name);
        Ok(Self {
            name,
            running,
            closed_peers,
            thread: Some(thread),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_closed(&self, peer: &SocketAddr) -> bool {
        self.closed_peers.lock().contains(peer)
    }

    pub fn closed_peers(&self) -> Vec<SocketAddr> {
        self.closed_peers.lock().iter().copied().collect()
    }

    /// Stops after the current poll interval and joins the thread
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("{} panicked", self.name);
            }
        }
    }
}

impl Drop for ReceiverThread {
    fn drop(&mut self) {
        self.stop();
    }
}
