use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use log::{debug, trace, warn};

use lockstep_shared::{
    CompressionConfig, Encoder, FrameData, FrameDataError, FrameNumber, ObjectId, PacketSender,
    TransmitStats,
};

use crate::error::TransmitError;

/// Events kept until `drain_events`; later ones are dropped
pub const EVENT_CAPACITY: usize = 256;

pub enum TransmitTask {
    Send {
        data: Arc<FrameData>,
        target: SocketAddr,
        frame_number: FrameNumber,
    },
    /// Ends the worker once every task queued before it has been sent
    Exit,
}

/// Reported by the worker for every processed `TransmitTask::Send`
#[derive(Clone, Debug)]
pub struct TransmitEvent {
    pub object_id: ObjectId,
    pub version: u32,
    pub target: SocketAddr,
    pub frame_number: FrameNumber,
    pub outcome: Result<TransmitStats, FrameDataError>,
}

/// Sends frame data to other nodes on a dedicated thread, in submission order
pub struct TransmitWorker {
    name: String,
    tasks: Sender<TransmitTask>,
    events: Receiver<TransmitEvent>,
    dropped_events: Arc<AtomicUsize>,
    stopped: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl TransmitWorker {
    pub fn spawn(
        name: String,
        sender: Box<dyn PacketSender>,
        compression: &CompressionConfig,
    ) -> Result<Self, TransmitError> {
        let mut encoder = Encoder::try_new(compression.mode(), compression.min_payload_size)?;
        let (tasks, task_receiver) = unbounded::<TransmitTask>();
        let (event_sender, events) = bounded(EVENT_CAPACITY);
        let dropped_events = Arc::new(AtomicUsize::new(0));
        let thread_dropped = dropped_events.clone();

        let thread = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                for task in task_receiver {
                    let TransmitTask::Send {
                        data,
                        target,
                        frame_number,
                    } = task
                    else {
                        break;
                    };

                    let outcome = data.transmit(&target, frame_number, &mut encoder, sender.as_ref());
                    if let Err(error) = &outcome {
                        warn!(
                            "Transmit of {} frame {} to {} failed: {}",
                            data.id(),
                            frame_number,
                            target,
                            error
                        );
                    }
                    let object_version = data.object_version();
                    let event = TransmitEvent {
                        object_id: object_version.id,
                        version: object_version.version,
                        target,
                        frame_number,
                        outcome,
                    };
                    match event_sender.try_send(event) {
                        Ok(()) => {}
                        Err(TrySendError::Full(event)) => {
                            thread_dropped.fetch_add(1, Ordering::Relaxed);
                            trace!(
                                "Event queue full, dropping event for frame {}",
                                event.frame_number
                            );
                        }
                        Err(TrySendError::Disconnected(_)) => break,
                    }
                }
            })
            .map_err(|error| TransmitError::Spawn {
                name: name.clone(),
                message: error.to_string(),
            })?;

        debug!("Transmit worker '{}' started", name);
        Ok(Self {
            name,
            tasks,
            events,
            dropped_events,
            stopped: Arc::new(AtomicBool::new(false)),
            thread: Some(thread),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queues a transmission of `data`'s local images
    pub fn send(
        &self,
        data: Arc<FrameData>,
        target: SocketAddr,
        frame_number: FrameNumber,
    ) -> Result<(), TransmitError> {
        if self.is_stopped() {
            return Err(TransmitError::Stopped {
                name: self.name.clone(),
            });
        }
        self.tasks
            .send(TransmitTask::Send {
                data,
                target,
                frame_number,
            })
            .map_err(|_| TransmitError::Stopped {
                name: self.name.clone(),
            })
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Tasks queued but not yet picked up by the worker
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Takes every event reported so far
    pub fn drain_events(&self) -> Vec<TransmitEvent> {
        self.events.try_iter().collect()
    }

    /// Events discarded because nobody drained the queue in time
    pub fn dropped_events(&self) -> usize {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Sends the exit sentinel and waits for the worker to drain its queue
    pub fn shutdown(&mut self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.tasks.send(TransmitTask::Exit).is_err() {
            debug!("Transmit worker '{}' already exited", self.name);
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Transmit worker '{}' panicked", self.name);
            }
        }
        debug!("Transmit worker '{}' stopped", self.name);
    }
}

impl Drop for TransmitWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
