use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam_channel::{unbounded, Sender};
use log::{error, trace};
use parking_lot::{Condvar, Mutex};

use lockstep_shared::{FrameNumber, NodeKey, PipeId};

use crate::{error::NodeError, factory::PipeRenderer};

enum PipeTask {
    Frame(FrameNumber),
    Exit,
}

#[derive(Default)]
struct Watermarks {
    current: FrameNumber,
    unlocked: FrameNumber,
    finished: FrameNumber,
    exited: bool,
}

struct PipeShared {
    id: PipeId,
    marks: Mutex<Watermarks>,
    changed: Condvar,
}

impl PipeShared {
    fn release_frame_local(&self, frame_number: FrameNumber) {
        let mut marks = self.marks.lock();
        marks.unlocked = marks.unlocked.max(frame_number);
        self.changed.notify_all();
    }

    fn release_frame_finished(&self, frame_number: FrameNumber) {
        let mut marks = self.marks.lock();
        marks.finished = marks.finished.max(frame_number);
        self.changed.notify_all();
    }

    fn mark_exited(&self) {
        self.marks.lock().exited = true;
        self.changed.notify_all();
    }

    fn run_frame(&self, renderer: &mut dyn PipeRenderer, frame_number: FrameNumber) {
        trace!("{} draws frame {}", self.id, frame_number);
        renderer.draw(self.id, frame_number);
        self.release_frame_local(frame_number);
        renderer.tasks(self.id, frame_number);
        self.release_frame_finished(frame_number);
    }

    fn wait(&self, ready: impl Fn(&Watermarks) -> bool) {
        let mut marks = self.marks.lock();
        while !ready(&*marks) {
            self.changed.wait(&mut marks);
        }
    }

    fn wait_timeout(&self, timeout: Duration, ready: impl Fn(&Watermarks) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        let mut marks = self.marks.lock();
        while !ready(&*marks) {
            if self.changed.wait_until(&mut marks, deadline).timed_out() {
                return ready(&*marks);
            }
        }
        true
    }
}

enum PipeMode {
    /// Frames run on the node thread inside `start_frame`
    Inline(Box<dyn PipeRenderer>),
    Threaded {
        tasks: Sender<PipeTask>,
        thread: JoinHandle<()>,
    },
    Exited,
}

/// A rendering sub-unit of a node.
///
/// The pipe knows its node only by key. Its watermarks advance as its
/// renderer completes each phase of a frame.
pub struct Pipe {
    id: PipeId,
    node: NodeKey,
    threaded: bool,
    shared: Arc<PipeShared>,
    mode: PipeMode,
}

impl Pipe {
    pub fn new(
        node: NodeKey,
        id: PipeId,
        threaded: bool,
        mut renderer: Box<dyn PipeRenderer>,
    ) -> Result<Self, NodeError> {
        let shared = Arc::new(PipeShared {
            id,
            marks: Mutex::new(Watermarks::default()),
            changed: Condvar::new(),
        });

        let mode = if threaded {
            let (tasks, receiver) = unbounded();
            let name = format!("{}-{}", node, id);
            let thread_shared = shared.clone();
            let thread = thread::Builder::new()
                .name(name.clone())
                .spawn(move || {
                    for task in receiver {
                        match task {
                            PipeTask::Frame(frame_number) => {
                                thread_shared.run_frame(renderer.as_mut(), frame_number)
                            }
                            PipeTask::Exit => break,
                        }
                    }
                    renderer.exit(thread_shared.id);
                    thread_shared.mark_exited();
                })
                .map_err(|error| NodeError::Spawn {
                    name,
                    message: error.to_string(),
                })?;
            PipeMode::Threaded { tasks, thread }
        } else {
            PipeMode::Inline(renderer)
        };

        Ok(Self {
            id,
            node,
            threaded,
            shared,
            mode,
        })
    }

    pub fn id(&self) -> PipeId {
        self.id
    }

    pub fn node(&self) -> NodeKey {
        self.node
    }

    pub fn is_threaded(&self) -> bool {
        self.threaded
    }

    pub fn current_frame(&self) -> FrameNumber {
        self.shared.marks.lock().current
    }

    pub fn unlocked_frame(&self) -> FrameNumber {
        self.shared.marks.lock().unlocked
    }

    pub fn finished_frame(&self) -> FrameNumber {
        self.shared.marks.lock().finished
    }

    pub fn is_exited(&self) -> bool {
        self.shared.marks.lock().exited
    }

    /// Starts the renderer on `frame_number`. Inline pipes complete the frame
    /// before returning.
    pub fn start_frame(&mut self, frame_number: FrameNumber) {
        self.shared.marks.lock().current = frame_number;
        match &mut self.mode {
            PipeMode::Inline(renderer) => self.shared.run_frame(renderer.as_mut(), frame_number),
            PipeMode::Threaded { tasks, .. } => {
                if tasks.send(PipeTask::Frame(frame_number)).is_err() {
                    error!("{} thread is gone, frame {} dropped", self.id, frame_number);
                }
            }
            PipeMode::Exited => {
                error!("{} is exited, frame {} dropped", self.id, frame_number);
            }
        }
    }

    pub fn wait_frame_local(&self, frame_number: FrameNumber) {
        self.shared.wait(|marks| marks.unlocked >= frame_number || marks.exited);
    }

    pub fn wait_frame_finished(&self, frame_number: FrameNumber) {
        self.shared.wait(|marks| marks.finished >= frame_number || marks.exited);
    }

    pub fn wait_exited(&self) {
        self.shared.wait(|marks| marks.exited);
    }

    pub fn wait_frame_local_timeout(
        &self,
        frame_number: FrameNumber,
        timeout: Duration,
    ) -> Result<(), NodeError> {
        if self.shared.wait_timeout(timeout, |marks| marks.unlocked >= frame_number) {
            Ok(())
        } else {
            Err(NodeError::WaitTimeout {
                what: "pipe local release",
                frame_number,
                timeout,
            })
        }
    }

    pub fn wait_frame_finished_timeout(
        &self,
        frame_number: FrameNumber,
        timeout: Duration,
    ) -> Result<(), NodeError> {
        if self.shared.wait_timeout(timeout, |marks| marks.finished >= frame_number) {
            Ok(())
        } else {
            Err(NodeError::WaitTimeout {
                what: "pipe finish",
                frame_number,
                timeout,
            })
        }
    }

    /// Stops the renderer. Threaded pipes finish every started frame first.
    pub fn exit(&mut self) {
        match std::mem::replace(&mut self.mode, PipeMode::Exited) {
            PipeMode::Inline(mut renderer) => {
                renderer.exit(self.id);
                self.shared.mark_exited();
            }
            PipeMode::Threaded { tasks, thread } => {
                let _ = tasks.send(PipeTask::Exit);
                if thread.join().is_err() {
                    error!("{} thread panicked", self.id);
                    self.shared.mark_exited();
                }
            }
            PipeMode::Exited => {}
        }
    }
}

impl Drop for Pipe {
    fn drop(&mut self) {
        self.exit();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    struct Counting(Arc<AtomicU32>);

    impl PipeRenderer for Counting {
        fn draw(&mut self, _pipe: PipeId, _frame_number: FrameNumber) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn inline_pipe_completes_frame_in_start() {
        let draws = Arc::new(AtomicU32::new(0));
        let mut pipe = Pipe::new(
            NodeKey::new(1),
            PipeId::new(1),
            false,
            Box::new(Counting(draws.clone())),
        )
        .unwrap();

        pipe.start_frame(1);
        assert_eq!(pipe.unlocked_frame(), 1);
        assert_eq!(pipe.finished_frame(), 1);
        assert_eq!(draws.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn threaded_pipe_finishes_started_frames_before_exit() {
        let draws = Arc::new(AtomicU32::new(0));
        let mut pipe = Pipe::new(
            NodeKey::new(1),
            PipeId::new(2),
            true,
            Box::new(Counting(draws.clone())),
        )
        .unwrap();

        pipe.start_frame(1);
        pipe.start_frame(2);
        pipe.wait_frame_finished(2);
        pipe.exit();

        assert!(pipe.is_exited());
        assert_eq!(pipe.current_frame(), 2);
        assert_eq!(draws.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn wait_timeout_reports_missing_frame() {
        let pipe = Pipe::new(NodeKey::new(1), PipeId::new(3), true, Box::new(crate::factory::IdleRenderer))
            .unwrap();

        assert!(matches!(
            pipe.wait_frame_local_timeout(1, Duration::from_millis(10)),
            Err(NodeError::WaitTimeout { frame_number: 1, .. })
        ));
    }
}
