use std::{
    collections::{BTreeMap, HashMap},
    net::SocketAddr,
    sync::Arc,
};

use log::{debug, info, trace, warn};
use parking_lot::Mutex;

use lockstep_shared::{
    Barrier, FrameData, FrameDataState, FrameNumber, FrameStage, LocalRelease,
    NodeFrameFinishReplyPacket, NodeKey, ObjectId, ObjectSession, ObjectVersion, Packet, PipeId,
    TaskMask, ThreadModel,
};

use crate::{
    client_config::NodeConfig,
    config::Config,
    error::NodeError,
    node::{frame_counters::FrameCounters, pipe::Pipe},
    transmitter::{TransmitEvent, TransmitWorker},
};

/// Frame data mapped by a node, shared with the receiver thread so incoming
/// transmissions find their target without going through the node thread
pub type FrameDataMap = Arc<Mutex<HashMap<ObjectId, Arc<FrameData>>>>;

/// One worker of the cluster, owned by its node thread.
///
/// Its frame watermarks only move forward and are published through
/// `FrameCounters`, so other threads can follow the node's progress.
pub struct Node {
    key: NodeKey,
    name: String,
    tasks: TaskMask,
    thread_model: ThreadModel,
    initialized: bool,
    counters: Arc<FrameCounters>,
    config: Arc<Config>,
    server: Option<SocketAddr>,
    session: Arc<ObjectSession>,
    pipes: BTreeMap<PipeId, Pipe>,
    barriers: Mutex<HashMap<ObjectId, Arc<Barrier>>>,
    frame_datas: FrameDataMap,
    transmitter: Option<TransmitWorker>,
    node_config: NodeConfig,
}

impl Node {
    /// Creates the node and registers it with `config`
    pub fn new(
        key: NodeKey,
        config: Arc<Config>,
        session: Arc<ObjectSession>,
        frame_datas: FrameDataMap,
        node_config: NodeConfig,
    ) -> Self {
        config.add_node(key);
        Self {
            key,
            name: key.to_string(),
            tasks: TaskMask::NONE,
            thread_model: ThreadModel::DEFAULT,
            initialized: false,
            counters: Arc::new(FrameCounters::new()),
            config,
            server: None,
            session,
            pipes: BTreeMap::new(),
            barriers: Mutex::new(HashMap::new()),
            frame_datas,
            transmitter: None,
            node_config,
        }
    }

    pub fn key(&self) -> NodeKey {
        self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tasks(&self) -> TaskMask {
        self.tasks
    }

    pub fn thread_model(&self) -> ThreadModel {
        self.thread_model
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn counters(&self) -> &Arc<FrameCounters> {
        &self.counters
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn session(&self) -> &Arc<ObjectSession> {
        &self.session
    }

    pub fn current_frame(&self) -> FrameNumber {
        self.counters.current()
    }

    pub fn unlocked_frame(&self) -> FrameNumber {
        self.counters.unlocked()
    }

    pub fn finished_frame(&self) -> FrameNumber {
        self.counters.finished()
    }

    /// Address of the control process, learned from its first command
    pub fn server(&self) -> Result<SocketAddr, NodeError> {
        self.server.ok_or(NodeError::NoServer { node: self.key })
    }

    pub(crate) fn set_server(&mut self, server: SocketAddr) {
        if self.server != Some(server) {
            debug!("{} is controlled by {}", self.key, server);
            self.server = Some(server);
        }
    }

    // Init / Exit

    /// Applies the settings of CONFIG_INIT and starts the transmit worker
    pub(crate) fn init(
        &mut self,
        name: String,
        tasks: TaskMask,
        thread_model: Option<ThreadModel>,
    ) -> Result<(), NodeError> {
        self.name = name;
        self.tasks = tasks;
        self.thread_model = thread_model.unwrap_or(ThreadModel::DEFAULT);
        self.counters.reset();
        self.config.reset_node(self.key);

        if self.transmitter.is_none() {
            self.transmitter = Some(TransmitWorker::spawn(
                format!("{}-transmit", self.key),
                self.session.sender().clone_box(),
                &self.node_config.compression,
            )?);
        }
        info!(
            "{} '{}' initialized with {:?}",
            self.key, self.name, self.thread_model
        );
        Ok(())
    }

    pub(crate) fn mark_initialized(&mut self, initialized: bool) {
        self.initialized = initialized;
    }

    /// Stops pipes and the transmit worker and unmaps every object
    pub(crate) fn exit(&mut self) {
        self.exit_pipes();
        if let Some(mut transmitter) = self.transmitter.take() {
            transmitter.shutdown();
        }
        self.unmap_objects();
        self.initialized = false;
        info!("{} exited", self.key);
    }

    // Pipes

    pub fn create_pipe(&mut self, id: PipeId, threaded: bool) -> Result<(), NodeError> {
        if self.pipes.contains_key(&id) {
            return Err(NodeError::PipeExists {
                node: self.key,
                pipe: id,
            });
        }
        let renderer = self.node_config.factory.create_renderer(self.key, id);
        let pipe = Pipe::new(self.key, id, threaded, renderer)?;
        self.pipes.insert(id, pipe);
        debug!("{} created {} (threaded: {})", self.key, id, threaded);
        Ok(())
    }

    pub fn destroy_pipe(&mut self, id: PipeId) -> Result<(), NodeError> {
        let Some(mut pipe) = self.pipes.remove(&id) else {
            return Err(NodeError::PipeNotFound {
                node: self.key,
                pipe: id,
            });
        };
        pipe.exit();
        debug!("{} destroyed {}", self.key, id);
        Ok(())
    }

    pub fn pipe(&self, id: PipeId) -> Result<&Pipe, NodeError> {
        self.pipes.get(&id).ok_or(NodeError::PipeNotFound {
            node: self.key,
            pipe: id,
        })
    }

    pub fn pipe_ids(&self) -> Vec<PipeId> {
        self.pipes.keys().copied().collect()
    }

    fn exit_pipes(&mut self) {
        for pipe in self.pipes.values_mut() {
            pipe.exit();
        }
        self.pipes.clear();
    }

    // Frames

    /// Advances the current frame and starts every pipe on it
    pub(crate) fn start_frame(&mut self, frame_number: FrameNumber) -> Result<(), NodeError> {
        let current = self.counters.current();
        if frame_number < current {
            return Err(NodeError::FrameOutOfOrder {
                node: self.key,
                operation: "start",
                frame_number,
                watermark: current,
            });
        }
        self.counters.set_current(frame_number);
        for pipe in self.pipes.values_mut() {
            pipe.start_frame(frame_number);
        }
        trace!("{} started frame {}", self.key, frame_number);
        Ok(())
    }

    /// Does what the thread model requires of `stage` for `frame_number`
    pub(crate) fn apply_local_release(
        &mut self,
        stage: FrameStage,
        frame_number: FrameNumber,
    ) -> Result<(), NodeError> {
        match self.thread_model.local_release(stage) {
            LocalRelease::Deferred => return Ok(()),
            LocalRelease::Now => {}
            LocalRelease::AfterPipesDrawn => self.wait_pipes_local(frame_number),
            LocalRelease::AfterPipesFinished => self.wait_pipes_finished(frame_number),
        }
        self.release_frame_local(frame_number)
    }

    pub(crate) fn wait_pipes_local(&self, frame_number: FrameNumber) {
        for pipe in self.pipes.values() {
            pipe.wait_frame_local(frame_number);
        }
    }

    pub(crate) fn wait_pipes_finished(&self, frame_number: FrameNumber) {
        for pipe in self.pipes.values() {
            pipe.wait_frame_finished(frame_number);
        }
    }

    /// Signals the parent config that `frame_number` no longer blocks local work.
    /// Releasing the frame that is already unlocked does nothing. The frame must
    /// have been started.
    pub fn release_frame_local(&mut self, frame_number: FrameNumber) -> Result<(), NodeError> {
        let current = self.counters.current();
        if current < frame_number {
            return Err(NodeError::FrameNotStarted {
                node: self.key,
                frame_number,
                current,
            });
        }
        let unlocked = self.counters.unlocked();
        if unlocked > frame_number {
            return Err(NodeError::FrameOutOfOrder {
                node: self.key,
                operation: "locally release",
                frame_number,
                watermark: unlocked,
            });
        }
        if unlocked == frame_number {
            return Ok(());
        }

        self.counters.set_unlocked(frame_number);
        self.config.notify_frame_local(self.key, frame_number);
        trace!("{} released frame {} locally", self.key, frame_number);
        Ok(())
    }

    /// Reports `frame_number` finished to the parent config and the control
    /// process. Releasing an already finished frame does nothing.
    pub fn release_frame(&mut self, frame_number: FrameNumber) -> Result<(), NodeError> {
        let current = self.counters.current();
        if current < frame_number {
            return Err(NodeError::FrameNotStarted {
                node: self.key,
                frame_number,
                current,
            });
        }
        if self.counters.finished() >= frame_number {
            return Ok(());
        }

        self.counters.set_finished(frame_number);
        self.config.notify_frame_finished(self.key, frame_number);
        trace!("{} finished frame {}", self.key, frame_number);

        match self.server {
            Some(server) => {
                let reply = NodeFrameFinishReplyPacket {
                    node_id: self.key,
                    frame_number,
                };
                self.session.sender().send(&server, &reply.encode())?;
            }
            None => debug!("{} has no control process to notify", self.key),
        }
        Ok(())
    }

    /// Releases whatever the hooks and the thread model left unreleased at
    /// frame finish
    pub(crate) fn enforce_release(&mut self, frame_number: FrameNumber) -> Result<(), NodeError> {
        if self.counters.unlocked() < frame_number {
            warn!(
                "{} ({:?}) reached finish of frame {} without a local release",
                self.key, self.thread_model, frame_number
            );
            self.counters.count_enforced_release();
            self.release_frame_local(frame_number)?;
        }
        if self.counters.finished() < frame_number {
            warn!(
                "{} reached finish of frame {} without releasing it",
                self.key, frame_number
            );
            self.counters.count_enforced_release();
            self.release_frame(frame_number)?;
        }
        Ok(())
    }

    // Objects

    /// Returns the barrier `barrier` synced to its version, mapping it on first use
    pub fn get_barrier(&self, barrier: ObjectVersion) -> Result<Arc<Barrier>, NodeError> {
        let mapped = {
            let mut barriers = self.barriers.lock();
            match barriers.get(&barrier.id) {
                Some(mapped) => mapped.clone(),
                None => {
                    let mapped = Barrier::map(&self.session, barrier.id, self.server()?)?;
                    barriers.insert(barrier.id, mapped.clone());
                    mapped
                }
            }
        };
        mapped.sync_data(barrier.version)?;
        Ok(mapped)
    }

    /// Returns the frame data `data` synced to its version, mapping it on first use
    pub fn get_frame_data(&self, data: ObjectVersion) -> Result<Arc<FrameData>, NodeError> {
        let mapped = {
            let mut frame_datas = self.frame_datas.lock();
            match frame_datas.get(&data.id) {
                Some(mapped) => mapped.clone(),
                None => {
                    let replica = self
                        .session
                        .map_object(data.id, FrameDataState::default())?;
                    let mapped = Arc::new(FrameData::new(replica));
                    frame_datas.insert(data.id, mapped.clone());
                    mapped
                }
            }
        };
        mapped.sync(data.version)?;
        Ok(mapped)
    }

    /// Queues the local images of frame data `id` for `target` on the
    /// transmit worker
    pub fn transmit_frame_data(
        &self,
        id: ObjectId,
        target: SocketAddr,
        frame_number: FrameNumber,
    ) -> Result<(), NodeError> {
        let Some(data) = self.frame_datas.lock().get(&id).cloned() else {
            return Err(NodeError::UnknownFrameData {
                node: self.key,
                object_id: id,
            });
        };
        let Some(transmitter) = &self.transmitter else {
            return Err(NodeError::NotInitialized { node: self.key });
        };
        transmitter.send(data, target, frame_number)?;
        Ok(())
    }

    /// Events of finished transmissions since the last call
    pub fn transmit_events(&self) -> Vec<TransmitEvent> {
        self.transmitter
            .as_ref()
            .map(TransmitWorker::drain_events)
            .unwrap_or_default()
    }

    fn unmap_objects(&mut self) {
        for (_, barrier) in self.barriers.lock().drain() {
            barrier.unmap(&self.session);
        }
        for (id, _) in self.frame_datas.lock().drain() {
            self.session.unmap_object(id);
        }
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.config.remove_node(self.key);
        self.exit_pipes();
        if let Some(mut transmitter) = self.transmitter.take() {
            transmitter.shutdown();
        }
        self.unmap_objects();
    }
}
