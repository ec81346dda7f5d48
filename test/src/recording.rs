//! A `NodeFactory` that records every hook and renderer call, with gates
//! that hold pipes inside `draw` or `tasks` until a test opens them.

use std::{
    collections::{HashMap, HashSet},
    net::SocketAddr,
    sync::Arc,
    time::Duration,
};

use parking_lot::{Condvar, Mutex};

use lockstep_client::{FrameRelease, Node, NodeFactory, NodeHooks, PipeRenderer};
use lockstep_shared::{
    FrameDataState, FrameId, FrameNumber, Image, InitId, NodeKey, ObjectVersion, PipeId,
};

pub const HOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Record {
    ConfigInit(NodeKey),
    ConfigExit(NodeKey),
    FrameStart(NodeKey, FrameNumber),
    FrameDrawFinish(NodeKey, FrameNumber),
    FrameTasksFinish(NodeKey, FrameNumber),
    FrameFinish(NodeKey, FrameNumber),
    Draw(PipeId, FrameNumber),
    Tasks(PipeId, FrameNumber),
    BarrierPassed(NodeKey, FrameNumber),
    ImagesReceived {
        node: NodeKey,
        frame_number: FrameNumber,
        images: usize,
    },
    Error(NodeKey, String),
}

/// Frame data sent from one node to another every frame after the first
#[derive(Clone, Debug)]
pub struct FrameDataPlan {
    pub data: ObjectVersion,
    pub source: NodeKey,
    pub target_node: NodeKey,
    pub target: SocketAddr,
}

/// What the recorded nodes do besides recording
#[derive(Clone, Debug, Default)]
pub struct Scenario {
    /// Nodes whose `frame_finish` hook holds the release
    pub hold_release: HashSet<NodeKey>,
    /// Nodes whose `config_init` hook fails
    pub fail_init: HashSet<NodeKey>,
    /// Pipes whose renderers wait on their gates
    pub gated_pipes: HashSet<PipeId>,
    /// Barrier every node syncs on at draw finish
    pub barrier: Option<ObjectVersion>,
    pub frame_data: Option<FrameDataPlan>,
}

/// Lets a renderer through frames up to the opened one
pub struct Gate {
    limit: Mutex<FrameNumber>,
    changed: Condvar,
}

impl Gate {
    fn new(open: bool) -> Self {
        Self {
            limit: Mutex::new(if open { FrameNumber::MAX } else { 0 }),
            changed: Condvar::new(),
        }
    }

    pub fn open(&self, frame_number: FrameNumber) {
        let mut limit = self.limit.lock();
        *limit = (*limit).max(frame_number);
        self.changed.notify_all();
    }

    fn pass(&self, frame_number: FrameNumber) {
        let mut limit = self.limit.lock();
        while *limit < frame_number {
            self.changed.wait(&mut limit);
        }
    }
}

pub struct PipeGates {
    pub draw: Gate,
    pub tasks: Gate,
}

#[derive(Default)]
struct RecordingShared {
    scenario: Mutex<Scenario>,
    records: Mutex<Vec<Record>>,
    gates: Mutex<HashMap<PipeId, Arc<PipeGates>>>,
}

impl RecordingShared {
    fn record(&self, record: Record) {
        self.records.lock().push(record);
    }

    fn scenario(&self) -> Scenario {
        self.scenario.lock().clone()
    }

    fn gates(&self, pipe: PipeId) -> Arc<PipeGates> {
        let gated = self.scenario.lock().gated_pipes.contains(&pipe);
        self.gates
            .lock()
            .entry(pipe)
            .or_insert_with(|| {
                Arc::new(PipeGates {
                    draw: Gate::new(!gated),
                    tasks: Gate::new(!gated),
                })
            })
            .clone()
    }
}

#[derive(Clone, Default)]
pub struct RecordingFactory {
    shared: Arc<RecordingShared>,
}

impl RecordingFactory {
    pub fn new(scenario: Scenario) -> Self {
        let factory = Self::default();
        *factory.shared.scenario.lock() = scenario;
        factory
    }

    pub fn update_scenario(&self, update: impl FnOnce(&mut Scenario)) {
        update(&mut *self.shared.scenario.lock());
    }

    pub fn gates(&self, pipe: PipeId) -> Arc<PipeGates> {
        self.shared.gates(pipe)
    }

    pub fn records(&self) -> Vec<Record> {
        self.shared.records.lock().clone()
    }

    pub fn records_of(&self, node: NodeKey) -> Vec<Record> {
        self.records()
            .into_iter()
            .filter(|record| match record {
                Record::ConfigInit(key)
                | Record::ConfigExit(key)
                | Record::FrameStart(key, _)
                | Record::FrameDrawFinish(key, _)
                | Record::FrameTasksFinish(key, _)
                | Record::FrameFinish(key, _)
                | Record::BarrierPassed(key, _)
                | Record::Error(key, _) => *key == node,
                Record::ImagesReceived { node: key, .. } => *key == node,
                Record::Draw(..) | Record::Tasks(..) => false,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<(NodeKey, String)> {
        self.records()
            .into_iter()
            .filter_map(|record| match record {
                Record::Error(node, error) => Some((node, error)),
                _ => None,
            })
            .collect()
    }
}

impl NodeFactory for RecordingFactory {
    fn create_hooks(&self, node: NodeKey) -> Box<dyn NodeHooks> {
        Box::new(RecordingHooks {
            node,
            shared: self.shared.clone(),
        })
    }

    fn create_renderer(&self, _node: NodeKey, pipe: PipeId) -> Box<dyn PipeRenderer> {
        Box::new(RecordingRenderer {
            gates: self.shared.gates(pipe),
            shared: self.shared.clone(),
        })
    }
}

struct RecordingRenderer {
    gates: Arc<PipeGates>,
    shared: Arc<RecordingShared>,
}

impl PipeRenderer for RecordingRenderer {
    fn draw(&mut self, pipe: PipeId, frame_number: FrameNumber) {
        self.gates.draw.pass(frame_number);
        self.shared.record(Record::Draw(pipe, frame_number));
    }

    fn tasks(&mut self, pipe: PipeId, frame_number: FrameNumber) {
        self.gates.tasks.pass(frame_number);
        self.shared.record(Record::Tasks(pipe, frame_number));
    }
}

struct RecordingHooks {
    node: NodeKey,
    shared: Arc<RecordingShared>,
}

impl RecordingHooks {
    fn report<E: ToString>(&self, result: Result<(), E>) {
        if let Err(error) = result {
            self.shared.record(Record::Error(self.node, error.to_string()));
        }
    }
}

impl NodeHooks for RecordingHooks {
    fn config_init(&mut self, _node: &mut Node, _init_id: InitId) -> Result<(), String> {
        self.shared.record(Record::ConfigInit(self.node));
        if self.shared.scenario().fail_init.contains(&self.node) {
            return Err(format!("{} refuses to initialize", self.node));
        }
        Ok(())
    }

    fn config_exit(&mut self, _node: &mut Node) -> bool {
        self.shared.record(Record::ConfigExit(self.node));
        true
    }

    fn frame_start(&mut self, node: &mut Node, _frame_id: FrameId, frame_number: FrameNumber) {
        self.shared.record(Record::FrameStart(self.node, frame_number));

        if let Some(plan) = self.shared.scenario().frame_data {
            if self.node == plan.source || self.node == plan.target_node {
                let mapped = node.get_frame_data(plan.data).map(|_| ());
                self.report(mapped);
            }
        }
    }

    fn frame_draw_finish(&mut self, node: &mut Node, _frame_id: FrameId, frame_number: FrameNumber) {
        self.shared
            .record(Record::FrameDrawFinish(self.node, frame_number));

        if let Some(barrier) = self.shared.scenario().barrier {
            let passed = node
                .get_barrier(barrier)
                .map_err(|error| error.to_string())
                .and_then(|barrier| {
                    barrier
                        .sync_timeout(frame_number, HOOK_TIMEOUT)
                        .map_err(|error| error.to_string())
                });
            match passed {
                Ok(()) => self
                    .shared
                    .record(Record::BarrierPassed(self.node, frame_number)),
                Err(error) => self.shared.record(Record::Error(self.node, error)),
            }
        }
    }

    fn frame_tasks_finish(
        &mut self,
        node: &mut Node,
        _frame_id: FrameId,
        frame_number: FrameNumber,
    ) {
        self.shared
            .record(Record::FrameTasksFinish(self.node, frame_number));

        let Some(plan) = self.shared.scenario().frame_data else {
            return;
        };
        if self.node != plan.source || frame_number < 2 {
            return;
        }
        let sent = node.get_frame_data(plan.data).and_then(|data| {
            data.clear_images();
            data.add_image(Image::new(
                [0, 0, 4, 4],
                FrameDataState::BUFFER_COLOR,
                vec![frame_number as u8; 64],
            ));
            node.transmit_frame_data(data.id(), plan.target, frame_number)
        });
        self.report(sent);
    }

    fn frame_finish(
        &mut self,
        node: &mut Node,
        _frame_id: FrameId,
        frame_number: FrameNumber,
    ) -> FrameRelease {
        self.shared.record(Record::FrameFinish(self.node, frame_number));
        let scenario = self.shared.scenario();

        if let Some(plan) = &scenario.frame_data {
            if self.node == plan.target_node && frame_number >= 2 {
                let received = node
                    .get_frame_data(plan.data)
                    .map_err(|error| error.to_string())
                    .and_then(|data| {
                        data.wait_ready(frame_number, HOOK_TIMEOUT)
                            .map_err(|error| error.to_string())
                    });
                match received {
                    Ok(images) => self.shared.record(Record::ImagesReceived {
                        node: self.node,
                        frame_number,
                        images: images.len(),
                    }),
                    Err(error) => self.shared.record(Record::Error(self.node, error)),
                }
            }
        }

        if scenario.hold_release.contains(&self.node) {
            FrameRelease::Hold
        } else {
            FrameRelease::Release
        }
    }
}
