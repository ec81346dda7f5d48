use std::sync::Arc;

use lockstep_client::FrameCounters;
use lockstep_shared::{NodeKey, PipeId, ThreadModel};
use lockstep_test::{settle, wait_for, Cluster, ClusterBuilder, PipeGates, Record, Scenario, WAIT_TIMEOUT};

const NODE: NodeKey = NodeKey::new(1);
const PIPE: PipeId = PipeId::new(11);

fn gated_cluster(thread_model: Option<ThreadModel>) -> (Cluster, Arc<FrameCounters>, Arc<PipeGates>) {
    env_logger::builder().is_test(true).try_init().ok();

    let mut scenario = Scenario::default();
    scenario.gated_pipes.insert(PIPE);
    let mut cluster = ClusterBuilder::new()
        .node(1, thread_model)
        .scenario(scenario)
        .build()
        .expect("build cluster");
    cluster.init().expect("init");

    let counters = cluster.counters(NODE).expect("node counters");
    let gates = cluster.factory.gates(PIPE);
    (cluster, counters, gates)
}

/// Lets the pipe complete frame 1 and sends the remaining stages
fn complete_frame(cluster: &mut Cluster, gates: &PipeGates) {
    gates.draw.open(1);
    gates.tasks.open(1);
    cluster.server.tasks_finish().expect("tasks finish");
    cluster.server.finish_frame().expect("finish");
    cluster
        .server
        .wait_frame_finished(1, WAIT_TIMEOUT)
        .expect("frame finished");
}

#[test]
fn async_unlocks_at_frame_start() {
    let (mut cluster, counters, gates) = gated_cluster(Some(ThreadModel::Async));

    cluster.server.start_frame(1).expect("start");
    assert!(wait_for(WAIT_TIMEOUT, || counters.unlocked() == 1));
    assert!(!cluster.factory.records().contains(&Record::Draw(PIPE, 1)));

    cluster.server.draw_finish().expect("draw finish");
    complete_frame(&mut cluster, &gates);
    assert_eq!(counters.enforced_releases(), 0);
}

#[test]
fn draw_sync_unlocks_once_pipes_have_drawn() {
    let (mut cluster, counters, gates) = gated_cluster(Some(ThreadModel::DrawSync));

    cluster.server.start_frame(1).expect("start");
    cluster.server.draw_finish().expect("draw finish");
    settle();
    assert_eq!(counters.unlocked(), 0);

    gates.draw.open(1);
    assert!(wait_for(WAIT_TIMEOUT, || counters.unlocked() == 1));
    // the pipe is still inside its tasks
    assert!(!cluster.factory.records().contains(&Record::Tasks(PIPE, 1)));

    complete_frame(&mut cluster, &gates);
    assert_eq!(counters.enforced_releases(), 0);
}

#[test]
fn local_sync_unlocks_once_pipes_have_finished() {
    let (mut cluster, counters, gates) = gated_cluster(Some(ThreadModel::LocalSync));

    cluster.server.start_frame(1).expect("start");
    cluster.server.draw_finish().expect("draw finish");
    gates.draw.open(1);
    assert!(wait_for(WAIT_TIMEOUT, || cluster
        .factory
        .records()
        .contains(&Record::Draw(PIPE, 1))));
    cluster.server.tasks_finish().expect("tasks finish");
    settle();
    assert_eq!(counters.unlocked(), 0);

    gates.tasks.open(1);
    assert!(wait_for(WAIT_TIMEOUT, || counters.unlocked() == 1));

    cluster.server.finish_frame().expect("finish");
    cluster
        .server
        .wait_frame_finished(1, WAIT_TIMEOUT)
        .expect("frame finished");
    assert_eq!(counters.enforced_releases(), 0);
}

#[test]
fn undefined_thread_model_behaves_like_draw_sync() {
    let (mut cluster, counters, gates) = gated_cluster(None);

    cluster.server.start_frame(1).expect("start");
    settle();
    assert_eq!(counters.unlocked(), 0);

    cluster.server.draw_finish().expect("draw finish");
    gates.draw.open(1);
    assert!(wait_for(WAIT_TIMEOUT, || counters.unlocked() == 1));

    complete_frame(&mut cluster, &gates);
}
