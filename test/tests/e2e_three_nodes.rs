//! Three nodes, one per thread model, run five frames end to end.
//! This binary holds a single test because it installs the process-wide
//! capturing logger.

use lockstep_client::FrameProgress;
use lockstep_server::{ExitEvent, FrameFinishedEvent, InitEvent};
use lockstep_shared::{NodeKey, ThreadModel};
use lockstep_test::{log_capture, ClusterBuilder, Record};

#[test]
fn three_nodes_with_mixed_thread_models_finish_five_frames_quietly() {
    assert!(log_capture::install());

    let nodes = [NodeKey::new(1), NodeKey::new(2), NodeKey::new(3)];
    let mut cluster = ClusterBuilder::new()
        .node(1, Some(ThreadModel::Async))
        .node(2, Some(ThreadModel::DrawSync))
        .node(3, Some(ThreadModel::LocalSync))
        .build()
        .expect("build cluster");

    cluster.init().expect("init");
    for frame in 1..=5 {
        assert_eq!(cluster.run_frame(frame * 100).expect("run frame"), frame);
    }

    // ========== Watermarks ==========
    for node in nodes {
        let counters = cluster.counters(node).expect("node counters");
        assert_eq!(
            counters.progress(),
            FrameProgress {
                current: 5,
                unlocked: 5,
                finished: 5,
                local_notifications: 5,
                finish_notifications: 5,
            },
            "{}",
            node
        );
        assert_eq!(counters.enforced_releases(), 0, "{}", node);
    }
    assert_eq!(cluster.server.finished_frame(), 5);

    // ========== Stage order ==========
    for node in nodes {
        let mut expected = vec![Record::ConfigInit(node)];
        for frame in 1..=5 {
            expected.push(Record::FrameStart(node, frame));
            expected.push(Record::FrameDrawFinish(node, frame));
            expected.push(Record::FrameTasksFinish(node, frame));
            expected.push(Record::FrameFinish(node, frame));
        }
        assert_eq!(cluster.factory.records_of(node), expected);
    }

    // ========== Events ==========
    let mut events = cluster.server.receive();
    let inits: Vec<_> = events.read::<InitEvent>().collect();
    assert_eq!(inits.len(), 3);
    assert!(inits.iter().all(|(_, result)| result.is_ok()));
    assert_eq!(events.read::<FrameFinishedEvent>().count(), 15);

    cluster.exit().expect("exit");
    let mut events = cluster.server.receive();
    assert!(events.read::<ExitEvent>().all(|(_, result)| result));

    let captured = log_capture::captured();
    assert!(captured.is_empty(), "unexpected log output: {:?}", captured);
}
