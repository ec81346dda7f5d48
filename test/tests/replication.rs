use lockstep_shared::{FrameDataState, NodeKey, ThreadModel};
use lockstep_test::{node_address, ClusterBuilder, FrameDataPlan, Record};

#[test]
fn barrier_is_passed_by_every_node_each_frame() {
    env_logger::builder().is_test(true).try_init().ok();

    let mut cluster = ClusterBuilder::new()
        .node(1, Some(ThreadModel::Async))
        .node(2, Some(ThreadModel::DrawSync))
        .node(3, Some(ThreadModel::LocalSync))
        .build()
        .expect("build cluster");

    let barrier = cluster.server.create_barrier(3).expect("barrier");
    let barrier_version = barrier.object_version();
    cluster
        .factory
        .update_scenario(|scenario| scenario.barrier = Some(barrier_version));

    cluster.init().expect("init");
    for frame in 1..=3 {
        cluster.run_frame(frame).expect("run frame");
    }

    assert!(cluster.factory.errors().is_empty(), "{:?}", cluster.factory.errors());
    for node in [1, 2, 3].map(NodeKey::new) {
        let passed: Vec<_> = cluster
            .factory
            .records_of(node)
            .into_iter()
            .filter(|record| matches!(record, Record::BarrierPassed(..)))
            .collect();
        assert_eq!(
            passed,
            (1..=3).map(|frame| Record::BarrierPassed(node, frame)).collect::<Vec<_>>()
        );
    }
    assert_eq!(barrier.released_version(), 3);
}

#[test]
fn barrier_is_mapped_again_after_exit_and_init() {
    env_logger::builder().is_test(true).try_init().ok();

    let nodes = [NodeKey::new(1), NodeKey::new(2)];
    let mut cluster = ClusterBuilder::new()
        .node(1, Some(ThreadModel::DrawSync))
        .node(2, Some(ThreadModel::LocalSync))
        .build()
        .expect("build cluster");

    let barrier = cluster.server.create_barrier(2).expect("barrier");
    let first_version = barrier.object_version();
    cluster
        .factory
        .update_scenario(|scenario| scenario.barrier = Some(first_version));

    cluster.init().expect("init");
    for frame in 1..=2 {
        cluster.run_frame(frame).expect("run frame");
    }
    cluster.exit().expect("exit");
    assert!(cluster.server.session().subscribers(barrier.id()).is_empty());

    // committed while no process follows the barrier
    barrier.set_height(2).expect("set height");
    assert_eq!(barrier.commit(cluster.server.session()).expect("commit"), 2);
    let second_version = barrier.object_version();
    cluster
        .factory
        .update_scenario(|scenario| scenario.barrier = Some(second_version));

    cluster.init().expect("init again");
    for frame in 3..=4 {
        cluster.run_frame(frame).expect("run frame");
    }

    assert!(cluster.factory.errors().is_empty(), "{:?}", cluster.factory.errors());
    for node in nodes {
        let passed = cluster
            .factory
            .records_of(node)
            .into_iter()
            .filter(|record| matches!(record, Record::BarrierPassed(..)))
            .count();
        assert_eq!(passed, 4, "{}", node);
    }
    assert_eq!(cluster.server.session().subscribers(barrier.id()).len(), 2);
}

fn run_frame_data_transfer(cluster_builder: ClusterBuilder) {
    let source = NodeKey::new(1);
    let target = NodeKey::new(2);
    let mut cluster = cluster_builder
        .node(1, Some(ThreadModel::DrawSync))
        .node(2, Some(ThreadModel::DrawSync))
        .build()
        .expect("build cluster");

    let master = cluster
        .server
        .register_master(FrameDataState::default())
        .expect("frame data master");
    let plan = FrameDataPlan {
        data: master.object_version(),
        source,
        target_node: target,
        target: node_address(target),
    };
    cluster
        .factory
        .update_scenario(|scenario| scenario.frame_data = Some(plan));

    cluster.init().expect("init");
    for frame in 1..=3 {
        cluster.run_frame(frame).expect("run frame");
    }

    assert!(cluster.factory.errors().is_empty(), "{:?}", cluster.factory.errors());
    let received: Vec<_> = cluster
        .factory
        .records_of(target)
        .into_iter()
        .filter(|record| matches!(record, Record::ImagesReceived { .. }))
        .collect();
    assert_eq!(
        received,
        (2..=3)
            .map(|frame_number| Record::ImagesReceived {
                node: target,
                frame_number,
                images: 1,
            })
            .collect::<Vec<_>>()
    );
}

#[test]
fn frame_data_reaches_the_target_node() {
    env_logger::builder().is_test(true).try_init().ok();
    run_frame_data_transfer(ClusterBuilder::new());
}

#[cfg(feature = "zstd_support")]
#[test]
fn compressed_frame_data_reaches_the_target_node() {
    use lockstep_shared::{CompressionConfig, CompressionMode};

    env_logger::builder().is_test(true).try_init().ok();
    let compression = CompressionConfig::new(Some(CompressionMode::Default(3)));
    run_frame_data_transfer(ClusterBuilder::new().compression(compression));
}
