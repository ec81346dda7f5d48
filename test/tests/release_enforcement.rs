use std::collections::HashSet;

use lockstep_client::{Client, ClientConfig, NodeConfig};
use lockstep_server::{
    ConfigDescription, NodeDescription, PipeDescription, Server, ServerConfig,
};
use lockstep_shared::{LocalNetwork, NodeKey, PipeId, ThreadModel};
use lockstep_test::{local_address, ClusterBuilder, RecordingFactory, Scenario, SERVER_PORT, WAIT_TIMEOUT};

#[test]
fn held_release_is_enforced_at_frame_finish() {
    env_logger::builder().is_test(true).try_init().ok();

    let held = NodeKey::new(1);
    let released = NodeKey::new(2);
    let scenario = Scenario {
        hold_release: HashSet::from([held]),
        ..Scenario::default()
    };
    let mut cluster = ClusterBuilder::new()
        .node(1, Some(ThreadModel::DrawSync))
        .node(2, Some(ThreadModel::DrawSync))
        .scenario(scenario)
        .build()
        .expect("build cluster");

    cluster.init().expect("init");
    for frame in 1..=3 {
        cluster.run_frame(frame).expect("run frame");
    }

    let held_counters = cluster.counters(held).expect("held counters");
    let released_counters = cluster.counters(released).expect("released counters");
    assert_eq!(held_counters.progress(), released_counters.progress());
    assert_eq!(held_counters.finished(), 3);
    assert_eq!(held_counters.enforced_releases(), 3);
    assert_eq!(released_counters.enforced_releases(), 0);

    let proxy = cluster.server.node(held).expect("held proxy");
    assert_eq!(proxy.finished_frame(), 3);
}

#[test]
fn global_finish_waits_for_every_node_of_the_process() {
    env_logger::builder().is_test(true).try_init().ok();

    let network = LocalNetwork::new();
    let process = local_address(6100);
    let factory = RecordingFactory::default();

    let description = ConfigDescription::new()
        .with_node(
            NodeDescription::new(NodeKey::new(1), "left", process)
                .with_thread_model(ThreadModel::Async)
                .with_pipe(PipeDescription::new(PipeId::new(11))),
        )
        .with_node(
            NodeDescription::new(NodeKey::new(2), "right", process)
                .with_thread_model(ThreadModel::LocalSync)
                .with_pipe(PipeDescription::new(PipeId::new(21)).threaded(false)),
        );

    let (sender, receiver) = network.bind(process).expect("bind process");
    let client_config = ClientConfig {
        node: NodeConfig {
            factory: std::sync::Arc::new(factory.clone()),
            ..NodeConfig::default()
        },
        ..ClientConfig::default()
    };
    let mut client = Client::new(client_config, sender, receiver).expect("client");
    client.create_node(NodeKey::new(1)).expect("node 1");
    client.create_node(NodeKey::new(2)).expect("node 2");

    let (sender, receiver) = network.bind(local_address(SERVER_PORT)).expect("bind server");
    let server_config = ServerConfig {
        sync_global_finish: true,
        ..ServerConfig::default()
    };
    let mut server = Server::new(server_config, description, sender, receiver).expect("server");

    server.init(7).expect("init");
    server.wait_initialized(WAIT_TIMEOUT).expect("initialized");
    for frame in 1..=4 {
        let frame_number = server.run_frame(frame).expect("run frame");
        server
            .wait_frame_finished(frame_number, WAIT_TIMEOUT)
            .expect("frame finished");
        assert_eq!(client.config().finished_frame(), frame_number);
    }

    server.exit().expect("exit");
    server.wait_exited(WAIT_TIMEOUT).expect("exited");
    assert!(factory.errors().is_empty());
}
