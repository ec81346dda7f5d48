use std::collections::HashSet;

use lockstep_server::{DisconnectEvent, ErrorEvent, InitEvent, LockstepServerError, NodeState};
use lockstep_shared::{
    CommandId, NodeFrameFinishReplyPacket, NodeFrameStartPacket, NodeKey, Packet, PacketHeader,
    PacketWriter, Serde, ThreadModel,
};
use lockstep_test::{
    local_address, node_address, settle, wait_for, ClusterBuilder, Scenario, SERVER_PORT,
    WAIT_TIMEOUT,
};

#[test]
fn unknown_command_closes_the_peer() {
    env_logger::builder().is_test(true).try_init().ok();

    let mut cluster = ClusterBuilder::new()
        .node(1, Some(ThreadModel::DrawSync))
        .build()
        .expect("build cluster");
    cluster.init().expect("init");

    let rogue_address = local_address(7000);
    let (rogue, _rogue_receiver) = cluster.network.bind(rogue_address).expect("bind rogue");
    let server = local_address(SERVER_PORT);

    // frame commands only ever flow towards worker processes
    let start = NodeFrameStartPacket {
        node_id: NodeKey::new(1),
        frame_id: 1,
        frame_number: 1,
    };
    rogue.send(&server, &start.encode()).expect("send");

    assert!(wait_for(WAIT_TIMEOUT, || cluster
        .server
        .closed_peers()
        .contains(&rogue_address)));

    let mut events = cluster.server.receive();
    assert!(events.read::<ErrorEvent>().any(|error| matches!(
        error,
        LockstepServerError::ProtocolViolation { peer, .. } if peer == rogue_address
    )));
    let disconnections: Vec<_> = events.read::<DisconnectEvent>().collect();
    assert_eq!(disconnections, vec![(rogue_address, Vec::new())]);

    // nothing else from the closed peer is processed
    let reply = NodeFrameFinishReplyPacket {
        node_id: NodeKey::new(1),
        frame_number: 9,
    };
    rogue.send(&server, &reply.encode()).expect("send");
    settle();
    let proxy = cluster.server.node(NodeKey::new(1)).expect("proxy");
    assert_eq!(proxy.finished_frame(), 0);

    // the real node is unaffected
    assert_eq!(cluster.server.node_state(NodeKey::new(1)), Some(NodeState::Running));
    cluster.run_frame(1).expect("run frame");
}

#[test]
fn malformed_packet_closes_the_peer() {
    env_logger::builder().is_test(true).try_init().ok();

    let mut cluster = ClusterBuilder::new()
        .node(1, Some(ThreadModel::Async))
        .build()
        .expect("build cluster");

    let rogue_address = local_address(7001);
    let (rogue, _rogue_receiver) = cluster.network.bind(rogue_address).expect("bind rogue");

    // header claims more bytes than the packet carries
    let mut packet = NodeFrameFinishReplyPacket {
        node_id: NodeKey::new(1),
        frame_number: 1,
    }
    .encode();
    packet[4] = packet[4].wrapping_add(8);
    rogue
        .send(&local_address(SERVER_PORT), &packet)
        .expect("send");

    assert!(wait_for(WAIT_TIMEOUT, || cluster
        .server
        .closed_peers()
        .contains(&rogue_address)));
    assert!(cluster.server.receive().has::<ErrorEvent>());
}

#[test]
fn truncated_node_command_closes_the_peer_at_the_worker() {
    env_logger::builder().is_test(true).try_init().ok();

    let mut cluster = ClusterBuilder::new()
        .node(1, Some(ThreadModel::DrawSync))
        .build()
        .expect("build cluster");
    cluster.init().expect("init");

    let rogue_address = local_address(7003);
    let (rogue, _rogue_receiver) = cluster.network.bind(rogue_address).expect("bind rogue");

    // a consistent header, but FRAME_START without its frame id and number
    let mut writer = PacketWriter::new();
    PacketHeader::new(CommandId::FrameStart, (PacketHeader::SIZE + 4) as u32).write(&mut writer);
    NodeKey::new(1).ser(&mut writer);
    rogue
        .send(&node_address(NodeKey::new(1)), &writer.to_bytes())
        .expect("send");

    let client = cluster.client(NodeKey::new(1)).expect("client");
    assert!(wait_for(WAIT_TIMEOUT, || client
        .closed_peers()
        .contains(&rogue_address)));

    // the node never saw the command and keeps following the server
    let counters = cluster.counters(NodeKey::new(1)).expect("counters");
    assert_eq!(counters.current(), 0);
    cluster.run_frame(1).expect("run frame");
    assert_eq!(counters.finished(), 1);
}

#[test]
fn command_for_unknown_node_keeps_the_connection() {
    env_logger::builder().is_test(true).try_init().ok();

    let mut cluster = ClusterBuilder::new()
        .node(1, Some(ThreadModel::LocalSync))
        .build()
        .expect("build cluster");
    cluster.init().expect("init");

    let rogue_address = local_address(7002);
    let (rogue, _rogue_receiver) = cluster.network.bind(rogue_address).expect("bind rogue");
    let start = NodeFrameStartPacket {
        node_id: NodeKey::new(99),
        frame_id: 1,
        frame_number: 1,
    };
    rogue
        .send(&node_address(NodeKey::new(1)), &start.encode())
        .expect("send");
    settle();

    let client = cluster.client(NodeKey::new(1)).expect("client");
    assert!(client.closed_peers().is_empty());

    for frame in 1..=2 {
        cluster.run_frame(frame).expect("run frame");
    }
    let counters = cluster.counters(NodeKey::new(1)).expect("counters");
    assert_eq!(counters.finished(), 2);
}

#[test]
fn failed_init_is_reported() {
    env_logger::builder().is_test(true).try_init().ok();

    let failing = NodeKey::new(2);
    let scenario = Scenario {
        fail_init: HashSet::from([failing]),
        ..Scenario::default()
    };
    let mut cluster = ClusterBuilder::new()
        .node(1, Some(ThreadModel::DrawSync))
        .node(2, Some(ThreadModel::DrawSync))
        .scenario(scenario)
        .build()
        .expect("build cluster");

    cluster.server.init(3).expect("init");
    let error = cluster
        .server
        .wait_initialized(WAIT_TIMEOUT)
        .expect_err("node 2 refuses to initialize");
    match error {
        LockstepServerError::InitFailed { node, reason } => {
            assert_eq!(node, failing);
            assert!(reason.contains("refuses"), "{}", reason);
        }
        other => panic!("unexpected error: {}", other),
    }

    let mut events = cluster.server.receive();
    let inits: Vec<_> = events.read::<InitEvent>().collect();
    assert!(inits.contains(&(NodeKey::new(1), Ok(()))));
    assert!(inits
        .iter()
        .any(|(node, result)| *node == failing && result.is_err()));

    assert_eq!(cluster.server.node_state(failing), Some(NodeState::Failed));
    assert_eq!(cluster.server.running_nodes(), vec![NodeKey::new(1)]);

    // the healthy node keeps running frames on its own
    cluster.run_frame(1).expect("run frame");
    assert_eq!(cluster.counters(NodeKey::new(1)).expect("counters").finished(), 1);
}
