use std::{net::SocketAddr, sync::Arc};

use lockstep_shared::{
    Command, CommandDispatcher, CommandHandlers, CommandId, CommandQueue, CommandTarget,
    DispatchError, NodeFrameStartPacket, NodeKey, Packet, PacketError, QueueItem,
};

fn source() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9000))
}

fn start_packet() -> Vec<u8> {
    NodeFrameStartPacket {
        node_id: NodeKey::new(1),
        frame_id: 1,
        frame_number: 1,
    }
    .encode()
}

// ========== Routing ==========

#[test]
fn test_unknown_command_closes_connection() {
    let dispatcher = CommandDispatcher::new();

    let error = dispatcher.dispatch_packet(source(), &start_packet()).unwrap_err();
    assert!(error.is_protocol_violation());
    assert!(format!("{}", error).contains("FrameStart"));
}

#[test]
fn test_garbage_packet_is_a_protocol_violation() {
    let dispatcher = CommandDispatcher::new();

    let error = dispatcher.dispatch_packet(source(), &[1, 2, 3]).unwrap_err();
    assert!(matches!(
        error,
        DispatchError::Packet(PacketError::HeaderTooShort { .. })
    ));
    assert!(error.is_protocol_violation());
}

#[test]
fn test_closed_queue_rejects_commands() {
    let dispatcher = CommandDispatcher::new();
    let queue = CommandQueue::new("node");
    dispatcher.register_queue(CommandId::FrameStart, &queue).unwrap();

    queue.close();
    let error = dispatcher.dispatch_packet(source(), &start_packet()).unwrap_err();

    assert_eq!(
        error,
        DispatchError::QueueClosed {
            command: CommandId::FrameStart
        }
    );
    assert!(!error.is_protocol_violation());
    assert!(matches!(queue.pop(), QueueItem::Close));
}

#[test]
fn test_failed_receiver_handler_reports_violation() {
    let dispatcher = CommandDispatcher::new();
    dispatcher
        .register_handler(
            CommandId::FrameStart,
            CommandTarget::Receiver(Arc::new(|command: Command| {
                Err(DispatchError::HandlerFailed {
                    command: command.command(),
                    reason: "bad delta".to_string(),
                    protocol_violation: true,
                })
            })),
        )
        .unwrap();

    let error = dispatcher.dispatch_packet(source(), &start_packet()).unwrap_err();
    assert!(error.is_protocol_violation());
}

// ========== Handler tables ==========

#[test]
fn test_handler_table_rejects_missing_function() {
    let handlers: CommandHandlers<Vec<u32>, DispatchError> = CommandHandlers::new();
    let command = Command::parse(source(), &start_packet()).unwrap();

    let mut target = Vec::new();
    assert_eq!(
        handlers.invoke(&mut target, command),
        Err(DispatchError::NoHandlerFunction {
            command: CommandId::FrameStart
        })
    );
}

#[test]
fn test_handler_table_rejects_double_registration() {
    let mut handlers: CommandHandlers<Vec<u32>, DispatchError> = CommandHandlers::new();
    handlers
        .register(CommandId::FrameStart, |_, _| Ok(()))
        .unwrap();

    assert_eq!(
        handlers.register(CommandId::FrameStart, |_, _| Ok(())),
        Err(DispatchError::AlreadyRegistered {
            command: CommandId::FrameStart
        })
    );
}

#[test]
fn test_command_decodes_only_its_own_packet_type() {
    let command = Command::parse(source(), &start_packet()).unwrap();

    let result = command.packet::<lockstep_shared::NodeFrameFinishReplyPacket>();
    assert!(matches!(result, Err(PacketError::WrongPacketType { .. })));
}
