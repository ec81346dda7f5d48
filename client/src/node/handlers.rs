use log::{debug, warn};

use lockstep_shared::{
    Command, CommandHandlers, CommandId, DispatchError, FrameStage, NodeConfigExitPacket,
    NodeConfigExitReplyPacket, NodeConfigInitPacket, NodeConfigInitReplyPacket,
    NodeCreatePipePacket, NodeDestroyPipePacket, NodeFrameDrawFinishPacket,
    NodeFrameFinishPacket, NodeFrameStartPacket, NodeFrameTasksFinishPacket, NodeKey, Packet,
    PacketError,
};

use crate::{error::NodeError, factory::FrameRelease, node_thread::NodeWorker};

/// Commands executed by a node thread
pub const NODE_COMMANDS: [CommandId; 8] = [
    CommandId::CreatePipe,
    CommandId::DestroyPipe,
    CommandId::ConfigInit,
    CommandId::ConfigExit,
    CommandId::FrameStart,
    CommandId::FrameDrawFinish,
    CommandId::FrameTasksFinish,
    CommandId::FrameFinish,
];

/// Decodes a node command completely and returns the node it is addressed
/// to. Malformed payloads never reach a node thread.
pub(crate) fn addressed_node(command: &Command) -> Result<NodeKey, PacketError> {
    let node = match command.command() {
        CommandId::CreatePipe => command.packet::<NodeCreatePipePacket>()?.node_id,
        CommandId::DestroyPipe => command.packet::<NodeDestroyPipePacket>()?.node_id,
        CommandId::ConfigInit => command.packet::<NodeConfigInitPacket>()?.node_id,
        CommandId::ConfigExit => command.packet::<NodeConfigExitPacket>()?.node_id,
        CommandId::FrameStart => command.packet::<NodeFrameStartPacket>()?.node_id,
        CommandId::FrameDrawFinish => command.packet::<NodeFrameDrawFinishPacket>()?.node_id,
        CommandId::FrameTasksFinish => command.packet::<NodeFrameTasksFinishPacket>()?.node_id,
        CommandId::FrameFinish => command.packet::<NodeFrameFinishPacket>()?.node_id,
        other => {
            return Err(PacketError::WrongPacketType {
                expected: CommandId::FrameStart,
                actual: other,
            })
        }
    };
    Ok(node)
}

pub(crate) fn node_handlers() -> Result<CommandHandlers<NodeWorker, NodeError>, DispatchError> {
    let mut handlers = CommandHandlers::new();
    handlers.register(CommandId::CreatePipe, create_pipe)?;
    handlers.register(CommandId::DestroyPipe, destroy_pipe)?;
    handlers.register(CommandId::ConfigInit, config_init)?;
    handlers.register(CommandId::ConfigExit, config_exit)?;
    handlers.register(CommandId::FrameStart, frame_start)?;
    handlers.register(CommandId::FrameDrawFinish, frame_draw_finish)?;
    handlers.register(CommandId::FrameTasksFinish, frame_tasks_finish)?;
    handlers.register(CommandId::FrameFinish, frame_finish)?;
    Ok(handlers)
}

fn create_pipe(worker: &mut NodeWorker, command: Command) -> Result<(), NodeError> {
    let packet: NodeCreatePipePacket = command.packet()?;
    worker.node.set_server(command.source());
    worker.node.create_pipe(packet.pipe_id, packet.threaded)
}

fn destroy_pipe(worker: &mut NodeWorker, command: Command) -> Result<(), NodeError> {
    let packet: NodeDestroyPipePacket = command.packet()?;
    worker.node.destroy_pipe(packet.pipe_id)
}

/// Failures are reported in the reply, never raised
fn config_init(worker: &mut NodeWorker, command: Command) -> Result<(), NodeError> {
    let packet: NodeConfigInitPacket = command.packet()?;
    let NodeWorker { node, hooks } = worker;
    node.set_server(command.source());

    let outcome = node
        .init(packet.name.clone(), packet.tasks, packet.thread_model)
        .map_err(|error| error.to_string())
        .and_then(|()| hooks.config_init(node, packet.init_id));

    let reply = match outcome {
        Ok(()) => {
            node.mark_initialized(true);
            NodeConfigInitReplyPacket::new(&packet, true, String::new())
        }
        Err(error) => {
            warn!("{} failed to initialize: {}", node.key(), error);
            NodeConfigInitReplyPacket::new(&packet, false, error)
        }
    };
    node.session()
        .sender()
        .send(&command.source(), &reply.encode())?;
    Ok(())
}

fn config_exit(worker: &mut NodeWorker, command: Command) -> Result<(), NodeError> {
    let packet: NodeConfigExitPacket = command.packet()?;
    let NodeWorker { node, hooks } = worker;

    let result = hooks.config_exit(node);
    node.exit();

    let reply = NodeConfigExitReplyPacket::new(&packet, result);
    node.session()
        .sender()
        .send(&command.source(), &reply.encode())?;
    Ok(())
}

fn frame_start(worker: &mut NodeWorker, command: Command) -> Result<(), NodeError> {
    let packet: NodeFrameStartPacket = command.packet()?;
    let NodeWorker { node, hooks } = worker;

    node.start_frame(packet.frame_number)?;
    hooks.frame_start(node, packet.frame_id, packet.frame_number);
    node.apply_local_release(FrameStage::Start, packet.frame_number)
}

fn frame_draw_finish(worker: &mut NodeWorker, command: Command) -> Result<(), NodeError> {
    let packet: NodeFrameDrawFinishPacket = command.packet()?;
    let NodeWorker { node, hooks } = worker;

    hooks.frame_draw_finish(node, packet.frame_id, packet.frame_number);
    node.apply_local_release(FrameStage::DrawFinish, packet.frame_number)
}

fn frame_tasks_finish(worker: &mut NodeWorker, command: Command) -> Result<(), NodeError> {
    let packet: NodeFrameTasksFinishPacket = command.packet()?;
    let NodeWorker { node, hooks } = worker;

    hooks.frame_tasks_finish(node, packet.frame_id, packet.frame_number);
    node.apply_local_release(FrameStage::TasksFinish, packet.frame_number)
}

fn frame_finish(worker: &mut NodeWorker, command: Command) -> Result<(), NodeError> {
    let packet: NodeFrameFinishPacket = command.packet()?;
    let NodeWorker { node, hooks } = worker;
    let frame_number = packet.frame_number;

    node.wait_pipes_local(frame_number);
    node.wait_pipes_finished(frame_number);

    if hooks.frame_finish(node, packet.frame_id, frame_number) == FrameRelease::Release {
        node.release_frame(frame_number)?;
    }
    node.enforce_release(frame_number)?;

    if packet.sync_global_finish {
        debug!("{} waits for every node to finish frame {}", node.key(), frame_number);
        node.config().wait_frame_finished(frame_number);
    }
    Ok(())
}
