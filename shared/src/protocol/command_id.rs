/// Identifies the command a packet carries. The numeric values are part of
/// the wire contract and must never be reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u32)]
pub enum CommandId {
    // Node
    CreatePipe = 1,
    DestroyPipe = 2,
    ConfigInit = 3,
    ConfigInitReply = 4,
    ConfigExit = 5,
    ConfigExitReply = 6,
    FrameStart = 7,
    FrameFinish = 8,
    FrameDrawFinish = 9,
    FrameTasksFinish = 10,
    FrameFinishReply = 11,
    // Objects
    ObjectInstance = 20,
    ObjectDelta = 21,
    // Barrier
    BarrierEnter = 30,
    BarrierEnterReply = 31,
    // Frame data
    FrameDataTransmit = 40,
}

impl CommandId {
    pub const ALL: [CommandId; 16] = [
        CommandId::CreatePipe,
        CommandId::DestroyPipe,
        CommandId::ConfigInit,
        CommandId::ConfigInitReply,
        CommandId::ConfigExit,
        CommandId::ConfigExitReply,
        CommandId::FrameStart,
        CommandId::FrameFinish,
        CommandId::FrameDrawFinish,
        CommandId::FrameTasksFinish,
        CommandId::FrameFinishReply,
        CommandId::ObjectInstance,
        CommandId::ObjectDelta,
        CommandId::BarrierEnter,
        CommandId::BarrierEnterReply,
        CommandId::FrameDataTransmit,
    ];

    pub const fn to_u32(self) -> u32 {
        self as u32
    }

    pub fn from_u32(value: u32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|command| command.to_u32() == value)
    }

    /// Whether this command is a reply that correlates with an earlier request
    pub const fn is_reply(self) -> bool {
        matches!(
            self,
            CommandId::ConfigInitReply
                | CommandId::ConfigExitReply
                | CommandId::FrameFinishReply
                | CommandId::BarrierEnterReply
        )
    }
}
