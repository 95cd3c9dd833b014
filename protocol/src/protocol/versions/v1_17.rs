use super::*;

pub const IDS: &[(PacketKind, i32)] = packet_ids!(
    0x0f => KeepAliveServerbound
    0x12 => PlayerPositionLook

    0x0c => BlockChange
    0x0f => ServerMessage
    0x3f => MultiBlockChange
    0x1a => Disconnect
    0x1d => ChunkUnload
    0x1e => ChangeGameState
    0x21 => KeepAliveClientbound
    0x22 => ChunkData
    0x26 => JoinGame
    0x38 => TeleportPlayer
    0x3a => EntityDestroy
    0x3d => Respawn
    0x52 => UpdateHealth
    0x58 => TimeUpdate
    0x29 => EntityMove
    0x2a => EntityLookAndMove
    0x2b => EntityLook
    0x36 => PlayerInfo
    0x51 => SetExperience
    0x61 => EntityTeleport
);

pub const MOD_IDS: &[(PacketKind, i32)] = packet_ids!(
    0x0a => PluginMessageServerbound
    0x18 => PluginMessageClientbound
);

// Window confirmations were replaced by ping/pong.
pub const REMOVED: &[PacketKind] = &[
    PacketKind::ConfirmTransaction,
    PacketKind::ConfirmTransactionServerbound,
];
