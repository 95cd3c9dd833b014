use super::*;

pub const IDS: &[(PacketKind, i32)] = packet_ids!(
    0x0c => BlockChange
    0x0f => ServerMessage
    0x10 => MultiBlockChange
    0x13 => ConfirmTransaction
    0x1b => Disconnect
    0x1e => ChunkUnload
    0x1f => ChangeGameState
    0x21 => KeepAliveClientbound
    0x22 => ChunkData
    0x26 => JoinGame
    0x36 => TeleportPlayer
    0x38 => EntityDestroy
    0x3b => Respawn
    0x49 => UpdateHealth
    0x4f => TimeUpdate
    0x29 => EntityMove
    0x2a => EntityLookAndMove
    0x2b => EntityLook
    0x34 => PlayerInfo
    0x48 => SetExperience
    0x57 => EntityTeleport
);

pub const MOD_IDS: &[(PacketKind, i32)] = packet_ids!(
    0x19 => PluginMessageClientbound
);

pub const REMOVED: &[PacketKind] = &[];
