use super::*;

pub const IDS: &[(PacketKind, i32)] = packet_ids!(
    0x06 => ClientStatus
    0x11 => KeepAliveServerbound
    0x14 => PlayerPositionLook

    0x3f => MultiBlockChange
    0x17 => Disconnect
    0x1b => ChunkUnload
    0x1c => ChangeGameState
    0x1f => KeepAliveClientbound
    0x20 => ChunkData
    0x24 => JoinGame
    0x38 => TeleportPlayer
    0x3a => EntityDestroy
    0x3d => Respawn
    0x53 => UpdateHealth
    0x5a => TimeUpdate
    0x60 => SystemChatMessage
    0x27 => EntityMove
    0x28 => EntityLookAndMove
    0x29 => EntityLook
    0x31 => PlayerChatMessage
    0x35 => PlayerInfoRemove
    0x36 => PlayerInfoUpdate
    0x52 => SetExperience
    0x64 => EntityTeleport
);

pub const MOD_IDS: &[(PacketKind, i32)] = packet_ids!(
    0x0c => PluginMessageServerbound
    0x15 => PluginMessageClientbound
);

pub const REMOVED: &[PacketKind] = &[PacketKind::PlayerInfo];
