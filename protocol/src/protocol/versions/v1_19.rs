use super::*;

pub const IDS: &[(PacketKind, i32)] = packet_ids!(
    0x04 => ChatMessage
    0x06 => ClientStatus
    0x11 => KeepAliveServerbound
    0x14 => PlayerPositionLook
    0x27 => HeldItemChange

    0x02 => SpawnPlayer
    0x09 => BlockChange
    0x3d => MultiBlockChange
    0x17 => Disconnect
    0x1a => ChunkUnload
    0x1b => ChangeGameState
    0x1e => KeepAliveClientbound
    0x1f => ChunkData
    0x23 => JoinGame
    0x36 => TeleportPlayer
    0x38 => EntityDestroy
    0x3b => Respawn
    0x5f => SystemChatMessage
    0x26 => EntityMove
    0x27 => EntityLookAndMove
    0x28 => EntityLook
    0x30 => PlayerChatMessage
    0x34 => PlayerInfo
    0x63 => EntityTeleport
);

pub const MOD_IDS: &[(PacketKind, i32)] = packet_ids!(
    0x0c => PluginMessageServerbound
    0x15 => PluginMessageClientbound
);

// Chat is split into signed player chat and system chat, and mobs spawn
// through SpawnObject.
pub const REMOVED: &[PacketKind] = &[PacketKind::ServerMessage, PacketKind::SpawnMob];
