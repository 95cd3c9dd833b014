use super::*;

pub const IDS: &[(PacketKind, i32)] = packet_ids!(
    0x07 => ClientStatus
    0x12 => KeepAliveServerbound
    0x15 => PlayerPositionLook

    0x03 => SpawnPlayer
    0x0a => BlockChange
    0x43 => MultiBlockChange
    0x1a => Disconnect
    0x1e => ChunkUnload
    0x1f => ChangeGameState
    0x23 => KeepAliveClientbound
    0x24 => ChunkData
    0x28 => JoinGame
    0x3c => TeleportPlayer
    0x3e => EntityDestroy
    0x41 => Respawn
    0x57 => UpdateHealth
    0x5e => TimeUpdate
    0x64 => SystemChatMessage
    0x01 => SpawnObject
    0x2b => EntityMove
    0x2c => EntityLookAndMove
    0x2d => EntityLook
    0x35 => PlayerChatMessage
    0x39 => PlayerInfoRemove
    0x3a => PlayerInfoUpdate
    0x56 => SetExperience
    0x68 => EntityTeleport
);

pub const MOD_IDS: &[(PacketKind, i32)] = packet_ids!(
    0x0d => PluginMessageServerbound
    0x17 => PluginMessageClientbound
);

pub const REMOVED: &[PacketKind] = &[];
