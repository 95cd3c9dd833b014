use super::*;

pub const IDS: &[(PacketKind, i32)] = packet_ids!(
    0x10 => KeepAliveServerbound
    0x13 => PlayerPositionLook
    0x25 => HeldItemChange

    0x04 => SpawnPlayer
    0x0b => BlockChange
    0x0e => ServerMessage
    0x0f => MultiBlockChange
    0x12 => ConfirmTransaction
    0x1a => Disconnect
    0x1d => ChunkUnload
    0x1e => ChangeGameState
    0x20 => KeepAliveClientbound
    0x21 => ChunkData
    0x25 => JoinGame
    0x35 => TeleportPlayer
    0x37 => EntityDestroy
    0x3a => Respawn
    0x4e => TimeUpdate
    0x02 => SpawnMob
    0x28 => EntityMove
    0x29 => EntityLookAndMove
    0x2a => EntityLook
    0x33 => PlayerInfo
    0x56 => EntityTeleport
);

pub const MOD_IDS: &[(PacketKind, i32)] = packet_ids!(
    0x17 => PluginMessageClientbound
);

pub const REMOVED: &[PacketKind] = &[];
