use super::*;

pub const IDS: &[(PacketKind, i32)] = packet_ids!(
    0x05 => ChatMessage
    0x07 => ClientStatus
    0x12 => KeepAliveServerbound
    0x15 => PlayerPositionLook
    0x28 => HeldItemChange

    0x40 => MultiBlockChange
    0x19 => Disconnect
    0x1c => ChunkUnload
    0x1d => ChangeGameState
    0x20 => KeepAliveClientbound
    0x21 => ChunkData
    0x25 => JoinGame
    0x39 => TeleportPlayer
    0x3b => EntityDestroy
    0x3e => Respawn
    0x55 => UpdateHealth
    0x5c => TimeUpdate
    0x62 => SystemChatMessage
    0x28 => EntityMove
    0x29 => EntityLookAndMove
    0x2a => EntityLook
    0x33 => PlayerChatMessage
    0x37 => PlayerInfo
    0x54 => SetExperience
    0x66 => EntityTeleport
);

pub const MOD_IDS: &[(PacketKind, i32)] = packet_ids!(
    0x0d => PluginMessageServerbound
    0x16 => PluginMessageClientbound
);

pub const REMOVED: &[PacketKind] = &[];
