use super::*;

pub const IDS: &[(PacketKind, i32)] = packet_ids!(
    0x03 => ChatMessage
    0x04 => ClientStatus
    0x07 => ConfirmTransactionServerbound
    0x0f => KeepAliveServerbound
    0x12 => PlayerPositionLook
    0x23 => HeldItemChange

    0x1a => Disconnect
    0x1d => ChunkUnload
    0x1e => ChangeGameState
    0x20 => KeepAliveClientbound
    0x21 => ChunkData
    0x35 => TeleportPlayer
    0x37 => EntityDestroy
    0x3a => Respawn
    0x48 => UpdateHealth
    0x4e => TimeUpdate
    0x33 => PlayerInfo
    0x47 => SetExperience
    0x56 => EntityTeleport
);

pub const MOD_IDS: &[(PacketKind, i32)] = packet_ids!(
    0x0b => PluginMessageServerbound
    0x18 => PluginMessageClientbound
);

pub const REMOVED: &[PacketKind] = &[];
