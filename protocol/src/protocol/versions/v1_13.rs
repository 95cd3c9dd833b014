use super::*;

pub const IDS: &[(PacketKind, i32)] = packet_ids!(
    0x02 => LoginPluginResponse
    0x04 => LoginPluginRequest

    0x06 => ConfirmTransactionServerbound
    0x0e => KeepAliveServerbound
    0x11 => PlayerPositionLook
    0x21 => HeldItemChange

    0x0e => ServerMessage
    0x0f => MultiBlockChange
    0x12 => ConfirmTransaction
    0x1b => Disconnect
    0x1f => ChunkUnload
    0x20 => ChangeGameState
    0x21 => KeepAliveClientbound
    0x22 => ChunkData
    0x25 => JoinGame
    0x32 => TeleportPlayer
    0x35 => EntityDestroy
    0x38 => Respawn
    0x44 => UpdateHealth
    0x4a => TimeUpdate
    0x28 => EntityMove
    0x29 => EntityLookAndMove
    0x2a => EntityLook
    0x30 => PlayerInfo
    0x43 => SetExperience
    0x50 => EntityTeleport
);

pub const MOD_IDS: &[(PacketKind, i32)] = packet_ids!(
    0x0a => PluginMessageServerbound
    0x19 => PluginMessageClientbound
);

pub const REMOVED: &[PacketKind] = &[];
