use super::*;

pub const IDS: &[(PacketKind, i32)] = packet_ids!(
    0x00 => Handshake

    0x00 => LoginStart
    0x01 => EncryptionResponse
    0x00 => LoginDisconnect
    0x01 => EncryptionRequest
    0x02 => LoginSuccess
    0x03 => SetInitialCompression

    0x00 => TeleportConfirm
    0x02 => ChatMessage
    0x03 => ClientStatus
    0x05 => ConfirmTransactionServerbound
    0x0b => KeepAliveServerbound
    0x0e => PlayerPositionLook
    0x1a => HeldItemChange

    0x05 => SpawnPlayer
    0x0b => BlockChange
    0x0f => ServerMessage
    0x10 => MultiBlockChange
    0x11 => ConfirmTransaction
    0x1a => Disconnect
    0x1d => ChunkUnload
    0x1e => ChangeGameState
    0x1f => KeepAliveClientbound
    0x20 => ChunkData
    0x23 => JoinGame
    0x2f => TeleportPlayer
    0x32 => EntityDestroy
    0x35 => Respawn
    0x41 => UpdateHealth
    0x47 => TimeUpdate
    0x00 => SpawnObject
    0x03 => SpawnMob
    0x26 => EntityMove
    0x27 => EntityLookAndMove
    0x28 => EntityLook
    0x2e => PlayerInfo
    0x40 => SetExperience
    0x4c => EntityTeleport
);

pub const MOD_IDS: &[(PacketKind, i32)] = packet_ids!(
    0x09 => PluginMessageServerbound
    0x18 => PluginMessageClientbound
);

pub const REMOVED: &[PacketKind] = &[];
