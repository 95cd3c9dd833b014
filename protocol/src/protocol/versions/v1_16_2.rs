use super::*;

pub const IDS: &[(PacketKind, i32)] = packet_ids!(
    0x3b => MultiBlockChange
    0x11 => ConfirmTransaction
    0x19 => Disconnect
    0x1c => ChunkUnload
    0x1d => ChangeGameState
    0x1f => KeepAliveClientbound
    0x20 => ChunkData
    0x24 => JoinGame
    0x34 => TeleportPlayer
    0x36 => EntityDestroy
    0x39 => Respawn
    0x27 => EntityMove
    0x28 => EntityLookAndMove
    0x29 => EntityLook
    0x32 => PlayerInfo
);

pub const MOD_IDS: &[(PacketKind, i32)] = &[];

pub const REMOVED: &[PacketKind] = &[];
