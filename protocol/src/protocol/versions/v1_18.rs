use super::*;

pub const IDS: &[(PacketKind, i32)] = packet_ids!(
    0x59 => TimeUpdate
    0x62 => EntityTeleport
);

pub const MOD_IDS: &[(PacketKind, i32)] = &[];

pub const REMOVED: &[PacketKind] = &[];
