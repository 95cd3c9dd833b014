// Copyright 2016 Matthew Collins
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

state_packets!(
    handshake Handshaking {
        serverbound Serverbound {
            /// Handshake is the first packet sent in the protocol.
            /// Its used for deciding if the request is a client
            /// is requesting status information about the server
            /// (MOTD, players etc) or trying to login to the server.
            ///
            /// The host and port fields are not used by the vanilla
            /// server but are there for virtual server hosting to
            /// be able to redirect a client to a target server with
            /// a single address + port.
            ///
            /// Some modified servers/proxies use the handshake field
            /// differently, packing information into the field other
            /// than the hostname due to the protocol not providing
            /// any system for custom information to be transfered
            /// by the client to the server until after login.
            packet Handshake {
                /// The protocol version of the connecting client
                field protocol_version: VarInt,
                /// The hostname the client connected to
                field host: String,
                /// The port the client connected to
                field port: u16,
                /// The next protocol state the client wants
                field next: VarInt,
            }
        }
        clientbound Clientbound {
        }
    }
    login Login {
        serverbound Serverbound {
            /// LoginStart is sent immeditately after switching into the login
            /// state. The passed username is used by the server to authenticate
            /// the player in online mode.
            packet LoginStart {
                field username: String,
                field has_sig_data: bool = between(V1_19, V1_19_3),
                field timestamp: i64 = |p: &LoginStart, _| p.has_sig_data,
                field public_key: LenPrefixedBytes<VarInt> = |p: &LoginStart, _| p.has_sig_data,
                field signature: LenPrefixedBytes<VarInt> = |p: &LoginStart, _| p.has_sig_data,
                field has_uuid: bool = since(V1_19_2),
                field uuid: UUID = |p: &LoginStart, v| v >= V1_19_2 && p.has_uuid,
            }
            /// EncryptionResponse is sent as a reply to EncryptionRequest. All
            /// packets following this one must be encrypted with AES/CFB8
            /// encryption.
            packet EncryptionResponse {
                /// The key for the AES/CFB8 cipher encrypted with the
                /// public key
                field shared_secret: LenPrefixedBytes<VarInt>,
                field has_verify_token: bool = between(V1_19, V1_19_3),
                /// The verify token from the request encrypted with the
                /// public key
                field verify_token: LenPrefixedBytes<VarInt> = |p: &EncryptionResponse, v| !signed_login(v) || p.has_verify_token,
                field salt: i64 = |p: &EncryptionResponse, v| signed_login(v) && !p.has_verify_token,
                field message_signature: LenPrefixedBytes<VarInt> = |p: &EncryptionResponse, v| signed_login(v) && !p.has_verify_token,
            }
            packet LoginPluginResponse {
                field message_id: VarInt,
                field successful: bool,
                field data: Vec<u8> = |p: &LoginPluginResponse, _| p.successful,
            }
        }
        clientbound Clientbound {
            packet LoginDisconnect {
                field reason: format::Component,
            }
            /// EncryptionRequest is sent by the server if the server is in
            /// online mode. If it is not sent then its assumed the server is
            /// in offline mode.
            packet EncryptionRequest {
                /// Generally empty, left in from legacy auth
                /// but is still used by the client if provided
                field server_id: String,
                /// A RSA Public key serialized in x.509 PRIX format
                field public_key: LenPrefixedBytes<VarInt>,
                /// Token used by the server to verify encryption is working
                /// correctly
                field verify_token: LenPrefixedBytes<VarInt>,
            }
            packet LoginSuccess {
                field uuid_string: String = until(V1_16),
                field uuid: UUID = since(V1_16),
                field username: String,
                field properties: LenPrefixed<VarInt, ProfileProperty> = since(V1_19),
            }
            packet SetInitialCompression {
                /// Threshold where a packet should be sent compressed
                field threshold: VarInt,
            }
            packet LoginPluginRequest {
                field message_id: VarInt,
                field channel: String,
                field data: Vec<u8>,
            }
        }
    }
    play Play {
        serverbound Serverbound {
            /// TeleportConfirm is sent by the client as a reply to a telport from
            /// the server.
            packet TeleportConfirm {
                field teleport_id: VarInt,
            }
            /// ChatMessage is sent by the client when it sends a chat message or
            /// executes a command (prefixed by '/'). From 1.19 the message is
            /// sent unsigned.
            packet ChatMessage {
                field message: String,
                field timestamp: i64 = since(V1_19),
                field salt: i64 = since(V1_19),
                field signature: LenPrefixedBytes<VarInt> = between(V1_19, V1_19_3),
                field signed_preview: bool = between(V1_19, V1_19_3),
                field last_seen: LenPrefixed<VarInt, LastSeenMessage> = between(V1_19_2, V1_19_3),
                field has_last_received: bool = between(V1_19_2, V1_19_3),
                field last_received: LastSeenMessage = |p: &ChatMessage, v| v >= V1_19_2 && v < V1_19_3 && p.has_last_received,
                field has_signature: bool = since(V1_19_3),
                field message_count: VarInt = since(V1_19_3),
                field acknowledged: AcknowledgedBits = since(V1_19_3),
            }
            /// ClientStatus is sent to update the client's status; 0 requests a
            /// respawn after death.
            packet ClientStatus {
                field action_id: VarInt,
            }
            packet ConfirmTransactionServerbound {
                field id: u8,
                field action_number: i16,
                field accepted: bool,
            }
            /// PluginMessageServerbound is used for custom messages between the client
            /// and server. This is mainly for plugins/mods but vanilla has a few channels
            /// registered too.
            packet PluginMessageServerbound {
                field channel: String,
                field data: Vec<u8>,
            }
            /// KeepAliveServerbound is sent by a client as a response to a
            /// KeepAliveClientbound. If the client doesn't reply the server
            /// may disconnect the client.
            packet KeepAliveServerbound {
                field id: i64,
            }
            /// PlayerPositionLook is a combination of PlayerPosition and
            /// PlayerLook.
            packet PlayerPositionLook {
                field x: f64,
                field y: f64,
                field z: f64,
                field yaw: f32,
                field pitch: f32,
                field on_ground: bool,
            }
            /// HeldItemChange is sent when the player changes the currently active
            /// hotbar slot.
            packet HeldItemChange {
                field slot: i16,
            }
        }
        clientbound Clientbound {
            /// SpawnPlayer is used to spawn a player when they are in range of the client.
            /// This packet alone isn't enough to display the player as the skin and username
            /// information is in the player information packet.
            packet SpawnPlayer {
                field entity_id: VarInt,
                field uuid: UUID,
                field x: f64,
                field y: f64,
                field z: f64,
                field yaw: i8,
                field pitch: i8,
                /// Entity metadata, only sent before 1.15. Kept as raw bytes.
                field metadata: Vec<u8> = until(V1_15),
            }
            /// BlockChange is used to update a single block on the client.
            packet BlockChange {
                field location_legacy: LegacyPosition = until(V1_14),
                field location: Position = since(V1_14),
                field block_id: VarInt,
            }
            /// ServerMessage is a message sent by the server. It could be from a player
            /// or just a system message. The Type field controls the location the
            /// message is displayed at and when the message is displayed.
            packet ServerMessage {
                field message: format::Component,
                /// 0 - Chat message, 1 - System message, 2 - Action bar message
                field position: u8,
                field sender: UUID = since(V1_16),
            }
            /// MultiBlockChange is used to update a batch of blocks in a single packet.
            packet MultiBlockChange {
                field chunk_x: i32 = until(SECTION_BLOCK_CHANGE),
                field chunk_z: i32 = until(SECTION_BLOCK_CHANGE),
                field records: LenPrefixed<VarInt, BlockChangeRecord> = until(SECTION_BLOCK_CHANGE),
                field section_position: u64 = since(SECTION_BLOCK_CHANGE),
                field suppress_light_updates: bool = between(SECTION_BLOCK_CHANGE, V1_20),
                field packed_records: LenPrefixed<VarInt, VarLong> = since(SECTION_BLOCK_CHANGE),
            }
            packet ConfirmTransaction {
                field id: u8,
                field action_number: i16,
                field accepted: bool,
            }
            /// PluginMessageClientbound is used for custom messages between the client
            /// and server. This is mainly for plugins/mods but vanilla has a few channels
            /// registered too.
            packet PluginMessageClientbound {
                field channel: String,
                field data: Vec<u8>,
            }
            /// Disconnect causes the client to disconnect displaying the passed reason.
            packet Disconnect {
                field reason: format::Component,
            }
            /// ChunkUnload tells the client to unload the chunk at the specified
            /// position.
            packet ChunkUnload {
                field x: i32,
                field z: i32,
            }
            /// ChangeGameState is used to modify the game's rules and state.
            packet ChangeGameState {
                field reason: u8,
                field value: f32,
            }
            /// KeepAliveClientbound is sent by a server to check if the
            /// client is still responding and keep the connection open.
            /// The client should reply with the KeepAliveServerbound
            /// packet setting ID to the same as this one.
            packet KeepAliveClientbound {
                field id: i64,
            }
            /// ChunkData sends or updates a column of chunk sections. The block
            /// data is kept packed; it is unpacked off the network thread.
            packet ChunkData {
                field chunk_x: i32,
                field chunk_z: i32,
                field full_chunk: bool = until(V1_17),
                field ignore_old_data: bool = between(V1_16, V1_16_2),
                field bitmask: VarInt = until(V1_17),
                field bitmask_longs: LenPrefixed<VarInt, i64> = between(V1_17, V1_18),
                field heightmaps: Option<nbt::NamedTag> = since(V1_14),
                field biomes_3d: Biomes3D = |p: &ChunkData, v| v >= V1_15 && v < V1_16_2 && p.full_chunk,
                field biomes: LenPrefixed<VarInt, VarInt> = |p: &ChunkData, v| (v >= V1_16_2 && v < V1_17 && p.full_chunk) || (v >= V1_17 && v < V1_18),
                field data: LenPrefixedBytes<VarInt>,
                field block_entities_nbt: LenPrefixed<VarInt, Option<nbt::NamedTag>> = until(V1_18),
                field block_entities: LenPrefixed<VarInt, ChunkBlockEntity> = since(V1_18),
                field trust_edges: bool = between(V1_18, V1_20),
                field sky_light_mask: LenPrefixed<VarInt, i64> = since(V1_18),
                field block_light_mask: LenPrefixed<VarInt, i64> = since(V1_18),
                field empty_sky_light_mask: LenPrefixed<VarInt, i64> = since(V1_18),
                field empty_block_light_mask: LenPrefixed<VarInt, i64> = since(V1_18),
                field sky_light_arrays: LenPrefixed<VarInt, LenPrefixedBytes<VarInt>> = since(V1_18),
                field block_light_arrays: LenPrefixed<VarInt, LenPrefixedBytes<VarInt>> = since(V1_18),
            }
            /// JoinGame is sent after completing the login process. This
            /// sets the initial state for the client.
            packet JoinGame {
                /// The entity id the client will be referenced by
                field entity_id: i32,
                field is_hardcore: bool = since(V1_16_2),
                /// The starting gamemode of the client
                field gamemode: u8,
                field previous_gamemode: u8 = since(V1_16),
                field world_names: LenPrefixed<VarInt, String> = since(V1_16),
                field dimension_codec: Option<nbt::NamedTag> = since(V1_16),
                /// -1 nether, 0 overworld, 1 end
                field dimension_id: i32 = until(V1_16),
                field dimension_nbt: Option<nbt::NamedTag> = between(V1_16_2, V1_19),
                field dimension_name: String = |_: &JoinGame, v| named_dimension(v),
                field world_name: String = since(V1_16),
                field hashed_seed: i64 = since(V1_15),
                field difficulty: u8 = until(V1_14),
                field max_players_u8: u8 = until(V1_16_2),
                field max_players: VarInt = since(V1_16_2),
                field level_type: String = until(V1_16),
                field view_distance: VarInt = since(V1_14),
                field simulation_distance: VarInt = since(V1_18),
                field reduced_debug_info: bool,
                field enable_respawn_screen: bool = since(V1_15),
                field is_debug: bool = since(V1_16),
                field is_flat: bool = since(V1_16),
                field has_death_location: bool = since(V1_19),
                field death_dimension: String = |p: &JoinGame, v| v >= V1_19 && p.has_death_location,
                field death_location: Position = |p: &JoinGame, v| v >= V1_19 && p.has_death_location,
                field portal_cooldown: VarInt = since(V1_20),
            }
            /// TeleportPlayer is sent to change the player's position. The client is expected
            /// to reply to the server with the same positions as contained in this packet
            /// otherwise will reject future packets.
            packet TeleportPlayer {
                field x: f64,
                field y: f64,
                field z: f64,
                field yaw: f32,
                field pitch: f32,
                field flags: u8,
                field teleport_id: VarInt,
                field dismount_vehicle: bool = between(V1_17, V1_19_4),
            }
            /// EntityDestroy destroys the entities with the ids in the provided slice.
            packet EntityDestroy {
                field entity_ids: LenPrefixed<VarInt, VarInt> = |_: &EntityDestroy, v| v != V1_17,
                field entity_id: VarInt = between(V1_17, V1_17_1),
            }
            /// Respawn is sent to respawn the player after death or when they move worlds.
            packet Respawn {
                field dimension_id: i32 = until(V1_16),
                field dimension_nbt: Option<nbt::NamedTag> = between(V1_16_2, V1_19),
                field dimension_name: String = |_: &Respawn, v| named_dimension(v),
                field world_name: String = since(V1_16),
                field hashed_seed: i64 = since(V1_15),
                field difficulty: u8 = until(V1_14),
                field gamemode: u8,
                field previous_gamemode: u8 = since(V1_16),
                field level_type: String = until(V1_16),
                field is_debug: bool = since(V1_16),
                field is_flat: bool = since(V1_16),
                /// A bool before 1.19.3, a set of flags afterwards.
                field copy_metadata: u8 = since(V1_16),
                field has_death_location: bool = since(V1_19),
                field death_dimension: String = |p: &Respawn, v| v >= V1_19 && p.has_death_location,
                field death_location: Position = |p: &Respawn, v| v >= V1_19 && p.has_death_location,
                field portal_cooldown: VarInt = since(V1_20),
            }
            /// UpdateHealth is sent by the server to update the player's health and food.
            packet UpdateHealth {
                field health: f32,
                field food: VarInt,
                field food_saturation: f32,
            }
            /// TimeUpdate is sent to sync the world's time to the client, the client
            /// will manually tick the time itself so this doesn't need to sent repeatedly
            /// but the server or plugins may use this to alter the time the client sees.
            packet TimeUpdate {
                field world_age: i64,
                field time_of_day: i64,
            }
            packet SystemChatMessage {
                field message: format::Component,
                field kind: VarInt = until(V1_19_2),
                field overlay: bool = since(V1_19_2),
            }
            /// PlayerChatMessage carries signed player chat from 1.19 on. The
            /// layout changed in 1.19.1 and again in 1.19.3. Signatures are
            /// read but never verified.
            packet PlayerChatMessage {
                field signed_content: format::Component = until(V1_19_2),
                field has_unsigned_content: bool = until(V1_19_2),
                field unsigned_content: format::Component = |p: &PlayerChatMessage, v| v < V1_19_2 && p.has_unsigned_content,
                field message_type: VarInt = until(V1_19_2),
                field has_previous_signature: bool = between(V1_19_2, V1_19_3),
                field previous_signature: LenPrefixedBytes<VarInt> = |p: &PlayerChatMessage, v| v == V1_19_2 && p.has_previous_signature,
                field sender: UUID,
                field display_name: format::Component = until(V1_19_2),
                field has_team_name: bool = until(V1_19_2),
                field team_name: format::Component = |p: &PlayerChatMessage, v| v < V1_19_2 && p.has_team_name,
                field header_signature: LenPrefixedBytes<VarInt> = between(V1_19_2, V1_19_3),
                field index: VarInt = since(V1_19_3),
                field has_signature: bool = since(V1_19_3),
                field signature: MessageSignature = |p: &PlayerChatMessage, v| v >= V1_19_3 && p.has_signature,
                field plain_message: String = since(V1_19_2),
                field has_formatted: bool = between(V1_19_2, V1_19_3),
                field formatted: format::Component = |p: &PlayerChatMessage, v| v == V1_19_2 && p.has_formatted,
                field timestamp: i64,
                field salt: i64,
                field message_signature: LenPrefixedBytes<VarInt> = until(V1_19_2),
                field last_seen: LenPrefixed<VarInt, LastSeenMessage> = between(V1_19_2, V1_19_3),
                field previous_messages: LenPrefixed<VarInt, PreviousMessage> = since(V1_19_3),
                field has_unsigned: bool = since(V1_19_2),
                field unsigned: format::Component = |p: &PlayerChatMessage, v| v >= V1_19_2 && p.has_unsigned,
                field filter_type: VarInt = since(V1_19_2),
                field filter_bits: LenPrefixed<VarInt, i64> = |p: &PlayerChatMessage, v| v >= V1_19_2 && p.filter_type.0 == 2,
                field chat_type: VarInt = since(V1_19_2),
                field network_name: format::Component = since(V1_19_2),
                field has_target_name: bool = since(V1_19_2),
                field target_name: format::Component = |p: &PlayerChatMessage, v| v >= V1_19_2 && p.has_target_name,
            }
            /// SpawnObject spawns a non-living entity. From 1.19 it spawns every
            /// entity but players.
            packet SpawnObject {
                field entity_id: VarInt,
                field uuid: UUID,
                field ty_i8: i8 = until(V1_14),
                field ty: VarInt = since(V1_14),
                field x: f64,
                field y: f64,
                field z: f64,
                field pitch: i8,
                field yaw: i8,
                field head_yaw: i8 = since(V1_19),
                field data_i32: i32 = until(V1_19),
                field data: VarInt = since(V1_19),
                field velocity_x: i16,
                field velocity_y: i16,
                field velocity_z: i16,
            }
            /// SpawnMob spawns a living entity. Merged into SpawnObject in 1.19.
            packet SpawnMob {
                field entity_id: VarInt,
                field uuid: UUID,
                field ty: VarInt,
                field x: f64,
                field y: f64,
                field z: f64,
                field yaw: i8,
                field pitch: i8,
                field head_pitch: i8,
                field velocity_x: i16,
                field velocity_y: i16,
                field velocity_z: i16,
                /// Entity metadata, only sent before 1.15. Kept as raw bytes.
                field metadata: Vec<u8> = until(V1_15),
            }
            /// EntityMove moves an entity by up to 8 blocks, in 1/4096ths of a
            /// block.
            packet EntityMove {
                field entity_id: VarInt,
                field delta_x: i16,
                field delta_y: i16,
                field delta_z: i16,
                field on_ground: bool,
            }
            packet EntityLookAndMove {
                field entity_id: VarInt,
                field delta_x: i16,
                field delta_y: i16,
                field delta_z: i16,
                field yaw: i8,
                field pitch: i8,
                field on_ground: bool,
            }
            packet EntityLook {
                field entity_id: VarInt,
                field yaw: i8,
                field pitch: i8,
                field on_ground: bool,
            }
            /// EntityTeleport is sent when an entity moves further than
            /// EntityMove allows.
            packet EntityTeleport {
                field entity_id: VarInt,
                field x: f64,
                field y: f64,
                field z: f64,
                field yaw: i8,
                field pitch: i8,
                field on_ground: bool,
            }
            /// PlayerInfo updates the tab list before 1.19.3. Entries depend on
            /// the action and are parsed by `changes`.
            packet PlayerInfo {
                field action: VarInt,
                field entries: Vec<u8>,
            }
            /// PlayerInfoUpdate replaces PlayerInfo from 1.19.3. `actions` is a
            /// bit set of the sections present in every entry.
            packet PlayerInfoUpdate {
                field actions: u8,
                field entries: Vec<u8>,
            }
            packet PlayerInfoRemove {
                field players: LenPrefixed<VarInt, UUID>,
            }
            packet SetExperience {
                field experience_bar: f32,
                field level: VarInt,
                field total_experience: VarInt,
            }
        }
    }
);

/// Login signing data is only exchanged by 1.19 through 1.19.2.
fn signed_login(version: i32) -> bool {
    (V1_19..V1_19_3).contains(&version)
}

/// The dimension is sent by name in 1.16/1.16.1 and again from 1.19, as NBT
/// in between, and as an int before 1.16.
fn named_dimension(version: i32) -> bool {
    (V1_16..V1_16_2).contains(&version) || version >= V1_19
}

use crate::format;
use crate::protocol::versions::*;

#[derive(Debug, Default, Clone)]
pub struct BlockChangeRecord {
    pub xz: u8,
    pub y: u8,
    pub block_id: VarInt,
}

impl Serializable for BlockChangeRecord {
    fn read_from<R: io::Read>(buf: &mut R) -> Result<Self, Error> {
        Ok(BlockChangeRecord {
            xz: Serializable::read_from(buf)?,
            y: Serializable::read_from(buf)?,
            block_id: Serializable::read_from(buf)?,
        })
    }

    fn write_to<W: io::Write>(&self, buf: &mut W) -> Result<(), Error> {
        self.xz.write_to(buf)?;
        self.y.write_to(buf)?;
        self.block_id.write_to(buf)
    }
}

/// Block entity entry of the 1.18+ chunk packet.
#[derive(Debug, Default, Clone)]
pub struct ChunkBlockEntity {
    pub packed_xz: u8,
    pub y: i16,
    pub ty: VarInt,
    pub data: Option<nbt::NamedTag>,
}

impl Serializable for ChunkBlockEntity {
    fn read_from<R: io::Read>(buf: &mut R) -> Result<Self, Error> {
        Ok(ChunkBlockEntity {
            packed_xz: Serializable::read_from(buf)?,
            y: Serializable::read_from(buf)?,
            ty: Serializable::read_from(buf)?,
            data: Serializable::read_from(buf)?,
        })
    }

    fn write_to<W: io::Write>(&self, buf: &mut W) -> Result<(), Error> {
        self.packed_xz.write_to(buf)?;
        self.y.write_to(buf)?;
        self.ty.write_to(buf)?;
        self.data.write_to(buf)
    }
}

/// Fixed 4x4x4 biome grid sent with full chunks in 1.15 through 1.16.1.
#[derive(Debug, Default, Clone)]
pub struct Biomes3D {
    pub data: Vec<i32>,
}

impl Biomes3D {
    pub const LEN: usize = 1024;
}

impl Serializable for Biomes3D {
    fn read_from<R: io::Read>(buf: &mut R) -> Result<Self, Error> {
        let mut data = Vec::with_capacity(Self::LEN);
        for _ in 0..Self::LEN {
            data.push(i32::read_from(buf)?);
        }
        Ok(Biomes3D { data })
    }

    fn write_to<W: io::Write>(&self, buf: &mut W) -> Result<(), Error> {
        if self.data.len() != Self::LEN {
            return Err(Error::Err(format!(
                "biome grid must have {} entries, has {}",
                Self::LEN,
                self.data.len()
            )));
        }
        for val in &self.data {
            val.write_to(buf)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct ProfileProperty {
    pub name: String,
    pub value: String,
    pub signature: Option<String>,
}

impl Serializable for ProfileProperty {
    fn read_from<R: io::Read>(buf: &mut R) -> Result<Self, Error> {
        let name = Serializable::read_from(buf)?;
        let value = Serializable::read_from(buf)?;
        let signed: bool = Serializable::read_from(buf)?;
        let signature = if signed {
            Some(Serializable::read_from(buf)?)
        } else {
            None
        };
        Ok(ProfileProperty {
            name,
            value,
            signature,
        })
    }

    fn write_to<W: io::Write>(&self, buf: &mut W) -> Result<(), Error> {
        self.name.write_to(buf)?;
        self.value.write_to(buf)?;
        self.signature.is_some().write_to(buf)?;
        self.signature.write_to(buf)
    }
}

#[derive(Debug, Default, Clone)]
pub struct LastSeenMessage {
    pub sender: UUID,
    pub signature: LenPrefixedBytes<VarInt>,
}

impl Serializable for LastSeenMessage {
    fn read_from<R: io::Read>(buf: &mut R) -> Result<Self, Error> {
        Ok(LastSeenMessage {
            sender: Serializable::read_from(buf)?,
            signature: Serializable::read_from(buf)?,
        })
    }

    fn write_to<W: io::Write>(&self, buf: &mut W) -> Result<(), Error> {
        self.sender.write_to(buf)?;
        self.signature.write_to(buf)
    }
}

/// The 20 bit acknowledgement set of 1.19.3+ chat, sent as three bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcknowledgedBits(pub u32);

impl Serializable for AcknowledgedBits {
    fn read_from<R: io::Read>(buf: &mut R) -> Result<Self, Error> {
        let mut bytes = [0u8; 3];
        buf.read_exact(&mut bytes)?;
        Ok(AcknowledgedBits(
            bytes[0] as u32 | (bytes[1] as u32) << 8 | (bytes[2] as u32) << 16,
        ))
    }

    fn write_to<W: io::Write>(&self, buf: &mut W) -> Result<(), Error> {
        let val = self.0 & 0xF_FFFF;
        buf.write_all(&[val as u8, (val >> 8) as u8, (val >> 16) as u8])?;
        Ok(())
    }
}

/// 1.19.3+ message signatures have a fixed size and no length prefix.
#[derive(Debug, Clone)]
pub struct MessageSignature(pub Vec<u8>);

impl MessageSignature {
    pub const LEN: usize = 256;
}

impl Default for MessageSignature {
    fn default() -> Self {
        MessageSignature(vec![0; Self::LEN])
    }
}

impl Serializable for MessageSignature {
    fn read_from<R: io::Read>(buf: &mut R) -> Result<Self, Error> {
        let mut data = vec![0; Self::LEN];
        buf.read_exact(&mut data)?;
        Ok(MessageSignature(data))
    }

    fn write_to<W: io::Write>(&self, buf: &mut W) -> Result<(), Error> {
        if self.0.len() != Self::LEN {
            return Err(Error::Err(format!(
                "message signature must be {} bytes, has {}",
                Self::LEN,
                self.0.len()
            )));
        }
        buf.write_all(&self.0)?;
        Ok(())
    }
}

/// Entry of the 1.19.3+ previous message list: either an index into the
/// client's cache (sent as `index + 1`) or, for `0`, a full signature.
#[derive(Debug, Default, Clone)]
pub struct PreviousMessage {
    pub id: VarInt,
    pub signature: Option<MessageSignature>,
}

impl Serializable for PreviousMessage {
    fn read_from<R: io::Read>(buf: &mut R) -> Result<Self, Error> {
        let id = VarInt::read_from(buf)?;
        let signature = if id.0 == 0 {
            Some(MessageSignature::read_from(buf)?)
        } else {
            None
        };
        Ok(PreviousMessage { id, signature })
    }

    fn write_to<W: io::Write>(&self, buf: &mut W) -> Result<(), Error> {
        self.id.write_to(buf)?;
        match self.signature {
            Some(ref sig) if self.id.0 == 0 => sig.write_to(buf),
            None if self.id.0 != 0 => Ok(()),
            _ => Err(Error::Err(
                "previous message needs a signature exactly when its id is 0".to_owned(),
            )),
        }
    }
}

impl play::clientbound::PlayerChatMessage {
    /// The line a vanilla client shows for this message, `<sender> text`.
    /// Unsigned (server decorated) content wins over the signed body.
    pub fn text(&self, version: i32) -> String {
        let (sender, body) = if version < V1_19_2 {
            let body = if self.has_unsigned_content {
                &self.unsigned_content
            } else {
                &self.signed_content
            };
            (self.display_name.to_string(), body.to_string())
        } else {
            let body = if self.has_unsigned {
                self.unsigned.to_string()
            } else if version < V1_19_3 && self.has_formatted {
                self.formatted.to_string()
            } else {
                self.plain_message.clone()
            };
            (self.network_name.to_string(), body)
        };
        format!("<{}> {}", sender, body)
    }
}

/// A player added to the tab list.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerListEntry {
    pub uuid: UUID,
    pub name: String,
}

/// Tab list changes the session reports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerListChanges {
    pub added: Vec<PlayerListEntry>,
    pub removed: Vec<UUID>,
}

fn skip_signed_key<R: io::Read>(buf: &mut R) -> Result<(), Error> {
    i64::read_from(buf)?;
    LenPrefixedBytes::<VarInt>::read_from(buf)?;
    LenPrefixedBytes::<VarInt>::read_from(buf)?;
    Ok(())
}

impl play::clientbound::PlayerInfo {
    pub const ADD_PLAYER: i32 = 0;
    pub const REMOVE_PLAYER: i32 = 4;

    /// Decodes the entries for add and remove actions. Gamemode, latency
    /// and display name updates carry nothing the session tracks.
    pub fn changes(&self, version: i32) -> Result<PlayerListChanges, Error> {
        let mut out = PlayerListChanges::default();
        let action = self.action.0;
        if action != Self::ADD_PLAYER && action != Self::REMOVE_PLAYER {
            return Ok(out);
        }
        let mut buf = io::Cursor::new(&self.entries[..]);
        let count = VarInt::read_from(&mut buf)?.0;
        for _ in 0..count {
            let uuid = UUID::read_from(&mut buf)?;
            if action == Self::REMOVE_PLAYER {
                out.removed.push(uuid);
                continue;
            }
            let name = String::read_from(&mut buf)?;
            LenPrefixed::<VarInt, ProfileProperty>::read_from(&mut buf)?;
            VarInt::read_from(&mut buf)?; // gamemode
            VarInt::read_from(&mut buf)?; // ping
            if bool::read_from(&mut buf)? {
                format::Component::read_from(&mut buf)?;
            }
            if version >= V1_19 && bool::read_from(&mut buf)? {
                skip_signed_key(&mut buf)?;
            }
            out.added.push(PlayerListEntry { uuid, name });
        }
        check_consumed(&buf, "player info")?;
        Ok(out)
    }
}

impl play::clientbound::PlayerInfoUpdate {
    pub const ADD_PLAYER: u8 = 0x01;
    pub const INITIALIZE_CHAT: u8 = 0x02;
    pub const UPDATE_GAMEMODE: u8 = 0x04;
    pub const UPDATE_LISTED: u8 = 0x08;
    pub const UPDATE_LATENCY: u8 = 0x10;
    pub const UPDATE_DISPLAY_NAME: u8 = 0x20;

    /// Players added by this update.
    pub fn added(&self) -> Result<Vec<PlayerListEntry>, Error> {
        let mut out = vec![];
        let mut buf = io::Cursor::new(&self.entries[..]);
        let count = VarInt::read_from(&mut buf)?.0;
        for _ in 0..count {
            let uuid = UUID::read_from(&mut buf)?;
            let mut name = None;
            if self.actions & Self::ADD_PLAYER != 0 {
                name = Some(String::read_from(&mut buf)?);
                LenPrefixed::<VarInt, ProfileProperty>::read_from(&mut buf)?;
            }
            if self.actions & Self::INITIALIZE_CHAT != 0 && bool::read_from(&mut buf)? {
                UUID::read_from(&mut buf)?;
                skip_signed_key(&mut buf)?;
            }
            if self.actions & Self::UPDATE_GAMEMODE != 0 {
                VarInt::read_from(&mut buf)?;
            }
            if self.actions & Self::UPDATE_LISTED != 0 {
                bool::read_from(&mut buf)?;
            }
            if self.actions & Self::UPDATE_LATENCY != 0 {
                VarInt::read_from(&mut buf)?;
            }
            if self.actions & Self::UPDATE_DISPLAY_NAME != 0 && bool::read_from(&mut buf)? {
                format::Component::read_from(&mut buf)?;
            }
            if let Some(name) = name {
                out.push(PlayerListEntry { uuid, name });
            }
        }
        check_consumed(&buf, "player info update")?;
        Ok(out)
    }
}

fn check_consumed(buf: &io::Cursor<&[u8]>, what: &str) -> Result<(), Error> {
    let left = buf.get_ref().len() - buf.position() as usize;
    if left != 0 {
        return Err(Error::Err(format!("{} had {} bytes left", what, left)));
    }
    Ok(())
}

impl play::clientbound::SpawnObject {
    pub fn entity_type(&self, version: i32) -> i32 {
        if version >= V1_14 {
            self.ty.0
        } else {
            self.ty_i8 as i32
        }
    }
}

impl play::clientbound::BlockChange {
    pub fn position(&self, version: i32) -> Position {
        if version >= V1_14 {
            self.location
        } else {
            self.location_legacy.0
        }
    }
}

impl play::clientbound::EntityDestroy {
    pub fn ids(&self, version: i32) -> Vec<i32> {
        if version == V1_17 {
            vec![self.entity_id.0]
        } else {
            self.entity_ids.data.iter().map(|id| id.0).collect()
        }
    }
}

/// Resolves and parses one payload. Unknown ids yield `None`; payloads that
/// are not consumed exactly are protocol errors.
pub fn decode_payload(
    palette: &PacketPalette,
    state: State,
    dir: Direction,
    id: i32,
    payload: &[u8],
) -> Result<Option<Packet>, Error> {
    let kind = match palette.symbolic_id_for(state, dir, id) {
        Some(kind) => kind,
        None => {
            log::trace!("Ignoring unknown packet 0x{:02X} in {:?}", id, state);
            return Ok(None);
        }
    };
    let version = palette.version();
    let mut buf = io::Cursor::new(payload);
    let packet = read_packet(kind, &mut buf, version)
        .map_err(|err| err.with_context(id, version, state))?;

    let pos = buf.position() as usize;
    if pos != payload.len() {
        return Err(Error::Err(format!(
            "Failed to read all of packet 0x{:X} ({:?}), had {} bytes left",
            id,
            kind,
            payload.len() - pos
        ))
        .with_context(id, version, state));
    }
    Ok(Some(packet))
}

#[cfg(test)]
mod test {
    use super::*;

    fn payload<T: PacketType>(packet: &T, version: i32) -> Vec<u8> {
        let mut buf = Vec::new();
        packet.write(&mut buf, version).unwrap();
        buf
    }

    #[test]
    fn join_game_layout_changes_with_version() {
        let join = play::clientbound::JoinGame {
            entity_id: 7,
            gamemode: 1,
            dimension_id: -1,
            difficulty: 2,
            max_players_u8: 20,
            level_type: "default".to_owned(),
            ..Default::default()
        };
        // entity id, gamemode, dimension, difficulty, max players, level type, debug flag
        assert_eq!(payload(&join, V1_12_2).len(), 4 + 1 + 4 + 1 + 1 + 8 + 1);
        // 1.14 drops difficulty and adds the view distance
        assert_eq!(payload(&join, V1_14).len(), 4 + 1 + 4 + 1 + 8 + 1 + 1);

        let bytes = payload(&join, V1_12_2);
        let back = play::clientbound::JoinGame::read_versioned(&mut io::Cursor::new(&bytes), V1_12_2)
            .unwrap();
        assert_eq!(back.dimension_id, -1);
        assert_eq!(back.level_type, "default");
    }

    #[test]
    fn death_location_depends_on_flag() {
        let mut respawn = play::clientbound::Respawn {
            dimension_name: "minecraft:overworld".to_owned(),
            world_name: "minecraft:overworld".to_owned(),
            death_dimension: "minecraft:the_nether".to_owned(),
            ..Default::default()
        };
        let without = payload(&respawn, V1_19_4).len();
        respawn.has_death_location = true;
        let with = payload(&respawn, V1_19_4);
        assert_eq!(with.len(), without + 1 + 20 + 8);

        let back = play::clientbound::Respawn::read_versioned(&mut io::Cursor::new(&with), V1_19_4)
            .unwrap();
        assert!(back.has_death_location);
        assert_eq!(back.death_dimension, "minecraft:the_nether");
    }

    #[test]
    fn unsigned_chat_layouts() {
        let chat = play::serverbound::ChatMessage {
            message: "hi".to_owned(),
            ..Default::default()
        };
        assert_eq!(payload(&chat, V1_18), [0x02, b'h', b'i']);
        // message, timestamp, salt, empty signature, preview flag
        assert_eq!(payload(&chat, V1_19).len(), 3 + 8 + 8 + 1 + 1);
        // plus empty last seen list and missing last received
        assert_eq!(payload(&chat, V1_19_2).len(), 3 + 8 + 8 + 1 + 1 + 1 + 1);
        // message, timestamp, salt, no signature, count, 3 ack bytes
        assert_eq!(payload(&chat, V1_20).len(), 3 + 8 + 8 + 1 + 1 + 3);
    }

    #[test]
    fn login_start_uuid_only_when_flagged() {
        let mut start = login::serverbound::LoginStart {
            username: "Steve".to_owned(),
            ..Default::default()
        };
        assert_eq!(payload(&start, V1_18).len(), 6);
        assert_eq!(payload(&start, V1_19).len(), 7);
        assert_eq!(payload(&start, V1_19_2).len(), 8);
        start.has_uuid = true;
        assert_eq!(payload(&start, V1_19_2).len(), 8 + 16);
        assert_eq!(payload(&start, V1_19_3).len(), 7 + 16);
    }

    #[test]
    fn decode_rejects_leftover_bytes() {
        let palette = PacketPalette::for_version(V1_12_2, false).unwrap();
        let mut bytes = Vec::new();
        42i64.write_to(&mut bytes).unwrap();
        let decoded = decode_payload(&palette, State::Play, Direction::Clientbound, 0x1f, &bytes)
            .unwrap()
            .unwrap();
        match decoded {
            Packet::KeepAliveClientbound(ka) => assert_eq!(ka.id, 42),
            other => panic!("unexpected {:?}", other),
        }

        bytes.push(0);
        let err = decode_payload(&palette, State::Play, Direction::Clientbound, 0x1f, &bytes)
            .unwrap_err();
        assert!(matches!(err, Error::Decode { packet_id: 0x1f, version: V1_12_2, .. }));
    }

    #[test]
    fn unknown_ids_are_skipped() {
        let palette = PacketPalette::for_version(V1_16, false).unwrap();
        let decoded =
            decode_payload(&palette, State::Play, Direction::Clientbound, 0x7e, &[1, 2, 3]).unwrap();
        assert!(decoded.is_none());
    }

    #[test]
    fn truncated_payload_is_a_decode_error() {
        let palette = PacketPalette::for_version(V1_16_2, false).unwrap();
        let err = decode_payload(&palette, State::Play, Direction::Clientbound, 0x1c, &[0, 0, 0])
            .unwrap_err();
        assert!(!err.is_connection_lost());
        assert!(matches!(err, Error::Decode { state: State::Play, .. }));
    }

    #[test]
    fn entity_destroy_single_id_in_1_17() {
        let mut bytes = Vec::new();
        VarInt(99).write_to(&mut bytes).unwrap();
        let packet =
            play::clientbound::EntityDestroy::read_versioned(&mut io::Cursor::new(&bytes), V1_17)
                .unwrap();
        assert_eq!(packet.ids(V1_17), vec![99]);

        let mut bytes = Vec::new();
        LenPrefixed::<VarInt, VarInt>::new(vec![VarInt(1), VarInt(2)])
            .write_to(&mut bytes)
            .unwrap();
        let packet =
            play::clientbound::EntityDestroy::read_versioned(&mut io::Cursor::new(&bytes), V1_17_1)
                .unwrap();
        assert_eq!(packet.ids(V1_17_1), vec![1, 2]);
    }

    fn put<T: Serializable>(buf: &mut Vec<u8>, val: T) {
        val.write_to(buf).unwrap();
    }

    fn decode_clientbound(version: i32, kind: PacketKind, bytes: &[u8]) -> Packet {
        let palette = PacketPalette::for_version(version, false).unwrap();
        let id = palette.raw_id_for(kind).unwrap();
        decode_payload(&palette, State::Play, Direction::Clientbound, id, bytes)
            .unwrap()
            .unwrap()
    }

    fn chat_text(version: i32, bytes: &[u8]) -> String {
        match decode_clientbound(version, PacketKind::PlayerChatMessage, bytes) {
            Packet::PlayerChatMessage(msg) => msg.text(version),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn player_chat_1_19() {
        let mut bytes = vec![];
        put(&mut bytes, "{\"text\":\"hello\"}".to_owned());
        put(&mut bytes, false);
        put(&mut bytes, VarInt(0));
        put(&mut bytes, UUID(1, 2));
        put(&mut bytes, "Alex".to_owned());
        put(&mut bytes, false);
        put(&mut bytes, 1_700_000_000_000i64);
        put(&mut bytes, 99i64);
        put(&mut bytes, LenPrefixedBytes::<VarInt>::new(vec![1, 2, 3]));
        assert_eq!(chat_text(V1_19, &bytes), "<Alex> hello");
    }

    #[test]
    fn player_chat_1_19_2() {
        let mut bytes = vec![];
        put(&mut bytes, true);
        put(&mut bytes, LenPrefixedBytes::<VarInt>::new(vec![1, 2]));
        put(&mut bytes, UUID(1, 2));
        put(&mut bytes, LenPrefixedBytes::<VarInt>::new(vec![3]));
        put(&mut bytes, "hi there".to_owned());
        put(&mut bytes, false);
        put(&mut bytes, 0i64);
        put(&mut bytes, 0i64);
        put(
            &mut bytes,
            LenPrefixed::<VarInt, LastSeenMessage>::new(vec![LastSeenMessage {
                sender: UUID(5, 6),
                signature: LenPrefixedBytes::new(vec![9]),
            }]),
        );
        put(&mut bytes, false);
        // partially filtered, one word of filter bits
        put(&mut bytes, VarInt(2));
        put(&mut bytes, LenPrefixed::<VarInt, i64>::new(vec![0b101]));
        put(&mut bytes, VarInt(0));
        put(&mut bytes, "Alex".to_owned());
        put(&mut bytes, false);
        assert_eq!(chat_text(V1_19_2, &bytes), "<Alex> hi there");
    }

    #[test]
    fn player_chat_1_19_3() {
        let mut bytes = vec![];
        put(&mut bytes, UUID(1, 2));
        put(&mut bytes, VarInt(4));
        put(&mut bytes, true);
        put(&mut bytes, MessageSignature(vec![7; MessageSignature::LEN]));
        put(&mut bytes, "hi".to_owned());
        put(&mut bytes, 0i64);
        put(&mut bytes, 0i64);
        put(
            &mut bytes,
            LenPrefixed::<VarInt, PreviousMessage>::new(vec![
                PreviousMessage {
                    id: VarInt(0),
                    signature: Some(MessageSignature::default()),
                },
                PreviousMessage {
                    id: VarInt(5),
                    signature: None,
                },
            ]),
        );
        put(&mut bytes, true);
        put(&mut bytes, "{\"text\":\"[server] hi\"}".to_owned());
        put(&mut bytes, VarInt(0));
        put(&mut bytes, VarInt(1));
        put(&mut bytes, "Alex".to_owned());
        put(&mut bytes, true);
        put(&mut bytes, "Bob".to_owned());
        assert_eq!(chat_text(V1_19_3, &bytes), "<Alex> [server] hi");
        assert_eq!(chat_text(V1_20, &bytes), "<Alex> [server] hi");

        // signatures have no length prefix
        let short = [&bytes[..18], &bytes[18 + 8..]].concat();
        let palette = PacketPalette::for_version(V1_19_3, false).unwrap();
        let id = palette.raw_id_for(PacketKind::PlayerChatMessage).unwrap();
        assert!(decode_payload(&palette, State::Play, Direction::Clientbound, id, &short).is_err());
    }

    #[test]
    fn spawn_object_type_width() {
        let mut old = vec![];
        put(&mut old, VarInt(5));
        put(&mut old, UUID(1, 1));
        put(&mut old, 2i8);
        put(&mut old, 1.5f64);
        put(&mut old, 64.0f64);
        put(&mut old, -3.0f64);
        put(&mut old, 0i8);
        put(&mut old, 0i8);
        put(&mut old, 1i32);
        for _ in 0..3 {
            put(&mut old, 0i16);
        }
        match decode_clientbound(V1_12_2, PacketKind::SpawnObject, &old) {
            Packet::SpawnObject(spawn) => {
                assert_eq!(spawn.entity_type(V1_12_2), 2);
                assert_eq!(spawn.z, -3.0);
                assert_eq!(spawn.data_i32, 1);
            }
            other => panic!("unexpected {:?}", other),
        }

        let mut new = vec![];
        put(&mut new, VarInt(5));
        put(&mut new, UUID(1, 1));
        put(&mut new, VarInt(300));
        put(&mut new, 1.5f64);
        put(&mut new, 64.0f64);
        put(&mut new, -3.0f64);
        put(&mut new, 0i8);
        put(&mut new, 0i8);
        put(&mut new, 0i8);
        put(&mut new, VarInt(0));
        for _ in 0..3 {
            put(&mut new, 0i16);
        }
        match decode_clientbound(V1_19, PacketKind::SpawnObject, &new) {
            Packet::SpawnObject(spawn) => assert_eq!(spawn.entity_type(V1_19), 300),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn spawn_mob_metadata_until_1_15() {
        let mut bytes = vec![];
        put(&mut bytes, VarInt(8));
        put(&mut bytes, UUID(0, 9));
        put(&mut bytes, VarInt(54));
        for _ in 0..3 {
            put(&mut bytes, 0f64);
        }
        for _ in 0..3 {
            put(&mut bytes, 0i8);
        }
        for _ in 0..3 {
            put(&mut bytes, 0i16);
        }
        let without = bytes.clone();
        bytes.push(0xff);
        match decode_clientbound(V1_14, PacketKind::SpawnMob, &bytes) {
            Packet::SpawnMob(mob) => {
                assert_eq!(mob.ty.0, 54);
                assert_eq!(mob.metadata, vec![0xff]);
            }
            other => panic!("unexpected {:?}", other),
        }
        match decode_clientbound(V1_16, PacketKind::SpawnMob, &without) {
            Packet::SpawnMob(mob) => assert_eq!(mob.entity_id.0, 8),
            other => panic!("unexpected {:?}", other),
        }
        let palette = PacketPalette::for_version(V1_19, false).unwrap();
        assert_eq!(palette.raw_id_for(PacketKind::SpawnMob), None);
    }

    #[test]
    fn entity_movement_frames() {
        let mut bytes = vec![];
        put(&mut bytes, VarInt(3));
        put(&mut bytes, 4096i16);
        put(&mut bytes, -2048i16);
        put(&mut bytes, 0i16);
        put(&mut bytes, 64i8);
        put(&mut bytes, 0i8);
        put(&mut bytes, true);
        match decode_clientbound(V1_16_2, PacketKind::EntityLookAndMove, &bytes) {
            Packet::EntityLookAndMove(m) => {
                assert_eq!((m.delta_x, m.delta_y, m.yaw), (4096, -2048, 64));
                assert!(m.on_ground);
            }
            other => panic!("unexpected {:?}", other),
        }

        let mut bytes = vec![];
        put(&mut bytes, VarInt(3));
        put(&mut bytes, 10.0f64);
        put(&mut bytes, 70.0f64);
        put(&mut bytes, -10.0f64);
        put(&mut bytes, 0i8);
        put(&mut bytes, 0i8);
        put(&mut bytes, false);
        match decode_clientbound(V1_20, PacketKind::EntityTeleport, &bytes) {
            Packet::EntityTeleport(tp) => assert_eq!((tp.x, tp.y, tp.z), (10.0, 70.0, -10.0)),
            other => panic!("unexpected {:?}", other),
        }
    }

    fn player_entry(buf: &mut Vec<u8>, uuid: UUID, name: &str) {
        put(buf, uuid);
        put(buf, name.to_owned());
        put(buf, VarInt(1));
        put(buf, "textures".to_owned());
        put(buf, "e30=".to_owned());
        put(buf, true);
        put(buf, "c2ln".to_owned());
    }

    #[test]
    fn player_info_add_and_remove() {
        let mut entries = vec![];
        put(&mut entries, VarInt(2));
        player_entry(&mut entries, UUID(1, 1), "Alex");
        put(&mut entries, VarInt(1)); // gamemode
        put(&mut entries, VarInt(30)); // ping
        put(&mut entries, false);
        put(&mut entries, true); // signed key
        put(&mut entries, 0i64);
        put(&mut entries, LenPrefixedBytes::<VarInt>::new(vec![1; 4]));
        put(&mut entries, LenPrefixedBytes::<VarInt>::new(vec![2; 4]));
        player_entry(&mut entries, UUID(2, 2), "Bob");
        put(&mut entries, VarInt(0));
        put(&mut entries, VarInt(5));
        put(&mut entries, true);
        put(&mut entries, "{\"text\":\"Bobby\"}".to_owned());
        put(&mut entries, false);

        let info = play::clientbound::PlayerInfo {
            action: VarInt(play::clientbound::PlayerInfo::ADD_PLAYER),
            entries,
        };
        let changes = info.changes(V1_19).unwrap();
        assert_eq!(
            changes.added,
            vec![
                PlayerListEntry {
                    uuid: UUID(1, 1),
                    name: "Alex".to_owned()
                },
                PlayerListEntry {
                    uuid: UUID(2, 2),
                    name: "Bob".to_owned()
                },
            ]
        );

        let mut entries = vec![];
        put(&mut entries, VarInt(1));
        put(&mut entries, UUID(2, 2));
        let info = play::clientbound::PlayerInfo {
            action: VarInt(play::clientbound::PlayerInfo::REMOVE_PLAYER),
            entries,
        };
        let changes = info.changes(V1_12_2).unwrap();
        assert!(changes.added.is_empty());
        assert_eq!(changes.removed, vec![UUID(2, 2)]);

        let mut trailing = info.clone();
        trailing.entries.push(0);
        assert!(trailing.changes(V1_12_2).is_err());

        let latency = play::clientbound::PlayerInfo {
            action: VarInt(2),
            entries: vec![1, 2, 3],
        };
        assert_eq!(latency.changes(V1_16).unwrap(), PlayerListChanges::default());
    }

    #[test]
    fn player_info_update_actions() {
        type Update = play::clientbound::PlayerInfoUpdate;
        let mut entries = vec![];
        put(&mut entries, VarInt(1));
        player_entry(&mut entries, UUID(3, 3), "Steve");
        put(&mut entries, true); // listed
        put(&mut entries, VarInt(12)); // latency
        let update = Update {
            actions: Update::ADD_PLAYER | Update::UPDATE_LISTED | Update::UPDATE_LATENCY,
            entries,
        };
        assert_eq!(
            update.added().unwrap(),
            vec![PlayerListEntry {
                uuid: UUID(3, 3),
                name: "Steve".to_owned()
            }]
        );

        let mut entries = vec![];
        put(&mut entries, VarInt(1));
        put(&mut entries, UUID(3, 3));
        put(&mut entries, VarInt(40));
        let update = Update {
            actions: Update::UPDATE_LATENCY,
            entries,
        };
        assert!(update.added().unwrap().is_empty());
    }
}
