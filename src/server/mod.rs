// Copyright 2015 Matthew Collins
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

use std::collections::{HashMap, HashSet};
use std::convert::TryFrom;
use std::hash::BuildHasherDefault;
use std::io::Write;
use std::net::TcpStream;
use std::sync::mpsc;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info, trace, warn};

use crate::chunk_decoder::{ChunkDecoder, Completed};
use crate::config::ClientConfig;
use crate::nbt;
use crate::protocol::mojang::SessionService;
use crate::protocol::packet::{self, Packet};
use crate::protocol::{self, versions, Conn, PacketPalette, PacketType, VarInt};
use crate::shared::{ChunkPos, Position};
use crate::types::hash::FNVHash;
use crate::types::Gamemode;
use crate::world::{ColumnJob, WorldSink};

pub mod dimension;
pub mod event;
pub mod login;

use self::dimension::DimensionInfo;
use self::event::{DisconnectReason, Event, EventSink};
use self::login::{Connection, LoginSettings};

type PacketQueue = mpsc::Receiver<Result<Packet, protocol::Error>>;

/// Where the server last put the player.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
}

/// A play session. Packets are read on a background thread and applied to
/// the world and event sink passed to `tick`, on the caller's thread.
pub struct Server<S: Write = TcpStream> {
    conn: Option<Conn<S>>,
    read_queue: Option<PacketQueue>,
    on_close: Option<Box<dyn FnOnce() + Send>>,
    palette: PacketPalette,
    connection: Connection,

    decoder: ChunkDecoder,
    dimension: DimensionInfo,
    dimension_codec: Option<nbt::NamedTag>,
    loaded_columns: HashSet<ChunkPos, BuildHasherDefault<FNVHash>>,

    entity_id: i32,
    gamemode: Gamemode,
    position: PlayerPosition,
    // Last action number seen per window.
    window_actions: HashMap<u8, i16, BuildHasherDefault<FNVHash>>,

    disconnected: bool,
}

macro_rules! handle_packet {
    ($s:ident $world:ident $events:ident $pck:ident {
        $($packet:ident => $func:ident,)*
    }) => (
        match $pck {
        $(
            Packet::$packet(val) => $s.$func($world, $events, val),
        )*
            other => {
                trace!("Unhandled {:?}", other.kind());
                Ok(())
            }
        }
    )
}

impl Server<TcpStream> {
    /// Connects and logs in.
    ///
    /// Unsupported versions and configuration errors are returned before any
    /// connection is made. Anything that fails once the socket is open is
    /// also reported to `events` as a disconnect.
    pub fn connect<E: EventSink>(
        config: &ClientConfig,
        session: &dyn SessionService,
        events: &mut E,
    ) -> Result<Server, protocol::Error> {
        let palette = PacketPalette::for_version(config.protocol_version, config.mod_layer)?;
        let settings = config.login_settings()?;
        let res = Self::connect_inner(config, palette, &settings, session);
        if let Err(ref err) = res {
            let reason = if err.is_login_rejection() {
                DisconnectReason::LoginRejected
            } else {
                DisconnectReason::ConnectionLost
            };
            warn!("Login to {} failed: {}", config.server, err);
            events.on_event(Event::Disconnected {
                reason,
                message: err.to_string(),
            });
        }
        res
    }

    fn connect_inner(
        config: &ClientConfig,
        palette: PacketPalette,
        settings: &LoginSettings,
        session: &dyn SessionService,
    ) -> Result<Server, protocol::Error> {
        let mut conn = Conn::connect(&config.server, config.read_timeout())?;
        let connection = login::login(&mut conn, &palette, settings, session)?;

        let socket = conn.get_ref().try_clone()?;
        let (mut read, write) = conn.split()?;

        let (tx, rx) = mpsc::channel();
        let reader_palette = palette.clone();
        thread::Builder::new()
            .name("packet-reader".to_owned())
            .spawn(move || loop {
                let pck = match read.read_packet(&reader_palette) {
                    Ok(Some(pck)) => Ok(pck),
                    Ok(None) => continue,
                    Err(err) => Err(err),
                };
                let was_error = pck.is_err();
                if tx.send(pck).is_err() {
                    return;
                }
                if was_error {
                    return;
                }
            })?;

        let mut server = Server::new(write, rx, palette, connection, config.decode_workers);
        server.on_close = Some(Box::new(move || {
            let _ = socket.shutdown(std::net::Shutdown::Both);
        }));
        Ok(server)
    }
}

impl<S: Write> Server<S> {
    fn new(
        conn: Conn<S>,
        read_queue: PacketQueue,
        palette: PacketPalette,
        connection: Connection,
        decode_workers: usize,
    ) -> Server<S> {
        info!(
            "Playing as {} on protocol {} ({})",
            connection.username,
            connection.protocol_version,
            versions::release_name(connection.protocol_version).unwrap_or("?")
        );
        Server {
            conn: Some(conn),
            read_queue: Some(read_queue),
            on_close: None,
            palette,
            connection,
            decoder: ChunkDecoder::new(decode_workers),
            dimension: DimensionInfo::default(),
            dimension_codec: None,
            loaded_columns: Default::default(),
            entity_id: 0,
            gamemode: Gamemode::Survival,
            position: PlayerPosition::default(),
            window_actions: Default::default(),
            disconnected: false,
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn dimension(&self) -> &DimensionInfo {
        &self.dimension
    }

    pub fn position(&self) -> PlayerPosition {
        self.position
    }

    pub fn entity_id(&self) -> i32 {
        self.entity_id
    }

    pub fn gamemode(&self) -> Gamemode {
        self.gamemode
    }

    pub fn loaded_columns(&self) -> usize {
        self.loaded_columns.len()
    }

    pub fn pending_columns(&self) -> usize {
        self.decoder.pending_columns()
    }

    pub fn is_connected(&self) -> bool {
        !self.disconnected
    }

    /// Applies every packet received since the last tick, then every column
    /// the decoders have finished.
    pub fn tick<W: WorldSink, E: EventSink>(&mut self, world: &mut W, events: &mut E) {
        if self.disconnected {
            return;
        }
        if let Some(rx) = self.read_queue.take() {
            loop {
                match rx.try_recv() {
                    Ok(Ok(pck)) => {
                        if let Err(err) = self.handle_packet(world, events, pck) {
                            self.disconnect(events, DisconnectReason::ConnectionLost, err.to_string());
                            return;
                        }
                        if self.disconnected {
                            return;
                        }
                    }
                    Ok(Err(err)) => {
                        self.disconnect(events, DisconnectReason::ConnectionLost, err.to_string());
                        return;
                    }
                    Err(mpsc::TryRecvError::Empty) => {
                        self.read_queue = Some(rx);
                        break;
                    }
                    Err(mpsc::TryRecvError::Disconnected) => {
                        self.disconnect(
                            events,
                            DisconnectReason::ConnectionLost,
                            "connection closed".to_owned(),
                        );
                        return;
                    }
                }
            }
        }
        self.apply_decoded(world, events);
    }

    /// Closes the session from our side.
    pub fn close<E: EventSink>(&mut self, events: &mut E) {
        self.disconnect(events, DisconnectReason::ConnectionLost, "closed by client".to_owned());
    }

    fn disconnect(&mut self, events: &mut dyn EventSink, reason: DisconnectReason, message: String) {
        if self.disconnected {
            return;
        }
        warn!("Disconnected ({:?}): {}", reason, message);
        self.disconnected = true;
        self.read_queue = None;
        self.conn = None;
        self.decoder.cancel_all();
        if let Some(close) = self.on_close.take() {
            close();
        }
        events.on_event(Event::Disconnected { reason, message });
    }

    fn handle_packet<W: WorldSink, E: EventSink>(
        &mut self,
        world: &mut W,
        events: &mut E,
        pck: Packet,
    ) -> Result<(), protocol::Error> {
        handle_packet! {
            self world events pck {
                JoinGame => on_game_join,
                Respawn => on_respawn,
                KeepAliveClientbound => on_keep_alive,
                ChunkData => on_chunk_data,
                ChunkUnload => on_chunk_unload,
                BlockChange => on_block_change,
                MultiBlockChange => on_multi_block_change,
                TeleportPlayer => on_teleport,
                TimeUpdate => on_time_update,
                ChangeGameState => on_game_state_change,
                ConfirmTransaction => on_confirm_transaction,
                ServerMessage => on_server_message,
                SystemChatMessage => on_system_message,
                UpdateHealth => on_health,
                PlayerChatMessage => on_player_chat,
                SetExperience => on_experience,
                SpawnPlayer => on_spawn_player,
                SpawnObject => on_spawn_object,
                SpawnMob => on_spawn_mob,
                EntityMove => on_entity_move,
                EntityLookAndMove => on_entity_look_and_move,
                EntityLook => on_entity_look,
                EntityTeleport => on_entity_teleport,
                EntityDestroy => on_entity_destroy,
                PlayerInfo => on_player_info,
                PlayerInfoUpdate => on_player_info_update,
                PlayerInfoRemove => on_player_info_remove,
                PluginMessageClientbound => on_plugin_message,
                Disconnect => on_disconnect,
            }
        }
    }

    fn apply_decoded<W: WorldSink, E: EventSink>(&mut self, world: &mut W, events: &mut E) {
        for done in self.decoder.drain() {
            match done {
                Completed::Column(column, deferred) => {
                    let pos = column.pos;
                    trace!("Committing {:?} with {} sections", pos, column.sections.len());
                    world.commit_column(column);
                    for (block_pos, block) in deferred {
                        world.set_block(block_pos, block);
                    }
                    self.loaded_columns.insert(pos);
                    events.on_event(Event::ColumnLoaded { x: pos.x, z: pos.z });
                }
                Completed::Failed(pos, err) => {
                    self.disconnect(
                        events,
                        DisconnectReason::ConnectionLost,
                        format!("bad chunk column {:?}: {}", pos, err),
                    );
                    return;
                }
            }
        }
    }

    pub fn write_packet<T: PacketType>(&mut self, p: T) -> Result<(), protocol::Error> {
        match self.conn.as_mut() {
            Some(conn) => conn.write_packet(&self.palette, &p),
            None => Err(protocol::Error::Err("not connected".to_owned())),
        }
    }

    pub fn send_chat(&mut self, message: &str) -> Result<(), protocol::Error> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as i64);
        self.write_packet(packet::play::serverbound::ChatMessage {
            message: message.to_owned(),
            timestamp,
            ..Default::default()
        })
    }

    pub fn respawn(&mut self) -> Result<(), protocol::Error> {
        self.write_packet(packet::play::serverbound::ClientStatus {
            action_id: VarInt(0),
        })
    }

    pub fn set_held_item(&mut self, slot: i16) -> Result<(), protocol::Error> {
        self.write_packet(packet::play::serverbound::HeldItemChange { slot })
    }

    pub fn send_position(&mut self, position: PlayerPosition, on_ground: bool) -> Result<(), protocol::Error> {
        self.position = position;
        self.write_packet(packet::play::serverbound::PlayerPositionLook {
            x: position.x,
            y: position.y,
            z: position.z,
            yaw: position.yaw,
            pitch: position.pitch,
            on_ground,
        })
    }

    pub fn send_plugin_message(&mut self, channel: &str, data: &[u8]) -> Result<(), protocol::Error> {
        self.write_packet(packet::play::serverbound::PluginMessageServerbound {
            channel: channel.to_owned(),
            data: data.to_vec(),
        })
    }

    fn version(&self) -> i32 {
        self.connection.protocol_version
    }

    fn on_keep_alive(
        &mut self,
        _: &mut dyn WorldSink,
        _: &mut dyn EventSink,
        keep_alive: packet::play::clientbound::KeepAliveClientbound,
    ) -> Result<(), protocol::Error> {
        self.write_packet(packet::play::serverbound::KeepAliveServerbound {
            id: keep_alive.id,
        })
    }

    fn on_game_join(
        &mut self,
        world: &mut dyn WorldSink,
        events: &mut dyn EventSink,
        join: packet::play::clientbound::JoinGame,
    ) -> Result<(), protocol::Error> {
        let dimension = DimensionInfo::resolve(
            self.version(),
            join.dimension_id,
            join.dimension_nbt.as_ref(),
            &join.dimension_name,
            join.dimension_codec.as_ref(),
        );
        self.dimension_codec = join.dimension_codec;
        self.entity_id = join.entity_id;
        self.gamemode = Gamemode::from_int(join.gamemode as i32);
        self.change_dimension(world, events, dimension.clone());
        events.on_event(Event::JoinGame {
            entity_id: join.entity_id,
            gamemode: self.gamemode,
            dimension,
        });
        Ok(())
    }

    fn on_respawn(
        &mut self,
        world: &mut dyn WorldSink,
        events: &mut dyn EventSink,
        respawn: packet::play::clientbound::Respawn,
    ) -> Result<(), protocol::Error> {
        let dimension = DimensionInfo::resolve(
            self.version(),
            respawn.dimension_id,
            respawn.dimension_nbt.as_ref(),
            &respawn.dimension_name,
            self.dimension_codec.as_ref(),
        );
        self.gamemode = Gamemode::from_int(respawn.gamemode as i32);
        if dimension != self.dimension {
            self.change_dimension(world, events, dimension.clone());
        }
        events.on_event(Event::Respawn {
            gamemode: self.gamemode,
            dimension,
        });
        Ok(())
    }

    fn change_dimension(
        &mut self,
        world: &mut dyn WorldSink,
        events: &mut dyn EventSink,
        dimension: DimensionInfo,
    ) {
        debug!("Entering {:?}", dimension);
        self.decoder.cancel_all();
        for pos in self.loaded_columns.drain() {
            world.unload_column(pos.x, pos.z);
            events.on_event(Event::ColumnUnloaded { x: pos.x, z: pos.z });
        }
        world.set_dimension(&dimension);
        self.dimension = dimension;
    }

    fn on_time_update(
        &mut self,
        _: &mut dyn WorldSink,
        events: &mut dyn EventSink,
        time_update: packet::play::clientbound::TimeUpdate,
    ) -> Result<(), protocol::Error> {
        events.on_event(Event::TimeUpdate {
            world_age: time_update.world_age,
            time_of_day: time_update.time_of_day,
        });
        Ok(())
    }

    fn on_game_state_change(
        &mut self,
        _: &mut dyn WorldSink,
        events: &mut dyn EventSink,
        game_state: packet::play::clientbound::ChangeGameState,
    ) -> Result<(), protocol::Error> {
        if game_state.reason == 3 {
            self.gamemode = Gamemode::from_int(game_state.value as i32);
        }
        events.on_event(Event::GameStateChange {
            reason: game_state.reason,
            value: game_state.value,
        });
        Ok(())
    }

    fn on_teleport(
        &mut self,
        _: &mut dyn WorldSink,
        events: &mut dyn EventSink,
        teleport: packet::play::clientbound::TeleportPlayer,
    ) -> Result<(), protocol::Error> {
        let pos = &mut self.position;
        pos.x = calculate_relative_teleport(TeleportFlag::RelX, teleport.flags, pos.x, teleport.x);
        pos.y = calculate_relative_teleport(TeleportFlag::RelY, teleport.flags, pos.y, teleport.y);
        pos.z = calculate_relative_teleport(TeleportFlag::RelZ, teleport.flags, pos.z, teleport.z);
        pos.yaw = calculate_relative_teleport(
            TeleportFlag::RelYaw,
            teleport.flags,
            pos.yaw as f64,
            teleport.yaw as f64,
        ) as f32;
        pos.pitch = calculate_relative_teleport(
            TeleportFlag::RelPitch,
            teleport.flags,
            pos.pitch as f64,
            teleport.pitch as f64,
        ) as f32;
        let pos = *pos;

        events.on_event(Event::Teleport {
            x: pos.x,
            y: pos.y,
            z: pos.z,
            yaw: pos.yaw,
            pitch: pos.pitch,
        });
        self.write_packet(packet::play::serverbound::TeleportConfirm {
            teleport_id: teleport.teleport_id,
        })?;
        self.send_position(pos, false)
    }

    fn on_chunk_data(
        &mut self,
        _: &mut dyn WorldSink,
        _: &mut dyn EventSink,
        chunk_data: packet::play::clientbound::ChunkData,
    ) -> Result<(), protocol::Error> {
        let job = ColumnJob::from_packet(chunk_data, self.version(), &self.dimension);
        self.decoder.submit(job)
    }

    fn on_chunk_unload(
        &mut self,
        world: &mut dyn WorldSink,
        events: &mut dyn EventSink,
        chunk_unload: packet::play::clientbound::ChunkUnload,
    ) -> Result<(), protocol::Error> {
        let pos = ChunkPos::new(chunk_unload.x, chunk_unload.z);
        self.decoder.cancel(pos);
        world.unload_column(pos.x, pos.z);
        if self.loaded_columns.remove(&pos) {
            events.on_event(Event::ColumnUnloaded { x: pos.x, z: pos.z });
        }
        Ok(())
    }

    fn set_block(&mut self, world: &mut dyn WorldSink, pos: Position, block: i32) -> Result<(), protocol::Error> {
        let block = u16::try_from(block)
            .map_err(|_| protocol::Error::Err(format!("block state {} at {:?} out of range", block, pos)))?;
        if !self.decoder.defer_block(pos, block) {
            world.set_block(pos, block);
        }
        Ok(())
    }

    fn on_block_change(
        &mut self,
        world: &mut dyn WorldSink,
        _: &mut dyn EventSink,
        block_change: packet::play::clientbound::BlockChange,
    ) -> Result<(), protocol::Error> {
        let pos = block_change.position(self.version());
        self.set_block(world, pos, block_change.block_id.0)
    }

    fn on_multi_block_change(
        &mut self,
        world: &mut dyn WorldSink,
        _: &mut dyn EventSink,
        block_change: packet::play::clientbound::MultiBlockChange,
    ) -> Result<(), protocol::Error> {
        if self.version() < versions::SECTION_BLOCK_CHANGE {
            let ox = block_change.chunk_x << 4;
            let oz = block_change.chunk_z << 4;
            for record in block_change.records.data {
                let pos = Position::new(
                    ox + (record.xz >> 4) as i32,
                    record.y as i32,
                    oz + (record.xz & 0xF) as i32,
                );
                self.set_block(world, pos, record.block_id.0)?;
            }
        } else {
            let section = block_change.section_position as i64;
            let sx = (section >> 42) as i32;
            let sy = (section << 44 >> 44) as i32;
            let sz = (section << 22 >> 42) as i32;
            for record in block_change.packed_records.data {
                let record = record.0 as u64;
                let pos = Position::new(
                    (sx << 4) + ((record >> 8) & 0xF) as i32,
                    (sy << 4) + (record & 0xF) as i32,
                    (sz << 4) + ((record >> 4) & 0xF) as i32,
                );
                let block = i32::try_from(record >> 12).unwrap_or(-1);
                self.set_block(world, pos, block)?;
            }
        }
        Ok(())
    }

    fn on_confirm_transaction(
        &mut self,
        _: &mut dyn WorldSink,
        _: &mut dyn EventSink,
        transaction: packet::play::clientbound::ConfirmTransaction,
    ) -> Result<(), protocol::Error> {
        self.window_actions.insert(transaction.id, transaction.action_number);
        if transaction.accepted {
            return Ok(());
        }
        debug!(
            "Transaction {} of window {} rejected",
            transaction.action_number, transaction.id
        );
        self.write_packet(packet::play::serverbound::ConfirmTransactionServerbound {
            id: transaction.id,
            action_number: transaction.action_number,
            accepted: false,
        })
    }

    pub fn last_window_action(&self, window: u8) -> Option<i16> {
        self.window_actions.get(&window).copied()
    }

    fn on_server_message(
        &mut self,
        _: &mut dyn WorldSink,
        events: &mut dyn EventSink,
        msg: packet::play::clientbound::ServerMessage,
    ) -> Result<(), protocol::Error> {
        events.on_event(Event::Chat {
            message: msg.message.to_string(),
            overlay: msg.position == 2,
        });
        Ok(())
    }

    fn on_system_message(
        &mut self,
        _: &mut dyn WorldSink,
        events: &mut dyn EventSink,
        msg: packet::play::clientbound::SystemChatMessage,
    ) -> Result<(), protocol::Error> {
        let overlay = if self.version() < versions::V1_19_2 {
            msg.kind.0 == 2
        } else {
            msg.overlay
        };
        events.on_event(Event::Chat {
            message: msg.message.to_string(),
            overlay,
        });
        Ok(())
    }

    fn on_player_chat(
        &mut self,
        _: &mut dyn WorldSink,
        events: &mut dyn EventSink,
        msg: packet::play::clientbound::PlayerChatMessage,
    ) -> Result<(), protocol::Error> {
        events.on_event(Event::Chat {
            message: msg.text(self.version()),
            overlay: false,
        });
        Ok(())
    }

    fn on_experience(
        &mut self,
        _: &mut dyn WorldSink,
        events: &mut dyn EventSink,
        xp: packet::play::clientbound::SetExperience,
    ) -> Result<(), protocol::Error> {
        events.on_event(Event::Experience {
            bar: xp.experience_bar,
            level: xp.level.0,
            total: xp.total_experience.0,
        });
        Ok(())
    }

    fn on_health(
        &mut self,
        _: &mut dyn WorldSink,
        events: &mut dyn EventSink,
        health: packet::play::clientbound::UpdateHealth,
    ) -> Result<(), protocol::Error> {
        events.on_event(Event::Health {
            health: health.health,
            food: health.food.0,
            saturation: health.food_saturation,
        });
        Ok(())
    }

    fn on_spawn_player(
        &mut self,
        _: &mut dyn WorldSink,
        events: &mut dyn EventSink,
        spawn: packet::play::clientbound::SpawnPlayer,
    ) -> Result<(), protocol::Error> {
        events.on_event(Event::SpawnPlayer {
            entity_id: spawn.entity_id.0,
            uuid: spawn.uuid,
            x: spawn.x,
            y: spawn.y,
            z: spawn.z,
        });
        Ok(())
    }

    fn on_spawn_object(
        &mut self,
        _: &mut dyn WorldSink,
        events: &mut dyn EventSink,
        spawn: packet::play::clientbound::SpawnObject,
    ) -> Result<(), protocol::Error> {
        events.on_event(Event::SpawnEntity {
            entity_id: spawn.entity_id.0,
            uuid: spawn.uuid,
            entity_type: spawn.entity_type(self.version()),
            living: false,
            x: spawn.x,
            y: spawn.y,
            z: spawn.z,
        });
        Ok(())
    }

    fn on_spawn_mob(
        &mut self,
        _: &mut dyn WorldSink,
        events: &mut dyn EventSink,
        spawn: packet::play::clientbound::SpawnMob,
    ) -> Result<(), protocol::Error> {
        events.on_event(Event::SpawnEntity {
            entity_id: spawn.entity_id.0,
            uuid: spawn.uuid,
            entity_type: spawn.ty.0,
            living: true,
            x: spawn.x,
            y: spawn.y,
            z: spawn.z,
        });
        Ok(())
    }

    fn on_entity_move(
        &mut self,
        _: &mut dyn WorldSink,
        events: &mut dyn EventSink,
        m: packet::play::clientbound::EntityMove,
    ) -> Result<(), protocol::Error> {
        events.on_event(Event::EntityMoved {
            entity_id: m.entity_id.0,
            dx: move_delta(m.delta_x),
            dy: move_delta(m.delta_y),
            dz: move_delta(m.delta_z),
            on_ground: m.on_ground,
        });
        Ok(())
    }

    fn on_entity_look_and_move(
        &mut self,
        _: &mut dyn WorldSink,
        events: &mut dyn EventSink,
        m: packet::play::clientbound::EntityLookAndMove,
    ) -> Result<(), protocol::Error> {
        events.on_event(Event::EntityMoved {
            entity_id: m.entity_id.0,
            dx: move_delta(m.delta_x),
            dy: move_delta(m.delta_y),
            dz: move_delta(m.delta_z),
            on_ground: m.on_ground,
        });
        events.on_event(Event::EntityRotated {
            entity_id: m.entity_id.0,
            yaw: angle(m.yaw),
            pitch: angle(m.pitch),
        });
        Ok(())
    }

    fn on_entity_look(
        &mut self,
        _: &mut dyn WorldSink,
        events: &mut dyn EventSink,
        look: packet::play::clientbound::EntityLook,
    ) -> Result<(), protocol::Error> {
        events.on_event(Event::EntityRotated {
            entity_id: look.entity_id.0,
            yaw: angle(look.yaw),
            pitch: angle(look.pitch),
        });
        Ok(())
    }

    fn on_entity_teleport(
        &mut self,
        _: &mut dyn WorldSink,
        events: &mut dyn EventSink,
        tp: packet::play::clientbound::EntityTeleport,
    ) -> Result<(), protocol::Error> {
        events.on_event(Event::EntityTeleported {
            entity_id: tp.entity_id.0,
            x: tp.x,
            y: tp.y,
            z: tp.z,
            on_ground: tp.on_ground,
        });
        events.on_event(Event::EntityRotated {
            entity_id: tp.entity_id.0,
            yaw: angle(tp.yaw),
            pitch: angle(tp.pitch),
        });
        Ok(())
    }

    fn on_player_info(
        &mut self,
        _: &mut dyn WorldSink,
        events: &mut dyn EventSink,
        info: packet::play::clientbound::PlayerInfo,
    ) -> Result<(), protocol::Error> {
        let changes = info.changes(self.version())?;
        for entry in changes.added {
            events.on_event(Event::PlayerListAdd {
                uuid: entry.uuid,
                name: entry.name,
            });
        }
        if !changes.removed.is_empty() {
            events.on_event(Event::PlayerListRemove(changes.removed));
        }
        Ok(())
    }

    fn on_player_info_update(
        &mut self,
        _: &mut dyn WorldSink,
        events: &mut dyn EventSink,
        info: packet::play::clientbound::PlayerInfoUpdate,
    ) -> Result<(), protocol::Error> {
        for entry in info.added()? {
            events.on_event(Event::PlayerListAdd {
                uuid: entry.uuid,
                name: entry.name,
            });
        }
        Ok(())
    }

    fn on_player_info_remove(
        &mut self,
        _: &mut dyn WorldSink,
        events: &mut dyn EventSink,
        info: packet::play::clientbound::PlayerInfoRemove,
    ) -> Result<(), protocol::Error> {
        events.on_event(Event::PlayerListRemove(info.players.data));
        Ok(())
    }

    fn on_entity_destroy(
        &mut self,
        _: &mut dyn WorldSink,
        events: &mut dyn EventSink,
        destroy: packet::play::clientbound::EntityDestroy,
    ) -> Result<(), protocol::Error> {
        events.on_event(Event::EntitiesDestroyed(destroy.ids(self.version())));
        Ok(())
    }

    fn on_plugin_message(
        &mut self,
        _: &mut dyn WorldSink,
        events: &mut dyn EventSink,
        msg: packet::play::clientbound::PluginMessageClientbound,
    ) -> Result<(), protocol::Error> {
        events.on_event(Event::PluginMessage {
            channel: msg.channel,
            data: msg.data,
        });
        Ok(())
    }

    fn on_disconnect(
        &mut self,
        _: &mut dyn WorldSink,
        events: &mut dyn EventSink,
        disconnect: packet::play::clientbound::Disconnect,
    ) -> Result<(), protocol::Error> {
        self.disconnect(events, DisconnectReason::InGameKick, disconnect.reason.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum TeleportFlag {
    RelX = 0b00001,
    RelY = 0b00010,
    RelZ = 0b00100,
    RelYaw = 0b01000,
    RelPitch = 0b10000,
}

/// Entity movement deltas are sent in 1/4096ths of a block.
fn move_delta(val: i16) -> f64 {
    val as f64 / 4096.0
}

/// Angles are sent in 1/256ths of a turn.
fn angle(val: i8) -> f32 {
    (val as u8) as f32 * 360.0 / 256.0
}

fn calculate_relative_teleport(flag: TeleportFlag, flags: u8, base: f64, val: f64) -> f64 {
    if (flags & (flag as u8)) == 0 {
        val
    } else {
        base + val
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::protocol::{Direction, LenPrefixed, LenPrefixedBytes, State, VarLong};
    use crate::server::login::Phase;
    use crate::world::section::test::encode_section;
    use crate::world::section::{SectionFormat, SECTION_VOLUME};
    use crate::world::World;
    use std::io::Cursor;
    use std::time::{Duration, Instant};

    type Feed = mpsc::Sender<Result<Packet, protocol::Error>>;

    struct OfflineSession;

    impl SessionService for OfflineSession {
        fn verify_session(&self, _: &protocol::UUID, _: &str, _: &str) -> Result<bool, protocol::Error> {
            Ok(false)
        }
    }

    fn session(version: i32) -> (Server<Vec<u8>>, Feed) {
        let palette = PacketPalette::for_version(version, false).unwrap();
        let (tx, rx) = mpsc::channel();
        let mut conn = Conn::new(Vec::new(), Direction::Serverbound);
        conn.state = State::Play;
        let connection = Connection {
            protocol_version: version,
            phase: Phase::Playing,
            compression_threshold: 0,
            shared_secret: None,
            mod_layer: false,
            username: "steve".to_owned(),
            uuid: Default::default(),
        };
        (Server::new(conn, rx, palette, connection, 1), tx)
    }

    /// Everything the session has written so far, decoded.
    fn sent(server: &Server<Vec<u8>>) -> Vec<Packet> {
        let bytes = server.conn.as_ref().map(|c| c.get_ref().clone()).unwrap_or_default();
        let mut conn = Conn::new(Cursor::new(bytes), Direction::Clientbound);
        conn.state = State::Play;
        let mut out = vec![];
        while let Ok(pck) = conn.read_packet(&server.palette) {
            out.extend(pck);
        }
        out
    }

    fn tick_until<F: Fn(&World, &[Event]) -> bool>(
        server: &mut Server<Vec<u8>>,
        world: &mut World,
        events: &mut Vec<Event>,
        done: F,
    ) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !done(&*world, &events[..]) {
            assert!(Instant::now() < deadline, "timed out, events: {:?}", events);
            server.tick(world, events);
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn chunk(version: i32, x: i32, z: i32, block: i32) -> Packet {
        let format = SectionFormat::for_version(version, true);
        let mut data = encode_section(format, 4, &[0, block], &vec![1; SECTION_VOLUME]);
        if version < versions::V1_13 {
            data.extend_from_slice(&[0; 256]);
        }
        Packet::ChunkData(packet::play::clientbound::ChunkData {
            chunk_x: x,
            chunk_z: z,
            full_chunk: true,
            bitmask: VarInt(1),
            data: LenPrefixedBytes::new(data),
            ..Default::default()
        })
    }

    #[test]
    fn keep_alive_is_answered() {
        let (mut server, tx) = session(versions::V1_16_2);
        tx.send(Ok(Packet::KeepAliveClientbound(
            packet::play::clientbound::KeepAliveClientbound { id: 42 },
        )))
        .unwrap();
        server.tick(&mut World::new(), &mut vec![]);
        match sent(&server).as_slice() {
            [Packet::KeepAliveServerbound(ka)] => assert_eq!(ka.id, 42),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn relative_teleport_is_confirmed_and_echoed() {
        let (mut server, tx) = session(versions::V1_18);
        let teleport = |x, flags, id| {
            Packet::TeleportPlayer(packet::play::clientbound::TeleportPlayer {
                x,
                y: 64.0,
                z: -3.5,
                yaw: 90.0,
                flags,
                teleport_id: VarInt(id),
                ..Default::default()
            })
        };
        tx.send(Ok(teleport(10.0, 0, 1))).unwrap();
        tx.send(Ok(teleport(2.5, 0b01001, 2))).unwrap();
        let mut events = vec![];
        server.tick(&mut World::new(), &mut events);

        let pos = server.position();
        assert_eq!(pos.x, 12.5);
        assert_eq!(pos.y, 64.0);
        assert_eq!(pos.yaw, 180.0);
        assert_eq!(events.len(), 2);

        let sent = sent(&server);
        assert_eq!(sent.len(), 4);
        match (&sent[2], &sent[3]) {
            (Packet::TeleportConfirm(confirm), Packet::PlayerPositionLook(look)) => {
                assert_eq!(confirm.teleport_id.0, 2);
                assert_eq!(look.x, 12.5);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn block_changes_wait_for_their_column() {
        let (mut server, tx) = session(versions::V1_16_2);
        let mut world = World::new();
        let mut events = vec![];
        tx.send(Ok(chunk(versions::V1_16_2, 0, 0, 7))).unwrap();
        tx.send(Ok(Packet::BlockChange(packet::play::clientbound::BlockChange {
            location: Position::new(3, 4, 5),
            block_id: VarInt(9),
            ..Default::default()
        })))
        .unwrap();
        tick_until(&mut server, &mut world, &mut events, |_, events| {
            events.contains(&Event::ColumnLoaded { x: 0, z: 0 })
        });
        assert_eq!(world.get_block(Position::new(3, 4, 5)), 9);
        assert_eq!(world.get_block(Position::new(3, 5, 5)), 7);
        assert_eq!(server.loaded_columns(), 1);
    }

    #[test]
    fn section_multi_block_change() {
        let (mut server, tx) = session(versions::V1_18);
        let mut world = World::new();
        // section (-1, 0, 2) relative to min y 0
        let sx: i64 = -1;
        let sy: i64 = 0;
        let sz: i64 = 2;
        let section = ((sx & 0x3F_FFFF) << 42) | ((sz & 0x3F_FFFF) << 20) | (sy & 0xF_FFFF);
        let record = (5i64 << 12) | (1 << 8) | (2 << 4) | 3;
        tx.send(Ok(Packet::MultiBlockChange(
            packet::play::clientbound::MultiBlockChange {
                section_position: section as u64,
                packed_records: LenPrefixed::new(vec![VarLong(record)]),
                ..Default::default()
            },
        )))
        .unwrap();
        world.set_dimension(&DimensionInfo::legacy(0));
        world.store_chunk_section(-1, 2, 0, Default::default());
        server.tick(&mut world, &mut vec![]);
        assert_eq!(world.get_block(Position::new(-15, 3, 34)), 5);
    }

    #[test]
    fn rejected_transactions_are_echoed() {
        let (mut server, tx) = session(versions::V1_12_2);
        for accepted in [true, false] {
            tx.send(Ok(Packet::ConfirmTransaction(
                packet::play::clientbound::ConfirmTransaction {
                    id: 1,
                    action_number: if accepted { 3 } else { 4 },
                    accepted,
                },
            )))
            .unwrap();
        }
        server.tick(&mut World::new(), &mut vec![]);
        assert_eq!(server.last_window_action(1), Some(4));
        match sent(&server).as_slice() {
            [Packet::ConfirmTransactionServerbound(echo)] => {
                assert_eq!(echo.action_number, 4);
                assert!(!echo.accepted);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn respawn_in_another_dimension_unloads_columns() {
        let (mut server, tx) = session(versions::V1_12_2);
        let mut world = World::new();
        let mut events = vec![];
        tx.send(Ok(chunk(versions::V1_12_2, 1, 1, 16))).unwrap();
        tick_until(&mut server, &mut world, &mut events, |world, _| world.is_loaded(1, 1));

        tx.send(Ok(Packet::Respawn(packet::play::clientbound::Respawn {
            dimension_id: -1,
            ..Default::default()
        })))
        .unwrap();
        server.tick(&mut world, &mut events);
        assert!(!world.is_loaded(1, 1));
        assert!(!server.dimension().has_skylight);
        assert!(events.contains(&Event::ColumnUnloaded { x: 1, z: 1 }));
        assert_eq!(server.loaded_columns(), 0);
    }

    #[test]
    fn kick_is_reported_once() {
        let (mut server, tx) = session(versions::V1_19_4);
        let mut events = vec![];
        tx.send(Ok(Packet::SystemChatMessage(
            packet::play::clientbound::SystemChatMessage {
                message: crate::format::Component::from_string("hi"),
                overlay: true,
                ..Default::default()
            },
        )))
        .unwrap();
        tx.send(Ok(Packet::Disconnect(packet::play::clientbound::Disconnect {
            reason: crate::format::Component::from_string("{\"text\":\"bye\"}"),
        })))
        .unwrap();
        server.tick(&mut World::new(), &mut events);
        drop(tx);
        server.tick(&mut World::new(), &mut events);

        assert_eq!(
            events,
            vec![
                Event::Chat {
                    message: "hi".to_owned(),
                    overlay: true,
                },
                Event::Disconnected {
                    reason: DisconnectReason::InGameKick,
                    message: "bye".to_owned(),
                },
            ]
        );
        assert!(!server.is_connected());
        assert!(server.send_chat("still here?").is_err());
    }

    #[test]
    fn entities_and_player_list() {
        use crate::protocol::{Serializable, UUID};
        let (mut server, tx) = session(versions::V1_19_3);
        let mut entries = vec![];
        VarInt(1).write_to(&mut entries).unwrap();
        UUID(1, 2).write_to(&mut entries).unwrap();
        "Alex".to_owned().write_to(&mut entries).unwrap();
        VarInt(0).write_to(&mut entries).unwrap();
        let packets = vec![
            Packet::PlayerInfoUpdate(packet::play::clientbound::PlayerInfoUpdate {
                actions: packet::play::clientbound::PlayerInfoUpdate::ADD_PLAYER,
                entries,
            }),
            Packet::SpawnObject(packet::play::clientbound::SpawnObject {
                entity_id: VarInt(9),
                uuid: UUID(0, 9),
                ty: VarInt(102),
                x: 1.0,
                y: 2.0,
                z: 3.0,
                ..Default::default()
            }),
            Packet::EntityLookAndMove(packet::play::clientbound::EntityLookAndMove {
                entity_id: VarInt(9),
                delta_x: 4096,
                delta_y: -2048,
                delta_z: 0,
                yaw: -128,
                pitch: 64,
                on_ground: true,
            }),
            Packet::PlayerChatMessage(packet::play::clientbound::PlayerChatMessage {
                plain_message: "hello".to_owned(),
                network_name: crate::format::Component::from_string("Alex"),
                ..Default::default()
            }),
            Packet::SetExperience(packet::play::clientbound::SetExperience {
                experience_bar: 0.5,
                level: VarInt(3),
                total_experience: VarInt(40),
            }),
            Packet::PlayerInfoRemove(packet::play::clientbound::PlayerInfoRemove {
                players: LenPrefixed::new(vec![UUID(1, 2)]),
            }),
        ];
        for pck in packets {
            tx.send(Ok(pck)).unwrap();
        }
        let mut events = vec![];
        server.tick(&mut World::new(), &mut events);

        assert_eq!(
            events,
            vec![
                Event::PlayerListAdd {
                    uuid: UUID(1, 2),
                    name: "Alex".to_owned(),
                },
                Event::SpawnEntity {
                    entity_id: 9,
                    uuid: UUID(0, 9),
                    entity_type: 102,
                    living: false,
                    x: 1.0,
                    y: 2.0,
                    z: 3.0,
                },
                Event::EntityMoved {
                    entity_id: 9,
                    dx: 1.0,
                    dy: -0.5,
                    dz: 0.0,
                    on_ground: true,
                },
                Event::EntityRotated {
                    entity_id: 9,
                    yaw: 180.0,
                    pitch: 90.0,
                },
                Event::Chat {
                    message: "<Alex> hello".to_owned(),
                    overlay: false,
                },
                Event::Experience {
                    bar: 0.5,
                    level: 3,
                    total: 40,
                },
                Event::PlayerListRemove(vec![UUID(1, 2)]),
            ]
        );
        assert!(server.is_connected());
    }

    #[test]
    fn legacy_mobs_and_teleports() {
        use crate::protocol::UUID;
        let (mut server, tx) = session(versions::V1_12_2);
        tx.send(Ok(Packet::SpawnObject(packet::play::clientbound::SpawnObject {
            entity_id: VarInt(4),
            ty_i8: 2,
            ..Default::default()
        })))
        .unwrap();
        tx.send(Ok(Packet::SpawnMob(packet::play::clientbound::SpawnMob {
            entity_id: VarInt(5),
            uuid: UUID(5, 5),
            ty: VarInt(54),
            y: 64.0,
            ..Default::default()
        })))
        .unwrap();
        tx.send(Ok(Packet::EntityTeleport(packet::play::clientbound::EntityTeleport {
            entity_id: VarInt(5),
            x: -8.5,
            y: 70.0,
            z: 0.5,
            yaw: 0,
            pitch: 0,
            on_ground: false,
        })))
        .unwrap();
        let mut events = vec![];
        server.tick(&mut World::new(), &mut events);

        assert!(matches!(
            events[0],
            Event::SpawnEntity { entity_id: 4, entity_type: 2, living: false, .. }
        ));
        assert!(matches!(
            events[1],
            Event::SpawnEntity { entity_id: 5, entity_type: 54, living: true, .. }
        ));
        assert_eq!(
            events[2..],
            [
                Event::EntityTeleported {
                    entity_id: 5,
                    x: -8.5,
                    y: 70.0,
                    z: 0.5,
                    on_ground: false,
                },
                Event::EntityRotated {
                    entity_id: 5,
                    yaw: 0.0,
                    pitch: 0.0,
                },
            ]
        );
    }

    #[test]
    fn closed_stream_is_connection_lost() {
        let (mut server, tx) = session(versions::V1_20);
        drop(tx);
        let mut events = vec![];
        server.tick(&mut World::new(), &mut events);
        match events.as_slice() {
            [Event::Disconnected { reason, .. }] => {
                assert_eq!(*reason, DisconnectReason::ConnectionLost)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn local_login_errors_are_not_disconnects() {
        let session = OfflineSession;
        let mut events = vec![];
        let config = ClientConfig {
            protocol_version: 1,
            ..Default::default()
        };
        let err = Server::connect(&config, &session, &mut events).map(|_| ()).unwrap_err();
        assert!(matches!(err, protocol::Error::UnsupportedVersion(1)));

        let config = ClientConfig {
            client_key: Some("zz".to_owned()),
            ..Default::default()
        };
        let err = Server::connect(&config, &session, &mut events).map(|_| ()).unwrap_err();
        assert!(matches!(err, protocol::Error::Config(_)));
        assert!(events.is_empty());
    }

    #[test]
    fn login_kick_is_a_rejection() {
        use std::net::TcpListener;

        let version = versions::V1_16_2;
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let remote = thread::spawn(move || {
            let palette = PacketPalette::for_version(version, false).unwrap();
            let (stream, _) = listener.accept().unwrap();
            let mut conn = Conn::new(stream, Direction::Clientbound);
            while conn.read_packet(&palette).unwrap().is_none() {}
            conn.state = State::Login;
            while conn.read_packet(&palette).unwrap().is_none() {}
            conn.write_packet(
                &palette,
                &packet::login::clientbound::LoginDisconnect {
                    reason: crate::format::Component::from_string("{\"text\":\"banned\"}"),
                },
            )
            .unwrap();
        });

        let config = ClientConfig {
            server: addr.to_string(),
            protocol_version: version,
            offline: true,
            ..Default::default()
        };
        let session = OfflineSession;
        let mut events = vec![];
        let err = Server::connect(&config, &session, &mut events).map(|_| ()).unwrap_err();
        remote.join().unwrap();
        assert!(matches!(err, protocol::Error::Disconnect(_)));
        assert_eq!(
            events,
            vec![Event::Disconnected {
                reason: DisconnectReason::LoginRejected,
                message: "banned".to_owned(),
            }]
        );
    }
}
