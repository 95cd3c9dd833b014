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

use super::dimension::DimensionInfo;
use crate::protocol::UUID;
use crate::types::Gamemode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    ConnectionLost,
    LoginRejected,
    InGameKick,
}

/// High level happenings of a play session, in wire order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    JoinGame {
        entity_id: i32,
        gamemode: Gamemode,
        dimension: DimensionInfo,
    },
    Respawn {
        gamemode: Gamemode,
        dimension: DimensionInfo,
    },
    Chat {
        message: String,
        overlay: bool,
    },
    SpawnPlayer {
        entity_id: i32,
        uuid: UUID,
        x: f64,
        y: f64,
        z: f64,
    },
    /// Any entity other than a player. `living` marks the pre 1.19 mob
    /// spawn packet.
    SpawnEntity {
        entity_id: i32,
        uuid: UUID,
        entity_type: i32,
        living: bool,
        x: f64,
        y: f64,
        z: f64,
    },
    /// Relative movement in blocks.
    EntityMoved {
        entity_id: i32,
        dx: f64,
        dy: f64,
        dz: f64,
        on_ground: bool,
    },
    /// Absolute rotation in degrees.
    EntityRotated {
        entity_id: i32,
        yaw: f32,
        pitch: f32,
    },
    EntityTeleported {
        entity_id: i32,
        x: f64,
        y: f64,
        z: f64,
        on_ground: bool,
    },
    EntitiesDestroyed(Vec<i32>),
    PlayerListAdd {
        uuid: UUID,
        name: String,
    },
    PlayerListRemove(Vec<UUID>),
    Experience {
        bar: f32,
        level: i32,
        total: i32,
    },
    Health {
        health: f32,
        food: i32,
        saturation: f32,
    },
    TimeUpdate {
        world_age: i64,
        time_of_day: i64,
    },
    GameStateChange {
        reason: u8,
        value: f32,
    },
    Teleport {
        x: f64,
        y: f64,
        z: f64,
        yaw: f32,
        pitch: f32,
    },
    PluginMessage {
        channel: String,
        data: Vec<u8>,
    },
    ColumnLoaded {
        x: i32,
        z: i32,
    },
    ColumnUnloaded {
        x: i32,
        z: i32,
    },
    /// Sent exactly once, as the last event of a session.
    Disconnected {
        reason: DisconnectReason,
        message: String,
    },
}

pub trait EventSink {
    fn on_event(&mut self, event: Event);
}

impl EventSink for Vec<Event> {
    fn on_event(&mut self, event: Event) {
        self.push(event);
    }
}
