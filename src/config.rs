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

use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

use crate::chunk_decoder::NUM_WORKERS;
use crate::protocol::{self, versions, UUID};
use crate::server::login::LoginSettings;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// `host` or `host:port`.
    pub server: String,
    pub protocol_version: i32,
    pub username: String,
    pub uuid: Option<String>,
    pub access_token: String,
    pub mod_layer: bool,
    /// `0` disables the timeout.
    pub read_timeout_secs: u64,
    pub decode_workers: usize,
    pub log_level: String,
    /// Fixed shared secret as 32 hex digits.
    pub client_key: Option<String>,
    pub offline: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            server: "localhost:25565".to_owned(),
            protocol_version: versions::HIGHEST_SUPPORTED,
            username: "Player".to_owned(),
            uuid: None,
            access_token: String::new(),
            mod_layer: false,
            read_timeout_secs: 30,
            decode_workers: NUM_WORKERS,
            log_level: "info".to_owned(),
            client_key: None,
            offline: false,
        }
    }
}

impl ClientConfig {
    /// Reads a JSON config. A missing file gives the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ClientConfig, protocol::Error> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(data) => Self::parse(&data),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!("No config at {}, using defaults", path.display());
                Ok(ClientConfig::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn parse(data: &str) -> Result<ClientConfig, protocol::Error> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        if self.read_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.read_timeout_secs))
        }
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }

    pub fn client_key(&self) -> Result<Option<[u8; 16]>, protocol::Error> {
        let key = match self.client_key {
            Some(ref key) => key,
            None => return Ok(None),
        };
        let bytes = hex::decode(key)
            .map_err(|err| protocol::Error::Config(format!("client_key: {}", err)))?;
        let mut out = [0; 16];
        if bytes.len() != out.len() {
            return Err(protocol::Error::Config(format!(
                "client_key must be 16 bytes, got {}",
                bytes.len()
            )));
        }
        out.copy_from_slice(&bytes);
        Ok(Some(out))
    }

    pub fn login_settings(&self) -> Result<LoginSettings, protocol::Error> {
        let uuid = match self.uuid {
            Some(ref uuid) => Some(
                uuid.parse::<UUID>()
                    .map_err(|_| protocol::Error::Config(format!("uuid: {:?} is not a UUID", uuid)))?,
            ),
            None => None,
        };
        Ok(LoginSettings {
            username: self.username.clone(),
            uuid,
            access_token: self.access_token.clone(),
            client_key: self.client_key()?,
            offline: self.offline,
        })
    }
}
