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

use std::io::{Read, Write};

use log::{debug, info};

use crate::protocol::mojang::{self, SessionService};
use crate::protocol::packet::{self, Packet};
use crate::protocol::versions::{self, PacketPalette};
use crate::protocol::{self, Conn, Error, LenPrefixedBytes, State, VarInt, UUID};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    LoggingIn,
    Encrypting,
    Playing,
}

/// The negotiated state of a connection. Only `login` writes to it.
#[derive(Debug, Clone)]
pub struct Connection {
    pub protocol_version: i32,
    pub phase: Phase,
    /// `<= 0` when compression is off.
    pub compression_threshold: i32,
    pub shared_secret: Option<[u8; 16]>,
    pub mod_layer: bool,
    pub username: String,
    pub uuid: UUID,
}

impl Connection {
    fn new(palette: &PacketPalette, username: &str) -> Connection {
        Connection {
            protocol_version: palette.version(),
            phase: Phase::LoggingIn,
            compression_threshold: 0,
            shared_secret: None,
            mod_layer: palette.mod_layer(),
            username: username.to_owned(),
            uuid: UUID::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoginSettings {
    pub username: String,
    /// Sent in LoginStart from 1.19.1 when set.
    pub uuid: Option<UUID>,
    pub access_token: String,
    /// Used instead of a random shared secret.
    pub client_key: Option<[u8; 16]>,
    /// Never contact the session service.
    pub offline: bool,
}

/// The handshake host marker of the mod layer.
fn mod_marker(version: i32) -> &'static str {
    if version < versions::V1_13 {
        "\0FML\0"
    } else if version < versions::V1_18 {
        "\0FML2\0"
    } else {
        "\0FML3\0"
    }
}

/// Runs the handshake and login phases. On success the connection is in the
/// play state with compression and encryption applied.
pub fn login<S: Read + Write>(
    conn: &mut Conn<S>,
    palette: &PacketPalette,
    settings: &LoginSettings,
    session: &dyn SessionService,
) -> Result<Connection, Error> {
    let version = palette.version();
    let mut connection = Connection::new(palette, &settings.username);

    let mut host = conn.host.clone();
    if palette.mod_layer() {
        host.push_str(mod_marker(version));
    }
    conn.write_packet(
        palette,
        &packet::handshake::serverbound::Handshake {
            protocol_version: VarInt(version),
            host,
            port: conn.port,
            next: VarInt(2),
        },
    )?;
    conn.state = State::Login;
    debug!("Handshake sent, logging in as {}", settings.username);

    conn.write_packet(
        palette,
        &packet::login::serverbound::LoginStart {
            username: settings.username.clone(),
            has_uuid: settings.uuid.is_some(),
            uuid: settings.uuid.unwrap_or_default(),
            ..Default::default()
        },
    )?;

    loop {
        let pck = match conn.read_packet(palette)? {
            Some(pck) => pck,
            None => continue,
        };
        match pck {
            Packet::SetInitialCompression(val) => {
                conn.set_compresssion(val.threshold.0);
                connection.compression_threshold = val.threshold.0;
                info!("Compression threshold set to {}", val.threshold.0);
            }
            Packet::EncryptionRequest(val) => {
                connection.phase = Phase::Encrypting;
                debug!("Login phase {:?}", connection.phase);
                let secret = settings.client_key.unwrap_or_else(rand::random);

                if val.server_id == "-" || settings.offline {
                    debug!("Skipping session verification");
                } else {
                    let uuid = settings.uuid.ok_or_else(|| {
                        Error::Config("online login needs the player's uuid".to_owned())
                    })?;
                    let hash = mojang::server_hash(&val.server_id, &secret, &val.public_key.data);
                    if !session.verify_session(&uuid, &settings.access_token, &hash)? {
                        return Err(Error::Authentication(
                            "session service refused the join".to_owned(),
                        ));
                    }
                }

                let shared_e = rsa_encrypt(&val.public_key.data, &secret)?;
                let token_e = rsa_encrypt(&val.public_key.data, &val.verify_token.data)?;
                conn.write_packet(
                    palette,
                    &packet::login::serverbound::EncryptionResponse {
                        shared_secret: LenPrefixedBytes::new(shared_e),
                        has_verify_token: true,
                        verify_token: LenPrefixedBytes::new(token_e),
                        ..Default::default()
                    },
                )?;
                conn.enable_encyption(&secret)?;
                connection.shared_secret = Some(secret);
                info!("Encryption enabled");
            }
            Packet::LoginPluginRequest(val) => {
                debug!("Declining login plugin request on {}", val.channel);
                conn.write_packet(
                    palette,
                    &packet::login::serverbound::LoginPluginResponse {
                        message_id: val.message_id,
                        successful: false,
                        data: vec![],
                    },
                )?;
            }
            Packet::LoginSuccess(val) => {
                connection.uuid = if version < versions::V1_16 {
                    val.uuid_string.parse()?
                } else {
                    val.uuid
                };
                connection.username = val.username;
                connection.phase = Phase::Playing;
                conn.state = State::Play;
                debug!("Login phase {:?}: {} {}", connection.phase, connection.username, connection.uuid);
                return Ok(connection);
            }
            Packet::LoginDisconnect(val) => return Err(Error::Disconnect(val.reason)),
            other => debug!("Ignoring {:?} during login", other.kind()),
        }
    }
}

fn rsa_encrypt(public_key: &[u8], data: &[u8]) -> Result<Vec<u8>, protocol::Error> {
    rsa_public_encrypt_pkcs1::encrypt(public_key, data)
        .map_err(|err| Error::Err(format!("failed to encrypt with the server key: {:?}", err)))
}
