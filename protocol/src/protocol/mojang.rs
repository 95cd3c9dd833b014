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

use sha1::{Digest, Sha1};

use super::UUID;

const JOIN_URL: &str = "https://sessionserver.mojang.com/session/minecraft/join";

/// Something that can confirm to the session service that this client is
/// joining a server.
pub trait SessionService {
    /// Returns `Ok(false)` when the service refuses the join.
    fn verify_session(
        &self,
        uuid: &UUID,
        access_token: &str,
        server_hash: &str,
    ) -> Result<bool, super::Error>;
}

/// The online session service.
#[derive(Default)]
pub struct MojangSessionService {
    #[cfg(not(target_arch = "wasm32"))]
    client: reqwest::blocking::Client,
}

impl MojangSessionService {
    pub fn new() -> MojangSessionService {
        Default::default()
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl SessionService for MojangSessionService {
    fn verify_session(
        &self,
        uuid: &UUID,
        access_token: &str,
        server_hash: &str,
    ) -> Result<bool, super::Error> {
        let join_msg = serde_json::json!({
            "accessToken": access_token,
            "selectedProfile": format!("{:016x}{:016x}", uuid.0, uuid.1),
            "serverId": server_hash,
        });
        let res = self
            .client
            .post(JOIN_URL)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_string(&join_msg)?)
            .send()?;

        let status = res.status();
        if status.is_success() {
            Ok(true)
        } else {
            log::warn!("Session server refused join: {}", status);
            Ok(false)
        }
    }
}

/// Computes the server id hash sent to the session service: SHA-1 over the
/// server id, shared secret and public key, printed as a signed big-endian
/// number in lowercase hex.
pub fn server_hash(server_id: &str, shared_key: &[u8], public_key: &[u8]) -> String {
    let mut sha1 = Sha1::new();
    sha1.update(server_id.as_bytes());
    sha1.update(shared_key);
    sha1.update(public_key);
    let mut hash: Vec<u8> = sha1.finalize().to_vec();

    // Mojang uses a hex method which allows for
    // negatives so we have to account for that.
    let negative = (hash[0] & 0x80) == 0x80;
    if negative {
        twos_compliment(&mut hash);
    }
    let hash_str = hex::encode(&hash);
    let hash_val = hash_str.trim_start_matches('0');
    if negative {
        "-".to_owned() + hash_val
    } else {
        hash_val.to_owned()
    }
}

fn twos_compliment(data: &mut [u8]) {
    let mut carry = true;
    for i in (0..data.len()).rev() {
        data[i] = !data[i];
        if carry {
            carry = data[i] == 0xFF;
            data[i] = data[i].wrapping_add(1);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn known_hashes() {
        assert_eq!(
            server_hash("Notch", &[], &[]),
            "4ed1f46bbe04bc756bcb17c0c7ce3e4632f06a48"
        );
        assert_eq!(
            server_hash("jeb_", &[], &[]),
            "-7c9d5b0044c130109a5d7b5fb5c317c02b4e28c1"
        );
        assert_eq!(
            server_hash("simon", &[], &[]),
            "88e16a1019277b15d58faf0541e11910eb756f6"
        );
    }

    #[test]
    fn hash_is_over_the_concatenation() {
        let base = server_hash("", &[1, 2, 3], &[4, 5]);
        assert_eq!(base, server_hash("", &[1, 2, 3, 4, 5], &[]));
        assert_ne!(base, server_hash("", &[1, 2, 3], &[4, 6]));
    }
}
