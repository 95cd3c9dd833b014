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

use log::{debug, warn};

use crate::nbt;
use crate::protocol::versions;

/// The parts of a dimension type that change how columns are decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionInfo {
    pub name: String,
    pub min_y: i32,
    /// `None` when the server never told us; columns are then read until
    /// their data runs out.
    pub height: Option<i32>,
    pub has_skylight: bool,
}

impl Default for DimensionInfo {
    fn default() -> Self {
        DimensionInfo::legacy(0)
    }
}

impl DimensionInfo {
    /// Dimensions sent as an integer id before 1.16.
    pub fn legacy(id: i32) -> DimensionInfo {
        DimensionInfo {
            name: match id {
                -1 => "minecraft:the_nether",
                1 => "minecraft:the_end",
                _ => "minecraft:overworld",
            }
            .to_owned(),
            min_y: 0,
            height: Some(256),
            has_skylight: id == 0,
        }
    }

    /// Fills in from a dimension type compound (`height`, `min_y`,
    /// `has_skylight`). Missing keys keep the pre-1.17 defaults.
    pub fn from_element(name: &str, element: &nbt::Tag) -> DimensionInfo {
        let int = |key: &str| element.get(key).and_then(nbt::Tag::as_i64);
        DimensionInfo {
            name: name.to_owned(),
            min_y: int("min_y").unwrap_or(0) as i32,
            height: Some(int("height").unwrap_or(256) as i32),
            has_skylight: int("has_skylight").map_or(true, |v| v != 0),
        }
    }

    /// Best guess from the name alone.
    pub fn by_name(name: &str, version: i32) -> DimensionInfo {
        let has_skylight = !(name.ends_with("the_nether") || name.ends_with("the_end"));
        let (min_y, height) = if version >= versions::V1_18 {
            (if has_skylight { -64 } else { 0 }, None)
        } else {
            (0, Some(256))
        };
        DimensionInfo {
            name: name.to_owned(),
            min_y,
            height,
            has_skylight,
        }
    }

    /// Looks a dimension type up in the registry codec sent with JoinGame.
    pub fn from_codec(codec: &nbt::Tag, name: &str, version: i32) -> Option<DimensionInfo> {
        // 1.16 keeps a flat list of dimension types, later versions a registry.
        let entries = if version < versions::V1_16_2 {
            codec.get("dimension")
        } else {
            codec.lookup("minecraft:dimension_type/value")
        }?
        .as_list()?;
        for entry in entries {
            if entry.get("name").and_then(nbt::Tag::as_str) != Some(name) {
                continue;
            }
            let element = if version < versions::V1_16_2 {
                entry
            } else {
                entry.get("element")?
            };
            return Some(DimensionInfo::from_element(name, element));
        }
        None
    }

    /// Works out the dimension from the fields JoinGame and Respawn share.
    pub fn resolve(
        version: i32,
        dimension_id: i32,
        dimension_nbt: Option<&nbt::NamedTag>,
        dimension_name: &str,
        codec: Option<&nbt::NamedTag>,
    ) -> DimensionInfo {
        if version < versions::V1_16 {
            return DimensionInfo::legacy(dimension_id);
        }
        if let Some(tag) = dimension_nbt {
            if version >= versions::V1_16_2 && version < versions::V1_19 {
                let name = tag
                    .1
                    .get("effects")
                    .and_then(nbt::Tag::as_str)
                    .unwrap_or("minecraft:overworld");
                return DimensionInfo::from_element(name, &tag.1);
            }
        }
        if let Some(info) = codec.and_then(|c| DimensionInfo::from_codec(&c.1, dimension_name, version)) {
            debug!("Dimension {} from codec: {:?}", dimension_name, info);
            return info;
        }
        warn!("Dimension {} not in codec, guessing from its name", dimension_name);
        DimensionInfo::by_name(dimension_name, version)
    }

    pub fn section_count(&self) -> Option<usize> {
        self.height.map(|h| (h.max(0) as usize + 15) / 16)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::nbt::Tag;

    fn compound(entries: Vec<(&str, Tag)>) -> Tag {
        let mut tag = Tag::new_compound();
        for (k, v) in entries {
            tag.put(k, v);
        }
        tag
    }

    fn element(min_y: i32, height: i32, skylight: bool) -> Tag {
        compound(vec![
            ("min_y", Tag::Int(min_y)),
            ("height", Tag::Int(height)),
            ("has_skylight", Tag::Byte(skylight as i8)),
        ])
    }

    #[test]
    fn legacy_ids() {
        assert!(DimensionInfo::legacy(0).has_skylight);
        assert!(!DimensionInfo::legacy(-1).has_skylight);
        assert_eq!(DimensionInfo::legacy(1).section_count(), Some(16));
    }

    #[test]
    fn nbt_dimension_between_1_16_2_and_1_19() {
        let tag = nbt::NamedTag(String::new(), element(-64, 384, true));
        let info = DimensionInfo::resolve(versions::V1_18, 0, Some(&tag), "", None);
        assert_eq!(info.min_y, -64);
        assert_eq!(info.section_count(), Some(24));
    }

    #[test]
    fn codec_lookup_by_name() {
        let entry = |name: &str, el: Tag| {
            compound(vec![
                ("name", Tag::String(name.to_owned())),
                ("id", Tag::Int(0)),
                ("element", el),
            ])
        };
        let codec = compound(vec![(
            "minecraft:dimension_type",
            compound(vec![
                ("type", Tag::String("minecraft:dimension_type".to_owned())),
                (
                    "value",
                    Tag::List(vec![
                        entry("minecraft:overworld", element(-64, 384, true)),
                        entry("minecraft:the_nether", element(0, 256, false)),
                    ]),
                ),
            ]),
        )]);
        let codec = nbt::NamedTag(String::new(), codec);
        let info =
            DimensionInfo::resolve(versions::V1_19_4, 0, None, "minecraft:the_nether", Some(&codec));
        assert!(!info.has_skylight);
        assert_eq!(info.height, Some(256));

        let guessed =
            DimensionInfo::resolve(versions::V1_19_4, 0, None, "custom:moon", Some(&codec));
        assert_eq!(guessed.height, None);
        assert!(guessed.has_skylight);
    }
}
