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

//! Chat components as carried by disconnect and chat packets.

use serde_json::{Map, Value};
use std::fmt;

/// A chat component. Only the parts needed to show the text are kept;
/// click and hover events are dropped on parse.
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    Text(TextComponent),
    Translate(TranslateComponent),
}

impl Component {
    /// Parses the JSON form. Servers sometimes send a bare string instead,
    /// in which case legacy `§` formatting codes are converted.
    pub fn from_string(str: &str) -> Self {
        match serde_json::from_str::<Value>(str) {
            Ok(value) => Component::from_value(&value),
            Err(_) => Component::from_legacy(str),
        }
    }

    pub fn from_legacy(str: &str) -> Self {
        let mut component = Component::Text(TextComponent::new(str));
        convert_legacy(&mut component);
        component
    }

    pub fn from_value(v: &Value) -> Self {
        let modifier = Modifier::from_value(v);
        if let Some(val) = v.as_str() {
            return Component::Text(TextComponent {
                text: val.to_owned(),
                modifier,
            });
        }
        if let Some(parts) = v.as_array() {
            // An array is a text component whose first entry is the parent.
            let mut iter = parts.iter().map(Component::from_value);
            let mut first = match iter.next() {
                Some(first) => first,
                None => return Component::default(),
            };
            let rest: Vec<Component> = iter.collect();
            if !rest.is_empty() {
                first.modifier_mut().extra.get_or_insert_with(Vec::new).extend(rest);
            }
            return first;
        }
        if let Some(key) = v.get("translate").and_then(Value::as_str) {
            let args = v
                .get("with")
                .and_then(Value::as_array)
                .map(|args| args.iter().map(Component::from_value).collect())
                .unwrap_or_default();
            return Component::Translate(TranslateComponent {
                key: key.to_owned(),
                args,
                modifier,
            });
        }
        Component::Text(TextComponent {
            text: v
                .get("text")
                .map(|t| match t {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                })
                .unwrap_or_default(),
            modifier,
        })
    }

    pub fn to_value(&self) -> Value {
        match *self {
            Component::Text(ref txt) => txt.to_value(),
            Component::Translate(ref tr) => tr.to_value(),
        }
    }

    pub fn modifier(&self) -> &Modifier {
        match *self {
            Component::Text(ref txt) => &txt.modifier,
            Component::Translate(ref tr) => &tr.modifier,
        }
    }

    pub fn modifier_mut(&mut self) -> &mut Modifier {
        match *self {
            Component::Text(ref mut txt) => &mut txt.modifier,
            Component::Translate(ref mut tr) => &mut tr.modifier,
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Component::Text(ref txt) => write!(f, "{}", txt.text)?,
            Component::Translate(ref tr) => write!(f, "{}", tr)?,
        }
        if let Some(ref extra) = self.modifier().extra {
            for c in extra {
                write!(f, "{}", c)?;
            }
        }
        Ok(())
    }
}

impl Default for Component {
    fn default() -> Self {
        Component::Text(TextComponent::new(""))
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Modifier {
    pub extra: Option<Vec<Component>>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underlined: Option<bool>,
    pub strikethrough: Option<bool>,
    pub obfuscated: Option<bool>,
    pub color: Option<Color>,
}

impl Modifier {
    pub fn from_value(v: &Value) -> Self {
        let flag = |name: &str| v.get(name).and_then(Value::as_bool);
        Modifier {
            bold: flag("bold"),
            italic: flag("italic"),
            underlined: flag("underlined"),
            strikethrough: flag("strikethrough"),
            obfuscated: flag("obfuscated"),
            color: v.get("color").and_then(Value::as_str).map(Color::from_string),
            extra: v
                .get("extra")
                .and_then(Value::as_array)
                .map(|extra| extra.iter().map(Component::from_value).collect()),
        }
    }

    fn write_into(&self, obj: &mut Map<String, Value>) {
        let flags = [
            ("bold", self.bold),
            ("italic", self.italic),
            ("underlined", self.underlined),
            ("strikethrough", self.strikethrough),
            ("obfuscated", self.obfuscated),
        ];
        for (name, val) in flags {
            if let Some(val) = val {
                obj.insert(name.to_owned(), Value::Bool(val));
            }
        }
        if let Some(color) = self.color {
            obj.insert("color".to_owned(), Value::String(color.to_string()));
        }
        if let Some(ref extra) = self.extra {
            obj.insert(
                "extra".to_owned(),
                Value::Array(extra.iter().map(Component::to_value).collect()),
            );
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextComponent {
    pub text: String,
    pub modifier: Modifier,
}

impl TextComponent {
    pub fn new(val: &str) -> TextComponent {
        TextComponent {
            text: val.to_owned(),
            modifier: Default::default(),
        }
    }

    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("text".to_owned(), Value::String(self.text.clone()));
        self.modifier.write_into(&mut obj);
        Value::Object(obj)
    }
}

/// A translatable message. Only a handful of keys used for disconnects and
/// chat are rendered; others fall back to the key followed by its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslateComponent {
    pub key: String,
    pub args: Vec<Component>,
    pub modifier: Modifier,
}

impl TranslateComponent {
    fn template(&self) -> Option<&'static str> {
        Some(match self.key.as_str() {
            "chat.type.text" => "<%s> %s",
            "chat.type.announcement" => "[%s] %s",
            "chat.type.emote" => "* %s %s",
            "multiplayer.player.joined" => "%s joined the game",
            "multiplayer.player.left" => "%s left the game",
            "multiplayer.disconnect.kicked" => "Kicked by an operator",
            "multiplayer.disconnect.server_shutdown" => "Server closed",
            "multiplayer.disconnect.outdated_client" => "Outdated client! Please use %s",
            "multiplayer.disconnect.outdated_server" => "Outdated server! I'm still on %s",
            "disconnect.timeout" => "Timed out",
            _ => return None,
        })
    }

    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("translate".to_owned(), Value::String(self.key.clone()));
        if !self.args.is_empty() {
            obj.insert(
                "with".to_owned(),
                Value::Array(self.args.iter().map(Component::to_value).collect()),
            );
        }
        self.modifier.write_into(&mut obj);
        Value::Object(obj)
    }
}

impl fmt::Display for TranslateComponent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let template = match self.template() {
            Some(template) => template,
            None => {
                write!(f, "{}", self.key)?;
                for arg in &self.args {
                    write!(f, " {}", arg)?;
                }
                return Ok(());
            }
        };
        let mut args = self.args.iter();
        let mut pieces = template.split("%s");
        if let Some(first) = pieces.next() {
            write!(f, "{}", first)?;
        }
        for piece in pieces {
            if let Some(arg) = args.next() {
                write!(f, "{}", arg)?;
            }
            write!(f, "{}", piece)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Black,
    DarkBlue,
    DarkGreen,
    DarkAqua,
    DarkRed,
    DarkPurple,
    Gold,
    Gray,
    DarkGray,
    Blue,
    Green,
    Aqua,
    Red,
    LightPurple,
    Yellow,
    White,
    RGB(u8, u8, u8),
}

const NAMED_COLORS: [(Color, &str, char); 16] = [
    (Color::Black, "black", '0'),
    (Color::DarkBlue, "dark_blue", '1'),
    (Color::DarkGreen, "dark_green", '2'),
    (Color::DarkAqua, "dark_aqua", '3'),
    (Color::DarkRed, "dark_red", '4'),
    (Color::DarkPurple, "dark_purple", '5'),
    (Color::Gold, "gold", '6'),
    (Color::Gray, "gray", '7'),
    (Color::DarkGray, "dark_gray", '8'),
    (Color::Blue, "blue", '9'),
    (Color::Green, "green", 'a'),
    (Color::Aqua, "aqua", 'b'),
    (Color::Red, "red", 'c'),
    (Color::LightPurple, "light_purple", 'd'),
    (Color::Yellow, "yellow", 'e'),
    (Color::White, "white", 'f'),
];

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Color::RGB(r, g, b) = *self {
            return write!(f, "#{:02X}{:02X}{:02X}", r, g, b);
        }
        let name = NAMED_COLORS
            .iter()
            .find(|(c, _, _)| c == self)
            .map_or("white", |(_, name, _)| name);
        write!(f, "{}", name)
    }
}

impl Color {
    fn from_string(val: &str) -> Self {
        if let Some((color, _, _)) = NAMED_COLORS.iter().find(|(_, name, _)| *name == val) {
            return *color;
        }
        if val.len() == 7 && val.is_ascii() && val.starts_with('#') {
            let channel = |range: std::ops::Range<usize>| {
                val.get(range).and_then(|v| u8::from_str_radix(v, 16).ok())
            };
            if let (Some(r), Some(g), Some(b)) = (channel(1..3), channel(3..5), channel(5..7)) {
                return Color::RGB(r, g, b);
            }
        }
        Color::White
    }

    fn from_legacy_code(code: char) -> Option<Self> {
        NAMED_COLORS
            .iter()
            .find(|(_, _, c)| *c == code)
            .map(|(color, _, _)| *color)
    }
}

const LEGACY_CHAR: char = '§';

/// Splits `§` formatted text into child components carrying the matching
/// colours and styles. The codes themselves are removed from the text.
pub fn convert_legacy(c: &mut Component) {
    if let Some(extra) = c.modifier_mut().extra.as_mut() {
        for e in extra.iter_mut() {
            convert_legacy(e);
        }
    }
    let txt = match *c {
        Component::Text(ref mut txt) => txt,
        Component::Translate(_) => return,
    };
    if !txt.text.contains(LEGACY_CHAR) {
        return;
    }

    let mut parts = Vec::new();
    let mut current = TextComponent::new("");
    let mut chars = txt.text.chars();
    while let Some(ch) = chars.next() {
        if ch != LEGACY_CHAR {
            current.text.push(ch);
            continue;
        }
        let code = match chars.next() {
            Some(code) => code.to_ascii_lowercase(),
            None => break,
        };
        let mut modifier = if Color::from_legacy_code(code).is_some() || code == 'r' {
            Modifier::default()
        } else {
            current.modifier.clone()
        };
        match code {
            'k' => modifier.obfuscated = Some(true),
            'l' => modifier.bold = Some(true),
            'm' => modifier.strikethrough = Some(true),
            'n' => modifier.underlined = Some(true),
            'o' => modifier.italic = Some(true),
            code => modifier.color = Color::from_legacy_code(code),
        }
        let done = std::mem::replace(
            &mut current,
            TextComponent {
                text: String::new(),
                modifier,
            },
        );
        if !done.text.is_empty() {
            parts.push(Component::Text(done));
        }
    }
    if !current.text.is_empty() {
        parts.push(Component::Text(current));
    }

    let old = txt.modifier.extra.replace(parts);
    if let (Some(old), Some(extra)) = (old, txt.modifier.extra.as_mut()) {
        extra.extend(old);
    }
    txt.text.clear();
}
