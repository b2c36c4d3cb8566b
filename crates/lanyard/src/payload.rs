//! Serde DTOs for the platform's published application-command schema
//!
//! These are the only shapes the sync engine exchanges with the
//! [`CommandRegistryClient`](crate::sync::CommandRegistryClient); everything
//! else the platform attaches to a registered command is carried through
//! untouched.

use serde::{Deserialize, Serialize};

use crate::context::CommandId;

/// Top-level kind of an application command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum CommandKind {
    /// A chat-input (slash) command
    ChatInput,
    /// A user context-menu command
    User,
    /// A message context-menu command
    Message,
}

impl From<CommandKind> for u8 {
    fn from(value: CommandKind) -> Self {
        match value {
            CommandKind::ChatInput => 1,
            CommandKind::User => 2,
            CommandKind::Message => 3,
        }
    }
}

impl TryFrom<u8> for CommandKind {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::ChatInput),
            2 => Ok(Self::User),
            3 => Ok(Self::Message),
            v => Err(format!("Invalid command type {v}")),
        }
    }
}

/// Wire kind of one command option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum OptionKind {
    /// A nested subcommand
    SubCommand,
    /// A group of nested subcommands
    SubCommandGroup,
    /// A freeform or choice-constrained string
    String,
    /// A 53-bit integer
    Integer,
    /// A Boolean flag
    Boolean,
    /// A user handle
    User,
    /// A channel handle
    Channel,
    /// A role handle
    Role,
    /// A user or role handle
    Mentionable,
    /// A double-precision number
    Number,
    /// An uploaded attachment
    Attachment,
}

impl From<OptionKind> for u8 {
    fn from(value: OptionKind) -> Self {
        match value {
            OptionKind::SubCommand => 1,
            OptionKind::SubCommandGroup => 2,
            OptionKind::String => 3,
            OptionKind::Integer => 4,
            OptionKind::Boolean => 5,
            OptionKind::User => 6,
            OptionKind::Channel => 7,
            OptionKind::Role => 8,
            OptionKind::Mentionable => 9,
            OptionKind::Number => 10,
            OptionKind::Attachment => 11,
        }
    }
}

impl TryFrom<u8> for OptionKind {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => Self::SubCommand,
            2 => Self::SubCommandGroup,
            3 => Self::String,
            4 => Self::Integer,
            5 => Self::Boolean,
            6 => Self::User,
            7 => Self::Channel,
            8 => Self::Role,
            9 => Self::Mentionable,
            10 => Self::Number,
            11 => Self::Attachment,
            v => return Err(format!("Invalid option type {v}")),
        })
    }
}

/// Raw channel-type discriminant used to restrict channel options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct ChannelKind(pub u8);

/// The value side of one declared choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChoiceValue {
    /// An integer choice value
    Int(i64),
    /// A floating-point choice value
    Number(f64),
    /// A string choice value
    String(String),
}

/// One declared choice of a string, integer or number option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoicePayload {
    /// Display name, 1–100 characters
    pub name: String,
    /// Value submitted when the choice is picked
    pub value: ChoiceValue,
}

/// One option of a command payload: a parameter, subcommand or subcommand
/// group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionPayload {
    /// Wire kind of the option
    #[serde(rename = "type")]
    pub kind: OptionKind,
    /// Option name
    pub name: String,
    /// Option description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// True if the option must be supplied
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    /// Declared choices, if any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<ChoicePayload>,
    /// Nested options of a subcommand or group
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionPayload>,
    /// Channel-type restriction of a channel option
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channel_types: Vec<ChannelKind>,
    /// Minimum accepted numeric value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<serde_json::Number>,
    /// Maximum accepted numeric value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<serde_json::Number>,
    /// True if the option sends autocomplete interactions
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub autocomplete: bool,
}

impl OptionPayload {
    /// Construct an option payload with nothing but kind and name set
    #[must_use]
    pub fn new(kind: OptionKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            description: String::new(),
            required: false,
            choices: vec![],
            options: vec![],
            channel_types: vec![],
            min_value: None,
            max_value: None,
            autocomplete: false,
        }
    }
}

fn permission_default() -> bool { true }

/// A platform-facing application command definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandPayload {
    /// Registered command ID; present only on payloads fetched back from
    /// the platform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CommandId>,
    /// Top-level command kind
    #[serde(rename = "type")]
    pub kind: CommandKind,
    /// Command (or group) name
    pub name: String,
    /// Command description; empty for context commands
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Parameters, subcommands or subcommand groups
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionPayload>,
    /// Whether the command is enabled by default
    #[serde(default = "permission_default")]
    pub default_permission: bool,
}

impl CommandPayload {
    /// Construct a chat-input payload with no options
    #[must_use]
    pub fn slash(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: CommandKind::ChatInput,
            name: name.into(),
            description: description.into(),
            options: vec![],
            default_permission: true,
        }
    }

    /// True if two payloads declare the same command slot (name and kind)
    #[must_use]
    pub fn same_slot(&self, other: &Self) -> bool {
        self.kind == other.kind && self.name == other.name
    }
}

#[cfg(test)]
mod test {
    use super::{ChoicePayload, ChoiceValue, CommandKind, CommandPayload, OptionKind, OptionPayload};

    #[test]
    fn payloads_round_trip_through_json() {
        let payload = CommandPayload {
            options: vec![OptionPayload {
                required: true,
                choices: vec![ChoicePayload {
                    name: "loud".into(),
                    value: ChoiceValue::Int(2),
                }],
                ..OptionPayload::new(OptionKind::Integer, "volume")
            }],
            ..CommandPayload::slash("play", "Play a sound")
        };

        let json = serde_json::to_string(&payload).unwrap();
        let back: CommandPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn wire_shape_matches_the_published_schema() {
        let json = serde_json::json!({
            "id": "1234",
            "type": 1,
            "name": "ping",
            "description": "Measure latency",
            "options": [
                {"type": 3, "name": "host", "description": "Target host", "required": true}
            ]
        });

        let payload: CommandPayload = serde_json::from_value(json).unwrap();
        assert_eq!(payload.id.unwrap().0, 1234);
        assert_eq!(payload.kind, CommandKind::ChatInput);
        assert!(payload.default_permission);
        assert_eq!(payload.options[0].kind, OptionKind::String);
        assert!(payload.options[0].required);
    }

    #[test]
    fn choice_values_stay_typed() {
        let choices: Vec<ChoiceValue> =
            serde_json::from_str(r#"[3, 2.5, "three"]"#).unwrap();
        assert_eq!(choices, vec![
            ChoiceValue::Int(3),
            ChoiceValue::Number(2.5),
            ChoiceValue::String("three".into()),
        ]);
    }
}
