//! Inbound interaction data as handed over by the host's transport layer
//!
//! The framework consumes these shapes and nothing else; adapting the
//! platform's gateway DTOs into them is the host's job.

use crate::{
    context::{AttachmentId, ChannelId, Mention, MessageId, RoleId, UserId},
    payload::{ChoiceValue, OptionKind},
};

/// The typed value carried by one invoked option
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    /// No value; carried by subcommand options
    None,
    /// A string value
    String(String),
    /// An integer value
    Integer(i64),
    /// A floating-point value
    Number(f64),
    /// A Boolean value
    Boolean(bool),
    /// A user handle
    User(UserId),
    /// A channel handle
    Channel(ChannelId),
    /// A role handle
    Role(RoleId),
    /// A user-or-role handle
    Mentionable(Mention),
    /// An attachment handle
    Attachment(AttachmentId),
}

/// One option of a command invocation, possibly nested under a subcommand
#[derive(Debug, Clone, PartialEq)]
pub struct InvokedOption {
    /// Option name as supplied by the platform
    pub name: String,
    /// Wire kind of the option
    pub kind: OptionKind,
    /// Supplied value; [`OptionValue::None`] for subcommands
    pub value: OptionValue,
    /// Nested options of a subcommand or group
    pub options: Vec<InvokedOption>,
    /// True if this is the focused option of an autocomplete query
    pub focused: bool,
}

impl InvokedOption {
    /// Construct a plain value option
    #[must_use]
    pub fn new(name: impl Into<String>, kind: OptionKind, value: OptionValue) -> Self {
        Self {
            name: name.into(),
            kind,
            value,
            options: vec![],
            focused: false,
        }
    }

    /// Construct a subcommand option wrapping nested options
    #[must_use]
    pub fn subcommand(name: impl Into<String>, options: Vec<InvokedOption>) -> Self {
        Self {
            name: name.into(),
            kind: OptionKind::SubCommand,
            value: OptionValue::None,
            options,
            focused: false,
        }
    }

    /// Mark this option as the focused one of an autocomplete query
    #[must_use]
    pub fn focused(mut self) -> Self {
        self.focused = true;
        self
    }

    /// True if this option nests a subcommand or subcommand group
    #[must_use]
    pub fn is_subcommand(&self) -> bool {
        matches!(
            self.kind,
            OptionKind::SubCommand | OptionKind::SubCommandGroup
        )
    }
}

/// A slash-command invocation
#[derive(Debug, Clone, PartialEq)]
pub struct SlashInvocation {
    /// Whitespace-split command path as supplied by the platform
    pub path: Vec<String>,
    /// Top-level options; may nest further subcommand segments
    pub options: Vec<InvokedOption>,
}

/// The target entity of a context-menu command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextTarget {
    /// Target of a user command
    User(UserId),
    /// Target of a message command
    Message(MessageId),
}

/// A context-menu command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextInvocation {
    /// Name of the invoked command
    pub name: String,
    /// The entity the command was invoked on
    pub target: ContextTarget,
}

/// The component type a component interaction originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentSource {
    /// A message button
    Button,
    /// A select menu; carries the selected values
    SelectMenu,
}

/// A message-component interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentInvocation {
    /// Application-chosen custom identifier of the component
    pub custom_id: String,
    /// Originating component type
    pub source: ComponentSource,
    /// Selected values of a select menu; empty for buttons
    pub values: Vec<String>,
}

/// One submitted field of a modal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedField {
    /// Per-field custom identifier
    pub custom_id: String,
    /// Submitted text
    pub value: String,
}

/// A modal-submit interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalInvocation {
    /// Application-chosen custom identifier of the modal
    pub custom_id: String,
    /// Submitted fields in platform order
    pub fields: Vec<SubmittedField>,
}

/// An autocomplete query for one parameter of an in-progress slash command
#[derive(Debug, Clone, PartialEq)]
pub struct AutocompleteInvocation {
    /// Command path as supplied by the platform
    pub path: Vec<String>,
    /// Options filled in so far; exactly one is flagged focused
    pub options: Vec<InvokedOption>,
}

/// One autocomplete suggestion
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    /// Display name, 1–100 characters
    pub name: String,
    /// Value submitted when the suggestion is picked
    pub value: ChoiceValue,
}

impl Suggestion {
    /// Construct a string suggestion whose value equals its name
    #[must_use]
    pub fn plain(name: impl Into<String>) -> Self {
        let name = name.into();
        let value = ChoiceValue::String(name.clone());
        Self { name, value }
    }
}

/// Any inbound interaction the framework can route
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    /// A slash-command invocation
    Slash(SlashInvocation),
    /// A context-menu command invocation
    Context(ContextInvocation),
    /// A message-component interaction
    Component(ComponentInvocation),
    /// A modal-submit interaction
    Modal(ModalInvocation),
    /// An autocomplete query
    Autocomplete(AutocompleteInvocation),
}
