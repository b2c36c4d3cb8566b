//! Core of an interaction-command framework for chat-platform application
//! commands, message components, modal submissions and autocomplete queries.
//!
//! A host process declares its handlers as [`describe::ModuleDescriptor`]
//! trees (usually produced by some codegen or hand-written registration
//! code), feeds them to an [`InteractionFramework`], and then forwards every
//! inbound interaction to one of the framework's `execute_*` entry points.
//! The framework builds a validated metadata tree from the declarations,
//! publishes it to the platform through a [`sync::CommandRegistryClient`],
//! and at runtime routes each interaction to exactly one handler with
//! type-converted arguments and preconditions checked, surfacing every
//! outcome through the matching executed event.
//!
//! The wire transport is out of scope: the host supplies interaction data
//! as the plain structs in [`interaction`] and receives command payloads as
//! the serde DTOs in [`payload`].

#![deny(
    clippy::disallowed_methods,
    clippy::suspicious,
    clippy::style,
    missing_debug_implementations
)]
#![warn(clippy::pedantic, missing_docs)]

pub mod builder;
pub mod context;
pub mod convert;
pub mod describe;
pub mod error;
pub mod event;
mod exec;
pub mod framework;
pub mod info;
pub mod interaction;
pub mod map;
pub mod payload;
pub mod precondition;
pub mod sync;

pub use error::{Error, ExecuteResult};
pub use framework::{Config, InteractionFramework};
