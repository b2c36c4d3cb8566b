//! Invocation context handed to converters, preconditions and handlers

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    sync::Arc,
};

use tokio_util::sync::CancellationToken;

macro_rules! id_type {
    ($(#[doc = $doc:literal] $name:ident),* $(,)?) => {
        $(
            #[doc = $doc]
            #[derive(
                Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            )]
            #[repr(transparent)]
            pub struct $name(pub u64);

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    fmt::Display::fmt(&self.0, f)
                }
            }

            impl From<u64> for $name {
                #[inline]
                fn from(value: u64) -> Self { Self(value) }
            }

            impl From<$name> for u64 {
                #[inline]
                fn from(value: $name) -> Self { value.0 }
            }
        )*
    };
}

id_type! {
    ///Snowflake handle for a user account
    UserId,
    ///Snowflake handle for a guild
    GuildId,
    ///Snowflake handle for a channel
    ChannelId,
    ///Snowflake handle for a guild role
    RoleId,
    ///Snowflake handle for a message
    MessageId,
    ///Snowflake handle for an uploaded attachment
    AttachmentId,
    ///Snowflake handle for one inbound interaction
    InteractionId,
    ///Snowflake handle for a registered application command
    CommandId,
}

// Snowflakes travel as strings on the wire.
impl serde::Serialize for CommandId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for CommandId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map(Self).map_err(serde::de::Error::custom)
    }
}

/// A handle for either a user or a guild role, as produced by the
/// mentionable converter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mention {
    /// The mention targets a user
    User(UserId),
    /// The mention targets a role
    Role(RoleId),
}

/// Resolver interface over the host's dependency-injection container
///
/// The framework never constructs services itself; handlers pull what they
/// need out of the locator attached to their context.
pub trait ServiceLocator: fmt::Debug + Send + Sync {
    /// Resolve a service by its type, returning `None` if the locator has
    /// nothing registered under it
    fn resolve(&self, ty: TypeId) -> Option<Arc<dyn Any + Send + Sync>>;
}

/// Typed convenience over [`ServiceLocator::resolve`]
pub trait ServiceLocatorExt {
    /// Resolve a service of type `T`
    fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>>;
}

impl<L: ServiceLocator + ?Sized> ServiceLocatorExt for L {
    fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.resolve(TypeId::of::<T>())
            .and_then(|s| s.downcast().ok())
    }
}

/// A simple owned [`ServiceLocator`] backed by a type map
#[derive(Debug, Default)]
pub struct ServiceMap(HashMap<TypeId, Arc<dyn Any + Send + Sync>>);

impl ServiceMap {
    /// Construct an empty service map
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Register a service instance, replacing any previous instance of the
    /// same type
    pub fn insert<T: Send + Sync + 'static>(&mut self, service: T) {
        self.0.insert(TypeId::of::<T>(), Arc::new(service));
    }

    /// Register a service instance and return the map, for chained
    /// construction
    #[must_use]
    pub fn with<T: Send + Sync + 'static>(mut self, service: T) -> Self {
        self.insert(service);
        self
    }
}

impl ServiceLocator for ServiceMap {
    fn resolve(&self, ty: TypeId) -> Option<Arc<dyn Any + Send + Sync>> {
        self.0.get(&ty).map(Arc::clone)
    }
}

/// Handle to the platform acknowledgement of an interaction, used only to
/// clean up after unknown-command lookups
#[async_trait::async_trait]
pub trait AckHandle: fmt::Debug + Send + Sync {
    /// Delete the original interaction acknowledgement
    ///
    /// # Errors
    /// This method returns an error if the platform rejects the deletion.
    async fn delete(&self) -> anyhow::Result<()>;
}

/// Opaque resolved-entity payloads attached to an interaction, keyed by
/// snowflake
///
/// The framework passes these through untouched; converters only hand out
/// the typed IDs.
#[derive(Debug, Default)]
pub struct ResolvedData {
    /// Resolved user objects
    pub users: HashMap<u64, serde_json::Value>,
    /// Resolved partial member objects
    pub members: HashMap<u64, serde_json::Value>,
    /// Resolved partial channel objects
    pub channels: HashMap<u64, serde_json::Value>,
    /// Resolved role objects
    pub roles: HashMap<u64, serde_json::Value>,
    /// Resolved message objects
    pub messages: HashMap<u64, serde_json::Value>,
    /// Resolved attachment objects
    pub attachments: HashMap<u64, serde_json::Value>,
}

/// Per-invocation context threaded through the whole pipeline
#[derive(Debug, Clone)]
pub struct InteractionContext {
    /// ID of the inbound interaction
    pub interaction_id: InteractionId,
    /// User that triggered the interaction
    pub user: UserId,
    /// Channel the interaction was triggered in
    pub channel: ChannelId,
    /// Guild the interaction was triggered in, if any
    pub guild: Option<GuildId>,
    /// Resolver over the host's service container
    pub services: Arc<dyn ServiceLocator>,
    /// Cancellation signal propagated into every pipeline suspension
    pub cancellation: CancellationToken,
    /// Acknowledgement handle, consulted only on unknown-command cleanup
    pub ack: Option<Arc<dyn AckHandle>>,
    /// Resolved-entity payloads attached to the interaction
    pub resolved: Arc<ResolvedData>,
}

impl InteractionContext {
    /// Construct a context with no guild, services or acknowledgement
    /// attached
    #[must_use]
    pub fn new(interaction_id: InteractionId, user: UserId, channel: ChannelId) -> Self {
        Self {
            interaction_id,
            user,
            channel,
            guild: None,
            services: Arc::new(ServiceMap::new()),
            cancellation: CancellationToken::new(),
            ack: None,
            resolved: Arc::new(ResolvedData::default()),
        }
    }

    /// Attach a source guild
    #[must_use]
    pub fn in_guild(mut self, guild: GuildId) -> Self {
        self.guild = Some(guild);
        self
    }

    /// Attach a service locator
    #[must_use]
    pub fn with_services(mut self, services: Arc<dyn ServiceLocator>) -> Self {
        self.services = services;
        self
    }

    /// Attach a cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Attach an acknowledgement handle
    #[must_use]
    pub fn with_ack(mut self, ack: Arc<dyn AckHandle>) -> Self {
        self.ack = Some(ack);
        self
    }

    /// Attach resolved-entity data
    #[must_use]
    pub fn with_resolved(mut self, resolved: ResolvedData) -> Self {
        self.resolved = Arc::new(resolved);
        self
    }
}
