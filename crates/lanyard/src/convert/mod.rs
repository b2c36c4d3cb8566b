//! Pluggable type converters mapping platform option values to native
//! argument values

mod builtin;

use std::{
    any::TypeId,
    fmt,
    sync::{Arc, RwLock},
};

pub use builtin::{
    builtin_factories, AttachmentConverter, BoolConverter, ChannelConverter, ClosureTableFactory,
    DurationConverter, EnumArg, EnumConverter, FromNumber, IntConverter, MentionableConverter,
    NumberConverter, RoleConverter, StringConverter, UserConverter,
};
use dashmap::DashMap;

use crate::{
    context::InteractionContext,
    describe::{ArgValue, DeclaredType},
    error::Error,
    interaction::InvokedOption,
    payload::{OptionKind, OptionPayload},
};

/// Reads one platform option value into a native argument value
#[async_trait::async_trait]
pub trait TypeConverter: fmt::Debug + Send + Sync {
    /// The platform option kind published for parameters using this
    /// converter
    fn option_kind(&self) -> OptionKind;

    /// True if this converter can also produce values of the given declared
    /// type
    fn can_convert(&self, ty: &DeclaredType) -> bool {
        let _ = ty;
        false
    }

    /// Contribute extra properties (choices, channel restrictions) to the
    /// emitted option payload
    fn decorate(&self, payload: &mut OptionPayload) { let _ = payload; }

    /// Read a supplied option into a native value
    ///
    /// # Errors
    /// Returns `ConvertFailed` if the option value cannot be converted.
    async fn read(
        &self,
        ctx: &InteractionContext,
        name: &str,
        opt: &InvokedOption,
    ) -> Result<ArgValue, Error>;

    /// Read a raw text token (a wildcard capture) into a native value
    ///
    /// # Errors
    /// Returns `ConvertFailed` if the token cannot be converted; the default
    /// implementation always fails.
    async fn read_text(
        &self,
        ctx: &InteractionContext,
        name: &str,
        text: &str,
    ) -> Result<ArgValue, Error> {
        let _ = (ctx, text);
        Err(Error::convert_failed(
            name,
            "value cannot be read from a text token",
        ))
    }
}

/// Type classes generic converter factories are keyed by
///
/// The explicit [`subsumes`](Self::subsumes) relation stands in for
/// assignability between the native types a class covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeClass {
    /// Freeform strings
    String,
    /// Integer primitives
    Integer,
    /// Floating-point primitives
    Float,
    /// Booleans
    Bool,
    /// User handles
    User,
    /// Channel handles
    Channel,
    /// Role handles
    Role,
    /// User-or-role handles
    Mentionable,
    /// Attachment handles
    Attachment,
    /// Host-declared enumerations
    Enum,
}

impl TypeClass {
    /// True if a converter keyed on `self` could also serve values of
    /// `other`
    #[must_use]
    pub fn subsumes(self, other: Self) -> bool {
        self == other || matches!((self, other), (Self::Mentionable, Self::User | Self::Role))
    }
}

/// Instantiates converters for a class of declared types
pub trait GenericConverterFactory: fmt::Debug + Send + Sync {
    /// The type class this factory covers
    fn class(&self) -> TypeClass;

    /// True if the factory can instantiate a converter for the declared
    /// type
    fn supports(&self, ty: &DeclaredType) -> bool;

    /// Instantiate a converter for the declared type
    fn make(&self, ty: &DeclaredType) -> Option<Arc<dyn TypeConverter>>;
}

/// The converter lookup used while building command metadata
///
/// Resolution order: an exact entry for the declared type, then the first
/// exact entry claiming convertibility, then the most specific qualifying
/// generic factory (whose instantiation is cached as a new exact entry).
#[derive(Debug)]
pub struct TypeConverterRegistry {
    exact: DashMap<TypeId, Arc<dyn TypeConverter>>,
    order: RwLock<Vec<TypeId>>,
    generic: RwLock<Vec<Arc<dyn GenericConverterFactory>>>,
}

impl Default for TypeConverterRegistry {
    fn default() -> Self {
        Self {
            exact: DashMap::new(),
            order: RwLock::new(Vec::new()),
            generic: RwLock::new(Vec::new()),
        }
    }
}

impl TypeConverterRegistry {
    /// Construct a registry preloaded with the built-in converters and
    /// factories
    #[must_use]
    pub fn builtin() -> Self {
        let this = Self::default();
        this.insert(
            DeclaredType::of::<std::time::Duration>(),
            Arc::new(DurationConverter),
        );
        for factory in builtin_factories() {
            this.add_factory(factory);
        }
        this
    }

    /// Register an exact converter for a declared type, replacing any
    /// previous entry
    pub fn insert(&self, ty: DeclaredType, converter: Arc<dyn TypeConverter>) {
        if self.exact.insert(ty.id(), converter).is_none() {
            self.order
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .push(ty.id());
        }
    }

    /// Remove the exact converter for a declared type
    pub fn remove(&self, ty: &DeclaredType) -> bool {
        let removed = self.exact.remove(&ty.id()).is_some();
        if removed {
            self.order
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .retain(|id| *id != ty.id());
        }
        removed
    }

    /// Register a generic converter factory
    pub fn add_factory(&self, factory: Arc<dyn GenericConverterFactory>) {
        self.generic
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(factory);
    }

    /// Resolve the converter for a declared parameter type
    ///
    /// # Errors
    /// Returns `NoConverter` if no exact entry, convertible entry or
    /// qualifying factory covers the type.
    pub fn resolve(&self, ty: &DeclaredType) -> Result<Arc<dyn TypeConverter>, Error> {
        if let Some(conv) = self.exact.get(&ty.id()) {
            return Ok(Arc::clone(&conv));
        }

        {
            let order = self.order.read().unwrap_or_else(|e| e.into_inner());
            for id in order.iter() {
                if let Some(conv) = self.exact.get(id) {
                    if conv.can_convert(ty) {
                        return Ok(Arc::clone(&conv));
                    }
                }
            }
        }

        let chosen = {
            let generic = self.generic.read().unwrap_or_else(|e| e.into_inner());
            let qualifying: Vec<_> = generic.iter().filter(|f| f.supports(ty)).collect();

            // Most specific first: the factory whose class subsumes the
            // fewest other qualifying classes. Incomparable ties fall back
            // to registration order.
            qualifying
                .iter()
                .enumerate()
                .min_by_key(|(i, f)| {
                    let subsumed = qualifying
                        .iter()
                        .enumerate()
                        .filter(|(j, o)| i != j && f.class().subsumes(o.class()))
                        .count();
                    (subsumed, *i)
                })
                .map(|(_, f)| Arc::clone(f))
        };

        let Some(factory) = chosen else {
            return Err(Error::NoConverter(ty.name()));
        };
        let converter = factory.make(ty).ok_or(Error::NoConverter(ty.name()))?;
        self.insert(*ty, Arc::clone(&converter));
        Ok(converter)
    }
}
