//! Built-in converters and the closure-table generic factories covering
//! them

use std::{
    any::TypeId, collections::HashMap, fmt, marker::PhantomData, str::FromStr, sync::Arc,
    time::Duration,
};

use super::{GenericConverterFactory, TypeClass, TypeConverter};
use crate::{
    context::{AttachmentId, ChannelId, InteractionContext, Mention, RoleId, UserId},
    describe::{ArgValue, DeclaredType},
    error::Error,
    interaction::{InvokedOption, OptionValue},
    payload::{ChoicePayload, ChoiceValue, OptionKind, OptionPayload},
};

/// Converter for freeform string parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct StringConverter;

#[async_trait::async_trait]
impl TypeConverter for StringConverter {
    fn option_kind(&self) -> OptionKind { OptionKind::String }

    async fn read(
        &self,
        _ctx: &InteractionContext,
        name: &str,
        opt: &InvokedOption,
    ) -> Result<ArgValue, Error> {
        match &opt.value {
            OptionValue::String(s) => Ok(Box::new(s.clone()) as ArgValue),
            _ => Err(Error::convert_failed(name, "expected a string value")),
        }
    }

    async fn read_text(
        &self,
        _ctx: &InteractionContext,
        _name: &str,
        text: &str,
    ) -> Result<ArgValue, Error> {
        Ok(Box::new(text.to_owned()) as ArgValue)
    }
}

/// Converter for integer parameters of width `T`
pub struct IntConverter<T>(PhantomData<fn() -> T>);

impl<T> Default for IntConverter<T> {
    fn default() -> Self { Self(PhantomData) }
}

impl<T> fmt::Debug for IntConverter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IntConverter<{}>", std::any::type_name::<T>())
    }
}

#[async_trait::async_trait]
impl<T> TypeConverter for IntConverter<T>
where
    T: TryFrom<i64> + FromStr + Send + Sync + 'static,
    <T as TryFrom<i64>>::Error: fmt::Display,
    <T as FromStr>::Err: fmt::Display,
{
    fn option_kind(&self) -> OptionKind { OptionKind::Integer }

    async fn read(
        &self,
        _ctx: &InteractionContext,
        name: &str,
        opt: &InvokedOption,
    ) -> Result<ArgValue, Error> {
        match opt.value {
            OptionValue::Integer(i) => T::try_from(i)
                .map(|v| Box::new(v) as ArgValue)
                .map_err(|e| Error::convert_failed(name, e)),
            _ => Err(Error::convert_failed(name, "expected an integer value")),
        }
    }

    async fn read_text(
        &self,
        _ctx: &InteractionContext,
        name: &str,
        text: &str,
    ) -> Result<ArgValue, Error> {
        text.parse::<T>()
            .map(|v| Box::new(v) as ArgValue)
            .map_err(|e| Error::convert_failed(name, e))
    }
}

/// Conversion from the platform's double-precision number representation
pub trait FromNumber: Sized {
    /// Narrow the wire value into `Self`
    fn from_number(value: f64) -> Self;
}

impl FromNumber for f64 {
    #[inline]
    fn from_number(value: f64) -> Self { value }
}

impl FromNumber for f32 {
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn from_number(value: f64) -> Self { value as Self }
}

/// Converter for floating-point parameters of width `T`
pub struct NumberConverter<T>(PhantomData<fn() -> T>);

impl<T> Default for NumberConverter<T> {
    fn default() -> Self { Self(PhantomData) }
}

impl<T> fmt::Debug for NumberConverter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NumberConverter<{}>", std::any::type_name::<T>())
    }
}

#[async_trait::async_trait]
impl<T> TypeConverter for NumberConverter<T>
where
    T: FromNumber + FromStr + Send + Sync + 'static,
    <T as FromStr>::Err: fmt::Display,
{
    fn option_kind(&self) -> OptionKind { OptionKind::Number }

    async fn read(
        &self,
        _ctx: &InteractionContext,
        name: &str,
        opt: &InvokedOption,
    ) -> Result<ArgValue, Error> {
        match opt.value {
            OptionValue::Number(n) => Ok(Box::new(T::from_number(n)) as ArgValue),
            _ => Err(Error::convert_failed(name, "expected a number value")),
        }
    }

    async fn read_text(
        &self,
        _ctx: &InteractionContext,
        name: &str,
        text: &str,
    ) -> Result<ArgValue, Error> {
        text.parse::<T>()
            .map(|v| Box::new(v) as ArgValue)
            .map_err(|e| Error::convert_failed(name, e))
    }
}

/// Converter for Boolean parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolConverter;

#[async_trait::async_trait]
impl TypeConverter for BoolConverter {
    fn option_kind(&self) -> OptionKind { OptionKind::Boolean }

    async fn read(
        &self,
        _ctx: &InteractionContext,
        name: &str,
        opt: &InvokedOption,
    ) -> Result<ArgValue, Error> {
        match opt.value {
            OptionValue::Boolean(b) => Ok(Box::new(b) as ArgValue),
            _ => Err(Error::convert_failed(name, "expected a Boolean value")),
        }
    }

    async fn read_text(
        &self,
        _ctx: &InteractionContext,
        name: &str,
        text: &str,
    ) -> Result<ArgValue, Error> {
        text.parse::<bool>()
            .map(|v| Box::new(v) as ArgValue)
            .map_err(|e| Error::convert_failed(name, e))
    }
}

macro_rules! snowflake_converter {
    ($(#[doc = $doc:literal] $name:ident($id:ty) => $kind:ident / $variant:ident),* $(,)?) => {
        $(
            #[doc = $doc]
            #[derive(Debug, Clone, Copy, Default)]
            pub struct $name;

            #[async_trait::async_trait]
            impl TypeConverter for $name {
                fn option_kind(&self) -> OptionKind { OptionKind::$kind }

                async fn read(
                    &self,
                    _ctx: &InteractionContext,
                    name: &str,
                    opt: &InvokedOption,
                ) -> Result<ArgValue, Error> {
                    match opt.value {
                        OptionValue::$variant(id) => Ok(Box::new(id) as ArgValue),
                        _ => Err(Error::convert_failed(
                            name,
                            concat!("expected ", $doc),
                        )),
                    }
                }

                async fn read_text(
                    &self,
                    _ctx: &InteractionContext,
                    name: &str,
                    text: &str,
                ) -> Result<ArgValue, Error> {
                    text.parse::<u64>()
                        .map(|v| Box::new(<$id>::from(v)) as ArgValue)
                        .map_err(|e| Error::convert_failed(name, e))
                }
            }
        )*
    };
}

snowflake_converter! {
    ///a user handle
    UserConverter(UserId) => User / User,
    ///a channel handle
    ChannelConverter(ChannelId) => Channel / Channel,
    ///a role handle
    RoleConverter(RoleId) => Role / Role,
    ///an attachment handle
    AttachmentConverter(AttachmentId) => Attachment / Attachment,
}

/// Converter for user-or-role parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct MentionableConverter;

#[async_trait::async_trait]
impl TypeConverter for MentionableConverter {
    fn option_kind(&self) -> OptionKind { OptionKind::Mentionable }

    async fn read(
        &self,
        _ctx: &InteractionContext,
        name: &str,
        opt: &InvokedOption,
    ) -> Result<ArgValue, Error> {
        match opt.value {
            OptionValue::Mentionable(m) => Ok(Box::new(m) as ArgValue),
            OptionValue::User(id) => Ok(Box::new(Mention::User(id)) as ArgValue),
            OptionValue::Role(id) => Ok(Box::new(Mention::Role(id)) as ArgValue),
            _ => Err(Error::convert_failed(name, "expected a mentionable handle")),
        }
    }
}

/// Converter parsing humane duration strings ("2h 15m") into
/// [`std::time::Duration`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DurationConverter;

impl DurationConverter {
    fn parse(name: &str, text: &str) -> Result<ArgValue, Error> {
        humantime::parse_duration(text)
            .map(|d| Box::new(d) as ArgValue)
            .map_err(|e| Error::convert_failed(name, e))
    }
}

#[async_trait::async_trait]
impl TypeConverter for DurationConverter {
    fn option_kind(&self) -> OptionKind { OptionKind::String }

    async fn read(
        &self,
        _ctx: &InteractionContext,
        name: &str,
        opt: &InvokedOption,
    ) -> Result<ArgValue, Error> {
        match &opt.value {
            OptionValue::String(s) => Self::parse(name, s),
            _ => Err(Error::convert_failed(name, "expected a duration string")),
        }
    }

    async fn read_text(
        &self,
        _ctx: &InteractionContext,
        name: &str,
        text: &str,
    ) -> Result<ArgValue, Error> {
        Self::parse(name, text)
    }
}

/// A host-declared enumeration usable as a choice parameter
pub trait EnumArg: Sized + Send + Sync + 'static {
    /// The platform-visible (name, value) pairs of the enumeration
    fn choices() -> Vec<(String, String)>;

    /// Parse a submitted choice value
    fn from_value(value: &str) -> Option<Self>;
}

/// Converter publishing an enumeration as a string option with fixed
/// choices
pub struct EnumConverter<E>(PhantomData<fn() -> E>);

impl<E> Default for EnumConverter<E> {
    fn default() -> Self { Self(PhantomData) }
}

impl<E> fmt::Debug for EnumConverter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EnumConverter<{}>", std::any::type_name::<E>())
    }
}

#[async_trait::async_trait]
impl<E: EnumArg> TypeConverter for EnumConverter<E> {
    fn option_kind(&self) -> OptionKind { OptionKind::String }

    fn decorate(&self, payload: &mut OptionPayload) {
        payload.choices = E::choices()
            .into_iter()
            .map(|(name, value)| ChoicePayload {
                name,
                value: ChoiceValue::String(value),
            })
            .collect();
    }

    async fn read(
        &self,
        ctx: &InteractionContext,
        name: &str,
        opt: &InvokedOption,
    ) -> Result<ArgValue, Error> {
        match &opt.value {
            OptionValue::String(s) => self.read_text(ctx, name, s).await,
            _ => Err(Error::convert_failed(name, "expected a choice value")),
        }
    }

    async fn read_text(
        &self,
        _ctx: &InteractionContext,
        name: &str,
        text: &str,
    ) -> Result<ArgValue, Error> {
        E::from_value(text)
            .map(|v| Box::new(v) as ArgValue)
            .ok_or_else(|| Error::convert_failed(name, "not a recognized choice"))
    }
}

/// A generic converter factory backed by a monomorphized closure table
///
/// "Instantiating" the factory for a declared type is a table lookup; the
/// registry caches the result as a new exact entry.
#[derive(Debug)]
pub struct ClosureTableFactory {
    class: TypeClass,
    table: HashMap<TypeId, Arc<dyn TypeConverter>>,
}

impl ClosureTableFactory {
    /// Construct an empty factory for the given type class
    #[must_use]
    pub fn new(class: TypeClass) -> Self {
        Self {
            class,
            table: HashMap::new(),
        }
    }

    /// Cover the declared type `T` with the given converter
    #[must_use]
    pub fn with_entry<T: 'static>(mut self, converter: Arc<dyn TypeConverter>) -> Self {
        self.table.insert(TypeId::of::<T>(), converter);
        self
    }

    /// Cover the enumeration `E` with an [`EnumConverter`]
    #[must_use]
    pub fn with_enum<E: EnumArg>(self) -> Self {
        self.with_entry::<E>(Arc::new(EnumConverter::<E>::default()))
    }
}

impl GenericConverterFactory for ClosureTableFactory {
    fn class(&self) -> TypeClass { self.class }

    fn supports(&self, ty: &DeclaredType) -> bool { self.table.contains_key(&ty.id()) }

    fn make(&self, ty: &DeclaredType) -> Option<Arc<dyn TypeConverter>> {
        self.table.get(&ty.id()).map(Arc::clone)
    }
}

macro_rules! int_entries {
    ($factory:expr, $($ty:ty),*) => {
        $factory$(.with_entry::<$ty>(Arc::new(IntConverter::<$ty>::default())))*
    };
}

/// The factories preloaded by
/// [`TypeConverterRegistry::builtin`](super::TypeConverterRegistry::builtin)
#[must_use]
pub fn builtin_factories() -> Vec<Arc<dyn GenericConverterFactory>> {
    vec![
        Arc::new(
            ClosureTableFactory::new(TypeClass::String)
                .with_entry::<String>(Arc::new(StringConverter)),
        ),
        Arc::new(int_entries!(
            ClosureTableFactory::new(TypeClass::Integer),
            i8,
            i16,
            i32,
            i64,
            u8,
            u16,
            u32,
            u64
        )),
        Arc::new(
            ClosureTableFactory::new(TypeClass::Float)
                .with_entry::<f32>(Arc::new(NumberConverter::<f32>::default()))
                .with_entry::<f64>(Arc::new(NumberConverter::<f64>::default())),
        ),
        Arc::new(
            ClosureTableFactory::new(TypeClass::Bool).with_entry::<bool>(Arc::new(BoolConverter)),
        ),
        Arc::new(
            ClosureTableFactory::new(TypeClass::User).with_entry::<UserId>(Arc::new(UserConverter)),
        ),
        Arc::new(
            ClosureTableFactory::new(TypeClass::Channel)
                .with_entry::<ChannelId>(Arc::new(ChannelConverter)),
        ),
        Arc::new(
            ClosureTableFactory::new(TypeClass::Role).with_entry::<RoleId>(Arc::new(RoleConverter)),
        ),
        Arc::new(
            ClosureTableFactory::new(TypeClass::Mentionable)
                .with_entry::<Mention>(Arc::new(MentionableConverter)),
        ),
        Arc::new(
            ClosureTableFactory::new(TypeClass::Attachment)
                .with_entry::<AttachmentId>(Arc::new(AttachmentConverter)),
        ),
    ]
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::{DurationConverter, EnumArg, EnumConverter, IntConverter, TypeConverter};
    use crate::{
        context::{ChannelId, InteractionContext, InteractionId, UserId},
        error::Error,
        interaction::{InvokedOption, OptionValue},
        payload::{OptionKind, OptionPayload},
    };

    fn ctx() -> InteractionContext {
        InteractionContext::new(InteractionId(1), UserId(2), ChannelId(3))
    }

    fn int_opt(value: i64) -> InvokedOption {
        InvokedOption::new("n", OptionKind::Integer, OptionValue::Integer(value))
    }

    #[tokio::test]
    async fn integers_narrow_with_range_checks() {
        let conv = IntConverter::<u8>::default();
        let v = conv.read(&ctx(), "n", &int_opt(200)).await.unwrap();
        assert_eq!(v.downcast_ref::<u8>(), Some(&200));

        assert!(matches!(
            conv.read(&ctx(), "n", &int_opt(300)).await,
            Err(Error::ConvertFailed { .. })
        ));
    }

    #[tokio::test]
    async fn captures_parse_as_text() {
        let conv = IntConverter::<i64>::default();
        let v = conv.read_text(&ctx(), "id", "-42").await.unwrap();
        assert_eq!(v.downcast_ref::<i64>(), Some(&-42));
    }

    #[tokio::test]
    async fn durations_parse_humane_strings() {
        let conv = DurationConverter;
        let opt = InvokedOption::new(
            "for",
            OptionKind::String,
            OptionValue::String("2h 15m".into()),
        );
        let v = conv.read(&ctx(), "for", &opt).await.unwrap();
        assert_eq!(
            v.downcast_ref::<Duration>(),
            Some(&Duration::from_secs(2 * 3600 + 15 * 60))
        );
    }

    #[derive(Debug, PartialEq)]
    enum Fruit {
        Apple,
        Pear,
    }

    impl EnumArg for Fruit {
        fn choices() -> Vec<(String, String)> {
            vec![
                ("Apple".into(), "apple".into()),
                ("Pear".into(), "pear".into()),
            ]
        }

        fn from_value(value: &str) -> Option<Self> {
            match value {
                "apple" => Some(Self::Apple),
                "pear" => Some(Self::Pear),
                _ => None,
            }
        }
    }

    #[tokio::test]
    async fn enums_publish_and_parse_choices() {
        let conv = EnumConverter::<Fruit>::default();

        let mut payload = OptionPayload::new(conv.option_kind(), "fruit");
        conv.decorate(&mut payload);
        assert_eq!(payload.choices.len(), 2);

        let opt = InvokedOption::new(
            "fruit",
            OptionKind::String,
            OptionValue::String("pear".into()),
        );
        let v = conv.read(&ctx(), "fruit", &opt).await.unwrap();
        assert_eq!(v.downcast_ref::<Fruit>(), Some(&Fruit::Pear));
    }
}
