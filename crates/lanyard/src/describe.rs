//! Pre-reflected module descriptors: the declarative input to registration
//!
//! Hosts with attribute/annotation support generate these from their own
//! metadata; hosts without simply construct them by hand. The framework
//! never inspects anything beyond what the descriptors carry.

use std::{
    any::{Any, TypeId},
    fmt,
    sync::Arc,
};

use futures_util::future::BoxFuture;

use crate::{
    context::InteractionContext,
    convert::TypeConverter,
    error::ExecuteResult,
    interaction::Suggestion,
    payload::{ChannelKind, ChoicePayload},
    precondition::Precondition,
};

/// A single converted handler argument
pub type ArgValue = Box<dyn Any + Send>;

/// Converted arguments handed to a handler callback, in declared parameter
/// order
pub struct Args {
    values: Vec<Option<ArgValue>>,
}

impl Args {
    pub(crate) fn new(values: Vec<ArgValue>) -> Self {
        Self {
            values: values.into_iter().map(Some).collect(),
        }
    }

    /// Number of argument slots
    #[must_use]
    pub fn len(&self) -> usize { self.values.len() }

    /// True if the handler takes no arguments
    #[must_use]
    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// Borrow the argument at `idx` as a `T`
    ///
    /// Returns `None` if the slot is out of range, already taken, or holds a
    /// different type.
    #[must_use]
    pub fn get<T: 'static>(&self, idx: usize) -> Option<&T> {
        self.values
            .get(idx)?
            .as_ref()
            .and_then(|v| v.downcast_ref())
    }

    /// Move the argument at `idx` out as a `T`, leaving the slot empty
    #[must_use]
    pub fn take<T: 'static>(&mut self, idx: usize) -> Option<T> {
        let slot = self.values.get_mut(idx)?;
        let value = slot.take()?;
        match value.downcast() {
            Ok(v) => Some(*v),
            Err(v) => {
                *slot = Some(v);
                None
            },
        }
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Args").field(&self.values.len()).finish()
    }
}

/// An error reported by a handler callback
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The handler ran but declined to succeed
    #[error("{0}")]
    Unsuccessful(String),
    /// An unhandled error occurred
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// The declared type of a parameter, used as the converter-registry key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclaredType {
    id: TypeId,
    name: &'static str,
}

impl DeclaredType {
    /// Describe the native type `T`
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The type's `TypeId`
    #[must_use]
    pub fn id(&self) -> TypeId { self.id }

    /// The type's diagnostic name
    #[must_use]
    pub fn name(&self) -> &'static str { self.name }
}

type CommandFn =
    dyn Fn(InteractionContext, Args) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync;
type AutocompleteFn = dyn Fn(InteractionContext, String) -> BoxFuture<'static, anyhow::Result<Vec<Suggestion>>>
    + Send
    + Sync;
type DefaultFn = dyn Fn() -> ArgValue + Send + Sync;
type AssembleFn = dyn Fn(Vec<ArgValue>) -> anyhow::Result<ArgValue> + Send + Sync;
type ConstructFn = dyn Fn(Vec<Option<String>>) -> anyhow::Result<ArgValue> + Send + Sync;

macro_rules! opaque_debug {
    ($($name:ident),* $(,)?) => {
        $(
            impl fmt::Debug for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.debug_struct(stringify!($name)).finish_non_exhaustive()
                }
            }
        )*
    };
}

/// The invocation callback of a command handler
#[derive(Clone)]
#[repr(transparent)]
pub struct CommandCallback(Arc<CommandFn>);

/// The suggestion callback of an autocomplete handler
#[derive(Clone)]
#[repr(transparent)]
pub struct AutocompleteCallback(Arc<AutocompleteFn>);

/// Produces the fallback value of an optional parameter
#[derive(Clone)]
#[repr(transparent)]
pub struct DefaultValue(Arc<DefaultFn>);

/// Reassembles a complex parameter from its converted fields
#[derive(Clone)]
#[repr(transparent)]
pub struct ComplexAssembler(Arc<AssembleFn>);

/// Constructs a modal struct from its submitted field values
#[derive(Clone)]
#[repr(transparent)]
pub struct ModalConstructor(Arc<ConstructFn>);

opaque_debug!(
    CommandCallback,
    AutocompleteCallback,
    DefaultValue,
    ComplexAssembler,
    ModalConstructor,
);

impl CommandCallback {
    /// Wrap an async closure as a command callback
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(InteractionContext, Args) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        Self(Arc::new(move |ctx, args| Box::pin(f(ctx, args))))
    }

    pub(crate) fn invoke(
        &self,
        ctx: InteractionContext,
        args: Args,
    ) -> BoxFuture<'static, Result<(), HandlerError>> {
        (self.0)(ctx, args)
    }
}

impl AutocompleteCallback {
    /// Wrap an async closure as an autocomplete callback
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(InteractionContext, String) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<Vec<Suggestion>>> + Send + 'static,
    {
        Self(Arc::new(move |ctx, input| Box::pin(f(ctx, input))))
    }

    pub(crate) fn invoke(
        &self,
        ctx: InteractionContext,
        input: String,
    ) -> BoxFuture<'static, anyhow::Result<Vec<Suggestion>>> {
        (self.0)(ctx, input)
    }
}

impl DefaultValue {
    /// Wrap a closure producing the fallback value
    pub fn new(f: impl Fn() -> ArgValue + Send + Sync + 'static) -> Self { Self(Arc::new(f)) }

    /// Wrap a cloneable constant as the fallback value
    pub fn constant<T: Clone + Send + Sync + 'static>(value: T) -> Self {
        Self::new(move || Box::new(value.clone()))
    }

    pub(crate) fn produce(&self) -> ArgValue { (self.0)() }
}

impl ComplexAssembler {
    /// Wrap a closure reassembling the complex parameter
    pub fn new(
        f: impl Fn(Vec<ArgValue>) -> anyhow::Result<ArgValue> + Send + Sync + 'static,
    ) -> Self {
        Self(Arc::new(f))
    }

    pub(crate) fn assemble(&self, fields: Vec<ArgValue>) -> anyhow::Result<ArgValue> {
        (self.0)(fields)
    }
}

impl ModalConstructor {
    /// Wrap a closure constructing the modal struct
    pub fn new(
        f: impl Fn(Vec<Option<String>>) -> anyhow::Result<ArgValue> + Send + Sync + 'static,
    ) -> Self {
        Self(Arc::new(f))
    }

    pub(crate) fn construct(&self, fields: Vec<Option<String>>) -> anyhow::Result<ArgValue> {
        (self.0)(fields)
    }
}

/// A marker attribute accumulated down the module chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name
    pub name: String,
    /// Optional attribute payload
    pub value: Option<String>,
}

impl Attribute {
    /// Construct a bare marker attribute
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    /// Construct an attribute carrying a value
    #[must_use]
    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

/// Optional lifecycle callbacks a module may supply
#[async_trait::async_trait]
pub trait ModuleLifecycle: fmt::Debug + Send + Sync {
    /// Invoked once when the module's metadata tree has been built
    fn on_building(&self, module: &crate::info::ModuleInfo) { let _ = module; }

    /// Invoked before every handler dispatch within the module
    async fn before_execute(&self, ctx: &InteractionContext, command: &str) {
        let _ = (ctx, command);
    }

    /// Invoked after every handler dispatch within the module
    async fn after_execute(&self, ctx: &InteractionContext, command: &str, result: &ExecuteResult) {
        let _ = (ctx, command, result);
    }
}

/// Dispatch policy of a single command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    /// Follow the framework-wide `run_async` configuration
    #[default]
    Default,
    /// Always await the handler on the caller's task
    Sync,
    /// Always dispatch the handler on a detached task
    Async,
}

/// Kind of a context-menu command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    /// Invoked on a user
    User,
    /// Invoked on a message
    Message,
}

/// How a parameter's autocomplete handler is referenced
#[derive(Debug, Clone)]
pub enum AutocompleteBinding {
    /// The handler is supplied inline
    Inline(AutocompleteCallback),
    /// The handler is declared separately on the module and referenced by
    /// name
    Named(String),
}

/// Declaration of a complex parameter: a struct whose public fields map to
/// individual platform options
#[derive(Debug, Clone)]
pub struct ComplexDescriptor {
    /// The struct type, used for cycle detection
    pub ty: DeclaredType,
    /// Field declarations, flattened in source order
    pub fields: Vec<ParameterDescriptor>,
    /// Reassembles the struct from its converted fields
    pub assemble: ComplexAssembler,
}

/// Declaration of one command parameter
#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
    /// Parameter name
    pub name: String,
    /// Declared native type
    pub ty: DeclaredType,
    /// Description shown by the platform (slash commands only)
    pub description: String,
    /// True if the invocation must supply the parameter
    pub required: bool,
    /// Fallback value used when an optional parameter is absent
    pub default_value: Option<DefaultValue>,
    /// Minimum accepted numeric value
    pub min_value: Option<f64>,
    /// Maximum accepted numeric value
    pub max_value: Option<f64>,
    /// Channel-type restriction for channel parameters
    pub channel_types: Vec<ChannelKind>,
    /// Declared choices, at most 25
    pub choices: Vec<ChoicePayload>,
    /// Autocomplete handler for this parameter
    pub autocomplete: Option<AutocompleteBinding>,
    /// Present if this is a complex parameter
    pub complex: Option<ComplexDescriptor>,
    /// Overrides the registry-resolved type converter
    pub converter: Option<Arc<dyn TypeConverter>>,
}

impl ParameterDescriptor {
    /// Declare a required parameter of type `T`
    #[must_use]
    pub fn required<T: 'static>(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: DeclaredType::of::<T>(),
            description: description.into(),
            required: true,
            default_value: None,
            min_value: None,
            max_value: None,
            channel_types: vec![],
            choices: vec![],
            autocomplete: None,
            complex: None,
            converter: None,
        }
    }

    /// Declare an optional parameter of type `T` with a fallback value
    #[must_use]
    pub fn optional<T: Clone + Send + Sync + 'static>(
        name: impl Into<String>,
        description: impl Into<String>,
        default: T,
    ) -> Self {
        let mut this = Self::required::<T>(name, description);
        this.required = false;
        this.default_value = Some(DefaultValue::constant(default));
        this
    }

    /// Restrict the numeric range of the parameter
    #[must_use]
    pub fn bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_value = min;
        self.max_value = max;
        self
    }

    /// Declare the parameter's choices
    #[must_use]
    pub fn choices(mut self, choices: Vec<ChoicePayload>) -> Self {
        self.choices = choices;
        self
    }

    /// Attach an inline autocomplete handler
    #[must_use]
    pub fn autocomplete(mut self, callback: AutocompleteCallback) -> Self {
        self.autocomplete = Some(AutocompleteBinding::Inline(callback));
        self
    }

    /// Reference a named autocomplete handler declared on the module
    #[must_use]
    pub fn autocomplete_ref(mut self, name: impl Into<String>) -> Self {
        self.autocomplete = Some(AutocompleteBinding::Named(name.into()));
        self
    }
}

/// Declaration of one slash command
#[derive(Debug, Clone)]
pub struct SlashCommandDescriptor {
    /// Command name, 1–32 lowercase characters
    pub name: String,
    /// Command description, 1–100 characters
    pub description: String,
    /// Publish at the root even when declared inside a slash-group
    pub ignore_group_names: bool,
    /// Overrides the module's default-permission flag
    pub default_permission: Option<bool>,
    /// Dispatch policy
    pub run_mode: RunMode,
    /// Parameter declarations, required before optional
    pub parameters: Vec<ParameterDescriptor>,
    /// Attributes appended after the module chain's
    pub attributes: Vec<Attribute>,
    /// Preconditions evaluated after the module chain's
    pub preconditions: Vec<Arc<dyn Precondition>>,
    /// The handler
    pub callback: CommandCallback,
}

impl SlashCommandDescriptor {
    /// Declare a slash command with no parameters
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        callback: CommandCallback,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ignore_group_names: false,
            default_permission: None,
            run_mode: RunMode::Default,
            parameters: vec![],
            attributes: vec![],
            preconditions: vec![],
            callback,
        }
    }

    /// Append a parameter declaration
    #[must_use]
    pub fn parameter(mut self, parameter: ParameterDescriptor) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Publish this command at the root even inside a slash-group
    #[must_use]
    pub fn ignore_group_names(mut self) -> Self {
        self.ignore_group_names = true;
        self
    }

    /// Set the dispatch policy
    #[must_use]
    pub fn run_mode(mut self, mode: RunMode) -> Self {
        self.run_mode = mode;
        self
    }

    /// Append a precondition
    #[must_use]
    pub fn precondition(mut self, precondition: Arc<dyn Precondition>) -> Self {
        self.preconditions.push(precondition);
        self
    }
}

/// Declaration of one context-menu command
#[derive(Debug, Clone)]
pub struct ContextCommandDescriptor {
    /// Command name, 1–32 characters
    pub name: String,
    /// Whether the command targets users or messages
    pub kind: ContextKind,
    /// Overrides the module's default-permission flag
    pub default_permission: Option<bool>,
    /// Dispatch policy
    pub run_mode: RunMode,
    /// Attributes appended after the module chain's
    pub attributes: Vec<Attribute>,
    /// Preconditions evaluated after the module chain's
    pub preconditions: Vec<Arc<dyn Precondition>>,
    /// The handler; receives the single synthetic target argument
    pub callback: CommandCallback,
}

impl ContextCommandDescriptor {
    /// Declare a context command
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ContextKind, callback: CommandCallback) -> Self {
        Self {
            name: name.into(),
            kind,
            default_permission: None,
            run_mode: RunMode::Default,
            attributes: vec![],
            preconditions: vec![],
            callback,
        }
    }
}

/// Declaration of one component handler; the name is a custom-ID pattern
#[derive(Debug, Clone)]
pub struct ComponentDescriptor {
    /// Custom-ID pattern, possibly containing wildcards
    pub name: String,
    /// Capture parameters, plus a trailing `Vec<String>` parameter for
    /// select menus
    pub parameters: Vec<ParameterDescriptor>,
    /// Dispatch policy
    pub run_mode: RunMode,
    /// Attributes appended after the module chain's
    pub attributes: Vec<Attribute>,
    /// Preconditions evaluated after the module chain's
    pub preconditions: Vec<Arc<dyn Precondition>>,
    /// The handler
    pub callback: CommandCallback,
}

impl ComponentDescriptor {
    /// Declare a component handler
    #[must_use]
    pub fn new(name: impl Into<String>, callback: CommandCallback) -> Self {
        Self {
            name: name.into(),
            parameters: vec![],
            run_mode: RunMode::Default,
            attributes: vec![],
            preconditions: vec![],
            callback,
        }
    }

    /// Append a capture parameter
    #[must_use]
    pub fn parameter(mut self, parameter: ParameterDescriptor) -> Self {
        self.parameters.push(parameter);
        self
    }
}

/// Binding of one modal text input to a struct field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextInputBinding {
    /// Per-field custom identifier
    pub custom_id: String,
    /// True if a submission must fill the field
    pub required: bool,
}

/// Declaration of the modal struct a modal handler receives
#[derive(Debug, Clone)]
pub struct ModalSpec {
    /// The modal struct type
    pub ty: DeclaredType,
    /// Text-input bindings in field order
    pub inputs: Vec<TextInputBinding>,
    /// Constructs the struct from submitted values, one per binding
    pub construct: ModalConstructor,
}

/// Declaration of one modal handler; the name is a custom-ID pattern
#[derive(Debug, Clone)]
pub struct ModalDescriptor {
    /// Custom-ID pattern, possibly containing wildcards
    pub name: String,
    /// The modal struct passed as the first argument
    pub modal: ModalSpec,
    /// Capture parameters following the modal argument
    pub parameters: Vec<ParameterDescriptor>,
    /// Dispatch policy
    pub run_mode: RunMode,
    /// Attributes appended after the module chain's
    pub attributes: Vec<Attribute>,
    /// Preconditions evaluated after the module chain's
    pub preconditions: Vec<Arc<dyn Precondition>>,
    /// The handler
    pub callback: CommandCallback,
}

impl ModalDescriptor {
    /// Declare a modal handler
    #[must_use]
    pub fn new(name: impl Into<String>, modal: ModalSpec, callback: CommandCallback) -> Self {
        Self {
            name: name.into(),
            modal,
            parameters: vec![],
            run_mode: RunMode::Default,
            attributes: vec![],
            preconditions: vec![],
            callback,
        }
    }
}

/// Declaration of a free autocomplete handler referenced by name
#[derive(Debug, Clone)]
pub struct AutocompleteDescriptor {
    /// Handler name referenced by [`ParameterDescriptor::autocomplete_ref`]
    pub name: String,
    /// The suggestion callback
    pub callback: AutocompleteCallback,
}

/// Platform-visible naming of a slash-group module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDescriptor {
    /// Group name, 1–32 lowercase characters
    pub name: String,
    /// Group description, 1–100 characters
    pub description: Option<String>,
}

/// Declaration of one module: a named group of handlers
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    /// Internal module identifier
    pub name: String,
    /// Present iff the module is a slash-group
    pub group: Option<GroupDescriptor>,
    /// Whether the module's commands are enabled by default
    pub default_permission: bool,
    /// Skip this module during command sync
    pub dont_auto_register: bool,
    /// Attributes inherited by every child
    pub attributes: Vec<Attribute>,
    /// Preconditions evaluated before every child's own
    pub preconditions: Vec<Arc<dyn Precondition>>,
    /// Optional lifecycle callbacks
    pub lifecycle: Option<Arc<dyn ModuleLifecycle>>,
    /// Nested modules
    pub submodules: Vec<ModuleDescriptor>,
    /// Slash-command declarations
    pub slash_commands: Vec<SlashCommandDescriptor>,
    /// Context-command declarations
    pub context_commands: Vec<ContextCommandDescriptor>,
    /// Component-handler declarations
    pub components: Vec<ComponentDescriptor>,
    /// Modal-handler declarations
    pub modals: Vec<ModalDescriptor>,
    /// Free autocomplete handlers
    pub autocompletes: Vec<AutocompleteDescriptor>,
}

impl ModuleDescriptor {
    /// Declare an empty module
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: None,
            default_permission: true,
            dont_auto_register: false,
            attributes: vec![],
            preconditions: vec![],
            lifecycle: None,
            submodules: vec![],
            slash_commands: vec![],
            context_commands: vec![],
            components: vec![],
            modals: vec![],
            autocompletes: vec![],
        }
    }

    /// Mark the module as a slash-group
    #[must_use]
    pub fn group(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.group = Some(GroupDescriptor {
            name: name.into(),
            description: Some(description.into()),
        });
        self
    }

    /// Append a slash-command declaration
    #[must_use]
    pub fn slash(mut self, command: SlashCommandDescriptor) -> Self {
        self.slash_commands.push(command);
        self
    }

    /// Append a context-command declaration
    #[must_use]
    pub fn context(mut self, command: ContextCommandDescriptor) -> Self {
        self.context_commands.push(command);
        self
    }

    /// Append a component-handler declaration
    #[must_use]
    pub fn component(mut self, component: ComponentDescriptor) -> Self {
        self.components.push(component);
        self
    }

    /// Append a modal-handler declaration
    #[must_use]
    pub fn modal(mut self, modal: ModalDescriptor) -> Self {
        self.modals.push(modal);
        self
    }

    /// Append a free autocomplete handler
    #[must_use]
    pub fn autocomplete(mut self, name: impl Into<String>, callback: AutocompleteCallback) -> Self {
        self.autocompletes.push(AutocompleteDescriptor {
            name: name.into(),
            callback,
        });
        self
    }

    /// Append a nested module
    #[must_use]
    pub fn submodule(mut self, module: ModuleDescriptor) -> Self {
        self.submodules.push(module);
        self
    }

    /// Append a module-level precondition
    #[must_use]
    pub fn precondition(mut self, precondition: Arc<dyn Precondition>) -> Self {
        self.preconditions.push(precondition);
        self
    }

    /// Append an attribute
    #[must_use]
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Attach lifecycle callbacks
    #[must_use]
    pub fn lifecycle(mut self, lifecycle: Arc<dyn ModuleLifecycle>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    /// Exclude the module from command sync
    #[must_use]
    pub fn dont_auto_register(mut self) -> Self {
        self.dont_auto_register = true;
        self
    }
}

/// A source of module declarations consumed by
/// [`InteractionFramework::add_modules`](crate::InteractionFramework::add_modules)
pub trait ModuleSource {
    /// Yield the declared modules
    fn into_modules(self) -> Vec<ModuleDescriptor>;
}

impl ModuleSource for ModuleDescriptor {
    fn into_modules(self) -> Vec<ModuleDescriptor> { vec![self] }
}

impl ModuleSource for Vec<ModuleDescriptor> {
    fn into_modules(self) -> Vec<ModuleDescriptor> { self }
}
