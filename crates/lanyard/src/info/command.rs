use std::sync::{Arc, Weak};

use super::{ModuleInfo, ParameterInfo};
use crate::{
    describe::{
        Attribute, AutocompleteCallback, CommandCallback, ContextKind, DeclaredType,
        ModalConstructor, RunMode, TextInputBinding,
    },
    precondition::Precondition,
};

/// Built metadata for one slash command
#[derive(Debug)]
pub struct SlashCommandInfo {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) path: Vec<String>,
    pub(crate) ignore_group_names: bool,
    pub(crate) default_permission: bool,
    pub(crate) run_mode: RunMode,
    pub(crate) parameters: Vec<ParameterInfo>,
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) preconditions: Vec<Arc<dyn Precondition>>,
    pub(crate) callback: CommandCallback,
    pub(crate) module: Weak<ModuleInfo>,
}

impl SlashCommandInfo {
    /// Command name (the final path segment)
    #[must_use]
    pub fn name(&self) -> &str { &self.name }

    /// Platform-visible description
    #[must_use]
    pub fn description(&self) -> &str { &self.description }

    /// Full published path, group segments included
    #[must_use]
    pub fn path(&self) -> &[String] { &self.path }

    /// The path joined into the platform's display form
    #[must_use]
    pub fn qualified_name(&self) -> String { self.path.join(" ") }

    /// True if the command escapes its group to the root
    #[must_use]
    pub fn ignores_group_names(&self) -> bool { self.ignore_group_names }

    /// Whether the command is enabled by default
    #[must_use]
    pub fn default_permission(&self) -> bool { self.default_permission }

    /// Parameters in declaration order
    #[must_use]
    pub fn parameters(&self) -> &[ParameterInfo] { &self.parameters }

    /// Attributes inherited from the module chain plus the command's own
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] { &self.attributes }

    /// The declaring module, if it is still registered
    #[must_use]
    pub fn module(&self) -> Option<Arc<ModuleInfo>> { self.module.upgrade() }
}

/// Built metadata for one context-menu command
#[derive(Debug)]
pub struct ContextCommandInfo {
    pub(crate) name: String,
    pub(crate) kind: ContextKind,
    pub(crate) default_permission: bool,
    pub(crate) run_mode: RunMode,
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) preconditions: Vec<Arc<dyn Precondition>>,
    pub(crate) callback: CommandCallback,
    pub(crate) module: Weak<ModuleInfo>,
}

impl ContextCommandInfo {
    /// Command name as shown in the context menu
    #[must_use]
    pub fn name(&self) -> &str { &self.name }

    /// Whether the command targets users or messages
    #[must_use]
    pub fn kind(&self) -> ContextKind { self.kind }

    /// Whether the command is enabled by default
    #[must_use]
    pub fn default_permission(&self) -> bool { self.default_permission }

    /// The declaring module, if it is still registered
    #[must_use]
    pub fn module(&self) -> Option<Arc<ModuleInfo>> { self.module.upgrade() }
}

/// Built metadata for one component handler
#[derive(Debug)]
pub struct ComponentCommandInfo {
    pub(crate) name: String,
    pub(crate) parameters: Vec<ParameterInfo>,
    pub(crate) run_mode: RunMode,
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) preconditions: Vec<Arc<dyn Precondition>>,
    pub(crate) callback: CommandCallback,
    pub(crate) module: Weak<ModuleInfo>,
}

impl ComponentCommandInfo {
    /// The custom-ID pattern this handler matches
    #[must_use]
    pub fn name(&self) -> &str { &self.name }

    /// Component handler names always support wildcards
    #[must_use]
    pub fn supports_wildcards(&self) -> bool { true }

    /// Capture parameters, plus the trailing select-values parameter if
    /// declared
    #[must_use]
    pub fn parameters(&self) -> &[ParameterInfo] { &self.parameters }

    /// The declaring module, if it is still registered
    #[must_use]
    pub fn module(&self) -> Option<Arc<ModuleInfo>> { self.module.upgrade() }
}

/// Built metadata for the modal struct a modal handler receives
#[derive(Debug)]
pub struct ModalInfo {
    pub(crate) ty: DeclaredType,
    pub(crate) inputs: Vec<TextInputBinding>,
    pub(crate) construct: ModalConstructor,
}

impl ModalInfo {
    /// The modal struct type
    #[must_use]
    pub fn ty(&self) -> &DeclaredType { &self.ty }

    /// Text-input bindings in field order
    #[must_use]
    pub fn inputs(&self) -> &[TextInputBinding] { &self.inputs }
}

/// Built metadata for one modal handler
#[derive(Debug)]
pub struct ModalCommandInfo {
    pub(crate) name: String,
    pub(crate) modal: ModalInfo,
    pub(crate) parameters: Vec<ParameterInfo>,
    pub(crate) run_mode: RunMode,
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) preconditions: Vec<Arc<dyn Precondition>>,
    pub(crate) callback: CommandCallback,
    pub(crate) module: Weak<ModuleInfo>,
}

impl ModalCommandInfo {
    /// The custom-ID pattern this handler matches
    #[must_use]
    pub fn name(&self) -> &str { &self.name }

    /// Modal handler names always support wildcards
    #[must_use]
    pub fn supports_wildcards(&self) -> bool { true }

    /// The modal struct metadata
    #[must_use]
    pub fn modal(&self) -> &ModalInfo { &self.modal }

    /// Capture parameters following the modal argument
    #[must_use]
    pub fn parameters(&self) -> &[ParameterInfo] { &self.parameters }

    /// The declaring module, if it is still registered
    #[must_use]
    pub fn module(&self) -> Option<Arc<ModuleInfo>> { self.module.upgrade() }
}

/// Built metadata for one autocomplete handler
///
/// Parameter-bound handlers are named `"<command path>:<parameter>"`; free
/// handlers keep their declared name.
#[derive(Debug)]
pub struct AutocompleteInfo {
    pub(crate) name: String,
    pub(crate) callback: AutocompleteCallback,
    pub(crate) module: Weak<ModuleInfo>,
}

impl AutocompleteInfo {
    /// Handler name
    #[must_use]
    pub fn name(&self) -> &str { &self.name }

    /// The declaring module, if it is still registered
    #[must_use]
    pub fn module(&self) -> Option<Arc<ModuleInfo>> { self.module.upgrade() }
}
