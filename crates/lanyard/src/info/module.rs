use std::sync::{Arc, Weak};

use super::{
    AutocompleteInfo, ComponentCommandInfo, ContextCommandInfo, ModalCommandInfo, SlashCommandInfo,
};
use crate::{
    describe::{Attribute, ModuleLifecycle},
    precondition::Precondition,
};

/// Platform-visible naming of a slash-group module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    /// Group name, published as the shared command prefix
    pub name: String,
    /// Group description
    pub description: Option<String>,
}

/// Built metadata for one module: a named group of handlers
#[derive(Debug)]
pub struct ModuleInfo {
    pub(crate) name: String,
    pub(crate) group: Option<GroupInfo>,
    pub(crate) default_permission: bool,
    pub(crate) dont_auto_register: bool,
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) preconditions: Vec<Arc<dyn Precondition>>,
    pub(crate) lifecycle: Option<Arc<dyn ModuleLifecycle>>,
    pub(crate) parent: Weak<ModuleInfo>,
    pub(crate) submodules: Vec<Arc<ModuleInfo>>,
    pub(crate) slash_commands: Vec<Arc<SlashCommandInfo>>,
    pub(crate) context_commands: Vec<Arc<ContextCommandInfo>>,
    pub(crate) components: Vec<Arc<ComponentCommandInfo>>,
    pub(crate) modals: Vec<Arc<ModalCommandInfo>>,
    pub(crate) autocompletes: Vec<Arc<AutocompleteInfo>>,
}

impl ModuleInfo {
    /// Internal module identifier
    #[must_use]
    pub fn name(&self) -> &str { &self.name }

    /// Platform-visible group naming, present iff the module is a
    /// slash-group
    #[must_use]
    pub fn group(&self) -> Option<&GroupInfo> { self.group.as_ref() }

    /// True if the module publishes its slash commands under a shared
    /// prefix
    #[must_use]
    pub fn is_slash_group(&self) -> bool { self.group.is_some() }

    /// Whether the module's commands are enabled by default
    #[must_use]
    pub fn default_permission(&self) -> bool { self.default_permission }

    /// True if the module is skipped during command sync
    #[must_use]
    pub fn dont_auto_register(&self) -> bool { self.dont_auto_register }

    /// Accumulated attributes, parent chain first
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] { &self.attributes }

    /// The parent module, if any
    #[must_use]
    pub fn parent(&self) -> Option<Arc<ModuleInfo>> { self.parent.upgrade() }

    /// Nested modules
    #[must_use]
    pub fn submodules(&self) -> &[Arc<ModuleInfo>] { &self.submodules }

    /// Slash commands declared directly on this module
    #[must_use]
    pub fn slash_commands(&self) -> &[Arc<SlashCommandInfo>] { &self.slash_commands }

    /// Context commands declared directly on this module
    #[must_use]
    pub fn context_commands(&self) -> &[Arc<ContextCommandInfo>] { &self.context_commands }

    /// Component handlers declared directly on this module
    #[must_use]
    pub fn components(&self) -> &[Arc<ComponentCommandInfo>] { &self.components }

    /// Modal handlers declared directly on this module
    #[must_use]
    pub fn modals(&self) -> &[Arc<ModalCommandInfo>] { &self.modals }

    /// Autocomplete handlers declared on this module, parameter-bound ones
    /// included
    #[must_use]
    pub fn autocompletes(&self) -> &[Arc<AutocompleteInfo>] { &self.autocompletes }

    /// Recursively collect every handler of this module and its submodules
    pub(crate) fn collect_handlers(&self, out: &mut HandlerSet) {
        out.slash.extend(self.slash_commands.iter().map(Arc::clone));
        out.context.extend(self.context_commands.iter().map(Arc::clone));
        out.components.extend(self.components.iter().map(Arc::clone));
        out.modals.extend(self.modals.iter().map(Arc::clone));
        for sub in &self.submodules {
            sub.collect_handlers(out);
        }
    }
}

/// Every routable handler of a module subtree, flattened
#[derive(Debug, Default)]
pub(crate) struct HandlerSet {
    pub slash: Vec<Arc<SlashCommandInfo>>,
    pub context: Vec<Arc<ContextCommandInfo>>,
    pub components: Vec<Arc<ComponentCommandInfo>>,
    pub modals: Vec<Arc<ModalCommandInfo>>,
}
