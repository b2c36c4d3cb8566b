//! The built command metadata tree
//!
//! Everything here is immutable once
//! [`add_modules`](crate::InteractionFramework::add_modules) returns;
//! runtime lookups hand out `Arc`s into this tree and never mutate it.

mod command;
mod module;
mod parameter;

use std::sync::{Arc, Weak};

pub use command::{
    AutocompleteInfo, ComponentCommandInfo, ContextCommandInfo, ModalCommandInfo, ModalInfo,
    SlashCommandInfo,
};
pub(crate) use module::HandlerSet;
pub use module::{GroupInfo, ModuleInfo};
pub use parameter::{ComplexInfo, ParameterInfo};

use crate::{describe::ModuleLifecycle, precondition::Precondition};

/// Collect the module-chain preconditions (root first) followed by the
/// command's own
pub(crate) fn precondition_chain(
    module: &Weak<ModuleInfo>,
    own: &[Arc<dyn Precondition>],
) -> Vec<Arc<dyn Precondition>> {
    let mut modules = vec![];
    let mut cursor = module.upgrade();
    while let Some(m) = cursor {
        cursor = m.parent.upgrade();
        modules.push(m);
    }

    let mut chain: Vec<_> = modules
        .iter()
        .rev()
        .flat_map(|m| m.preconditions.iter().map(Arc::clone))
        .collect();
    chain.extend(own.iter().map(Arc::clone));
    chain
}

/// Collect the module-chain lifecycles, root first
pub(crate) fn lifecycle_chain(module: &Weak<ModuleInfo>) -> Vec<Arc<dyn ModuleLifecycle>> {
    let mut lifecycles = vec![];
    let mut cursor = module.upgrade();
    while let Some(m) = cursor {
        if let Some(l) = &m.lifecycle {
            lifecycles.push(Arc::clone(l));
        }
        cursor = m.parent.upgrade();
    }
    lifecycles.reverse();
    lifecycles
}
