use std::sync::Arc;

use super::AutocompleteInfo;
use crate::{
    convert::TypeConverter,
    describe::{ComplexAssembler, DeclaredType, DefaultValue},
    payload::{ChannelKind, ChoicePayload},
};

/// Built metadata for a complex parameter: the struct type plus its
/// flattened fields
#[derive(Debug)]
pub struct ComplexInfo {
    pub(crate) ty: DeclaredType,
    pub(crate) fields: Vec<ParameterInfo>,
    pub(crate) assemble: ComplexAssembler,
}

impl ComplexInfo {
    /// The struct type this parameter reassembles into
    #[must_use]
    pub fn ty(&self) -> &DeclaredType { &self.ty }

    /// The flattened field parameters, in declaration order
    #[must_use]
    pub fn fields(&self) -> &[ParameterInfo] { &self.fields }
}

/// Built metadata for one command parameter
#[derive(Debug)]
pub struct ParameterInfo {
    pub(crate) name: String,
    pub(crate) ty: DeclaredType,
    pub(crate) description: String,
    pub(crate) required: bool,
    pub(crate) default_value: Option<DefaultValue>,
    pub(crate) min_value: Option<f64>,
    pub(crate) max_value: Option<f64>,
    pub(crate) channel_types: Vec<ChannelKind>,
    pub(crate) choices: Vec<ChoicePayload>,
    pub(crate) autocomplete: Option<Arc<AutocompleteInfo>>,
    pub(crate) complex: Option<ComplexInfo>,
    pub(crate) converter: Option<Arc<dyn TypeConverter>>,
}

impl ParameterInfo {
    /// Parameter name
    #[must_use]
    pub fn name(&self) -> &str { &self.name }

    /// Declared native type
    #[must_use]
    pub fn ty(&self) -> &DeclaredType { &self.ty }

    /// Platform-visible description
    #[must_use]
    pub fn description(&self) -> &str { &self.description }

    /// True if the invocation must supply the parameter
    #[must_use]
    pub fn is_required(&self) -> bool { self.required }

    /// Declared choices
    #[must_use]
    pub fn choices(&self) -> &[ChoicePayload] { &self.choices }

    /// The autocomplete handler bound to this parameter, if any
    #[must_use]
    pub fn autocomplete(&self) -> Option<&Arc<AutocompleteInfo>> { self.autocomplete.as_ref() }

    /// Complex-parameter metadata, if this parameter flattens a struct
    #[must_use]
    pub fn complex(&self) -> Option<&ComplexInfo> { self.complex.as_ref() }

    /// The resolved type converter; absent for complex parameters, which
    /// convert through their fields
    #[must_use]
    pub fn converter(&self) -> Option<&Arc<dyn TypeConverter>> { self.converter.as_ref() }
}
