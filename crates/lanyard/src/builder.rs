//! Transforms module descriptors into the immutable metadata tree
//!
//! Every build-time invariant lives here; a descriptor that survives
//! validation assembles infallibly. Validation also primes the converter
//! registry so assembly can re-resolve without error handling.

use std::{
    any::TypeId,
    sync::{Arc, Weak},
};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    convert::TypeConverterRegistry,
    describe::{
        Attribute, AutocompleteBinding, ComponentDescriptor, ContextCommandDescriptor,
        ModalDescriptor, ModuleDescriptor, ParameterDescriptor, SlashCommandDescriptor,
    },
    error::Error,
    info::{
        AutocompleteInfo, ComplexInfo, ComponentCommandInfo, ContextCommandInfo, GroupInfo,
        ModalCommandInfo, ModalInfo, ModuleInfo, ParameterInfo, SlashCommandInfo,
    },
    map::WildcardSyntax,
};

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-_\p{L}\p{N}]{1,32}$").unwrap_or_else(|e| unreachable!("{e}")));

const MAX_PARAMETERS: usize = 25;
const MAX_CHOICES: usize = 25;
const MAX_GROUP_DEPTH: usize = 2;

fn select_values_type() -> TypeId { TypeId::of::<Vec<String>>() }

/// Builds metadata trees from descriptors against one converter registry
/// and custom-ID configuration
#[derive(Debug)]
pub struct Builder<'a> {
    converters: &'a TypeConverterRegistry,
    syntax: WildcardSyntax,
    delimiters: &'a [char],
}

struct Inherited {
    attributes: Vec<Attribute>,
    path: Vec<String>,
    default_permission: bool,
    dont_auto_register: bool,
}

impl<'a> Builder<'a> {
    /// Construct a builder
    #[must_use]
    pub fn new(
        converters: &'a TypeConverterRegistry,
        syntax: WildcardSyntax,
        delimiters: &'a [char],
    ) -> Self {
        Self {
            converters,
            syntax,
            delimiters,
        }
    }

    /// Validate a descriptor and build its metadata tree
    ///
    /// # Errors
    /// Returns `ParseFailed`, `ComplexParameterCycle` or `NoConverter` when
    /// the descriptor violates a build-time invariant.
    pub fn build(&self, descriptor: ModuleDescriptor) -> Result<Arc<ModuleInfo>, Error> {
        self.validate_module(&descriptor, 0)?;
        Ok(self.assemble_module(descriptor, Weak::new(), &Inherited {
            attributes: vec![],
            path: vec![],
            default_permission: true,
            dont_auto_register: false,
        }))
    }

    // ---- validation ----

    fn validate_module(&self, desc: &ModuleDescriptor, group_depth: usize) -> Result<(), Error> {
        if desc.name.is_empty() {
            return Err(Error::parse("Module name must not be empty"));
        }

        let mut depth = group_depth;
        if let Some(group) = &desc.group {
            validate_slash_name("group", &group.name)?;
            match group.description.as_deref() {
                Some(d) if (1..=100).contains(&d.chars().count()) => (),
                Some(_) => {
                    return Err(Error::parse(format!(
                        "Description of group {:?} must be 1-100 characters",
                        group.name
                    )))
                },
                None => {
                    return Err(Error::parse(format!(
                        "Slash-group {:?} requires a description",
                        group.name
                    )))
                },
            }

            depth += 1;
            if depth > MAX_GROUP_DEPTH {
                return Err(Error::parse(format!(
                    "Slash-group {:?} exceeds the maximum nesting depth of {MAX_GROUP_DEPTH}",
                    group.name
                )));
            }
        }

        for cmd in &desc.slash_commands {
            self.validate_slash(cmd, desc)?;
        }
        for cmd in &desc.context_commands {
            validate_display_name("Context command", &cmd.name)?;
        }
        for component in &desc.components {
            self.validate_component(component)?;
        }
        for modal in &desc.modals {
            self.validate_modal(modal)?;
        }

        for sub in &desc.submodules {
            self.validate_module(sub, depth)?;
        }

        Ok(())
    }

    fn validate_slash(
        &self,
        cmd: &SlashCommandDescriptor,
        module: &ModuleDescriptor,
    ) -> Result<(), Error> {
        validate_slash_name("command", &cmd.name)?;
        if !(1..=100).contains(&cmd.description.chars().count()) {
            return Err(Error::parse(format!(
                "Description of command {:?} must be 1-100 characters",
                cmd.name
            )));
        }

        let mut leaves = vec![];
        let mut stack = vec![];
        flatten_leaves(&cmd.parameters, &mut stack, &mut leaves)?;

        if leaves.len() > MAX_PARAMETERS {
            return Err(Error::parse(format!(
                "Command {:?} declares {} parameters; at most {MAX_PARAMETERS} are allowed",
                cmd.name,
                leaves.len()
            )));
        }

        let mut seen_optional = false;
        for leaf in leaves {
            if leaf.required && seen_optional {
                return Err(Error::parse(format!(
                    "Required parameter {:?} of command {:?} follows an optional one",
                    leaf.name, cmd.name
                )));
            }
            seen_optional |= !leaf.required;
            self.validate_leaf(leaf, module, true)?;
        }

        Ok(())
    }

    fn validate_leaf(
        &self,
        param: &ParameterDescriptor,
        module: &ModuleDescriptor,
        slash: bool,
    ) -> Result<(), Error> {
        if slash {
            validate_slash_name("parameter", &param.name)?;
            if !(1..=100).contains(&param.description.chars().count()) {
                return Err(Error::parse(format!(
                    "Description of parameter {:?} must be 1-100 characters",
                    param.name
                )));
            }
        } else if param.name.is_empty() {
            return Err(Error::parse("Parameter name must not be empty"));
        }

        if !param.required && param.default_value.is_none() {
            return Err(Error::parse(format!(
                "Optional parameter {:?} requires a default value",
                param.name
            )));
        }

        if param.choices.len() > MAX_CHOICES {
            return Err(Error::parse(format!(
                "Parameter {:?} declares {} choices; at most {MAX_CHOICES} are allowed",
                param.name,
                param.choices.len()
            )));
        }
        for choice in &param.choices {
            if !(1..=100).contains(&choice.name.chars().count()) {
                return Err(Error::parse(format!(
                    "Choice names of parameter {:?} must be 1-100 characters",
                    param.name
                )));
            }
        }

        match &param.autocomplete {
            Some(_) if !param.choices.is_empty() => {
                return Err(Error::parse(format!(
                    "Parameter {:?} declares both choices and autocomplete",
                    param.name
                )))
            },
            Some(AutocompleteBinding::Named(name)) => {
                if !module.autocompletes.iter().any(|a| &a.name == name) {
                    return Err(Error::parse(format!(
                        "Parameter {:?} references unknown autocomplete handler {name:?}",
                        param.name
                    )));
                }
            },
            _ => (),
        }

        if param.converter.is_none() {
            self.converters.resolve(&param.ty)?;
        }
        Ok(())
    }

    fn pattern_captures(&self, name: &str) -> Result<usize, Error> {
        if name.is_empty() {
            return Err(Error::parse("Handler name pattern must not be empty"));
        }
        let segments = split_custom_id(name, self.delimiters);
        let last = segments.last().copied().unwrap_or(name);
        if self.syntax.is_pattern(last) {
            self.syntax.capture_count(last)
        } else {
            Ok(0)
        }
    }

    fn validate_captures(
        &self,
        kind: &str,
        name: &str,
        params: &[ParameterDescriptor],
        expected: usize,
    ) -> Result<(), Error> {
        if params.len() != expected {
            return Err(Error::parse(format!(
                "{kind} {name:?} declares {} parameters but its pattern supplies {expected}",
                params.len()
            )));
        }
        Ok(())
    }

    fn validate_component(&self, component: &ComponentDescriptor) -> Result<(), Error> {
        let captures = self.pattern_captures(&component.name)?;

        let has_select = component
            .parameters
            .last()
            .is_some_and(|p| p.ty.id() == select_values_type());
        for param in component
            .parameters
            .iter()
            .take(component.parameters.len().saturating_sub(1))
        {
            if param.ty.id() == select_values_type() {
                return Err(Error::parse(format!(
                    "Select values of component {:?} must bind to the last parameter",
                    component.name
                )));
            }
        }

        self.validate_captures(
            "Component handler",
            &component.name,
            &component.parameters,
            captures + usize::from(has_select),
        )?;

        for param in &component.parameters {
            if param.complex.is_some() {
                return Err(Error::parse(format!(
                    "Component parameter {:?} cannot be complex",
                    param.name
                )));
            }
            if param.ty.id() != select_values_type() && param.converter.is_none() {
                self.converters.resolve(&param.ty)?;
            }
        }
        Ok(())
    }

    fn validate_modal(&self, modal: &ModalDescriptor) -> Result<(), Error> {
        let captures = self.pattern_captures(&modal.name)?;
        self.validate_captures("Modal handler", &modal.name, &modal.parameters, captures)?;

        if modal.modal.inputs.is_empty() {
            return Err(Error::parse(format!(
                "Modal {:?} declares no text inputs",
                modal.name
            )));
        }
        for (i, input) in modal.modal.inputs.iter().enumerate() {
            if input.custom_id.is_empty() {
                return Err(Error::parse(format!(
                    "Text inputs of modal {:?} require custom IDs",
                    modal.name
                )));
            }
            if modal.modal.inputs[..i]
                .iter()
                .any(|o| o.custom_id == input.custom_id)
            {
                return Err(Error::parse(format!(
                    "Duplicate text-input custom ID {:?} in modal {:?}",
                    input.custom_id, modal.name
                )));
            }
        }

        for param in &modal.parameters {
            if param.complex.is_some() {
                return Err(Error::parse(format!(
                    "Modal parameter {:?} cannot be complex",
                    param.name
                )));
            }
            if param.converter.is_none() {
                self.converters.resolve(&param.ty)?;
            }
        }
        Ok(())
    }

    // ---- assembly (post-validation, infallible) ----

    fn assemble_module(
        &self,
        desc: ModuleDescriptor,
        parent: Weak<ModuleInfo>,
        inherited: &Inherited,
    ) -> Arc<ModuleInfo> {
        let ModuleDescriptor {
            name,
            group,
            default_permission,
            dont_auto_register,
            attributes,
            preconditions,
            lifecycle,
            submodules,
            slash_commands,
            context_commands,
            components,
            modals,
            autocompletes,
        } = desc;

        let group = group.map(|g| GroupInfo {
            name: g.name,
            description: g.description,
        });

        let mut merged_attributes = inherited.attributes.clone();
        merged_attributes.extend(attributes);
        let default_permission = inherited.default_permission && default_permission;
        let dont_auto_register = inherited.dont_auto_register || dont_auto_register;

        let mut path = inherited.path.clone();
        if let Some(g) = &group {
            path.push(g.name.clone());
        }

        let module = Arc::new_cyclic(|weak: &Weak<ModuleInfo>| {
            let mut autocomplete_infos: Vec<_> = autocompletes
                .into_iter()
                .map(|a| {
                    Arc::new(AutocompleteInfo {
                        name: a.name,
                        callback: a.callback,
                        module: weak.clone(),
                    })
                })
                .collect();

            let mut slash_infos = vec![];
            for cmd in slash_commands {
                slash_infos.push(self.assemble_slash(
                    cmd,
                    &path,
                    &merged_attributes,
                    default_permission,
                    weak,
                    &mut autocomplete_infos,
                ));
            }

            let context_infos = context_commands
                .into_iter()
                .map(|cmd| self.assemble_context(cmd, &merged_attributes, default_permission, weak))
                .collect();

            let mut component_infos = vec![];
            for component in components {
                component_infos.push(self.assemble_component(
                    component,
                    &merged_attributes,
                    weak,
                    &mut autocomplete_infos,
                ));
            }

            let mut modal_infos = vec![];
            for modal in modals {
                modal_infos.push(self.assemble_modal(
                    modal,
                    &merged_attributes,
                    weak,
                    &mut autocomplete_infos,
                ));
            }

            let submodules = submodules
                .into_iter()
                .map(|sub| {
                    self.assemble_module(sub, weak.clone(), &Inherited {
                        attributes: merged_attributes.clone(),
                        path: path.clone(),
                        default_permission,
                        dont_auto_register,
                    })
                })
                .collect();

            ModuleInfo {
                name,
                group,
                default_permission,
                dont_auto_register,
                attributes: merged_attributes.clone(),
                preconditions,
                lifecycle,
                parent,
                submodules,
                slash_commands: slash_infos,
                context_commands: context_infos,
                components: component_infos,
                modals: modal_infos,
                autocompletes: autocomplete_infos,
            }
        });

        if let Some(lifecycle) = &module.lifecycle {
            lifecycle.on_building(&module);
        }
        module
    }

    fn assemble_slash(
        &self,
        cmd: SlashCommandDescriptor,
        group_path: &[String],
        module_attributes: &[Attribute],
        module_permission: bool,
        module: &Weak<ModuleInfo>,
        autocompletes: &mut Vec<Arc<AutocompleteInfo>>,
    ) -> Arc<SlashCommandInfo> {
        let path = if cmd.ignore_group_names {
            vec![cmd.name.clone()]
        } else {
            let mut p = group_path.to_vec();
            p.push(cmd.name.clone());
            p
        };
        let qualified = path.join(" ");

        let mut attributes = module_attributes.to_vec();
        attributes.extend(cmd.attributes);

        let parameters = cmd
            .parameters
            .into_iter()
            .map(|p| self.assemble_parameter(p, &qualified, module, autocompletes))
            .collect();

        Arc::new(SlashCommandInfo {
            name: cmd.name,
            description: cmd.description,
            path,
            ignore_group_names: cmd.ignore_group_names,
            default_permission: cmd.default_permission.unwrap_or(module_permission),
            run_mode: cmd.run_mode,
            parameters,
            attributes,
            preconditions: cmd.preconditions,
            callback: cmd.callback,
            module: module.clone(),
        })
    }

    fn assemble_context(
        &self,
        cmd: ContextCommandDescriptor,
        module_attributes: &[Attribute],
        module_permission: bool,
        module: &Weak<ModuleInfo>,
    ) -> Arc<ContextCommandInfo> {
        let mut attributes = module_attributes.to_vec();
        attributes.extend(cmd.attributes);

        Arc::new(ContextCommandInfo {
            name: cmd.name,
            kind: cmd.kind,
            default_permission: cmd.default_permission.unwrap_or(module_permission),
            run_mode: cmd.run_mode,
            attributes,
            preconditions: cmd.preconditions,
            callback: cmd.callback,
            module: module.clone(),
        })
    }

    fn assemble_component(
        &self,
        component: ComponentDescriptor,
        module_attributes: &[Attribute],
        module: &Weak<ModuleInfo>,
        autocompletes: &mut Vec<Arc<AutocompleteInfo>>,
    ) -> Arc<ComponentCommandInfo> {
        let mut attributes = module_attributes.to_vec();
        attributes.extend(component.attributes);

        let name = component.name;
        let parameters = component
            .parameters
            .into_iter()
            .map(|p| self.assemble_parameter(p, &name, module, autocompletes))
            .collect();

        Arc::new(ComponentCommandInfo {
            name,
            parameters,
            run_mode: component.run_mode,
            attributes,
            preconditions: component.preconditions,
            callback: component.callback,
            module: module.clone(),
        })
    }

    fn assemble_modal(
        &self,
        modal: ModalDescriptor,
        module_attributes: &[Attribute],
        module: &Weak<ModuleInfo>,
        autocompletes: &mut Vec<Arc<AutocompleteInfo>>,
    ) -> Arc<ModalCommandInfo> {
        let mut attributes = module_attributes.to_vec();
        attributes.extend(modal.attributes);

        let name = modal.name;
        let parameters = modal
            .parameters
            .into_iter()
            .map(|p| self.assemble_parameter(p, &name, module, autocompletes))
            .collect();

        Arc::new(ModalCommandInfo {
            name,
            modal: ModalInfo {
                ty: modal.modal.ty,
                inputs: modal.modal.inputs,
                construct: modal.modal.construct,
            },
            parameters,
            run_mode: modal.run_mode,
            attributes,
            preconditions: modal.preconditions,
            callback: modal.callback,
            module: module.clone(),
        })
    }

    fn assemble_parameter(
        &self,
        param: ParameterDescriptor,
        owner: &str,
        module: &Weak<ModuleInfo>,
        autocompletes: &mut Vec<Arc<AutocompleteInfo>>,
    ) -> ParameterInfo {
        let autocomplete = param.autocomplete.map(|binding| match binding {
            AutocompleteBinding::Inline(callback) => {
                let info = Arc::new(AutocompleteInfo {
                    name: format!("{owner}:{}", param.name),
                    callback,
                    module: module.clone(),
                });
                autocompletes.push(Arc::clone(&info));
                info
            },
            AutocompleteBinding::Named(name) => autocompletes
                .iter()
                .find(|a| a.name == name)
                .map(Arc::clone)
                .unwrap_or_else(|| unreachable!("autocomplete ref validated")),
        });

        let complex = param.complex.map(|c| ComplexInfo {
            ty: c.ty,
            fields: c
                .fields
                .into_iter()
                .map(|f| self.assemble_parameter(f, owner, module, autocompletes))
                .collect(),
            assemble: c.assemble,
        });

        let converter = if complex.is_some() || param.ty.id() == select_values_type() {
            None
        } else {
            Some(param.converter.unwrap_or_else(|| {
                self.converters
                    .resolve(&param.ty)
                    .unwrap_or_else(|_| unreachable!("converter resolution validated"))
            }))
        };

        ParameterInfo {
            name: param.name,
            ty: param.ty,
            description: param.description,
            required: param.required,
            default_value: param.default_value,
            min_value: param.min_value,
            max_value: param.max_value,
            channel_types: param.channel_types,
            choices: param.choices,
            autocomplete,
            complex,
            converter,
        }
    }
}

fn flatten_leaves<'p>(
    params: &'p [ParameterDescriptor],
    stack: &mut Vec<TypeId>,
    out: &mut Vec<&'p ParameterDescriptor>,
) -> Result<(), Error> {
    for param in params {
        if let Some(complex) = &param.complex {
            if stack.contains(&complex.ty.id()) {
                return Err(Error::ComplexParameterCycle(complex.ty.name()));
            }
            stack.push(complex.ty.id());
            flatten_leaves(&complex.fields, stack, out)?;
            let _ = stack.pop();
        } else {
            out.push(param);
        }
    }
    Ok(())
}

/// Split a custom ID into path segments using the configured delimiter set;
/// an empty set leaves the whole ID as one token
pub(crate) fn split_custom_id<'i>(id: &'i str, delimiters: &[char]) -> Vec<&'i str> {
    if delimiters.is_empty() {
        vec![id]
    } else {
        id.split(|c| delimiters.contains(&c)).collect()
    }
}

fn validate_slash_name(kind: &str, name: &str) -> Result<(), Error> {
    if !NAME_RE.is_match(name) {
        return Err(Error::parse(format!(
            "Invalid {kind} name {name:?}: must be 1-32 word characters"
        )));
    }
    if name.chars().any(char::is_uppercase) {
        return Err(Error::parse(format!(
            "Invalid {kind} name {name:?}: must be lowercase"
        )));
    }
    Ok(())
}

fn validate_display_name(kind: &str, name: &str) -> Result<(), Error> {
    if (1..=32).contains(&name.chars().count()) {
        Ok(())
    } else {
        Err(Error::parse(format!(
            "{kind} name {name:?} must be 1-32 characters"
        )))
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::Builder;
    use crate::{
        convert::TypeConverterRegistry,
        describe::{
            CommandCallback, ComplexAssembler, ComplexDescriptor, ComponentDescriptor,
            DeclaredType, ModuleDescriptor, ParameterDescriptor, SlashCommandDescriptor,
        },
        error::Error,
        map::WildcardSyntax,
        payload::{ChoicePayload, ChoiceValue},
    };

    fn noop() -> CommandCallback { CommandCallback::new(|_, _| async { Ok(()) }) }

    fn build(desc: ModuleDescriptor) -> Result<Arc<crate::info::ModuleInfo>, Error> {
        let converters = TypeConverterRegistry::builtin();
        let builder = Builder::new(&converters, WildcardSyntax::default(), &[]);
        builder.build(desc)
    }

    fn slash(name: &str) -> SlashCommandDescriptor {
        SlashCommandDescriptor::new(name, "A test command", noop())
    }

    #[test]
    fn command_name_boundaries() {
        assert!(matches!(
            build(ModuleDescriptor::new("m").slash(slash(""))),
            Err(Error::ParseFailed(_))
        ));
        assert!(matches!(
            build(ModuleDescriptor::new("m").slash(slash(&"x".repeat(33)))),
            Err(Error::ParseFailed(_))
        ));
        assert!(build(ModuleDescriptor::new("m").slash(slash("x"))).is_ok());
        assert!(build(ModuleDescriptor::new("m").slash(slash(&"x".repeat(32)))).is_ok());
        assert!(matches!(
            build(ModuleDescriptor::new("m").slash(slash("Shout"))),
            Err(Error::ParseFailed(_))
        ));
    }

    #[test]
    fn description_boundaries() {
        let cmd = SlashCommandDescriptor::new("ok", "", noop());
        assert!(matches!(
            build(ModuleDescriptor::new("m").slash(cmd)),
            Err(Error::ParseFailed(_))
        ));

        let cmd = SlashCommandDescriptor::new("ok", "d".repeat(101), noop());
        assert!(matches!(
            build(ModuleDescriptor::new("m").slash(cmd)),
            Err(Error::ParseFailed(_))
        ));

        let cmd = SlashCommandDescriptor::new("ok", "d".repeat(100), noop());
        assert!(build(ModuleDescriptor::new("m").slash(cmd)).is_ok());
    }

    #[test]
    fn choice_count_boundaries() {
        let choices = |n: usize| {
            (0..n)
                .map(|i| ChoicePayload {
                    name: format!("c{i}"),
                    value: ChoiceValue::Int(i64::try_from(i).unwrap()),
                })
                .collect::<Vec<_>>()
        };

        let ok = slash("pick")
            .parameter(ParameterDescriptor::required::<i64>("n", "Pick one").choices(choices(25)));
        assert!(build(ModuleDescriptor::new("m").slash(ok)).is_ok());

        let too_many = slash("pick")
            .parameter(ParameterDescriptor::required::<i64>("n", "Pick one").choices(choices(26)));
        assert!(matches!(
            build(ModuleDescriptor::new("m").slash(too_many)),
            Err(Error::ParseFailed(_))
        ));
    }

    #[test]
    fn group_depth_boundaries() {
        let leaf = ModuleDescriptor::new("leaf")
            .group("inner", "Inner group")
            .slash(slash("do"));
        let two = ModuleDescriptor::new("mid")
            .group("outer", "Outer group")
            .submodule(leaf.clone());
        assert!(build(two).is_ok());

        let three = ModuleDescriptor::new("top").group("root", "Root group").submodule(
            ModuleDescriptor::new("mid")
                .group("outer", "Outer group")
                .submodule(leaf),
        );
        assert!(matches!(build(three), Err(Error::ParseFailed(_))));
    }

    #[test]
    fn required_parameters_precede_optional() {
        let cmd = slash("greet")
            .parameter(ParameterDescriptor::optional::<String>(
                "greeting",
                "Greeting to use",
                "hi".to_owned(),
            ))
            .parameter(ParameterDescriptor::required::<String>("who", "Target"));
        assert!(matches!(
            build(ModuleDescriptor::new("m").slash(cmd)),
            Err(Error::ParseFailed(_))
        ));
    }

    #[test]
    fn optional_parameters_need_defaults() {
        let mut param = ParameterDescriptor::required::<String>("who", "Target");
        param.required = false;
        assert!(matches!(
            build(ModuleDescriptor::new("m").slash(slash("greet").parameter(param))),
            Err(Error::ParseFailed(_))
        ));
    }

    #[test]
    fn complex_cycles_are_detected() {
        struct Inner;

        fn inner_complex() -> ComplexDescriptor {
            ComplexDescriptor {
                ty: DeclaredType::of::<Inner>(),
                fields: vec![ParameterDescriptor::required::<String>("leaf", "Leaf")],
                assemble: ComplexAssembler::new(|_| Ok(Box::new(()))),
            }
        }

        let mut cyclic = ParameterDescriptor::required::<Inner>("outer", "Outer");
        let mut nested = inner_complex();
        let mut inner_param = ParameterDescriptor::required::<Inner>("inner", "Inner");
        inner_param.complex = Some(inner_complex());
        nested.fields.push(inner_param);
        cyclic.complex = Some(nested);

        assert!(matches!(
            build(ModuleDescriptor::new("m").slash(slash("c").parameter(cyclic))),
            Err(Error::ComplexParameterCycle(_))
        ));
    }

    #[test]
    fn complex_fields_flatten_in_source_order() {
        struct Point;

        let mut param = ParameterDescriptor::required::<Point>("point", "A point");
        param.complex = Some(ComplexDescriptor {
            ty: DeclaredType::of::<Point>(),
            fields: vec![
                ParameterDescriptor::required::<i64>("x", "X coordinate"),
                ParameterDescriptor::required::<i64>("y", "Y coordinate"),
            ],
            assemble: ComplexAssembler::new(|_| Ok(Box::new(()))),
        });

        let module = build(ModuleDescriptor::new("m").slash(slash("mark").parameter(param))).unwrap();
        let cmd = &module.slash_commands()[0];
        let complex = cmd.parameters()[0].complex().unwrap();
        let names: Vec<_> = complex.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, ["x", "y"]);
    }

    #[test]
    fn component_capture_counts_must_match() {
        let ok = ComponentDescriptor::new("vote:{id:int}", noop())
            .parameter(ParameterDescriptor::required::<i64>("id", "Vote ID"));
        assert!(build(ModuleDescriptor::new("m").component(ok)).is_ok());

        let missing = ComponentDescriptor::new("vote:{id:int}", noop());
        assert!(matches!(
            build(ModuleDescriptor::new("m").component(missing)),
            Err(Error::ParseFailed(_))
        ));

        // Select values may not overlap the capture positions.
        let overlap = ComponentDescriptor::new("pick:{slot}", noop())
            .parameter(ParameterDescriptor::required::<Vec<String>>("values", "Selected"));
        assert!(matches!(
            build(ModuleDescriptor::new("m").component(overlap)),
            Err(Error::ParseFailed(_))
        ));
    }

    #[test]
    fn attributes_concatenate_parent_first() {
        use crate::describe::Attribute;

        let module = ModuleDescriptor::new("m")
            .attribute(Attribute::new("outer"))
            .submodule(
                ModuleDescriptor::new("inner")
                    .attribute(Attribute::new("inner"))
                    .slash({
                        let mut cmd = slash("go");
                        cmd.attributes.push(Attribute::new("cmd"));
                        cmd
                    }),
            );

        let built = build(module).unwrap();
        let inner = &built.submodules()[0];
        let cmd = &inner.slash_commands()[0];
        let names: Vec<_> = cmd.attributes().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["outer", "inner", "cmd"]);
    }

    #[test]
    fn group_paths_prefix_commands() {
        let module = ModuleDescriptor::new("admin-module")
            .group("admin", "Administrative commands")
            .slash(slash("kick"))
            .slash(slash("status").ignore_group_names());

        let built = build(module).unwrap();
        let kick = &built.slash_commands()[0];
        let status = &built.slash_commands()[1];
        assert_eq!(kick.path(), ["admin", "kick"]);
        assert_eq!(status.path(), ["status"]);
    }
}
