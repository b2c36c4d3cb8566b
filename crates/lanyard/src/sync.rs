//! Reconciliation of the declared command tree with the platform's
//! registered command sets

use std::sync::Arc;

use crate::{
    context::{CommandId, GuildId},
    describe::ContextKind,
    info::{ModuleInfo, ParameterInfo, SlashCommandInfo},
    payload::{CommandKind, CommandPayload, OptionKind, OptionPayload},
};

/// Which registered command set a sync call reconciles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The application's global command set
    Global,
    /// One guild's command set
    Guild(GuildId),
}

/// The external registry the sync engine submits command payloads through
///
/// Bulk overwrites are authoritative: the submitted list becomes the
/// scope's entire registered set. Callers must serialise syncs to the same
/// scope.
#[async_trait::async_trait]
pub trait CommandRegistryClient: std::fmt::Debug + Send + Sync {
    /// Fetch the globally registered commands
    async fn get_global(&self) -> anyhow::Result<Vec<CommandPayload>>;

    /// Fetch a guild's registered commands
    async fn get_guild(&self, guild: GuildId) -> anyhow::Result<Vec<CommandPayload>>;

    /// Replace the global command set
    async fn bulk_overwrite_global(
        &self,
        commands: Vec<CommandPayload>,
    ) -> anyhow::Result<Vec<CommandPayload>>;

    /// Replace a guild's command set
    async fn bulk_overwrite_guild(
        &self,
        guild: GuildId,
        commands: Vec<CommandPayload>,
    ) -> anyhow::Result<Vec<CommandPayload>>;

    /// Create a single guild command without overwriting others
    async fn create_guild(
        &self,
        guild: GuildId,
        command: CommandPayload,
    ) -> anyhow::Result<CommandPayload>;

    /// Delete a registered command
    async fn delete(&self, id: CommandId) -> anyhow::Result<()>;
}

/// Emit the platform payloads for a set of registered modules, skipping
/// those marked `dont_auto_register`
#[must_use]
pub fn emit_payloads(modules: &[Arc<ModuleInfo>]) -> Vec<CommandPayload> {
    let mut out = vec![];
    for module in modules {
        emit_module(module, &mut out);
    }
    out
}

fn emit_module(module: &ModuleInfo, out: &mut Vec<CommandPayload>) {
    if module.dont_auto_register() {
        return;
    }

    emit_context_commands(module, out);

    if module.is_slash_group() {
        let group = module
            .group()
            .unwrap_or_else(|| unreachable!("slash-group without group info"));
        let mut payload = CommandPayload {
            id: None,
            kind: CommandKind::ChatInput,
            name: group.name.to_lowercase(),
            description: group.description.clone().unwrap_or_default(),
            options: vec![],
            default_permission: module.default_permission(),
        };
        fill_group_options(module, &mut payload.options, out);
        out.push(payload);
    } else {
        for cmd in module.slash_commands() {
            out.push(slash_payload(cmd));
        }
        for sub in module.submodules() {
            emit_module(sub, out);
        }
    }
}

// Context commands are always top-level payloads, group nesting or not.
fn emit_context_commands(module: &ModuleInfo, out: &mut Vec<CommandPayload>) {
    for cmd in module.context_commands() {
        out.push(CommandPayload {
            id: None,
            kind: match cmd.kind() {
                ContextKind::User => CommandKind::User,
                ContextKind::Message => CommandKind::Message,
            },
            name: cmd.name().to_owned(),
            description: String::new(),
            options: vec![],
            default_permission: cmd.default_permission(),
        });
    }
}

/// Fill a group payload's options with subcommands and subcommand groups,
/// routing `ignore_group_names` commands and context commands back to the
/// top level
fn fill_group_options(
    module: &ModuleInfo,
    options: &mut Vec<OptionPayload>,
    escaped: &mut Vec<CommandPayload>,
) {
    for cmd in module.slash_commands() {
        if cmd.ignores_group_names() {
            escaped.push(slash_payload(cmd));
        } else {
            options.push(subcommand_option(cmd));
        }
    }

    for sub in module.submodules() {
        if sub.dont_auto_register() {
            continue;
        }
        emit_context_commands(sub, escaped);

        if let Some(group) = sub.group() {
            let mut opt = OptionPayload::new(OptionKind::SubCommandGroup, group.name.to_lowercase());
            opt.description = group.description.clone().unwrap_or_default();
            fill_group_options(sub, &mut opt.options, escaped);
            options.push(opt);
        } else {
            // Groupless submodules flatten into the enclosing group.
            fill_group_options(sub, options, escaped);
        }
    }
}

fn slash_payload(cmd: &SlashCommandInfo) -> CommandPayload {
    CommandPayload {
        id: None,
        kind: CommandKind::ChatInput,
        name: cmd.name().to_owned(),
        description: cmd.description().to_owned(),
        options: parameter_options(cmd.parameters()),
        default_permission: cmd.default_permission(),
    }
}

fn subcommand_option(cmd: &SlashCommandInfo) -> OptionPayload {
    let mut opt = OptionPayload::new(OptionKind::SubCommand, cmd.name());
    opt.description = cmd.description().to_owned();
    opt.options = parameter_options(cmd.parameters());
    opt
}

fn parameter_options(params: &[ParameterInfo]) -> Vec<OptionPayload> {
    let mut out = vec![];
    collect_parameter_options(params, &mut out);
    out
}

fn collect_parameter_options(params: &[ParameterInfo], out: &mut Vec<OptionPayload>) {
    for param in params {
        if let Some(complex) = param.complex() {
            collect_parameter_options(complex.fields(), out);
            continue;
        }

        let converter = param
            .converter()
            .unwrap_or_else(|| unreachable!("leaf parameter without converter"));
        let mut opt = OptionPayload::new(converter.option_kind(), param.name());
        opt.description = param.description().to_owned();
        opt.required = param.is_required();
        converter.decorate(&mut opt);
        if !param.choices().is_empty() {
            opt.choices = param.choices().to_vec();
        }
        opt.channel_types = param.channel_types.clone();
        opt.min_value = param.min_value.and_then(serde_json::Number::from_f64);
        opt.max_value = param.max_value.and_then(serde_json::Number::from_f64);
        opt.autocomplete = param.autocomplete().is_some();
        out.push(opt);
    }
}

/// Reconcile a scope's registered commands with the declared set
///
/// Every existing command whose (name, kind) slot matches a declared
/// payload is replaced by the declared definition; unmatched existing
/// commands are preserved verbatim unless `delete_missing` is set; declared
/// commands with no existing slot are appended. The resulting list is
/// submitted as one bulk overwrite.
///
/// # Errors
/// Propagates registry-client failures.
#[tracing::instrument(level = "info", skip(client, modules))]
pub async fn sync_all(
    client: &dyn CommandRegistryClient,
    modules: &[Arc<ModuleInfo>],
    scope: Scope,
    delete_missing: bool,
) -> anyhow::Result<Vec<CommandPayload>> {
    let declared = emit_payloads(modules);
    let existing = match scope {
        Scope::Global => client.get_global().await?,
        Scope::Guild(guild) => client.get_guild(guild).await?,
    };

    let mut remaining = declared;
    let mut result = vec![];
    for ex in existing {
        if let Some(pos) = remaining.iter().position(|d| d.same_slot(&ex)) {
            result.push(remaining.remove(pos));
        } else if !delete_missing {
            result.push(ex);
        } else {
            tracing::info!(name = %ex.name, "Dropping command absent from the declared set");
        }
    }
    result.append(&mut remaining);

    match scope {
        Scope::Global => client.bulk_overwrite_global(result).await,
        Scope::Guild(guild) => client.bulk_overwrite_guild(guild, result).await,
    }
}

/// Register additional commands in a guild with individual creates
///
/// # Errors
/// Propagates registry-client failures.
pub async fn add_commands_to_guild(
    client: &dyn CommandRegistryClient,
    guild: GuildId,
    commands: Vec<CommandPayload>,
) -> anyhow::Result<Vec<CommandPayload>> {
    let mut created = Vec::with_capacity(commands.len());
    for command in commands {
        created.push(client.create_guild(guild, command).await?);
    }
    Ok(created)
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use super::{add_commands_to_guild, emit_payloads, sync_all, CommandRegistryClient, Scope};
    use crate::{
        builder::Builder,
        context::{CommandId, GuildId},
        convert::TypeConverterRegistry,
        describe::{
            CommandCallback, ContextCommandDescriptor, ContextKind, ModuleDescriptor,
            ParameterDescriptor, SlashCommandDescriptor,
        },
        info::ModuleInfo,
        map::WildcardSyntax,
        payload::{CommandKind, CommandPayload, OptionKind},
    };

    fn noop() -> CommandCallback { CommandCallback::new(|_, _| async { Ok(()) }) }

    fn build(desc: ModuleDescriptor) -> Arc<ModuleInfo> {
        let converters = TypeConverterRegistry::builtin();
        Builder::new(&converters, WildcardSyntax::default(), &[])
            .build(desc)
            .unwrap()
    }

    #[derive(Debug, Default)]
    struct MockClient {
        existing: Mutex<Vec<CommandPayload>>,
        overwrites: Mutex<Vec<Vec<CommandPayload>>>,
        creates: Mutex<Vec<CommandPayload>>,
    }

    #[async_trait::async_trait]
    impl CommandRegistryClient for MockClient {
        async fn get_global(&self) -> anyhow::Result<Vec<CommandPayload>> {
            Ok(self.existing.lock().unwrap().clone())
        }

        async fn get_guild(&self, _guild: GuildId) -> anyhow::Result<Vec<CommandPayload>> {
            Ok(self.existing.lock().unwrap().clone())
        }

        async fn bulk_overwrite_global(
            &self,
            commands: Vec<CommandPayload>,
        ) -> anyhow::Result<Vec<CommandPayload>> {
            self.overwrites.lock().unwrap().push(commands.clone());
            *self.existing.lock().unwrap() = commands.clone();
            Ok(commands)
        }

        async fn bulk_overwrite_guild(
            &self,
            _guild: GuildId,
            commands: Vec<CommandPayload>,
        ) -> anyhow::Result<Vec<CommandPayload>> {
            self.overwrites.lock().unwrap().push(commands.clone());
            *self.existing.lock().unwrap() = commands.clone();
            Ok(commands)
        }

        async fn create_guild(
            &self,
            _guild: GuildId,
            command: CommandPayload,
        ) -> anyhow::Result<CommandPayload> {
            self.creates.lock().unwrap().push(command.clone());
            Ok(command)
        }

        async fn delete(&self, _id: CommandId) -> anyhow::Result<()> { Ok(()) }
    }

    fn admin_module() -> Arc<ModuleInfo> {
        build(
            ModuleDescriptor::new("admin-module")
                .group("admin", "Administrative commands")
                .slash(
                    SlashCommandDescriptor::new("kick", "Kick a user", noop()).parameter(
                        ParameterDescriptor::required::<crate::context::UserId>("user", "Target"),
                    ),
                )
                .submodule(
                    ModuleDescriptor::new("channel-module")
                        .group("channels", "Channel management")
                        .slash(SlashCommandDescriptor::new("purge", "Purge a channel", noop())),
                )
                .slash(SlashCommandDescriptor::new("status", "Server status", noop()).ignore_group_names())
                .context(ContextCommandDescriptor::new(
                    "Report",
                    ContextKind::User,
                    noop(),
                )),
        )
    }

    #[test]
    fn groups_nest_subcommands_and_subgroups() {
        let payloads = emit_payloads(&[admin_module()]);

        let names: Vec<_> = payloads.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Report", "status", "admin"]);

        let admin = payloads.iter().find(|p| p.name == "admin").unwrap();
        assert_eq!(admin.kind, CommandKind::ChatInput);
        let opt_names: Vec<_> = admin.options.iter().map(|o| (o.kind, o.name.as_str())).collect();
        assert_eq!(opt_names, [
            (OptionKind::SubCommand, "kick"),
            (OptionKind::SubCommandGroup, "channels"),
        ]);

        let channels = &admin.options[1];
        assert_eq!(channels.options[0].kind, OptionKind::SubCommand);
        assert_eq!(channels.options[0].name, "purge");

        let kick = &admin.options[0];
        assert_eq!(kick.options[0].kind, OptionKind::User);
        assert!(kick.options[0].required);
    }

    #[test]
    fn payloads_survive_a_wire_round_trip() {
        let payloads = emit_payloads(&[admin_module()]);
        let json = serde_json::to_string(&payloads).unwrap();
        let back: Vec<CommandPayload> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payloads);
    }

    #[tokio::test]
    async fn delete_missing_overwrites_with_exactly_the_declared_set() {
        let module = build(
            ModuleDescriptor::new("m")
                .slash(SlashCommandDescriptor::new("b", "Command b", noop()))
                .slash(SlashCommandDescriptor::new("d", "Command d", noop())),
        );

        let client = MockClient::default();
        *client.existing.lock().unwrap() = vec![
            CommandPayload::slash("a", "Old a"),
            CommandPayload::slash("b", "Old b"),
            CommandPayload::slash("c", "Old c"),
        ];

        let result = sync_all(&client, &[module], Scope::Global, true).await.unwrap();
        let names: Vec<_> = result.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["b", "d"]);
        // the declared definition replaced the registered one
        assert_eq!(result[0].description, "Command b");

        let overwrites = client.overwrites.lock().unwrap();
        assert_eq!(overwrites.len(), 1);
        assert_eq!(overwrites[0].len(), 2);
    }

    #[tokio::test]
    async fn unmatched_existing_commands_survive_without_delete_missing() {
        let module = build(
            ModuleDescriptor::new("m").slash(SlashCommandDescriptor::new("b", "Command b", noop())),
        );

        let client = MockClient::default();
        *client.existing.lock().unwrap() = vec![CommandPayload::slash("a", "Old a")];

        let result = sync_all(&client, &[module], Scope::Global, false).await.unwrap();
        let names: Vec<_> = result.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(result[0].description, "Old a");
    }

    #[tokio::test]
    async fn guild_additions_create_individually() {
        let client = MockClient::default();
        let created = add_commands_to_guild(&client, GuildId(9), vec![
            CommandPayload::slash("one", "One"),
            CommandPayload::slash("two", "Two"),
        ])
        .await
        .unwrap();

        assert_eq!(created.len(), 2);
        assert_eq!(client.creates.lock().unwrap().len(), 2);
        assert!(client.overwrites.lock().unwrap().is_empty());
    }

    #[test]
    fn dont_auto_register_modules_emit_nothing() {
        let module = build(
            ModuleDescriptor::new("m")
                .slash(SlashCommandDescriptor::new("hidden", "Hidden", noop()))
                .dont_auto_register(),
        );
        assert!(emit_payloads(&[module]).is_empty());
    }
}
