//! The public facade: registration, configuration, events and the
//! interaction entry points

use std::sync::{Arc, Mutex, RwLock};

use crate::{
    builder::{split_custom_id, Builder},
    context::{GuildId, InteractionContext},
    convert::TypeConverterRegistry,
    describe::{ArgValue, Args, ContextKind, ModuleSource},
    error::{Error, ExecuteResult},
    event::FrameworkEvents,
    exec,
    info::{lifecycle_chain, precondition_chain, HandlerSet, ModuleInfo, ParameterInfo},
    interaction::{
        AutocompleteInvocation, ComponentInvocation, ComponentSource, ContextInvocation,
        ContextTarget, InteractionEvent, InvokedOption, ModalInvocation, OptionValue,
        SlashInvocation, Suggestion,
    },
    map::{CommandMap, WildcardSyntax},
    payload::CommandPayload,
    sync::{self, CommandRegistryClient, Scope},
};

const MAX_SUGGESTIONS: usize = 25;

/// Framework-wide configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Dispatch handlers on detached tasks unless a command overrides its
    /// run mode
    pub run_async: bool,
    /// Re-raise handler panics on the caller's task after the executed
    /// event fires; detached dispatches never re-raise
    pub throw_on_error: bool,
    /// Characters splitting custom IDs into path segments; an empty set
    /// treats the whole ID as one token
    pub custom_id_delimiters: Vec<char>,
    /// Delete the original interaction acknowledgement when lookup misses
    pub delete_unknown_command_ack: bool,
    /// Delimiters of the named-wildcard syntax in handler names
    pub wildcards: WildcardSyntax,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            run_async: false,
            throw_on_error: false,
            custom_id_delimiters: vec![],
            delete_unknown_command_ack: false,
            wildcards: WildcardSyntax::default(),
        }
    }
}

#[derive(Debug, Default)]
struct InsertLog {
    slash: Vec<Vec<String>>,
    context: Vec<Vec<String>>,
    components: Vec<Vec<String>>,
    modals: Vec<Vec<String>>,
}

fn context_key(kind: ContextKind, name: &str) -> Vec<String> {
    let tag = match kind {
        ContextKind::User => "user",
        ContextKind::Message => "message",
    };
    vec![tag.to_owned(), name.to_owned()]
}

fn flatten_subcommands(
    mut path: Vec<String>,
    mut options: Vec<InvokedOption>,
) -> (Vec<String>, Vec<InvokedOption>) {
    while options.len() == 1 && options[0].is_subcommand() {
        let opt = options.remove(0);
        path.push(opt.name);
        options = opt.options;
    }
    (path, options)
}

fn find_parameter<'p>(params: &'p [ParameterInfo], name: &str) -> Option<&'p ParameterInfo> {
    for param in params {
        if let Some(complex) = param.complex() {
            if let Some(found) = find_parameter(complex.fields(), name) {
                return Some(found);
            }
        } else if param.name().eq_ignore_ascii_case(name) {
            return Some(param);
        }
    }
    None
}

/// The interaction-command framework facade
///
/// One instance owns the registered metadata tree, the routing maps, the
/// converter registry and the executed events. Registration is guarded by
/// a framework-wide mutex; every lookup path is lock-free against an
/// immutable snapshot.
#[derive(Debug)]
pub struct InteractionFramework {
    config: Config,
    converters: TypeConverterRegistry,
    registry_client: Option<Arc<dyn CommandRegistryClient>>,
    slash: CommandMap<Arc<crate::info::SlashCommandInfo>>,
    context: CommandMap<Arc<crate::info::ContextCommandInfo>>,
    components: CommandMap<Arc<crate::info::ComponentCommandInfo>>,
    modals: CommandMap<Arc<crate::info::ModalCommandInfo>>,
    modules: RwLock<Arc<Vec<Arc<ModuleInfo>>>>,
    registration: Mutex<()>,
    events: Arc<FrameworkEvents>,
}

impl Default for InteractionFramework {
    fn default() -> Self { Self::new(Config::default()) }
}

macro_rules! publish {
    ($self:expr, $field:ident, $payload:ident, $command:expr, $ctx:expr, $result:expr) => {
        $self.events.$field.publish(&crate::event::$payload {
            command: $command,
            ctx: $ctx,
            result: $result,
        })
    };
}

/// Dispatch a prepared invocation and publish its outcome on the matching
/// executed event, honoring the command's run mode.
macro_rules! dispatch {
    ($self:expr, $ctx:expr, $cmd:expr, $qualified:expr, $args:expr, $field:ident, $payload:ident) => {{
        let lifecycles = lifecycle_chain(&$cmd.module);
        if exec::is_detached($cmd.run_mode, $self.config.run_async) {
            let events = Arc::clone(&$self.events);
            let cmd = Arc::clone(&$cmd);
            let ctx = $ctx.clone();
            let qualified = $qualified.clone();
            let args = $args;
            tokio::spawn(async move {
                let (result, _panic) =
                    exec::invoke_handler(&ctx, &qualified, &cmd.callback, &lifecycles, args).await;
                log_outcome(&qualified, &result);
                events.$field.publish(&crate::event::$payload {
                    command: Some(cmd),
                    ctx,
                    result,
                });
            });
            Ok(())
        } else {
            let (result, panic_payload) =
                exec::invoke_handler(&$ctx, &$qualified, &$cmd.callback, &lifecycles, $args).await;
            log_outcome(&$qualified, &result);
            publish!(
                $self,
                $field,
                $payload,
                Some(Arc::clone(&$cmd)),
                $ctx.clone(),
                result.clone()
            );
            if $self.config.throw_on_error {
                if let Some(payload) = panic_payload {
                    std::panic::resume_unwind(payload);
                }
            }
            result
        }
    }};
}

fn log_outcome(qualified: &str, result: &ExecuteResult) {
    match result {
        Ok(()) => tracing::debug!(command = qualified, "Handler completed"),
        Err(err @ Error::Exception(_)) => {
            tracing::error!(command = qualified, %err, "Handler raised an exception");
        },
        Err(err) => tracing::debug!(command = qualified, %err, "Handler was unsuccessful"),
    }
}

impl InteractionFramework {
    /// Construct a framework with the given configuration and the built-in
    /// converter set
    #[must_use]
    pub fn new(config: Config) -> Self {
        let wildcards = config.wildcards;
        Self {
            config,
            converters: TypeConverterRegistry::builtin(),
            registry_client: None,
            slash: CommandMap::new(wildcards),
            context: CommandMap::new(wildcards),
            components: CommandMap::new(wildcards),
            modals: CommandMap::new(wildcards),
            modules: RwLock::new(Arc::new(Vec::new())),
            registration: Mutex::new(()),
            events: Arc::new(FrameworkEvents::default()),
        }
    }

    /// Attach the command registry client used by the sync operations
    #[must_use]
    pub fn with_registry_client(mut self, client: Arc<dyn CommandRegistryClient>) -> Self {
        self.registry_client = Some(client);
        self
    }

    /// The converter registry consulted while building modules
    #[must_use]
    pub fn converters(&self) -> &TypeConverterRegistry { &self.converters }

    /// The executed events
    #[must_use]
    pub fn events(&self) -> &FrameworkEvents { &self.events }

    /// The current immutable module snapshot
    #[must_use]
    pub fn modules(&self) -> Arc<Vec<Arc<ModuleInfo>>> {
        Arc::clone(&self.modules.read().unwrap_or_else(|e| e.into_inner()))
    }

    // ---- registration ----

    /// Build and register every module the source declares
    ///
    /// # Errors
    /// Returns a build-time error if any descriptor violates an invariant
    /// or routes onto an already-registered path; nothing is registered in
    /// that case.
    pub fn add_modules(&self, source: impl ModuleSource) -> Result<Vec<Arc<ModuleInfo>>, Error> {
        let _guard = self.registration.lock().unwrap_or_else(|e| e.into_inner());

        let builder = Builder::new(
            &self.converters,
            self.config.wildcards,
            &self.config.custom_id_delimiters,
        );
        let mut built = vec![];
        for descriptor in source.into_modules() {
            built.push(builder.build(descriptor)?);
        }

        let mut log = InsertLog::default();
        for module in &built {
            let mut set = HandlerSet::default();
            module.collect_handlers(&mut set);
            if let Err(err) = self.insert_handlers(&set, &mut log) {
                self.rollback(log);
                return Err(err);
            }
        }

        let mut modules = self.modules.write().unwrap_or_else(|e| e.into_inner());
        let mut next = Vec::clone(&modules);
        next.extend(built.iter().map(Arc::clone));
        *modules = Arc::new(next);

        tracing::debug!(count = built.len(), "Registered modules");
        Ok(built)
    }

    /// Register a single module descriptor
    ///
    /// # Errors
    /// Same failure modes as [`add_modules`](Self::add_modules).
    pub fn add_module(
        &self,
        module: crate::describe::ModuleDescriptor,
    ) -> Result<Arc<ModuleInfo>, Error> {
        let mut built = self.add_modules(module)?;
        Ok(built
            .pop()
            .unwrap_or_else(|| unreachable!("single descriptor yields one module")))
    }

    /// Unregister a module (and its entire subtree) by name
    ///
    /// Returns `false` if no module with that name is registered.
    pub fn remove_module(&self, name: &str) -> bool {
        let _guard = self.registration.lock().unwrap_or_else(|e| e.into_inner());

        let mut modules = self.modules.write().unwrap_or_else(|e| e.into_inner());
        let Some(pos) = modules.iter().position(|m| m.name() == name) else {
            return false;
        };

        let mut next = Vec::clone(&modules);
        let removed = next.remove(pos);
        *modules = Arc::new(next);
        drop(modules);

        let mut set = HandlerSet::default();
        removed.collect_handlers(&mut set);
        for cmd in &set.slash {
            self.slash.remove(cmd.path());
        }
        for cmd in &set.context {
            self.context.remove(&context_key(cmd.kind(), cmd.name()));
        }
        for cmd in &set.components {
            self.components
                .remove(&split_custom_id(cmd.name(), &self.config.custom_id_delimiters));
        }
        for cmd in &set.modals {
            self.modals
                .remove(&split_custom_id(cmd.name(), &self.config.custom_id_delimiters));
        }

        tracing::debug!(module = name, "Unregistered module");
        true
    }

    fn insert_handlers(&self, set: &HandlerSet, log: &mut InsertLog) -> Result<(), Error> {
        for cmd in &set.slash {
            self.slash.insert(cmd.path(), Arc::clone(cmd), false)?;
            log.slash.push(cmd.path().to_vec());
        }
        for cmd in &set.context {
            let key = context_key(cmd.kind(), cmd.name());
            self.context.insert(&key, Arc::clone(cmd), false)?;
            log.context.push(key);
        }
        for cmd in &set.components {
            let key: Vec<String> = split_custom_id(cmd.name(), &self.config.custom_id_delimiters)
                .into_iter()
                .map(ToOwned::to_owned)
                .collect();
            self.components.insert(&key, Arc::clone(cmd), true)?;
            log.components.push(key);
        }
        for cmd in &set.modals {
            let key: Vec<String> = split_custom_id(cmd.name(), &self.config.custom_id_delimiters)
                .into_iter()
                .map(ToOwned::to_owned)
                .collect();
            self.modals.insert(&key, Arc::clone(cmd), true)?;
            log.modals.push(key);
        }
        Ok(())
    }

    fn rollback(&self, log: InsertLog) {
        for path in log.slash {
            self.slash.remove(&path);
        }
        for path in log.context {
            self.context.remove(&path);
        }
        for path in log.components {
            self.components.remove(&path);
        }
        for path in log.modals {
            self.modals.remove(&path);
        }
    }

    // ---- sync ----

    fn client(&self) -> anyhow::Result<&Arc<dyn CommandRegistryClient>> {
        self.registry_client
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("No command registry client configured"))
    }

    /// Emit the platform payloads for everything currently registered
    #[must_use]
    pub fn to_payloads(&self) -> Vec<CommandPayload> { sync::emit_payloads(&self.modules()) }

    /// Reconcile the declared command tree with a scope's registered set
    ///
    /// # Errors
    /// Fails if no registry client is configured or the client reports an
    /// error.
    pub async fn sync_commands(
        &self,
        guild: Option<GuildId>,
        delete_missing: bool,
    ) -> anyhow::Result<Vec<CommandPayload>> {
        let client = self.client()?;
        let scope = guild.map_or(Scope::Global, Scope::Guild);
        sync::sync_all(client.as_ref(), &self.modules(), scope, delete_missing).await
    }

    /// Create additional commands in a guild without overwriting its set
    ///
    /// # Errors
    /// Fails if no registry client is configured or the client reports an
    /// error.
    pub async fn add_commands_to_guild(
        &self,
        guild: GuildId,
        commands: Vec<CommandPayload>,
    ) -> anyhow::Result<Vec<CommandPayload>> {
        let client = self.client()?;
        sync::add_commands_to_guild(client.as_ref(), guild, commands).await
    }

    /// Create a set of modules' commands in a guild without overwriting its
    /// set
    ///
    /// # Errors
    /// Fails if no registry client is configured or the client reports an
    /// error.
    pub async fn add_modules_to_guild(
        &self,
        guild: GuildId,
        modules: &[Arc<ModuleInfo>],
    ) -> anyhow::Result<Vec<CommandPayload>> {
        let client = self.client()?;
        let payloads = sync::emit_payloads(modules);
        sync::add_commands_to_guild(client.as_ref(), guild, payloads).await
    }

    // ---- execution entry points ----

    async fn handle_unknown(&self, ctx: &InteractionContext) {
        tracing::debug!("No handler matched interaction");
        if self.config.delete_unknown_command_ack {
            if let Some(ack) = &ctx.ack {
                if let Err(err) = ack.delete().await {
                    tracing::debug!(%err, "Failed to delete unknown-command acknowledgement");
                }
            }
        }
    }

    /// Route a slash-command invocation through the pipeline
    pub async fn execute_slash(
        &self,
        ctx: InteractionContext,
        invocation: SlashInvocation,
    ) -> ExecuteResult {
        let (path, options) = flatten_subcommands(invocation.path, invocation.options);

        let hit = match self.slash.lookup(&path) {
            Ok(hit) => hit,
            Err(err) => {
                self.handle_unknown(&ctx).await;
                publish!(self, slash_executed, SlashExecuted, None, ctx, Err(err.clone()));
                return Err(err);
            },
        };
        let cmd = hit.value;
        let qualified = cmd.qualified_name();

        let prepared: Result<_, Error> = async {
            let args = exec::synthesize_options(&ctx, cmd.parameters(), &options).await?;
            let chain = precondition_chain(&cmd.module, &cmd.preconditions);
            exec::check_preconditions(&ctx, &chain, &qualified).await?;
            Ok(args)
        }
        .await;
        let args = match prepared {
            Ok(args) => args,
            Err(err) => {
                publish!(
                    self,
                    slash_executed,
                    SlashExecuted,
                    Some(Arc::clone(&cmd)),
                    ctx,
                    Err(err.clone())
                );
                return Err(err);
            },
        };

        dispatch!(self, ctx, cmd, qualified, args, slash_executed, SlashExecuted)
    }

    /// Route a context-menu command invocation through the pipeline
    pub async fn execute_context(
        &self,
        ctx: InteractionContext,
        invocation: ContextInvocation,
    ) -> ExecuteResult {
        let kind = match invocation.target {
            ContextTarget::User(_) => ContextKind::User,
            ContextTarget::Message(_) => ContextKind::Message,
        };
        let key = context_key(kind, &invocation.name);

        let hit = match self.context.lookup(&key) {
            Ok(hit) => hit,
            Err(err) => {
                self.handle_unknown(&ctx).await;
                publish!(self, context_executed, ContextExecuted, None, ctx, Err(err.clone()));
                return Err(err);
            },
        };
        let cmd = hit.value;
        let qualified = cmd.name().to_owned();

        let target: ArgValue = match invocation.target {
            ContextTarget::User(id) => Box::new(id),
            ContextTarget::Message(id) => Box::new(id),
        };
        let args = Args::new(vec![target]);

        let chain = precondition_chain(&cmd.module, &cmd.preconditions);
        if let Err(err) = exec::check_preconditions(&ctx, &chain, &qualified).await {
            publish!(
                self,
                context_executed,
                ContextExecuted,
                Some(Arc::clone(&cmd)),
                ctx,
                Err(err.clone())
            );
            return Err(err);
        }

        dispatch!(self, ctx, cmd, qualified, args, context_executed, ContextExecuted)
    }

    /// Route a message-component interaction through the pipeline
    pub async fn execute_component(
        &self,
        ctx: InteractionContext,
        invocation: ComponentInvocation,
    ) -> ExecuteResult {
        let segments = split_custom_id(&invocation.custom_id, &self.config.custom_id_delimiters);

        let hit = match self.components.lookup(&segments) {
            Ok(hit) => hit,
            Err(err) => {
                self.handle_unknown(&ctx).await;
                publish!(
                    self,
                    component_executed,
                    ComponentExecuted,
                    None,
                    ctx,
                    Err(err.clone())
                );
                return Err(err);
            },
        };
        let cmd = hit.value;
        let qualified = cmd.name().to_owned();

        let select = match invocation.source {
            ComponentSource::SelectMenu => Some(invocation.values),
            ComponentSource::Button => None,
        };

        let prepared: Result<_, Error> = async {
            let args =
                exec::synthesize_captures(&ctx, cmd.parameters(), &hit.captures, select, None)
                    .await?;
            let chain = precondition_chain(&cmd.module, &cmd.preconditions);
            exec::check_preconditions(&ctx, &chain, &qualified).await?;
            Ok(args)
        }
        .await;
        let args = match prepared {
            Ok(args) => args,
            Err(err) => {
                publish!(
                    self,
                    component_executed,
                    ComponentExecuted,
                    Some(Arc::clone(&cmd)),
                    ctx,
                    Err(err.clone())
                );
                return Err(err);
            },
        };

        dispatch!(self, ctx, cmd, qualified, args, component_executed, ComponentExecuted)
    }

    /// Route a modal-submit interaction through the pipeline
    pub async fn execute_modal(
        &self,
        ctx: InteractionContext,
        invocation: ModalInvocation,
    ) -> ExecuteResult {
        let segments = split_custom_id(&invocation.custom_id, &self.config.custom_id_delimiters);

        let hit = match self.modals.lookup(&segments) {
            Ok(hit) => hit,
            Err(err) => {
                self.handle_unknown(&ctx).await;
                publish!(self, modal_executed, ModalExecuted, None, ctx, Err(err.clone()));
                return Err(err);
            },
        };
        let cmd = hit.value;
        let qualified = cmd.name().to_owned();

        let prepared = async {
            let mut fields = Vec::with_capacity(cmd.modal.inputs.len());
            for binding in &cmd.modal.inputs {
                let value = invocation
                    .fields
                    .iter()
                    .find(|f| f.custom_id == binding.custom_id)
                    .map(|f| f.value.clone());
                if value.is_none() && binding.required {
                    return Err(Error::convert_failed(
                        &binding.custom_id,
                        "missing required modal field",
                    ));
                }
                fields.push(value);
            }
            let lead = cmd
                .modal
                .construct
                .construct(fields)
                .map_err(|e| Error::convert_failed(cmd.name(), e))?;

            let args =
                exec::synthesize_captures(&ctx, cmd.parameters(), &hit.captures, None, Some(lead))
                    .await?;
            let chain = precondition_chain(&cmd.module, &cmd.preconditions);
            exec::check_preconditions(&ctx, &chain, &qualified).await?;
            Ok(args)
        }
        .await;
        let args = match prepared {
            Ok(args) => args,
            Err(err) => {
                publish!(
                    self,
                    modal_executed,
                    ModalExecuted,
                    Some(Arc::clone(&cmd)),
                    ctx,
                    Err(err.clone())
                );
                return Err(err);
            },
        };

        dispatch!(self, ctx, cmd, qualified, args, modal_executed, ModalExecuted)
    }

    /// Resolve a parameter's autocomplete handler and return its
    /// suggestions, clamped to the platform limit
    ///
    /// # Errors
    /// Returns `UnknownCommand` if no command or handler matches, or the
    /// handler's failure.
    pub async fn execute_autocomplete(
        &self,
        ctx: InteractionContext,
        invocation: AutocompleteInvocation,
    ) -> Result<Vec<Suggestion>, Error> {
        let (path, options) = flatten_subcommands(invocation.path, invocation.options);

        let cmd = match self.slash.lookup(&path) {
            Ok(hit) => hit.value,
            Err(err) => {
                publish!(
                    self,
                    autocomplete_executed,
                    AutocompleteExecuted,
                    None,
                    ctx,
                    Err(err.clone())
                );
                return Err(err);
            },
        };

        let resolved = options
            .iter()
            .find(|o| o.focused)
            .and_then(|focused| {
                find_parameter(cmd.parameters(), &focused.name).map(|p| (focused, p))
            })
            .and_then(|(focused, param)| param.autocomplete().map(|ac| (focused, Arc::clone(ac))));
        let Some((focused, handler)) = resolved else {
            publish!(
                self,
                autocomplete_executed,
                AutocompleteExecuted,
                None,
                ctx,
                Err(Error::UnknownCommand)
            );
            return Err(Error::UnknownCommand);
        };

        let input = match &focused.value {
            OptionValue::String(s) => s.clone(),
            OptionValue::Integer(i) => i.to_string(),
            OptionValue::Number(n) => n.to_string(),
            OptionValue::Boolean(b) => b.to_string(),
            _ => String::new(),
        };

        let res = tokio::select! {
            () = ctx.cancellation.cancelled() => Err(Error::Cancelled),
            res = handler.callback.invoke(ctx.clone(), input) => {
                res.map_err(Error::exception)
            },
        };

        match res {
            Ok(mut suggestions) => {
                suggestions.truncate(MAX_SUGGESTIONS);
                publish!(
                    self,
                    autocomplete_executed,
                    AutocompleteExecuted,
                    Some(handler),
                    ctx,
                    Ok(())
                );
                Ok(suggestions)
            },
            Err(err) => {
                log_outcome(handler.name(), &Err(err.clone()));
                publish!(
                    self,
                    autocomplete_executed,
                    AutocompleteExecuted,
                    Some(handler),
                    ctx,
                    Err(err.clone())
                );
                Err(err)
            },
        }
    }

    /// Fan an inbound interaction event into the matching entry point
    pub async fn dispatch(&self, ctx: InteractionContext, event: InteractionEvent) -> ExecuteResult {
        match event {
            InteractionEvent::Slash(inv) => self.execute_slash(ctx, inv).await,
            InteractionEvent::Context(inv) => self.execute_context(ctx, inv).await,
            InteractionEvent::Component(inv) => self.execute_component(ctx, inv).await,
            InteractionEvent::Modal(inv) => self.execute_modal(ctx, inv).await,
            InteractionEvent::Autocomplete(inv) => {
                self.execute_autocomplete(ctx, inv).await.map(|_| ())
            },
        }
    }
}
