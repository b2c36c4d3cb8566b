//! Precondition predicates evaluated before handler dispatch

use std::fmt;

use crate::context::InteractionContext;

/// A predicate bound to a module or command, evaluated before its handler
/// may run
///
/// Module-level preconditions run before command-level ones; the first
/// failure short-circuits the pipeline with an `UnmetPrecondition` result.
#[async_trait::async_trait]
pub trait Precondition: fmt::Debug + Send + Sync {
    /// Check the invocation, returning the rejection reason on failure
    async fn check(&self, ctx: &InteractionContext, command: &str) -> Result<(), String>;
}

/// Rejects invocations made outside a guild
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireGuild;

#[async_trait::async_trait]
impl Precondition for RequireGuild {
    async fn check(&self, ctx: &InteractionContext, command: &str) -> Result<(), String> {
        if ctx.guild.is_some() {
            Ok(())
        } else {
            Err(format!("Command {command:?} must be run inside a server"))
        }
    }
}

/// Rejects invocations made inside a guild
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireDm;

#[async_trait::async_trait]
impl Precondition for RequireDm {
    async fn check(&self, ctx: &InteractionContext, command: &str) -> Result<(), String> {
        if ctx.guild.is_none() {
            Ok(())
        } else {
            Err(format!("Command {command:?} cannot be run inside a server"))
        }
    }
}

/// Adapter turning a plain closure into a [`Precondition`]
pub struct PreconditionFn<F>(F);

impl<F> PreconditionFn<F>
where F: Fn(&InteractionContext, &str) -> Result<(), String> + Send + Sync
{
    /// Wrap a synchronous predicate closure
    pub fn new(f: F) -> Self { Self(f) }
}

impl<F> fmt::Debug for PreconditionFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreconditionFn").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl<F> Precondition for PreconditionFn<F>
where F: Fn(&InteractionContext, &str) -> Result<(), String> + Send + Sync
{
    async fn check(&self, ctx: &InteractionContext, command: &str) -> Result<(), String> {
        (self.0)(ctx, command)
    }
}

#[cfg(test)]
mod test {
    use super::{Precondition, RequireDm, RequireGuild};
    use crate::context::{ChannelId, GuildId, InteractionContext, InteractionId, UserId};

    fn ctx() -> InteractionContext {
        InteractionContext::new(InteractionId(1), UserId(2), ChannelId(3))
    }

    #[tokio::test]
    async fn guild_requirements_cut_both_ways() {
        let dm = ctx();
        let guild = ctx().in_guild(GuildId(4));

        assert!(RequireGuild.check(&guild, "kick").await.is_ok());
        assert!(RequireGuild.check(&dm, "kick").await.is_err());
        assert!(RequireDm.check(&dm, "pair").await.is_ok());
        assert!(RequireDm.check(&guild, "pair").await.is_err());
    }
}
