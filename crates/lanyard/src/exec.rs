//! The execution pipeline: argument synthesis, precondition evaluation and
//! handler invocation
//!
//! Entry-point orchestration and result reporting live on the facade; the
//! helpers here are shared by every interaction kind and know nothing about
//! which executed event the outcome lands on.

use std::{any::Any, collections::HashMap, panic::AssertUnwindSafe, sync::Arc};

use futures_util::FutureExt;

use crate::{
    context::InteractionContext,
    describe::{ArgValue, Args, CommandCallback, HandlerError, ModuleLifecycle, RunMode},
    error::{Error, ExecuteResult},
    info::ParameterInfo,
    interaction::InvokedOption,
    map::Capture,
};

/// Payload of a caught handler panic, kept for `throw_on_error` re-raising
pub(crate) type PanicPayload = Box<dyn Any + Send>;

pub(crate) fn is_detached(mode: RunMode, config_run_async: bool) -> bool {
    match mode {
        RunMode::Default => config_run_async,
        RunMode::Sync => false,
        RunMode::Async => true,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&'static str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "<opaque panic payload>".to_owned())
}

/// Evaluate a precondition chain in order, short-circuiting on the first
/// rejection
pub(crate) async fn check_preconditions(
    ctx: &InteractionContext,
    chain: &[Arc<dyn crate::precondition::Precondition>],
    command: &str,
) -> Result<(), Error> {
    for precondition in chain {
        tokio::select! {
            () = ctx.cancellation.cancelled() => return Err(Error::Cancelled),
            res = precondition.check(ctx, command) => {
                if let Err(reason) = res {
                    tracing::debug!(command, %reason, "Precondition rejected invocation");
                    return Err(Error::UnmetPrecondition(reason));
                }
            },
        }
    }
    Ok(())
}

async fn convert_option(
    ctx: &InteractionContext,
    param: &ParameterInfo,
    opt: &InvokedOption,
) -> Result<ArgValue, Error> {
    let converter = param
        .converter()
        .unwrap_or_else(|| unreachable!("leaf parameter without converter"));
    let res = tokio::select! {
        () = ctx.cancellation.cancelled() => Err(Error::Cancelled),
        res = converter.read(ctx, param.name(), opt) => res,
    };
    if let Err(err) = &res {
        tracing::debug!(parameter = param.name(), %err, "Option conversion failed");
    }
    res
}

fn synthesize_one<'a, 'b>(
    ctx: &'b InteractionContext,
    param: &'b ParameterInfo,
    bag: &'b mut HashMap<String, &'a InvokedOption>,
) -> futures_util::future::BoxFuture<'b, Result<ArgValue, Error>>
where 'a: 'b {
    async move {
        if let Some(complex) = param.complex() {
            let mut fields = Vec::with_capacity(complex.fields().len());
            for field in complex.fields() {
                fields.push(synthesize_one(ctx, field, bag).await?);
            }
            return complex
                .assemble
                .assemble(fields)
                .map_err(|e| Error::convert_failed(param.name(), e));
        }

        match bag.remove(&param.name().to_lowercase()) {
            Some(opt) => convert_option(ctx, param, opt).await,
            None if param.is_required() => {
                tracing::debug!(parameter = param.name(), "Required option missing");
                Err(Error::BadArgs("too few parameters"))
            },
            None => Ok(param
                .default_value
                .as_ref()
                .unwrap_or_else(|| unreachable!("optional parameter without default"))
                .produce()),
        }
    }
    .boxed()
}

/// Synthesize slash-command arguments from the invocation's option list
///
/// Options match parameters by case-insensitive name; missing required
/// parameters and unconsumed options fail with `BadArgs`.
pub(crate) async fn synthesize_options(
    ctx: &InteractionContext,
    params: &[ParameterInfo],
    options: &[InvokedOption],
) -> Result<Args, Error> {
    let mut bag: HashMap<String, &InvokedOption> = options
        .iter()
        .map(|o| (o.name.to_lowercase(), o))
        .collect();

    let mut values = Vec::with_capacity(params.len());
    for param in params {
        values.push(synthesize_one(ctx, param, &mut bag).await?);
    }

    if !bag.is_empty() {
        let extra: Vec<_> = bag.keys().cloned().collect();
        tracing::debug!(?extra, "Unconsumed options in invocation");
        return Err(Error::BadArgs("too many parameters"));
    }
    Ok(Args::new(values))
}

/// Synthesize component/modal arguments from wildcard captures, an optional
/// leading value (the modal struct) and optional trailing select values
pub(crate) async fn synthesize_captures(
    ctx: &InteractionContext,
    params: &[ParameterInfo],
    captures: &[Capture],
    select_values: Option<Vec<String>>,
    lead: Option<ArgValue>,
) -> Result<Args, Error> {
    let supplied = captures.len() + usize::from(select_values.is_some());
    if params.len() != supplied {
        return Err(Error::BadArgs(if params.len() < supplied {
            "too many parameters"
        } else {
            "too few parameters"
        }));
    }

    let mut values = Vec::with_capacity(params.len() + usize::from(lead.is_some()));
    if let Some(lead) = lead {
        values.push(lead);
    }

    for (param, capture) in params.iter().zip(captures) {
        let converter = param
            .converter()
            .unwrap_or_else(|| unreachable!("capture parameter without converter"));
        let res = tokio::select! {
            () = ctx.cancellation.cancelled() => Err(Error::Cancelled),
            res = converter.read_text(ctx, param.name(), &capture.value) => res,
        };
        match res {
            Ok(v) => values.push(v),
            Err(err) => {
                tracing::debug!(parameter = param.name(), %err, "Capture conversion failed");
                return Err(err);
            },
        }
    }

    if let Some(select) = select_values {
        values.push(Box::new(select) as ArgValue);
    }
    Ok(Args::new(values))
}

/// Run the handler between its module-chain lifecycle hooks, catching
/// panics at the call boundary
///
/// The second tuple element carries the raw panic payload so the facade can
/// re-raise it under `throw_on_error`.
pub(crate) async fn invoke_handler(
    ctx: &InteractionContext,
    qualified: &str,
    callback: &CommandCallback,
    lifecycles: &[Arc<dyn ModuleLifecycle>],
    args: Args,
) -> (ExecuteResult, Option<PanicPayload>) {
    for lifecycle in lifecycles {
        lifecycle.before_execute(ctx, qualified).await;
    }

    let outcome = tokio::select! {
        () = ctx.cancellation.cancelled() => (Err(Error::Cancelled), None),
        res = AssertUnwindSafe(callback.invoke(ctx.clone(), args)).catch_unwind() => match res {
            Ok(Ok(())) => (Ok(()), None),
            Ok(Err(HandlerError::Unsuccessful(reason))) => (Err(Error::Unsuccessful(reason)), None),
            Ok(Err(HandlerError::Other(err))) => (Err(Error::exception(err)), None),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                (
                    Err(Error::exception(anyhow::anyhow!("Handler panicked: {message}"))),
                    Some(payload),
                )
            },
        },
    };

    for lifecycle in lifecycles.iter().rev() {
        lifecycle.after_execute(ctx, qualified, &outcome.0).await;
    }
    outcome
}
