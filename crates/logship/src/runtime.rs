//! Lambda custom runtime: `lambda_runtime` polls for invocations and each one
//! is dispatched to a function handler.

use lambda_runtime::{Context, Error, LambdaEvent, service_fn};
use serde_json::Value;
use tracing::{Instrument, error, info_span};

use crate::handlers::{Function, Handlers, InvocationContext};
use crate::telemetry::flush_tracing;

pub fn invocation_context(context: &Context) -> InvocationContext {
    InvocationContext {
        request_id: context.request_id.clone(),
        invoked_function_arn: Some(context.invoked_function_arn.clone())
            .filter(|arn| !arn.is_empty()),
    }
}

/// Runs one invocation. A handler error becomes the invocation's error
/// report; spans are flushed before Lambda freezes the process.
pub async fn handle_invocation(
    handlers: &Handlers,
    function: Function,
    event: LambdaEvent<Value>,
) -> Result<Value, Error> {
    let (payload, context) = event.into_parts();
    let ctx = invocation_context(&context);
    let span = info_span!(
        "invocation",
        function = function.name(),
        request_id = %ctx.request_id,
        trace_id = ?context.xray_trace_id,
        deadline_ms = context.deadline,
    );

    let result = handlers
        .handle(function, payload, &ctx)
        .instrument(span)
        .await
        .map_err(|e| {
            error!(
                request_id = %ctx.request_id,
                error = %format!("{e:#}"),
                "invocation failed"
            );
            Error::from(format!("{e:#}"))
        });

    flush_tracing();
    result
}

/// Serves invocations until the Runtime API goes away.
pub async fn run(handlers: Handlers, function: Function) -> Result<(), Error> {
    let handlers = &handlers;
    lambda_runtime::run(service_fn(move |event| {
        handle_invocation(handlers, function, event)
    }))
    .await
}
