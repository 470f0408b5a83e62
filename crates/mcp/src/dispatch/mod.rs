#![forbid(unsafe_code)]

mod binding;
mod catalog;
mod envelope;
mod error;
mod registry;


pub(crate) use binding::*;
pub(crate) use catalog::*;
pub(crate) use envelope::*;
pub(crate) use error::*;
pub(crate) use registry::*;

use crate::legacy::{LegacyEndpoint, demultiplex, translate_static};
use mg_core::entry::EntryPoint;
use mg_core::ops::Operation;
use mg_core::routes::Route;
use serde_json::{Map, Value};
use std::sync::Arc;

pub(crate) type Options = Map<String, Value>;

/// What a protocol tool name resolves to.
#[derive(Clone, Copy, Debug)]
pub(crate) enum ToolTarget<'a> {
    Consolidated(EntryPoint),
    Legacy(&'a LegacyEndpoint),
}

/// Routes consolidated and legacy calls to handlers. Holds no mutable state.
#[derive(Clone)]
pub(crate) struct Dispatcher {
    catalog: Arc<Catalog>,
    registry: Arc<HandlerRegistry>,
}

impl Dispatcher {
    pub(crate) fn new(catalog: Arc<Catalog>, registry: Arc<HandlerRegistry>) -> Self {
        Self { catalog, registry }
    }

    pub(crate) fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub(crate) fn resolve_tool(&self, name: &str) -> Option<ToolTarget<'_>> {
        if let Some(entry_point) = EntryPoint::from_tool_name(name) {
            return Some(ToolTarget::Consolidated(entry_point));
        }
        self.catalog.legacy().get(name).map(ToolTarget::Legacy)
    }

    /// `None` when no tool carries `name`.
    pub(crate) fn call_tool(
        &self,
        name: &str,
        args: Value,
        call: &CallContext,
    ) -> Option<Result<Options, DispatchError>> {
        let result = match self.resolve_tool(name)? {
            ToolTarget::Consolidated(entry_point) => self.dispatch(entry_point, args, call),
            ToolTarget::Legacy(endpoint) => self.call_legacy(endpoint, args, call),
        };
        Some(result)
    }

    pub(crate) fn dispatch(
        &self,
        entry_point: EntryPoint,
        args: Value,
        call: &CallContext,
    ) -> Result<Options, DispatchError> {
        let envelope = RequestEnvelope::from_args(entry_point, args)?;
        self.dispatch_envelope(entry_point, envelope, call)
    }

    pub(crate) fn dispatch_envelope(
        &self,
        entry_point: EntryPoint,
        envelope: RequestEnvelope,
        call: &CallContext,
    ) -> Result<Options, DispatchError> {
        let RequestEnvelope {
            operation,
            scope,
            options,
        } = envelope;

        let Some(resolved) = Operation::parse(entry_point, &operation) else {
            tracing::warn!(
                tool = entry_point.tool_name(),
                operation = %operation,
                "unsupported operation"
            );
            return Err(DispatchError::UnsupportedOperation {
                entry_point,
                operation,
            });
        };

        tracing::debug!(
            tool = entry_point.tool_name(),
            operation = resolved.as_str(),
            scope = %scope,
            "dispatch"
        );
        let ctx = HandlerContext {
            call: call.clone(),
            entry_point,
            operation: resolved,
            scope,
        };

        match binding_for(resolved) {
            Binding::Direct(id) => self.invoke(id, &ctx, options),
            Binding::Bulk(kind) => {
                let mut options = options;
                options.insert(
                    "operation".to_string(),
                    Value::String(kind.as_str().to_string()),
                );
                self.invoke(HandlerId::BulkOperation, &ctx, options)
            }
            Binding::Placeholder => Err(DispatchError::UnimplementedOperation {
                entry_point,
                operation: resolved.as_str(),
            }),
        }
    }

    fn invoke(
        &self,
        id: HandlerId,
        ctx: &HandlerContext,
        options: Options,
    ) -> Result<Options, DispatchError> {
        let Some(handler) = self.registry.get(id) else {
            return Err(DispatchError::UnimplementedOperation {
                entry_point: ctx.entry_point,
                operation: ctx.operation.as_str(),
            });
        };
        handler.call(ctx, options).map_err(|err| {
            tracing::warn!(
                handler = id.as_str(),
                code = err.code(),
                request_id = ?ctx.call.request_id,
                error = %err,
                "handler failed"
            );
            DispatchError::HandlerFailure(err)
        })
    }

    fn call_legacy(
        &self,
        endpoint: &LegacyEndpoint,
        params: Value,
        call: &CallContext,
    ) -> Result<Options, DispatchError> {
        match &endpoint.route {
            Route::Static(route) => {
                tracing::debug!(
                    legacy = endpoint.name,
                    tool = route.entry_point.tool_name(),
                    operation = route.operation.as_str(),
                    "legacy call"
                );
                self.dispatch(route.entry_point, translate_static(route, params), call)
            }
            Route::Dynamic(route) => {
                let (target, envelope) = demultiplex(route, params)?;
                tracing::debug!(
                    legacy = endpoint.name,
                    tool = target.entry_point.tool_name(),
                    operation = target.operation.as_str(),
                    "legacy bulk call"
                );
                self.dispatch_envelope(target.entry_point, envelope, call)
            }
        }
    }
}
