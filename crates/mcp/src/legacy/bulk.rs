#![forbid(unsafe_code)]

use crate::dispatch::{DispatchError, Options, RequestEnvelope};
use mg_core::routes::{DynamicRoute, StaticRoute};
use serde_json::Value;

/// Picks the target from the payload's discriminator field and strips that field.
pub(crate) fn demultiplex(
    route: &DynamicRoute,
    params: Value,
) -> Result<(StaticRoute, RequestEnvelope), DispatchError> {
    let mut params = match params {
        Value::Object(map) => map,
        _ => Options::new(),
    };

    let value = match params.get(route.field) {
        Some(Value::String(value)) => value.clone(),
        _ => return Err(DispatchError::MissingField(route.field)),
    };
    let Some(target) = route.lookup(&value) else {
        return Err(DispatchError::UnsupportedBulkOperation(value));
    };

    params.remove(route.field);
    let envelope = RequestEnvelope {
        operation: target.operation.as_str().to_string(),
        scope: target.scope.to_string(),
        options: params,
    };
    Ok((target, envelope))
}
