#![forbid(unsafe_code)]

use super::{DispatchError, Options};
use mg_core::entry::EntryPoint;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RequestEnvelope {
    pub(crate) operation: String,
    pub(crate) scope: String,
    pub(crate) options: Options,
}

impl RequestEnvelope {
    /// Checks `operation` first, then `options`. Only `system` may omit `options`.
    pub(crate) fn from_args(entry_point: EntryPoint, args: Value) -> Result<Self, DispatchError> {
        let mut args = match args {
            Value::Object(map) => map,
            _ => Options::new(),
        };

        let operation = match args.remove("operation") {
            Some(Value::String(operation)) => operation,
            _ => return Err(DispatchError::MissingField("operation")),
        };

        let options = match args.remove("options") {
            Some(Value::Object(options)) => options,
            _ if entry_point.options_optional() => Options::new(),
            _ => return Err(DispatchError::MissingField("options")),
        };

        let scope = match args.remove("scope") {
            Some(Value::String(scope)) => scope,
            _ => entry_point.default_scope().to_string(),
        };

        Ok(Self {
            operation,
            scope,
            options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn operation_is_checked_before_options() {
        let err = RequestEnvelope::from_args(EntryPoint::Read, json!({})).expect_err("empty");
        assert!(matches!(err, DispatchError::MissingField("operation")));

        let err = RequestEnvelope::from_args(EntryPoint::Read, json!({ "operation": 7 }))
            .expect_err("non-string operation");
        assert!(matches!(err, DispatchError::MissingField("operation")));

        let err = RequestEnvelope::from_args(EntryPoint::Read, json!({ "operation": "search" }))
            .expect_err("no options");
        assert!(matches!(err, DispatchError::MissingField("options")));
    }

    #[test]
    fn options_must_be_an_object() {
        let err = RequestEnvelope::from_args(
            EntryPoint::Create,
            json!({ "operation": "store_chunk", "options": "content" }),
        )
        .expect_err("string options");
        assert!(matches!(err, DispatchError::MissingField("options")));
    }

    #[test]
    fn system_substitutes_empty_options() {
        let envelope =
            RequestEnvelope::from_args(EntryPoint::System, json!({ "operation": "health" }))
                .expect("system without options");
        assert!(envelope.options.is_empty());
        assert_eq!(envelope.scope, "system");

        let envelope = RequestEnvelope::from_args(
            EntryPoint::System,
            json!({ "operation": "health", "options": [1, 2] }),
        )
        .expect("system with non-object options");
        assert!(envelope.options.is_empty());
    }

    #[test]
    fn scope_defaults_per_entry_point_and_unknown_scope_passes() {
        let envelope = RequestEnvelope::from_args(
            EntryPoint::Delete,
            json!({ "operation": "delete_expired", "options": {} }),
        )
        .expect("delete");
        assert_eq!(envelope.scope, "bulk");

        let envelope = RequestEnvelope::from_args(
            EntryPoint::Read,
            json!({ "operation": "get_bulk_progress", "scope": "bulk", "options": {} }),
        )
        .expect("advisory scope");
        assert_eq!(envelope.scope, "bulk");
    }

    #[test]
    fn non_object_args_mean_missing_operation() {
        let err = RequestEnvelope::from_args(EntryPoint::Tasks, Value::Null).expect_err("null");
        assert!(matches!(err, DispatchError::MissingField("operation")));
    }
}
