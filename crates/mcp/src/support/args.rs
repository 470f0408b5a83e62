#![forbid(unsafe_code)]

use crate::dispatch::{HandlerError, Options};
use serde_json::Value;

/// Repository used when a caller does not name one.
pub(crate) const GLOBAL_REPOSITORY: &str = "global";

pub(crate) fn require_string(options: &Options, key: &str) -> Result<String, HandlerError> {
    match options.get(key) {
        Some(Value::String(v)) if !v.trim().is_empty() => Ok(v.clone()),
        Some(Value::String(_)) => Err(HandlerError::InvalidInput(format!(
            "{key} must not be empty"
        ))),
        Some(Value::Null) | None => Err(HandlerError::InvalidInput(format!("{key} is required"))),
        Some(_) => Err(HandlerError::InvalidInput(format!("{key} must be a string"))),
    }
}

pub(crate) fn optional_string(
    options: &Options,
    key: &str,
) -> Result<Option<String>, HandlerError> {
    match options.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(v)) => Ok(Some(v.clone())),
        Some(_) => Err(HandlerError::InvalidInput(format!("{key} must be a string"))),
    }
}

pub(crate) fn optional_string_list(
    options: &Options,
    key: &str,
) -> Result<Vec<String>, HandlerError> {
    let Some(value) = options.get(key) else {
        return Ok(Vec::new());
    };
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    HandlerError::InvalidInput(format!("{key} must be an array of strings"))
                })
            })
            .collect(),
        _ => Err(HandlerError::InvalidInput(format!(
            "{key} must be an array of strings"
        ))),
    }
}

pub(crate) fn require_string_list(
    options: &Options,
    key: &str,
) -> Result<Vec<String>, HandlerError> {
    let list = optional_string_list(options, key)?;
    if list.is_empty() {
        return Err(HandlerError::InvalidInput(format!(
            "{key} must be a non-empty array"
        )));
    }
    Ok(list)
}

pub(crate) fn optional_usize(
    options: &Options,
    key: &str,
    default: usize,
    max: usize,
) -> Result<usize, HandlerError> {
    match options.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => value
            .as_u64()
            .and_then(|v| usize::try_from(v).ok())
            .map(|v| v.min(max))
            .ok_or_else(|| {
                HandlerError::InvalidInput(format!("{key} must be a non-negative integer"))
            }),
    }
}

pub(crate) fn optional_f64(options: &Options, key: &str) -> Result<Option<f64>, HandlerError> {
    match options.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| HandlerError::InvalidInput(format!("{key} must be a number"))),
    }
}

pub(crate) fn optional_object_list<'a>(
    options: &'a Options,
    key: &str,
) -> Result<Vec<&'a Options>, HandlerError> {
    match options.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_object().ok_or_else(|| {
                    HandlerError::InvalidInput(format!("{key} must be an array of objects"))
                })
            })
            .collect(),
        Some(_) => Err(HandlerError::InvalidInput(format!(
            "{key} must be an array of objects"
        ))),
    }
}

pub(crate) fn repository_or_global(options: &Options) -> Result<String, HandlerError> {
    Ok(optional_string(options, "repository")?
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| GLOBAL_REPOSITORY.to_string()))
}
