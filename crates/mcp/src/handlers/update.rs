#![forbid(unsafe_code)]

use super::render::{into_options, relationship_json, thread_json};
use crate::dispatch::{HandlerContext, HandlerError, Options};
use crate::{optional_f64, optional_string, optional_string_list, require_string};
use mg_storage::{RelationshipPatch, SqliteStore, StoreError, ThreadPatch};
use serde_json::json;

fn not_found(what: &str) -> impl FnOnce(StoreError) -> HandlerError + '_ {
    move |err| match err {
        StoreError::UnknownId(id) => HandlerError::NotFound(format!("{what} {id}")),
        other => other.into(),
    }
}

pub(super) fn update_thread(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let thread_id = require_string(&options, "thread_id")?;
    let add_chunk_ids = optional_string_list(&options, "add_chunk_ids")?;
    for chunk_id in &add_chunk_ids {
        if store.chunk_get(chunk_id)?.is_none() {
            return Err(HandlerError::NotFound(format!("chunk {chunk_id}")));
        }
    }
    let patch = ThreadPatch {
        title: optional_string(&options, "name")?,
        description: optional_string(&options, "description")?,
        status: optional_string(&options, "status")?,
        add_chunk_ids,
        remove_chunk_ids: optional_string_list(&options, "remove_chunk_ids")?,
    };
    let row = store
        .thread_update(&thread_id, patch)
        .map_err(not_found("thread"))?;
    Ok(into_options(thread_json(&row)))
}

pub(super) fn update_relationship(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let relationship_id = require_string(&options, "relationship_id")?;
    let patch = RelationshipPatch {
        kind: optional_string(&options, "relation_type")?,
        confidence: optional_f64(&options, "confidence")?,
        note: optional_string(&options, "note")?,
    };
    let row = store
        .relationship_update(&relationship_id, patch)
        .map_err(not_found("relationship"))?;
    Ok(into_options(relationship_json(&row)))
}

/// Accepts `chunk_ids` or a single `chunk_id`. Unknown ids are reported, not fatal.
pub(super) fn mark_refreshed(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let mut chunk_ids = optional_string_list(&options, "chunk_ids")?;
    if let Some(chunk_id) = optional_string(&options, "chunk_id")? {
        chunk_ids.push(chunk_id);
    }
    if chunk_ids.is_empty() {
        return Err(HandlerError::InvalidInput(
            "chunk_id or chunk_ids is required".to_string(),
        ));
    }

    let mut refreshed = Vec::new();
    let mut missing = Vec::new();
    for chunk_id in chunk_ids {
        match store.chunk_mark_refreshed(&chunk_id) {
            Ok(row) => refreshed.push(row.id),
            Err(StoreError::UnknownId(id)) => missing.push(id),
            Err(err) => return Err(err.into()),
        }
    }
    Ok(into_options(json!({
        "refreshed": refreshed,
        "missing": missing,
        "count": refreshed.len(),
    })))
}

/// Answers with a status payload rather than an error so existing callers keep succeeding.
pub(super) fn resolve_conflicts(
    _store: &mut SqliteStore,
    _ctx: &HandlerContext,
    _options: Options,
) -> Result<Options, HandlerError> {
    Ok(into_options(json!({
        "status": "not_implemented",
        "message": "Conflict resolution is unavailable; use detect_conflicts to list conflicts",
    })))
}
