#![forbid(unsafe_code)]

use super::create::chunk_request;
use super::render::{bulk_json, into_options};
use super::text::paragraphs;
use crate::dispatch::{HandlerContext, HandlerError, Options};
use crate::{
    new_id, optional_object_list, optional_string, optional_string_list, require_string,
    require_string_list,
};
use mg_core::ops::BulkKind;
use mg_storage::{ChunkKind, ChunkPatch, SqliteStore, StoreError};
use serde_json::{Value, json};

/// Per-item outcome of a bulk run. Item failures are reported, not propagated.
#[derive(Default)]
struct BulkOutcome {
    chunk_ids: Vec<String>,
    errors: Vec<Value>,
    total: usize,
}

impl BulkOutcome {
    fn record(&mut self, index: usize, result: Result<String, HandlerError>) {
        self.total += 1;
        match result {
            Ok(id) => self.chunk_ids.push(id),
            Err(err) => self.errors.push(json!({
                "index": index,
                "code": err.code(),
                "error": err.to_string(),
            })),
        }
    }

    fn finish(self, store: &mut SqliteStore, kind: BulkKind) -> Result<Options, HandlerError> {
        let id = new_id("bulk", &[kind.as_str()]);
        let row = store.bulk_op_record(&id, kind.as_str(), self.total, self.errors.len())?;
        tracing::info!(
            operation_id = %row.id,
            kind = kind.as_str(),
            total = self.total,
            failed = self.errors.len(),
            "bulk operation recorded"
        );

        let mut out = into_options(bulk_json(&row));
        out.insert("succeeded".to_string(), json!(self.chunk_ids.len()));
        out.insert("chunk_ids".to_string(), json!(self.chunk_ids));
        out.insert("errors".to_string(), Value::Array(self.errors));
        Ok(out)
    }
}

fn store_items(
    store: &mut SqliteStore,
    defaults: &Options,
    items: &[&Options],
    outcome: &mut BulkOutcome,
) {
    let fallback_session = optional_string(defaults, "session_id")
        .ok()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| new_id("bulk_session", &[]));

    for (index, item) in items.iter().enumerate() {
        outcome.record(index, store_one(store, defaults, item, &fallback_session));
    }
}

fn store_one(
    store: &mut SqliteStore,
    defaults: &Options,
    item: &Options,
    fallback_session: &str,
) -> Result<String, HandlerError> {
    let mut merged = defaults.clone();
    merged.remove("chunks");
    merged.remove("data");
    merged.extend(item.clone());
    let content = require_string(&merged, "content")?;
    let session_id = optional_string(&merged, "session_id")?
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| fallback_session.to_string());
    let request = chunk_request(&merged, ChunkKind::Chunk, content, session_id)?;
    Ok(store.chunk_insert(request)?.id)
}

fn update_items(store: &mut SqliteStore, items: &[&Options], outcome: &mut BulkOutcome) {
    for (index, item) in items.iter().enumerate() {
        outcome.record(index, update_one(store, item));
    }
}

fn update_one(store: &mut SqliteStore, item: &Options) -> Result<String, HandlerError> {
    let chunk_id = require_string(item, "chunk_id")?;
    let tags = match item.get("tags") {
        None | Some(Value::Null) => None,
        Some(_) => Some(optional_string_list(item, "tags")?),
    };
    let patch = ChunkPatch {
        content: optional_string(item, "content")?,
        summary: optional_string(item, "summary")?,
        tags,
    };
    match store.chunk_update(&chunk_id, patch) {
        Ok(row) => Ok(row.id),
        Err(StoreError::UnknownId(id)) => Err(HandlerError::NotFound(format!("chunk {id}"))),
        Err(err) => Err(err.into()),
    }
}

fn delete_items(
    store: &mut SqliteStore,
    chunk_ids: &[String],
    outcome: &mut BulkOutcome,
) -> Result<(), HandlerError> {
    let removed = store.chunks_delete(chunk_ids)?;
    for (index, chunk_id) in chunk_ids.iter().enumerate() {
        let result = if removed.contains(chunk_id) {
            Ok(chunk_id.clone())
        } else {
            Err(HandlerError::NotFound(format!("chunk {chunk_id}")))
        };
        outcome.record(index, result);
    }
    Ok(())
}

/// Bulk delete takes `ids`; `chunk_ids` is accepted as an alias.
fn delete_ids(options: &Options) -> Result<Vec<String>, HandlerError> {
    let key = if options.contains_key("ids") || !options.contains_key("chunk_ids") {
        "ids"
    } else {
        "chunk_ids"
    };
    require_string_list(options, key)
}

/// Shared target of every bulk route. `operation` selects store, update or delete.
pub(super) fn bulk_operation(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let raw = require_string(&options, "operation")?;
    let Some(kind) = BulkKind::parse(&raw) else {
        return Err(HandlerError::InvalidInput(format!(
            "operation must be one of store, update, delete (got {raw})"
        )));
    };

    let mut outcome = BulkOutcome::default();
    match kind {
        BulkKind::Store | BulkKind::Update => {
            let items = optional_object_list(&options, "chunks")?;
            if items.is_empty() {
                return Err(HandlerError::InvalidInput(
                    "chunks must be a non-empty array".to_string(),
                ));
            }
            if kind == BulkKind::Store {
                store_items(store, &options, &items, &mut outcome);
            } else {
                update_items(store, &items, &mut outcome);
            }
        }
        BulkKind::Delete => {
            let chunk_ids = delete_ids(&options)?;
            delete_items(store, &chunk_ids, &mut outcome)?;
        }
    }
    outcome.finish(store, kind)
}

/// Accepts structured `chunks` or free text `data` split into paragraphs.
pub(super) fn bulk_import(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let mut items: Vec<Options> = optional_object_list(&options, "chunks")?
        .into_iter()
        .cloned()
        .collect();
    if items.is_empty() {
        let Some(data) = optional_string(&options, "data")? else {
            return Err(HandlerError::InvalidInput(
                "chunks or data is required".to_string(),
            ));
        };
        items = paragraphs(&data)
            .into_iter()
            .map(|paragraph| {
                let mut item = Options::new();
                item.insert("content".to_string(), json!(paragraph));
                item
            })
            .collect();
    }
    if items.is_empty() {
        return Err(HandlerError::InvalidInput("nothing to import".to_string()));
    }

    let refs: Vec<&Options> = items.iter().collect();
    let mut outcome = BulkOutcome::default();
    store_items(store, &options, &refs, &mut outcome);
    outcome.finish(store, BulkKind::Store)
}
