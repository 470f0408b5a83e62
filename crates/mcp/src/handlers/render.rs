#![forbid(unsafe_code)]

use crate::dispatch::Options;
use crate::ts_ms_to_rfc3339;
use mg_storage::{AliasRow, BulkOpRow, ChunkRow, RelationshipRow, SessionRow, ThreadRow, TodoRow};
use serde_json::{Value, json};

pub(super) fn into_options(value: Value) -> Options {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Options::new();
            map.insert("result".to_string(), other);
            map
        }
    }
}

pub(super) fn chunk_json(row: &ChunkRow) -> Value {
    let mut out = json!({
        "chunk_id": row.id,
        "type": row.kind.as_str(),
        "repository": row.repository,
        "session_id": row.session_id,
        "summary": row.summary,
        "content": row.content,
        "tags": row.tags,
        "created_at": ts_ms_to_rfc3339(row.created_at_ms),
        "refreshed_at": ts_ms_to_rfc3339(row.refreshed_at_ms),
    });
    if let Some(obj) = out.as_object_mut() {
        if let Some(branch) = &row.branch {
            obj.insert("branch".to_string(), json!(branch));
        }
        if !row.files_modified.is_empty() {
            obj.insert("files_modified".to_string(), json!(row.files_modified));
        }
        if !row.tools_used.is_empty() {
            obj.insert("tools_used".to_string(), json!(row.tools_used));
        }
        if let Some(decision) = &row.decision {
            obj.insert("decision".to_string(), json!(decision));
        }
        if let Some(rationale) = &row.rationale {
            obj.insert("rationale".to_string(), json!(rationale));
        }
    }
    out
}

pub(super) fn thread_json(row: &ThreadRow) -> Value {
    json!({
        "thread_id": row.id,
        "repository": row.repository,
        "name": row.title,
        "description": row.description,
        "status": row.status,
        "chunk_ids": row.chunk_ids,
        "created_at": ts_ms_to_rfc3339(row.created_at_ms),
        "updated_at": ts_ms_to_rfc3339(row.updated_at_ms),
    })
}

pub(super) fn relationship_json(row: &RelationshipRow) -> Value {
    json!({
        "relationship_id": row.id,
        "source_chunk_id": row.source_id,
        "target_chunk_id": row.target_id,
        "relation_type": row.kind,
        "confidence": row.confidence,
        "note": row.note,
        "updated_at": ts_ms_to_rfc3339(row.updated_at_ms),
    })
}

pub(super) fn alias_json(row: &AliasRow) -> Value {
    json!({
        "alias": row.name,
        "type": row.kind,
        "target": row.target,
        "repository": row.repository,
        "created_at": ts_ms_to_rfc3339(row.created_at_ms),
    })
}

pub(super) fn session_json(row: &SessionRow) -> Value {
    json!({
        "session_id": row.id,
        "repository": row.repository,
        "title": row.title,
        "status": row.status,
        "summary": row.summary,
        "started_at": ts_ms_to_rfc3339(row.started_at_ms),
        "ended_at": row.ended_at_ms.map(ts_ms_to_rfc3339),
    })
}

pub(super) fn todo_json(row: &TodoRow) -> Value {
    json!({
        "id": row.id,
        "session_id": row.session_id,
        "content": row.content,
        "status": row.status.as_str(),
        "priority": row.priority,
        "updated_at": ts_ms_to_rfc3339(row.updated_at_ms),
    })
}

pub(super) fn bulk_json(row: &BulkOpRow) -> Value {
    let progress = if row.total == 0 {
        1.0
    } else {
        row.processed as f64 / row.total as f64
    };
    json!({
        "operation_id": row.id,
        "operation": row.kind,
        "status": row.status,
        "total": row.total,
        "processed": row.processed,
        "failed": row.failed,
        "progress": progress,
        "started_at": ts_ms_to_rfc3339(row.created_at_ms),
        "finished_at": row.finished_at_ms.map(ts_ms_to_rfc3339),
    })
}
