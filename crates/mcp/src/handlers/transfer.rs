#![forbid(unsafe_code)]

use super::render::{
    alias_json, chunk_json, into_options, relationship_json, session_json, thread_json, todo_json,
};
use crate::dispatch::{HandlerContext, HandlerError, Options};
use crate::{now_rfc3339, optional_string, optional_string_list, optional_usize};
use mg_storage::{ChunkKind, ChunkQuery, ChunkRow, SqliteStore, TodoStatus};
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::fmt::Write as _;

const EXPORT_LIMIT: usize = 1000;

fn render_markdown(repository: &str, chunks: &[ChunkRow]) -> String {
    let mut out = format!("# Memory export: {repository}\n");
    for row in chunks {
        let _ = write!(out, "\n## {}\n\n", row.summary);
        let _ = writeln!(out, "- id: `{}`", row.id);
        let _ = writeln!(out, "- type: {}", row.kind.as_str());
        if !row.tags.is_empty() {
            let _ = writeln!(out, "- tags: {}", row.tags.join(", "));
        }
        if let Some(rationale) = &row.rationale {
            let _ = writeln!(out, "- rationale: {rationale}");
        }
        let _ = write!(out, "\n{}\n", row.content);
    }
    out
}

/// `format` is `json` (default) or `markdown`.
pub(super) fn export_project(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let repository = optional_string(&options, "repository")?.filter(|r| !r.trim().is_empty());
    let format = optional_string(&options, "format")?.unwrap_or_else(|| "json".to_string());
    let chunks = store.chunks_query(&ChunkQuery {
        repository: repository.clone(),
        limit: EXPORT_LIMIT,
        ..ChunkQuery::default()
    })?;
    let label = repository.as_deref().unwrap_or("all repositories");

    match format.as_str() {
        "json" => {
            let threads = store.threads_list(repository.as_deref(), None)?;
            let aliases = store.aliases_list(repository.as_deref(), None, None)?;
            let mut rel_ids = BTreeSet::new();
            let mut relationships = Vec::new();
            for row in &chunks {
                for rel in store.relationships_for(&row.id, None)? {
                    if rel_ids.insert(rel.id.clone()) {
                        relationships.push(relationship_json(&rel));
                    }
                }
            }
            Ok(into_options(json!({
                "repository": label,
                "format": format,
                "exported_at": now_rfc3339(),
                "counts": {
                    "chunks": chunks.len(),
                    "threads": threads.len(),
                    "relationships": relationships.len(),
                    "aliases": aliases.len(),
                },
                "chunks": chunks.iter().map(chunk_json).collect::<Vec<_>>(),
                "threads": threads.iter().map(thread_json).collect::<Vec<_>>(),
                "relationships": relationships,
                "aliases": aliases.iter().map(alias_json).collect::<Vec<_>>(),
            })))
        }
        "markdown" => Ok(into_options(json!({
            "repository": label,
            "format": format,
            "exported_at": now_rfc3339(),
            "counts": { "chunks": chunks.len() },
            "markdown": render_markdown(label, &chunks),
        }))),
        other => Err(HandlerError::InvalidInput(format!(
            "format must be json or markdown (got {other})"
        ))),
    }
}

/// Exports the listed `chunk_ids`, or every chunk matching the optional filters.
pub(super) fn bulk_export(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let chunk_ids = optional_string_list(&options, "chunk_ids")?;
    let mut missing = Vec::new();
    let chunks: Vec<ChunkRow> = if chunk_ids.is_empty() {
        store.chunks_query(&ChunkQuery {
            repository: optional_string(&options, "repository")?,
            session_id: optional_string(&options, "session_id")?,
            tag: optional_string(&options, "tag")?,
            limit: optional_usize(&options, "limit", EXPORT_LIMIT, EXPORT_LIMIT)?,
            ..ChunkQuery::default()
        })?
    } else {
        let mut rows = Vec::with_capacity(chunk_ids.len());
        for chunk_id in chunk_ids {
            match store.chunk_get(&chunk_id)? {
                Some(row) => rows.push(row),
                None => missing.push(chunk_id),
            }
        }
        rows
    };

    Ok(into_options(json!({
        "exported_at": now_rfc3339(),
        "count": chunks.len(),
        "missing": missing,
        "chunks": chunks.iter().map(chunk_json).collect::<Vec<_>>(),
    })))
}

/// Hand-off bundle for resuming work: latest session, its recent work and open todos.
pub(super) fn continuity(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let repository = optional_string(&options, "repository")?.filter(|r| !r.trim().is_empty());
    let limit = optional_usize(&options, "limit", 10, 100)?;

    let session = match optional_string(&options, "session_id")? {
        Some(id) => match store.session_get(&id)? {
            Some(row) => Some(row),
            None => return Err(HandlerError::NotFound(format!("session {id}"))),
        },
        None => store.sessions_list(repository.as_deref(), None)?.into_iter().next(),
    };
    let session_id = session.as_ref().map(|s| s.id.clone());

    let recent = store.chunks_query(&ChunkQuery {
        repository: repository.clone(),
        session_id: session_id.clone(),
        kind: Some(ChunkKind::Chunk),
        limit,
        ..ChunkQuery::default()
    })?;
    let decisions = store.chunks_query(&ChunkQuery {
        repository: repository.clone(),
        session_id: session_id.clone(),
        kind: Some(ChunkKind::Decision),
        limit,
        ..ChunkQuery::default()
    })?;
    let open_todos: Vec<Value> = store
        .todos_read(session_id.as_deref())?
        .iter()
        .filter(|todo| todo.status != TodoStatus::Completed)
        .map(todo_json)
        .collect();
    let threads = store.threads_list(repository.as_deref(), Some("active"))?;

    Ok(into_options(json!({
        "generated_at": now_rfc3339(),
        "session": session.as_ref().map(session_json),
        "recent_work": recent.iter().map(|row| json!({
            "chunk_id": row.id,
            "summary": row.summary,
        })).collect::<Vec<_>>(),
        "decisions": decisions.iter().map(|row| json!({
            "chunk_id": row.id,
            "decision": row.decision,
            "rationale": row.rationale,
        })).collect::<Vec<_>>(),
        "open_todos": open_todos,
        "active_threads": threads.iter().map(thread_json).collect::<Vec<_>>(),
    })))
}
