#![forbid(unsafe_code)]

use super::render::into_options;
use crate::dispatch::{HandlerContext, HandlerError, Options};
use crate::{
    now_rfc3339, optional_string, require_string, require_string_list, ts_ms_to_date,
    ts_ms_to_rfc3339,
};
use mg_core::entry::EntryPoint;
use mg_core::ops::Operation;
use mg_core::routes::{Route, legacy_tools};
use mg_storage::{ChunkRow, SqliteStore};
use serde_json::{Value, json};

fn citation_text(row: &ChunkRow) -> String {
    format!(
        "{} ({}, {}, {})",
        row.summary,
        row.repository,
        row.kind.as_str(),
        ts_ms_to_date(row.created_at_ms)
    )
}

pub(super) fn health(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    _options: Options,
) -> Result<Options, HandlerError> {
    let (status, storage) = match store.ping() {
        Ok(()) => ("healthy", json!({ "status": "ok" })),
        Err(err) => {
            tracing::warn!(error = %err, "storage ping failed");
            ("degraded", json!({ "status": "error", "error": err.to_string() }))
        }
    };
    let storage_dir = store.storage_dir().map(|dir| dir.display().to_string());

    Ok(into_options(json!({
        "status": status,
        "timestamp": now_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "storage": storage,
        },
        "storage_dir": storage_dir,
    })))
}

pub(super) fn status(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let repository = optional_string(&options, "repository")?.filter(|r| !r.trim().is_empty());
    let stats = store.repo_stats(repository.as_deref())?;
    let repositories = store.repositories()?;

    Ok(into_options(json!({
        "repository": repository,
        "timestamp": now_rfc3339(),
        "chunks": stats.chunks,
        "decisions": stats.decisions,
        "threads": stats.threads,
        "relationships": stats.relationships,
        "aliases": stats.aliases,
        "active_sessions": stats.sessions_active,
        "oldest": stats.oldest_ms.map(ts_ms_to_rfc3339),
        "newest": stats.newest_ms.map(ts_ms_to_rfc3339),
        "repositories": repositories.iter().map(|(name, chunks)| json!({
            "repository": name,
            "chunks": chunks,
        })).collect::<Vec<_>>(),
    })))
}

/// Numbered references for `chunk_ids`, in the order given.
pub(super) fn generate_citations(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let chunk_ids = require_string_list(&options, "chunk_ids")?;
    let mut citations = Vec::new();
    let mut missing = Vec::new();
    for chunk_id in chunk_ids {
        match store.chunk_get(&chunk_id)? {
            Some(row) => {
                let index = citations.len() + 1;
                citations.push(json!({
                    "index": index,
                    "chunk_id": row.id,
                    "citation": format!("[{index}] {}", citation_text(&row)),
                }));
            }
            None => missing.push(chunk_id),
        }
    }
    let bibliography = citations
        .iter()
        .filter_map(|c| c["citation"].as_str())
        .collect::<Vec<_>>()
        .join("\n");

    Ok(into_options(json!({
        "count": citations.len(),
        "citations": citations,
        "missing": missing,
        "bibliography": bibliography,
    })))
}

pub(super) fn create_inline_citation(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let chunk_id = require_string(&options, "chunk_id")?;
    let Some(row) = store.chunk_get(&chunk_id)? else {
        return Err(HandlerError::NotFound(format!("chunk {chunk_id}")));
    };
    let marker = format!("[^{}]", row.id);
    let text = match optional_string(&options, "text")? {
        Some(text) if !text.trim().is_empty() => format!("{text} {marker}"),
        _ => marker.clone(),
    };

    Ok(into_options(json!({
        "chunk_id": row.id,
        "text": text,
        "footnote": format!("{marker}: {}", citation_text(&row)),
    })))
}

fn entry_point_doc(entry_point: EntryPoint) -> Value {
    let legacy: Vec<&str> = legacy_tools()
        .filter(|tool| match &tool.route {
            Route::Static(route) => route.entry_point == entry_point,
            Route::Dynamic(route) => route.routes.iter().any(|(_, r)| r.entry_point == entry_point),
        })
        .map(|tool| tool.name)
        .collect();
    json!({
        "tool": entry_point.tool_name(),
        "operations": Operation::all_for(entry_point)
            .into_iter()
            .map(Operation::as_str)
            .collect::<Vec<_>>(),
        "scopes": entry_point.scopes(),
        "default_scope": entry_point.default_scope(),
        "options_required": !entry_point.options_optional(),
        "legacy_tools": legacy,
    })
}

/// `topic` narrows the output to one tool, by `memory_<name>` or `<name>`.
pub(super) fn get_documentation(
    _store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let selected: Vec<EntryPoint> = match optional_string(&options, "topic")? {
        None => EntryPoint::ALL.to_vec(),
        Some(topic) => {
            let found = EntryPoint::from_tool_name(&topic).or_else(|| {
                EntryPoint::ALL
                    .into_iter()
                    .find(|entry_point| entry_point.as_str() == topic)
            });
            match found {
                Some(entry_point) => vec![entry_point],
                None => return Err(HandlerError::NotFound(format!("documentation topic {topic}"))),
            }
        }
    };

    Ok(into_options(json!({
        "usage": "Call a memory_* tool with {operation, scope, options}. memory_system may omit options.",
        "tools": selected.into_iter().map(entry_point_doc).collect::<Vec<_>>(),
    })))
}
