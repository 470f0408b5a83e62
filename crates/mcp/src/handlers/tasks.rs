#![forbid(unsafe_code)]

use super::read::top_counts;
use super::render::{into_options, session_json, todo_json};
use super::text::round2;
use crate::dispatch::{HandlerContext, HandlerError, Options};
use crate::{
    new_id, optional_object_list, optional_string, repository_or_global, require_string,
};
use mg_storage::{ChunkQuery, NewSession, NewTodo, SqliteStore, StoreError, TodoStats, TodoStatus};
use serde_json::{Value, json};

/// Todo ids are unique per store; caller ids are namespaced by session.
fn todo_key(session_id: &str, id: &str) -> String {
    format!("{session_id}/{id}")
}

fn parse_status(raw: Option<String>) -> Result<Option<TodoStatus>, HandlerError> {
    match raw {
        None => Ok(None),
        Some(raw) => TodoStatus::parse(&raw).map(Some).ok_or_else(|| {
            HandlerError::InvalidInput(format!(
                "status must be pending, in_progress or completed (got {raw})"
            ))
        }),
    }
}

fn completion_rate(stats: &TodoStats) -> f64 {
    if stats.total == 0 {
        return 0.0;
    }
    round2(stats.completed as f64 / stats.total as f64)
}

fn stats_json(stats: &TodoStats) -> Value {
    json!({
        "total": stats.total,
        "pending": stats.pending,
        "in_progress": stats.in_progress,
        "completed": stats.completed,
        "completion_rate": completion_rate(stats),
    })
}

/// Replaces the session's todo list with `todos`.
pub(super) fn todo_write(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let session_id = require_string(&options, "session_id")?;
    let items = optional_object_list(&options, "todos")?;

    let mut todos = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let id = optional_string(item, "id")?
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| (index + 1).to_string());
        todos.push(NewTodo {
            id: todo_key(&session_id, &id),
            content: require_string(item, "content")?,
            status: parse_status(optional_string(item, "status")?)?.unwrap_or(TodoStatus::Pending),
            priority: optional_string(item, "priority")?.unwrap_or_else(|| "medium".to_string()),
        });
    }

    let rows = store.todos_write(&session_id, todos)?;
    Ok(into_options(json!({
        "session_id": session_id,
        "count": rows.len(),
        "todos": rows.iter().map(todo_json).collect::<Vec<_>>(),
    })))
}

pub(super) fn todo_read(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let session_id = optional_string(&options, "session_id")?;
    let status = parse_status(optional_string(&options, "status")?)?;
    let rows: Vec<Value> = store
        .todos_read(session_id.as_deref())?
        .iter()
        .filter(|row| status.is_none_or(|s| row.status == s))
        .map(todo_json)
        .collect();
    Ok(into_options(json!({
        "session_id": session_id,
        "count": rows.len(),
        "todos": rows,
    })))
}

/// `todo_id` is either the stored id or, with `session_id`, the caller's own id.
pub(super) fn todo_update(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let raw_id = require_string(&options, "todo_id")?;
    let id = match optional_string(&options, "session_id")? {
        Some(session_id) if !raw_id.contains('/') => todo_key(&session_id, &raw_id),
        _ => raw_id,
    };
    let status = parse_status(optional_string(&options, "status")?)?;
    let content = optional_string(&options, "content")?;
    if status.is_none() && content.is_none() {
        return Err(HandlerError::InvalidInput(
            "status or content is required".to_string(),
        ));
    }
    match store.todo_update(&id, status, content) {
        Ok(row) => Ok(into_options(todo_json(&row))),
        Err(StoreError::UnknownId(id)) => Err(HandlerError::NotFound(format!("todo {id}"))),
        Err(err) => Err(err.into()),
    }
}

pub(super) fn session_create(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let title = optional_string(&options, "title")?.unwrap_or_else(|| "session".to_string());
    let id = match optional_string(&options, "session_id")? {
        Some(id) if !id.trim().is_empty() => id,
        _ => new_id("session", &[&title]),
    };
    let row = store.session_create(NewSession {
        id,
        repository: repository_or_global(&options)?,
        title,
    })?;
    tracing::info!(session_id = %row.id, repository = %row.repository, "session started");
    Ok(into_options(session_json(&row)))
}

pub(super) fn session_end(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let session_id = require_string(&options, "session_id")?;
    let summary = optional_string(&options, "summary")?;
    let row = match store.session_end(&session_id, summary) {
        Ok(row) => row,
        Err(StoreError::UnknownId(id)) => {
            return Err(HandlerError::NotFound(format!("session {id}")));
        }
        Err(err) => return Err(err.into()),
    };
    let stats = store.todo_stats(Some(&row.id))?;
    let mut out = into_options(session_json(&row));
    out.insert("todos".to_string(), stats_json(&stats));
    Ok(out)
}

pub(super) fn session_list(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let repository = optional_string(&options, "repository")?;
    let status = optional_string(&options, "status")?;
    let rows = store.sessions_list(repository.as_deref(), status.as_deref())?;
    Ok(into_options(json!({
        "count": rows.len(),
        "sessions": rows.iter().map(session_json).collect::<Vec<_>>(),
    })))
}

/// Tool usage and task throughput for one session, or for everything.
pub(super) fn workflow_analyze(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let session_id = optional_string(&options, "session_id")?;
    let chunks = store.chunks_query(&ChunkQuery {
        session_id: session_id.clone(),
        limit: 1000,
        ..ChunkQuery::default()
    })?;
    let stats = store.todo_stats(session_id.as_deref())?;
    let tools = top_counts(chunks.iter().flat_map(|c| c.tools_used.iter()), 10);
    let files = top_counts(chunks.iter().flat_map(|c| c.files_modified.iter()), 10);

    let mut suggestions = Vec::new();
    if stats.in_progress > 1 {
        suggestions.push("several todos are in progress at once; finish one before starting another");
    }
    if stats.total > 0 && completion_rate(&stats) < 0.5 {
        suggestions.push("less than half of the todos are completed");
    }
    if chunks.is_empty() {
        suggestions.push("no memory chunks recorded for this workflow");
    }

    Ok(into_options(json!({
        "session_id": session_id,
        "chunks": chunks.len(),
        "tools": tools
            .iter()
            .map(|(tool, n)| json!({ "tool": tool, "count": n }))
            .collect::<Vec<_>>(),
        "files": files
            .iter()
            .map(|(file, n)| json!({ "file": file, "count": n }))
            .collect::<Vec<_>>(),
        "todos": stats_json(&stats),
        "suggestions": suggestions,
    })))
}

pub(super) fn task_completion_stats(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let session_id = optional_string(&options, "session_id")?;
    let stats = store.todo_stats(session_id.as_deref())?;
    let mut out = into_options(stats_json(&stats));
    out.insert("session_id".to_string(), json!(session_id));
    Ok(out)
}
