#![forbid(unsafe_code)]

use super::render::{into_options, relationship_json, thread_json};
use super::text::{jaccard, paragraphs, summarize};
use crate::dispatch::{HandlerContext, HandlerError, Options};
use crate::{
    new_id, optional_f64, optional_string, optional_string_list, repository_or_global,
    require_string, require_string_list, ts_ms_to_rfc3339,
};
use mg_storage::{
    ChunkKind, ChunkQuery, NewAlias, NewChunk, NewRelationship, NewThread, SqliteStore,
};
use serde_json::json;

/// Reads the optional chunk metadata shared by every chunk-producing operation.
pub(super) fn chunk_request(
    options: &Options,
    kind: ChunkKind,
    content: String,
    session_id: String,
) -> Result<NewChunk, HandlerError> {
    let summary = match optional_string(options, "summary")? {
        Some(summary) if !summary.trim().is_empty() => summary,
        _ => summarize(&content),
    };
    Ok(NewChunk {
        id: new_id(kind.as_str(), &[&session_id, &content]),
        kind,
        repository: repository_or_global(options)?,
        session_id,
        branch: optional_string(options, "branch")?,
        content,
        summary,
        tags: optional_string_list(options, "tags")?,
        files_modified: optional_string_list(options, "files_modified")?,
        tools_used: optional_string_list(options, "tools_used")?,
        decision: None,
        rationale: None,
    })
}

pub(super) fn store_chunk(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let content = require_string(&options, "content")?;
    let session_id = require_string(&options, "session_id")?;
    let row = store.chunk_insert(chunk_request(&options, ChunkKind::Chunk, content, session_id)?)?;

    Ok(into_options(json!({
        "chunk_id": row.id,
        "type": row.kind.as_str(),
        "summary": row.summary,
        "repository": row.repository,
        "stored_at": ts_ms_to_rfc3339(row.created_at_ms),
    })))
}

pub(super) fn store_decision(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let decision = require_string(&options, "decision")?;
    let rationale = require_string(&options, "rationale")?;
    let session_id = require_string(&options, "session_id")?;

    let mut content = format!("Decision: {decision}\nRationale: {rationale}");
    if let Some(context) = optional_string(&options, "context")?.filter(|c| !c.trim().is_empty()) {
        content.push_str("\nContext: ");
        content.push_str(&context);
    }

    let mut request = chunk_request(&options, ChunkKind::Decision, content, session_id)?;
    request.summary = summarize(&decision);
    if !request.tags.iter().any(|t| t == "decision") {
        request.tags.push("decision".to_string());
    }
    request.decision = Some(decision);
    request.rationale = Some(rationale);
    let row = store.chunk_insert(request)?;

    Ok(into_options(json!({
        "chunk_id": row.id,
        "type": row.kind.as_str(),
        "decision": row.decision,
        "repository": row.repository,
        "stored_at": ts_ms_to_rfc3339(row.created_at_ms),
    })))
}

pub(super) fn create_thread(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let name = require_string(&options, "name")?;
    let chunk_ids = require_string_list(&options, "chunk_ids")?;
    for chunk_id in &chunk_ids {
        if store.chunk_get(chunk_id)?.is_none() {
            return Err(HandlerError::NotFound(format!("chunk {chunk_id}")));
        }
    }

    let row = store.thread_create(NewThread {
        id: new_id("thread", &[&name]),
        repository: repository_or_global(&options)?,
        title: name,
        description: optional_string(&options, "description")?,
        chunk_ids,
    })?;
    Ok(into_options(thread_json(&row)))
}

pub(super) fn create_alias(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let row = store.alias_create(NewAlias {
        repository: repository_or_global(&options)?,
        name: require_string(&options, "name")?,
        kind: optional_string(&options, "type")?.unwrap_or_else(|| "tag".to_string()),
        target: require_string(&options, "target")?,
    })?;
    Ok(into_options(json!({
        "alias": row.name,
        "type": row.kind,
        "target": row.target,
        "repository": row.repository,
    })))
}

pub(super) fn create_relationship(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let source_id = require_string(&options, "source_chunk_id")?;
    let target_id = require_string(&options, "target_chunk_id")?;
    let row = store.relationship_create(NewRelationship {
        id: new_id("rel", &[&source_id, &target_id]),
        source_id,
        target_id,
        kind: require_string(&options, "relation_type")?,
        confidence: optional_f64(&options, "confidence")?.unwrap_or(1.0),
        note: optional_string(&options, "note")?,
    })?;
    Ok(into_options(relationship_json(&row)))
}

/// Links a chunk to neighbours in its repository that share tags or its session.
pub(super) fn auto_detect_relationships(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let chunk_id = require_string(&options, "chunk_id")?;
    let min_confidence = optional_f64(&options, "min_confidence")?.unwrap_or(0.3);
    let Some(anchor) = store.chunk_get(&chunk_id)? else {
        return Err(HandlerError::NotFound(format!("chunk {chunk_id}")));
    };

    let existing: Vec<String> = store
        .relationships_for(&chunk_id, None)?
        .into_iter()
        .map(|rel| {
            if rel.source_id == chunk_id {
                rel.target_id
            } else {
                rel.source_id
            }
        })
        .collect();

    let candidates = store.chunks_query(&ChunkQuery {
        repository: Some(anchor.repository.clone()),
        limit: 200,
        ..ChunkQuery::default()
    })?;

    let mut detected = Vec::new();
    for candidate in candidates {
        if candidate.id == anchor.id || existing.contains(&candidate.id) {
            continue;
        }
        let mut confidence = jaccard(&anchor.tags, &candidate.tags);
        if candidate.session_id == anchor.session_id {
            confidence = confidence.max(0.5);
        }
        if confidence < min_confidence || confidence <= 0.0 {
            continue;
        }
        let row = store.relationship_create(NewRelationship {
            id: new_id("rel", &[&anchor.id, &candidate.id]),
            source_id: anchor.id.clone(),
            target_id: candidate.id.clone(),
            kind: "related_to".to_string(),
            confidence: (confidence * 100.0).round() / 100.0,
            note: Some("auto-detected".to_string()),
        })?;
        detected.push(relationship_json(&row));
    }

    Ok(into_options(json!({
        "chunk_id": chunk_id,
        "count": detected.len(),
        "detected": detected,
    })))
}

/// Stores each paragraph of `data` as its own chunk.
pub(super) fn import_context(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let data = require_string(&options, "data")?;
    let source = optional_string(&options, "source")?.unwrap_or_else(|| "conversation".to_string());
    let session_id = match optional_string(&options, "session_id")? {
        Some(id) if !id.trim().is_empty() => id,
        _ => new_id("import", &[&data]),
    };

    let mut chunk_ids = Vec::new();
    for paragraph in paragraphs(&data) {
        let mut request =
            chunk_request(&options, ChunkKind::Chunk, paragraph.to_string(), session_id.clone())?;
        for tag in ["imported", source.as_str()] {
            if !request.tags.iter().any(|t| t == tag) {
                request.tags.push(tag.to_string());
            }
        }
        chunk_ids.push(store.chunk_insert(request)?.id);
    }

    Ok(into_options(json!({
        "session_id": session_id,
        "source": source,
        "imported": chunk_ids.len(),
        "chunk_ids": chunk_ids,
    })))
}
