#![forbid(unsafe_code)]

use super::render::{
    alias_json, bulk_json, chunk_json, into_options, relationship_json, thread_json,
};
use super::text::{coverage, round2, tokens};
use crate::dispatch::{HandlerContext, HandlerError, Options};
use crate::{
    GLOBAL_REPOSITORY, optional_f64, optional_string, optional_string_list, optional_usize,
    repository_or_global, require_string,
};
use mg_storage::{ChunkKind, ChunkQuery, ChunkRow, SqliteStore};
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

const CANDIDATE_LIMIT: usize = 1000;
const MAX_TRAVERSE_DEPTH: usize = 5;

/// `cross_repo` and `global` scopes widen a search to every repository.
pub(super) fn scoped_repository(
    ctx: &HandlerContext,
    options: &Options,
) -> Result<Option<String>, HandlerError> {
    if matches!(ctx.scope.as_str(), "cross_repo" | "global") {
        return Ok(None);
    }
    Ok(optional_string(options, "repository")?.filter(|r| !r.trim().is_empty()))
}

fn kind_filter(options: &Options) -> Result<Option<ChunkKind>, HandlerError> {
    match optional_string(options, "type")? {
        None => Ok(None),
        Some(raw) => ChunkKind::parse(&raw).map(Some).ok_or_else(|| {
            HandlerError::InvalidInput(format!("type must be chunk or decision (got {raw})"))
        }),
    }
}

fn searchable_tokens(row: &ChunkRow) -> BTreeSet<String> {
    let mut out = tokens(&row.content);
    out.extend(tokens(&row.summary));
    out.extend(row.tags.iter().map(|t| t.to_lowercase()));
    out
}

struct Hit {
    row: ChunkRow,
    score: f64,
    matched: Vec<String>,
}

/// Ranks candidates by the share of query terms they contain. Ties keep newest first.
fn ranked_search(
    store: &SqliteStore,
    query: &str,
    mut filter: ChunkQuery,
    limit: usize,
) -> Result<(BTreeSet<String>, Vec<Hit>), HandlerError> {
    let terms = tokens(query);
    filter.limit = CANDIDATE_LIMIT;
    let needle = query.trim().to_lowercase();

    let mut hits = Vec::new();
    for row in store.chunks_query(&filter)? {
        let haystack = searchable_tokens(&row);
        let matched: Vec<String> = terms
            .iter()
            .filter(|t| haystack.contains(*t))
            .cloned()
            .collect();
        let mut score = coverage(&terms, &haystack);
        if !needle.is_empty() && row.content.to_lowercase().contains(&needle) {
            score = score.max(1.0);
        }
        if score > 0.0 {
            hits.push(Hit {
                row,
                score: round2(score),
                matched,
            });
        }
    }
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(limit);
    Ok((terms, hits))
}

fn search_filter(ctx: &HandlerContext, options: &Options) -> Result<ChunkQuery, HandlerError> {
    Ok(ChunkQuery {
        repository: scoped_repository(ctx, options)?,
        session_id: optional_string(options, "session_id")?,
        kind: kind_filter(options)?,
        tag: optional_string(options, "tag")?,
        ..ChunkQuery::default()
    })
}

pub(super) fn search(
    store: &mut SqliteStore,
    ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let query = require_string(&options, "query")?;
    let limit = optional_usize(&options, "limit", 10, 100)?;
    let (_, hits) = ranked_search(store, &query, search_filter(ctx, &options)?, limit)?;

    let results: Vec<Value> = hits
        .iter()
        .map(|hit| {
            let mut value = chunk_json(&hit.row);
            if let Some(obj) = value.as_object_mut() {
                obj.insert("score".to_string(), json!(hit.score));
            }
            value
        })
        .collect();
    Ok(into_options(json!({
        "query": query,
        "scope": ctx.scope,
        "count": results.len(),
        "results": results,
    })))
}

pub(super) fn search_explained(
    store: &mut SqliteStore,
    ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let query = require_string(&options, "query")?;
    let limit = optional_usize(&options, "limit", 10, 100)?;
    let (terms, hits) = ranked_search(store, &query, search_filter(ctx, &options)?, limit)?;

    let results: Vec<Value> = hits
        .iter()
        .map(|hit| {
            let missing: Vec<&String> = terms
                .iter()
                .filter(|t| !hit.matched.contains(*t))
                .collect();
            let reason = if hit.matched.is_empty() {
                "phrase match"
            } else {
                "term overlap"
            };
            json!({
                "chunk_id": hit.row.id,
                "summary": hit.row.summary,
                "repository": hit.row.repository,
                "score": hit.score,
                "explanation": {
                    "matched_terms": hit.matched,
                    "missing_terms": missing,
                    "reason": reason,
                },
            })
        })
        .collect();
    Ok(into_options(json!({
        "query": query,
        "query_terms": terms,
        "count": results.len(),
        "results": results,
    })))
}

pub(super) fn search_multi_repo(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let query = require_string(&options, "query")?;
    let per_repo = optional_usize(&options, "limit", 5, 50)?;
    let mut repositories = optional_string_list(&options, "repositories")?;
    if repositories.is_empty() {
        repositories = store.repositories()?.into_iter().map(|(repo, _)| repo).collect();
    }

    let mut grouped = Options::new();
    let mut total = 0usize;
    for repository in repositories {
        let filter = ChunkQuery {
            repository: Some(repository.clone()),
            ..ChunkQuery::default()
        };
        let (_, hits) = ranked_search(store, &query, filter, per_repo)?;
        if hits.is_empty() {
            continue;
        }
        total += hits.len();
        let rows: Vec<Value> = hits
            .iter()
            .map(|hit| {
                json!({
                    "chunk_id": hit.row.id,
                    "summary": hit.row.summary,
                    "score": hit.score,
                })
            })
            .collect();
        grouped.insert(repository, Value::Array(rows));
    }

    Ok(into_options(json!({
        "query": query,
        "count": total,
        "repositories": grouped,
    })))
}

pub(super) fn get_context(
    store: &mut SqliteStore,
    ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let repository = scoped_repository(ctx, &options)?;
    let session_id = optional_string(&options, "session_id")?;
    let limit = optional_usize(&options, "limit", 20, 200)?;

    let chunks = store.chunks_query(&ChunkQuery {
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
    let threads = store.threads_list(repository.as_deref(), Some("active"))?;

    Ok(into_options(json!({
        "repository": repository,
        "session_id": session_id,
        "recent_chunks": chunks.iter().map(|row| json!({
            "chunk_id": row.id,
            "summary": row.summary,
            "tags": row.tags,
        })).collect::<Vec<_>>(),
        "decisions": decisions.iter().map(|row| json!({
            "chunk_id": row.id,
            "decision": row.decision,
            "rationale": row.rationale,
        })).collect::<Vec<_>>(),
        "active_threads": threads.iter().map(thread_json).collect::<Vec<_>>(),
    })))
}

pub(super) fn find_similar(
    store: &mut SqliteStore,
    ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let chunk_id = optional_string(&options, "chunk_id")?;
    let (anchor_id, text) = match (&chunk_id, optional_string(&options, "content")?) {
        (Some(id), _) => match store.chunk_get(id)? {
            Some(row) => (Some(row.id), format!("{}\n{}", row.summary, row.content)),
            None => return Err(HandlerError::NotFound(format!("chunk {id}"))),
        },
        (None, Some(content)) => (None, content),
        (None, None) => {
            return Err(HandlerError::InvalidInput(
                "chunk_id or content is required".to_string(),
            ));
        }
    };
    let limit = optional_usize(&options, "limit", 5, 50)?;
    let threshold = optional_f64(&options, "min_similarity")?.unwrap_or(0.2);

    let reference = tokens(&text);
    let mut similar: Vec<(f64, ChunkRow)> = Vec::new();
    for row in store.chunks_query(&ChunkQuery {
        repository: scoped_repository(ctx, &options)?,
        limit: CANDIDATE_LIMIT,
        ..ChunkQuery::default()
    })? {
        if anchor_id.as_deref() == Some(row.id.as_str()) {
            continue;
        }
        let candidate = searchable_tokens(&row);
        let union = reference.union(&candidate).count();
        if union == 0 {
            continue;
        }
        let score = reference.intersection(&candidate).count() as f64 / union as f64;
        if score >= threshold {
            similar.push((round2(score), row));
        }
    }
    similar.sort_by(|a, b| b.0.total_cmp(&a.0));
    similar.truncate(limit);

    Ok(into_options(json!({
        "chunk_id": anchor_id,
        "count": similar.len(),
        "similar": similar.iter().map(|(score, row)| json!({
            "chunk_id": row.id,
            "summary": row.summary,
            "repository": row.repository,
            "similarity": score,
        })).collect::<Vec<_>>(),
    })))
}

/// Frequency table, most common first, ties broken alphabetically.
pub(super) fn top_counts<'a>(
    items: impl Iterator<Item = &'a String>,
    limit: usize,
) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for item in items {
        *counts.entry(item.as_str()).or_default() += 1;
    }
    let mut out: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out.truncate(limit);
    out
}

fn counts_json(counts: &[(String, usize)], label: &str) -> Vec<Value> {
    counts
        .iter()
        .map(|(name, count)| json!({ label: name, "count": count }))
        .collect()
}

pub(super) fn get_patterns(
    store: &mut SqliteStore,
    ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let repository = scoped_repository(ctx, &options)?;
    let limit = optional_usize(&options, "limit", 10, 100)?;
    let rows = store.chunks_query(&ChunkQuery {
        repository: repository.clone(),
        limit: CANDIDATE_LIMIT,
        ..ChunkQuery::default()
    })?;

    let tags = top_counts(rows.iter().flat_map(|r| r.tags.iter()), limit);
    let tools = top_counts(rows.iter().flat_map(|r| r.tools_used.iter()), limit);
    let files = top_counts(rows.iter().flat_map(|r| r.files_modified.iter()), limit);

    Ok(into_options(json!({
        "repository": repository,
        "chunks_analyzed": rows.len(),
        "decisions": rows.iter().filter(|r| r.kind == ChunkKind::Decision).count(),
        "top_tags": counts_json(&tags, "tag"),
        "top_tools": counts_json(&tools, "tool"),
        "top_files": counts_json(&files, "file"),
    })))
}

pub(super) fn get_relationships(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let chunk_id = require_string(&options, "chunk_id")?;
    if store.chunk_get(&chunk_id)?.is_none() {
        return Err(HandlerError::NotFound(format!("chunk {chunk_id}")));
    }
    let kind = optional_string(&options, "relation_type")?;
    let rows = store.relationships_for(&chunk_id, kind.as_deref())?;
    Ok(into_options(json!({
        "chunk_id": chunk_id,
        "count": rows.len(),
        "relationships": rows.iter().map(relationship_json).collect::<Vec<_>>(),
    })))
}

/// Breadth-first walk over relationships in both directions.
pub(super) fn traverse_graph(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let start = require_string(&options, "start_chunk_id")?;
    let max_depth = optional_usize(&options, "max_depth", 2, MAX_TRAVERSE_DEPTH)?;
    let kind = optional_string(&options, "relation_type")?;
    let Some(root) = store.chunk_get(&start)? else {
        return Err(HandlerError::NotFound(format!("chunk {start}")));
    };

    let mut seen: BTreeSet<String> = BTreeSet::from([root.id.clone()]);
    let mut edge_ids: BTreeSet<String> = BTreeSet::new();
    let mut nodes = vec![json!({ "chunk_id": root.id, "depth": 0, "summary": root.summary })];
    let mut edges = Vec::new();
    let mut queue = VecDeque::from([(root.id, 0usize)]);

    while let Some((chunk_id, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        for rel in store.relationships_for(&chunk_id, kind.as_deref())? {
            if edge_ids.insert(rel.id.clone()) {
                edges.push(relationship_json(&rel));
            }
            let next = if rel.source_id == chunk_id {
                rel.target_id
            } else {
                rel.source_id
            };
            if !seen.insert(next.clone()) {
                continue;
            }
            if let Some(row) = store.chunk_get(&next)? {
                nodes.push(json!({
                    "chunk_id": row.id,
                    "depth": depth + 1,
                    "summary": row.summary,
                }));
                queue.push_back((next, depth + 1));
            }
        }
    }

    Ok(into_options(json!({
        "start_chunk_id": start,
        "max_depth": max_depth,
        "nodes": nodes,
        "edges": edges,
    })))
}

pub(super) fn get_threads(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let repository = optional_string(&options, "repository")?;
    let status = optional_string(&options, "status")?;
    let rows = store.threads_list(repository.as_deref(), status.as_deref())?;
    Ok(into_options(json!({
        "count": rows.len(),
        "threads": rows.iter().map(thread_json).collect::<Vec<_>>(),
    })))
}

/// Falls back to the global repository when the named one has no such alias.
pub(super) fn resolve_alias(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let name = require_string(&options, "name")?;
    let repository = repository_or_global(&options)?;
    let mut found = store.alias_resolve(&repository, &name)?;
    if found.is_none() && repository != GLOBAL_REPOSITORY {
        found = store.alias_resolve(GLOBAL_REPOSITORY, &name)?;
    }
    let Some(row) = found else {
        return Err(HandlerError::NotFound(format!("alias {name}")));
    };
    let mut out = into_options(alias_json(&row));
    out.insert("resolved".to_string(), json!(row.target));
    Ok(out)
}

pub(super) fn list_aliases(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let repository = optional_string(&options, "repository")?;
    let kind = optional_string(&options, "type")?;
    let prefix = optional_string(&options, "prefix")?;
    let rows = store.aliases_list(repository.as_deref(), kind.as_deref(), prefix.as_deref())?;
    Ok(into_options(json!({
        "count": rows.len(),
        "aliases": rows.iter().map(alias_json).collect::<Vec<_>>(),
    })))
}

pub(super) fn get_bulk_progress(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let id = require_string(&options, "operation_id")?;
    match store.bulk_op_get(&id)? {
        Some(row) => Ok(into_options(bulk_json(&row))),
        None => Err(HandlerError::NotFound(format!("bulk operation {id}"))),
    }
}
