#![forbid(unsafe_code)]

use super::maintenance::{age_days, cutoff_ms, stale_chunks};
use super::read::{scoped_repository, top_counts};
use super::render::{into_options, thread_json};
use super::text::{jaccard, round2, tokens};
use crate::dispatch::{HandlerContext, HandlerError, Options};
use crate::{new_id, now_ms_i64, optional_string, optional_usize, require_string};
use mg_storage::{ChunkKind, ChunkQuery, ChunkRow, NewThread, SqliteStore};
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet};

const SCAN_LIMIT: usize = 1000;
const CONFLICT_LIMIT: usize = 50;

fn all_chunks(
    store: &SqliteStore,
    repository: Option<String>,
) -> Result<Vec<ChunkRow>, HandlerError> {
    Ok(store.chunks_query(&ChunkQuery {
        repository,
        limit: SCAN_LIMIT,
        ..ChunkQuery::default()
    })?)
}

/// Tag vocabulary per repository.
fn tags_by_repository(rows: &[ChunkRow]) -> BTreeMap<String, BTreeSet<String>> {
    let mut out: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for row in rows {
        out.entry(row.repository.clone())
            .or_default()
            .extend(row.tags.iter().cloned());
    }
    out
}

pub(super) fn cross_repo_patterns(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let min_repositories = optional_usize(&options, "min_repositories", 2, 1000)?.max(1);
    let rows = all_chunks(store, None)?;
    let by_repo = tags_by_repository(&rows);

    let mut repos_per_tag: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (repository, tags) in &by_repo {
        for tag in tags {
            repos_per_tag
                .entry(tag.as_str())
                .or_default()
                .push(repository.as_str());
        }
    }
    let occurrences = top_counts(rows.iter().flat_map(|r| r.tags.iter()), usize::MAX);
    let occurrences: BTreeMap<String, usize> = occurrences.into_iter().collect();

    let mut patterns: Vec<Value> = repos_per_tag
        .into_iter()
        .filter(|(_, repos)| repos.len() >= min_repositories)
        .map(|(tag, repos)| {
            json!({
                "pattern": tag,
                "repositories": repos,
                "occurrences": occurrences.get(tag).copied().unwrap_or(0),
            })
        })
        .collect();
    patterns.sort_by_key(|p| std::cmp::Reverse(p["repositories"].as_array().map_or(0, Vec::len)));

    Ok(into_options(json!({
        "repositories_analyzed": by_repo.len(),
        "count": patterns.len(),
        "patterns": patterns,
    })))
}

pub(super) fn find_similar_repositories(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let repository = require_string(&options, "repository")?;
    let limit = optional_usize(&options, "limit", 5, 50)?;
    let by_repo = tags_by_repository(&all_chunks(store, None)?);
    let Some(reference) = by_repo.get(&repository) else {
        return Err(HandlerError::NotFound(format!("repository {repository}")));
    };
    let reference: Vec<String> = reference.iter().cloned().collect();

    let mut similar: Vec<(f64, &String, Vec<&String>)> = by_repo
        .iter()
        .filter(|(name, _)| **name != repository)
        .map(|(name, tags)| {
            let tags_vec: Vec<String> = tags.iter().cloned().collect();
            let shared: Vec<&String> = tags.iter().filter(|t| reference.contains(*t)).collect();
            (round2(jaccard(&reference, &tags_vec)), name, shared)
        })
        .filter(|(score, _, _)| *score > 0.0)
        .collect();
    similar.sort_by(|a, b| b.0.total_cmp(&a.0));
    similar.truncate(limit);

    Ok(into_options(json!({
        "repository": repository,
        "similar": similar.iter().map(|(score, name, shared)| json!({
            "repository": name,
            "similarity": score,
            "shared_tags": shared,
        })).collect::<Vec<_>>(),
    })))
}

pub(super) fn cross_repo_insights(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    _options: Options,
) -> Result<Options, HandlerError> {
    let rows = all_chunks(store, None)?;
    let mut per_repo: BTreeMap<&str, Vec<&ChunkRow>> = BTreeMap::new();
    for row in &rows {
        per_repo.entry(row.repository.as_str()).or_default().push(row);
    }

    let insights: Vec<Value> = per_repo
        .iter()
        .map(|(repository, rows)| {
            let decisions = rows.iter().filter(|r| r.kind == ChunkKind::Decision).count();
            let tags = top_counts(rows.iter().flat_map(|r| r.tags.iter()), 3);
            json!({
                "repository": repository,
                "chunks": rows.len(),
                "decisions": decisions,
                "top_tags": tags.iter().map(|(tag, _)| tag).collect::<Vec<_>>(),
            })
        })
        .collect();

    Ok(into_options(json!({
        "total_chunks": rows.len(),
        "repositories": insights,
    })))
}

/// Decisions on the same topic (shared non-generic tag) that say different things,
/// plus explicit `contradicts` links.
pub(super) fn detect_conflicts(
    store: &mut SqliteStore,
    ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let decisions = store.chunks_query(&ChunkQuery {
        repository: scoped_repository(ctx, &options)?,
        kind: Some(ChunkKind::Decision),
        limit: SCAN_LIMIT,
        ..ChunkQuery::default()
    })?;

    let mut conflicts = Vec::new();
    let mut linked: BTreeSet<(String, String)> = BTreeSet::new();
    for row in &decisions {
        for rel in store.relationships_for(&row.id, Some("contradicts"))? {
            if linked.insert((rel.source_id.clone(), rel.target_id.clone())) {
                conflicts.push(json!({
                    "chunk_ids": [rel.source_id, rel.target_id],
                    "reason": "explicit contradicts relationship",
                }));
            }
        }
    }

    'outer: for (i, a) in decisions.iter().enumerate() {
        for b in &decisions[i + 1..] {
            if conflicts.len() >= CONFLICT_LIMIT {
                break 'outer;
            }
            let shared: Vec<&String> = a
                .tags
                .iter()
                .filter(|t| t.as_str() != "decision" && b.tags.contains(*t))
                .collect();
            if shared.is_empty() || a.decision == b.decision {
                continue;
            }
            if linked.contains(&(a.id.clone(), b.id.clone()))
                || linked.contains(&(b.id.clone(), a.id.clone()))
            {
                continue;
            }
            conflicts.push(json!({
                "chunk_ids": [a.id, b.id],
                "decisions": [a.decision, b.decision],
                "shared_tags": shared,
                "reason": "different decisions on a shared topic",
            }));
        }
    }

    Ok(into_options(json!({
        "decisions_checked": decisions.len(),
        "count": conflicts.len(),
        "conflicts": conflicts,
    })))
}

pub(super) fn health_dashboard(
    store: &mut SqliteStore,
    ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let repository = scoped_repository(ctx, &options)?;
    let stats = store.repo_stats(repository.as_deref())?;
    let stale = stale_chunks(store, repository.clone(), cutoff_ms(90))?.len() as i64;
    let todos = store.todo_stats(None)?;

    let total = stats.chunks + stats.decisions;
    let freshness = if total == 0 {
        1.0
    } else {
        (total - stale).max(0) as f64 / total as f64
    };
    let connectivity = if total == 0 {
        0.0
    } else {
        (stats.relationships as f64 / total as f64).min(1.0)
    };
    let score = round2((freshness * 0.7 + connectivity * 0.3) * 100.0);

    Ok(into_options(json!({
        "repository": repository,
        "health_score": score,
        "memory": {
            "chunks": stats.chunks,
            "decisions": stats.decisions,
            "threads": stats.threads,
            "relationships": stats.relationships,
            "aliases": stats.aliases,
            "active_sessions": stats.sessions_active,
        },
        "freshness": {
            "stale": stale,
            "fresh": total - stale,
            "ratio": round2(freshness),
        },
        "todos": {
            "total": todos.total,
            "pending": todos.pending,
            "in_progress": todos.in_progress,
            "completed": todos.completed,
        },
    })))
}

pub(super) fn check_freshness(
    store: &mut SqliteStore,
    ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let max_age_days = optional_usize(&options, "max_age_days", 30, 3650)?;
    let repository = scoped_repository(ctx, &options)?;
    let checked = all_chunks(store, repository.clone())?.len();
    let stale = stale_chunks(store, repository, cutoff_ms(max_age_days))?;
    let now_ms = now_ms_i64();

    Ok(into_options(json!({
        "max_age_days": max_age_days,
        "checked": checked,
        "fresh_count": checked.saturating_sub(stale.len()),
        "stale_count": stale.len(),
        "stale": stale.iter().map(|row| json!({
            "chunk_id": row.id,
            "summary": row.summary,
            "age_days": age_days(row, now_ms),
        })).collect::<Vec<_>>(),
    })))
}

/// Groups chunks outside any thread by session. `create = true` persists the suggestions.
pub(super) fn detect_threads(
    store: &mut SqliteStore,
    ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let repository = scoped_repository(ctx, &options)?;
    let min_chunks = optional_usize(&options, "min_chunks", 2, 1000)?.max(2);
    let create = options.get("create").and_then(Value::as_bool).unwrap_or(false);

    let threaded: BTreeSet<String> = store
        .threads_list(repository.as_deref(), None)?
        .into_iter()
        .flat_map(|thread| thread.chunk_ids)
        .collect();

    let mut by_session: BTreeMap<String, Vec<ChunkRow>> = BTreeMap::new();
    for row in all_chunks(store, repository)? {
        if !threaded.contains(&row.id) {
            by_session.entry(row.session_id.clone()).or_default().push(row);
        }
    }

    let mut suggestions = Vec::new();
    let mut created = Vec::new();
    for (session_id, rows) in by_session {
        if rows.len() < min_chunks {
            continue;
        }
        let name = top_counts(rows.iter().flat_map(|r| r.tags.iter()), 1)
            .into_iter()
            .next()
            .map(|(tag, _)| format!("{tag} ({session_id})"))
            .unwrap_or_else(|| format!("session {session_id}"));
        let chunk_ids: Vec<String> = rows.iter().rev().map(|r| r.id.clone()).collect();

        if create {
            let row = store.thread_create(NewThread {
                id: new_id("thread", &[&session_id]),
                repository: rows[0].repository.clone(),
                title: name.clone(),
                description: Some("detected from session activity".to_string()),
                chunk_ids: chunk_ids.clone(),
            })?;
            created.push(thread_json(&row));
        }
        suggestions.push(json!({
            "session_id": session_id,
            "suggested_name": name,
            "chunk_ids": chunk_ids,
        }));
    }

    Ok(into_options(json!({
        "count": suggestions.len(),
        "suggestions": suggestions,
        "created": created,
    })))
}

/// Neighbours through existing links first, then by content overlap.
pub(super) fn suggest_related(
    store: &mut SqliteStore,
    ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let chunk_id = require_string(&options, "chunk_id")?;
    let limit = optional_usize(&options, "limit", 5, 50)?;
    let Some(anchor) = store.chunk_get(&chunk_id)? else {
        return Err(HandlerError::NotFound(format!("chunk {chunk_id}")));
    };

    let mut seen: BTreeSet<String> = BTreeSet::from([anchor.id.clone()]);
    let mut suggestions = Vec::new();

    for rel in store.relationships_for(&anchor.id, None)? {
        let other = if rel.source_id == anchor.id {
            rel.target_id
        } else {
            rel.source_id
        };
        for second in store.relationships_for(&other, None)? {
            let candidate = if second.source_id == other {
                second.target_id
            } else {
                second.source_id
            };
            if !seen.insert(candidate.clone()) {
                continue;
            }
            if let Some(row) = store.chunk_get(&candidate)? {
                suggestions.push((
                    round2(rel.confidence * second.confidence),
                    row,
                    format!("linked through {other}"),
                ));
            }
        }
        seen.insert(other);
    }

    let reference = tokens(&anchor.content);
    let repository = match optional_string(&options, "repository")? {
        Some(repository) => Some(repository),
        None if ctx.scope == "cross_repo" => None,
        None => Some(anchor.repository.clone()),
    };
    for row in all_chunks(store, repository)? {
        if seen.contains(&row.id) {
            continue;
        }
        let candidate = tokens(&row.content);
        let union = reference.union(&candidate).count();
        if union == 0 {
            continue;
        }
        let overlap = reference.intersection(&candidate).count() as f64 / union as f64;
        let tag_score = jaccard(&anchor.tags, &row.tags);
        let score = round2(overlap.max(tag_score));
        if score > 0.0 {
            seen.insert(row.id.clone());
            suggestions.push((score, row, "similar content or tags".to_string()));
        }
    }

    suggestions.sort_by(|a, b| b.0.total_cmp(&a.0));
    suggestions.truncate(limit);

    Ok(into_options(json!({
        "chunk_id": chunk_id,
        "suggestions": suggestions.iter().map(|(score, row, reason)| json!({
            "chunk_id": row.id,
            "summary": row.summary,
            "score": score,
            "reason": reason,
        })).collect::<Vec<_>>(),
    })))
}
