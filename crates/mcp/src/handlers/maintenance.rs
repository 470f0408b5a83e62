#![forbid(unsafe_code)]

use super::render::into_options;
use crate::dispatch::{HandlerContext, HandlerError, Options};
use crate::{MS_PER_DAY, now_ms_i64, optional_string, optional_usize, ts_ms_to_rfc3339};
use mg_storage::{ChunkQuery, ChunkRow, SqliteStore};
use serde_json::{Value, json};

const MAX_AGE_DAYS: usize = 3650;
const SCAN_LIMIT: usize = 1000;

pub(super) fn cutoff_ms(max_age_days: usize) -> i64 {
    now_ms_i64().saturating_sub(max_age_days as i64 * MS_PER_DAY)
}

pub(super) fn age_days(row: &ChunkRow, now_ms: i64) -> i64 {
    now_ms.saturating_sub(row.refreshed_at_ms).max(0) / MS_PER_DAY
}

/// Chunks not refreshed since `cutoff_ms`, oldest first.
pub(super) fn stale_chunks(
    store: &SqliteStore,
    repository: Option<String>,
    cutoff_ms: i64,
) -> Result<Vec<ChunkRow>, HandlerError> {
    let mut rows: Vec<ChunkRow> = store
        .chunks_query(&ChunkQuery {
            repository,
            limit: SCAN_LIMIT,
            ..ChunkQuery::default()
        })?
        .into_iter()
        .filter(|row| row.refreshed_at_ms < cutoff_ms)
        .collect();
    rows.sort_by_key(|row| row.refreshed_at_ms);
    Ok(rows)
}

fn stale_json(rows: &[ChunkRow]) -> Vec<Value> {
    let now_ms = now_ms_i64();
    rows.iter()
        .map(|row| {
            json!({
                "chunk_id": row.id,
                "summary": row.summary,
                "repository": row.repository,
                "refreshed_at": ts_ms_to_rfc3339(row.refreshed_at_ms),
                "age_days": age_days(row, now_ms),
            })
        })
        .collect()
}

/// `action` is `report` (default) or `delete`.
pub(super) fn decay_management(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let max_age_days = optional_usize(&options, "max_age_days", 90, MAX_AGE_DAYS)?;
    let repository = optional_string(&options, "repository")?;
    let action = optional_string(&options, "action")?.unwrap_or_else(|| "report".to_string());
    let cutoff = cutoff_ms(max_age_days);

    match action.as_str() {
        "report" => {
            let stale = stale_chunks(store, repository, cutoff)?;
            Ok(into_options(json!({
                "action": action,
                "max_age_days": max_age_days,
                "stale_count": stale.len(),
                "stale": stale_json(&stale),
            })))
        }
        "delete" => {
            let removed = store.chunks_delete_stale(repository.as_deref(), cutoff)?;
            tracing::info!(removed = removed.len(), max_age_days, "decayed chunks removed");
            Ok(into_options(json!({
                "action": action,
                "max_age_days": max_age_days,
                "deleted": removed.len(),
                "chunk_ids": removed,
            })))
        }
        other => Err(HandlerError::InvalidInput(format!(
            "action must be report or delete (got {other})"
        ))),
    }
}

/// Removes chunks older than `older_than_days` (default 90). `dry_run` only lists them.
pub(super) fn delete_expired(
    store: &mut SqliteStore,
    _ctx: &HandlerContext,
    options: Options,
) -> Result<Options, HandlerError> {
    let older_than_days = optional_usize(&options, "older_than_days", 90, MAX_AGE_DAYS)?;
    let repository = optional_string(&options, "repository")?;
    let dry_run = options.get("dry_run").and_then(Value::as_bool).unwrap_or(false);
    let cutoff = cutoff_ms(older_than_days);

    let chunk_ids: Vec<String> = if dry_run {
        stale_chunks(store, repository, cutoff)?
            .into_iter()
            .map(|row| row.id)
            .collect()
    } else {
        let removed = store.chunks_delete_stale(repository.as_deref(), cutoff)?;
        tracing::info!(removed = removed.len(), older_than_days, "expired chunks removed");
        removed
    };

    let deleted = if dry_run { 0 } else { chunk_ids.len() };
    Ok(into_options(json!({
        "dry_run": dry_run,
        "older_than_days": older_than_days,
        "deleted": deleted,
        "chunk_ids": chunk_ids,
    })))
}
