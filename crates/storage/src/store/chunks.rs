#![forbid(unsafe_code)]

use super::*;
use rusqlite::{OptionalExtension, Row, params, params_from_iter};

const CHUNK_COLUMNS: &str = "id,kind,repository,session_id,branch,content,summary,tags_json,files_json,tools_json,decision,rationale,created_at_ms,refreshed_at_ms";

fn map_chunk(row: &Row<'_>) -> rusqlite::Result<ChunkRow> {
    let kind: String = row.get(1)?;
    let tags: String = row.get(7)?;
    let files: String = row.get(8)?;
    let tools: String = row.get(9)?;
    Ok(ChunkRow {
        id: row.get(0)?,
        kind: ChunkKind::parse(&kind).unwrap_or(ChunkKind::Chunk),
        repository: row.get(2)?,
        session_id: row.get(3)?,
        branch: row.get(4)?,
        content: row.get(5)?,
        summary: row.get(6)?,
        tags: decode_list(&tags),
        files_modified: decode_list(&files),
        tools_used: decode_list(&tools),
        decision: row.get(10)?,
        rationale: row.get(11)?,
        created_at_ms: row.get(12)?,
        refreshed_at_ms: row.get(13)?,
    })
}

impl SqliteStore {
    pub fn chunk_insert(&mut self, request: NewChunk) -> Result<ChunkRow, StoreError> {
        require_non_empty(&request.id, "chunk id must not be empty")?;
        require_non_empty(&request.content, "content must not be empty")?;
        require_non_empty(&request.session_id, "session_id must not be empty")?;

        let now_ms = now_ms();
        self.conn.execute(
            &format!(
                "INSERT INTO chunks({CHUNK_COLUMNS}) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)"
            ),
            params![
                request.id,
                request.kind.as_str(),
                request.repository,
                request.session_id,
                request.branch,
                request.content,
                request.summary,
                encode_list(&request.tags)?,
                encode_list(&request.files_modified)?,
                encode_list(&request.tools_used)?,
                request.decision,
                request.rationale,
                now_ms,
                now_ms
            ],
        )?;

        Ok(ChunkRow {
            id: request.id,
            kind: request.kind,
            repository: request.repository,
            session_id: request.session_id,
            branch: request.branch,
            content: request.content,
            summary: request.summary,
            tags: request.tags,
            files_modified: request.files_modified,
            tools_used: request.tools_used,
            decision: request.decision,
            rationale: request.rationale,
            created_at_ms: now_ms,
            refreshed_at_ms: now_ms,
        })
    }

    pub fn chunk_get(&self, id: &str) -> Result<Option<ChunkRow>, StoreError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {CHUNK_COLUMNS} FROM chunks WHERE id = ?1"),
                [id],
                map_chunk,
            )
            .optional()?;
        Ok(row)
    }

    /// Newest first.
    pub fn chunks_query(&self, query: &ChunkQuery) -> Result<Vec<ChunkRow>, StoreError> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(repository) = &query.repository {
            values.push(repository.clone());
            clauses.push(format!("repository = ?{}", values.len()));
        }
        if let Some(session_id) = &query.session_id {
            values.push(session_id.clone());
            clauses.push(format!("session_id = ?{}", values.len()));
        }
        if let Some(kind) = query.kind {
            values.push(kind.as_str().to_string());
            clauses.push(format!("kind = ?{}", values.len()));
        }
        if let Some(text) = query.text.as_deref().filter(|t| !t.is_empty()) {
            values.push(text.to_lowercase());
            let n = values.len();
            clauses.push(format!(
                "(instr(lower(content), ?{n}) > 0 OR instr(lower(summary), ?{n}) > 0)"
            ));
        }
        if let Some(tag) = &query.tag {
            values.push(serde_json::to_string(tag)?);
            clauses.push(format!("instr(tags_json, ?{}) > 0", values.len()));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let sql = format!(
            "SELECT {CHUNK_COLUMNS} FROM chunks {where_sql} ORDER BY created_at_ms DESC, id ASC LIMIT {}",
            clamp_limit(query.limit)
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), map_chunk)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn chunk_update(&mut self, id: &str, patch: ChunkPatch) -> Result<ChunkRow, StoreError> {
        let Some(mut row) = self.chunk_get(id)? else {
            return Err(StoreError::UnknownId(id.to_string()));
        };
        if let Some(content) = patch.content {
            require_non_empty(&content, "content must not be empty")?;
            row.content = content;
        }
        if let Some(summary) = patch.summary {
            row.summary = summary;
        }
        if let Some(tags) = patch.tags {
            row.tags = tags;
        }
        row.refreshed_at_ms = now_ms();

        self.conn.execute(
            "UPDATE chunks SET content = ?2, summary = ?3, tags_json = ?4, refreshed_at_ms = ?5 WHERE id = ?1",
            params![
                row.id,
                row.content,
                row.summary,
                encode_list(&row.tags)?,
                row.refreshed_at_ms
            ],
        )?;
        Ok(row)
    }

    pub fn chunk_mark_refreshed(&mut self, id: &str) -> Result<ChunkRow, StoreError> {
        self.chunk_update(id, ChunkPatch::default())
    }

    /// Returns the ids that existed and were removed.
    pub fn chunks_delete(&mut self, ids: &[String]) -> Result<Vec<String>, StoreError> {
        let tx = self.conn.transaction()?;
        let mut removed = Vec::new();
        for id in ids {
            let n = tx.execute("DELETE FROM chunks WHERE id = ?1", [id])?;
            if n > 0 {
                tx.execute(
                    "DELETE FROM relationships WHERE source_id = ?1 OR target_id = ?1",
                    [id],
                )?;
                removed.push(id.clone());
            }
        }
        tx.commit()?;
        Ok(removed)
    }

    /// Removes chunks whose last refresh is older than `cutoff_ms`.
    pub fn chunks_delete_stale(
        &mut self,
        repository: Option<&str>,
        cutoff_ms: i64,
    ) -> Result<Vec<String>, StoreError> {
        let ids: Vec<String> = {
            let mut stmt = self.conn.prepare(
                "SELECT id FROM chunks WHERE refreshed_at_ms < ?1 AND (?2 IS NULL OR repository = ?2) ORDER BY id",
            )?;
            let rows = stmt.query_map(params![cutoff_ms, repository], |row| row.get(0))?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            out
        };
        self.chunks_delete(&ids)
    }

    /// Distinct repositories with their chunk counts, largest first.
    pub fn repositories(&self) -> Result<Vec<(String, i64)>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT repository, COUNT(*) FROM chunks GROUP BY repository ORDER BY COUNT(*) DESC, repository ASC",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}
