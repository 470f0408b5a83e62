#![forbid(unsafe_code)]

use super::*;
use rusqlite::{OptionalExtension, Row, params};

const SESSION_COLUMNS: &str = "id,repository,title,status,summary,started_at_ms,ended_at_ms";

fn map_session(row: &Row<'_>) -> rusqlite::Result<SessionRow> {
    Ok(SessionRow {
        id: row.get(0)?,
        repository: row.get(1)?,
        title: row.get(2)?,
        status: row.get(3)?,
        summary: row.get(4)?,
        started_at_ms: row.get(5)?,
        ended_at_ms: row.get(6)?,
    })
}

impl SqliteStore {
    pub fn session_create(&mut self, request: NewSession) -> Result<SessionRow, StoreError> {
        require_non_empty(&request.id, "session id must not be empty")?;
        if self.session_get(&request.id)?.is_some() {
            return Err(StoreError::InvalidInput("session already exists"));
        }
        let row = SessionRow {
            id: request.id,
            repository: request.repository,
            title: request.title,
            status: "active".to_string(),
            summary: None,
            started_at_ms: now_ms(),
            ended_at_ms: None,
        };
        self.conn.execute(
            &format!("INSERT INTO sessions({SESSION_COLUMNS}) VALUES (?1,?2,?3,?4,?5,?6,?7)"),
            params![
                row.id,
                row.repository,
                row.title,
                row.status,
                row.summary,
                row.started_at_ms,
                row.ended_at_ms
            ],
        )?;
        Ok(row)
    }

    pub fn session_get(&self, id: &str) -> Result<Option<SessionRow>, StoreError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
                [id],
                map_session,
            )
            .optional()?;
        Ok(row)
    }

    pub fn session_end(
        &mut self,
        id: &str,
        summary: Option<String>,
    ) -> Result<SessionRow, StoreError> {
        let Some(mut row) = self.session_get(id)? else {
            return Err(StoreError::UnknownId(id.to_string()));
        };
        if row.status == "ended" {
            return Err(StoreError::InvalidInput("session already ended"));
        }
        row.status = "ended".to_string();
        row.summary = summary;
        row.ended_at_ms = Some(now_ms());
        self.conn.execute(
            "UPDATE sessions SET status = ?2, summary = ?3, ended_at_ms = ?4 WHERE id = ?1",
            params![row.id, row.status, row.summary, row.ended_at_ms],
        )?;
        Ok(row)
    }

    pub fn sessions_list(
        &self,
        repository: Option<&str>,
        status: Option<&str>,
    ) -> Result<Vec<SessionRow>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions \
             WHERE (?1 IS NULL OR repository = ?1) AND (?2 IS NULL OR status = ?2) \
             ORDER BY started_at_ms DESC, id ASC"
        ))?;
        let rows = stmt.query_map(params![repository, status], map_session)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}
