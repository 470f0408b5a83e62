#![forbid(unsafe_code)]

use super::*;
use rusqlite::{OptionalExtension, Row, params};

const TODO_COLUMNS: &str =
    "id,session_id,ordinal,content,status,priority,created_at_ms,updated_at_ms";

fn map_todo(row: &Row<'_>) -> rusqlite::Result<TodoRow> {
    let status: String = row.get(4)?;
    Ok(TodoRow {
        id: row.get(0)?,
        session_id: row.get(1)?,
        ordinal: row.get(2)?,
        content: row.get(3)?,
        status: TodoStatus::parse(&status).unwrap_or(TodoStatus::Pending),
        priority: row.get(5)?,
        created_at_ms: row.get(6)?,
        updated_at_ms: row.get(7)?,
    })
}

impl SqliteStore {
    /// Replaces the whole todo list of a session.
    pub fn todos_write(
        &mut self,
        session_id: &str,
        items: Vec<NewTodo>,
    ) -> Result<Vec<TodoRow>, StoreError> {
        require_non_empty(session_id, "session_id must not be empty")?;
        for item in &items {
            require_non_empty(&item.content, "todo content must not be empty")?;
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM todos WHERE session_id = ?1", [session_id])?;
        for (ordinal, item) in items.iter().enumerate() {
            tx.execute(
                &format!("INSERT INTO todos({TODO_COLUMNS}) VALUES (?1,?2,?3,?4,?5,?6,?7,?8)"),
                params![
                    item.id,
                    session_id,
                    i64::try_from(ordinal).unwrap_or(i64::MAX),
                    item.content,
                    item.status.as_str(),
                    item.priority,
                    now_ms,
                    now_ms
                ],
            )?;
        }
        tx.commit()?;
        self.todos_read(Some(session_id))
    }

    pub fn todos_read(&self, session_id: Option<&str>) -> Result<Vec<TodoRow>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TODO_COLUMNS} FROM todos WHERE (?1 IS NULL OR session_id = ?1) \
             ORDER BY session_id ASC, ordinal ASC"
        ))?;
        let rows = stmt.query_map(params![session_id], map_todo)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn todo_update(
        &mut self,
        id: &str,
        status: Option<TodoStatus>,
        content: Option<String>,
    ) -> Result<TodoRow, StoreError> {
        let Some(mut row) = self
            .conn
            .query_row(
                &format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?1"),
                [id],
                map_todo,
            )
            .optional()?
        else {
            return Err(StoreError::UnknownId(id.to_string()));
        };
        if let Some(status) = status {
            row.status = status;
        }
        if let Some(content) = content {
            require_non_empty(&content, "todo content must not be empty")?;
            row.content = content;
        }
        row.updated_at_ms = now_ms();
        self.conn.execute(
            "UPDATE todos SET status = ?2, content = ?3, updated_at_ms = ?4 WHERE id = ?1",
            params![row.id, row.status.as_str(), row.content, row.updated_at_ms],
        )?;
        Ok(row)
    }

    pub fn todo_stats(&self, session_id: Option<&str>) -> Result<TodoStats, StoreError> {
        let mut stats = TodoStats::default();
        for row in self.todos_read(session_id)? {
            stats.total += 1;
            match row.status {
                TodoStatus::Pending => stats.pending += 1,
                TodoStatus::InProgress => stats.in_progress += 1,
                TodoStatus::Completed => stats.completed += 1,
            }
        }
        Ok(stats)
    }
}
