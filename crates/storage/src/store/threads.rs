#![forbid(unsafe_code)]

use super::*;
use rusqlite::{OptionalExtension, Row, params};

const THREAD_COLUMNS: &str =
    "id,repository,title,description,status,chunk_ids_json,created_at_ms,updated_at_ms";

fn map_thread(row: &Row<'_>) -> rusqlite::Result<ThreadRow> {
    let chunk_ids: String = row.get(5)?;
    Ok(ThreadRow {
        id: row.get(0)?,
        repository: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status: row.get(4)?,
        chunk_ids: decode_list(&chunk_ids),
        created_at_ms: row.get(6)?,
        updated_at_ms: row.get(7)?,
    })
}

impl SqliteStore {
    pub fn thread_create(&mut self, request: NewThread) -> Result<ThreadRow, StoreError> {
        require_non_empty(&request.title, "title must not be empty")?;
        let now_ms = now_ms();
        let row = ThreadRow {
            id: request.id,
            repository: request.repository,
            title: request.title,
            description: request.description,
            status: "active".to_string(),
            chunk_ids: request.chunk_ids,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        };
        self.conn.execute(
            &format!("INSERT INTO threads({THREAD_COLUMNS}) VALUES (?1,?2,?3,?4,?5,?6,?7,?8)"),
            params![
                row.id,
                row.repository,
                row.title,
                row.description,
                row.status,
                encode_list(&row.chunk_ids)?,
                row.created_at_ms,
                row.updated_at_ms
            ],
        )?;
        Ok(row)
    }

    pub fn thread_get(&self, id: &str) -> Result<Option<ThreadRow>, StoreError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {THREAD_COLUMNS} FROM threads WHERE id = ?1"),
                [id],
                map_thread,
            )
            .optional()?;
        Ok(row)
    }

    pub fn threads_list(
        &self,
        repository: Option<&str>,
        status: Option<&str>,
    ) -> Result<Vec<ThreadRow>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {THREAD_COLUMNS} FROM threads \
             WHERE (?1 IS NULL OR repository = ?1) AND (?2 IS NULL OR status = ?2) \
             ORDER BY updated_at_ms DESC, id ASC"
        ))?;
        let rows = stmt.query_map(params![repository, status], map_thread)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn thread_update(&mut self, id: &str, patch: ThreadPatch) -> Result<ThreadRow, StoreError> {
        let Some(mut row) = self.thread_get(id)? else {
            return Err(StoreError::UnknownId(id.to_string()));
        };
        if let Some(title) = patch.title {
            require_non_empty(&title, "title must not be empty")?;
            row.title = title;
        }
        if patch.description.is_some() {
            row.description = patch.description;
        }
        if let Some(status) = patch.status {
            row.status = status;
        }
        for chunk_id in patch.add_chunk_ids {
            if !row.chunk_ids.contains(&chunk_id) {
                row.chunk_ids.push(chunk_id);
            }
        }
        row.chunk_ids
            .retain(|chunk_id| !patch.remove_chunk_ids.contains(chunk_id));
        row.updated_at_ms = now_ms();

        self.conn.execute(
            "UPDATE threads SET title = ?2, description = ?3, status = ?4, chunk_ids_json = ?5, updated_at_ms = ?6 WHERE id = ?1",
            params![
                row.id,
                row.title,
                row.description,
                row.status,
                encode_list(&row.chunk_ids)?,
                row.updated_at_ms
            ],
        )?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_merges_chunk_ids() {
        let mut store = SqliteStore::open_in_memory().expect("store");
        store
            .thread_create(NewThread {
                id: "t1".to_string(),
                repository: "repo".to_string(),
                title: "Auth work".to_string(),
                description: None,
                chunk_ids: vec!["a".to_string(), "b".to_string()],
            })
            .expect("create");

        let updated = store
            .thread_update(
                "t1",
                ThreadPatch {
                    status: Some("complete".to_string()),
                    add_chunk_ids: vec!["b".to_string(), "c".to_string()],
                    remove_chunk_ids: vec!["a".to_string()],
                    ..ThreadPatch::default()
                },
            )
            .expect("update");
        assert_eq!(updated.chunk_ids, vec!["b".to_string(), "c".to_string()]);
        assert_eq!(updated.status, "complete");

        let listed = store
            .threads_list(Some("repo"), Some("complete"))
            .expect("list");
        assert_eq!(listed.len(), 1);
        assert!(store.threads_list(None, Some("active")).expect("list").is_empty());
    }
}
