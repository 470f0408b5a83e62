#![forbid(unsafe_code)]

use super::*;
use rusqlite::{OptionalExtension, Row, params};

const RELATIONSHIP_COLUMNS: &str =
    "id,source_id,target_id,kind,confidence,note,created_at_ms,updated_at_ms";

fn map_relationship(row: &Row<'_>) -> rusqlite::Result<RelationshipRow> {
    Ok(RelationshipRow {
        id: row.get(0)?,
        source_id: row.get(1)?,
        target_id: row.get(2)?,
        kind: row.get(3)?,
        confidence: row.get(4)?,
        note: row.get(5)?,
        created_at_ms: row.get(6)?,
        updated_at_ms: row.get(7)?,
    })
}

fn check_confidence(confidence: f64) -> Result<(), StoreError> {
    if !(0.0..=1.0).contains(&confidence) {
        return Err(StoreError::InvalidInput("confidence must be within 0..=1"));
    }
    Ok(())
}

impl SqliteStore {
    pub fn relationship_create(
        &mut self,
        request: NewRelationship,
    ) -> Result<RelationshipRow, StoreError> {
        require_non_empty(&request.source_id, "source_chunk_id must not be empty")?;
        require_non_empty(&request.target_id, "target_chunk_id must not be empty")?;
        require_non_empty(&request.kind, "relation_type must not be empty")?;
        check_confidence(request.confidence)?;
        if request.source_id == request.target_id {
            return Err(StoreError::InvalidInput("a chunk cannot relate to itself"));
        }
        for id in [&request.source_id, &request.target_id] {
            if self.chunk_get(id)?.is_none() {
                return Err(StoreError::UnknownId(id.clone()));
            }
        }

        let now_ms = now_ms();
        let row = RelationshipRow {
            id: request.id,
            source_id: request.source_id,
            target_id: request.target_id,
            kind: request.kind,
            confidence: request.confidence,
            note: request.note,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        };
        self.conn.execute(
            &format!(
                "INSERT INTO relationships({RELATIONSHIP_COLUMNS}) VALUES (?1,?2,?3,?4,?5,?6,?7,?8)"
            ),
            params![
                row.id,
                row.source_id,
                row.target_id,
                row.kind,
                row.confidence,
                row.note,
                row.created_at_ms,
                row.updated_at_ms
            ],
        )?;
        Ok(row)
    }

    pub fn relationship_get(&self, id: &str) -> Result<Option<RelationshipRow>, StoreError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {RELATIONSHIP_COLUMNS} FROM relationships WHERE id = ?1"),
                [id],
                map_relationship,
            )
            .optional()?;
        Ok(row)
    }

    /// Edges touching `chunk_id` in either direction.
    pub fn relationships_for(
        &self,
        chunk_id: &str,
        kind: Option<&str>,
    ) -> Result<Vec<RelationshipRow>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RELATIONSHIP_COLUMNS} FROM relationships \
             WHERE (source_id = ?1 OR target_id = ?1) AND (?2 IS NULL OR kind = ?2) \
             ORDER BY confidence DESC, id ASC"
        ))?;
        let rows = stmt.query_map(params![chunk_id, kind], map_relationship)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn relationship_update(
        &mut self,
        id: &str,
        patch: RelationshipPatch,
    ) -> Result<RelationshipRow, StoreError> {
        let Some(mut row) = self.relationship_get(id)? else {
            return Err(StoreError::UnknownId(id.to_string()));
        };
        if let Some(kind) = patch.kind {
            require_non_empty(&kind, "relation_type must not be empty")?;
            row.kind = kind;
        }
        if let Some(confidence) = patch.confidence {
            check_confidence(confidence)?;
            row.confidence = confidence;
        }
        if patch.note.is_some() {
            row.note = patch.note;
        }
        row.updated_at_ms = now_ms();

        self.conn.execute(
            "UPDATE relationships SET kind = ?2, confidence = ?3, note = ?4, updated_at_ms = ?5 WHERE id = ?1",
            params![row.id, row.kind, row.confidence, row.note, row.updated_at_ms],
        )?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(store: &mut SqliteStore, id: &str) {
        store
            .chunk_insert(NewChunk {
                id: id.to_string(),
                kind: ChunkKind::Chunk,
                repository: "repo".to_string(),
                session_id: "s".to_string(),
                branch: None,
                content: format!("content {id}"),
                summary: id.to_string(),
                tags: Vec::new(),
                files_modified: Vec::new(),
                tools_used: Vec::new(),
                decision: None,
                rationale: None,
            })
            .expect("seed chunk");
    }

    fn link(id: &str, source: &str, target: &str, confidence: f64) -> NewRelationship {
        NewRelationship {
            id: id.to_string(),
            source_id: source.to_string(),
            target_id: target.to_string(),
            kind: "led_to".to_string(),
            confidence,
            note: None,
        }
    }

    #[test]
    fn relationships_are_found_from_both_ends() {
        let mut store = SqliteStore::open_in_memory().expect("store");
        seed(&mut store, "a");
        seed(&mut store, "b");
        store.relationship_create(link("r1", "a", "b", 0.9)).expect("link");

        assert_eq!(store.relationships_for("a", None).expect("a").len(), 1);
        assert_eq!(store.relationships_for("b", None).expect("b").len(), 1);
        assert!(
            store
                .relationships_for("b", Some("solved_by"))
                .expect("filtered")
                .is_empty()
        );
    }

    #[test]
    fn dangling_and_invalid_links_are_rejected() {
        let mut store = SqliteStore::open_in_memory().expect("store");
        seed(&mut store, "a");
        assert!(matches!(
            store.relationship_create(link("r1", "a", "zzz", 0.5)),
            Err(StoreError::UnknownId(id)) if id == "zzz"
        ));
        assert!(matches!(
            store.relationship_create(link("r2", "a", "a", 0.5)),
            Err(StoreError::InvalidInput(_))
        ));
        seed(&mut store, "b");
        assert!(matches!(
            store.relationship_create(link("r3", "a", "b", 1.5)),
            Err(StoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn deleting_a_chunk_drops_its_edges() {
        let mut store = SqliteStore::open_in_memory().expect("store");
        seed(&mut store, "a");
        seed(&mut store, "b");
        store.relationship_create(link("r1", "a", "b", 0.9)).expect("link");
        store.chunks_delete(&["a".to_string()]).expect("delete");
        assert!(store.relationship_get("r1").expect("get").is_none());
    }
}
