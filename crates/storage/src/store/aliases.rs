#![forbid(unsafe_code)]

use super::*;
use rusqlite::{OptionalExtension, Row, params};

fn map_alias(row: &Row<'_>) -> rusqlite::Result<AliasRow> {
    Ok(AliasRow {
        repository: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
        target: row.get(3)?,
        created_at_ms: row.get(4)?,
    })
}

impl SqliteStore {
    /// Upsert: re-creating an alias rebinds it.
    pub fn alias_create(&mut self, request: NewAlias) -> Result<AliasRow, StoreError> {
        require_non_empty(&request.name, "alias name must not be empty")?;
        require_non_empty(&request.target, "alias target must not be empty")?;
        let now_ms = now_ms();
        self.conn.execute(
            r#"
            INSERT INTO aliases(repository,name,kind,target,created_at_ms)
            VALUES (?1,?2,?3,?4,?5)
            ON CONFLICT(repository,name) DO UPDATE SET kind = excluded.kind, target = excluded.target
            "#,
            params![
                request.repository,
                request.name,
                request.kind,
                request.target,
                now_ms
            ],
        )?;
        self.alias_resolve(&request.repository, &request.name)?
            .ok_or(StoreError::UnknownId(request.name))
    }

    pub fn alias_resolve(
        &self,
        repository: &str,
        name: &str,
    ) -> Result<Option<AliasRow>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT repository,name,kind,target,created_at_ms FROM aliases WHERE repository = ?1 AND name = ?2",
                params![repository, name],
                map_alias,
            )
            .optional()?;
        Ok(row)
    }

    pub fn aliases_list(
        &self,
        repository: Option<&str>,
        kind: Option<&str>,
        prefix: Option<&str>,
    ) -> Result<Vec<AliasRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT repository,name,kind,target,created_at_ms FROM aliases \
             WHERE (?1 IS NULL OR repository = ?1) AND (?2 IS NULL OR kind = ?2) \
             AND (?3 IS NULL OR substr(name, 1, length(?3)) = ?3) \
             ORDER BY repository ASC, name ASC",
        )?;
        let rows = stmt.query_map(params![repository, kind, prefix], map_alias)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alias(name: &str, kind: &str, target: &str) -> NewAlias {
        NewAlias {
            repository: "repo".to_string(),
            name: name.to_string(),
            kind: kind.to_string(),
            target: target.to_string(),
        }
    }

    #[test]
    fn create_rebinds_existing_alias() {
        let mut store = SqliteStore::open_in_memory().expect("store");
        store.alias_create(alias("auth", "tag", "c1")).expect("first");
        let rebound = store.alias_create(alias("auth", "tag", "c2")).expect("second");
        assert_eq!(rebound.target, "c2");
        assert_eq!(store.aliases_list(None, None, None).expect("list").len(), 1);
    }

    #[test]
    fn list_filters_by_prefix_and_kind() {
        let mut store = SqliteStore::open_in_memory().expect("store");
        store.alias_create(alias("auth-login", "tag", "c1")).expect("a");
        store.alias_create(alias("auth-logout", "query", "c2")).expect("b");
        store.alias_create(alias("cache", "tag", "c3")).expect("c");

        let names: Vec<String> = store
            .aliases_list(Some("repo"), None, Some("auth"))
            .expect("prefix")
            .into_iter()
            .map(|row| row.name)
            .collect();
        assert_eq!(names, vec!["auth-login".to_string(), "auth-logout".to_string()]);
        assert_eq!(
            store.aliases_list(None, Some("tag"), None).expect("kind").len(),
            2
        );
        assert!(store.alias_resolve("repo", "missing").expect("resolve").is_none());
    }
}
