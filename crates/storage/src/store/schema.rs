#![forbid(unsafe_code)]

use super::StoreError;
use rusqlite::Connection;

const SCHEMA_VERSION: i64 = 1;

const SQL: &str = r#"
        CREATE TABLE IF NOT EXISTS meta (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        -- Conversation chunks and decisions share one table; `kind` tells them apart.
        CREATE TABLE IF NOT EXISTS chunks (
          id TEXT PRIMARY KEY,
          kind TEXT NOT NULL,
          repository TEXT NOT NULL,
          session_id TEXT NOT NULL,
          branch TEXT,
          content TEXT NOT NULL,
          summary TEXT NOT NULL,
          tags_json TEXT NOT NULL,
          files_json TEXT NOT NULL,
          tools_json TEXT NOT NULL,
          decision TEXT,
          rationale TEXT,
          created_at_ms INTEGER NOT NULL,
          refreshed_at_ms INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS chunks_repo_created ON chunks(repository, created_at_ms);

        CREATE TABLE IF NOT EXISTS threads (
          id TEXT PRIMARY KEY,
          repository TEXT NOT NULL,
          title TEXT NOT NULL,
          description TEXT,
          status TEXT NOT NULL,
          chunk_ids_json TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS relationships (
          id TEXT PRIMARY KEY,
          source_id TEXT NOT NULL,
          target_id TEXT NOT NULL,
          kind TEXT NOT NULL,
          confidence REAL NOT NULL,
          note TEXT,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS relationships_source ON relationships(source_id);
        CREATE INDEX IF NOT EXISTS relationships_target ON relationships(target_id);

        CREATE TABLE IF NOT EXISTS aliases (
          repository TEXT NOT NULL,
          name TEXT NOT NULL,
          kind TEXT NOT NULL,
          target TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          PRIMARY KEY (repository, name)
        );

        CREATE TABLE IF NOT EXISTS sessions (
          id TEXT PRIMARY KEY,
          repository TEXT NOT NULL,
          title TEXT NOT NULL,
          status TEXT NOT NULL,
          summary TEXT,
          started_at_ms INTEGER NOT NULL,
          ended_at_ms INTEGER
        );

        CREATE TABLE IF NOT EXISTS todos (
          id TEXT PRIMARY KEY,
          session_id TEXT NOT NULL,
          ordinal INTEGER NOT NULL,
          content TEXT NOT NULL,
          status TEXT NOT NULL,
          priority TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS todos_session ON todos(session_id, ordinal);

        CREATE TABLE IF NOT EXISTS bulk_ops (
          id TEXT PRIMARY KEY,
          kind TEXT NOT NULL,
          status TEXT NOT NULL,
          total INTEGER NOT NULL,
          processed INTEGER NOT NULL,
          failed INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          finished_at_ms INTEGER
        );
"#;

pub(super) fn install(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO meta(key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}
