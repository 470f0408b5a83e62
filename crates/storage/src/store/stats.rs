#![forbid(unsafe_code)]

use super::*;
use rusqlite::params;

impl SqliteStore {
    pub fn repo_stats(&self, repository: Option<&str>) -> Result<RepoStats, StoreError> {
        type ChunkTotals = (i64, i64, Option<i64>, Option<i64>);
        let (chunks, decisions, oldest_ms, newest_ms): ChunkTotals = self.conn.query_row(
            "SELECT \
               COALESCE(SUM(CASE WHEN kind = 'chunk' THEN 1 ELSE 0 END), 0), \
               COALESCE(SUM(CASE WHEN kind = 'decision' THEN 1 ELSE 0 END), 0), \
               MIN(created_at_ms), MAX(created_at_ms) \
             FROM chunks WHERE (?1 IS NULL OR repository = ?1)",
            params![repository],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;
        let threads: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM threads WHERE (?1 IS NULL OR repository = ?1)",
            params![repository],
            |row| row.get(0),
        )?;
        let relationships: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM relationships r JOIN chunks c ON c.id = r.source_id \
             WHERE (?1 IS NULL OR c.repository = ?1)",
            params![repository],
            |row| row.get(0),
        )?;
        let aliases: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM aliases WHERE (?1 IS NULL OR repository = ?1)",
            params![repository],
            |row| row.get(0),
        )?;
        let sessions_active: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE status = 'active' AND (?1 IS NULL OR repository = ?1)",
            params![repository],
            |row| row.get(0),
        )?;

        Ok(RepoStats {
            chunks,
            decisions,
            threads,
            relationships,
            aliases,
            sessions_active,
            oldest_ms,
            newest_ms,
        })
    }

    /// Cheap liveness probe for the health endpoint.
    pub fn ping(&self) -> Result<(), StoreError> {
        self.conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}
