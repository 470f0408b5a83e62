#![forbid(unsafe_code)]

use super::*;
use rusqlite::{OptionalExtension, params};

impl SqliteStore {
    /// Records a finished bulk run. Runs are synchronous, so start and finish share one write.
    pub fn bulk_op_record(
        &mut self,
        id: &str,
        kind: &str,
        total: usize,
        failed: usize,
    ) -> Result<BulkOpRow, StoreError> {
        let now_ms = now_ms();
        let total = i64::try_from(total).unwrap_or(i64::MAX);
        let failed = i64::try_from(failed).unwrap_or(i64::MAX);
        let row = BulkOpRow {
            id: id.to_string(),
            kind: kind.to_string(),
            status: (if failed == 0 {
                "completed"
            } else {
                "completed_with_errors"
            })
            .to_string(),
            total,
            processed: total,
            failed,
            created_at_ms: now_ms,
            finished_at_ms: Some(now_ms),
        };
        self.conn.execute(
            r#"
            INSERT INTO bulk_ops(id,kind,status,total,processed,failed,created_at_ms,finished_at_ms)
            VALUES (?1,?2,?3,?4,?5,?6,?7,?8)
            "#,
            params![
                row.id,
                row.kind,
                row.status,
                row.total,
                row.processed,
                row.failed,
                row.created_at_ms,
                row.finished_at_ms
            ],
        )?;
        Ok(row)
    }

    pub fn bulk_op_get(&self, id: &str) -> Result<Option<BulkOpRow>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id,kind,status,total,processed,failed,created_at_ms,finished_at_ms FROM bulk_ops WHERE id = ?1",
                [id],
                |row| {
                    Ok(BulkOpRow {
                        id: row.get(0)?,
                        kind: row.get(1)?,
                        status: row.get(2)?,
                        total: row.get(3)?,
                        processed: row.get(4)?,
                        failed: row.get(5)?,
                        created_at_ms: row.get(6)?,
                        finished_at_ms: row.get(7)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}
