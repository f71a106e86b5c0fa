// ==========================================
// 发酵批次风险排序系统 - 归档历史数据仓储
// ==========================================
// 红线: 归档记录只读，只允许整体清空
// ==========================================

use crate::domain::batch::HistoryRecord;
use crate::repository::batch_repo::millis_to_utc;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

// ==========================================
// HistoryRepository - 归档历史仓储
// ==========================================
/// 归档历史仓储
/// 职责: 查询/清空 batch_history 表（写入由 BatchRepository::confirm 在事务内完成）
pub struct HistoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl HistoryRepository {
    /// 从已有连接创建仓储实例（连接需已完成 init_schema）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询全部归档记录，按归档时间降序
    pub fn list(&self) -> RepositoryResult<Vec<HistoryRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, batch_id, label, tank_code, started_at, confirmed_at, final_score, archived_at
            FROM batch_history
            ORDER BY archived_at DESC, id DESC
            "#,
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, f64>(6)?,
                    row.get::<_, i64>(7)?,
                ))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        rows.into_iter()
            .map(
                |(id, batch_id, label, tank_code, started_at, confirmed_at, final_score, archived_at)| {
                    Ok(HistoryRecord {
                        id,
                        batch_id,
                        label,
                        tank_code,
                        started_at: millis_to_utc(started_at, "batch_history.started_at")?,
                        confirmed_at: millis_to_utc(confirmed_at, "batch_history.confirmed_at")?,
                        final_score,
                        archived_at: millis_to_utc(archived_at, "batch_history.archived_at")?,
                    })
                },
            )
            .collect()
    }

    /// 清空全部归档记录
    ///
    /// # 返回
    /// - Ok(usize): 删除的记录数
    pub fn clear(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM batch_history", params![])?;
        Ok(affected)
    }
}
