// ==========================================
// 发酵批次风险排序系统 - 批次数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑（评分由引擎计算后传入）
// 约束: 同一批次的写入通过共享连接锁串行化，保证“最新测量”语义
// 约束: 时间统一以毫秒时间戳存储
// ==========================================

use crate::domain::batch::{Batch, HistoryRecord, Measurement};
use crate::domain::types::{BatchStatus, SensoryFlag};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ==========================================
// BatchRepository - 批次仓储
// ==========================================
/// 批次仓储
/// 职责: 管理 batch / batch_measurement 表，以及确认时写入 batch_history
/// 红线: 不含业务逻辑，只负责数据访问与状态约束
pub struct BatchRepository {
    conn: Arc<Mutex<Connection>>,
}

/// batch 表原始行
struct BatchRow {
    id: String,
    label: String,
    tank_code: String,
    started_at: i64,
    status: String,
    final_score: Option<f64>,
    confirmed_at: Option<i64>,
}

/// batch_measurement 表原始行
struct MeasurementRow {
    batch_id: String,
    ph: f64,
    sensory_flag: String,
    observed_at: i64,
}

const BATCH_COLUMNS: &str =
    "id, label, tank_code, started_at, status, final_score, confirmed_at";

impl BatchRepository {
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

    // ==========================================
    // 写操作
    // ==========================================

    /// 新建批次
    ///
    /// # 返回
    /// - Err(UniqueConstraintViolation): 批次号已存在
    pub fn insert(&self, batch: &Batch) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO batch (
                id, label, tank_code, started_at, status, final_score, confirmed_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                batch.id,
                batch.label,
                batch.tank_code,
                batch.started_at.timestamp_millis(),
                batch.status.to_db_str(),
                batch.final_score,
                batch.confirmed_at.map(|t| t.timestamp_millis()),
                Utc::now().timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    /// 向在制批次追加测量记录
    ///
    /// # 返回
    /// - Ok(Batch): 追加后的批次（读后写）
    /// - Err(NotFound): 批次不存在
    /// - Err(InvalidStateTransition): 批次已确认
    pub fn append_measurement(
        &self,
        batch_id: &str,
        measurement: &Measurement,
    ) -> RepositoryResult<Batch> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let status = load_status(&tx, batch_id)?;
        if status != BatchStatus::Active {
            return Err(RepositoryError::InvalidStateTransition {
                from: status.to_string(),
                to: "MEASUREMENT_APPENDED".to_string(),
            });
        }

        tx.execute(
            r#"
            INSERT INTO batch_measurement (batch_id, ph, sensory_flag, observed_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                batch_id,
                measurement.ph,
                measurement.sensory_flag.to_db_str(),
                measurement.observed_at.timestamp_millis(),
                Utc::now().timestamp_millis(),
            ],
        )?;

        let batch = load_batch(&tx, batch_id)?.ok_or_else(|| not_found(batch_id))?;
        tx.commit()?;
        Ok(batch)
    }

    /// 确认批次: ACTIVE -> CONFIRMED，并写入归档
    ///
    /// # 参数
    /// - batch_id: 批次号
    /// - final_score: 引擎计算的最终评分
    /// - confirmed_at: 确认时刻（同时作为归档时刻）
    ///
    /// # 说明
    /// - 使用事务保证归档与状态变更原子性
    pub fn confirm(
        &self,
        batch_id: &str,
        final_score: f64,
        confirmed_at: DateTime<Utc>,
    ) -> RepositoryResult<HistoryRecord> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let batch = load_batch(&tx, batch_id)?.ok_or_else(|| not_found(batch_id))?;
        if batch.status != BatchStatus::Active {
            return Err(RepositoryError::InvalidStateTransition {
                from: batch.status.to_string(),
                to: BatchStatus::Confirmed.to_string(),
            });
        }

        let mut record = HistoryRecord {
            id: 0,
            batch_id: batch.id.clone(),
            label: batch.label.clone(),
            tank_code: batch.tank_code.clone(),
            started_at: batch.started_at,
            confirmed_at,
            final_score,
            archived_at: confirmed_at,
        };

        tx.execute(
            r#"
            INSERT INTO batch_history (
                batch_id, label, tank_code, started_at, confirmed_at, final_score, archived_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                record.batch_id,
                record.label,
                record.tank_code,
                record.started_at.timestamp_millis(),
                record.confirmed_at.timestamp_millis(),
                record.final_score,
                record.archived_at.timestamp_millis(),
            ],
        )?;
        record.id = tx.last_insert_rowid();

        tx.execute(
            "UPDATE batch SET status = ?1, final_score = ?2, confirmed_at = ?3 WHERE id = ?4",
            params![
                BatchStatus::Confirmed.to_db_str(),
                final_score,
                confirmed_at.timestamp_millis(),
                batch_id,
            ],
        )?;

        tx.commit()?;
        Ok(record)
    }

    /// 删除批次（测量记录级联删除）
    pub fn delete(&self, batch_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM batch WHERE id = ?1", params![batch_id])?;
        if affected == 0 {
            return Err(not_found(batch_id));
        }
        Ok(())
    }

    // ==========================================
    // 读操作
    // ==========================================

    /// 按批次号查询（含测量记录）
    pub fn find_by_id(&self, batch_id: &str) -> RepositoryResult<Option<Batch>> {
        let conn = self.get_conn()?;
        load_batch(&conn, batch_id)
    }

    /// 查询所有在制批次（含测量记录），按开始时间降序
    pub fn list_active(&self) -> RepositoryResult<Vec<Batch>> {
        let conn = self.get_conn()?;

        let rows = {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM batch WHERE status = ?1 ORDER BY started_at DESC, id ASC",
                BATCH_COLUMNS
            ))?;
            let rows = stmt
                .query_map(params![BatchStatus::Active.to_db_str()], map_batch_row)?
                .collect::<SqliteResult<Vec<_>>>()?;
            rows
        };

        let measurement_rows = {
            let mut stmt = conn.prepare(
                r#"
                SELECT m.batch_id, m.ph, m.sensory_flag, m.observed_at
                FROM batch_measurement m
                JOIN batch b ON b.id = m.batch_id
                WHERE b.status = ?1
                ORDER BY m.batch_id ASC, m.observed_at ASC, m.id ASC
                "#,
            )?;
            let rows = stmt
                .query_map(params![BatchStatus::Active.to_db_str()], map_measurement_row)?
                .collect::<SqliteResult<Vec<_>>>()?;
            rows
        };

        let mut grouped: HashMap<String, Vec<Measurement>> = HashMap::new();
        for row in measurement_rows {
            let batch_id = row.batch_id.clone();
            grouped
                .entry(batch_id)
                .or_default()
                .push(measurement_from_row(row)?);
        }

        rows.into_iter()
            .map(|row| {
                let measurements = grouped.remove(&row.id).unwrap_or_default();
                batch_from_row(row, measurements)
            })
            .collect()
    }

    /// 统计在制批次数量
    pub fn count_active(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM batch WHERE status = ?1",
            params![BatchStatus::Active.to_db_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

// ==========================================
// 行映射
// ==========================================

fn map_batch_row(row: &rusqlite::Row<'_>) -> SqliteResult<BatchRow> {
    Ok(BatchRow {
        id: row.get(0)?,
        label: row.get(1)?,
        tank_code: row.get(2)?,
        started_at: row.get(3)?,
        status: row.get(4)?,
        final_score: row.get(5)?,
        confirmed_at: row.get(6)?,
    })
}

fn map_measurement_row(row: &rusqlite::Row<'_>) -> SqliteResult<MeasurementRow> {
    Ok(MeasurementRow {
        batch_id: row.get(0)?,
        ph: row.get(1)?,
        sensory_flag: row.get(2)?,
        observed_at: row.get(3)?,
    })
}

fn batch_from_row(row: BatchRow, measurements: Vec<Measurement>) -> RepositoryResult<Batch> {
    let status = BatchStatus::parse(&row.status).ok_or_else(|| RepositoryError::FieldValueError {
        field: "batch.status".to_string(),
        message: format!("未知状态: {}", row.status),
    })?;

    Ok(Batch {
        id: row.id,
        label: row.label,
        tank_code: row.tank_code,
        started_at: millis_to_utc(row.started_at, "batch.started_at")?,
        measurements,
        status,
        final_score: row.final_score,
        confirmed_at: row
            .confirmed_at
            .map(|ms| millis_to_utc(ms, "batch.confirmed_at"))
            .transpose()?,
    })
}

fn measurement_from_row(row: MeasurementRow) -> RepositoryResult<Measurement> {
    let sensory_flag =
        SensoryFlag::parse(&row.sensory_flag).ok_or_else(|| RepositoryError::FieldValueError {
            field: "batch_measurement.sensory_flag".to_string(),
            message: format!("未知感官标记: {}", row.sensory_flag),
        })?;

    Ok(Measurement {
        ph: row.ph,
        sensory_flag,
        observed_at: millis_to_utc(row.observed_at, "batch_measurement.observed_at")?,
    })
}

/// 毫秒时间戳转 UTC 时间
pub(crate) fn millis_to_utc(ms: i64, field: &str) -> RepositoryResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms).ok_or_else(|| RepositoryError::FieldValueError {
        field: field.to_string(),
        message: format!("时间戳越界: {}", ms),
    })
}

fn not_found(batch_id: &str) -> RepositoryError {
    RepositoryError::NotFound {
        entity: "Batch".to_string(),
        id: batch_id.to_string(),
    }
}

fn load_status(conn: &Connection, batch_id: &str) -> RepositoryResult<BatchStatus> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT status FROM batch WHERE id = ?1",
            params![batch_id],
            |row| row.get(0),
        )
        .optional()?;

    let raw = raw.ok_or_else(|| not_found(batch_id))?;
    BatchStatus::parse(&raw).ok_or_else(|| RepositoryError::FieldValueError {
        field: "batch.status".to_string(),
        message: format!("未知状态: {}", raw),
    })
}

fn load_batch(conn: &Connection, batch_id: &str) -> RepositoryResult<Option<Batch>> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM batch WHERE id = ?1", BATCH_COLUMNS),
            params![batch_id],
            map_batch_row,
        )
        .optional()?;

    let row = match row {
        Some(row) => row,
        None => return Ok(None),
    };

    let mut stmt = conn.prepare(
        r#"
        SELECT batch_id, ph, sensory_flag, observed_at
        FROM batch_measurement
        WHERE batch_id = ?1
        ORDER BY observed_at ASC, id ASC
        "#,
    )?;
    let measurements = stmt
        .query_map(params![batch_id], map_measurement_row)?
        .collect::<SqliteResult<Vec<_>>>()?
        .into_iter()
        .map(measurement_from_row)
        .collect::<RepositoryResult<Vec<_>>>()?;

    batch_from_row(row, measurements).map(Some)
}
