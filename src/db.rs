// ==========================================
// 发酵批次风险排序系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键级联删除依赖 foreign_keys）
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 统一建表，启动时幂等执行
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 10_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化数据库 schema（幂等）
///
/// 表:
/// - batch: 批次主表
/// - batch_measurement: pH/感官记录，随批次级联删除
/// - batch_history: 已确认批次归档
/// - schema_version: 版本记录
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS batch (
            id TEXT PRIMARY KEY,
            label TEXT NOT NULL,
            tank_code TEXT NOT NULL,
            started_at INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'ACTIVE',
            final_score REAL,
            confirmed_at INTEGER,
            created_at INTEGER NOT NULL,
            CHECK ((status = 'CONFIRMED') = (final_score IS NOT NULL))
        );

        CREATE TABLE IF NOT EXISTS batch_measurement (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id TEXT NOT NULL,
            ph REAL NOT NULL,
            sensory_flag TEXT NOT NULL,
            observed_at INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            FOREIGN KEY (batch_id) REFERENCES batch(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_measurement_batch_time
            ON batch_measurement(batch_id, observed_at, id);
        CREATE INDEX IF NOT EXISTS idx_batch_status ON batch(status);

        CREATE TABLE IF NOT EXISTS batch_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id TEXT NOT NULL,
            label TEXT NOT NULL,
            tank_code TEXT NOT NULL,
            started_at INTEGER NOT NULL,
            confirmed_at INTEGER NOT NULL,
            final_score REAL NOT NULL,
            archived_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_history_archived
            ON batch_history(archived_at, id);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, strftime('%s','now') * 1000)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
