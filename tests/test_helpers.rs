// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、测试数据生成等功能
// ==========================================
#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use ferment_risk_board::app::AppState;
use ferment_risk_board::db::{init_schema, open_sqlite_connection};
use ferment_risk_board::domain::{Batch, Measurement, SensoryFlag};
use std::error::Error;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径非 UTF-8")?
        .to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 创建基于临时数据库的 AppState
pub fn create_test_state() -> (NamedTempFile, AppState) {
    let (temp_file, db_path) = create_test_db().expect("创建测试数据库失败");
    let state = AppState::new(db_path).expect("初始化AppState失败");
    (temp_file, state)
}

/// 固定基准时刻 2026-03-01 08:00:00 UTC
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
}

/// 基准时刻之后若干分钟
pub fn at_minutes(minutes: i64) -> DateTime<Utc> {
    t0() + Duration::minutes(minutes)
}

/// 构造内存批次（不落库）
pub fn batch(id: &str, started_at: DateTime<Utc>, readings: &[(f64, SensoryFlag, i64)]) -> Batch {
    let mut batch = Batch::new(
        id.to_string(),
        format!("STG {}", id),
        id.to_string(),
        started_at,
    );
    batch.measurements = readings
        .iter()
        .map(|(ph, flag, minutes)| Measurement::new(*ph, *flag, at_minutes(*minutes)))
        .collect();
    batch
}
