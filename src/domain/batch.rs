// ==========================================
// 发酵批次风险排序系统 - 批次领域模型
// ==========================================
// 职责: 批次、pH/感官测量记录、归档历史
// 红线: 已确认批次不可追加测量记录
// 时间字段对外序列化为毫秒时间戳
// ==========================================

use crate::domain::types::{BatchStatus, SensoryFlag};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Measurement - 测量记录
// ==========================================
// 记录后不可变; 批次内按 observed_at 升序
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub ph: f64,                   // pH 值
    pub sensory_flag: SensoryFlag, // 感官标记
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub observed_at: DateTime<Utc>, // 观测时间
}

impl Measurement {
    pub fn new(ph: f64, sensory_flag: SensoryFlag, observed_at: DateTime<Utc>) -> Self {
        Self {
            ph,
            sensory_flag,
            observed_at,
        }
    }
}

// ==========================================
// Batch - 发酵批次
// ==========================================
// 不变量: final_score 存在 <=> status == Confirmed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    // ===== 主键 =====
    pub id: String, // 批次号，如 STG01_08:30

    // ===== 基础信息 =====
    pub label: String,     // 显示名称，如 "STG 01"
    pub tank_code: String, // 发酵罐编号，如 "01"
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>, // 开始发酵时间

    // ===== 测量序列 =====
    pub measurements: Vec<Measurement>,

    // ===== 状态 =====
    pub status: BatchStatus,
    pub final_score: Option<f64>, // 确认时冻结的最终评分
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl Batch {
    /// 创建新的在制批次
    pub fn new(
        id: String,
        label: String,
        tank_code: String,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            label,
            tank_code,
            started_at,
            measurements: Vec::new(),
            status: BatchStatus::Active,
            final_score: None,
            confirmed_at: None,
        }
    }

    /// 最新一条测量记录
    pub fn last_measurement(&self) -> Option<&Measurement> {
        self.measurements.last()
    }

    /// 是否仍在制（可追加测量、可确认）
    pub fn is_active(&self) -> bool {
        self.status == BatchStatus::Active
    }

    /// 等待时长（小时）
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        (now - self.started_at).num_milliseconds() as f64 / 3_600_000.0
    }
}

// ==========================================
// HistoryRecord - 归档记录
// ==========================================
// 用途: 已确认批次的只读历史
// 同一批次号可因删除后重建而多次归档，归档流水号独立于批次号
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: i64,          // 归档流水号
    pub batch_id: String, // 来源批次号
    pub label: String,
    pub tank_code: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub confirmed_at: DateTime<Utc>,
    pub final_score: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub archived_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_new_batch_is_active_without_score() {
        let batch = Batch::new("STG01_08:00".into(), "STG 01".into(), "01".into(), t0());
        assert!(batch.is_active());
        assert!(batch.final_score.is_none());
        assert!(batch.last_measurement().is_none());
    }

    #[test]
    fn test_age_hours() {
        let batch = Batch::new("STG01_08:00".into(), "STG 01".into(), "01".into(), t0());
        let now = t0() + Duration::minutes(90);
        assert!((batch.age_hours(now) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_batch_serializes_instants_as_millis() {
        let batch = Batch::new("STG01_08:00".into(), "STG 01".into(), "01".into(), t0());
        let value = serde_json::to_value(&batch).unwrap();
        assert_eq!(value["started_at"], serde_json::json!(t0().timestamp_millis()));
        assert_eq!(value["status"], "ACTIVE");
        assert!(value["confirmed_at"].is_null());
    }
}
