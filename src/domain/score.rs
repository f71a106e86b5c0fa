// ==========================================
// 发酵批次风险排序系统 - 评分结果模型
// ==========================================
// 职责: 评分结果、排序键、可解释明细
// 说明: 派生数据，不落库，每次按批次当前状态重算
// ==========================================

use crate::domain::types::{GateStatus, RiskZone, ScoringMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// RankKey - 排序键
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankKey {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>, // FEFO/FIFO
    pub slope: f64,                // 恶化速度（闸门覆盖时为 1）
}

// ==========================================
// ScoringResult - 评分结果
// ==========================================
// score: 通常在 [0,1] 并保留 3 位小数; 闸门覆盖为 999 / 1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    pub score: f64,
    pub rank_key: RankKey,
}

// ==========================================
// GateDecision - 硬闸门判定
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateDecision {
    pub status: GateStatus,
    pub score: Option<f64>, // PASS 时为 None
}

// ==========================================
// ScoreBreakdown - 评分明细 (可解释性)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub mode: ScoringMode,
    pub gate: Option<GateDecision>,     // 无测量记录时为 None
    pub zone: Option<RiskZone>,         // 仅闸门放行时存在
    pub age_severity: f64,
    pub ph_severity: Option<f64>,
    pub velocity_risk: Option<f64>,
    pub current_risk: Option<f64>,
    pub predictive_risk: Option<f64>,
    pub result: ScoringResult,
    pub reason: String,
}

// ==========================================
// RankedBatch - 优先级看板条目
// ==========================================
// 用途: 看板展示，rank 从 1 开始
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedBatch {
    pub rank: usize,
    pub batch_id: String,
    pub label: String,
    pub tank_code: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,
    pub age_hours: f64,
    pub last_ph: Option<f64>,
    pub measurement_count: usize,
    pub score: f64,
    pub rank_key: RankKey,
    pub breakdown: ScoreBreakdown,
}
