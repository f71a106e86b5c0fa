// ==========================================
// 发酵批次风险排序系统 - 领域类型定义
// ==========================================
// 职责: 感官标记、批次状态、闸门状态、风险区间等枚举
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 感官标记 (Sensory Flag)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensoryFlag {
    Normal,   // 正常
    Abnormal, // 异常（气味/色泽/质地）
}

impl fmt::Display for SensoryFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl SensoryFlag {
    /// 从字符串解析感官标记（未知值返回 None，由调用方决定如何报错）
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "NORMAL" => Some(SensoryFlag::Normal),
            "ABNORMAL" => Some(SensoryFlag::Abnormal),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            SensoryFlag::Normal => "NORMAL",
            SensoryFlag::Abnormal => "ABNORMAL",
        }
    }
}

// ==========================================
// 批次状态 (Batch Status)
// ==========================================
// 状态机: ACTIVE -> CONFIRMED (终态, 不可逆)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Active,    // 在制
    Confirmed, // 已确认（已归档）
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl BatchStatus {
    /// 从字符串解析批次状态
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ACTIVE" => Some(BatchStatus::Active),
            "CONFIRMED" => Some(BatchStatus::Confirmed),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            BatchStatus::Active => "ACTIVE",
            BatchStatus::Confirmed => "CONFIRMED",
        }
    }
}

// ==========================================
// 硬闸门状态 (Gate Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateStatus {
    Pass,   // 放行，进入连续评分
    Hold,   // 扣留，移出正常排序，人工复核
    Urgent, // 紧急，最高优先级
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateStatus::Pass => write!(f, "PASS"),
            GateStatus::Hold => write!(f, "HOLD"),
            GateStatus::Urgent => write!(f, "URGENT"),
        }
    }
}

// ==========================================
// pH 风险区间 (Risk Zone)
// ==========================================
// 顺序: Safe < Caution < Critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskZone {
    Safe,     // ph > 6.05
    Caution,  // 5.95 < ph <= 6.05
    Critical, // ph <= 5.95（闸门已放行，故 > 5.90）
}

impl fmt::Display for RiskZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskZone::Safe => write!(f, "SAFE"),
            RiskZone::Caution => write!(f, "CAUTION"),
            RiskZone::Critical => write!(f, "CRITICAL"),
        }
    }
}

// ==========================================
// 评分模式 (Scoring Mode)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoringMode {
    FifoOnly,   // 无 pH 记录，仅按等待时长
    GateOverride, // 硬闸门覆盖
    Reactive,   // 无速度信号，仅当前风险
    Predictive, // 当前风险 + 预测风险
}

impl fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringMode::FifoOnly => write!(f, "FIFO_ONLY"),
            ScoringMode::GateOverride => write!(f, "GATE_OVERRIDE"),
            ScoringMode::Reactive => write!(f, "REACTIVE"),
            ScoringMode::Predictive => write!(f, "PREDICTIVE"),
        }
    }
}
