// ==========================================
// 发酵批次风险排序系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod batch;
pub mod score;
pub mod types;

// 重导出核心类型
pub use batch::{Batch, HistoryRecord, Measurement};
pub use score::{GateDecision, RankKey, RankedBatch, ScoreBreakdown, ScoringResult};
pub use types::{BatchStatus, GateStatus, RiskZone, ScoringMode, SensoryFlag};
