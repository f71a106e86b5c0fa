// ==========================================
// 发酵批次风险排序系统 - 引擎层
// ==========================================
// 职责: 实现评分与排序规则,不拼 SQL
// 红线: Engine 不拼 SQL, 所有评分必须输出 reason
// ==========================================

pub mod ranking;
pub mod scoring;

// 重导出核心引擎
pub use ranking::PrioritySorter;
pub use scoring::{round_score, ScoringEngine};
