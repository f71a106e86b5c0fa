// ==========================================
// 发酵批次风险排序系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + axum
// 系统定位: 决策支持系统 (人工最终确认)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 评分与排序
pub mod engine;

// 配置层 - 运行配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/表结构）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态装配与 HTTP
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{BatchStatus, GateStatus, RiskZone, ScoringMode, SensoryFlag};

// 领域实体
pub use domain::{
    Batch, GateDecision, HistoryRecord, Measurement, RankKey, RankedBatch, ScoreBreakdown,
    ScoringResult,
};

// 引擎
pub use engine::{PrioritySorter, ScoringEngine};

// API
pub use api::{ApiError, ApiResult, BatchApi, BoardSnapshot, HistoryApi};

// 应用
pub use app::{AppSnapshot, AppState};
pub use config::AppConfig;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "发酵批次风险排序系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
