// ==========================================
// 发酵批次风险排序系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 说明: 替代全局可变状态; 每次渲染由 snapshot() 生成不可变快照
// ==========================================

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{ApiResult, BatchApi, BoardSnapshot, HistoryApi};
use crate::db::{init_schema, open_sqlite_connection, read_schema_version, CURRENT_SCHEMA_VERSION};
use crate::domain::batch::{Batch, HistoryRecord};
use crate::engine::{PrioritySorter, ScoringEngine};
use crate::repository::{BatchRepository, HistoryRepository};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 批次API
    pub batch_api: Arc<BatchApi>,

    /// 归档历史API
    pub history_api: Arc<HistoryApi>,
}

/// 完整应用状态快照（批次 + 历史 + 看板）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSnapshot {
    pub batches: Vec<Batch>,
    pub history: Vec<HistoryRecord>,
    pub board: BoardSnapshot,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开共享连接、初始化表结构并校验schema版本
    /// 2. 初始化Repository与Engine
    /// 3. 创建API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("无法初始化表结构: {}", e))?;

        // 拒绝由更新版本程序创建的数据库
        let schema_version = read_schema_version(&conn)
            .map_err(|e| format!("无法读取schema版本: {}", e))?;
        match schema_version {
            Some(v) if v > CURRENT_SCHEMA_VERSION => {
                return Err(format!(
                    "数据库schema版本({})高于程序支持的版本({})",
                    v, CURRENT_SCHEMA_VERSION
                ));
            }
            _ => tracing::info!("数据库schema版本: {:?}", schema_version),
        }
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let batch_repo = Arc::new(BatchRepository::from_connection(conn.clone()));
        let history_repo = Arc::new(HistoryRepository::from_connection(conn));

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let scoring_engine = Arc::new(ScoringEngine::new());
        let priority_sorter = Arc::new(PrioritySorter::new(scoring_engine.clone()));

        // ==========================================
        // 创建API实例
        // ==========================================
        let batch_api = Arc::new(BatchApi::new(batch_repo, scoring_engine, priority_sorter));
        let history_api = Arc::new(HistoryApi::new(history_repo));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            batch_api,
            history_api,
        })
    }

    /// 生成完整状态快照
    ///
    /// # 参数
    /// - now: 看板评分时刻
    pub fn snapshot(&self, now: DateTime<Utc>) -> ApiResult<AppSnapshot> {
        Ok(AppSnapshot {
            batches: self.batch_api.list_active_batches()?,
            history: self.history_api.list_history()?,
            board: self.batch_api.priority_board(now)?,
        })
    }
}
