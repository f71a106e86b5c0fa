// ==========================================
// 发酵批次风险排序系统 - 归档历史 API
// ==========================================
// 职责: 归档记录查询（平铺/按批次名称分组）、清空
// ==========================================

use crate::api::error::ApiResult;
use crate::domain::batch::HistoryRecord;
use crate::repository::history_repo::HistoryRepository;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// 归档历史API
pub struct HistoryApi {
    history_repo: Arc<HistoryRepository>,
}

impl HistoryApi {
    pub fn new(history_repo: Arc<HistoryRepository>) -> Self {
        Self { history_repo }
    }

    /// 全部归档记录（归档时间降序）
    pub fn list_history(&self) -> ApiResult<Vec<HistoryRecord>> {
        Ok(self.history_repo.list()?)
    }

    /// 按显示名称分组的归档记录
    ///
    /// 组内保持归档时间降序
    pub fn list_history_grouped(&self) -> ApiResult<BTreeMap<String, Vec<HistoryRecord>>> {
        let mut grouped: BTreeMap<String, Vec<HistoryRecord>> = BTreeMap::new();
        for record in self.history_repo.list()? {
            grouped.entry(record.label.clone()).or_default().push(record);
        }
        Ok(grouped)
    }

    /// 清空归档记录
    ///
    /// # 返回
    /// - Ok(usize): 删除的记录数
    pub fn clear_history(&self) -> ApiResult<usize> {
        let removed = self.history_repo.clear()?;
        info!(removed, "归档历史已清空");
        Ok(removed)
    }
}
