// ==========================================
// 发酵批次风险排序系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供 HTTP 路由调用
// ==========================================

pub mod batch_api;
pub mod error;
pub mod history_api;
pub mod validator;

// 重导出核心类型
pub use batch_api::{BatchApi, BoardSnapshot};
pub use error::{ApiError, ApiResult};
pub use history_api::HistoryApi;
