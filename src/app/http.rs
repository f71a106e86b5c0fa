// ==========================================
// 发酵批次风险排序系统 - HTTP 路由
// ==========================================
// 职责: 将 API 层暴露为 JSON/HTTP 接口
// 约定: 时间字段为毫秒时间戳; 错误体为 { code, message }
// ==========================================

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::api::validator::parse_sensory_flag;
use crate::api::{ApiError, ApiResult, BoardSnapshot};
use crate::app::state::{AppSnapshot, AppState};
use crate::domain::batch::{Batch, HistoryRecord};

// ==========================================
// 请求/响应体
// ==========================================

/// 创建批次请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBatchRequest {
    pub tank_code: String,
    /// 缺省为服务器当前时刻
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub started_at: Option<DateTime<Utc>>,
}

/// 录入测量请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordMeasurementRequest {
    pub ph: f64,
    pub sensory: String,
    /// 缺省为服务器当前时刻
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub observed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub active_batches: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearHistoryResponse {
    pub removed: usize,
}

/// 错误响应（返回给前端）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 错误代码
    pub code: String,

    /// 错误消息
    pub message: String,
}

// ==========================================
// 错误映射
// ==========================================

/// HTTP 层错误包装
pub struct HttpError(ApiError);

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ApiError::ValidationError(rejection.body_text()))
    }
}

/// ApiError → HTTP 状态码
pub fn status_for(err: &ApiError) -> StatusCode {
    match err {
        ApiError::InvalidInput(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
        ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        ApiError::BusinessRuleViolation(_) | ApiError::InvalidStateTransition { .. } => {
            StatusCode::CONFLICT
        }
        ApiError::DatabaseError(_)
        | ApiError::DatabaseConnectionError(_)
        | ApiError::InternalError(_)
        | ApiError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!(code = self.0.code(), "请求失败: {}", self.0);
        } else {
            warn!(code = self.0.code(), "请求被拒绝: {}", self.0);
        }

        let body = ErrorResponse {
            code: self.0.code().to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type HttpResult<T> = Result<Json<T>, HttpError>;

// ==========================================
// 路由
// ==========================================

/// 构建路由
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        // 批次
        .route("/api/batches", get(list_batches).post(create_batch))
        .route("/api/batches/:id", get(get_batch).delete(delete_batch))
        .route("/api/batches/:id/ph", post(record_measurement))
        .route("/api/batches/:id/confirm", post(confirm_batch))
        // 看板
        .route("/api/board", get(board))
        // 归档历史
        .route("/api/history", get(list_history).delete(clear_history))
        .route("/api/history/grouped", get(list_history_grouped))
        // 完整状态
        .route("/api/state", get(app_state))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// 启动 HTTP 服务（阻塞直到服务退出）
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP 服务已启动: http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

// ==========================================
// 处理函数
// ==========================================
// API 层为同步调用（持有 SQLite 连接锁），统一放到阻塞线程池执行

/// 在阻塞线程池上执行同步 API 调用
async fn run_blocking<T, F>(state: Arc<AppState>, f: F) -> HttpResult<T>
where
    T: Send + 'static,
    F: FnOnce(&AppState) -> ApiResult<T> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| ApiError::InternalError(format!("后台任务异常终止: {}", e)))?;
    Ok(Json(result?))
}

async fn health(State(state): State<Arc<AppState>>) -> HttpResult<HealthResponse> {
    run_blocking(state, |s| {
        Ok(HealthResponse {
            status: "ok".to_string(),
            version: crate::VERSION.to_string(),
            active_batches: s.batch_api.count_active_batches()?,
        })
    })
    .await
}

async fn list_batches(State(state): State<Arc<AppState>>) -> HttpResult<Vec<Batch>> {
    run_blocking(state, |s| s.batch_api.list_active_batches()).await
}

async fn create_batch(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateBatchRequest>, JsonRejection>,
) -> HttpResult<Batch> {
    let Json(req) = payload?;
    let started_at = req.started_at.unwrap_or_else(Utc::now);
    run_blocking(state, move |s| s.batch_api.create_batch(&req.tank_code, started_at)).await
}

async fn get_batch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> HttpResult<Batch> {
    run_blocking(state, move |s| s.batch_api.get_batch(&id)).await
}

async fn delete_batch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, HttpError> {
    run_blocking(state, move |s| s.batch_api.delete_batch(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn record_measurement(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<RecordMeasurementRequest>, JsonRejection>,
) -> HttpResult<Batch> {
    let Json(req) = payload?;
    let sensory_flag = parse_sensory_flag(&req.sensory)?;
    let observed_at = req.observed_at.unwrap_or_else(Utc::now);
    run_blocking(state, move |s| {
        s.batch_api
            .record_measurement(&id, req.ph, sensory_flag, observed_at)
    })
    .await
}

async fn confirm_batch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> HttpResult<HistoryRecord> {
    run_blocking(state, move |s| s.batch_api.confirm_batch(&id, Utc::now())).await
}

async fn board(State(state): State<Arc<AppState>>) -> HttpResult<BoardSnapshot> {
    run_blocking(state, |s| s.batch_api.priority_board(Utc::now())).await
}

async fn list_history(State(state): State<Arc<AppState>>) -> HttpResult<Vec<HistoryRecord>> {
    run_blocking(state, |s| s.history_api.list_history()).await
}

async fn list_history_grouped(
    State(state): State<Arc<AppState>>,
) -> HttpResult<BTreeMap<String, Vec<HistoryRecord>>> {
    run_blocking(state, |s| s.history_api.list_history_grouped()).await
}

async fn clear_history(State(state): State<Arc<AppState>>) -> HttpResult<ClearHistoryResponse> {
    run_blocking(state, |s| {
        let removed = s.history_api.clear_history()?;
        Ok(ClearHistoryResponse { removed })
    })
    .await
}

async fn app_state(State(state): State<Arc<AppState>>) -> HttpResult<AppSnapshot> {
    run_blocking(state, |s| s.snapshot(Utc::now())).await
}
