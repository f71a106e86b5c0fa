// ==========================================
// 发酵批次风险排序系统 - 服务主入口
// ==========================================
// 技术栈: tokio + axum + SQLite
// ==========================================

use std::sync::Arc;

use anyhow::Context;
use ferment_risk_board::app::{self, AppState};
use ferment_risk_board::config::AppConfig;
use ferment_risk_board::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", ferment_risk_board::APP_NAME);
    tracing::info!("系统版本: {}", ferment_risk_board::VERSION);
    tracing::info!("==================================================");

    let config = AppConfig::from_env().context("读取运行配置失败")?;
    tracing::info!("使用数据库: {}", config.db_path);

    let state = AppState::new(config.db_path.clone())
        .map_err(|e| anyhow::anyhow!(e))
        .context("无法初始化AppState")?;

    app::serve(Arc::new(state), config.bind_addr).await
}
