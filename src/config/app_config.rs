// ==========================================
// 发酵批次风险排序系统 - 运行配置
// ==========================================
// 职责: 数据库路径、监听地址的解析
// 来源: 环境变量 > 默认值
// 说明: 评分阈值为代码常量，不走配置
// ==========================================

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// 数据库路径环境变量
pub const ENV_DB_PATH: &str = "FERMENT_BOARD_DB_PATH";
/// 监听地址环境变量
pub const ENV_BIND_ADDR: &str = "FERMENT_BOARD_BIND";

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DB_FILE_NAME: &str = "ferment_board.db";

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("监听地址无效: {value}")]
    InvalidBindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

/// 应用运行配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub db_path: String,
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    /// 从进程环境变量读取配置
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源读取配置（空白值视为未设置）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let db_path = read(ENV_DB_PATH).unwrap_or_else(default_db_path);

        let bind_raw = read(ENV_BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|source| ConfigError::InvalidBindAddr {
                value: bind_raw.clone(),
                source,
            })?;

        Ok(Self { db_path, bind_addr })
    }
}

/// 默认数据库路径
///
/// 优先放在用户数据目录下，拿不到数据目录时回退到当前目录
pub fn default_db_path() -> String {
    let mut path = PathBuf::from(format!("./{}", DB_FILE_NAME));

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        let dir = data_dir.join("ferment-risk-board-dev");
        #[cfg(not(debug_assertions))]
        let dir = data_dir.join("ferment-risk-board");

        match std::fs::create_dir_all(&dir) {
            Ok(()) => path = dir.join(DB_FILE_NAME),
            Err(e) => tracing::warn!("无法创建数据目录 {:?}，回退到当前目录: {}", dir, e),
        }
    }

    path.to_string_lossy().to_string()
}
