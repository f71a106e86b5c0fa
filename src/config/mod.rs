// ==========================================
// 发酵批次风险排序系统 - 配置层
// ==========================================
// 职责: 运行配置（数据库路径、监听地址）
// 来源: 环境变量，缺省走默认值
// ==========================================

pub mod app_config;

// 重导出
pub use app_config::{default_db_path, AppConfig, ConfigError};
