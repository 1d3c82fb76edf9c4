// ==========================================
// 工程项目挣值管理系统 - 配置层
// ==========================================
// 职责: 挣值引擎参数管理（默认值 + 覆写）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager, EvmSettings};
