// ==========================================
// 工程项目挣值管理系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供 CLI 及上层集成调用
// ==========================================

pub mod error;
pub mod evm_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use evm_api::{get_default_db_path, EvmApi, DB_PATH_ENV};
