// ==========================================
// 工程项目挣值管理系统 - 引擎层错误类型
// ==========================================
// 致命错误只有一类: 无法确定成本基线 (BAC)
// 其余缺失数据一律降级为兜底值，不在此处抛出
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// 销售机会未填写任何成本字段，无法计算 BAC
    #[error("项目缺少成本基线(需要机会的成本测算或概算): project_id={project_id}")]
    MissingCostBaseline { project_id: String },

    #[error("项目不存在: {0}")]
    ProjectNotFound(String),

    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type EngineResult<T> = Result<T, EngineError>;
