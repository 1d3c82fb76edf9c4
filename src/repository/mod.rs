// ==========================================
// 工程项目挣值管理系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod activity_repo;
pub mod baseline_repo;
pub mod client_invoice_repo;
pub mod codec;
pub mod cost_repo;
pub mod earned_value_repo;
pub mod error;
pub mod project_repo;
pub mod traits;

// 重导出核心仓储
pub use activity_repo::ActivityRepositoryImpl;
pub use baseline_repo::BaselineRepositoryImpl;
pub use client_invoice_repo::ClientInvoiceRepositoryImpl;
pub use cost_repo::CostRepositoryImpl;
pub use earned_value_repo::EarnedValueRepositoryImpl;
pub use error::{RepositoryError, RepositoryResult};
pub use project_repo::ProjectRepositoryImpl;
pub use traits::{
    ActivityRepository, BaselineRepository, ClientInvoiceRepository, CostRepository,
    EarnedValueRepository, ProjectRepository,
};
