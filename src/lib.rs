// ==========================================
// 工程项目挣值管理系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 挣值 (EVM) 计算引擎，输出驾驶舱数据与绩效指标
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ClientInvoiceStatus, CostSource, ProgressSource, RiskLevel};

// 领域实体
pub use domain::{
    Activity, BudgetBaseline, ClientInvoice, ComprehensiveMetrics, EarnedValueResult,
    EvmMetrics, PmiDashboardData, Project,
};

// 引擎
pub use engine::{
    ActivityCalculator, BaselineService, EarnedValueCalculator, EvmRepositories, ProjectMetrics,
};

// API
pub use api::{ApiError, EvmApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "工程项目挣值管理系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
