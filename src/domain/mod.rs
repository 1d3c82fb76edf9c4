// ==========================================
// 工程项目挣值管理系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、结果对象
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod activity;
pub mod baseline;
pub mod cost;
pub mod evm;
pub mod metrics;
pub mod project;
pub mod types;

// 重导出核心类型
pub use activity::Activity;
pub use baseline::{BudgetBaseline, MonthlyArrays, MonthlyBaselinePoint};
pub use cost::{ClientInvoice, InvoiceTransitionError, PoLineItem, PurchaseOrder, SupplierInvoice};
pub use evm::{
    ActivityDetail, CurveData, EarnedValueResult, EarnedValueSnapshot, EvmMetrics, GranularCurve,
    PhysicalProgressDetail, PmiDashboardData,
};
pub use metrics::{
    ComprehensiveMetrics, ForecastMetrics, PerformanceIndexes, QualityMetrics, RiskMetrics,
};
pub use project::{BudgetChange, Opportunity, ProgressRecord, Project};
pub use types::{
    ActivityState, ApprovalStatus, ClientInvoiceStatus, CostSource, CostTrend, DataQuality,
    EfficiencyLevel, ProgressSource, ProjectState, RiskLevel, ScheduleTrend, WeightReliability,
};
