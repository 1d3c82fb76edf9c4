// ==========================================
// 工程项目挣值管理系统 - 引擎层
// ==========================================
// 职责: 实现挣值业务规则，不拼 SQL
// 红线: Engine 只通过 Repository trait 访问数据
// ==========================================

pub mod activity_calculator;
pub mod baseline_service;
pub mod earned_value;
pub mod error;
pub mod fallback;
pub mod project_metrics;
pub mod repositories;
pub mod series;

// 重导出核心引擎
pub use activity_calculator::ActivityCalculator;
pub use baseline_service::BaselineService;
pub use earned_value::{CostInputs, EarnedValueCalculator};
pub use error::{EngineError, EngineResult};
pub use fallback::{FallbackChain, Resolved};
pub use project_metrics::ProjectMetrics;
pub use repositories::EvmRepositories;
