// ==========================================
// 工程项目挣值管理系统 - 引擎层仓储聚合
// ==========================================
// 职责: 聚合挣值引擎所需的所有 Repository
// 目标: 计算器只依赖 trait，便于用内存库做单元测试
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::repository::{
    ActivityRepository, ActivityRepositoryImpl, BaselineRepository, BaselineRepositoryImpl,
    ClientInvoiceRepository, ClientInvoiceRepositoryImpl, CostRepository, CostRepositoryImpl,
    EarnedValueRepository, EarnedValueRepositoryImpl, ProjectRepository, ProjectRepositoryImpl,
};

/// 挣值引擎仓储集合
///
/// # 包含的仓储
/// - `project_repo`: 项目 / 机会 / 进度日志 / 预算变更
/// - `activity_repo`: 项目活动
/// - `baseline_repo`: 基线汇总与月度基线
/// - `cost_repo`: 采购订单与供应商发票
/// - `client_invoice_repo`: 客户发票
/// - `earned_value_repo`: 挣值快照
#[derive(Clone)]
pub struct EvmRepositories {
    pub project_repo: Arc<dyn ProjectRepository>,
    pub activity_repo: Arc<dyn ActivityRepository>,
    pub baseline_repo: Arc<dyn BaselineRepository>,
    pub cost_repo: Arc<dyn CostRepository>,
    pub client_invoice_repo: Arc<dyn ClientInvoiceRepository>,
    pub earned_value_repo: Arc<dyn EarnedValueRepository>,
}

impl EvmRepositories {
    pub fn new(
        project_repo: Arc<dyn ProjectRepository>,
        activity_repo: Arc<dyn ActivityRepository>,
        baseline_repo: Arc<dyn BaselineRepository>,
        cost_repo: Arc<dyn CostRepository>,
        client_invoice_repo: Arc<dyn ClientInvoiceRepository>,
        earned_value_repo: Arc<dyn EarnedValueRepository>,
    ) -> Self {
        Self {
            project_repo,
            activity_repo,
            baseline_repo,
            cost_repo,
            client_invoice_repo,
            earned_value_repo,
        }
    }

    /// 基于同一个 SQLite 连接构造全部仓储
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            project_repo: Arc::new(ProjectRepositoryImpl::from_connection(conn.clone())),
            activity_repo: Arc::new(ActivityRepositoryImpl::from_connection(conn.clone())),
            baseline_repo: Arc::new(BaselineRepositoryImpl::from_connection(conn.clone())),
            cost_repo: Arc::new(CostRepositoryImpl::from_connection(conn.clone())),
            client_invoice_repo: Arc::new(ClientInvoiceRepositoryImpl::from_connection(
                conn.clone(),
            )),
            earned_value_repo: Arc::new(EarnedValueRepositoryImpl::from_connection(conn)),
        }
    }
}

// 注: 聚合结构本身无逻辑，其正确性由各计算器的测试覆盖。
