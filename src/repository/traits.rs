// ==========================================
// 工程项目挣值管理系统 - 数据访问接口
// ==========================================
// 职责: 定义挣值引擎所需的数据访问 trait（不包含业务逻辑）
// 实现者: *_repo.rs 中的 *RepositoryImpl（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::activity::Activity;
use crate::domain::baseline::{BudgetBaseline, MonthlyBaselinePoint};
use crate::domain::cost::{ClientInvoice, PoLineItem, SupplierInvoice};
use crate::domain::evm::EarnedValueSnapshot;
use crate::domain::project::{BudgetChange, Opportunity, Project};
use crate::repository::error::RepositoryResult;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeSet;

// ==========================================
// ProjectRepository - 项目 / 机会 / 进度日志 / 预算变更
// ==========================================
pub trait ProjectRepository: Send + Sync {
    /// 按项目 ID 查询项目
    fn find_project(&self, project_id: &str) -> RepositoryResult<Option<Project>>;

    /// 查询销售机会
    fn find_opportunity(&self, opportunity_id: &str) -> RepositoryResult<Option<Opportunity>>;

    /// 查询项目的全部预算变更（任意审批状态）
    fn list_budget_changes(&self, project_id: &str) -> RepositoryResult<Vec<BudgetChange>>;

    /// 进度日志中的最大实际完成百分比（无记录时 None）
    fn max_actual_progress(&self, project_id: &str) -> RepositoryResult<Option<Decimal>>;
}

// ==========================================
// ActivityRepository - 项目活动
// ==========================================
pub trait ActivityRepository: Send + Sync {
    /// 查询有效活动（按创建时间升序）
    fn list_active(&self, project_id: &str) -> RepositoryResult<Vec<Activity>>;

    /// 批量更新活动权重
    ///
    /// # 参数
    /// - weights: (activity_id, calculated_weight)
    ///
    /// # 返回
    /// 更新的记录数（整个批次在同一事务中）
    fn update_weights(&self, weights: &[(i64, Decimal)]) -> RepositoryResult<usize>;

    /// 保存活动（无 ID 时插入，返回 activity_id）
    fn save(&self, activity: &Activity) -> RepositoryResult<i64>;
}

// ==========================================
// BaselineRepository - 基线汇总与月度基线点
// ==========================================
pub trait BaselineRepository: Send + Sync {
    fn find_baseline(&self, project_id: &str) -> RepositoryResult<Option<BudgetBaseline>>;

    /// 插入或更新基线汇总
    fn save_baseline(&self, baseline: &BudgetBaseline) -> RepositoryResult<()>;

    /// 查询月度基线点（按 month_index 升序）
    fn list_points(&self, project_id: &str) -> RepositoryResult<Vec<MonthlyBaselinePoint>>;

    /// 已存在的 month_index 集合
    fn existing_month_indices(&self, project_id: &str) -> RepositoryResult<BTreeSet<u32>>;

    /// 插入月度基线点（已存在的月份保持不变）
    fn insert_points(&self, points: &[MonthlyBaselinePoint]) -> RepositoryResult<usize>;

    /// 覆写 PV/EV
    ///
    /// # 参数
    /// - values: (month_index, pv_planned, ev_planned)
    fn update_pv_ev(
        &self,
        project_id: &str,
        values: &[(u32, Decimal, Decimal)],
    ) -> RepositoryResult<usize>;

    /// 覆写月度计划进度（外部提供的累计计划百分比）
    ///
    /// # 参数
    /// - values: (month_index, progress_planned)
    fn update_progress_planned(
        &self,
        project_id: &str,
        values: &[(u32, Decimal)],
    ) -> RepositoryResult<usize>;
}

// ==========================================
// CostRepository - 采购与供应商发票（AC 数据源）
// ==========================================
pub trait CostRepository: Send + Sync {
    /// 项目采购订单下的供应商发票（按开票日期升序）
    fn list_supplier_invoices(&self, project_id: &str) -> RepositoryResult<Vec<SupplierInvoice>>;

    /// 项目采购订单明细（按订单日期升序）
    fn list_po_lines(&self, project_id: &str) -> RepositoryResult<Vec<PoLineItem>>;

    /// 最早的采购订单日期
    fn first_po_issue_date(&self, project_id: &str) -> RepositoryResult<Option<NaiveDate>>;
}

// ==========================================
// ClientInvoiceRepository - 客户发票（回款数据源）
// ==========================================
pub trait ClientInvoiceRepository: Send + Sync {
    /// 项目客户发票（按开票日期升序）
    fn list_by_project(&self, project_id: &str) -> RepositoryResult<Vec<ClientInvoice>>;

    /// 插入或更新
    fn save(&self, invoice: &ClientInvoice) -> RepositoryResult<()>;
}

// ==========================================
// EarnedValueRepository - 挣值快照
// ==========================================
pub trait EarnedValueRepository: Send + Sync {
    /// 覆盖写入项目快照
    fn save_snapshot(&self, snapshot: &EarnedValueSnapshot) -> RepositoryResult<()>;

    fn find_snapshot(&self, project_id: &str) -> RepositoryResult<Option<EarnedValueSnapshot>>;
}
