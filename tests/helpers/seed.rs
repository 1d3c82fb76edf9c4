// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================
// 写入顺序: 机会 → 项目 → 活动/订单/发票（外键约束开启）
// ==========================================

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use project_evm::domain::activity::Activity;
use project_evm::domain::cost::{ClientInvoice, PoLineItem, PurchaseOrder, SupplierInvoice};
use project_evm::domain::project::{BudgetChange, Opportunity, ProgressRecord, Project};
use project_evm::domain::types::ApprovalStatus;
use project_evm::repository::{
    ActivityRepository, ActivityRepositoryImpl, ClientInvoiceRepository,
    ClientInvoiceRepositoryImpl, CostRepositoryImpl, ProjectRepositoryImpl, RepositoryResult,
};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};

type SharedConn = Arc<Mutex<Connection>>;

// ==========================================
// Project 构建器
// ==========================================

pub struct ProjectBuilder {
    project: Project,
    total_costs: Option<Decimal>,
    cost_aprox: Option<Decimal>,
    with_opportunity: bool,
}

impl ProjectBuilder {
    pub fn new(project_id: &str) -> Self {
        Self {
            project: Project::new(project_id),
            total_costs: None,
            cost_aprox: None,
            with_opportunity: true,
        }
    }

    /// 机会成本测算合计（BAC 首选来源）
    pub fn total_costs(mut self, amount: Decimal) -> Self {
        self.total_costs = Some(amount);
        self
    }

    pub fn cost_aprox(mut self, amount: Decimal) -> Self {
        self.cost_aprox = Some(amount);
        self
    }

    pub fn without_opportunity(mut self) -> Self {
        self.with_opportunity = false;
        self
    }

    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.project.start_date = Some(date);
        self
    }

    pub fn duration(mut self, months: u32) -> Self {
        self.project.estimated_duration = Some(months);
        self
    }

    pub fn physical_percent(mut self, pct: Decimal) -> Self {
        self.project.physical_percent_complete = Some(pct);
        self
    }

    pub fn last_progress_update(mut self, date: NaiveDate) -> Self {
        self.project.last_progress_update = Some(date);
        self
    }

    pub fn insert(mut self, conn: &SharedConn) -> RepositoryResult<Project> {
        let repo = ProjectRepositoryImpl::from_connection(conn.clone());

        if self.with_opportunity {
            let opportunity_id = format!("OPP-{}", self.project.project_id);
            repo.upsert_opportunity(&Opportunity {
                opportunity_id: opportunity_id.clone(),
                name: format!("{} 机会", self.project.project_id),
                total_costs: self.total_costs,
                cost_aprox: self.cost_aprox,
            })?;
            self.project.opportunity_id = Some(opportunity_id);
        }

        repo.upsert_project(&self.project)?;
        Ok(self.project)
    }
}

// ==========================================
// 活动 / 进度 / 预算变更
// ==========================================

pub fn add_activity(
    conn: &SharedConn,
    project_id: &str,
    name: &str,
    scores: (u8, u8, u8),
    total_units: u32,
    completed_units: u32,
    created_at: NaiveDateTime,
) -> RepositoryResult<i64> {
    let mut activity = Activity::new(project_id, name, scores, total_units, created_at);
    activity.set_completed_units(completed_units);
    ActivityRepositoryImpl::from_connection(conn.clone()).save(&activity)
}

pub fn add_progress_record(
    conn: &SharedConn,
    project_id: &str,
    month_number: u32,
    actual: Decimal,
    record_date: NaiveDate,
) -> RepositoryResult<()> {
    ProjectRepositoryImpl::from_connection(conn.clone()).insert_progress_record(&ProgressRecord {
        project_id: project_id.to_string(),
        month_number,
        planned_percentage: actual,
        actual_percentage: actual,
        record_date,
    })
}

pub fn add_budget_change(
    conn: &SharedConn,
    project_id: &str,
    amount: Decimal,
    status: ApprovalStatus,
) -> RepositoryResult<()> {
    ProjectRepositoryImpl::from_connection(conn.clone()).insert_budget_change(&BudgetChange {
        project_id: project_id.to_string(),
        amount,
        status,
        reason: "变更单".to_string(),
        change_date: None,
    })
}

// ==========================================
// 成本单据
// ==========================================

pub fn add_purchase_order(
    conn: &SharedConn,
    project_id: &str,
    po_id: &str,
    issue_date: Option<NaiveDate>,
) -> RepositoryResult<()> {
    CostRepositoryImpl::from_connection(conn.clone()).upsert_purchase_order(&PurchaseOrder {
        po_id: po_id.to_string(),
        project_id: project_id.to_string(),
        issue_date,
    })
}

pub fn add_po_line(
    conn: &SharedConn,
    po_id: &str,
    total: Decimal,
    local_total: Option<Decimal>,
) -> RepositoryResult<()> {
    CostRepositoryImpl::from_connection(conn.clone()).insert_po_line(&PoLineItem {
        po_id: po_id.to_string(),
        po_issue_date: None,
        description: "材料".to_string(),
        total: Some(total),
        local_total,
    })
}

pub fn add_supplier_invoice(
    conn: &SharedConn,
    po_id: &str,
    invoice_id: &str,
    issue_date: NaiveDate,
    amount: Decimal,
    currency: &str,
    exchange_rate: Option<Decimal>,
) -> RepositoryResult<()> {
    CostRepositoryImpl::from_connection(conn.clone()).upsert_supplier_invoice(&SupplierInvoice {
        invoice_id: invoice_id.to_string(),
        po_id: po_id.to_string(),
        invoice_number: invoice_id.to_string(),
        issue_date: Some(issue_date),
        total_amount: amount,
        currency: currency.to_string(),
        exchange_rate,
    })
}

pub fn save_client_invoice(conn: &SharedConn, invoice: &ClientInvoice) -> RepositoryResult<()> {
    ClientInvoiceRepositoryImpl::from_connection(conn.clone()).save(invoice)
}
