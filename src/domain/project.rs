// ==========================================
// 工程项目挣值管理系统 - 项目领域模型
// ==========================================
// 职责: 销售机会 / 项目 / 进度日志 / 预算变更
// 红线: 不含数据访问逻辑
// ==========================================

use crate::domain::types::{ApprovalStatus, ProjectState};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// Opportunity - 销售机会
// ==========================================
/// 项目的前身（合同签订前的商机记录），成本基线从这里派生
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub opportunity_id: String,
    pub name: String,
    pub total_costs: Option<Decimal>, // 成本测算合计（首选）
    pub cost_aprox: Option<Decimal>,  // 概算金额（兼作合同额）
}

impl Opportunity {
    /// 成本基线: total_costs 优先，其次 cost_aprox；零值视为未填写
    pub fn cost_baseline(&self) -> Option<Decimal> {
        non_zero(self.total_costs).or_else(|| non_zero(self.cost_aprox))
    }

    /// 计划合同额（销售额）
    pub fn contract_value(&self) -> Option<Decimal> {
        non_zero(self.cost_aprox)
    }
}

fn non_zero(value: Option<Decimal>) -> Option<Decimal> {
    value.filter(|v| !v.is_zero())
}

// ==========================================
// Project - 项目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub project_id: String,
    pub opportunity_id: Option<String>,
    pub cost_center: String,
    pub state: ProjectState,
    pub start_date: Option<NaiveDate>,
    pub estimated_duration: Option<u32>, // 月
    pub physical_percent_complete: Option<Decimal>,
    pub last_progress_update: Option<NaiveDate>,
}

impl Project {
    /// 创建一个最小项目（其余字段为空）
    pub fn new(project_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            opportunity_id: None,
            cost_center: String::new(),
            state: ProjectState::Planned,
            start_date: None,
            estimated_duration: None,
            physical_percent_complete: None,
            last_progress_update: None,
        }
    }

    /// 工期（月），未填写或为 0 时取默认值
    pub fn duration_or(&self, default_months: u32) -> u32 {
        match self.estimated_duration {
            Some(d) if d > 0 => d,
            _ => default_months,
        }
    }
}

// ==========================================
// ProgressRecord - 月度进度日志
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub project_id: String,
    pub month_number: u32,
    pub planned_percentage: Decimal,
    pub actual_percentage: Decimal,
    pub record_date: NaiveDate,
}

// ==========================================
// BudgetChange - 预算变更（变更单 / 重新基线）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetChange {
    pub project_id: String,
    pub amount: Decimal, // 正数增加，负数削减
    pub status: ApprovalStatus,
    pub reason: String,
    pub change_date: Option<NaiveDate>,
}
