// ==========================================
// 工程项目挣值管理系统 - 预算基线
// ==========================================
// 职责: 基线汇总 (BudgetBaseline) 与月度基线点 (MonthlyBaselinePoint)
// 约束: 月度点按 month_index (1..N) 排序，各序列为累计值且非递减
// ==========================================

use crate::domain::project::{Opportunity, Project};
use chrono::{Datelike, Month, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 基线默认版本名
pub const DEFAULT_VERSION_NAME: &str = "initial";

// ==========================================
// BudgetBaseline - 基线汇总（每个项目一条）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetBaseline {
    pub project_id: String,
    pub version_name: String,
    pub start_date: Option<NaiveDate>,
    pub duration_months: u32,
    pub bac_planned: Decimal,
    pub contract_planned: Decimal,
    pub notes: String,
}

impl BudgetBaseline {
    /// 空基线（字段待 ensure_defaults 补齐）
    pub fn empty(project_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            version_name: DEFAULT_VERSION_NAME.to_string(),
            start_date: None,
            duration_months: 0,
            bac_planned: Decimal::ZERO,
            contract_planned: Decimal::ZERO,
            notes: String::new(),
        }
    }

    /// 补齐缺失字段
    ///
    /// - start_date: 项目开工日期，否则 today
    /// - duration_months: 未设置或小于 2 时取项目工期（默认值兜底），最少 1
    /// - bac_planned: 机会成本测算合计，否则概算
    /// - contract_planned: 机会概算
    ///
    /// # 返回
    /// 是否有字段被修改
    pub fn ensure_defaults(
        &mut self,
        project: &Project,
        opportunity: Option<&Opportunity>,
        today: NaiveDate,
        default_duration_months: u32,
    ) -> bool {
        let before = self.clone();

        if self.start_date.is_none() {
            self.start_date = Some(project.start_date.unwrap_or(today));
        }
        if self.duration_months < 2 {
            self.duration_months = project.duration_or(default_duration_months).max(1);
        }
        if self.bac_planned.is_zero() {
            self.bac_planned = opportunity
                .and_then(Opportunity::cost_baseline)
                .unwrap_or(Decimal::ZERO);
        }
        if self.contract_planned.is_zero() {
            self.contract_planned = opportunity
                .and_then(Opportunity::contract_value)
                .unwrap_or(Decimal::ZERO);
        }

        *self != before
    }
}

// ==========================================
// MonthlyBaselinePoint - 月度基线点（累计值）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBaselinePoint {
    pub project_id: String,
    pub month_index: u32, // 1..N
    pub pv_planned: Decimal,
    pub ev_planned: Decimal,
    pub ac_planned: Decimal,
    pub client_billing_planned: Decimal,
    pub progress_planned: Decimal, // 0..100
    pub label: String,
}

// ==========================================
// MonthlyArrays - 月度基线数组（供曲线展示）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyArrays {
    pub months: Vec<u32>,
    pub labels: Vec<String>,
    pub pv: Vec<Decimal>,
    pub ev: Vec<Decimal>,
    pub ac: Vec<Decimal>,
    pub billing: Vec<Decimal>,
    pub progress: Vec<Decimal>,
    /// true 表示未落库的临时计算结果
    pub ephemeral: bool,
}

impl MonthlyArrays {
    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    /// 从已排序的月度点构造
    pub fn from_points(points: &[MonthlyBaselinePoint]) -> Self {
        Self {
            months: points.iter().map(|p| p.month_index).collect(),
            labels: points.iter().map(|p| p.label.clone()).collect(),
            pv: points.iter().map(|p| p.pv_planned).collect(),
            ev: points.iter().map(|p| p.ev_planned).collect(),
            ac: points.iter().map(|p| p.ac_planned).collect(),
            billing: points.iter().map(|p| p.client_billing_planned).collect(),
            progress: points.iter().map(|p| p.progress_planned).collect(),
            ephemeral: false,
        }
    }
}

/// 月份标签，例如 "January 2025"
///
/// # 参数
/// - start: 基线起始日期
/// - offset: 相对起始月的偏移（0 为起始月）
pub fn month_label(start: NaiveDate, offset: u32) -> String {
    let zero_based = start.month0() + offset;
    let year = start.year() + (zero_based / 12) as i32;
    let month = (zero_based % 12) as u8 + 1;
    let name = Month::try_from(month).map(|m| m.name()).unwrap_or("");
    format!("{} {}", name, year)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_label_rolls_over_year() {
        let start = date(2024, 11, 15);
        assert_eq!(month_label(start, 0), "November 2024");
        assert_eq!(month_label(start, 1), "December 2024");
        assert_eq!(month_label(start, 2), "January 2025");
        assert_eq!(month_label(start, 14), "January 2026");
    }

    #[test]
    fn test_ensure_defaults_from_project_and_opportunity() {
        let mut project = Project::new("P-1");
        project.start_date = Some(date(2025, 1, 1));
        project.estimated_duration = Some(6);
        let opportunity = Opportunity {
            opportunity_id: "OPP-1".to_string(),
            name: String::new(),
            total_costs: None,
            cost_aprox: Some(dec!(9000)),
        };

        let mut baseline = BudgetBaseline::empty("P-1");
        let changed = baseline.ensure_defaults(&project, Some(&opportunity), date(2025, 6, 1), 12);

        assert!(changed);
        assert_eq!(baseline.start_date, Some(date(2025, 1, 1)));
        assert_eq!(baseline.duration_months, 6);
        assert_eq!(baseline.bac_planned, dec!(9000));
        assert_eq!(baseline.contract_planned, dec!(9000));
    }

    #[test]
    fn test_ensure_defaults_uses_today_and_default_duration() {
        let project = Project::new("P-2");
        let mut baseline = BudgetBaseline::empty("P-2");
        baseline.ensure_defaults(&project, None, date(2025, 6, 1), 12);

        assert_eq!(baseline.start_date, Some(date(2025, 6, 1)));
        assert_eq!(baseline.duration_months, 12);
        assert_eq!(baseline.bac_planned, Decimal::ZERO);
    }

    #[test]
    fn test_ensure_defaults_keeps_existing_values() {
        let project = Project::new("P-3");
        let mut baseline = BudgetBaseline::empty("P-3");
        baseline.start_date = Some(date(2024, 5, 1));
        baseline.duration_months = 8;
        baseline.bac_planned = dec!(100);
        baseline.contract_planned = dec!(120);

        let changed = baseline.ensure_defaults(&project, None, date(2025, 6, 1), 12);
        assert!(!changed);
        assert_eq!(baseline.duration_months, 8);
    }
}
