// ==========================================
// 工程项目挣值管理系统 - 挣值计算器
// ==========================================
// 流水线（calculate_earned_value）:
// 1. BAC = 机会成本基线 + 已审批预算变更（无成本基线即报错）
// 2. 工期 + 安全开工日期（有序兜底链）
// 3. 物理进度 → EV 总额 = BAC × 进度 / 100
// 4. AC: 供应商发票按自然月分桶，无发票时按订单明细分桶
// 5. PV: 全工期线性斜坡（不按"今天"截断）
// 6. 与持久化基线整合: PV 取基线；无进度时 EV 取基线；AC 全零时取基线
// 7. 四条序列非递减修正后计算末期指标
// 8. 周/日粒度曲线
// 红线: 除 BAC 外，所有子计算缺数据时降级为零序列，不报错
// ==========================================

use crate::config::EvmSettings;
use crate::domain::cost::{PoLineItem, SupplierInvoice};
use crate::domain::evm::{
    CurveData, EarnedValueResult, EarnedValueSnapshot, EvmMetrics, GranularCurve,
    PmiDashboardData,
};
use crate::domain::project::Project;
use crate::domain::types::{ApprovalStatus, CostSource};
use crate::engine::activity_calculator::ActivityCalculator;
use crate::engine::baseline_service::BaselineService;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::fallback::FallbackChain;
use crate::engine::repositories::EvmRepositories;
use crate::engine::series::{
    clamp_index, cumulative, day_bucket, ensure_non_decreasing, is_all_zero, last_or_zero,
    month_offset, ramp,
};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use tracing::instrument;

/// 周粒度 / 日粒度的分桶天数
pub const WEEKLY_INTERVAL_DAYS: u32 = 7;
pub const DAILY_INTERVAL_DAYS: u32 = 1;

/// 粒度换算按每月 30 天
const DAYS_PER_MONTH: u32 = 30;

/// 成本单据（AC 计算输入）
#[derive(Debug, Clone, Default)]
pub struct CostInputs {
    pub invoices: Vec<SupplierInvoice>,
    pub po_lines: Vec<PoLineItem>,
}

impl CostInputs {
    /// 发票优先，其次订单明细
    pub fn source(&self) -> CostSource {
        if !self.invoices.is_empty() {
            CostSource::SupplierInvoices
        } else if !self.po_lines.is_empty() {
            CostSource::PurchaseOrders
        } else {
            CostSource::None
        }
    }
}

// ==========================================
// EarnedValueCalculator
// ==========================================
pub struct EarnedValueCalculator {
    repos: EvmRepositories,
    settings: EvmSettings,
    reference_date: Option<NaiveDate>,
}

impl EarnedValueCalculator {
    pub fn new(repos: EvmRepositories) -> Self {
        Self {
            repos,
            settings: EvmSettings::default(),
            reference_date: None,
        }
    }

    pub fn with_settings(mut self, settings: EvmSettings) -> Self {
        self.settings = settings;
        self
    }

    /// 固定"今天"（测试 / 历史回放）
    pub fn with_reference_date(mut self, today: NaiveDate) -> Self {
        self.reference_date = Some(today);
        self
    }

    pub fn settings(&self) -> &EvmSettings {
        &self.settings
    }

    fn today(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    pub fn activity_calculator(&self) -> ActivityCalculator {
        ActivityCalculator::new(self.repos.clone())
            .with_weight_tolerance(self.settings.weight_tolerance)
    }

    pub fn baseline_service(&self) -> BaselineService {
        BaselineService::new(self.repos.clone())
            .with_default_duration(self.settings.default_duration_months)
            .with_reference_date(self.today())
    }

    fn load_project(&self, project_id: &str) -> EngineResult<Project> {
        self.repos
            .project_repo
            .find_project(project_id)?
            .ok_or_else(|| EngineError::ProjectNotFound(project_id.to_string()))
    }

    // ==========================================
    // 主流程
    // ==========================================

    /// 计算项目挣值（曲线 + 指标）
    #[instrument(skip(self))]
    pub fn calculate_earned_value(&self, project_id: &str) -> EngineResult<EarnedValueResult> {
        let project = self.load_project(project_id)?;

        // 1. BAC（唯一的致命错误）
        let bac = self.get_bac_real(&project)?;

        // 2. 工期与开工日期
        let planned_duration = project.duration_or(self.settings.default_duration_months) as usize;
        let start_date = self.get_safe_start_date(&project);

        // 3. 物理进度
        let physical_progress = match self.activity_calculator().calculate_physical_progress(&project) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(project_id, error = %e, "物理进度计算失败，按 0 处理");
                Decimal::ZERO
            }
        };
        let ev_total = bac * physical_progress / Decimal::ONE_HUNDRED;

        // 4. 持久化基线（有则以基线月数为准）
        let baseline = match self.baseline_service().get_monthly_arrays(project_id) {
            Ok(arrays) if !arrays.is_empty() => Some(arrays),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(project_id, error = %e, "读取基线失败，按项目工期计算");
                None
            }
        };
        let duration = baseline
            .as_ref()
            .map(|b| b.len())
            .unwrap_or(planned_duration);

        // 5. 成本单据
        let costs = self.load_cost_inputs(project_id);
        let ac_source = costs.source();

        let mut pv = ramp(bac, duration);
        let mut ev = ramp(ev_total, duration);
        let mut ac = monthly_actual_cost(&costs, duration, &self.settings);
        let ac_paid = self.calculate_verified_payments_series(&project, duration);

        // 6. 基线整合
        if let Some(arrays) = &baseline {
            pv = arrays.pv.clone();

            let has_progress = physical_progress > Decimal::ZERO && ev_total > Decimal::ZERO;
            if !has_progress {
                ev = arrays.ev.clone();
            }
            if is_all_zero(&ac) {
                tracing::debug!(project_id, "实际成本全为零，使用基线 AC");
                ac = arrays.ac.clone();
            }
            tracing::debug!(
                project_id,
                months = duration,
                ephemeral = arrays.ephemeral,
                has_progress,
                "已整合月度基线"
            );
        }

        // 7. 非递减修正 + 指标
        let pv = ensure_non_decreasing(pv);
        let ev = ensure_non_decreasing(ev);
        let ac = ensure_non_decreasing(ac);
        let ac_paid = ensure_non_decreasing(ac_paid);
        let metrics = calculate_metrics(&pv, &ev, &ac, bac);

        // 8. 周/日曲线
        let curve_data_weekly = granular_curve(
            &costs,
            duration,
            bac,
            ev_total,
            WEEKLY_INTERVAL_DAYS,
            &self.settings,
        );
        let curve_data_daily = granular_curve(
            &costs,
            duration,
            bac,
            ev_total,
            DAILY_INTERVAL_DAYS,
            &self.settings,
        );

        tracing::info!(
            project_id,
            bac = %bac,
            physical_progress = %physical_progress,
            ac_source = %ac_source,
            cpi = %metrics.cpi,
            spi = %metrics.spi,
            "挣值计算完成"
        );

        Ok(EarnedValueResult {
            project_id: project_id.to_string(),
            curve_data: CurveData {
                months: (1..=duration as u32).collect(),
                pv,
                ev,
                ac,
                ac_paid,
            },
            curve_data_weekly,
            curve_data_daily,
            metrics,
            bac_calculated: bac,
            physical_progress,
            pmi_compliant: true,
            start_date,
            ac_source,
        })
    }

    /// 驾驶舱数据: 挣值结果 + 物理进度明细
    #[instrument(skip(self))]
    pub fn get_pmi_dashboard_data(&self, project_id: &str) -> EngineResult<PmiDashboardData> {
        let evm = self.calculate_earned_value(project_id)?;
        let physical_detail = self
            .activity_calculator()
            .get_physical_progress_detail(project_id)?;
        Ok(PmiDashboardData {
            evm,
            physical_detail,
        })
    }

    /// 计算并覆盖保存项目挣值快照
    #[instrument(skip(self))]
    pub fn refresh_snapshot(
        &self,
        project_id: &str,
        analysis_date: NaiveDateTime,
    ) -> EngineResult<EarnedValueSnapshot> {
        let result = self.calculate_earned_value(project_id)?;
        let snapshot = EarnedValueSnapshot::from_result(&result, analysis_date);
        self.repos.earned_value_repo.save_snapshot(&snapshot)?;
        tracing::info!(project_id, snapshot_id = %snapshot.snapshot_id, "挣值快照已保存");
        Ok(snapshot)
    }

    // ==========================================
    // BAC
    // ==========================================

    /// BAC = 机会成本基线（成本测算合计优先，其次概算）+ 已审批预算变更
    pub fn get_bac_real(&self, project: &Project) -> EngineResult<Decimal> {
        let opportunity = match project.opportunity_id.as_deref() {
            Some(id) => self.repos.project_repo.find_opportunity(id)?,
            None => None,
        };

        let base = opportunity
            .as_ref()
            .and_then(|o| o.cost_baseline())
            .ok_or_else(|| EngineError::MissingCostBaseline {
                project_id: project.project_id.clone(),
            })?;

        let changes = match self.repos.project_repo.list_budget_changes(&project.project_id) {
            Ok(changes) => changes
                .iter()
                .filter(|c| c.status == ApprovalStatus::Approved)
                .map(|c| c.amount)
                .sum(),
            Err(e) => {
                tracing::warn!(project_id = %project.project_id, error = %e, "读取预算变更失败，按 0 处理");
                Decimal::ZERO
            }
        };

        tracing::debug!(project_id = %project.project_id, base = %base, changes = %changes, "BAC 已确定");
        Ok(base + changes)
    }

    // ==========================================
    // 开工日期
    // ==========================================

    /// 安全开工日期（不晚于今天的第一个可用日期）
    ///
    /// 优先级: 项目开工日 → 首张采购订单 → 首个活动创建日 → 最近进度更新日；
    /// 全部不可用时退回项目开工日（可能为未来日期或空）
    pub fn get_safe_start_date(&self, project: &Project) -> Option<NaiveDate> {
        let today = self.today();
        let not_future = move |d: Option<NaiveDate>| d.filter(|d| *d <= today);
        let project_id = project.project_id.as_str();

        let chain = FallbackChain::new("safe_start_date")
            .then("project_start_date", || Ok(not_future(project.start_date)))
            .then("first_purchase_order", || {
                Ok(not_future(self.repos.cost_repo.first_po_issue_date(project_id)?))
            })
            .then("first_activity", || {
                let activities = self.repos.activity_repo.list_active(project_id)?;
                let first = activities.iter().map(|a| a.created_at.date()).min();
                Ok(not_future(first))
            })
            .then("last_progress_update", || {
                Ok(not_future(project.last_progress_update))
            });

        chain.resolve().map(|r| r.value).or(project.start_date)
    }

    // ==========================================
    // 成本与回款
    // ==========================================

    /// 读取成本单据（读取失败降级为空）
    pub fn load_cost_inputs(&self, project_id: &str) -> CostInputs {
        let invoices = self
            .repos
            .cost_repo
            .list_supplier_invoices(project_id)
            .unwrap_or_else(|e| {
                tracing::warn!(project_id, error = %e, "读取供应商发票失败");
                Vec::new()
            });

        // 有发票时不再需要订单明细
        let po_lines = if invoices.is_empty() {
            self.repos
                .cost_repo
                .list_po_lines(project_id)
                .unwrap_or_else(|e| {
                    tracing::warn!(project_id, error = %e, "读取采购订单明细失败");
                    Vec::new()
                })
        } else {
            Vec::new()
        };

        CostInputs { invoices, po_lines }
    }

    /// 月度累计 AC（长度 = duration）
    pub fn calculate_actual_cost_real(&self, project_id: &str, duration: usize) -> Vec<Decimal> {
        monthly_actual_cost(&self.load_cost_inputs(project_id), duration, &self.settings)
    }

    /// 客户已核实回款的月度累计序列
    ///
    /// 仅统计 PAYMENT_VERIFIED / PAID；月序号相对项目开工日（无则今天），超出范围的忽略
    pub fn calculate_verified_payments_series(
        &self,
        project: &Project,
        duration: usize,
    ) -> Vec<Decimal> {
        let invoices = match self.repos.client_invoice_repo.list_by_project(&project.project_id) {
            Ok(invoices) => invoices,
            Err(e) => {
                tracing::warn!(project_id = %project.project_id, error = %e, "读取客户发票失败");
                return vec![Decimal::ZERO; duration];
            }
        };

        let reference = project.start_date.unwrap_or_else(|| self.today());
        let mut monthly = vec![Decimal::ZERO; duration];
        for invoice in invoices.iter().filter(|i| i.status.is_verified()) {
            let Some(paid_on) = invoice.payment_date() else {
                continue;
            };
            let idx = month_offset(reference, paid_on);
            if idx < 0 || idx >= duration as i64 {
                continue;
            }
            monthly[idx as usize] += invoice.collected_amount();
        }
        cumulative(&monthly)
    }
}

// ==========================================
// 纯计算
// ==========================================

/// 末期累计值计算核心指标；任一序列为空时返回中性指标
pub fn calculate_metrics(pv: &[Decimal], ev: &[Decimal], ac: &[Decimal], bac: Decimal) -> EvmMetrics {
    if pv.is_empty() || ev.is_empty() || ac.is_empty() {
        return EvmMetrics::neutral(bac);
    }

    let current_pv = last_or_zero(pv);
    let current_ev = last_or_zero(ev);
    let current_ac = last_or_zero(ac);

    let cpi = if current_ac > Decimal::ZERO {
        current_ev / current_ac
    } else {
        Decimal::ONE
    };
    let spi = if current_pv > Decimal::ZERO {
        current_ev / current_pv
    } else {
        Decimal::ONE
    };
    let eac = if cpi > Decimal::ZERO { bac / cpi } else { bac };

    EvmMetrics {
        cpi,
        spi,
        cv: current_ev - current_ac,
        sv: current_ev - current_pv,
        eac,
        etc: eac - current_ac,
        vac: bac - eac,
    }
}

/// 月度累计 AC
///
/// - 发票: 以首张有日期发票的月份为第 1 期，按自然月分桶
/// - 订单明细: 以首个有日期订单为起点，按 cost_bucket_days 分桶
/// - 超出工期的金额计入末期
pub fn monthly_actual_cost(costs: &CostInputs, duration: usize, settings: &EvmSettings) -> Vec<Decimal> {
    if duration == 0 {
        return Vec::new();
    }

    let mut buckets = vec![Decimal::ZERO; duration];
    match costs.source() {
        CostSource::SupplierInvoices => {
            let Some(first) = costs.invoices.iter().filter_map(|i| i.issue_date).min() else {
                return buckets;
            };
            for invoice in &costs.invoices {
                let Some(issued) = invoice.issue_date else {
                    continue;
                };
                let idx = clamp_index(month_offset(first, issued), duration);
                buckets[idx] += invoice.local_amount(&settings.local_currency);
            }
        }
        CostSource::PurchaseOrders => {
            add_po_lines(&mut buckets, &costs.po_lines, settings.cost_bucket_days);
        }
        CostSource::None => {}
    }
    cumulative(&buckets)
}

/// 按固定天数分桶的累计 AC（周/日曲线）
pub fn interval_actual_cost(
    costs: &CostInputs,
    units: usize,
    interval_days: u32,
    settings: &EvmSettings,
) -> Vec<Decimal> {
    if units == 0 {
        return Vec::new();
    }

    let mut buckets = vec![Decimal::ZERO; units];
    match costs.source() {
        CostSource::SupplierInvoices => {
            let Some(first) = costs.invoices.iter().filter_map(|i| i.issue_date).min() else {
                return buckets;
            };
            for invoice in &costs.invoices {
                let Some(issued) = invoice.issue_date else {
                    continue;
                };
                let idx = clamp_index(day_bucket(first, issued, interval_days), units);
                buckets[idx] += invoice.local_amount(&settings.local_currency);
            }
        }
        CostSource::PurchaseOrders => {
            add_po_lines(&mut buckets, &costs.po_lines, interval_days);
        }
        CostSource::None => {}
    }
    cumulative(&buckets)
}

fn add_po_lines(buckets: &mut [Decimal], lines: &[PoLineItem], interval_days: u32) {
    let Some(first) = lines.iter().filter_map(|l| l.po_issue_date).min() else {
        return;
    };
    for line in lines {
        let Some(issued) = line.po_issue_date else {
            continue;
        };
        let idx = clamp_index(day_bucket(first, issued, interval_days), buckets.len());
        buckets[idx] += line.local_amount();
    }
}

/// 周/日粒度曲线: 期数 = max(1, 月数 × (30 / interval))
pub fn granular_curve(
    costs: &CostInputs,
    duration_months: usize,
    bac: Decimal,
    ev_total: Decimal,
    interval_days: u32,
    settings: &EvmSettings,
) -> GranularCurve {
    let interval_days = interval_days.max(1);
    let units = (duration_months * (DAYS_PER_MONTH / interval_days) as usize).max(1);

    GranularCurve {
        labels: (1..=units as u32).collect(),
        pv: ramp(bac, units),
        ev: ramp(ev_total, units),
        ac: interval_actual_cost(costs, units, interval_days, settings),
        interval_days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn invoice(id: &str, issued: Option<NaiveDate>, amount: Decimal, currency: &str, rate: Option<Decimal>) -> SupplierInvoice {
        SupplierInvoice {
            invoice_id: id.to_string(),
            po_id: "PO-1".to_string(),
            invoice_number: id.to_string(),
            issue_date: issued,
            total_amount: amount,
            currency: currency.to_string(),
            exchange_rate: rate,
        }
    }

    fn line(issued: NaiveDate, total: Option<Decimal>, local: Option<Decimal>) -> PoLineItem {
        PoLineItem {
            po_id: "PO-1".to_string(),
            po_issue_date: Some(issued),
            description: "光缆".to_string(),
            total,
            local_total: local,
        }
    }

    #[test]
    fn test_metrics_end_to_end_numbers() {
        let pv = ramp(dec!(20000), 4);
        let ev = ramp(dec!(10000), 4);
        let ac = vec![dec!(2000), dec!(4000), dec!(6000), dec!(8000)];

        let m = calculate_metrics(&pv, &ev, &ac, dec!(20000));
        assert_eq!(m.cpi, dec!(1.25));
        assert_eq!(m.spi, dec!(0.5));
        assert_eq!(m.cv, dec!(2000));
        assert_eq!(m.sv, dec!(-10000));
        assert_eq!(m.eac, dec!(16000));
        assert_eq!(m.etc, dec!(8000));
        assert_eq!(m.vac, dec!(4000));
    }

    #[test]
    fn test_metrics_default_indices_when_zero() {
        let zeros = vec![Decimal::ZERO; 3];
        let ev = vec![dec!(10), dec!(20), dec!(30)];
        let m = calculate_metrics(&zeros, &ev, &zeros, dec!(100));
        assert_eq!(m.cpi, Decimal::ONE);
        assert_eq!(m.spi, Decimal::ONE);
        assert_eq!(m.eac, dec!(100));
    }

    #[test]
    fn test_metrics_neutral_when_empty() {
        assert_eq!(calculate_metrics(&[], &[], &[], dec!(500)), EvmMetrics::neutral(dec!(500)));
    }

    #[test]
    fn test_monthly_ac_from_invoices_by_calendar_month() {
        let settings = EvmSettings::default();
        let costs = CostInputs {
            invoices: vec![
                invoice("F1", Some(date(2025, 1, 31)), dec!(100), "PEN", None),
                invoice("F2", Some(date(2025, 2, 1)), dec!(50), "USD", Some(dec!(3.5))),
                invoice("F3", None, dec!(999), "PEN", None),
                invoice("F4", Some(date(2025, 9, 1)), dec!(10), "pen", Some(dec!(4))),
            ],
            po_lines: vec![],
        };

        let ac = monthly_actual_cost(&costs, 3, &settings);
        // 1 月 100；2 月 50×3.5；9 月超出工期计入末期
        assert_eq!(ac, vec![dec!(100), dec!(275), dec!(285)]);
    }

    #[test]
    fn test_monthly_ac_from_po_lines() {
        let settings = EvmSettings::default();
        let costs = CostInputs {
            invoices: vec![],
            po_lines: vec![
                line(date(2025, 1, 1), Some(dec!(100)), Some(dec!(90))),
                line(date(2025, 1, 31), Some(dec!(40)), None),
                line(date(2025, 3, 15), None, None),
            ],
        };
        assert_eq!(costs.source(), CostSource::PurchaseOrders);

        let ac = monthly_actual_cost(&costs, 4, &settings);
        assert_eq!(ac, vec![dec!(90), dec!(130), dec!(130), dec!(130)]);
    }

    #[test]
    fn test_monthly_ac_empty_sources() {
        let costs = CostInputs::default();
        assert_eq!(costs.source(), CostSource::None);
        assert_eq!(
            monthly_actual_cost(&costs, 2, &EvmSettings::default()),
            vec![Decimal::ZERO, Decimal::ZERO]
        );
    }

    #[test]
    fn test_granular_curve_sizes() {
        let settings = EvmSettings::default();
        let costs = CostInputs {
            invoices: vec![
                invoice("F1", Some(date(2025, 1, 1)), dec!(10), "PEN", None),
                invoice("F2", Some(date(2025, 1, 9)), dec!(5), "PEN", None),
            ],
            po_lines: vec![],
        };

        let weekly = granular_curve(&costs, 2, dec!(800), dec!(400), WEEKLY_INTERVAL_DAYS, &settings);
        assert_eq!(weekly.labels.len(), 8);
        assert_eq!(weekly.interval_days, 7);
        assert_eq!(weekly.pv[7], dec!(800));
        assert_eq!(weekly.ev[3], dec!(200));
        assert_eq!(weekly.ac[0], dec!(10));
        assert_eq!(weekly.ac[1], dec!(15));

        let daily = granular_curve(&costs, 2, dec!(800), dec!(400), DAILY_INTERVAL_DAYS, &settings);
        assert_eq!(daily.labels.len(), 60);

        let empty = granular_curve(&costs, 0, dec!(800), dec!(400), WEEKLY_INTERVAL_DAYS, &settings);
        assert_eq!(empty.labels, vec![1]);
    }
}
