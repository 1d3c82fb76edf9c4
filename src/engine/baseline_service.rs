// ==========================================
// 工程项目挣值管理系统 - 基线服务
// ==========================================
// 职责: 建立/读取项目月度基线（PV/EV/AC/开票/计划进度）
// 规则:
// - ensure_baseline 幂等: 只补齐缺失月份，从不覆盖已有行
// - 月度行不足 2 条时补建；仍不可用则返回临时（ephemeral）数组，不落库
// - 所有序列为线性累计，末期强制等于总额
// ==========================================

use crate::domain::baseline::{month_label, BudgetBaseline, MonthlyArrays, MonthlyBaselinePoint};
use crate::domain::project::{Opportunity, Project};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::repositories::EvmRepositories;
use crate::engine::series::{ensure_non_decreasing, linear_series};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use tracing::instrument;

/// 项目未填工期时的默认月数
pub const DEFAULT_DURATION_MONTHS: u32 = 12;

// ==========================================
// BaselineService
// ==========================================
pub struct BaselineService {
    repos: EvmRepositories,
    default_duration_months: u32,
    reference_date: Option<NaiveDate>,
}

impl BaselineService {
    pub fn new(repos: EvmRepositories) -> Self {
        Self {
            repos,
            default_duration_months: DEFAULT_DURATION_MONTHS,
            reference_date: None,
        }
    }

    pub fn with_default_duration(mut self, months: u32) -> Self {
        self.default_duration_months = months.max(1);
        self
    }

    /// 固定"今天"（测试 / 历史回放）
    pub fn with_reference_date(mut self, today: NaiveDate) -> Self {
        self.reference_date = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    fn load_project(&self, project_id: &str) -> EngineResult<(Project, Option<Opportunity>)> {
        let project = self
            .repos
            .project_repo
            .find_project(project_id)?
            .ok_or_else(|| EngineError::ProjectNotFound(project_id.to_string()))?;

        let opportunity = match project.opportunity_id.as_deref() {
            Some(opportunity_id) => self.repos.project_repo.find_opportunity(opportunity_id)?,
            None => None,
        };
        Ok((project, opportunity))
    }

    // ==========================================
    // 建立基线
    // ==========================================

    /// 获取或创建基线，补齐缺失字段与缺失月份
    #[instrument(skip(self))]
    pub fn ensure_baseline(&self, project_id: &str) -> EngineResult<BudgetBaseline> {
        let (project, opportunity) = self.load_project(project_id)?;

        let existing = self.repos.baseline_repo.find_baseline(project_id)?;
        let is_new = existing.is_none();
        let mut baseline = existing.unwrap_or_else(|| BudgetBaseline::empty(project_id));

        let changed = baseline.ensure_defaults(
            &project,
            opportunity.as_ref(),
            self.today(),
            self.default_duration_months,
        );
        if is_new || changed {
            self.repos.baseline_repo.save_baseline(&baseline)?;
        }

        // 目标月份 - 已有月份 = 待补月份
        let present = self.repos.baseline_repo.existing_month_indices(project_id)?;
        let missing: BTreeSet<u32> = (1..=baseline.duration_months)
            .collect::<BTreeSet<u32>>()
            .difference(&present)
            .copied()
            .collect();

        if !missing.is_empty() {
            let points: Vec<MonthlyBaselinePoint> = build_points(&baseline, self.today())
                .into_iter()
                .filter(|p| missing.contains(&p.month_index))
                .collect();
            let inserted = self.repos.baseline_repo.insert_points(&points)?;
            tracing::info!(project_id, inserted, "月度基线已补齐");
        }

        Ok(baseline)
    }

    // ==========================================
    // 读取基线数组
    // ==========================================

    /// 月度基线数组（按 month_index 升序）
    ///
    /// 持久化数据不可用时退回临时计算，结果 `ephemeral = true`
    #[instrument(skip(self))]
    pub fn get_monthly_arrays(&self, project_id: &str) -> EngineResult<MonthlyArrays> {
        let (project, opportunity) = self.load_project(project_id)?;

        match self.repos.baseline_repo.list_points(project_id) {
            Ok(points) if points.len() >= 2 => return Ok(MonthlyArrays::from_points(&points)),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(project_id, error = %e, "读取月度基线失败，使用临时基线");
                return Ok(self.ephemeral_arrays(&project, opportunity.as_ref()));
            }
        }

        // 行数不足: 补建后重读
        let reloaded = self
            .ensure_baseline(project_id)
            .and_then(|_| {
                self.repos
                    .baseline_repo
                    .list_points(project_id)
                    .map_err(EngineError::from)
            });

        match reloaded {
            Ok(points) if !points.is_empty() => Ok(MonthlyArrays::from_points(&points)),
            Ok(_) => {
                tracing::warn!(project_id, "补建后仍无月度基线，使用临时基线");
                Ok(self.ephemeral_arrays(&project, opportunity.as_ref()))
            }
            Err(e) => {
                tracing::warn!(project_id, error = %e, "补建月度基线失败，使用临时基线");
                Ok(self.ephemeral_arrays(&project, opportunity.as_ref()))
            }
        }
    }

    /// 不落库的临时基线: 工期取项目工期（默认值兜底），
    /// BAC 取机会成本测算合计，合同额取机会概算
    pub fn ephemeral_arrays(
        &self,
        project: &Project,
        opportunity: Option<&Opportunity>,
    ) -> MonthlyArrays {
        let months = project.duration_or(self.default_duration_months);
        let start = project.start_date.unwrap_or_else(|| self.today());
        let bac = opportunity
            .and_then(|o| o.total_costs)
            .unwrap_or(Decimal::ZERO);
        let contract = opportunity
            .and_then(|o| o.cost_aprox)
            .unwrap_or(Decimal::ZERO);

        let mut baseline = BudgetBaseline::empty(&project.project_id);
        baseline.start_date = Some(start);
        baseline.duration_months = months;
        baseline.bac_planned = bac;
        baseline.contract_planned = contract;

        let mut arrays = MonthlyArrays::from_points(&build_points(&baseline, start));
        arrays.ephemeral = true;
        arrays
    }

    // ==========================================
    // 按计划进度重算 PV
    // ==========================================

    /// 用月度累计计划进度重算 PV，EV 同步为 PV，末期强制为 BAC
    ///
    /// # 返回
    /// 重算的月份数
    #[instrument(skip(self))]
    pub fn recalculate_pv_from_progress(&self, project_id: &str) -> EngineResult<usize> {
        let baseline = match self.repos.baseline_repo.find_baseline(project_id)? {
            Some(b) => b,
            None => self.ensure_baseline(project_id)?,
        };

        let mut points = self.repos.baseline_repo.list_points(project_id)?;
        if points.is_empty() {
            self.ensure_baseline(project_id)?;
            points = self.repos.baseline_repo.list_points(project_id)?;
        }

        let values = pv_from_progress(baseline.bac_planned, &points);
        self.repos.baseline_repo.update_pv_ev(project_id, &values)?;
        tracing::info!(project_id, months = values.len(), bac = %baseline.bac_planned, "PV 已按计划进度重算");
        Ok(values.len())
    }

    /// 写入外部计划进度后重算 PV
    ///
    /// # 参数
    /// - progress: (month_index, 累计计划百分比)
    pub fn apply_planned_progress(
        &self,
        project_id: &str,
        progress: &[(u32, Decimal)],
    ) -> EngineResult<usize> {
        if progress.iter().any(|(month, _)| *month == 0) {
            return Err(EngineError::InvalidInput(
                "month_index 从 1 开始".to_string(),
            ));
        }

        self.ensure_baseline(project_id)?;
        self.repos
            .baseline_repo
            .update_progress_planned(project_id, progress)?;
        self.recalculate_pv_from_progress(project_id)
    }
}

// ==========================================
// 纯计算
// ==========================================

/// 按基线汇总生成 1..N 月的全部月度点
///
/// today 仅在基线未设置开始日期时用于生成月份标签
pub fn build_points(baseline: &BudgetBaseline, today: NaiveDate) -> Vec<MonthlyBaselinePoint> {
    let months = baseline.duration_months as usize;
    let start = baseline.start_date.unwrap_or(today);

    let pv = linear_series(baseline.bac_planned, months);
    let ac = linear_series(baseline.bac_planned, months);
    let billing = linear_series(baseline.contract_planned, months);
    let progress = linear_series(Decimal::ONE_HUNDRED, months);

    (0..months)
        .map(|i| MonthlyBaselinePoint {
            project_id: baseline.project_id.clone(),
            month_index: i as u32 + 1,
            pv_planned: pv[i],
            // 无实际进度时计划 EV 与 PV 一致
            ev_planned: pv[i],
            ac_planned: ac[i],
            client_billing_planned: billing[i],
            progress_planned: progress[i],
            label: month_label(start, i as u32),
        })
        .collect()
}

/// 计划进度 → (month_index, PV, EV)
///
/// 进度夹到 [0, 100] 且不下降；末期 PV/EV 强制为 BAC
pub fn pv_from_progress(
    bac: Decimal,
    points: &[MonthlyBaselinePoint],
) -> Vec<(u32, Decimal, Decimal)> {
    let pct = ensure_non_decreasing(points.iter().map(|p| p.progress_planned).collect());

    let mut values: Vec<(u32, Decimal, Decimal)> = points
        .iter()
        .zip(pct)
        .map(|(point, pct)| {
            let pct = pct.min(Decimal::ONE_HUNDRED);
            let pv = bac * pct / Decimal::ONE_HUNDRED;
            (point.month_index, pv, pv)
        })
        .collect();

    if let Some(last) = values.last_mut() {
        last.1 = bac;
        last.2 = bac;
    }
    values
}
