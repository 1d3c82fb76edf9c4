// ==========================================
// 工程项目挣值管理系统 - 物理进度计算器
// ==========================================
// 职责: 活动权重归一化 + 加权物理进度
// 权重: (复杂度 + 工作量 + 影响度) / 全部有效活动评分合计 × 100
// 进度: Σ(权重 × 完成百分比) / 100
// 兜底: 无有效活动时依次取 进度日志最大实际值 → 项目进度字段 → 0
// ==========================================

use crate::domain::activity::Activity;
use crate::domain::evm::{ActivityDetail, PhysicalProgressDetail};
use crate::domain::project::Project;
use crate::domain::types::ProgressSource;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::fallback::FallbackChain;
use crate::engine::repositories::EvmRepositories;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use tracing::instrument;

/// 权重合计与 100 的允许偏差
pub const DEFAULT_WEIGHT_TOLERANCE: Decimal = dec!(0.05);

/// 权重精度（2 位小数）
const WEIGHT_STEP: Decimal = dec!(0.01);

// ==========================================
// ActivityCalculator
// ==========================================
pub struct ActivityCalculator {
    repos: EvmRepositories,
    weight_tolerance: Decimal,
}

impl ActivityCalculator {
    pub fn new(repos: EvmRepositories) -> Self {
        Self {
            repos,
            weight_tolerance: DEFAULT_WEIGHT_TOLERANCE,
        }
    }

    pub fn with_weight_tolerance(mut self, tolerance: Decimal) -> Self {
        self.weight_tolerance = tolerance.abs();
        self
    }

    // ==========================================
    // 权重
    // ==========================================

    /// 重算并保存项目全部有效活动的权重
    ///
    /// # 返回
    /// - Ok(false): 无有效活动，或评分合计为 0（不做任何修改）
    /// - Ok(true): 权重已更新
    #[instrument(skip(self))]
    pub fn calculate_activity_weights(&self, project_id: &str) -> EngineResult<bool> {
        let activities = self.repos.activity_repo.list_active(project_id)?;

        let Some(weights) = normalized_weights(&activities) else {
            tracing::info!(project_id, "无有效活动或评分合计为 0，跳过权重计算");
            return Ok(false);
        };

        let updates: Vec<(i64, Decimal)> = activities
            .iter()
            .zip(weights)
            .filter_map(|(activity, weight)| activity.activity_id.map(|id| (id, weight)))
            .collect();

        let updated = self.repos.activity_repo.update_weights(&updates)?;
        tracing::debug!(project_id, updated, "活动权重已更新");
        Ok(true)
    }

    /// 权重合计是否在 100 ± tolerance 内
    pub fn validate_weights_sum(&self, project_id: &str) -> EngineResult<bool> {
        let activities = self.repos.activity_repo.list_active(project_id)?;
        Ok(weights_sum_valid(&activities, self.weight_tolerance))
    }

    // ==========================================
    // 物理进度
    // ==========================================

    /// 项目物理进度（百分比，2 位小数）
    #[instrument(skip(self, project), fields(project_id = %project.project_id))]
    pub fn calculate_physical_progress(&self, project: &Project) -> EngineResult<Decimal> {
        let activities = self.repos.activity_repo.list_active(&project.project_id)?;
        if !activities.is_empty() {
            return Ok(weighted_progress(&activities));
        }
        Ok(self.fallback_progress(project))
    }

    /// 无有效活动时的进度来源
    fn fallback_progress(&self, project: &Project) -> Decimal {
        let project_id = project.project_id.as_str();
        let chain = FallbackChain::new("physical_progress")
            .then("progress_log", || {
                Ok(self.repos.project_repo.max_actual_progress(project_id)?)
            })
            .then("project_field", || Ok(project.physical_percent_complete));

        chain.resolve_or(Decimal::ZERO).round_dp(2)
    }

    /// 物理进度明细（驾驶舱展示）
    #[instrument(skip(self))]
    pub fn get_physical_progress_detail(
        &self,
        project_id: &str,
    ) -> EngineResult<PhysicalProgressDetail> {
        let project = self
            .repos
            .project_repo
            .find_project(project_id)?
            .ok_or_else(|| EngineError::ProjectNotFound(project_id.to_string()))?;
        let activities = self.repos.activity_repo.list_active(project_id)?;

        let (total_physical_progress, source) = if activities.is_empty() {
            (self.fallback_progress(&project), ProgressSource::ProjectProgress)
        } else {
            (weighted_progress(&activities), ProgressSource::Activities)
        };

        let details: Vec<ActivityDetail> = activities.iter().map(activity_detail).collect();
        let total_weight: Decimal = activities.iter().map(|a| a.calculated_weight).sum();

        Ok(PhysicalProgressDetail {
            project_id: project_id.to_string(),
            activities_count: details.len(),
            activities: details,
            total_physical_progress,
            total_weight: total_weight.round_dp(2),
            weights_valid: weights_sum_valid(&activities, self.weight_tolerance),
            source,
        })
    }
}

// ==========================================
// 纯计算
// ==========================================

/// 按评分归一化的权重（与输入顺序一一对应，2 位小数，合计恰为 100）
///
/// 最大余数法: 先截断到 0.01，差额逐个 0.01 补给截断余数最大的活动（同余数按输入顺序）
/// 无活动或评分合计为 0 时返回 None
pub fn normalized_weights(activities: &[Activity]) -> Option<Vec<Decimal>> {
    let total: u32 = activities.iter().map(Activity::score).sum();
    if activities.is_empty() || total == 0 {
        return None;
    }

    let total = Decimal::from(total);
    let exact: Vec<Decimal> = activities
        .iter()
        .map(|a| Decimal::from(a.score()) * Decimal::ONE_HUNDRED / total)
        .collect();
    let mut weights: Vec<Decimal> = exact
        .iter()
        .map(|w| w.round_dp_with_strategy(2, RoundingStrategy::ToZero))
        .collect();

    let mut order: Vec<usize> = (0..exact.len()).collect();
    order.sort_by(|&a, &b| (exact[b] - weights[b]).cmp(&(exact[a] - weights[a])));

    let mut residue = Decimal::ONE_HUNDRED - weights.iter().sum::<Decimal>();
    for idx in order {
        if residue < WEIGHT_STEP {
            break;
        }
        weights[idx] += WEIGHT_STEP;
        residue -= WEIGHT_STEP;
    }
    Some(weights)
}

/// Σ(权重 × 完成百分比) / 100，2 位小数
pub fn weighted_progress(activities: &[Activity]) -> Decimal {
    activities
        .iter()
        .map(Activity::contribution)
        .sum::<Decimal>()
        .round_dp(2)
}

pub fn weights_sum_valid(activities: &[Activity], tolerance: Decimal) -> bool {
    let total: Decimal = activities.iter().map(|a| a.calculated_weight).sum();
    (total - Decimal::ONE_HUNDRED).abs() <= tolerance
}

fn activity_detail(activity: &Activity) -> ActivityDetail {
    ActivityDetail {
        id: activity.activity_id,
        name: activity.name.clone(),
        description: activity.description.clone(),
        unit_of_measure: activity.unit_of_measure.clone(),
        complexity: activity.complexity,
        effort: activity.effort,
        impact: activity.impact,
        weight: activity.calculated_weight,
        completed_units: activity.completed_units,
        total_units: activity.total_units,
        percentage_completed: activity.percentage_completed,
        contribution: activity.contribution(),
    }
}
