// ==========================================
// 工程项目挣值管理系统 - 派生指标
// ==========================================
// 职责: 基于挣值结果的展示性指标（绩效 / 风险 / 预测 / 质量）
// 红线: 不产生独立的核心数据，只对 CPI/SPI/CV/SV/EAC 做分档与推演
// ==========================================

use crate::domain::evm::{ActivityDetail, EarnedValueResult, EvmMetrics, PhysicalProgressDetail};
use crate::domain::metrics::{
    ComprehensiveMetrics, ForecastMetrics, PerformanceIndexes, QualityMetrics, RiskMetrics,
};
use crate::domain::types::{
    CostTrend, DataQuality, EfficiencyLevel, RiskLevel, ScheduleTrend, WeightReliability,
};
use crate::engine::earned_value::EarnedValueCalculator;
use crate::engine::error::EngineResult;
use chrono::NaiveDateTime;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use tracing::instrument;

// ==========================================
// ProjectMetrics
// ==========================================
pub struct ProjectMetrics {
    calculator: EarnedValueCalculator,
}

impl ProjectMetrics {
    pub fn new(calculator: EarnedValueCalculator) -> Self {
        Self { calculator }
    }

    pub fn calculate_performance_indexes(&self, project_id: &str) -> EngineResult<PerformanceIndexes> {
        let evm = self.calculator.calculate_earned_value(project_id)?;
        Ok(performance_indexes(&evm.metrics))
    }

    pub fn calculate_risk_metrics(&self, project_id: &str) -> EngineResult<RiskMetrics> {
        let evm = self.calculator.calculate_earned_value(project_id)?;
        Ok(risk_metrics(&evm.metrics, evm.bac_calculated))
    }

    pub fn calculate_forecast_metrics(&self, project_id: &str) -> EngineResult<ForecastMetrics> {
        let evm = self.calculator.calculate_earned_value(project_id)?;
        Ok(forecast_from_result(&evm))
    }

    pub fn calculate_quality_metrics(&self, project_id: &str) -> EngineResult<QualityMetrics> {
        let detail = self
            .calculator
            .activity_calculator()
            .get_physical_progress_detail(project_id)?;
        Ok(quality_metrics(&detail))
    }

    /// 综合指标（挣值只计算一次）
    #[instrument(skip(self))]
    pub fn get_comprehensive_metrics(
        &self,
        project_id: &str,
        timestamp: NaiveDateTime,
    ) -> EngineResult<ComprehensiveMetrics> {
        let evm = self.calculator.calculate_earned_value(project_id)?;
        let detail = self
            .calculator
            .activity_calculator()
            .get_physical_progress_detail(project_id)?;

        let risk = risk_metrics(&evm.metrics, evm.bac_calculated);
        tracing::debug!(project_id, overall_risk = %risk.overall_risk_level, "综合指标已生成");

        Ok(ComprehensiveMetrics {
            project_id: project_id.to_string(),
            performance: performance_indexes(&evm.metrics),
            risk,
            forecast: forecast_from_result(&evm),
            quality: quality_metrics(&detail),
            timestamp,
        })
    }
}

fn forecast_from_result(evm: &EarnedValueResult) -> ForecastMetrics {
    forecast_metrics(&evm.metrics, evm.bac_calculated, evm.physical_progress)
}

// ==========================================
// 绩效指数
// ==========================================

pub fn performance_indexes(metrics: &EvmMetrics) -> PerformanceIndexes {
    PerformanceIndexes {
        cpi: metrics.cpi,
        spi: metrics.spi,
        tcpi: tcpi(metrics.cpi, metrics.spi),
        cost_ratio: metrics.cpi * Decimal::ONE_HUNDRED,
        schedule_ratio: metrics.spi * Decimal::ONE_HUNDRED,
        cost_efficiency: efficiency_level(metrics.cpi),
        schedule_efficiency: efficiency_level(metrics.spi),
        cost_trend: cost_trend(metrics.cpi),
        schedule_trend: schedule_trend(metrics.spi),
    }
}

/// TCPI = SPI / CPI（CPI 为 0 时为 0）
pub fn tcpi(cpi: Decimal, spi: Decimal) -> Decimal {
    if cpi.is_zero() {
        Decimal::ZERO
    } else {
        spi / cpi
    }
}

pub fn efficiency_level(index: Decimal) -> EfficiencyLevel {
    if index >= dec!(1.10) {
        EfficiencyLevel::VeryEfficient
    } else if index >= dec!(1.00) {
        EfficiencyLevel::Efficient
    } else if index >= dec!(0.90) {
        EfficiencyLevel::Acceptable
    } else if index >= dec!(0.80) {
        EfficiencyLevel::AtRisk
    } else {
        EfficiencyLevel::Critical
    }
}

pub fn cost_trend(cpi: Decimal) -> CostTrend {
    if cpi >= Decimal::ONE {
        CostTrend::Improving
    } else if cpi >= dec!(0.95) {
        CostTrend::Stable
    } else {
        CostTrend::Worsening
    }
}

pub fn schedule_trend(spi: Decimal) -> ScheduleTrend {
    if spi >= Decimal::ONE {
        ScheduleTrend::Ahead
    } else if spi >= dec!(0.95) {
        ScheduleTrend::OnTime
    } else {
        ScheduleTrend::Behind
    }
}

// ==========================================
// 风险
// ==========================================

pub fn risk_metrics(metrics: &EvmMetrics, bac: Decimal) -> RiskMetrics {
    RiskMetrics {
        cv_percentage: percentage_of(metrics.cv, bac),
        sv_percentage: percentage_of(metrics.sv, bac),
        eac: metrics.eac,
        etc: metrics.etc,
        vac: bac - metrics.eac,
        cost_risk_level: index_risk_level(metrics.cpi),
        schedule_risk_level: index_risk_level(metrics.spi),
        overall_risk_level: overall_risk_level(metrics.cpi, metrics.spi),
        cost_alerts: cost_alerts(metrics.cpi, metrics.cv),
        schedule_alerts: schedule_alerts(metrics.spi, metrics.sv),
    }
}

fn percentage_of(value: Decimal, bac: Decimal) -> Decimal {
    if bac > Decimal::ZERO {
        (value / bac * Decimal::ONE_HUNDRED).round_dp(2)
    } else {
        Decimal::ZERO
    }
}

/// 单项指数（CPI 或 SPI）的风险分档
pub fn index_risk_level(index: Decimal) -> RiskLevel {
    if index >= dec!(1.05) {
        RiskLevel::Green
    } else if index >= dec!(0.95) {
        RiskLevel::Yellow
    } else if index >= dec!(0.85) {
        RiskLevel::Orange
    } else {
        RiskLevel::Red
    }
}

/// 综合风险: 按 (CPI + SPI) / 2 分档
pub fn overall_risk_level(cpi: Decimal, spi: Decimal) -> RiskLevel {
    let avg = (cpi + spi) / dec!(2);
    if avg >= Decimal::ONE {
        RiskLevel::Green
    } else if avg >= dec!(0.9) {
        RiskLevel::Yellow
    } else if avg >= dec!(0.8) {
        RiskLevel::Orange
    } else {
        RiskLevel::Red
    }
}

pub fn cost_alerts(cpi: Decimal, cv: Decimal) -> Vec<String> {
    let mut alerts = Vec::new();
    if cpi < dec!(0.9) {
        alerts.push(format!(
            "成本超支: CPI = {} (CV = {})",
            cpi.round_dp(3),
            cv.round_dp(2)
        ));
    } else if cpi < Decimal::ONE {
        alerts.push(format!("成本需关注: CPI = {}", cpi.round_dp(3)));
    }
    if cv < Decimal::ZERO {
        alerts.push(format!("成本偏差为负: {}", cv.round_dp(2)));
    }
    alerts
}

pub fn schedule_alerts(spi: Decimal, sv: Decimal) -> Vec<String> {
    let mut alerts = Vec::new();
    if spi < dec!(0.9) {
        alerts.push(format!(
            "进度滞后: SPI = {} (SV = {})",
            spi.round_dp(3),
            sv.round_dp(2)
        ));
    } else if spi < Decimal::ONE {
        alerts.push(format!("进度需关注: SPI = {}", spi.round_dp(3)));
    }
    if sv < Decimal::ZERO {
        alerts.push(format!("进度偏差为负: {}", sv.round_dp(2)));
    }
    alerts
}

// ==========================================
// 预测
// ==========================================

pub fn forecast_metrics(metrics: &EvmMetrics, bac: Decimal, physical_progress: Decimal) -> ForecastMetrics {
    // CPI 改善/恶化 10%，下限 0.1
    let scenario_eac = |factor: Decimal| bac / (metrics.cpi * factor).max(dec!(0.1));
    let optimistic_eac = scenario_eac(dec!(1.1));
    let pessimistic_eac = scenario_eac(dec!(0.9));

    ForecastMetrics {
        current_eac: metrics.eac,
        current_etc: metrics.etc,
        optimistic_eac,
        optimistic_etc: optimistic_eac - metrics.eac + metrics.etc,
        pessimistic_eac,
        pessimistic_etc: pessimistic_eac - metrics.eac + metrics.etc,
        estimated_completion_days: estimate_completion_days(physical_progress, metrics.spi),
        success_probability: success_probability(metrics.cpi, metrics.spi),
    }
}

/// 预计剩余天数 = (100 - 进度) / 进度 × (30 / SPI)，至少 1 天
///
/// 已完工返回 0；尚无进度或 SPI 非正时无法估计
pub fn estimate_completion_days(physical_progress: Decimal, spi: Decimal) -> Option<i64> {
    if physical_progress >= Decimal::ONE_HUNDRED {
        return Some(0);
    }
    if physical_progress <= Decimal::ZERO || spi <= Decimal::ZERO {
        return None;
    }

    let remaining = Decimal::ONE_HUNDRED - physical_progress;
    let days = remaining / physical_progress * (dec!(30) / spi);
    days.trunc().to_i64().map(|d| d.max(1))
}

/// 成功概率（0..100，1 位小数）
pub fn success_probability(cpi: Decimal, spi: Decimal) -> Decimal {
    let base = (cpi * dec!(0.6) + spi * dec!(0.4)) * Decimal::ONE_HUNDRED;

    let adjustment = if cpi > dec!(1.1) && spi > dec!(1.1) {
        dec!(10)
    } else if cpi > Decimal::ONE && spi > Decimal::ONE {
        dec!(5)
    } else if cpi < dec!(0.9) || spi < dec!(0.9) {
        dec!(-15)
    } else {
        Decimal::ZERO
    };

    (base + adjustment)
        .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
        .round_dp(1)
}

// ==========================================
// 质量
// ==========================================

pub fn quality_metrics(detail: &PhysicalProgressDetail) -> QualityMetrics {
    let activities = &detail.activities;
    if activities.is_empty() {
        return QualityMetrics {
            data_quality: DataQuality::NoData,
            measurement_consistency: Decimal::ZERO,
            progress_reliability: WeightReliability::Low,
            quality_score: Decimal::ZERO,
            activities_with_data: 0,
            total_activities: 0,
            weights_valid: detail.weights_valid,
        };
    }

    let with_data = activities.iter().filter(|a| a.completed_units > 0).count();
    let progress: Vec<Decimal> = activities.iter().map(|a| a.percentage_completed).collect();
    let weights: Vec<Decimal> = activities.iter().map(|a| a.weight).collect();

    QualityMetrics {
        data_quality: data_quality(with_data, activities.len()),
        measurement_consistency: measurement_consistency(&progress),
        progress_reliability: weight_reliability(&weights),
        quality_score: quality_score(activities),
        activities_with_data: with_data,
        total_activities: activities.len(),
        weights_valid: detail.weights_valid,
    }
}

/// 按已填报活动占比分档
pub fn data_quality(with_data: usize, total: usize) -> DataQuality {
    if total == 0 {
        return DataQuality::NoData;
    }
    let ratio = Decimal::from(with_data) / Decimal::from(total);
    if ratio >= dec!(0.9) {
        DataQuality::Excellent
    } else if ratio >= dec!(0.7) {
        DataQuality::Good
    } else if ratio >= dec!(0.5) {
        DataQuality::Fair
    } else {
        DataQuality::Poor
    }
}

/// 一致性 = max(0, 100 - 样本标准差 × 10)，少于 2 个样本时为 100
pub fn measurement_consistency(values: &[Decimal]) -> Decimal {
    if values.len() < 2 {
        return Decimal::ONE_HUNDRED;
    }

    let n = Decimal::from(values.len());
    let mean = values.iter().sum::<Decimal>() / n;
    let variance = values
        .iter()
        .map(|v| (*v - mean) * (*v - mean))
        .sum::<Decimal>()
        / (n - Decimal::ONE);
    let deviation = variance.sqrt().unwrap_or(Decimal::ZERO);

    (Decimal::ONE_HUNDRED - deviation * dec!(10))
        .max(Decimal::ZERO)
        .round_dp(1)
}

/// 按权重极差分档
pub fn weight_reliability(weights: &[Decimal]) -> WeightReliability {
    let (Some(max), Some(min)) = (weights.iter().max(), weights.iter().min()) else {
        return WeightReliability::Low;
    };
    let spread = *max - *min;
    if spread > dec!(50) {
        WeightReliability::Variable
    } else if spread > dec!(25) {
        WeightReliability::Acceptable
    } else {
        WeightReliability::Good
    }
}

/// 每个活动按字段完整度打分（满分 100），取平均
pub fn quality_score(activities: &[ActivityDetail]) -> Decimal {
    if activities.is_empty() {
        return Decimal::ZERO;
    }

    let total: u32 = activities
        .iter()
        .map(|a| {
            let mut score = 0;
            if a.completed_units > 0 {
                score += 30;
            }
            if a.total_units > 0 {
                score += 20;
            }
            if a.weight > Decimal::ZERO {
                score += 20;
            }
            if a.percentage_completed <= Decimal::ONE_HUNDRED {
                score += 30;
            }
            score
        })
        .sum();

    (Decimal::from(total) / Decimal::from(activities.len())).round_dp(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(cpi: Decimal, spi: Decimal, cv: Decimal, sv: Decimal, eac: Decimal, etc: Decimal) -> EvmMetrics {
        EvmMetrics {
            cpi,
            spi,
            cv,
            sv,
            eac,
            etc,
            vac: Decimal::ZERO,
        }
    }

    fn detail(weight: Decimal, completed: u32, total: u32, pct: Decimal) -> ActivityDetail {
        ActivityDetail {
            id: Some(1),
            name: "布线".to_string(),
            description: String::new(),
            unit_of_measure: "m".to_string(),
            complexity: 3,
            effort: 3,
            impact: 3,
            weight,
            completed_units: completed,
            total_units: total,
            percentage_completed: pct,
            contribution: weight * pct / Decimal::ONE_HUNDRED,
        }
    }

    #[test]
    fn test_performance_indexes() {
        let p = performance_indexes(&metrics(dec!(1.25), dec!(0.5), dec!(0), dec!(0), dec!(0), dec!(0)));
        assert_eq!(p.tcpi, dec!(0.4));
        assert_eq!(p.cost_ratio, dec!(125));
        assert_eq!(p.schedule_ratio, dec!(50));
        assert_eq!(p.cost_efficiency, EfficiencyLevel::VeryEfficient);
        assert_eq!(p.schedule_efficiency, EfficiencyLevel::Critical);
        assert_eq!(p.cost_trend, CostTrend::Improving);
        assert_eq!(p.schedule_trend, ScheduleTrend::Behind);
        assert_eq!(tcpi(Decimal::ZERO, dec!(1)), Decimal::ZERO);
    }

    #[test]
    fn test_level_boundaries() {
        assert_eq!(efficiency_level(dec!(1.00)), EfficiencyLevel::Efficient);
        assert_eq!(efficiency_level(dec!(0.90)), EfficiencyLevel::Acceptable);
        assert_eq!(efficiency_level(dec!(0.80)), EfficiencyLevel::AtRisk);
        assert_eq!(efficiency_level(dec!(0.79)), EfficiencyLevel::Critical);

        assert_eq!(index_risk_level(dec!(1.05)), RiskLevel::Green);
        assert_eq!(index_risk_level(dec!(0.95)), RiskLevel::Yellow);
        assert_eq!(index_risk_level(dec!(0.85)), RiskLevel::Orange);
        assert_eq!(index_risk_level(dec!(0.84)), RiskLevel::Red);

        assert_eq!(overall_risk_level(dec!(1.25), dec!(0.5)), RiskLevel::Orange);
        assert_eq!(cost_trend(dec!(0.95)), CostTrend::Stable);
        assert_eq!(schedule_trend(dec!(0.97)), ScheduleTrend::OnTime);
    }

    #[test]
    fn test_risk_metrics_and_alerts() {
        let m = metrics(dec!(0.8), dec!(0.95), dec!(-500), dec!(-100), dec!(12500), dec!(10000));
        let risk = risk_metrics(&m, dec!(10000));

        assert_eq!(risk.cv_percentage, dec!(-5));
        assert_eq!(risk.sv_percentage, dec!(-1));
        assert_eq!(risk.vac, dec!(-2500));
        assert_eq!(risk.cost_risk_level, RiskLevel::Red);
        assert_eq!(risk.cost_alerts.len(), 2);
        assert!(risk.cost_alerts[0].starts_with("成本超支"));
        assert_eq!(risk.schedule_alerts.len(), 2);
        assert!(risk.schedule_alerts[0].starts_with("进度需关注"));

        assert!(cost_alerts(dec!(1.1), dec!(10)).is_empty());
        assert_eq!(risk_metrics(&m, Decimal::ZERO).cv_percentage, Decimal::ZERO);
    }

    #[test]
    fn test_forecast_scenarios() {
        let m = metrics(dec!(1.25), dec!(0.5), dec!(2000), dec!(-10000), dec!(16000), dec!(8000));
        let f = forecast_metrics(&m, dec!(20000), dec!(50));

        assert_eq!(f.optimistic_eac.round_dp(2), dec!(14545.45));
        assert_eq!(f.pessimistic_eac.round_dp(2), dec!(17777.78));
        assert_eq!(f.optimistic_etc, f.optimistic_eac - dec!(8000));
        assert_eq!(f.estimated_completion_days, Some(60));
    }

    #[test]
    fn test_scenario_eac_floor() {
        let m = metrics(Decimal::ZERO, dec!(1), dec!(0), dec!(0), dec!(100), dec!(100));
        let f = forecast_metrics(&m, dec!(100), dec!(10));
        assert_eq!(f.optimistic_eac, dec!(1000));
    }

    #[test]
    fn test_estimate_completion_days_edges() {
        assert_eq!(estimate_completion_days(dec!(100), dec!(1)), Some(0));
        assert_eq!(estimate_completion_days(dec!(0), dec!(1)), None);
        assert_eq!(estimate_completion_days(dec!(50), dec!(0)), None);
        assert_eq!(estimate_completion_days(dec!(99.9), dec!(10)), Some(1));
    }

    #[test]
    fn test_success_probability() {
        assert_eq!(success_probability(dec!(1.2), dec!(1.2)), dec!(100));
        assert_eq!(success_probability(dec!(1.05), dec!(1.02)), dec!(100));
        assert_eq!(success_probability(dec!(1), dec!(0.95)), dec!(98));
        assert_eq!(success_probability(dec!(0.5), dec!(0.5)), dec!(35));
        assert_eq!(success_probability(Decimal::ZERO, Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_quality_metrics() {
        let detail = PhysicalProgressDetail {
            project_id: "P-1".to_string(),
            activities: vec![
                detail(dec!(60), 5, 10, dec!(50)),
                detail(dec!(40), 0, 10, dec!(0)),
            ],
            total_physical_progress: dec!(30),
            total_weight: dec!(100),
            weights_valid: true,
            activities_count: 2,
            source: crate::domain::types::ProgressSource::Activities,
        };

        let q = quality_metrics(&detail);
        assert_eq!(q.data_quality, DataQuality::Fair);
        // 样本标准差 ≈ 35.36 → 100 - 353.6 < 0
        assert_eq!(q.measurement_consistency, Decimal::ZERO);
        assert_eq!(q.progress_reliability, WeightReliability::Good);
        // (100 + 70) / 2
        assert_eq!(q.quality_score, dec!(85));
        assert_eq!(q.activities_with_data, 1);
    }

    #[test]
    fn test_consistency_and_reliability_edges() {
        assert_eq!(measurement_consistency(&[dec!(40)]), dec!(100));
        assert_eq!(measurement_consistency(&[dec!(50), dec!(51)]), dec!(92.9));
        assert_eq!(weight_reliability(&[]), WeightReliability::Low);
        assert_eq!(weight_reliability(&[dec!(10), dec!(70)]), WeightReliability::Variable);
        assert_eq!(weight_reliability(&[dec!(10), dec!(40)]), WeightReliability::Acceptable);
        assert_eq!(data_quality(0, 0), DataQuality::NoData);
        assert_eq!(data_quality(9, 10), DataQuality::Excellent);
    }
}
