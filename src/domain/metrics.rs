// ==========================================
// 工程项目挣值管理系统 - 派生指标对象
// ==========================================
// 职责: ProjectMetrics 的输出结构（展示性注解，不参与核心计算）
// ==========================================

use crate::domain::types::{
    CostTrend, DataQuality, EfficiencyLevel, RiskLevel, ScheduleTrend, WeightReliability,
};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 绩效指数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceIndexes {
    pub cpi: Decimal,
    pub spi: Decimal,
    pub tcpi: Decimal,
    pub cost_ratio: Decimal,     // CPI × 100
    pub schedule_ratio: Decimal, // SPI × 100
    pub cost_efficiency: EfficiencyLevel,
    pub schedule_efficiency: EfficiencyLevel,
    pub cost_trend: CostTrend,
    pub schedule_trend: ScheduleTrend,
}

/// 风险指标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub cv_percentage: Decimal,
    pub sv_percentage: Decimal,
    pub eac: Decimal,
    pub etc: Decimal,
    pub vac: Decimal,
    pub cost_risk_level: RiskLevel,
    pub schedule_risk_level: RiskLevel,
    pub overall_risk_level: RiskLevel,
    pub cost_alerts: Vec<String>,
    pub schedule_alerts: Vec<String>,
}

/// 预测指标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetrics {
    pub current_eac: Decimal,
    pub current_etc: Decimal,
    pub optimistic_eac: Decimal,
    pub optimistic_etc: Decimal,
    pub pessimistic_eac: Decimal,
    pub pessimistic_etc: Decimal,
    /// None 表示无法估计（尚无进度或 SPI 非正）
    pub estimated_completion_days: Option<i64>,
    pub success_probability: Decimal,
}

/// 物理进度数据质量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub data_quality: DataQuality,
    pub measurement_consistency: Decimal,
    pub progress_reliability: WeightReliability,
    pub quality_score: Decimal,
    pub activities_with_data: usize,
    pub total_activities: usize,
    pub weights_valid: bool,
}

/// 综合指标（高管驾驶舱）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComprehensiveMetrics {
    pub project_id: String,
    pub performance: PerformanceIndexes,
    pub risk: RiskMetrics,
    pub forecast: ForecastMetrics,
    pub quality: QualityMetrics,
    pub timestamp: NaiveDateTime,
}
