// ==========================================
// 工程项目挣值管理系统 - 挣值结果对象
// ==========================================
// 职责: 计算引擎对外输出的可序列化结构
// 键名与前端曲线/指标面板约定一致:
//   curve_data.{months,pv,ev,ac,ac_paid}, curve_data_weekly, curve_data_daily,
//   metrics.{cpi,spi,cv,sv,eac,etc,vac}, bac_calculated, physical_progress, pmi_compliant
// ==========================================

use crate::domain::types::{CostSource, ProgressSource};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// 曲线数据
// ==========================================

/// 月度 S 曲线（累计值）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurveData {
    pub months: Vec<u32>,
    pub pv: Vec<Decimal>,
    pub ev: Vec<Decimal>,
    pub ac: Vec<Decimal>,
    pub ac_paid: Vec<Decimal>,
}

/// 周/日粒度曲线（累计值）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GranularCurve {
    pub labels: Vec<u32>,
    pub pv: Vec<Decimal>,
    pub ev: Vec<Decimal>,
    pub ac: Vec<Decimal>,
    pub interval_days: u32,
}

// ==========================================
// 核心指标
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvmMetrics {
    pub cpi: Decimal,
    pub spi: Decimal,
    pub cv: Decimal,
    pub sv: Decimal,
    pub eac: Decimal,
    pub etc: Decimal,
    pub vac: Decimal,
}

impl EvmMetrics {
    /// 无数据时的中性指标: CPI=SPI=1，EAC=ETC=BAC
    pub fn neutral(bac: Decimal) -> Self {
        Self {
            cpi: Decimal::ONE,
            spi: Decimal::ONE,
            cv: Decimal::ZERO,
            sv: Decimal::ZERO,
            eac: bac,
            etc: bac,
            vac: Decimal::ZERO,
        }
    }
}

// ==========================================
// EarnedValueResult - 挣值计算完整输出
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarnedValueResult {
    pub project_id: String,
    pub curve_data: CurveData,
    pub curve_data_weekly: GranularCurve,
    pub curve_data_daily: GranularCurve,
    pub metrics: EvmMetrics,
    pub bac_calculated: Decimal,
    pub physical_progress: Decimal,
    pub pmi_compliant: bool,
    pub start_date: Option<NaiveDate>,
    pub ac_source: CostSource,
}

// ==========================================
// 物理进度明细
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityDetail {
    pub id: Option<i64>,
    pub name: String,
    pub description: String,
    pub unit_of_measure: String,
    pub complexity: u8,
    pub effort: u8,
    pub impact: u8,
    pub weight: Decimal,
    pub completed_units: u32,
    pub total_units: u32,
    pub percentage_completed: Decimal,
    pub contribution: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalProgressDetail {
    pub project_id: String,
    pub activities: Vec<ActivityDetail>,
    pub total_physical_progress: Decimal,
    pub total_weight: Decimal,
    pub weights_valid: bool,
    pub activities_count: usize,
    pub source: ProgressSource,
}

/// 驾驶舱数据: 挣值结果 + 物理进度明细
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PmiDashboardData {
    #[serde(flatten)]
    pub evm: EarnedValueResult,
    pub physical_detail: PhysicalProgressDetail,
}

// ==========================================
// EarnedValueSnapshot - 挣值快照（每项目一条，覆盖写）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarnedValueSnapshot {
    pub snapshot_id: String,
    pub project_id: String,
    pub curve_data: CurveData,
    pub bac: Decimal,
    pub cpi: Decimal,
    pub spi: Decimal,
    pub cv: Decimal,
    pub sv: Decimal,
    pub eac: Decimal,
    pub etc: Decimal,
    pub analysis_date: NaiveDateTime,
}

impl EarnedValueSnapshot {
    pub fn from_result(result: &EarnedValueResult, analysis_date: NaiveDateTime) -> Self {
        Self {
            snapshot_id: uuid::Uuid::new_v4().to_string(),
            project_id: result.project_id.clone(),
            curve_data: result.curve_data.clone(),
            bac: result.bac_calculated,
            cpi: result.metrics.cpi,
            spi: result.metrics.spi,
            cv: result.metrics.cv,
            sv: result.metrics.sv,
            eac: result.metrics.eac,
            etc: result.metrics.etc,
            analysis_date,
        }
    }
}
