// ==========================================
// 工程项目挣值管理系统 - 挣值 API
// ==========================================
// 职责: 对外暴露驾驶舱数据、综合指标、快照刷新、权重/计划进度维护
// 说明: 每次调用按当前配置组装计算器，配置修改即时生效
// ==========================================

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, EvmSettings};
use crate::domain::evm::{EarnedValueSnapshot, PhysicalProgressDetail, PmiDashboardData};
use crate::domain::metrics::ComprehensiveMetrics;
use crate::engine::{EarnedValueCalculator, EvmRepositories, ProjectMetrics};

/// 显式指定数据库路径的环境变量
pub const DB_PATH_ENV: &str = "PROJECT_EVM_DB_PATH";

// ==========================================
// EvmApi - 挣值 API
// ==========================================
pub struct EvmApi {
    repos: EvmRepositories,
    config_manager: Arc<ConfigManager>,
    reference_date: Option<NaiveDate>,
}

impl EvmApi {
    /// 基于已建表的连接创建 API
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ApiResult<Self> {
        let config_manager = ConfigManager::from_connection(conn.clone())
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;

        Ok(Self {
            repos: EvmRepositories::from_connection(conn),
            config_manager: Arc::new(config_manager),
            reference_date: None,
        })
    }

    /// 固定"今天"（测试 / 历史回放）
    pub fn with_reference_date(mut self, today: NaiveDate) -> Self {
        self.reference_date = Some(today);
        self
    }

    pub fn config_manager(&self) -> &ConfigManager {
        &self.config_manager
    }

    fn settings(&self) -> ApiResult<EvmSettings> {
        self.config_manager
            .get_evm_settings()
            .map_err(|e| ApiError::ConfigError(e.to_string()))
    }

    fn calculator(&self) -> ApiResult<EarnedValueCalculator> {
        let calculator = EarnedValueCalculator::new(self.repos.clone()).with_settings(self.settings()?);
        Ok(match self.reference_date {
            Some(today) => calculator.with_reference_date(today),
            None => calculator,
        })
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 驾驶舱数据（挣值结果 + 物理进度明细）
    pub fn get_pmi_dashboard_data(&self, project_id: &str) -> ApiResult<PmiDashboardData> {
        validate_project_id(project_id)?;
        Ok(self.calculator()?.get_pmi_dashboard_data(project_id)?)
    }

    /// 综合指标（绩效 / 风险 / 预测 / 质量）
    pub fn get_comprehensive_metrics(&self, project_id: &str) -> ApiResult<ComprehensiveMetrics> {
        validate_project_id(project_id)?;
        let metrics = ProjectMetrics::new(self.calculator()?);
        Ok(metrics.get_comprehensive_metrics(project_id, chrono::Local::now().naive_local())?)
    }

    pub fn get_physical_progress_detail(&self, project_id: &str) -> ApiResult<PhysicalProgressDetail> {
        validate_project_id(project_id)?;
        Ok(self
            .calculator()?
            .activity_calculator()
            .get_physical_progress_detail(project_id)?)
    }

    /// 读取已保存的挣值快照
    pub fn get_snapshot(&self, project_id: &str) -> ApiResult<Option<EarnedValueSnapshot>> {
        validate_project_id(project_id)?;
        Ok(self.repos.earned_value_repo.find_snapshot(project_id)?)
    }

    // ==========================================
    // 写入
    // ==========================================

    /// 重新计算并覆盖保存挣值快照
    pub fn refresh_snapshot(&self, project_id: &str) -> ApiResult<EarnedValueSnapshot> {
        validate_project_id(project_id)?;
        Ok(self
            .calculator()?
            .refresh_snapshot(project_id, chrono::Local::now().naive_local())?)
    }

    /// 重算活动权重，返回权重合计是否有效
    pub fn recalculate_activity_weights(&self, project_id: &str) -> ApiResult<bool> {
        validate_project_id(project_id)?;
        Ok(self
            .calculator()?
            .activity_calculator()
            .calculate_activity_weights(project_id)?)
    }

    /// 录入月度计划进度并重算 PV
    ///
    /// # 参数
    /// - values: (月序号, 计划累计进度%)，月序号从 1 开始
    pub fn update_planned_progress(
        &self,
        project_id: &str,
        values: &[(u32, Decimal)],
    ) -> ApiResult<usize> {
        validate_project_id(project_id)?;
        if let Some((month, pct)) = values
            .iter()
            .find(|(_, pct)| *pct < Decimal::ZERO || *pct > Decimal::ONE_HUNDRED)
        {
            return Err(ApiError::InvalidInput(format!(
                "计划进度超出范围: month={}, value={}",
                month, pct
            )));
        }

        Ok(self
            .calculator()?
            .baseline_service()
            .apply_planned_progress(project_id, values)?)
    }
}

fn validate_project_id(project_id: &str) -> ApiResult<()> {
    if project_id.trim().is_empty() {
        return Err(ApiError::InvalidInput("project_id 不能为空".to_string()));
    }
    Ok(())
}

/// 默认数据库路径
///
/// 优先级: 环境变量 PROJECT_EVM_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./project_evm.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("project-evm");
        // 目录创建失败时仍返回该路径，由打开连接时报错
        std::fs::create_dir_all(&dir).ok();
        path = dir.join("project_evm.db");
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory_connection;

    fn api() -> EvmApi {
        EvmApi::from_connection(open_in_memory_connection().unwrap()).unwrap()
    }

    #[test]
    fn test_empty_project_id_rejected() {
        let api = api();
        assert!(matches!(
            api.get_pmi_dashboard_data("  "),
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_unknown_project_maps_to_not_found() {
        let api = api();
        assert!(matches!(
            api.get_comprehensive_metrics("P-404"),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn test_planned_progress_out_of_range() {
        let api = api();
        let err = api
            .update_planned_progress("P-1", &[(1, Decimal::new(120, 0))])
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }
}
