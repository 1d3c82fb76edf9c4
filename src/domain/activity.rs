// ==========================================
// 工程项目挣值管理系统 - 项目活动
// ==========================================
// 职责: 活动评分、完成量与完成百分比
// 约束: completed_units 不超过 total_units；百分比在 [0, 100]
// ==========================================

use crate::domain::types::ActivityState;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 评分下限/上限（复杂度 / 工作量 / 影响度）
pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;

// ==========================================
// Activity - 项目活动
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub activity_id: Option<i64>, // 未入库时为 None
    pub project_id: String,
    pub name: String,
    pub description: String,
    pub unit_of_measure: String,
    pub complexity: u8,
    pub effort: u8,
    pub impact: u8,
    pub calculated_weight: Decimal, // 百分比，项目内合计约 100
    pub total_units: u32,
    pub completed_units: u32,
    pub percentage_completed: Decimal,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

impl Activity {
    /// 创建活动（评分会被夹到 1..=5）
    pub fn new(
        project_id: &str,
        name: &str,
        scores: (u8, u8, u8),
        total_units: u32,
        created_at: NaiveDateTime,
    ) -> Self {
        let (complexity, effort, impact) = scores;
        Self {
            activity_id: None,
            project_id: project_id.to_string(),
            name: name.to_string(),
            description: String::new(),
            unit_of_measure: String::new(),
            complexity: clamp_score(complexity),
            effort: clamp_score(effort),
            impact: clamp_score(impact),
            calculated_weight: Decimal::ZERO,
            total_units,
            completed_units: 0,
            percentage_completed: Decimal::ZERO,
            is_active: true,
            created_at,
        }
    }

    /// 评分合计（权重计算的分子）
    pub fn score(&self) -> u32 {
        u32::from(self.complexity) + u32::from(self.effort) + u32::from(self.impact)
    }

    /// 更新完成量（先夹取，再重算百分比）
    pub fn set_completed_units(&mut self, completed: u32) {
        self.completed_units = completed.min(self.total_units);
        self.recalculate_percentage();
    }

    /// 按 completed / total × 100 重算百分比，total 为 0 时为 0
    pub fn recalculate_percentage(&mut self) {
        if self.completed_units > self.total_units {
            self.completed_units = self.total_units;
        }
        self.percentage_completed = if self.total_units == 0 {
            Decimal::ZERO
        } else {
            (Decimal::from(self.completed_units) * Decimal::ONE_HUNDRED
                / Decimal::from(self.total_units))
            .round_dp(2)
        };
    }

    /// 对整体物理进度的贡献: weight × %完成 / 100
    pub fn contribution(&self) -> Decimal {
        self.calculated_weight * self.percentage_completed / Decimal::ONE_HUNDRED
    }

    pub fn state(&self) -> ActivityState {
        if self.percentage_completed >= Decimal::ONE_HUNDRED {
            ActivityState::Completed
        } else if self.percentage_completed > Decimal::ZERO {
            ActivityState::InProgress
        } else {
            ActivityState::Pending
        }
    }
}

fn clamp_score(score: u8) -> u8 {
    score.clamp(MIN_SCORE, MAX_SCORE)
}
