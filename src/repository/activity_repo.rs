// ==========================================
// 工程项目挣值管理系统 - 项目活动数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 表: project_activity
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::activity::Activity;
use crate::repository::codec::{datetime_to_text, decimal_to_text, parse_datetime, parse_decimal};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::traits::ActivityRepository;
use rust_decimal::Decimal;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

/// 数据库原始行（TEXT 列尚未解析）
struct ActivityRow {
    activity_id: i64,
    project_id: String,
    name: String,
    description: String,
    unit_of_measure: String,
    complexity: u8,
    effort: u8,
    impact: u8,
    calculated_weight: String,
    total_units: u32,
    completed_units: u32,
    percentage_completed: String,
    is_active: bool,
    created_at: String,
}

impl ActivityRow {
    fn into_domain(self) -> RepositoryResult<Activity> {
        Ok(Activity {
            activity_id: Some(self.activity_id),
            project_id: self.project_id,
            name: self.name,
            description: self.description,
            unit_of_measure: self.unit_of_measure,
            complexity: self.complexity,
            effort: self.effort,
            impact: self.impact,
            calculated_weight: parse_decimal("calculated_weight", &self.calculated_weight)?,
            total_units: self.total_units,
            completed_units: self.completed_units,
            percentage_completed: parse_decimal(
                "percentage_completed",
                &self.percentage_completed,
            )?,
            is_active: self.is_active,
            created_at: parse_datetime("created_at", &self.created_at)?,
        })
    }
}

// ==========================================
// ActivityRepositoryImpl
// ==========================================
pub struct ActivityRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl ActivityRepositoryImpl {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 停用活动（不参与权重与进度计算）
    pub fn deactivate(&self, activity_id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE project_activity SET is_active = 0 WHERE activity_id = ?1",
            params![activity_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Activity", &activity_id.to_string()));
        }
        Ok(())
    }
}

impl ActivityRepository for ActivityRepositoryImpl {
    fn list_active(&self, project_id: &str) -> RepositoryResult<Vec<Activity>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT activity_id, project_id, name, description, unit_of_measure,
                   complexity, effort, impact, calculated_weight,
                   total_units, completed_units, percentage_completed,
                   is_active, created_at
            FROM project_activity
            WHERE project_id = ?1 AND is_active = 1
            ORDER BY created_at, activity_id
            "#,
        )?;

        let rows = stmt.query_map(params![project_id], |row| {
            Ok(ActivityRow {
                activity_id: row.get(0)?,
                project_id: row.get(1)?,
                name: row.get(2)?,
                description: row.get(3)?,
                unit_of_measure: row.get(4)?,
                complexity: row.get(5)?,
                effort: row.get(6)?,
                impact: row.get(7)?,
                calculated_weight: row.get(8)?,
                total_units: row.get(9)?,
                completed_units: row.get(10)?,
                percentage_completed: row.get(11)?,
                is_active: row.get(12)?,
                created_at: row.get(13)?,
            })
        })?;

        let mut activities = Vec::new();
        for row in rows {
            activities.push(row?.into_domain()?);
        }
        Ok(activities)
    }

    fn update_weights(&self, weights: &[(i64, Decimal)]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let mut count = 0;
        for (activity_id, weight) in weights {
            count += tx.execute(
                "UPDATE project_activity SET calculated_weight = ?1 WHERE activity_id = ?2",
                params![decimal_to_text(*weight), activity_id],
            )?;
        }

        tx.commit()?;
        Ok(count)
    }

    fn save(&self, activity: &Activity) -> RepositoryResult<i64> {
        // 入库前统一夹取完成量并重算百分比
        let mut activity = activity.clone();
        activity.recalculate_percentage();

        let conn = self.get_conn()?;
        match activity.activity_id {
            Some(id) => {
                let affected = conn.execute(
                    r#"
                    UPDATE project_activity SET
                        name = ?1, description = ?2, unit_of_measure = ?3,
                        complexity = ?4, effort = ?5, impact = ?6,
                        calculated_weight = ?7, total_units = ?8, completed_units = ?9,
                        percentage_completed = ?10, is_active = ?11
                    WHERE activity_id = ?12
                    "#,
                    params![
                        activity.name,
                        activity.description,
                        activity.unit_of_measure,
                        activity.complexity,
                        activity.effort,
                        activity.impact,
                        decimal_to_text(activity.calculated_weight),
                        activity.total_units,
                        activity.completed_units,
                        decimal_to_text(activity.percentage_completed),
                        activity.is_active,
                        id,
                    ],
                )?;
                if affected == 0 {
                    return Err(RepositoryError::not_found("Activity", &id.to_string()));
                }
                Ok(id)
            }
            None => {
                conn.execute(
                    r#"
                    INSERT INTO project_activity (
                        project_id, name, description, unit_of_measure,
                        complexity, effort, impact, calculated_weight,
                        total_units, completed_units, percentage_completed,
                        is_active, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                    "#,
                    params![
                        activity.project_id,
                        activity.name,
                        activity.description,
                        activity.unit_of_measure,
                        activity.complexity,
                        activity.effort,
                        activity.impact,
                        decimal_to_text(activity.calculated_weight),
                        activity.total_units,
                        activity.completed_units,
                        decimal_to_text(activity.percentage_completed),
                        activity.is_active,
                        datetime_to_text(activity.created_at),
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory_connection;
    use crate::domain::project::Project;
    use crate::repository::project_repo::ProjectRepositoryImpl;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_save_clamps_completed_units() {
        let conn = open_in_memory_connection().unwrap();
        ProjectRepositoryImpl::from_connection(conn.clone())
            .upsert_project(&Project::new("P-1"))
            .unwrap();
        let repo = ActivityRepositoryImpl::from_connection(conn);

        let created_at = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let mut activity = Activity::new("P-1", "光纤熔接", (2, 3, 4), 10, created_at);
        activity.completed_units = 15;

        let id = repo.save(&activity).unwrap();
        let stored = repo.list_active("P-1").unwrap();

        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].activity_id, Some(id));
        assert_eq!(stored[0].completed_units, 10);
        assert_eq!(stored[0].percentage_completed, dec!(100));
    }

    #[test]
    fn test_deactivated_activity_is_excluded() {
        let conn = open_in_memory_connection().unwrap();
        ProjectRepositoryImpl::from_connection(conn.clone())
            .upsert_project(&Project::new("P-1"))
            .unwrap();
        let repo = ActivityRepositoryImpl::from_connection(conn);
        let created_at = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();

        let id = repo
            .save(&Activity::new("P-1", "旧活动", (1, 1, 1), 1, created_at))
            .unwrap();
        repo.deactivate(id).unwrap();

        assert!(repo.list_active("P-1").unwrap().is_empty());
        assert!(repo.deactivate(999).is_err());
    }
}
