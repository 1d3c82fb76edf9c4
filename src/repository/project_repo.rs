// ==========================================
// 工程项目挣值管理系统 - 项目数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 表: opportunity / project / project_progress / budget_change
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::project::{BudgetChange, Opportunity, ProgressRecord, Project};
use crate::domain::types::{ApprovalStatus, ProjectState};
use crate::repository::codec::{
    date_to_text, decimal_to_text, parse_decimal, parse_opt_date, parse_opt_decimal,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::traits::ProjectRepository;
use rust_decimal::Decimal;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

// ==========================================
// ProjectRepositoryImpl
// ==========================================
pub struct ProjectRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl ProjectRepositoryImpl {
    /// 创建新的 ProjectRepositoryImpl 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入（种子数据 / 外部同步）
    // ==========================================

    /// 插入或更新销售机会
    pub fn upsert_opportunity(&self, opportunity: &Opportunity) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO opportunity (opportunity_id, name, total_costs, cost_aprox)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(opportunity_id) DO UPDATE SET
                name = excluded.name,
                total_costs = excluded.total_costs,
                cost_aprox = excluded.cost_aprox
            "#,
            params![
                opportunity.opportunity_id,
                opportunity.name,
                opportunity.total_costs.map(decimal_to_text),
                opportunity.cost_aprox.map(decimal_to_text),
            ],
        )?;
        Ok(())
    }

    /// 插入或更新项目
    pub fn upsert_project(&self, project: &Project) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO project (
                project_id, opportunity_id, cost_center, state, start_date,
                estimated_duration, physical_percent_complete, last_progress_update
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(project_id) DO UPDATE SET
                opportunity_id = excluded.opportunity_id,
                cost_center = excluded.cost_center,
                state = excluded.state,
                start_date = excluded.start_date,
                estimated_duration = excluded.estimated_duration,
                physical_percent_complete = excluded.physical_percent_complete,
                last_progress_update = excluded.last_progress_update
            "#,
            params![
                project.project_id,
                project.opportunity_id,
                project.cost_center,
                project.state.to_string(),
                project.start_date.map(date_to_text),
                project.estimated_duration,
                project.physical_percent_complete.map(decimal_to_text),
                project.last_progress_update.map(date_to_text),
            ],
        )?;
        Ok(())
    }

    /// 追加月度进度日志
    pub fn insert_progress_record(&self, record: &ProgressRecord) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO project_progress (
                project_id, month_number, planned_percentage, actual_percentage, record_date
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                record.project_id,
                record.month_number,
                decimal_to_text(record.planned_percentage),
                decimal_to_text(record.actual_percentage),
                date_to_text(record.record_date),
            ],
        )?;
        Ok(())
    }

    /// 追加预算变更
    pub fn insert_budget_change(&self, change: &BudgetChange) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO budget_change (project_id, amount, status, reason, change_date)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                change.project_id,
                decimal_to_text(change.amount),
                change.status.to_string(),
                change.reason,
                change.change_date.map(date_to_text),
            ],
        )?;
        Ok(())
    }
}

impl ProjectRepository for ProjectRepositoryImpl {
    fn find_project(&self, project_id: &str) -> RepositoryResult<Option<Project>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                r#"
                SELECT project_id, opportunity_id, cost_center, state, start_date,
                       estimated_duration, physical_percent_complete, last_progress_update
                FROM project
                WHERE project_id = ?1
                "#,
                params![project_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, Option<u32>>(5)?,
                        row.get::<_, Option<String>>(6)?,
                        row.get::<_, Option<String>>(7)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, opportunity_id, cost_center, state, start, duration, pct, last)) = raw else {
            return Ok(None);
        };

        let state = state
            .parse::<ProjectState>()
            .map_err(|message| RepositoryError::FieldValueError {
                field: "state".to_string(),
                message,
            })?;

        Ok(Some(Project {
            project_id: id,
            opportunity_id,
            cost_center,
            state,
            start_date: parse_opt_date("start_date", start)?,
            estimated_duration: duration,
            physical_percent_complete: parse_opt_decimal("physical_percent_complete", pct)?,
            last_progress_update: parse_opt_date("last_progress_update", last)?,
        }))
    }

    fn find_opportunity(&self, opportunity_id: &str) -> RepositoryResult<Option<Opportunity>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                "SELECT opportunity_id, name, total_costs, cost_aprox FROM opportunity WHERE opportunity_id = ?1",
                params![opportunity_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                },
            )
            .optional()?;

        match raw {
            Some((id, name, total, aprox)) => Ok(Some(Opportunity {
                opportunity_id: id,
                name,
                total_costs: parse_opt_decimal("total_costs", total)?,
                cost_aprox: parse_opt_decimal("cost_aprox", aprox)?,
            })),
            None => Ok(None),
        }
    }

    fn list_budget_changes(&self, project_id: &str) -> RepositoryResult<Vec<BudgetChange>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT project_id, amount, status, reason, change_date
            FROM budget_change
            WHERE project_id = ?1
            ORDER BY change_id
            "#,
        )?;

        let rows = stmt.query_map(params![project_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?;

        let mut changes = Vec::new();
        for row in rows {
            let (project_id, amount, status, reason, change_date) = row?;
            let status = status
                .parse::<ApprovalStatus>()
                .map_err(|message| RepositoryError::FieldValueError {
                    field: "status".to_string(),
                    message,
                })?;
            changes.push(BudgetChange {
                project_id,
                amount: parse_decimal("amount", &amount)?,
                status,
                reason,
                change_date: parse_opt_date("change_date", change_date)?,
            });
        }
        Ok(changes)
    }

    fn max_actual_progress(&self, project_id: &str) -> RepositoryResult<Option<Decimal>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT actual_percentage FROM project_progress WHERE project_id = ?1")?;
        let rows = stmt.query_map(params![project_id], |row| row.get::<_, String>(0))?;

        // TEXT 列不能直接 MAX()，在内存中比较
        let mut max: Option<Decimal> = None;
        for row in rows {
            let value = parse_decimal("actual_percentage", &row?)?;
            max = Some(max.map_or(value, |m| m.max(value)));
        }
        Ok(max)
    }
}
