// ==========================================
// 工程项目挣值管理系统 - 基线数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 表: project_baseline / project_monthly_baseline
// 约束: (project_id, month_index) 唯一；插入不覆盖已有月份
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::baseline::{BudgetBaseline, MonthlyBaselinePoint};
use crate::repository::codec::{date_to_text, decimal_to_text, parse_decimal, parse_opt_date};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::traits::BaselineRepository;
use rust_decimal::Decimal;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

// ==========================================
// BaselineRepositoryImpl
// ==========================================
pub struct BaselineRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl BaselineRepositoryImpl {
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
}

impl BaselineRepository for BaselineRepositoryImpl {
    fn find_baseline(&self, project_id: &str) -> RepositoryResult<Option<BudgetBaseline>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                r#"
                SELECT project_id, version_name, start_date, duration_months,
                       bac_planned, contract_planned, notes
                FROM project_baseline
                WHERE project_id = ?1
                "#,
                params![project_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, u32>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((project_id, version_name, start, duration, bac, contract, notes)) = raw else {
            return Ok(None);
        };

        Ok(Some(BudgetBaseline {
            project_id,
            version_name,
            start_date: parse_opt_date("start_date", start)?,
            duration_months: duration,
            bac_planned: parse_decimal("bac_planned", &bac)?,
            contract_planned: parse_decimal("contract_planned", &contract)?,
            notes,
        }))
    }

    fn save_baseline(&self, baseline: &BudgetBaseline) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO project_baseline (
                project_id, version_name, start_date, duration_months,
                bac_planned, contract_planned, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(project_id) DO UPDATE SET
                version_name = excluded.version_name,
                start_date = excluded.start_date,
                duration_months = excluded.duration_months,
                bac_planned = excluded.bac_planned,
                contract_planned = excluded.contract_planned,
                notes = excluded.notes,
                updated_at = datetime('now')
            "#,
            params![
                baseline.project_id,
                baseline.version_name,
                baseline.start_date.map(date_to_text),
                baseline.duration_months,
                decimal_to_text(baseline.bac_planned),
                decimal_to_text(baseline.contract_planned),
                baseline.notes,
            ],
        )?;
        Ok(())
    }

    fn list_points(&self, project_id: &str) -> RepositoryResult<Vec<MonthlyBaselinePoint>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT project_id, month_index, pv_planned, ev_planned, ac_planned,
                   client_billing_planned, progress_planned, label
            FROM project_monthly_baseline
            WHERE project_id = ?1
            ORDER BY month_index
            "#,
        )?;

        let rows = stmt.query_map(params![project_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut points = Vec::new();
        for row in rows {
            let (project_id, month_index, pv, ev, ac, billing, progress, label) = row?;
            points.push(MonthlyBaselinePoint {
                project_id,
                month_index,
                pv_planned: parse_decimal("pv_planned", &pv)?,
                ev_planned: parse_decimal("ev_planned", &ev)?,
                ac_planned: parse_decimal("ac_planned", &ac)?,
                client_billing_planned: parse_decimal("client_billing_planned", &billing)?,
                progress_planned: parse_decimal("progress_planned", &progress)?,
                label,
            });
        }
        Ok(points)
    }

    fn existing_month_indices(&self, project_id: &str) -> RepositoryResult<BTreeSet<u32>> {
        let conn = self.get_conn()?;
        let mut stmt = conn
            .prepare("SELECT month_index FROM project_monthly_baseline WHERE project_id = ?1")?;
        let rows = stmt.query_map(params![project_id], |row| row.get::<_, u32>(0))?;

        let mut indices = BTreeSet::new();
        for row in rows {
            indices.insert(row?);
        }
        Ok(indices)
    }

    fn insert_points(&self, points: &[MonthlyBaselinePoint]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let mut count = 0;
        for point in points {
            // 已存在的月份不覆盖
            count += tx.execute(
                r#"
                INSERT OR IGNORE INTO project_monthly_baseline (
                    project_id, month_index, pv_planned, ev_planned, ac_planned,
                    client_billing_planned, progress_planned, label
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    point.project_id,
                    point.month_index,
                    decimal_to_text(point.pv_planned),
                    decimal_to_text(point.ev_planned),
                    decimal_to_text(point.ac_planned),
                    decimal_to_text(point.client_billing_planned),
                    decimal_to_text(point.progress_planned),
                    point.label,
                ],
            )?;
        }

        tx.commit()?;
        Ok(count)
    }

    fn update_pv_ev(
        &self,
        project_id: &str,
        values: &[(u32, Decimal, Decimal)],
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let mut count = 0;
        for (month_index, pv, ev) in values {
            count += tx.execute(
                r#"
                UPDATE project_monthly_baseline SET pv_planned = ?1, ev_planned = ?2
                WHERE project_id = ?3 AND month_index = ?4
                "#,
                params![decimal_to_text(*pv), decimal_to_text(*ev), project_id, month_index],
            )?;
        }

        tx.commit()?;
        Ok(count)
    }

    fn update_progress_planned(
        &self,
        project_id: &str,
        values: &[(u32, Decimal)],
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let mut count = 0;
        for (month_index, progress) in values {
            count += tx.execute(
                r#"
                UPDATE project_monthly_baseline SET progress_planned = ?1
                WHERE project_id = ?2 AND month_index = ?3
                "#,
                params![decimal_to_text(*progress), project_id, month_index],
            )?;
        }

        tx.commit()?;
        Ok(count)
    }
}
