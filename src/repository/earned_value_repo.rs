// ==========================================
// 工程项目挣值管理系统 - 挣值快照数据仓储
// ==========================================
// 表: earned_value_snapshot（每项目一条，INSERT OR REPLACE）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::evm::{CurveData, EarnedValueSnapshot};
use crate::repository::codec::{datetime_to_text, decimal_to_text, parse_datetime, parse_decimal};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::traits::EarnedValueRepository;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

pub struct EarnedValueRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl EarnedValueRepositoryImpl {
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

impl EarnedValueRepository for EarnedValueRepositoryImpl {
    fn save_snapshot(&self, snapshot: &EarnedValueSnapshot) -> RepositoryResult<()> {
        let curve_json = serde_json::to_string(&snapshot.curve_data)?;

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO earned_value_snapshot (
                project_id, snapshot_id, curve_data_json,
                bac, cpi, spi, cv, sv, eac, etc, analysis_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                snapshot.project_id,
                snapshot.snapshot_id,
                curve_json,
                decimal_to_text(snapshot.bac),
                decimal_to_text(snapshot.cpi),
                decimal_to_text(snapshot.spi),
                decimal_to_text(snapshot.cv),
                decimal_to_text(snapshot.sv),
                decimal_to_text(snapshot.eac),
                decimal_to_text(snapshot.etc),
                datetime_to_text(snapshot.analysis_date),
            ],
        )?;
        Ok(())
    }

    fn find_snapshot(&self, project_id: &str) -> RepositoryResult<Option<EarnedValueSnapshot>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                r#"
                SELECT project_id, snapshot_id, curve_data_json,
                       bac, cpi, spi, cv, sv, eac, etc, analysis_date
                FROM earned_value_snapshot
                WHERE project_id = ?1
                "#,
                params![project_id],
                |row| {
                    let mut values = Vec::with_capacity(11);
                    for idx in 0..11 {
                        values.push(row.get::<_, String>(idx)?);
                    }
                    Ok(values)
                },
            )
            .optional()?;

        let Some(values) = raw else {
            return Ok(None);
        };

        let curve_data: CurveData = serde_json::from_str(&values[2])?;
        Ok(Some(EarnedValueSnapshot {
            project_id: values[0].clone(),
            snapshot_id: values[1].clone(),
            curve_data,
            bac: parse_decimal("bac", &values[3])?,
            cpi: parse_decimal("cpi", &values[4])?,
            spi: parse_decimal("spi", &values[5])?,
            cv: parse_decimal("cv", &values[6])?,
            sv: parse_decimal("sv", &values[7])?,
            eac: parse_decimal("eac", &values[8])?,
            etc: parse_decimal("etc", &values[9])?,
            analysis_date: parse_datetime("analysis_date", &values[10])?,
        }))
    }
}
