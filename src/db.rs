// ==========================================
// 工程项目挣值管理系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 提供幂等的建表入口（CLI / 测试共用）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开内存库并建表（单元测试 / 临时计算用）
pub fn open_in_memory_connection() -> rusqlite::Result<Arc<Mutex<Connection>>> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    init_schema(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 检查 schema_version 是否与代码期望一致（只告警，不做自动迁移）
pub fn warn_if_schema_mismatch(conn: &Connection) {
    match read_schema_version(conn) {
        Ok(Some(v)) if v == CURRENT_SCHEMA_VERSION => {}
        Ok(Some(v)) => tracing::warn!(
            found = v,
            expected = CURRENT_SCHEMA_VERSION,
            "schema_version 与代码不一致"
        ),
        Ok(None) => tracing::warn!("未找到 schema_version 表，数据库可能未初始化"),
        Err(e) => tracing::warn!(error = %e, "读取 schema_version 失败"),
    }
}

/// 初始化数据库 schema（幂等）
///
/// 金额/百分比字段以 TEXT 存储十进制字符串，避免浮点漂移；
/// 日期统一为 `YYYY-MM-DD`。
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(scope_type, scope_key)
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS opportunity (
            opportunity_id TEXT PRIMARY KEY,
            name TEXT NOT NULL DEFAULT '',
            total_costs TEXT,
            cost_aprox TEXT
        );

        CREATE TABLE IF NOT EXISTS project (
            project_id TEXT PRIMARY KEY,
            opportunity_id TEXT REFERENCES opportunity(opportunity_id),
            cost_center TEXT NOT NULL DEFAULT '',
            state TEXT NOT NULL DEFAULT 'PLANNED',
            start_date TEXT,
            estimated_duration INTEGER,
            physical_percent_complete TEXT,
            last_progress_update TEXT
        );

        CREATE TABLE IF NOT EXISTS project_progress (
            progress_id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id TEXT NOT NULL REFERENCES project(project_id) ON DELETE CASCADE,
            month_number INTEGER NOT NULL,
            planned_percentage TEXT NOT NULL,
            actual_percentage TEXT NOT NULL,
            record_date TEXT NOT NULL DEFAULT (date('now'))
        );

        CREATE TABLE IF NOT EXISTS project_activity (
            activity_id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id TEXT NOT NULL REFERENCES project(project_id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            unit_of_measure TEXT NOT NULL DEFAULT '',
            complexity INTEGER NOT NULL,
            effort INTEGER NOT NULL,
            impact INTEGER NOT NULL,
            calculated_weight TEXT NOT NULL DEFAULT '0.00',
            total_units INTEGER NOT NULL,
            completed_units INTEGER NOT NULL DEFAULT 0,
            percentage_completed TEXT NOT NULL DEFAULT '0.00',
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_activity_project_active
            ON project_activity(project_id, is_active);

        CREATE TABLE IF NOT EXISTS budget_change (
            change_id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id TEXT NOT NULL REFERENCES project(project_id) ON DELETE CASCADE,
            amount TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'APPROVED',
            reason TEXT NOT NULL DEFAULT '',
            change_date TEXT
        );

        CREATE TABLE IF NOT EXISTS purchase_order (
            po_id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL REFERENCES project(project_id) ON DELETE CASCADE,
            issue_date TEXT
        );

        CREATE TABLE IF NOT EXISTS po_line_item (
            line_id INTEGER PRIMARY KEY AUTOINCREMENT,
            po_id TEXT NOT NULL REFERENCES purchase_order(po_id) ON DELETE CASCADE,
            description TEXT NOT NULL DEFAULT '',
            total TEXT,
            local_total TEXT
        );

        CREATE TABLE IF NOT EXISTS supplier_invoice (
            invoice_id TEXT PRIMARY KEY,
            po_id TEXT NOT NULL REFERENCES purchase_order(po_id) ON DELETE CASCADE,
            invoice_number TEXT NOT NULL DEFAULT '',
            issue_date TEXT,
            total_amount TEXT NOT NULL DEFAULT '0',
            currency TEXT NOT NULL DEFAULT 'PEN',
            exchange_rate TEXT
        );

        CREATE TABLE IF NOT EXISTS client_invoice (
            invoice_id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL REFERENCES project(project_id) ON DELETE CASCADE,
            invoice_number TEXT NOT NULL DEFAULT '',
            invoice_date TEXT,
            amount TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'DRAFT',
            due_date TEXT,
            payment_reported_date TEXT,
            bank_verified_date TEXT,
            fully_paid_date TEXT,
            paid_amount TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_client_invoice_project_status
            ON client_invoice(project_id, status);

        CREATE TABLE IF NOT EXISTS project_baseline (
            project_id TEXT PRIMARY KEY REFERENCES project(project_id) ON DELETE CASCADE,
            version_name TEXT NOT NULL DEFAULT 'initial',
            start_date TEXT,
            duration_months INTEGER NOT NULL DEFAULT 1,
            bac_planned TEXT NOT NULL DEFAULT '0',
            contract_planned TEXT NOT NULL DEFAULT '0',
            notes TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS project_monthly_baseline (
            project_id TEXT NOT NULL REFERENCES project_baseline(project_id) ON DELETE CASCADE,
            month_index INTEGER NOT NULL,
            pv_planned TEXT NOT NULL DEFAULT '0',
            ev_planned TEXT NOT NULL DEFAULT '0',
            ac_planned TEXT NOT NULL DEFAULT '0',
            client_billing_planned TEXT NOT NULL DEFAULT '0',
            progress_planned TEXT NOT NULL DEFAULT '0',
            label TEXT NOT NULL DEFAULT '',
            PRIMARY KEY (project_id, month_index)
        );

        CREATE TABLE IF NOT EXISTS earned_value_snapshot (
            project_id TEXT PRIMARY KEY REFERENCES project(project_id) ON DELETE CASCADE,
            snapshot_id TEXT NOT NULL,
            curve_data_json TEXT NOT NULL,
            bac TEXT NOT NULL,
            cpi TEXT NOT NULL,
            spi TEXT NOT NULL,
            cv TEXT NOT NULL,
            sv TEXT NOT NULL,
            eac TEXT NOT NULL,
            etc TEXT NOT NULL,
            analysis_date TEXT NOT NULL
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_read_schema_version_without_table() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
    }
}
