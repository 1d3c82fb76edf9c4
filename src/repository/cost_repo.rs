// ==========================================
// 工程项目挣值管理系统 - 成本数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 表: purchase_order / po_line_item / supplier_invoice
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::cost::{PoLineItem, PurchaseOrder, SupplierInvoice};
use crate::repository::codec::{
    date_to_text, decimal_to_text, parse_decimal, parse_opt_date, parse_opt_decimal,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::traits::CostRepository;
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// CostRepositoryImpl
// ==========================================
pub struct CostRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl CostRepositoryImpl {
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

    // ==========================================
    // 写入
    // ==========================================

    pub fn upsert_purchase_order(&self, order: &PurchaseOrder) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO purchase_order (po_id, project_id, issue_date) VALUES (?1, ?2, ?3)
            ON CONFLICT(po_id) DO UPDATE SET
                project_id = excluded.project_id,
                issue_date = excluded.issue_date
            "#,
            params![order.po_id, order.project_id, order.issue_date.map(date_to_text)],
        )?;
        Ok(())
    }

    /// 追加订单明细（po_issue_date 以所属订单为准，此处忽略）
    pub fn insert_po_line(&self, line: &PoLineItem) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO po_line_item (po_id, description, total, local_total) VALUES (?1, ?2, ?3, ?4)",
            params![
                line.po_id,
                line.description,
                line.total.map(decimal_to_text),
                line.local_total.map(decimal_to_text),
            ],
        )?;
        Ok(())
    }

    pub fn upsert_supplier_invoice(&self, invoice: &SupplierInvoice) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO supplier_invoice (
                invoice_id, po_id, invoice_number, issue_date,
                total_amount, currency, exchange_rate
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                invoice.invoice_id,
                invoice.po_id,
                invoice.invoice_number,
                invoice.issue_date.map(date_to_text),
                decimal_to_text(invoice.total_amount),
                invoice.currency,
                invoice.exchange_rate.map(decimal_to_text),
            ],
        )?;
        Ok(())
    }
}

impl CostRepository for CostRepositoryImpl {
    fn list_supplier_invoices(&self, project_id: &str) -> RepositoryResult<Vec<SupplierInvoice>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT si.invoice_id, si.po_id, si.invoice_number, si.issue_date,
                   si.total_amount, si.currency, si.exchange_rate
            FROM supplier_invoice si
            JOIN purchase_order po ON po.po_id = si.po_id
            WHERE po.project_id = ?1
            ORDER BY si.issue_date, si.invoice_id
            "#,
        )?;

        let rows = stmt.query_map(params![project_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<String>>(6)?,
            ))
        })?;

        let mut invoices = Vec::new();
        for row in rows {
            let (invoice_id, po_id, invoice_number, issue_date, total, currency, rate) = row?;
            invoices.push(SupplierInvoice {
                invoice_id,
                po_id,
                invoice_number,
                issue_date: parse_opt_date("issue_date", issue_date)?,
                total_amount: parse_decimal("total_amount", &total)?,
                currency,
                exchange_rate: parse_opt_decimal("exchange_rate", rate)?,
            });
        }
        Ok(invoices)
    }

    fn list_po_lines(&self, project_id: &str) -> RepositoryResult<Vec<PoLineItem>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT li.po_id, po.issue_date, li.description, li.total, li.local_total
            FROM po_line_item li
            JOIN purchase_order po ON po.po_id = li.po_id
            WHERE po.project_id = ?1
            ORDER BY po.issue_date, li.line_id
            "#,
        )?;

        let rows = stmt.query_map(params![project_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?;

        let mut lines = Vec::new();
        for row in rows {
            let (po_id, issue_date, description, total, local_total) = row?;
            lines.push(PoLineItem {
                po_id,
                po_issue_date: parse_opt_date("issue_date", issue_date)?,
                description,
                total: parse_opt_decimal("total", total)?,
                local_total: parse_opt_decimal("local_total", local_total)?,
            });
        }
        Ok(lines)
    }

    fn first_po_issue_date(&self, project_id: &str) -> RepositoryResult<Option<NaiveDate>> {
        let conn = self.get_conn()?;
        let raw: Option<String> = conn.query_row(
            "SELECT MIN(issue_date) FROM purchase_order WHERE project_id = ?1",
            params![project_id],
            |row| row.get(0),
        )?;
        parse_opt_date("issue_date", raw)
    }
}
