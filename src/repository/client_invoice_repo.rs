// ==========================================
// 工程项目挣值管理系统 - 客户发票数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑（状态迁移规则在领域对象中）
// 表: client_invoice
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::cost::ClientInvoice;
use crate::domain::types::ClientInvoiceStatus;
use crate::repository::codec::{
    date_to_text, decimal_to_text, parse_decimal, parse_opt_date, parse_opt_decimal,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::traits::ClientInvoiceRepository;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

pub struct ClientInvoiceRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl ClientInvoiceRepositoryImpl {
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

impl ClientInvoiceRepository for ClientInvoiceRepositoryImpl {
    fn list_by_project(&self, project_id: &str) -> RepositoryResult<Vec<ClientInvoice>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT invoice_id, project_id, invoice_number, invoice_date, amount, status,
                   due_date, payment_reported_date, bank_verified_date, fully_paid_date,
                   paid_amount
            FROM client_invoice
            WHERE project_id = ?1
            ORDER BY invoice_date, invoice_id
            "#,
        )?;

        let rows = stmt.query_map(params![project_id], |row| {
            Ok((
                (
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ),
                (
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, Option<String>>(8)?,
                    row.get::<_, Option<String>>(9)?,
                    row.get::<_, Option<String>>(10)?,
                ),
            ))
        })?;

        let mut invoices = Vec::new();
        for row in rows {
            let (
                (invoice_id, project_id, invoice_number, invoice_date, amount, status),
                (due, reported, verified, paid, paid_amount),
            ) = row?;
            let status = status.parse::<ClientInvoiceStatus>().map_err(|message| {
                RepositoryError::FieldValueError {
                    field: "status".to_string(),
                    message,
                }
            })?;

            invoices.push(ClientInvoice {
                invoice_id,
                project_id,
                invoice_number,
                invoice_date: parse_opt_date("invoice_date", invoice_date)?,
                amount: parse_decimal("amount", &amount)?,
                status,
                due_date: parse_opt_date("due_date", due)?,
                payment_reported_date: parse_opt_date("payment_reported_date", reported)?,
                bank_verified_date: parse_opt_date("bank_verified_date", verified)?,
                fully_paid_date: parse_opt_date("fully_paid_date", paid)?,
                paid_amount: parse_opt_decimal("paid_amount", paid_amount)?,
            });
        }
        Ok(invoices)
    }

    fn save(&self, invoice: &ClientInvoice) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO client_invoice (
                invoice_id, project_id, invoice_number, invoice_date, amount, status,
                due_date, payment_reported_date, bank_verified_date, fully_paid_date,
                paid_amount
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(invoice_id) DO UPDATE SET
                invoice_number = excluded.invoice_number,
                invoice_date = excluded.invoice_date,
                amount = excluded.amount,
                status = excluded.status,
                due_date = excluded.due_date,
                payment_reported_date = excluded.payment_reported_date,
                bank_verified_date = excluded.bank_verified_date,
                fully_paid_date = excluded.fully_paid_date,
                paid_amount = excluded.paid_amount
            "#,
            params![
                invoice.invoice_id,
                invoice.project_id,
                invoice.invoice_number,
                invoice.invoice_date.map(date_to_text),
                decimal_to_text(invoice.amount),
                invoice.status.to_string(),
                invoice.due_date.map(date_to_text),
                invoice.payment_reported_date.map(date_to_text),
                invoice.bank_verified_date.map(date_to_text),
                invoice.fully_paid_date.map(date_to_text),
                invoice.paid_amount.map(decimal_to_text),
            ],
        )?;
        Ok(())
    }
}
