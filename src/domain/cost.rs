// ==========================================
// 工程项目挣值管理系统 - 成本与回款单据
// ==========================================
// 职责: 采购订单 / 订单明细 / 供应商发票 / 客户发票
// 客户发票状态机: DRAFT → ISSUED → PAYMENT_REPORTED → PAYMENT_VERIFIED → PAID
//                 PAYMENT_REPORTED → PAYMENT_NOT_RECEIVED → PAYMENT_REPORTED
// ==========================================

use crate::domain::types::ClientInvoiceStatus;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 发票状态迁移不合法
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("发票状态不允许迁移: {from} → {to}")]
pub struct InvoiceTransitionError {
    pub from: ClientInvoiceStatus,
    pub to: ClientInvoiceStatus,
}

pub type TransitionResult = Result<(), InvoiceTransitionError>;

// ==========================================
// PurchaseOrder - 采购订单
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub po_id: String,
    pub project_id: String,
    pub issue_date: Option<NaiveDate>,
}

// ==========================================
// PoLineItem - 采购订单明细（附带所属订单的下单日期）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoLineItem {
    pub po_id: String,
    pub po_issue_date: Option<NaiveDate>,
    pub description: String,
    pub total: Option<Decimal>,
    pub local_total: Option<Decimal>, // 本币金额
}

impl PoLineItem {
    /// 本币金额优先，其次原币金额
    pub fn local_amount(&self) -> Decimal {
        self.local_total.or(self.total).unwrap_or(Decimal::ZERO)
    }
}

// ==========================================
// SupplierInvoice - 供应商发票（AC 首选来源）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierInvoice {
    pub invoice_id: String,
    pub po_id: String,
    pub invoice_number: String,
    pub issue_date: Option<NaiveDate>,
    pub total_amount: Decimal,
    pub currency: String,
    pub exchange_rate: Option<Decimal>,
}

impl SupplierInvoice {
    /// 折算为本币: 非本币时乘以汇率（缺省汇率 1）
    pub fn local_amount(&self, local_currency: &str) -> Decimal {
        if self.currency.eq_ignore_ascii_case(local_currency) {
            self.total_amount
        } else {
            self.total_amount * self.exchange_rate.unwrap_or(Decimal::ONE)
        }
    }
}

// ==========================================
// ClientInvoice - 客户发票（回款侧）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientInvoice {
    pub invoice_id: String,
    pub project_id: String,
    pub invoice_number: String,
    pub invoice_date: Option<NaiveDate>,
    pub amount: Decimal,
    pub status: ClientInvoiceStatus,
    pub due_date: Option<NaiveDate>,
    pub payment_reported_date: Option<NaiveDate>,
    pub bank_verified_date: Option<NaiveDate>,
    pub fully_paid_date: Option<NaiveDate>,
    pub paid_amount: Option<Decimal>,
}

impl ClientInvoice {
    /// 新建草稿发票
    pub fn draft(invoice_id: &str, project_id: &str, amount: Decimal) -> Self {
        Self {
            invoice_id: invoice_id.to_string(),
            project_id: project_id.to_string(),
            invoice_number: invoice_id.to_string(),
            invoice_date: None,
            amount,
            status: ClientInvoiceStatus::Draft,
            due_date: None,
            payment_reported_date: None,
            bank_verified_date: None,
            fully_paid_date: None,
            paid_amount: None,
        }
    }

    // ===== 状态迁移 =====

    /// 开具: DRAFT → ISSUED
    pub fn issue(&mut self, invoice_date: NaiveDate, due_date: Option<NaiveDate>) -> TransitionResult {
        self.ensure_status(&[ClientInvoiceStatus::Draft], ClientInvoiceStatus::Issued)?;
        self.invoice_date = Some(invoice_date);
        self.due_date = due_date;
        self.status = ClientInvoiceStatus::Issued;
        Ok(())
    }

    /// 客户报付款: ISSUED / PAYMENT_NOT_RECEIVED → PAYMENT_REPORTED
    pub fn report_payment(&mut self, reported_on: NaiveDate) -> TransitionResult {
        self.ensure_status(
            &[ClientInvoiceStatus::Issued, ClientInvoiceStatus::PaymentNotReceived],
            ClientInvoiceStatus::PaymentReported,
        )?;
        self.payment_reported_date = Some(reported_on);
        self.status = ClientInvoiceStatus::PaymentReported;
        Ok(())
    }

    /// 银行核实: PAYMENT_REPORTED → PAYMENT_VERIFIED → PAID
    ///
    /// 核实即结清: fully_paid_date 取核实日期
    /// paid_amount 取核实金额，未传入时沿用已有实收，再缺省取票面金额
    pub fn verify_payment(
        &mut self,
        verified_on: NaiveDate,
        paid_amount: Option<Decimal>,
    ) -> TransitionResult {
        self.ensure_status(
            &[ClientInvoiceStatus::PaymentReported],
            ClientInvoiceStatus::PaymentVerified,
        )?;
        self.bank_verified_date = Some(verified_on);
        // PAYMENT_VERIFIED 不停留，直接结清
        self.status = ClientInvoiceStatus::Paid;
        self.fully_paid_date = Some(verified_on);
        self.paid_amount = Some(paid_amount.or(self.paid_amount).unwrap_or(self.amount));
        Ok(())
    }

    /// 银行未到账: PAYMENT_REPORTED → PAYMENT_NOT_RECEIVED
    ///
    /// 清除报付款日期，客户需重新报付款
    pub fn reject_payment(&mut self) -> TransitionResult {
        self.ensure_status(
            &[ClientInvoiceStatus::PaymentReported],
            ClientInvoiceStatus::PaymentNotReceived,
        )?;
        self.payment_reported_date = None;
        self.status = ClientInvoiceStatus::PaymentNotReceived;
        Ok(())
    }

    fn ensure_status(
        &self,
        allowed: &[ClientInvoiceStatus],
        target: ClientInvoiceStatus,
    ) -> TransitionResult {
        if !allowed.contains(&self.status) {
            return Err(InvoiceTransitionError {
                from: self.status,
                to: target,
            });
        }
        Ok(())
    }

    // ===== 查询 =====

    pub fn can_report_payment(&self) -> bool {
        matches!(
            self.status,
            ClientInvoiceStatus::Issued | ClientInvoiceStatus::PaymentNotReceived
        )
    }

    pub fn can_verify_payment(&self) -> bool {
        self.status == ClientInvoiceStatus::PaymentReported
    }

    /// 未结清（已开具/已报付款/未到账）且超过到期日
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        matches!(
            self.status,
            ClientInvoiceStatus::Issued
                | ClientInvoiceStatus::PaymentReported
                | ClientInvoiceStatus::PaymentNotReceived
        ) && self.due_date.map_or(false, |due| due < today)
    }

    /// 问题发票: 客户报了付款但银行未到账
    pub fn has_payment_problem(&self) -> bool {
        self.status == ClientInvoiceStatus::PaymentNotReceived
    }

    pub fn is_fully_paid(&self) -> bool {
        self.status == ClientInvoiceStatus::Paid
            && self.paid_amount.map_or(false, |paid| paid >= self.amount)
    }

    /// 报付款至今天数
    pub fn days_since_reported(&self, today: NaiveDate) -> Option<i64> {
        self.payment_reported_date
            .map(|reported| (today - reported).num_days())
    }

    /// 回款日期优先级: 结清 > 银行核实 > 报付款 > 开票
    pub fn payment_date(&self) -> Option<NaiveDate> {
        self.fully_paid_date
            .or(self.bank_verified_date)
            .or(self.payment_reported_date)
            .or(self.invoice_date)
    }

    /// 回款金额: 实收优先，其次票面
    pub fn collected_amount(&self) -> Decimal {
        self.paid_amount
            .filter(|paid| !paid.is_zero())
            .unwrap_or(self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_client_invoice_full_lifecycle() {
        let mut invoice = ClientInvoice::draft("F001-1", "P-1", dec!(5000));
        invoice.issue(date(2025, 1, 10), Some(date(2025, 2, 10))).unwrap();
        assert!(invoice.can_report_payment());

        invoice.report_payment(date(2025, 2, 1)).unwrap();
        assert!(invoice.can_verify_payment());
        assert_eq!(invoice.days_since_reported(date(2025, 2, 5)), Some(4));

        invoice.verify_payment(date(2025, 2, 3), None).unwrap();
        assert_eq!(invoice.status, ClientInvoiceStatus::Paid);
        assert_eq!(invoice.bank_verified_date, Some(date(2025, 2, 3)));
        assert_eq!(invoice.fully_paid_date, Some(date(2025, 2, 3)));
        assert_eq!(invoice.paid_amount, Some(dec!(5000)));
        assert!(invoice.is_fully_paid());
    }

    #[test]
    fn test_cannot_verify_before_report() {
        let mut invoice = ClientInvoice::draft("F001-2", "P-1", dec!(100));
        invoice.issue(date(2025, 1, 10), None).unwrap();

        let err = invoice.verify_payment(date(2025, 1, 11), None).unwrap_err();
        assert_eq!(err.from, ClientInvoiceStatus::Issued);
        assert_eq!(err.to, ClientInvoiceStatus::PaymentVerified);
        assert_eq!(invoice.status, ClientInvoiceStatus::Issued);
    }

    #[test]
    fn test_verify_payment_overrides_stale_paid_amount() {
        let mut invoice = ClientInvoice::draft("F001-5", "P-1", dec!(1000));
        invoice.paid_amount = Some(dec!(500));
        invoice.issue(date(2025, 1, 1), None).unwrap();
        invoice.report_payment(date(2025, 1, 10)).unwrap();

        invoice.verify_payment(date(2025, 1, 12), Some(dec!(950))).unwrap();
        assert_eq!(invoice.paid_amount, Some(dec!(950)));
        assert_eq!(invoice.collected_amount(), dec!(950));
    }

    #[test]
    fn test_verify_payment_keeps_known_amount_when_not_given() {
        let mut invoice = ClientInvoice::draft("F001-6", "P-1", dec!(1000));
        invoice.paid_amount = Some(dec!(800));
        invoice.issue(date(2025, 1, 1), None).unwrap();
        invoice.report_payment(date(2025, 1, 10)).unwrap();

        invoice.verify_payment(date(2025, 1, 12), None).unwrap();
        assert_eq!(invoice.paid_amount, Some(dec!(800)));
    }

    #[test]
    fn test_reject_payment_allows_new_report() {
        let mut invoice = ClientInvoice::draft("F001-7", "P-1", dec!(300));
        invoice.issue(date(2025, 1, 1), Some(date(2025, 1, 31))).unwrap();
        invoice.report_payment(date(2025, 1, 20)).unwrap();

        invoice.reject_payment().unwrap();
        assert_eq!(invoice.status, ClientInvoiceStatus::PaymentNotReceived);
        assert!(invoice.has_payment_problem());
        assert_eq!(invoice.payment_reported_date, None);
        assert!(invoice.can_report_payment());
        assert!(!invoice.can_verify_payment());
        assert!(invoice.is_overdue(date(2025, 2, 1)));

        // 未到账的发票不能直接核实
        assert!(invoice.verify_payment(date(2025, 2, 1), None).is_err());

        invoice.report_payment(date(2025, 2, 3)).unwrap();
        invoice.verify_payment(date(2025, 2, 5), None).unwrap();
        assert_eq!(invoice.status, ClientInvoiceStatus::Paid);
        assert!(invoice.is_fully_paid());
    }

    #[test]
    fn test_reject_requires_reported_payment() {
        let mut invoice = ClientInvoice::draft("F001-8", "P-1", dec!(300));
        invoice.issue(date(2025, 1, 1), None).unwrap();

        let err = invoice.reject_payment().unwrap_err();
        assert_eq!(err.from, ClientInvoiceStatus::Issued);
        assert_eq!(err.to, ClientInvoiceStatus::PaymentNotReceived);
        assert_eq!(invoice.status, ClientInvoiceStatus::Issued);
    }

    #[test]
    fn test_is_overdue_only_for_open_invoices() {
        let mut invoice = ClientInvoice::draft("F001-3", "P-1", dec!(100));
        invoice.issue(date(2025, 1, 1), Some(date(2025, 1, 31))).unwrap();
        assert!(invoice.is_overdue(date(2025, 2, 1)));
        assert!(!invoice.is_overdue(date(2025, 1, 31)));

        invoice.report_payment(date(2025, 2, 2)).unwrap();
        invoice.verify_payment(date(2025, 2, 3), Some(dec!(100))).unwrap();
        assert!(!invoice.is_overdue(date(2025, 3, 1)));
    }

    #[test]
    fn test_payment_date_priority() {
        let mut invoice = ClientInvoice::draft("F001-4", "P-1", dec!(100));
        invoice.invoice_date = Some(date(2025, 1, 1));
        assert_eq!(invoice.payment_date(), Some(date(2025, 1, 1)));
        invoice.payment_reported_date = Some(date(2025, 2, 1));
        assert_eq!(invoice.payment_date(), Some(date(2025, 2, 1)));
        invoice.bank_verified_date = Some(date(2025, 3, 1));
        assert_eq!(invoice.payment_date(), Some(date(2025, 3, 1)));
        invoice.fully_paid_date = Some(date(2025, 4, 1));
        assert_eq!(invoice.payment_date(), Some(date(2025, 4, 1)));
    }

    #[test]
    fn test_supplier_invoice_currency_conversion() {
        let mut invoice = SupplierInvoice {
            invoice_id: "INV-1".to_string(),
            po_id: "PO-1".to_string(),
            invoice_number: "E001-1".to_string(),
            issue_date: Some(date(2025, 1, 5)),
            total_amount: dec!(100),
            currency: "USD".to_string(),
            exchange_rate: Some(dec!(3.75)),
        };
        assert_eq!(invoice.local_amount("PEN"), dec!(375.00));

        invoice.currency = "PEN".to_string();
        assert_eq!(invoice.local_amount("PEN"), dec!(100));
    }

    #[test]
    fn test_po_line_prefers_local_total() {
        let line = PoLineItem {
            po_id: "PO-1".to_string(),
            po_issue_date: None,
            description: String::new(),
            total: Some(dec!(10)),
            local_total: Some(dec!(37.5)),
        };
        assert_eq!(line.local_amount(), dec!(37.5));

        let line = PoLineItem { local_total: None, ..line };
        assert_eq!(line.local_amount(), dec!(10));
    }
}
