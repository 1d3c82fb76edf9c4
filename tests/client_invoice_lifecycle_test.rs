// ==========================================
// 客户发票生命周期集成测试
// ==========================================
// 生命周期: DRAFT → ISSUED → PAYMENT_REPORTED → (核实即结清) PAID
// 银行未到账: PAYMENT_REPORTED → PAYMENT_NOT_RECEIVED → 重新报付款
// ==========================================

mod helpers;
mod test_helpers;

use helpers::seed::*;
use project_evm::domain::cost::ClientInvoice;
use project_evm::domain::types::ClientInvoiceStatus;
use project_evm::repository::{ClientInvoiceRepository, ClientInvoiceRepositoryImpl, RepositoryError};
use rusqlite::Connection;
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};
use test_helpers::*;

#[test]
fn test_lifecycle_persists_each_step() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let conn = open_shared(&db_path).unwrap();
    ProjectBuilder::new("P-1")
        .total_costs(dec!(1000))
        .insert(&conn)
        .unwrap();
    let repo = ClientInvoiceRepositoryImpl::from_connection(conn.clone());

    let mut invoice = ClientInvoice::draft("CI-1", "P-1", dec!(1500));
    repo.save(&invoice).unwrap();
    assert_eq!(repo.list_by_project("P-1").unwrap()[0].status, ClientInvoiceStatus::Draft);

    invoice
        .issue(date(2025, 2, 1), Some(date(2025, 3, 1)))
        .unwrap();
    repo.save(&invoice).unwrap();
    assert!(invoice.can_report_payment());
    assert!(invoice.is_overdue(date(2025, 3, 2)));
    assert!(!invoice.is_overdue(date(2025, 2, 15)));

    invoice.report_payment(date(2025, 2, 20)).unwrap();
    repo.save(&invoice).unwrap();
    assert!(invoice.can_verify_payment());
    assert_eq!(invoice.days_since_reported(date(2025, 2, 25)), Some(5));

    invoice.verify_payment(date(2025, 2, 24), None).unwrap();
    repo.save(&invoice).unwrap();

    let stored = repo.list_by_project("P-1").unwrap();
    assert_eq!(stored.len(), 1);
    let stored = &stored[0];
    assert_eq!(stored, &invoice);
    assert_eq!(stored.status, ClientInvoiceStatus::Paid);
    assert_eq!(stored.bank_verified_date, Some(date(2025, 2, 24)));
    assert_eq!(stored.fully_paid_date, Some(date(2025, 2, 24)));
    assert_eq!(stored.paid_amount, Some(dec!(1500)));
    assert!(stored.is_fully_paid());
    assert!(!stored.is_overdue(date(2025, 12, 31)));
    assert_eq!(stored.payment_date(), Some(date(2025, 2, 24)));
}

#[test]
fn test_invalid_transitions_rejected() {
    let mut invoice = ClientInvoice::draft("CI-1", "P-1", dec!(100));

    let err = invoice.report_payment(date(2025, 1, 1)).unwrap_err();
    assert_eq!(err.from, ClientInvoiceStatus::Draft);

    invoice.issue(date(2025, 1, 1), None).unwrap();
    let err: RepositoryError = invoice
        .verify_payment(date(2025, 1, 2), None)
        .unwrap_err()
        .into();
    match err {
        RepositoryError::InvalidStateTransition { from, to } => {
            assert_eq!(from, "ISSUED");
            assert_eq!(to, "PAYMENT_VERIFIED");
        }
        other => panic!("Expected InvalidStateTransition, got {:?}", other),
    }
    assert_eq!(invoice.status, ClientInvoiceStatus::Issued);
}

#[test]
fn test_partial_payment_is_not_fully_paid() {
    let mut invoice = ClientInvoice::draft("CI-1", "P-1", dec!(1000));
    invoice.issue(date(2025, 1, 1), None).unwrap();
    invoice.report_payment(date(2025, 1, 10)).unwrap();
    invoice.verify_payment(date(2025, 1, 12), Some(dec!(600))).unwrap();

    assert_eq!(invoice.status, ClientInvoiceStatus::Paid);
    assert_eq!(invoice.collected_amount(), dec!(600));
    assert!(!invoice.is_fully_paid());
}

fn seeded_repo() -> (tempfile::NamedTempFile, Arc<Mutex<Connection>>, ClientInvoiceRepositoryImpl) {
    let (tmp, db_path) = create_test_db().unwrap();
    let conn = open_shared(&db_path).unwrap();
    ProjectBuilder::new("P-1")
        .total_costs(dec!(1000))
        .insert(&conn)
        .unwrap();
    let repo = ClientInvoiceRepositoryImpl::from_connection(conn.clone());
    (tmp, conn, repo)
}

#[test]
fn test_verified_amount_replaces_stored_paid_amount() {
    let (_tmp, _conn, repo) = seeded_repo();

    let mut invoice = ClientInvoice::draft("CI-2", "P-1", dec!(1000));
    invoice.paid_amount = Some(dec!(500));
    invoice.issue(date(2025, 1, 1), None).unwrap();
    invoice.report_payment(date(2025, 1, 10)).unwrap();
    repo.save(&invoice).unwrap();

    let mut stored = repo.list_by_project("P-1").unwrap().remove(0);
    assert_eq!(stored.paid_amount, Some(dec!(500)));

    stored.verify_payment(date(2025, 1, 12), Some(dec!(950))).unwrap();
    repo.save(&stored).unwrap();

    let stored = repo.list_by_project("P-1").unwrap().remove(0);
    assert_eq!(stored.paid_amount, Some(dec!(950)));
    assert_eq!(stored.collected_amount(), dec!(950));
    assert!(!stored.is_fully_paid());
}

#[test]
fn test_rejected_payment_persists_and_can_be_reported_again() {
    let (_tmp, _conn, repo) = seeded_repo();

    let mut invoice = ClientInvoice::draft("CI-3", "P-1", dec!(400));
    invoice.issue(date(2025, 1, 1), Some(date(2025, 1, 31))).unwrap();
    invoice.report_payment(date(2025, 1, 20)).unwrap();
    invoice.reject_payment().unwrap();
    repo.save(&invoice).unwrap();

    let mut stored = repo.list_by_project("P-1").unwrap().remove(0);
    assert_eq!(stored.status, ClientInvoiceStatus::PaymentNotReceived);
    assert!(stored.has_payment_problem());
    assert!(stored.is_overdue(date(2025, 2, 15)));
    assert!(!stored.status.is_verified());

    stored.report_payment(date(2025, 2, 16)).unwrap();
    stored.verify_payment(date(2025, 2, 18), None).unwrap();
    repo.save(&stored).unwrap();

    let stored = repo.list_by_project("P-1").unwrap().remove(0);
    assert_eq!(stored.status, ClientInvoiceStatus::Paid);
    assert_eq!(stored.payment_date(), Some(date(2025, 2, 18)));
    assert_eq!(stored.paid_amount, Some(dec!(400)));
}
