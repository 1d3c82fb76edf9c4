// ==========================================
// EvmApi 集成测试
// ==========================================
// 测试范围:
// 1. 配置覆写即时影响计算（本币 / 默认工期）
// 2. 错误转换（缺少成本基线 → 数据不完整）
// 3. 快照读写、计划进度录入
// ==========================================

mod helpers;
mod test_helpers;

use helpers::seed::*;
use project_evm::api::{ApiError, EvmApi};
use project_evm::config::config_keys;
use rust_decimal_macros::dec;
use test_helpers::*;

fn api(db_path: &str) -> EvmApi {
    EvmApi::from_connection(open_shared(db_path).unwrap())
        .unwrap()
        .with_reference_date(date(2025, 3, 15))
}

#[test]
fn test_default_duration_from_config() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let conn = open_shared(&db_path).unwrap();
    ProjectBuilder::new("P-1")
        .total_costs(dec!(6000))
        .start_date(date(2025, 1, 1))
        .insert(&conn)
        .unwrap();

    let api = api(&db_path);
    api.config_manager()
        .set_global_value(config_keys::DEFAULT_DURATION_MONTHS, "6")
        .unwrap();

    let dashboard = api.get_pmi_dashboard_data("P-1").unwrap();
    assert_eq!(dashboard.evm.curve_data.months.len(), 6);
    assert_eq!(dashboard.evm.curve_data.pv[0], dec!(1000));
}

#[test]
fn test_local_currency_from_config() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let conn = open_shared(&db_path).unwrap();
    ProjectBuilder::new("P-1")
        .total_costs(dec!(10000))
        .start_date(date(2025, 1, 1))
        .duration(2)
        .insert(&conn)
        .unwrap();
    add_purchase_order(&conn, "P-1", "PO-1", Some(date(2025, 1, 2))).unwrap();
    add_supplier_invoice(&conn, "PO-1", "F-1", date(2025, 1, 5), dec!(100), "PEN", Some(dec!(0.25)))
        .unwrap();
    add_supplier_invoice(&conn, "PO-1", "F-2", date(2025, 1, 6), dec!(50), "USD", Some(dec!(4)))
        .unwrap();

    let api = api(&db_path);
    let before = api.get_pmi_dashboard_data("P-1").unwrap();
    // 本币 PEN: 100 + 50×4
    assert_eq!(before.evm.curve_data.ac[0], dec!(300));

    api.config_manager()
        .set_global_value(config_keys::LOCAL_CURRENCY, "usd")
        .unwrap();
    let after = api.get_pmi_dashboard_data("P-1").unwrap();
    // 本币 USD: 100×0.25 + 50
    assert_eq!(after.evm.curve_data.ac[0], dec!(75));
}

#[test]
fn test_missing_cost_baseline_maps_to_incomplete_data() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let conn = open_shared(&db_path).unwrap();
    ProjectBuilder::new("P-1").insert(&conn).unwrap();

    let err = api(&db_path).get_comprehensive_metrics("P-1").unwrap_err();
    assert!(matches!(err, ApiError::IncompleteData(_)));
}

#[test]
fn test_snapshot_roundtrip_through_api() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let conn = open_shared(&db_path).unwrap();
    ProjectBuilder::new("P-1")
        .total_costs(dec!(8000))
        .start_date(date(2025, 1, 1))
        .duration(4)
        .physical_percent(dec!(25))
        .insert(&conn)
        .unwrap();

    let api = api(&db_path);
    assert!(api.get_snapshot("P-1").unwrap().is_none());

    let saved = api.refresh_snapshot("P-1").unwrap();
    let loaded = api.get_snapshot("P-1").unwrap().unwrap();
    assert_eq!(loaded.snapshot_id, saved.snapshot_id);
    assert_eq!(loaded.bac, dec!(8000));
    assert_eq!(loaded.spi, saved.spi);
}

#[test]
fn test_weights_and_planned_progress_through_api() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let conn = open_shared(&db_path).unwrap();
    ProjectBuilder::new("P-1")
        .total_costs(dec!(1000))
        .start_date(date(2025, 1, 1))
        .duration(2)
        .insert(&conn)
        .unwrap();
    add_activity(&conn, "P-1", "设计", (5, 5, 5), 4, 4, datetime(2025, 1, 2)).unwrap();
    add_activity(&conn, "P-1", "施工", (1, 2, 2), 10, 0, datetime(2025, 1, 3)).unwrap();

    let api = api(&db_path);
    assert!(api.recalculate_activity_weights("P-1").unwrap());

    let detail = api.get_physical_progress_detail("P-1").unwrap();
    // 评分 15 : 5 → 75% : 25%
    assert_eq!(detail.activities[0].weight, dec!(75));
    assert_eq!(detail.activities[1].weight, dec!(25));
    assert_eq!(detail.total_physical_progress, dec!(75));

    assert_eq!(api.update_planned_progress("P-1", &[(1, dec!(30))]).unwrap(), 2);
    let dashboard = api.get_pmi_dashboard_data("P-1").unwrap();
    assert_eq!(dashboard.evm.curve_data.pv, vec![dec!(300), dec!(1000)]);
}
