// ==========================================
// 工程项目挣值管理系统 - 列值编解码
// ==========================================
// 职责: 十进制 / 日期 / 时间戳在 TEXT 列中的统一读写
// 约束: 解析失败返回 FieldValueError，不静默置零
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::str::FromStr;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn decimal_to_text(value: Decimal) -> String {
    value.normalize().to_string()
}

pub fn parse_decimal(field: &str, raw: &str) -> RepositoryResult<Decimal> {
    Decimal::from_str(raw.trim()).map_err(|e| RepositoryError::FieldValueError {
        field: field.to_string(),
        message: format!("{} ({})", e, raw),
    })
}

pub fn parse_opt_decimal(field: &str, raw: Option<String>) -> RepositoryResult<Option<Decimal>> {
    match raw {
        Some(s) if !s.trim().is_empty() => parse_decimal(field, &s).map(Some),
        _ => Ok(None),
    }
}

pub fn date_to_text(value: NaiveDate) -> String {
    value.format(DATE_FORMAT).to_string()
}

pub fn parse_date(field: &str, raw: &str) -> RepositoryResult<NaiveDate> {
    // 兼容 "YYYY-MM-DD HH:MM:SS" 形式，只取日期部分
    let date_part = raw.trim().get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, DATE_FORMAT).map_err(|e| {
        RepositoryError::FieldValueError {
            field: field.to_string(),
            message: format!("{} ({})", e, raw),
        }
    })
}

pub fn parse_opt_date(field: &str, raw: Option<String>) -> RepositoryResult<Option<NaiveDate>> {
    match raw {
        Some(s) if !s.trim().is_empty() => parse_date(field, &s).map(Some),
        _ => Ok(None),
    }
}

pub fn datetime_to_text(value: NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

pub fn parse_datetime(field: &str, raw: &str) -> RepositoryResult<NaiveDateTime> {
    let trimmed = raw.trim();
    NaiveDateTime::parse_from_str(trimmed, DATETIME_FORMAT)
        .or_else(|_| {
            NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
        .map_err(|e| RepositoryError::FieldValueError {
            field: field.to_string(),
            message: format!("{} ({})", e, raw),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decimal_text_is_normalized() {
        assert_eq!(decimal_to_text(dec!(3000.00)), "3000");
        assert_eq!(decimal_to_text(dec!(33.330)), "33.33");
        assert_eq!(parse_decimal("bac", " 12.50 ").unwrap(), dec!(12.5));
    }

    #[test]
    fn test_parse_decimal_rejects_garbage() {
        let err = parse_decimal("bac", "abc").unwrap_err();
        assert!(matches!(err, RepositoryError::FieldValueError { .. }));
    }

    #[test]
    fn test_parse_date_accepts_datetime_text() {
        let date = parse_date("created_at", "2025-03-01 10:20:30").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(parse_opt_date("d", Some("  ".to_string())).unwrap(), None);
    }

    #[test]
    fn test_parse_datetime_accepts_plain_date() {
        let dt = parse_datetime("created_at", "2025-03-01").unwrap();
        assert_eq!(datetime_to_text(dt), "2025-03-01 00:00:00");
    }
}
