// ==========================================
// 工程项目挣值管理系统 - 累计序列工具
// ==========================================
// 职责: 线性分布 / 斜坡 / 非递减修正 / 时间分桶
// 约束: PV/EV/AC 均为累计值，任何输出序列都不得下降
// ==========================================

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

/// 线性累计序列: 每期等额递增，最后一期强制等于 total（消除舍入漂移）
///
/// periods 为 0 时返回空序列
pub fn linear_series(total: Decimal, periods: usize) -> Vec<Decimal> {
    if periods == 0 {
        return Vec::new();
    }

    let step = total / Decimal::from(periods);
    let mut series = Vec::with_capacity(periods);
    let mut acc = Decimal::ZERO;
    for _ in 0..periods {
        acc += step;
        series.push(acc);
    }
    if let Some(last) = series.last_mut() {
        *last = total;
    }
    series
}

/// 斜坡序列: 第 i 期 = total × (i+1) / periods
pub fn ramp(total: Decimal, periods: usize) -> Vec<Decimal> {
    let n = Decimal::from(periods);
    (1..=periods)
        .map(|i| total * Decimal::from(i) / n)
        .collect()
}

/// 非递减修正: 低于前值的点抬到前值（首点不低于 0）
pub fn ensure_non_decreasing(series: Vec<Decimal>) -> Vec<Decimal> {
    let mut last = Decimal::ZERO;
    series
        .into_iter()
        .map(|value| {
            let cleaned = value.max(last);
            last = cleaned;
            cleaned
        })
        .collect()
}

/// 分期金额 → 累计序列
pub fn cumulative(buckets: &[Decimal]) -> Vec<Decimal> {
    let mut acc = Decimal::ZERO;
    buckets
        .iter()
        .map(|value| {
            acc += *value;
            acc
        })
        .collect()
}

pub fn is_all_zero(series: &[Decimal]) -> bool {
    series.iter().all(|v| v.is_zero())
}

/// 自然月偏移（可为负）
pub fn month_offset(from: NaiveDate, to: NaiveDate) -> i64 {
    i64::from(to.year() - from.year()) * 12 + i64::from(to.month()) - i64::from(from.month())
}

/// 按固定天数分桶的桶序号（向下取整，可为负）
pub fn day_bucket(from: NaiveDate, to: NaiveDate, interval_days: u32) -> i64 {
    let interval = i64::from(interval_days.max(1));
    (to - from).num_days().div_euclid(interval)
}

/// 把原始桶序号夹到 [0, len-1]
pub fn clamp_index(raw: i64, len: usize) -> usize {
    if len == 0 || raw <= 0 {
        return 0;
    }
    (raw as usize).min(len - 1)
}

/// 序列末值（空序列为 0）
pub fn last_or_zero(series: &[Decimal]) -> Decimal {
    series.last().copied().unwrap_or(Decimal::ZERO)
}
