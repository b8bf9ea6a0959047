//! 派生值规则
//!
//! 写入前显式调用的派生计算：账单编号、明细小计以及医生可预约时段。

use chrono::{Duration, NaiveTime};
use rust_decimal::Decimal;

/// 账单编号前缀
pub const BILL_NUMBER_PREFIX: &str = "BILL-";

/// 每日可预约窗口
pub const WORKDAY_START: (u32, u32) = (9, 0);
pub const WORKDAY_END: (u32, u32) = (17, 0);
pub const SLOT_MINUTES: i64 = 30;

/// 明细小计 = 数量 × 单价，溢出时返回 `None`
pub fn line_total(quantity: i32, unit_price: Decimal) -> Option<Decimal> {
    Decimal::from(quantity).checked_mul(unit_price)
}

/// 格式化账单编号，例如 `BILL-000042`
pub fn format_bill_number(sequence: u64) -> String {
    format!("{}{:06}", BILL_NUMBER_PREFIX, sequence)
}

/// 解析账单编号的数字后缀，格式不符时返回 `None`
pub fn parse_bill_suffix(bill_number: &str) -> Option<u64> {
    let digits = bill_number.strip_prefix(BILL_NUMBER_PREFIX)?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// 根据已有编号中最大的数字后缀生成下一个编号
pub fn next_bill_number<'a, I>(existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let max_suffix = existing
        .into_iter()
        .filter_map(parse_bill_suffix)
        .max()
        .unwrap_or(0);
    format_bill_number(max_suffix + 1)
}

/// 每日窗口内所有时段的开始时间：09:00, 09:30, ..., 16:30
pub fn day_slots() -> Vec<NaiveTime> {
    let (start_h, start_m) = WORKDAY_START;
    let (end_h, end_m) = WORKDAY_END;
    let (Some(start), Some(end)) = (
        NaiveTime::from_hms_opt(start_h, start_m, 0),
        NaiveTime::from_hms_opt(end_h, end_m, 0),
    ) else {
        return Vec::new();
    };

    let step = Duration::minutes(SLOT_MINUTES);
    let mut slots = Vec::new();
    let mut current = start;
    while current + step <= end {
        slots.push(current);
        current += step;
    }
    slots
}

/// 去掉已被预约占用的时段
pub fn available_slots(booked: &[NaiveTime]) -> Vec<NaiveTime> {
    day_slots()
        .into_iter()
        .filter(|slot| !booked.contains(slot))
        .collect()
}
