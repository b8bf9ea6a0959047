//! 通用工具函数

use chrono::{NaiveDate, Utc};

/// 当前 UTC 日期
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// 转义 LIKE/ILIKE 模式中的通配符，转义字符为 `\`
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// 子串匹配模式：`%term%`
pub fn like_pattern(term: &str) -> String {
    format!("%{}%", escape_like(term))
}
