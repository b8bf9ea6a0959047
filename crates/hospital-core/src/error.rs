//! 错误定义模块

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// 单个字段的校验失败
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// 字段级校验错误集合，一次列出所有不满足约束的字段
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// 只包含一个字段错误
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// 是否包含指定字段的错误
    pub fn contains(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// 没有错误时返回 `Ok(())`
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(HospitalError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}

/// 医院系统统一错误类型
#[derive(Error, Debug)]
pub enum HospitalError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("数据库错误: {0}")]
    Database(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("验证错误: {0}")]
    Validation(ValidationErrors),

    #[error("数据冲突: {0}")]
    Conflict(String),

    #[error("资源未找到: {entity} {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("未认证: 缺少操作用户")]
    NotAuthenticated,

    #[error("系统内部错误: {0}")]
    Internal(String),
}

impl HospitalError {
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        HospitalError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        HospitalError::Validation(ValidationErrors::single(field, message))
    }

    /// 唯一约束冲突
    pub fn duplicate(column: &str) -> Self {
        HospitalError::Conflict(format!("{} 已存在", column))
    }
}

/// 医院系统统一结果类型
pub type Result<T> = std::result::Result<T, HospitalError>;

/// 同一医生同一时刻重复预约
pub const SLOT_TAKEN: &str = "该医生在此时间已有预约";

/// 外键指向的记录不存在
pub const MISSING_REFERENCE: &str = "引用的记录不存在";

#[cfg(feature = "database")]
const TABLES: &[&str] = &[
    "bill_items",
    "medical_records",
    "appointments",
    "departments",
    "patients",
    "doctors",
    "reports",
    "bills",
    "rooms",
];

/// 从 PostgreSQL 约束名推出列名，例如 `rooms_room_number_key` -> `room_number`
#[cfg(feature = "database")]
pub(crate) fn constraint_column(constraint: &str) -> Option<&str> {
    let body = constraint
        .strip_suffix("_fkey")
        .or_else(|| constraint.strip_suffix("_key"))?;
    TABLES
        .iter()
        .find_map(|table| body.strip_prefix(table)?.strip_prefix('_'))
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for HospitalError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => HospitalError::NotFound {
                entity: "record",
                id: "-".to_string(),
            },
            sqlx::Error::Database(db_err) => {
                let constraint = db_err.constraint().unwrap_or_default();
                if db_err.is_unique_violation() {
                    if constraint == "appointments_doctor_slot_key" {
                        return HospitalError::Conflict(SLOT_TAKEN.to_string());
                    }
                    let column = constraint_column(constraint).unwrap_or(constraint);
                    HospitalError::duplicate(column)
                } else if db_err.is_foreign_key_violation() {
                    let column = constraint_column(constraint).unwrap_or("reference");
                    HospitalError::validation(column, MISSING_REFERENCE)
                } else if db_err.is_check_violation() {
                    HospitalError::validation(constraint, "违反检查约束")
                } else {
                    HospitalError::Database(err.to_string())
                }
            }
            _ => HospitalError::Database(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_collect_all_fields() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "不能为空");
        errors.add("phone", "电话号码格式无效");

        assert_eq!(errors.len(), 2);
        assert!(errors.contains("phone"));
        assert_eq!(errors.to_string(), "name: 不能为空; phone: 电话号码格式无效");

        match errors.into_result() {
            Err(HospitalError::Validation(e)) => assert_eq!(e.len(), 2),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_empty_validation_is_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[cfg(feature = "database")]
    #[test]
    fn test_constraint_column() {
        assert_eq!(constraint_column("rooms_room_number_key"), Some("room_number"));
        assert_eq!(constraint_column("bill_items_bill_id_fkey"), Some("bill_id"));
        assert_eq!(constraint_column("doctors_license_number_key"), Some("license_number"));
        assert_eq!(constraint_column("something_else"), None);
    }
}
