//! 字段约束校验
//!
//! 每个实体在写入前做完整校验，一次收集所有不合法的字段。
//! 唯一性和外键由存储层保证。

use crate::error::{Result, ValidationErrors};
use crate::models::*;
use regex::Regex;
use rust_decimal::Decimal;
use std::sync::OnceLock;

/// 国际格式电话：可选 `+`，可选前导 `1`，9-15 位数字
pub const PHONE_PATTERN: &str = r"^\+?1?\d{9,15}$";
const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

fn phone_regex() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(PHONE_PATTERN).expect("phone pattern is valid"))
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern is valid"))
}

pub fn is_valid_phone(phone: &str) -> bool {
    phone_regex().is_match(phone)
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// 写入前校验
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// 与数据库列宽一致
const EMAIL_MAX_LEN: usize = 254;
const ATTACHMENT_MAX_LEN: usize = 512;
const GENERATED_BY_MAX_LEN: usize = 150;

/// 字段校验辅助
struct Checker {
    errors: ValidationErrors,
}

impl Checker {
    fn new() -> Self {
        Self {
            errors: ValidationErrors::new(),
        }
    }

    fn text(&mut self, field: &str, value: &str, max_len: usize) -> &mut Self {
        if value.trim().is_empty() {
            self.errors.add(field, "不能为空");
        } else if value.chars().count() > max_len {
            self.errors.add(field, format!("长度不能超过{}个字符", max_len));
        }
        self
    }

    fn optional_text(&mut self, field: &str, value: &str, max_len: usize) -> &mut Self {
        if value.chars().count() > max_len {
            self.errors.add(field, format!("长度不能超过{}个字符", max_len));
        }
        self
    }

    fn phone(&mut self, field: &str, value: &str) -> &mut Self {
        if !is_valid_phone(value) {
            self.errors
                .add(field, "电话号码格式应为 '+999999999'，最多15位数字");
        }
        self
    }

    fn optional_phone(&mut self, field: &str, value: &str) -> &mut Self {
        if !value.is_empty() {
            self.phone(field, value);
        }
        self
    }

    fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if value.chars().count() > EMAIL_MAX_LEN {
            self.errors
                .add(field, format!("长度不能超过{}个字符", EMAIL_MAX_LEN));
        } else if !is_valid_email(value) {
            self.errors.add(field, "邮箱格式无效");
        }
        self
    }

    fn optional_email(&mut self, field: &str, value: &str) -> &mut Self {
        if !value.is_empty() {
            self.email(field, value);
        }
        self
    }

    fn at_least(&mut self, field: &str, value: i32, min: i32) -> &mut Self {
        if value < min {
            self.errors.add(field, format!("不能小于{}", min));
        }
        self
    }

    /// 非负、最多两位小数、总位数不超过 `max_digits`
    fn money(&mut self, field: &str, value: Decimal, max_digits: u32) -> &mut Self {
        let limit = Decimal::from(10_i64.pow(max_digits - 2));
        if value.is_sign_negative() && !value.is_zero() {
            self.errors.add(field, "金额不能为负数");
        } else if value.normalize().scale() > 2 {
            self.errors.add(field, "金额最多两位小数");
        } else if value.trunc() >= limit {
            self.errors
                .add(field, format!("金额总位数不能超过{}位", max_digits));
        }
        self
    }

    fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.errors.add(field, message);
        }
        self
    }

    fn finish(&mut self) -> Result<()> {
        std::mem::take(&mut self.errors).into_result()
    }
}

impl Validate for Doctor {
    fn validate(&self) -> Result<()> {
        Checker::new()
            .text("name", &self.name, 100)
            .phone("phone", &self.phone)
            .email("email", &self.email)
            .text("license_number", &self.license_number, 50)
            .at_least("years_of_experience", self.years_of_experience, 0)
            .finish()
    }
}

impl Validate for Patient {
    fn validate(&self) -> Result<()> {
        let discharge_ok = self
            .discharge_date
            .map_or(true, |discharge| discharge >= self.admitted_date);

        Checker::new()
            .text("name", &self.name, 100)
            .at_least("age", self.age, 0)
            .phone("phone", &self.phone)
            .optional_email("email", self.email.as_deref().unwrap_or_default())
            .text("address", &self.address, 500)
            .text("emergency_contact", &self.emergency_contact, 100)
            .phone("emergency_phone", &self.emergency_phone)
            .text("diagnosis", &self.diagnosis, 2000)
            .check(discharge_ok, "discharge_date", "出院日期不能早于入院日期")
            .finish()
    }
}

impl Validate for Appointment {
    fn validate(&self) -> Result<()> {
        Checker::new()
            .at_least("duration_minutes", self.duration_minutes, 1)
            .text("reason", &self.reason, 2000)
            .finish()
    }
}

impl Validate for Bill {
    fn validate(&self) -> Result<()> {
        Checker::new()
            .money("total_amount", self.total_amount, 10)
            .money("paid_amount", self.paid_amount, 10)
            .money("discount_amount", self.discount_amount, 10)
            .money("tax_amount", self.tax_amount, 10)
            .optional_text("bill_number", &self.bill_number, 20)
            .finish()
    }
}

impl Validate for BillItem {
    fn validate(&self) -> Result<()> {
        Checker::new()
            .text("description", &self.description, 200)
            .at_least("quantity", self.quantity, 1)
            .money("unit_price", self.unit_price, 8)
            .money("total_price", self.total_price, 8)
            .finish()
    }
}

impl Validate for Department {
    fn validate(&self) -> Result<()> {
        Checker::new()
            .text("name", &self.name, 100)
            .optional_text("location", &self.location, 100)
            .optional_phone("phone", &self.phone)
            .optional_email("email", &self.email)
            .finish()
    }
}

impl Validate for Room {
    fn validate(&self) -> Result<()> {
        Checker::new()
            .text("room_number", &self.room_number, 10)
            .at_least("capacity", self.capacity, 1)
            .at_least("floor", self.floor, 0)
            .money("daily_rate", self.daily_rate, 8)
            .finish()
    }
}

impl Validate for MedicalRecord {
    fn validate(&self) -> Result<()> {
        Checker::new()
            .text("symptoms", &self.symptoms, 5000)
            .text("diagnosis", &self.diagnosis, 5000)
            .text("treatment", &self.treatment, 5000)
            .optional_text(
                "attachment",
                self.attachment.as_deref().unwrap_or_default(),
                ATTACHMENT_MAX_LEN,
            )
            .finish()
    }
}

impl Validate for Report {
    fn validate(&self) -> Result<()> {
        let period_ok = match (self.period_start, self.period_end) {
            (Some(start), Some(end)) => start <= end,
            _ => true,
        };

        Checker::new()
            .text("title", &self.title, 200)
            .text("summary", &self.summary, 10_000)
            .optional_text(
                "generated_by",
                self.generated_by.as_deref().unwrap_or_default(),
                GENERATED_BY_MAX_LEN,
            )
            .optional_text(
                "file_attachment",
                self.file_attachment.as_deref().unwrap_or_default(),
                ATTACHMENT_MAX_LEN,
            )
            .check(period_ok, "period_end", "统计区间结束日期不能早于开始日期")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HospitalError;
    use crate::inputs::NewPatient;
    use chrono::{NaiveDate, Utc};
    use std::str::FromStr;

    fn patient() -> Patient {
        Patient::create(
            NewPatient {
                name: "Jane Roe".to_string(),
                age: 42,
                gender: Gender::Female,
                phone: "+441234567890".to_string(),
                email: None,
                address: "1 High Street".to_string(),
                blood_group: Some(BloodGroup::OPositive),
                emergency_contact: "John Roe".to_string(),
                emergency_phone: "0123456789".to_string(),
                diagnosis: "Pneumonia".to_string(),
                medical_history: String::new(),
                allergies: String::new(),
                current_medications: String::new(),
                assigned_doctor_id: None,
                status: None,
                admitted_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
                discharge_date: None,
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_phone_pattern() {
        assert!(is_valid_phone("+999999999"));
        assert!(is_valid_phone("123456789012345"));
        assert!(is_valid_phone("+11234567890"));
        assert!(!is_valid_phone("12345678"));
        assert!(!is_valid_phone("+1234567890123456789"));
        assert!(!is_valid_phone("555-123-4567"));
        assert!(!is_valid_phone(""));
    }

    #[test]
    fn test_email_pattern() {
        assert!(is_valid_email("dr.who@hospital.org"));
        assert!(!is_valid_email("dr.who"));
        assert!(!is_valid_email("dr who@hospital.org"));
    }

    #[test]
    fn test_lengths_match_column_widths() {
        let mut p = patient();
        p.email = Some(format!("{}@hospital.org", "a".repeat(250)));
        match p.validate() {
            Err(HospitalError::Validation(errors)) => {
                assert!(errors.contains("email"));
                assert_eq!(errors.len(), 1);
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        let now = Utc::now();
        let mut new = crate::testing::new_medical_record(None, 3);
        new.attachment = Some("x".repeat(513));
        let record = MedicalRecord::create(uuid::Uuid::new_v4(), new, now);
        assert!(matches!(record.validate(), Err(HospitalError::Validation(e)) if e.contains("attachment")));

        let mut new = crate::testing::new_report("Monthly", crate::testing::date(2024, 2, 1));
        new.file_attachment = Some("x".repeat(512));
        let report = Report::create(new.clone(), Some("u".repeat(150)), now);
        assert!(report.validate().is_ok());

        new.file_attachment = Some("x".repeat(513));
        let report = Report::create(new, Some("u".repeat(151)), now);
        match report.validate() {
            Err(HospitalError::Validation(errors)) => {
                assert!(errors.contains("file_attachment"));
                assert!(errors.contains("generated_by"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_patient_passes() {
        assert!(patient().validate().is_ok());
    }

    #[test]
    fn test_every_offending_field_reported() {
        let mut p = patient();
        p.name = "  ".to_string();
        p.phone = "abc".to_string();
        p.email = Some("not-an-email".to_string());
        p.age = -1;
        p.discharge_date = NaiveDate::from_ymd_opt(2024, 1, 1);

        match p.validate() {
            Err(HospitalError::Validation(errors)) => {
                assert_eq!(errors.len(), 5);
                for field in ["name", "phone", "email", "age", "discharge_date"] {
                    assert!(errors.contains(field), "missing {}", field);
                }
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_money_constraints() {
        let now = Utc::now();
        let mut room = Room {
            id: uuid::Uuid::new_v4(),
            room_number: "101".to_string(),
            room_type: RoomType::General,
            department_id: None,
            capacity: 2,
            floor: 1,
            status: RoomStatus::Available,
            daily_rate: Decimal::from_str("150.00").unwrap(),
            amenities: String::new(),
            current_patient_id: None,
            created_at: now,
            updated_at: now,
        };
        assert!(room.validate().is_ok());

        room.daily_rate = Decimal::from_str("150.001").unwrap();
        assert!(room.validate().is_err());

        room.daily_rate = Decimal::from_str("-1.00").unwrap();
        assert!(room.validate().is_err());

        // 8 位总长 -> 整数部分最多 6 位
        room.daily_rate = Decimal::from_str("1000000.00").unwrap();
        assert!(room.validate().is_err());

        room.daily_rate = Decimal::from_str("999999.99").unwrap();
        assert!(room.validate().is_ok());
    }

    #[test]
    fn test_report_period_order() {
        let now = Utc::now();
        let mut report = Report {
            id: uuid::Uuid::new_v4(),
            title: "Q1".to_string(),
            report_type: ReportType::Financial,
            summary: "Quarter summary".to_string(),
            detailed_content: String::new(),
            generated_by: None,
            status: ReportStatus::Draft,
            report_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            period_start: NaiveDate::from_ymd_opt(2024, 3, 31),
            period_end: NaiveDate::from_ymd_opt(2024, 1, 1),
            file_attachment: None,
            created_at: now,
            updated_at: now,
        };
        assert!(report.validate().is_err());

        report.period_end = NaiveDate::from_ymd_opt(2024, 3, 31);
        assert!(report.validate().is_ok());
    }
}
