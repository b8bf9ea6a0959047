//! 核心数据模型定义
//!
//! 所有实体、枚举选项以及读取时计算的派生值。

use crate::error::{HospitalError, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 枚举选项：取值与显示名称
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceOption {
    pub value: &'static str,
    pub label: &'static str,
}

/// 定义一个以字符串存储的选项枚举
macro_rules! choice_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => ($value:literal, $label:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// 数据库及接口中使用的取值
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }

            /// 显示名称
            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            pub fn choices() -> Vec<ChoiceOption> {
                Self::ALL
                    .iter()
                    .map(|c| ChoiceOption { value: c.as_str(), label: c.label() })
                    .collect()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = HospitalError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($value => Ok($name::$variant),)+
                    _ => Err(HospitalError::validation(
                        stringify!($name),
                        format!("无效的取值: {}", s),
                    )),
                }
            }
        }
    };
}

choice_enum! {
    /// 医生专科
    pub enum Specialty {
        Cardiology => ("cardiology", "Cardiology"),
        Neurology => ("neurology", "Neurology"),
        Orthopedics => ("orthopedics", "Orthopedics"),
        Pediatrics => ("pediatrics", "Pediatrics"),
        Dermatology => ("dermatology", "Dermatology"),
        Psychiatry => ("psychiatry", "Psychiatry"),
        Oncology => ("oncology", "Oncology"),
        Gastroenterology => ("gastroenterology", "Gastroenterology"),
        Pulmonology => ("pulmonology", "Pulmonology"),
        Endocrinology => ("endocrinology", "Endocrinology"),
        General => ("general", "General Medicine"),
    }
}

choice_enum! {
    /// 性别
    pub enum Gender {
        Male => ("male", "Male"),
        Female => ("female", "Female"),
        Other => ("other", "Other"),
    }
}

choice_enum! {
    /// 患者状态
    pub enum PatientStatus {
        Active => ("active", "Active"),
        Discharged => ("discharged", "Discharged"),
        Admitted => ("admitted", "Admitted"),
        Emergency => ("emergency", "Emergency"),
    }
}

choice_enum! {
    /// 血型
    pub enum BloodGroup {
        APositive => ("A+", "A+"),
        ANegative => ("A-", "A-"),
        BPositive => ("B+", "B+"),
        BNegative => ("B-", "B-"),
        AbPositive => ("AB+", "AB+"),
        AbNegative => ("AB-", "AB-"),
        OPositive => ("O+", "O+"),
        ONegative => ("O-", "O-"),
    }
}

choice_enum! {
    /// 预约状态
    pub enum AppointmentStatus {
        Scheduled => ("scheduled", "Scheduled"),
        Completed => ("completed", "Completed"),
        Cancelled => ("cancelled", "Cancelled"),
        Rescheduled => ("rescheduled", "Rescheduled"),
        NoShow => ("no_show", "No Show"),
    }
}

choice_enum! {
    /// 预约类型
    pub enum AppointmentType {
        Consultation => ("consultation", "Consultation"),
        FollowUp => ("follow_up", "Follow Up"),
        Emergency => ("emergency", "Emergency"),
        RoutineCheckup => ("routine_checkup", "Routine Checkup"),
        Surgery => ("surgery", "Surgery"),
        Diagnostic => ("diagnostic", "Diagnostic"),
    }
}

choice_enum! {
    /// 账单状态
    pub enum BillStatus {
        Paid => ("paid", "Paid"),
        Unpaid => ("unpaid", "Unpaid"),
        PartiallyPaid => ("partially_paid", "Partially Paid"),
        Overdue => ("overdue", "Overdue"),
        Cancelled => ("cancelled", "Cancelled"),
    }
}

choice_enum! {
    /// 支付方式
    pub enum PaymentMethod {
        Cash => ("cash", "Cash"),
        Card => ("card", "Card"),
        BankTransfer => ("bank_transfer", "Bank Transfer"),
        Insurance => ("insurance", "Insurance"),
        Cheque => ("cheque", "Cheque"),
    }
}

choice_enum! {
    /// 账单明细类型
    pub enum BillItemType {
        Consultation => ("consultation", "Consultation"),
        Medicine => ("medicine", "Medicine"),
        Test => ("test", "Medical Test"),
        Procedure => ("procedure", "Medical Procedure"),
        RoomCharge => ("room_charge", "Room Charge"),
        Equipment => ("equipment", "Equipment Usage"),
        Other => ("other", "Other"),
    }
}

choice_enum! {
    /// 病房类型
    pub enum RoomType {
        General => ("general", "General Ward"),
        Private => ("private", "Private Room"),
        Icu => ("icu", "ICU"),
        Emergency => ("emergency", "Emergency"),
        Operation => ("operation", "Operation Theater"),
        Consultation => ("consultation", "Consultation Room"),
    }
}

choice_enum! {
    /// 病房状态
    pub enum RoomStatus {
        Available => ("available", "Available"),
        Occupied => ("occupied", "Occupied"),
        Maintenance => ("maintenance", "Under Maintenance"),
        Reserved => ("reserved", "Reserved"),
    }
}

choice_enum! {
    /// 报表类型
    pub enum ReportType {
        Monthly => ("monthly", "Monthly Report"),
        Revenue => ("revenue", "Revenue Report"),
        PatientSummary => ("patient_summary", "Patient Summary"),
        DoctorPerformance => ("doctor_performance", "Doctor Performance"),
        DepartmentStats => ("department_stats", "Department Statistics"),
        Financial => ("financial", "Financial Report"),
        Inventory => ("inventory", "Inventory Report"),
        Custom => ("custom", "Custom Report"),
    }
}

choice_enum! {
    /// 报表状态
    pub enum ReportStatus {
        Draft => ("draft", "Draft"),
        Published => ("published", "Published"),
        Archived => ("archived", "Archived"),
    }
}

/// 医生
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub specialty: Specialty,
    pub phone: String,
    pub email: String,
    pub license_number: String,
    pub years_of_experience: i32,
    pub qualification: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 患者
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub age: i32,
    pub gender: Gender,
    pub phone: String,
    pub email: Option<String>,
    pub address: String,
    pub blood_group: Option<BloodGroup>,
    pub emergency_contact: String,
    pub emergency_phone: String,
    pub diagnosis: String,
    pub medical_history: String,
    pub allergies: String,
    pub current_medications: String,
    pub assigned_doctor_id: Option<Uuid>,
    pub status: PatientStatus,
    pub admitted_date: NaiveDate,
    pub discharge_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    /// 住院天数：(出院日期或今天) - 入院日期，不会为负
    pub fn days_admitted(&self, today: NaiveDate) -> i64 {
        let end = self.discharge_date.unwrap_or(today);
        (end - self.admitted_date).num_days().max(0)
    }

    pub fn brief(&self) -> PatientBrief {
        PatientBrief {
            id: self.id,
            name: self.name.clone(),
            phone: self.phone.clone(),
            age: self.age,
        }
    }
}

/// 患者快速搜索结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientBrief {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub age: i32,
}

/// 预约
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub appointment_type: AppointmentType,
    pub duration_minutes: i32,
    pub reason: String,
    pub notes: String,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// 是否与另一预约占用同一医生的同一时刻
    pub fn same_slot(&self, other: &Appointment) -> bool {
        self.doctor_id == other.doctor_id
            && self.appointment_date == other.appointment_date
            && self.appointment_time == other.appointment_time
    }
}

/// 账单
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub bill_number: String,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub status: BillStatus,
    pub payment_method: Option<PaymentMethod>,
    pub bill_date: NaiveDate,
    pub due_date: NaiveDate,
    pub payment_date: Option<NaiveDate>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bill {
    /// 未付余额
    pub fn balance_amount(&self) -> Decimal {
        self.total_amount - self.paid_amount
    }

    /// 已过到期日且仍未支付
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due_date < today && self.status == BillStatus::Unpaid
    }
}

/// 账单明细
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillItem {
    pub id: Uuid,
    pub bill_id: Uuid,
    pub item_type: BillItemType,
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 科室
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub head_doctor_id: Option<Uuid>,
    pub location: String,
    pub phone: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 病房
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub room_number: String,
    pub room_type: RoomType,
    pub department_id: Option<Uuid>,
    pub capacity: i32,
    pub floor: i32,
    pub status: RoomStatus,
    pub daily_rate: Decimal,
    pub amenities: String,
    pub current_patient_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 病历
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub visit_date: DateTime<Utc>,
    pub symptoms: String,
    pub diagnosis: String,
    pub treatment: String,
    pub prescription: String,
    pub follow_up_date: Option<NaiveDate>,
    pub notes: String,
    /// 附件在文件存储中的引用
    pub attachment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 管理报表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub title: String,
    pub report_type: ReportType,
    pub summary: String,
    pub detailed_content: String,
    /// 生成报表的操作用户
    pub generated_by: Option<String>,
    pub status: ReportStatus,
    pub report_date: NaiveDate,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub file_attachment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 认证服务提供的操作用户身份
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActingUser {
    pub id: String,
}

impl ActingUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// 要求存在操作用户
    pub fn require(user: Option<&ActingUser>) -> Result<&ActingUser> {
        user.ok_or(HospitalError::NotAuthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bill(total: &str, paid: &str, status: BillStatus, due: NaiveDate) -> Bill {
        let now = Utc::now();
        Bill {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            bill_number: "BILL-000001".to_string(),
            total_amount: Decimal::from_str(total).unwrap(),
            paid_amount: Decimal::from_str(paid).unwrap(),
            discount_amount: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            status,
            payment_method: None,
            bill_date: date(2024, 1, 1),
            due_date: due,
            payment_date: None,
            description: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_choice_round_trip_strings() {
        assert_eq!(BloodGroup::from_str("AB-").unwrap(), BloodGroup::AbNegative);
        assert_eq!(AppointmentStatus::NoShow.as_str(), "no_show");
        assert_eq!(RoomType::Operation.label(), "Operation Theater");
        assert!(Specialty::from_str("astrology").is_err());
        assert_eq!(Specialty::choices().len(), 11);
    }

    #[test]
    fn test_choice_serde_uses_stored_value() {
        let json = serde_json::to_string(&BillStatus::PartiallyPaid).unwrap();
        assert_eq!(json, "\"partially_paid\"");
        let parsed: BloodGroup = serde_json::from_str("\"O+\"").unwrap();
        assert_eq!(parsed, BloodGroup::OPositive);
    }

    #[test]
    fn test_bill_balance_and_overdue() {
        let today = date(2024, 3, 10);
        let b = bill("500.00", "120.50", BillStatus::Unpaid, date(2024, 3, 9));
        assert_eq!(b.balance_amount(), Decimal::from_str("379.50").unwrap());
        assert!(b.is_overdue(today));

        // 到期当天不算逾期
        let due_today = bill("10.00", "0", BillStatus::Unpaid, today);
        assert!(!due_today.is_overdue(today));

        // 部分支付的账单不标记为逾期
        let partial = bill("10.00", "5.00", BillStatus::PartiallyPaid, date(2024, 1, 1));
        assert!(!partial.is_overdue(today));
    }

    #[test]
    fn test_require_acting_user() {
        assert!(matches!(
            ActingUser::require(None),
            Err(HospitalError::NotAuthenticated)
        ));
        let user = ActingUser::new("admin");
        assert_eq!(ActingUser::require(Some(&user)).unwrap().id, "admin");
    }
}
