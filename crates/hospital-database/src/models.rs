//! 数据库模型

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use hospital_core::models::*;
use hospital_core::{HospitalError, Result};
use rust_decimal::Decimal;
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

// 数据库表模型：选项字段存储为字符串，读取时解析为枚举

fn parse_optional<T>(value: Option<String>) -> Result<Option<T>>
where
    T: FromStr<Err = HospitalError>,
{
    value.as_deref().map(str::parse).transpose()
}

/// 数据库医生表
#[derive(Debug, FromRow)]
pub struct DbDoctor {
    pub id: Uuid,
    pub name: String,
    pub specialty: String,
    pub phone: String,
    pub email: String,
    pub license_number: String,
    pub years_of_experience: i32,
    pub qualification: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbDoctor> for Doctor {
    type Error = HospitalError;

    fn try_from(row: DbDoctor) -> Result<Self> {
        Ok(Doctor {
            id: row.id,
            name: row.name,
            specialty: row.specialty.parse()?,
            phone: row.phone,
            email: row.email,
            license_number: row.license_number,
            years_of_experience: row.years_of_experience,
            qualification: row.qualification,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// 数据库患者表
#[derive(Debug, FromRow)]
pub struct DbPatient {
    pub id: Uuid,
    pub name: String,
    pub age: i32,
    pub gender: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: String,
    pub blood_group: Option<String>,
    pub emergency_contact: String,
    pub emergency_phone: String,
    pub diagnosis: String,
    pub medical_history: String,
    pub allergies: String,
    pub current_medications: String,
    pub assigned_doctor_id: Option<Uuid>,
    pub status: String,
    pub admitted_date: NaiveDate,
    pub discharge_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbPatient> for Patient {
    type Error = HospitalError;

    fn try_from(row: DbPatient) -> Result<Self> {
        Ok(Patient {
            id: row.id,
            name: row.name,
            age: row.age,
            gender: row.gender.parse()?,
            phone: row.phone,
            email: row.email,
            address: row.address,
            blood_group: parse_optional(row.blood_group)?,
            emergency_contact: row.emergency_contact,
            emergency_phone: row.emergency_phone,
            diagnosis: row.diagnosis,
            medical_history: row.medical_history,
            allergies: row.allergies,
            current_medications: row.current_medications,
            assigned_doctor_id: row.assigned_doctor_id,
            status: row.status.parse()?,
            admitted_date: row.admitted_date,
            discharge_date: row.discharge_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// 快速搜索只取四列
#[derive(Debug, FromRow)]
pub struct DbPatientBrief {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub age: i32,
}

impl From<DbPatientBrief> for PatientBrief {
    fn from(row: DbPatientBrief) -> Self {
        PatientBrief {
            id: row.id,
            name: row.name,
            phone: row.phone,
            age: row.age,
        }
    }
}

/// 数据库预约表
#[derive(Debug, FromRow)]
pub struct DbAppointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub appointment_type: String,
    pub duration_minutes: i32,
    pub reason: String,
    pub notes: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbAppointment> for Appointment {
    type Error = HospitalError;

    fn try_from(row: DbAppointment) -> Result<Self> {
        Ok(Appointment {
            id: row.id,
            patient_id: row.patient_id,
            doctor_id: row.doctor_id,
            appointment_date: row.appointment_date,
            appointment_time: row.appointment_time,
            appointment_type: row.appointment_type.parse()?,
            duration_minutes: row.duration_minutes,
            reason: row.reason,
            notes: row.notes,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// 数据库账单表
#[derive(Debug, FromRow)]
pub struct DbBill {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub bill_number: String,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub status: String,
    pub payment_method: Option<String>,
    pub bill_date: NaiveDate,
    pub due_date: NaiveDate,
    pub payment_date: Option<NaiveDate>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbBill> for Bill {
    type Error = HospitalError;

    fn try_from(row: DbBill) -> Result<Self> {
        Ok(Bill {
            id: row.id,
            patient_id: row.patient_id,
            bill_number: row.bill_number,
            total_amount: row.total_amount,
            paid_amount: row.paid_amount,
            discount_amount: row.discount_amount,
            tax_amount: row.tax_amount,
            status: row.status.parse()?,
            payment_method: parse_optional(row.payment_method)?,
            bill_date: row.bill_date,
            due_date: row.due_date,
            payment_date: row.payment_date,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// 数据库账单明细表
#[derive(Debug, FromRow)]
pub struct DbBillItem {
    pub id: Uuid,
    pub bill_id: Uuid,
    pub item_type: String,
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbBillItem> for BillItem {
    type Error = HospitalError;

    fn try_from(row: DbBillItem) -> Result<Self> {
        Ok(BillItem {
            id: row.id,
            bill_id: row.bill_id,
            item_type: row.item_type.parse()?,
            description: row.description,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_price: row.total_price,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// 数据库科室表
#[derive(Debug, FromRow)]
pub struct DbDepartment {
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

impl From<DbDepartment> for Department {
    fn from(row: DbDepartment) -> Self {
        Department {
            id: row.id,
            name: row.name,
            description: row.description,
            head_doctor_id: row.head_doctor_id,
            location: row.location,
            phone: row.phone,
            email: row.email,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// 数据库病房表
#[derive(Debug, FromRow)]
pub struct DbRoom {
    pub id: Uuid,
    pub room_number: String,
    pub room_type: String,
    pub department_id: Option<Uuid>,
    pub capacity: i32,
    pub floor: i32,
    pub status: String,
    pub daily_rate: Decimal,
    pub amenities: String,
    pub current_patient_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbRoom> for Room {
    type Error = HospitalError;

    fn try_from(row: DbRoom) -> Result<Self> {
        Ok(Room {
            id: row.id,
            room_number: row.room_number,
            room_type: row.room_type.parse()?,
            department_id: row.department_id,
            capacity: row.capacity,
            floor: row.floor,
            status: row.status.parse()?,
            daily_rate: row.daily_rate,
            amenities: row.amenities,
            current_patient_id: row.current_patient_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// 数据库病历表
#[derive(Debug, FromRow)]
pub struct DbMedicalRecord {
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
    pub attachment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbMedicalRecord> for MedicalRecord {
    fn from(row: DbMedicalRecord) -> Self {
        MedicalRecord {
            id: row.id,
            patient_id: row.patient_id,
            doctor_id: row.doctor_id,
            visit_date: row.visit_date,
            symptoms: row.symptoms,
            diagnosis: row.diagnosis,
            treatment: row.treatment,
            prescription: row.prescription,
            follow_up_date: row.follow_up_date,
            notes: row.notes,
            attachment: row.attachment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// 数据库报表表
#[derive(Debug, FromRow)]
pub struct DbReport {
    pub id: Uuid,
    pub title: String,
    pub report_type: String,
    pub summary: String,
    pub detailed_content: String,
    pub generated_by: Option<String>,
    pub status: String,
    pub report_date: NaiveDate,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub file_attachment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbReport> for Report {
    type Error = HospitalError;

    fn try_from(row: DbReport) -> Result<Self> {
        Ok(Report {
            id: row.id,
            title: row.title,
            report_type: row.report_type.parse()?,
            summary: row.summary,
            detailed_content: row.detailed_content,
            generated_by: row.generated_by,
            status: row.status.parse()?,
            report_date: row.report_date,
            period_start: row.period_start,
            period_end: row.period_end,
            file_attachment: row.file_attachment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
