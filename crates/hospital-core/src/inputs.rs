//! 写入模型
//!
//! `New*` 用于创建记录，`*Update` 只携带需要修改的字段。
//! 可清空的字段使用 `Option<Option<T>>`：缺省表示不修改，`null` 表示清空。

use crate::error::{HospitalError, Result};
use crate::models::*;
use crate::rules::line_total;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

/// 区分“字段缺省”和“显式为 null”
fn double_option<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn default_true() -> bool {
    true
}

fn default_duration() -> i32 {
    30
}

fn default_quantity() -> i32 {
    1
}

fn default_capacity() -> i32 {
    1
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

// ========== 医生 ==========

/// 新医生
#[derive(Debug, Clone, Deserialize)]
pub struct NewDoctor {
    pub name: String,
    pub specialty: Specialty,
    pub phone: String,
    pub email: String,
    pub license_number: String,
    #[serde(default)]
    pub years_of_experience: i32,
    #[serde(default)]
    pub qualification: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorUpdate {
    pub name: Option<String>,
    pub specialty: Option<Specialty>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub license_number: Option<String>,
    pub years_of_experience: Option<i32>,
    pub qualification: Option<String>,
    pub is_active: Option<bool>,
}

impl Doctor {
    pub fn create(new: NewDoctor, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: new.name,
            specialty: new.specialty,
            phone: new.phone,
            email: new.email,
            license_number: new.license_number,
            years_of_experience: new.years_of_experience,
            qualification: new.qualification,
            is_active: new.is_active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: DoctorUpdate, now: DateTime<Utc>) {
        set(&mut self.name, update.name);
        set(&mut self.specialty, update.specialty);
        set(&mut self.phone, update.phone);
        set(&mut self.email, update.email);
        set(&mut self.license_number, update.license_number);
        set(&mut self.years_of_experience, update.years_of_experience);
        set(&mut self.qualification, update.qualification);
        set(&mut self.is_active, update.is_active);
        self.updated_at = now;
    }
}

// ========== 患者 ==========

/// 新患者
#[derive(Debug, Clone, Deserialize)]
pub struct NewPatient {
    pub name: String,
    pub age: i32,
    pub gender: Gender,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    pub address: String,
    #[serde(default)]
    pub blood_group: Option<BloodGroup>,
    pub emergency_contact: String,
    pub emergency_phone: String,
    pub diagnosis: String,
    #[serde(default)]
    pub medical_history: String,
    #[serde(default)]
    pub allergies: String,
    #[serde(default)]
    pub current_medications: String,
    #[serde(default)]
    pub assigned_doctor_id: Option<Uuid>,
    #[serde(default)]
    pub status: Option<PatientStatus>,
    pub admitted_date: NaiveDate,
    #[serde(default)]
    pub discharge_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientUpdate {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    pub address: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub blood_group: Option<Option<BloodGroup>>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub diagnosis: Option<String>,
    pub medical_history: Option<String>,
    pub allergies: Option<String>,
    pub current_medications: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_doctor_id: Option<Option<Uuid>>,
    pub status: Option<PatientStatus>,
    pub admitted_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    pub discharge_date: Option<Option<NaiveDate>>,
}

impl Patient {
    pub fn create(new: NewPatient, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: new.name,
            age: new.age,
            gender: new.gender,
            phone: new.phone,
            email: new.email.filter(|e| !e.trim().is_empty()),
            address: new.address,
            blood_group: new.blood_group,
            emergency_contact: new.emergency_contact,
            emergency_phone: new.emergency_phone,
            diagnosis: new.diagnosis,
            medical_history: new.medical_history,
            allergies: new.allergies,
            current_medications: new.current_medications,
            assigned_doctor_id: new.assigned_doctor_id,
            status: new.status.unwrap_or(PatientStatus::Active),
            admitted_date: new.admitted_date,
            discharge_date: new.discharge_date,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: PatientUpdate, now: DateTime<Utc>) {
        set(&mut self.name, update.name);
        set(&mut self.age, update.age);
        set(&mut self.gender, update.gender);
        set(&mut self.phone, update.phone);
        set(&mut self.email, update.email);
        set(&mut self.address, update.address);
        set(&mut self.blood_group, update.blood_group);
        set(&mut self.emergency_contact, update.emergency_contact);
        set(&mut self.emergency_phone, update.emergency_phone);
        set(&mut self.diagnosis, update.diagnosis);
        set(&mut self.medical_history, update.medical_history);
        set(&mut self.allergies, update.allergies);
        set(&mut self.current_medications, update.current_medications);
        set(&mut self.assigned_doctor_id, update.assigned_doctor_id);
        set(&mut self.status, update.status);
        set(&mut self.admitted_date, update.admitted_date);
        set(&mut self.discharge_date, update.discharge_date);
        self.updated_at = now;
    }
}

// ========== 预约 ==========

/// 新预约
#[derive(Debug, Clone, Deserialize)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    #[serde(default)]
    pub appointment_type: Option<AppointmentType>,
    #[serde(default = "default_duration")]
    pub duration_minutes: i32,
    pub reason: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentUpdate {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub appointment_date: Option<NaiveDate>,
    pub appointment_time: Option<NaiveTime>,
    pub appointment_type: Option<AppointmentType>,
    pub duration_minutes: Option<i32>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub status: Option<AppointmentStatus>,
}

impl Appointment {
    pub fn create(new: NewAppointment, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id: new.patient_id,
            doctor_id: new.doctor_id,
            appointment_date: new.appointment_date,
            appointment_time: new.appointment_time,
            appointment_type: new.appointment_type.unwrap_or(AppointmentType::Consultation),
            duration_minutes: new.duration_minutes,
            reason: new.reason,
            notes: new.notes,
            status: AppointmentStatus::Scheduled,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: AppointmentUpdate, now: DateTime<Utc>) {
        set(&mut self.patient_id, update.patient_id);
        set(&mut self.doctor_id, update.doctor_id);
        set(&mut self.appointment_date, update.appointment_date);
        set(&mut self.appointment_time, update.appointment_time);
        set(&mut self.appointment_type, update.appointment_type);
        set(&mut self.duration_minutes, update.duration_minutes);
        set(&mut self.reason, update.reason);
        set(&mut self.notes, update.notes);
        set(&mut self.status, update.status);
        self.updated_at = now;
    }
}

// ========== 账单 ==========

/// 新账单明细
#[derive(Debug, Clone, Deserialize)]
pub struct NewBillItem {
    pub item_type: BillItemType,
    pub description: String,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillItemUpdate {
    pub item_type: Option<BillItemType>,
    pub description: Option<String>,
    pub quantity: Option<i32>,
    pub unit_price: Option<Decimal>,
}

impl BillItem {
    pub fn create(bill_id: Uuid, new: NewBillItem, now: DateTime<Utc>) -> Result<Self> {
        let mut item = Self {
            id: Uuid::new_v4(),
            bill_id,
            item_type: new.item_type,
            description: new.description,
            quantity: new.quantity,
            unit_price: new.unit_price,
            total_price: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        item.refresh_total()?;
        Ok(item)
    }

    /// 修改后重新计算小计
    pub fn apply(&mut self, update: BillItemUpdate, now: DateTime<Utc>) -> Result<()> {
        set(&mut self.item_type, update.item_type);
        set(&mut self.description, update.description);
        set(&mut self.quantity, update.quantity);
        set(&mut self.unit_price, update.unit_price);
        self.refresh_total()?;
        self.updated_at = now;
        Ok(())
    }

    /// total_price = quantity * unit_price
    pub fn refresh_total(&mut self) -> Result<()> {
        self.total_price = line_total(self.quantity, self.unit_price)
            .ok_or_else(|| HospitalError::validation("total_price", "小计超出金额范围"))?;
        Ok(())
    }
}

/// 新账单，可同时携带明细
#[derive(Debug, Clone, Deserialize)]
pub struct NewBill {
    pub patient_id: Uuid,
    pub total_amount: Decimal,
    #[serde(default)]
    pub paid_amount: Decimal,
    #[serde(default)]
    pub discount_amount: Decimal,
    #[serde(default)]
    pub tax_amount: Decimal,
    #[serde(default)]
    pub status: Option<BillStatus>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    /// 缺省为创建当天
    #[serde(default)]
    pub bill_date: Option<NaiveDate>,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub items: Vec<NewBillItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillUpdate {
    pub total_amount: Option<Decimal>,
    pub paid_amount: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
    pub tax_amount: Option<Decimal>,
    pub status: Option<BillStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub payment_method: Option<Option<PaymentMethod>>,
    pub due_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    pub payment_date: Option<Option<NaiveDate>>,
    pub description: Option<String>,
}

impl Bill {
    /// 账单编号在写入存储时分配
    pub fn create(new: &NewBill, today: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id: new.patient_id,
            bill_number: String::new(),
            total_amount: new.total_amount,
            paid_amount: new.paid_amount,
            discount_amount: new.discount_amount,
            tax_amount: new.tax_amount,
            status: new.status.unwrap_or(BillStatus::Unpaid),
            payment_method: new.payment_method,
            bill_date: new.bill_date.unwrap_or(today),
            due_date: new.due_date,
            payment_date: new.payment_date,
            description: new.description.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: BillUpdate, now: DateTime<Utc>) {
        set(&mut self.total_amount, update.total_amount);
        set(&mut self.paid_amount, update.paid_amount);
        set(&mut self.discount_amount, update.discount_amount);
        set(&mut self.tax_amount, update.tax_amount);
        set(&mut self.status, update.status);
        set(&mut self.payment_method, update.payment_method);
        set(&mut self.due_date, update.due_date);
        set(&mut self.payment_date, update.payment_date);
        set(&mut self.description, update.description);
        self.updated_at = now;
    }
}

// ========== 科室 ==========

/// 新科室
#[derive(Debug, Clone, Deserialize)]
pub struct NewDepartment {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub head_doctor_id: Option<Uuid>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepartmentUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub head_doctor_id: Option<Option<Uuid>>,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

impl Department {
    pub fn create(new: NewDepartment, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            head_doctor_id: new.head_doctor_id,
            location: new.location,
            phone: new.phone,
            email: new.email,
            is_active: new.is_active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: DepartmentUpdate, now: DateTime<Utc>) {
        set(&mut self.name, update.name);
        set(&mut self.description, update.description);
        set(&mut self.head_doctor_id, update.head_doctor_id);
        set(&mut self.location, update.location);
        set(&mut self.phone, update.phone);
        set(&mut self.email, update.email);
        set(&mut self.is_active, update.is_active);
        self.updated_at = now;
    }
}

// ========== 病房 ==========

/// 新病房
#[derive(Debug, Clone, Deserialize)]
pub struct NewRoom {
    pub room_number: String,
    pub room_type: RoomType,
    #[serde(default)]
    pub department_id: Option<Uuid>,
    #[serde(default = "default_capacity")]
    pub capacity: i32,
    pub floor: i32,
    #[serde(default)]
    pub status: Option<RoomStatus>,
    #[serde(default)]
    pub daily_rate: Decimal,
    #[serde(default)]
    pub amenities: String,
    #[serde(default)]
    pub current_patient_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomUpdate {
    pub room_number: Option<String>,
    pub room_type: Option<RoomType>,
    #[serde(default, deserialize_with = "double_option")]
    pub department_id: Option<Option<Uuid>>,
    pub capacity: Option<i32>,
    pub floor: Option<i32>,
    pub status: Option<RoomStatus>,
    pub daily_rate: Option<Decimal>,
    pub amenities: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub current_patient_id: Option<Option<Uuid>>,
}

impl Room {
    pub fn create(new: NewRoom, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_number: new.room_number,
            room_type: new.room_type,
            department_id: new.department_id,
            capacity: new.capacity,
            floor: new.floor,
            status: new.status.unwrap_or(RoomStatus::Available),
            daily_rate: new.daily_rate,
            amenities: new.amenities,
            current_patient_id: new.current_patient_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: RoomUpdate, now: DateTime<Utc>) {
        set(&mut self.room_number, update.room_number);
        set(&mut self.room_type, update.room_type);
        set(&mut self.department_id, update.department_id);
        set(&mut self.capacity, update.capacity);
        set(&mut self.floor, update.floor);
        set(&mut self.status, update.status);
        set(&mut self.daily_rate, update.daily_rate);
        set(&mut self.amenities, update.amenities);
        set(&mut self.current_patient_id, update.current_patient_id);
        self.updated_at = now;
    }
}

// ========== 病历 ==========

/// 新病历，患者由路径确定
#[derive(Debug, Clone, Deserialize)]
pub struct NewMedicalRecord {
    #[serde(default)]
    pub doctor_id: Option<Uuid>,
    pub visit_date: DateTime<Utc>,
    pub symptoms: String,
    pub diagnosis: String,
    pub treatment: String,
    #[serde(default)]
    pub prescription: String,
    #[serde(default)]
    pub follow_up_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub attachment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedicalRecordUpdate {
    #[serde(default, deserialize_with = "double_option")]
    pub doctor_id: Option<Option<Uuid>>,
    pub visit_date: Option<DateTime<Utc>>,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub prescription: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub follow_up_date: Option<Option<NaiveDate>>,
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub attachment: Option<Option<String>>,
}

impl MedicalRecord {
    pub fn create(patient_id: Uuid, new: NewMedicalRecord, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id: new.doctor_id,
            visit_date: new.visit_date,
            symptoms: new.symptoms,
            diagnosis: new.diagnosis,
            treatment: new.treatment,
            prescription: new.prescription,
            follow_up_date: new.follow_up_date,
            notes: new.notes,
            attachment: new.attachment,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: MedicalRecordUpdate, now: DateTime<Utc>) {
        set(&mut self.doctor_id, update.doctor_id);
        set(&mut self.visit_date, update.visit_date);
        set(&mut self.symptoms, update.symptoms);
        set(&mut self.diagnosis, update.diagnosis);
        set(&mut self.treatment, update.treatment);
        set(&mut self.prescription, update.prescription);
        set(&mut self.follow_up_date, update.follow_up_date);
        set(&mut self.notes, update.notes);
        set(&mut self.attachment, update.attachment);
        self.updated_at = now;
    }
}

// ========== 报表 ==========

/// 新报表
#[derive(Debug, Clone, Deserialize)]
pub struct NewReport {
    pub title: String,
    pub report_type: ReportType,
    pub summary: String,
    #[serde(default)]
    pub detailed_content: String,
    #[serde(default)]
    pub status: Option<ReportStatus>,
    pub report_date: NaiveDate,
    #[serde(default)]
    pub period_start: Option<NaiveDate>,
    #[serde(default)]
    pub period_end: Option<NaiveDate>,
    #[serde(default)]
    pub file_attachment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportUpdate {
    pub title: Option<String>,
    pub report_type: Option<ReportType>,
    pub summary: Option<String>,
    pub detailed_content: Option<String>,
    pub status: Option<ReportStatus>,
    pub report_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    pub period_start: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub period_end: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub file_attachment: Option<Option<String>>,
}

impl Report {
    pub fn create(new: NewReport, generated_by: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: new.title,
            report_type: new.report_type,
            summary: new.summary,
            detailed_content: new.detailed_content,
            generated_by,
            status: new.status.unwrap_or(ReportStatus::Draft),
            report_date: new.report_date,
            period_start: new.period_start,
            period_end: new.period_end,
            file_attachment: new.file_attachment,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: ReportUpdate, now: DateTime<Utc>) {
        set(&mut self.title, update.title);
        set(&mut self.report_type, update.report_type);
        set(&mut self.summary, update.summary);
        set(&mut self.detailed_content, update.detailed_content);
        set(&mut self.status, update.status);
        set(&mut self.report_date, update.report_date);
        set(&mut self.period_start, update.period_start);
        set(&mut self.period_end, update.period_end);
        set(&mut self.file_attachment, update.file_attachment);
        self.updated_at = now;
    }
}
