//! 单元测试共用的构造函数

use crate::inputs::*;
use crate::models::*;
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

/// `n` 决定电话、邮箱和执照号，保证互不冲突
pub fn new_doctor(n: u32) -> NewDoctor {
    NewDoctor {
        name: format!("Dr. Doctor {:02}", n),
        specialty: Specialty::General,
        phone: format!("+1555000{:04}", n),
        email: format!("doctor{}@hospital.org", n),
        license_number: format!("LIC-{:05}", n),
        years_of_experience: 5,
        qualification: "MD".to_string(),
        is_active: true,
    }
}

pub fn new_patient(name: &str, admitted: NaiveDate) -> NewPatient {
    NewPatient {
        name: name.to_string(),
        age: 40,
        gender: Gender::Other,
        phone: "+441234567890".to_string(),
        email: None,
        address: "1 High Street".to_string(),
        blood_group: None,
        emergency_contact: "Next Of Kin".to_string(),
        emergency_phone: "0123456789".to_string(),
        diagnosis: "Observation".to_string(),
        medical_history: String::new(),
        allergies: String::new(),
        current_medications: String::new(),
        assigned_doctor_id: None,
        status: None,
        admitted_date: admitted,
        discharge_date: None,
    }
}

pub fn new_appointment(
    patient_id: Uuid,
    doctor_id: Uuid,
    day: NaiveDate,
    at: NaiveTime,
) -> NewAppointment {
    NewAppointment {
        patient_id,
        doctor_id,
        appointment_date: day,
        appointment_time: at,
        appointment_type: None,
        duration_minutes: 30,
        reason: "Check-up".to_string(),
        notes: String::new(),
    }
}

pub fn new_bill(patient_id: Uuid, total: &str, status: BillStatus, bill_date: NaiveDate) -> NewBill {
    NewBill {
        patient_id,
        total_amount: dec(total),
        paid_amount: Decimal::ZERO,
        discount_amount: Decimal::ZERO,
        tax_amount: Decimal::ZERO,
        status: Some(status),
        payment_method: None,
        bill_date: Some(bill_date),
        due_date: bill_date + chrono::Duration::days(30),
        payment_date: None,
        description: String::new(),
        items: Vec::new(),
    }
}

pub fn new_bill_item(description: &str, quantity: i32, unit_price: &str) -> NewBillItem {
    NewBillItem {
        item_type: BillItemType::Medicine,
        description: description.to_string(),
        quantity,
        unit_price: dec(unit_price),
    }
}

pub fn new_department(name: &str) -> NewDepartment {
    NewDepartment {
        name: name.to_string(),
        description: String::new(),
        head_doctor_id: None,
        location: String::new(),
        phone: String::new(),
        email: String::new(),
        is_active: true,
    }
}

pub fn new_room(number: &str) -> NewRoom {
    NewRoom {
        room_number: number.to_string(),
        room_type: RoomType::General,
        department_id: None,
        capacity: 1,
        floor: 1,
        status: None,
        daily_rate: dec("100.00"),
        amenities: String::new(),
        current_patient_id: None,
    }
}

pub fn new_medical_record(doctor_id: Option<Uuid>, visit_day: u32) -> NewMedicalRecord {
    NewMedicalRecord {
        doctor_id,
        visit_date: Utc.with_ymd_and_hms(2024, 1, visit_day, 10, 0, 0).unwrap(),
        symptoms: "Cough".to_string(),
        diagnosis: "Bronchitis".to_string(),
        treatment: "Rest".to_string(),
        prescription: String::new(),
        follow_up_date: None,
        notes: String::new(),
        attachment: None,
    }
}

pub fn new_report(title: &str, report_date: NaiveDate) -> NewReport {
    NewReport {
        title: title.to_string(),
        report_type: ReportType::Monthly,
        summary: "Summary".to_string(),
        detailed_content: String::new(),
        status: None,
        report_date,
        period_start: None,
        period_end: None,
        file_attachment: None,
    }
}
