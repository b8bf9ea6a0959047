//! 读取视图
//!
//! 带派生值的实体以及详情页、仪表盘的组合结果。

use crate::models::*;
use crate::store::{DashboardCounts, RevenueSummary};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// 患者及住院天数
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientView {
    #[serde(flatten)]
    pub patient: Patient,
    pub days_admitted: i64,
}

impl PatientView {
    pub fn new(patient: Patient, today: NaiveDate) -> Self {
        let days_admitted = patient.days_admitted(today);
        Self {
            patient,
            days_admitted,
        }
    }
}

/// 账单及余额、逾期标记
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillView {
    #[serde(flatten)]
    pub bill: Bill,
    pub balance_amount: Decimal,
    pub is_overdue: bool,
}

impl BillView {
    pub fn new(bill: Bill, today: NaiveDate) -> Self {
        Self {
            balance_amount: bill.balance_amount(),
            is_overdue: bill.is_overdue(today),
            bill,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoctorDetail {
    pub doctor: Doctor,
    pub active_patient_count: i64,
    pub appointments: Vec<Appointment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientDetail {
    pub patient: PatientView,
    pub appointments: Vec<Appointment>,
    pub bills: Vec<BillView>,
    pub medical_records: Vec<MedicalRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillDetail {
    pub bill: BillView,
    pub items: Vec<BillItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentDetail {
    pub department: Department,
    pub head_doctor: Option<Doctor>,
    pub rooms: Vec<Room>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomDetail {
    pub room: Room,
    pub department: Option<Department>,
    pub current_patient: Option<PatientBrief>,
}

/// 仪表盘
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub counts: DashboardCounts,
    pub recent_patients: Vec<PatientView>,
    pub todays_appointments: Vec<Appointment>,
}

/// 收入报表及其统计
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueReport {
    pub report: Report,
    pub summary: RevenueSummary,
}

/// 所有枚举的选项列表
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Choices {
    pub specialty: Vec<ChoiceOption>,
    pub gender: Vec<ChoiceOption>,
    pub patient_status: Vec<ChoiceOption>,
    pub blood_group: Vec<ChoiceOption>,
    pub appointment_status: Vec<ChoiceOption>,
    pub appointment_type: Vec<ChoiceOption>,
    pub bill_status: Vec<ChoiceOption>,
    pub payment_method: Vec<ChoiceOption>,
    pub bill_item_type: Vec<ChoiceOption>,
    pub room_type: Vec<ChoiceOption>,
    pub room_status: Vec<ChoiceOption>,
    pub report_type: Vec<ChoiceOption>,
    pub report_status: Vec<ChoiceOption>,
}

impl Choices {
    pub fn all() -> Self {
        Self {
            specialty: Specialty::choices(),
            gender: Gender::choices(),
            patient_status: PatientStatus::choices(),
            blood_group: BloodGroup::choices(),
            appointment_status: AppointmentStatus::choices(),
            appointment_type: AppointmentType::choices(),
            bill_status: BillStatus::choices(),
            payment_method: PaymentMethod::choices(),
            bill_item_type: BillItemType::choices(),
            room_type: RoomType::choices(),
            room_status: RoomStatus::choices(),
            report_type: ReportType::choices(),
            report_status: ReportStatus::choices(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use chrono::Utc;

    #[test]
    fn test_patient_view_flattens_fields() {
        let patient = Patient::create(new_patient("Ann Example", date(2024, 1, 1)), Utc::now());
        let view = PatientView::new(patient, date(2024, 1, 11));
        assert_eq!(view.days_admitted, 10);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["name"], "Ann Example");
        assert_eq!(json["days_admitted"], 10);
    }

    #[test]
    fn test_future_admission_counts_zero_days() {
        let patient = Patient::create(new_patient("Ann Example", date(2024, 2, 1)), Utc::now());
        assert_eq!(PatientView::new(patient, date(2024, 1, 20)).days_admitted, 0);
    }

    #[test]
    fn test_choices_cover_every_enum() {
        let choices = Choices::all();
        assert_eq!(choices.blood_group.len(), 8);
        assert_eq!(choices.appointment_status.len(), 5);
        assert_eq!(choices.report_type.len(), 8);
    }
}
