//! 存储接口
//!
//! 关系型存储需要提供的全部操作。实现方负责唯一性、外键以及删除策略，
//! 账单编号的分配和预约时段的唯一性必须是原子的。

use crate::error::Result;
use crate::models::*;
use crate::query::*;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// 收入统计：区间内（含两端）已支付账单
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueSummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub total_revenue: Decimal,
    pub bill_count: i64,
}

/// 仪表盘计数
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardCounts {
    pub total_patients: i64,
    pub active_patients: i64,
    pub active_doctors: i64,
    pub today_appointments: i64,
    pub pending_bills: i64,
    pub available_rooms: i64,
}

#[async_trait]
pub trait HospitalStore: Send + Sync {
    /// 后端名称，用于日志和健康检查
    fn backend(&self) -> &'static str;

    async fn health_check(&self) -> Result<()>;

    // ========== 医生 ==========

    async fn insert_doctor(&self, doctor: &Doctor) -> Result<()>;
    async fn get_doctor(&self, id: Uuid) -> Result<Option<Doctor>>;
    async fn update_doctor(&self, doctor: &Doctor) -> Result<()>;
    /// 删除医生：患者、病历、科室的引用置空，预约随之删除
    async fn delete_doctor(&self, id: Uuid) -> Result<bool>;
    async fn list_doctors(&self, filter: &DoctorFilter, page: PageRequest) -> Result<Page<Doctor>>;
    async fn count_active_patients(&self, doctor_id: Uuid) -> Result<i64>;

    // ========== 患者 ==========

    async fn insert_patient(&self, patient: &Patient) -> Result<()>;
    async fn get_patient(&self, id: Uuid) -> Result<Option<Patient>>;
    async fn update_patient(&self, patient: &Patient) -> Result<()>;
    /// 删除患者：预约、账单、病历级联删除，病房占用置空
    async fn delete_patient(&self, id: Uuid) -> Result<bool>;
    async fn list_patients(&self, filter: &PatientFilter, page: PageRequest)
        -> Result<Page<Patient>>;
    async fn search_patients_by_name(&self, term: &str, limit: i64) -> Result<Vec<PatientBrief>>;

    // ========== 预约 ==========

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<()>;
    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>>;
    async fn update_appointment(&self, appointment: &Appointment) -> Result<()>;
    async fn delete_appointment(&self, id: Uuid) -> Result<bool>;
    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
        page: PageRequest,
    ) -> Result<Page<Appointment>>;
    /// 医生某天处于已预约状态的时间
    async fn scheduled_times(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Vec<NaiveTime>>;

    // ========== 账单 ==========

    /// 在同一事务中分配账单编号并写入账单及明细
    async fn insert_bill(&self, bill: &Bill, items: &[BillItem]) -> Result<Bill>;
    async fn get_bill(&self, id: Uuid) -> Result<Option<Bill>>;
    async fn update_bill(&self, bill: &Bill) -> Result<()>;
    async fn delete_bill(&self, id: Uuid) -> Result<bool>;
    async fn list_bills(&self, filter: &BillFilter, page: PageRequest) -> Result<Page<Bill>>;
    async fn list_bill_items(&self, bill_id: Uuid) -> Result<Vec<BillItem>>;
    async fn insert_bill_item(&self, item: &BillItem) -> Result<()>;
    async fn get_bill_item(&self, id: Uuid) -> Result<Option<BillItem>>;
    async fn update_bill_item(&self, item: &BillItem) -> Result<()>;
    async fn delete_bill_item(&self, id: Uuid) -> Result<bool>;
    async fn revenue_summary(&self, start: NaiveDate, end: NaiveDate) -> Result<RevenueSummary>;

    // ========== 科室 ==========

    async fn insert_department(&self, department: &Department) -> Result<()>;
    async fn get_department(&self, id: Uuid) -> Result<Option<Department>>;
    async fn update_department(&self, department: &Department) -> Result<()>;
    /// 删除科室：病房的科室引用置空
    async fn delete_department(&self, id: Uuid) -> Result<bool>;
    async fn list_departments(
        &self,
        filter: &DepartmentFilter,
        page: PageRequest,
    ) -> Result<Page<Department>>;

    // ========== 病房 ==========

    async fn insert_room(&self, room: &Room) -> Result<()>;
    async fn get_room(&self, id: Uuid) -> Result<Option<Room>>;
    async fn update_room(&self, room: &Room) -> Result<()>;
    async fn delete_room(&self, id: Uuid) -> Result<bool>;
    async fn list_rooms(&self, filter: &RoomFilter, page: PageRequest) -> Result<Page<Room>>;

    // ========== 病历 ==========

    async fn insert_medical_record(&self, record: &MedicalRecord) -> Result<()>;
    async fn get_medical_record(&self, id: Uuid) -> Result<Option<MedicalRecord>>;
    async fn update_medical_record(&self, record: &MedicalRecord) -> Result<()>;
    async fn delete_medical_record(&self, id: Uuid) -> Result<bool>;
    async fn list_medical_records(
        &self,
        patient_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<MedicalRecord>>;

    // ========== 报表 ==========

    async fn insert_report(&self, report: &Report) -> Result<()>;
    async fn get_report(&self, id: Uuid) -> Result<Option<Report>>;
    async fn update_report(&self, report: &Report) -> Result<()>;
    async fn delete_report(&self, id: Uuid) -> Result<bool>;
    async fn list_reports(&self, filter: &ReportFilter, page: PageRequest) -> Result<Page<Report>>;

    // ========== 统计 ==========

    async fn dashboard_counts(&self, today: NaiveDate) -> Result<DashboardCounts>;
}
