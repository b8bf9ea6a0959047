//! 内存存储
//!
//! 实现与 PostgreSQL 存储相同的唯一约束、外键和删除策略。
//! 所有写操作在同一把写锁内完成检查和修改。

use crate::error::{HospitalError, Result, MISSING_REFERENCE, SLOT_TAKEN};
use crate::models::*;
use crate::query::*;
use crate::rules::next_bill_number;
use crate::store::{DashboardCounts, HospitalStore, RevenueSummary};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    doctors: HashMap<Uuid, Doctor>,
    patients: HashMap<Uuid, Patient>,
    appointments: HashMap<Uuid, Appointment>,
    bills: HashMap<Uuid, Bill>,
    bill_items: HashMap<Uuid, BillItem>,
    departments: HashMap<Uuid, Department>,
    rooms: HashMap<Uuid, Room>,
    medical_records: HashMap<Uuid, MedicalRecord>,
    reports: HashMap<Uuid, Report>,
}

fn require<T>(table: &HashMap<Uuid, T>, id: Uuid, field: &str) -> Result<()> {
    if table.contains_key(&id) {
        Ok(())
    } else {
        Err(HospitalError::validation(field, MISSING_REFERENCE))
    }
}

fn require_optional<T>(table: &HashMap<Uuid, T>, id: Option<Uuid>, field: &str) -> Result<()> {
    match id {
        Some(id) => require(table, id, field),
        None => Ok(()),
    }
}

/// 覆盖已存在的行
fn replace<T: Clone>(
    table: &mut HashMap<Uuid, T>,
    id: Uuid,
    row: &T,
    entity: &'static str,
) -> Result<()> {
    match table.get_mut(&id) {
        Some(slot) => {
            *slot = row.clone();
            Ok(())
        }
        None => Err(HospitalError::not_found(entity, id)),
    }
}

fn page_of<'a, T, F>(rows: impl Iterator<Item = &'a T>, order: F, request: PageRequest) -> Page<T>
where
    T: Clone + 'a,
    F: FnMut(&T, &T) -> Ordering,
{
    let mut all: Vec<T> = rows.cloned().collect();
    all.sort_by(order);
    Page::from_sorted(all, request)
}

impl Tables {
    fn check_doctor(&self, doctor: &Doctor) -> Result<()> {
        for other in self.doctors.values().filter(|d| d.id != doctor.id) {
            if other.license_number == doctor.license_number {
                return Err(HospitalError::duplicate("license_number"));
            }
            if other.phone == doctor.phone {
                return Err(HospitalError::duplicate("phone"));
            }
            if other.email == doctor.email {
                return Err(HospitalError::duplicate("email"));
            }
        }
        Ok(())
    }

    fn check_patient(&self, patient: &Patient) -> Result<()> {
        require_optional(&self.doctors, patient.assigned_doctor_id, "assigned_doctor_id")
    }

    fn check_appointment(&self, appointment: &Appointment) -> Result<()> {
        require(&self.patients, appointment.patient_id, "patient_id")?;
        require(&self.doctors, appointment.doctor_id, "doctor_id")?;
        let taken = self
            .appointments
            .values()
            .any(|other| other.id != appointment.id && other.same_slot(appointment));
        if taken {
            return Err(HospitalError::Conflict(SLOT_TAKEN.to_string()));
        }
        Ok(())
    }

    fn check_bill(&self, bill: &Bill) -> Result<()> {
        require(&self.patients, bill.patient_id, "patient_id")?;
        let duplicate = self
            .bills
            .values()
            .any(|other| other.id != bill.id && other.bill_number == bill.bill_number);
        if duplicate {
            return Err(HospitalError::duplicate("bill_number"));
        }
        Ok(())
    }

    fn check_department(&self, department: &Department) -> Result<()> {
        require_optional(&self.doctors, department.head_doctor_id, "head_doctor_id")?;
        for other in self.departments.values().filter(|d| d.id != department.id) {
            if other.name == department.name {
                return Err(HospitalError::duplicate("name"));
            }
            if department.head_doctor_id.is_some() && other.head_doctor_id == department.head_doctor_id {
                return Err(HospitalError::duplicate("head_doctor_id"));
            }
        }
        Ok(())
    }

    fn check_room(&self, room: &Room) -> Result<()> {
        require_optional(&self.departments, room.department_id, "department_id")?;
        require_optional(&self.patients, room.current_patient_id, "current_patient_id")?;
        for other in self.rooms.values().filter(|r| r.id != room.id) {
            if other.room_number == room.room_number {
                return Err(HospitalError::duplicate("room_number"));
            }
            if room.current_patient_id.is_some() && other.current_patient_id == room.current_patient_id {
                return Err(HospitalError::duplicate("current_patient_id"));
            }
        }
        Ok(())
    }

    fn check_medical_record(&self, record: &MedicalRecord) -> Result<()> {
        require(&self.patients, record.patient_id, "patient_id")?;
        require_optional(&self.doctors, record.doctor_id, "doctor_id")
    }

    fn remove_bill_cascade(&mut self, bill_id: Uuid) -> bool {
        self.bill_items.retain(|_, item| item.bill_id != bill_id);
        self.bills.remove(&bill_id).is_some()
    }
}

/// 基于 `RwLock` 的内存存储，用于开发环境和测试
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HospitalStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    // ========== 医生 ==========

    async fn insert_doctor(&self, doctor: &Doctor) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check_doctor(doctor)?;
        tables.doctors.insert(doctor.id, doctor.clone());
        Ok(())
    }

    async fn get_doctor(&self, id: Uuid) -> Result<Option<Doctor>> {
        Ok(self.tables.read().await.doctors.get(&id).cloned())
    }

    async fn update_doctor(&self, doctor: &Doctor) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check_doctor(doctor)?;
        replace(&mut tables.doctors, doctor.id, doctor, "doctor")
    }

    async fn delete_doctor(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.doctors.remove(&id).is_none() {
            return Ok(false);
        }

        for patient in tables.patients.values_mut() {
            if patient.assigned_doctor_id == Some(id) {
                patient.assigned_doctor_id = None;
            }
        }
        for record in tables.medical_records.values_mut() {
            if record.doctor_id == Some(id) {
                record.doctor_id = None;
            }
        }
        for department in tables.departments.values_mut() {
            if department.head_doctor_id == Some(id) {
                department.head_doctor_id = None;
            }
        }
        tables.appointments.retain(|_, a| a.doctor_id != id);
        Ok(true)
    }

    async fn list_doctors(&self, filter: &DoctorFilter, page: PageRequest) -> Result<Page<Doctor>> {
        let tables = self.tables.read().await;
        let rows = tables.doctors.values().filter(|d| filter.matches(d));
        Ok(page_of(rows, ordering::doctors, page))
    }

    async fn count_active_patients(&self, doctor_id: Uuid) -> Result<i64> {
        let tables = self.tables.read().await;
        let count = tables
            .patients
            .values()
            .filter(|p| p.assigned_doctor_id == Some(doctor_id) && p.status == PatientStatus::Active)
            .count();
        Ok(count as i64)
    }

    // ========== 患者 ==========

    async fn insert_patient(&self, patient: &Patient) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check_patient(patient)?;
        tables.patients.insert(patient.id, patient.clone());
        Ok(())
    }

    async fn get_patient(&self, id: Uuid) -> Result<Option<Patient>> {
        Ok(self.tables.read().await.patients.get(&id).cloned())
    }

    async fn update_patient(&self, patient: &Patient) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check_patient(patient)?;
        replace(&mut tables.patients, patient.id, patient, "patient")
    }

    async fn delete_patient(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.patients.remove(&id).is_none() {
            return Ok(false);
        }

        tables.appointments.retain(|_, a| a.patient_id != id);
        tables.medical_records.retain(|_, r| r.patient_id != id);
        let bill_ids: Vec<Uuid> = tables
            .bills
            .values()
            .filter(|b| b.patient_id == id)
            .map(|b| b.id)
            .collect();
        for bill_id in bill_ids {
            tables.remove_bill_cascade(bill_id);
        }
        for room in tables.rooms.values_mut() {
            if room.current_patient_id == Some(id) {
                room.current_patient_id = None;
            }
        }
        Ok(true)
    }

    async fn list_patients(
        &self,
        filter: &PatientFilter,
        page: PageRequest,
    ) -> Result<Page<Patient>> {
        let tables = self.tables.read().await;
        let rows = tables.patients.values().filter(|p| filter.matches(p));
        Ok(page_of(rows, ordering::patients, page))
    }

    async fn search_patients_by_name(&self, term: &str, limit: i64) -> Result<Vec<PatientBrief>> {
        let tables = self.tables.read().await;
        let mut matches: Vec<&Patient> = tables
            .patients
            .values()
            .filter(|p| contains_ci(&p.name, term))
            .collect();
        matches.sort_by(|a, b| ordering::patients(a, b));
        Ok(matches
            .into_iter()
            .take(limit.max(0) as usize)
            .map(Patient::brief)
            .collect())
    }

    // ========== 预约 ==========

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check_appointment(appointment)?;
        tables.appointments.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>> {
        Ok(self.tables.read().await.appointments.get(&id).cloned())
    }

    async fn update_appointment(&self, appointment: &Appointment) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check_appointment(appointment)?;
        replace(&mut tables.appointments, appointment.id, appointment, "appointment")
    }

    async fn delete_appointment(&self, id: Uuid) -> Result<bool> {
        Ok(self.tables.write().await.appointments.remove(&id).is_some())
    }

    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
        page: PageRequest,
    ) -> Result<Page<Appointment>> {
        let tables = self.tables.read().await;
        let rows = tables.appointments.values().filter(|a| filter.matches(a));
        Ok(page_of(rows, ordering::appointments, page))
    }

    async fn scheduled_times(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Vec<NaiveTime>> {
        let tables = self.tables.read().await;
        let mut times: Vec<NaiveTime> = tables
            .appointments
            .values()
            .filter(|a| {
                a.doctor_id == doctor_id
                    && a.appointment_date == date
                    && a.status == AppointmentStatus::Scheduled
            })
            .map(|a| a.appointment_time)
            .collect();
        times.sort();
        Ok(times)
    }

    // ========== 账单 ==========

    async fn insert_bill(&self, bill: &Bill, items: &[BillItem]) -> Result<Bill> {
        let mut tables = self.tables.write().await;

        let mut bill = bill.clone();
        bill.bill_number = next_bill_number(tables.bills.values().map(|b| b.bill_number.as_str()));
        tables.check_bill(&bill)?;

        debug!("Assigned bill number {} to bill {}", bill.bill_number, bill.id);
        for item in items {
            tables.bill_items.insert(item.id, item.clone());
        }
        tables.bills.insert(bill.id, bill.clone());
        Ok(bill)
    }

    async fn get_bill(&self, id: Uuid) -> Result<Option<Bill>> {
        Ok(self.tables.read().await.bills.get(&id).cloned())
    }

    async fn update_bill(&self, bill: &Bill) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check_bill(bill)?;
        replace(&mut tables.bills, bill.id, bill, "bill")
    }

    async fn delete_bill(&self, id: Uuid) -> Result<bool> {
        Ok(self.tables.write().await.remove_bill_cascade(id))
    }

    async fn list_bills(&self, filter: &BillFilter, page: PageRequest) -> Result<Page<Bill>> {
        let tables = self.tables.read().await;
        let rows = tables.bills.values().filter(|b| {
            let patient_name = tables
                .patients
                .get(&b.patient_id)
                .map(|p| p.name.as_str())
                .unwrap_or_default();
            filter.matches(b, patient_name)
        });
        Ok(page_of(rows, ordering::bills, page))
    }

    async fn list_bill_items(&self, bill_id: Uuid) -> Result<Vec<BillItem>> {
        let tables = self.tables.read().await;
        let mut items: Vec<BillItem> = tables
            .bill_items
            .values()
            .filter(|item| item.bill_id == bill_id)
            .cloned()
            .collect();
        items.sort_by(ordering::bill_items);
        Ok(items)
    }

    async fn insert_bill_item(&self, item: &BillItem) -> Result<()> {
        let mut tables = self.tables.write().await;
        require(&tables.bills, item.bill_id, "bill_id")?;
        tables.bill_items.insert(item.id, item.clone());
        Ok(())
    }

    async fn get_bill_item(&self, id: Uuid) -> Result<Option<BillItem>> {
        Ok(self.tables.read().await.bill_items.get(&id).cloned())
    }

    async fn update_bill_item(&self, item: &BillItem) -> Result<()> {
        let mut tables = self.tables.write().await;
        require(&tables.bills, item.bill_id, "bill_id")?;
        replace(&mut tables.bill_items, item.id, item, "bill_item")
    }

    async fn delete_bill_item(&self, id: Uuid) -> Result<bool> {
        Ok(self.tables.write().await.bill_items.remove(&id).is_some())
    }

    async fn revenue_summary(&self, start: NaiveDate, end: NaiveDate) -> Result<RevenueSummary> {
        let tables = self.tables.read().await;
        let paid = tables.bills.values().filter(|b| {
            b.status == BillStatus::Paid && b.bill_date >= start && b.bill_date <= end
        });

        let mut total_revenue = Decimal::ZERO;
        let mut bill_count = 0;
        for bill in paid {
            total_revenue += bill.total_amount;
            bill_count += 1;
        }
        Ok(RevenueSummary {
            start,
            end,
            total_revenue,
            bill_count,
        })
    }

    // ========== 科室 ==========

    async fn insert_department(&self, department: &Department) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check_department(department)?;
        tables.departments.insert(department.id, department.clone());
        Ok(())
    }

    async fn get_department(&self, id: Uuid) -> Result<Option<Department>> {
        Ok(self.tables.read().await.departments.get(&id).cloned())
    }

    async fn update_department(&self, department: &Department) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check_department(department)?;
        replace(&mut tables.departments, department.id, department, "department")
    }

    async fn delete_department(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.departments.remove(&id).is_none() {
            return Ok(false);
        }
        for room in tables.rooms.values_mut() {
            if room.department_id == Some(id) {
                room.department_id = None;
            }
        }
        Ok(true)
    }

    async fn list_departments(
        &self,
        filter: &DepartmentFilter,
        page: PageRequest,
    ) -> Result<Page<Department>> {
        let tables = self.tables.read().await;
        let rows = tables.departments.values().filter(|d| filter.matches(d));
        Ok(page_of(rows, ordering::departments, page))
    }

    // ========== 病房 ==========

    async fn insert_room(&self, room: &Room) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check_room(room)?;
        tables.rooms.insert(room.id, room.clone());
        Ok(())
    }

    async fn get_room(&self, id: Uuid) -> Result<Option<Room>> {
        Ok(self.tables.read().await.rooms.get(&id).cloned())
    }

    async fn update_room(&self, room: &Room) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check_room(room)?;
        replace(&mut tables.rooms, room.id, room, "room")
    }

    async fn delete_room(&self, id: Uuid) -> Result<bool> {
        Ok(self.tables.write().await.rooms.remove(&id).is_some())
    }

    async fn list_rooms(&self, filter: &RoomFilter, page: PageRequest) -> Result<Page<Room>> {
        let tables = self.tables.read().await;
        let rows = tables.rooms.values().filter(|r| filter.matches(r));
        Ok(page_of(rows, ordering::rooms, page))
    }

    // ========== 病历 ==========

    async fn insert_medical_record(&self, record: &MedicalRecord) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check_medical_record(record)?;
        tables.medical_records.insert(record.id, record.clone());
        Ok(())
    }

    async fn get_medical_record(&self, id: Uuid) -> Result<Option<MedicalRecord>> {
        Ok(self.tables.read().await.medical_records.get(&id).cloned())
    }

    async fn update_medical_record(&self, record: &MedicalRecord) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check_medical_record(record)?;
        replace(&mut tables.medical_records, record.id, record, "medical_record")
    }

    async fn delete_medical_record(&self, id: Uuid) -> Result<bool> {
        Ok(self.tables.write().await.medical_records.remove(&id).is_some())
    }

    async fn list_medical_records(
        &self,
        patient_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<MedicalRecord>> {
        let tables = self.tables.read().await;
        let rows = tables
            .medical_records
            .values()
            .filter(|r| r.patient_id == patient_id);
        Ok(page_of(rows, ordering::medical_records, page))
    }

    // ========== 报表 ==========

    async fn insert_report(&self, report: &Report) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.reports.insert(report.id, report.clone());
        Ok(())
    }

    async fn get_report(&self, id: Uuid) -> Result<Option<Report>> {
        Ok(self.tables.read().await.reports.get(&id).cloned())
    }

    async fn update_report(&self, report: &Report) -> Result<()> {
        let mut tables = self.tables.write().await;
        replace(&mut tables.reports, report.id, report, "report")
    }

    async fn delete_report(&self, id: Uuid) -> Result<bool> {
        Ok(self.tables.write().await.reports.remove(&id).is_some())
    }

    async fn list_reports(&self, filter: &ReportFilter, page: PageRequest) -> Result<Page<Report>> {
        let tables = self.tables.read().await;
        let rows = tables.reports.values().filter(|r| filter.matches(r));
        Ok(page_of(rows, ordering::reports, page))
    }

    // ========== 统计 ==========

    async fn dashboard_counts(&self, today: NaiveDate) -> Result<DashboardCounts> {
        let tables = self.tables.read().await;
        let count = |n: usize| n as i64;

        Ok(DashboardCounts {
            total_patients: count(tables.patients.len()),
            active_patients: count(
                tables
                    .patients
                    .values()
                    .filter(|p| p.status == PatientStatus::Active)
                    .count(),
            ),
            active_doctors: count(tables.doctors.values().filter(|d| d.is_active).count()),
            today_appointments: count(
                tables
                    .appointments
                    .values()
                    .filter(|a| {
                        a.appointment_date == today && a.status == AppointmentStatus::Scheduled
                    })
                    .count(),
            ),
            pending_bills: count(
                tables
                    .bills
                    .values()
                    .filter(|b| b.status == BillStatus::Unpaid)
                    .count(),
            ),
            available_rooms: count(
                tables
                    .rooms
                    .values()
                    .filter(|r| r.status == RoomStatus::Available)
                    .count(),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use chrono::Utc;

    async fn seeded() -> (MemoryStore, Doctor, Patient) {
        let store = MemoryStore::new();
        let now = Utc::now();
        let doctor = Doctor::create(new_doctor(1), now);
        store.insert_doctor(&doctor).await.unwrap();

        let mut new = new_patient("Ada Lovelace", date(2024, 1, 2));
        new.assigned_doctor_id = Some(doctor.id);
        let patient = Patient::create(new, now);
        store.insert_patient(&patient).await.unwrap();
        (store, doctor, patient)
    }

    #[tokio::test]
    async fn test_doctor_unique_fields() {
        let (store, _, _) = seeded().await;
        let mut twin = new_doctor(2);
        twin.license_number = "LIC-00001".to_string();
        let err = store
            .insert_doctor(&Doctor::create(twin, Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, HospitalError::Conflict(ref m) if m.contains("license_number")));
    }

    #[tokio::test]
    async fn test_missing_parent_is_validation_error() {
        let (store, doctor, _) = seeded().await;
        let appointment = Appointment::create(
            new_appointment(Uuid::new_v4(), doctor.id, date(2024, 1, 10), time(9, 0)),
            Utc::now(),
        );
        match store.insert_appointment(&appointment).await {
            Err(HospitalError::Validation(errors)) => assert!(errors.contains("patient_id")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_slot_taken_regardless_of_status() {
        let (store, doctor, patient) = seeded().await;
        let now = Utc::now();
        let mut first = Appointment::create(
            new_appointment(patient.id, doctor.id, date(2024, 1, 10), time(9, 0)),
            now,
        );
        first.status = AppointmentStatus::Cancelled;
        store.insert_appointment(&first).await.unwrap();

        let second = Appointment::create(
            new_appointment(patient.id, doctor.id, date(2024, 1, 10), time(9, 0)),
            now,
        );
        let err = store.insert_appointment(&second).await.unwrap_err();
        assert!(matches!(err, HospitalError::Conflict(_)));

        // 取消的预约不占用可预约时段
        let booked = store.scheduled_times(doctor.id, date(2024, 1, 10)).await.unwrap();
        assert!(booked.is_empty());
    }

    #[tokio::test]
    async fn test_delete_patient_cascades() {
        let (store, doctor, patient) = seeded().await;
        let now = Utc::now();

        let appointment = Appointment::create(
            new_appointment(patient.id, doctor.id, date(2024, 1, 10), time(10, 0)),
            now,
        );
        store.insert_appointment(&appointment).await.unwrap();

        let bill = Bill::create(
            &new_bill(patient.id, "80.00", BillStatus::Unpaid, date(2024, 1, 3)),
            date(2024, 1, 3),
            now,
        );
        let item = BillItem::create(bill.id, new_bill_item("X-ray", 1, "80.00"), now).unwrap();
        store.insert_bill(&bill, &[item.clone()]).await.unwrap();

        let record = MedicalRecord::create(patient.id, new_medical_record(Some(doctor.id), 4), now);
        store.insert_medical_record(&record).await.unwrap();

        let mut new = new_room("101");
        new.current_patient_id = Some(patient.id);
        let room = Room::create(new, now);
        store.insert_room(&room).await.unwrap();

        assert!(store.delete_patient(patient.id).await.unwrap());
        assert!(store.get_appointment(appointment.id).await.unwrap().is_none());
        assert!(store.get_bill(bill.id).await.unwrap().is_none());
        assert!(store.get_bill_item(item.id).await.unwrap().is_none());
        assert!(store.get_medical_record(record.id).await.unwrap().is_none());

        let room = store.get_room(room.id).await.unwrap().unwrap();
        assert_eq!(room.current_patient_id, None);

        assert!(!store.delete_patient(patient.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_doctor_clears_references() {
        let (store, doctor, patient) = seeded().await;
        let now = Utc::now();

        let appointment = Appointment::create(
            new_appointment(patient.id, doctor.id, date(2024, 1, 10), time(9, 0)),
            now,
        );
        store.insert_appointment(&appointment).await.unwrap();

        let mut new = new_department("Cardiology");
        new.head_doctor_id = Some(doctor.id);
        let department = Department::create(new, now);
        store.insert_department(&department).await.unwrap();

        let record = MedicalRecord::create(patient.id, new_medical_record(Some(doctor.id), 5), now);
        store.insert_medical_record(&record).await.unwrap();

        assert!(store.delete_doctor(doctor.id).await.unwrap());

        let patient = store.get_patient(patient.id).await.unwrap().unwrap();
        assert_eq!(patient.assigned_doctor_id, None);
        let department = store.get_department(department.id).await.unwrap().unwrap();
        assert_eq!(department.head_doctor_id, None);
        let record = store.get_medical_record(record.id).await.unwrap().unwrap();
        assert_eq!(record.doctor_id, None);
        assert!(store.get_appointment(appointment.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_room_occupant_is_unique() {
        let (store, _, patient) = seeded().await;
        let now = Utc::now();

        let mut first = new_room("101");
        first.current_patient_id = Some(patient.id);
        store.insert_room(&Room::create(first, now)).await.unwrap();

        let mut second = new_room("102");
        second.current_patient_id = Some(patient.id);
        let err = store.insert_room(&Room::create(second, now)).await.unwrap_err();
        assert!(matches!(err, HospitalError::Conflict(ref m) if m.contains("current_patient_id")));

        // 空病房不受限制
        store.insert_room(&Room::create(new_room("103"), now)).await.unwrap();
        store.insert_room(&Room::create(new_room("104"), now)).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_department_keeps_rooms() {
        let (store, _, _) = seeded().await;
        let now = Utc::now();
        let department = Department::create(new_department("Surgery"), now);
        store.insert_department(&department).await.unwrap();

        let mut new = new_room("201");
        new.department_id = Some(department.id);
        let room = Room::create(new, now);
        store.insert_room(&room).await.unwrap();

        assert!(store.delete_department(department.id).await.unwrap());
        let room = store.get_room(room.id).await.unwrap().unwrap();
        assert_eq!(room.department_id, None);
    }

    #[tokio::test]
    async fn test_update_of_deleted_row_is_not_found() {
        let (store, doctor, _) = seeded().await;
        store.delete_doctor(doctor.id).await.unwrap();
        let err = store.update_doctor(&doctor).await.unwrap_err();
        assert!(matches!(err, HospitalError::NotFound { entity: "doctor", .. }));
    }
}
