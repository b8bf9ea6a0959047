//! 业务服务
//!
//! 写路径（构造、派生、校验、持久化）以及列表、详情、统计等组合查询。
//! 所有存储访问都经过 `HospitalStore`。

use crate::error::{HospitalError, Result, ValidationErrors};
use crate::inputs::*;
use crate::models::*;
use crate::query::*;
use crate::rules::available_slots;
use crate::store::{HospitalStore, RevenueSummary};
use crate::utils::today;
use crate::validation::Validate;
use crate::views::*;
use chrono::{NaiveDate, NaiveTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

const DETAIL_APPOINTMENTS: i64 = 10;
const DETAIL_BILLS: i64 = 5;
const DETAIL_MEDICAL_RECORDS: i64 = 10;
const DASHBOARD_RECENT_PATIENTS: i64 = 5;
const DASHBOARD_APPOINTMENTS: i64 = 10;

fn found<T>(row: Option<T>, entity: &'static str, id: Uuid) -> Result<T> {
    row.ok_or_else(|| HospitalError::not_found(entity, id))
}

fn deleted(removed: bool, entity: &'static str, id: Uuid) -> Result<()> {
    if removed {
        info!("Deleted {} {}", entity, id);
        Ok(())
    } else {
        Err(HospitalError::not_found(entity, id))
    }
}

/// 把校验错误并入 `errors`，字段名加上 `prefix`；其他错误原样返回
fn collect_errors(errors: &mut ValidationErrors, prefix: &str, result: Result<()>) -> Result<()> {
    match result {
        Err(HospitalError::Validation(found)) => {
            for error in found.errors() {
                errors.add(format!("{}{}", prefix, error.field), error.message.clone());
            }
            Ok(())
        }
        other => other,
    }
}

fn log_conflict(result: Result<()>, what: &str) -> Result<()> {
    if let Err(HospitalError::Conflict(message)) = &result {
        warn!("Rejected {}: {}", what, message);
    }
    result
}

/// 医院业务服务
#[derive(Clone)]
pub struct HospitalService {
    store: Arc<dyn HospitalStore>,
    page_sizes: PageSizes,
}

impl HospitalService {
    pub fn new(store: Arc<dyn HospitalStore>, page_sizes: PageSizes) -> Self {
        Self { store, page_sizes }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub fn page_sizes(&self) -> &PageSizes {
        &self.page_sizes
    }

    pub async fn health_check(&self) -> Result<()> {
        self.store.health_check().await
    }

    // ========== 医生 ==========

    /// 创建医生
    pub async fn create_doctor(&self, new: NewDoctor) -> Result<Doctor> {
        let doctor = Doctor::create(new, Utc::now());
        doctor.validate()?;
        log_conflict(self.store.insert_doctor(&doctor).await, "doctor")?;
        info!("Created doctor {} ({})", doctor.id, doctor.license_number);
        Ok(doctor)
    }

    pub async fn get_doctor(&self, id: Uuid) -> Result<Doctor> {
        found(self.store.get_doctor(id).await?, "doctor", id)
    }

    pub async fn update_doctor(&self, id: Uuid, update: DoctorUpdate) -> Result<Doctor> {
        let mut doctor = self.get_doctor(id).await?;
        doctor.apply(update, Utc::now());
        doctor.validate()?;
        log_conflict(self.store.update_doctor(&doctor).await, "doctor update")?;
        info!("Updated doctor {}", id);
        Ok(doctor)
    }

    /// 删除医生，其患者和病历保留
    pub async fn delete_doctor(&self, id: Uuid) -> Result<()> {
        deleted(self.store.delete_doctor(id).await?, "doctor", id)
    }

    pub async fn list_doctors(&self, filter: &DoctorFilter, page: Option<i64>) -> Result<Page<Doctor>> {
        debug!("Listing doctors: {:?}, page {:?}", filter, page);
        let request = PageRequest::new(page, self.page_sizes.doctors);
        self.store.list_doctors(filter, request).await
    }

    /// 医生详情：在诊患者数和最近的预约
    pub async fn doctor_detail(&self, id: Uuid) -> Result<DoctorDetail> {
        let doctor = self.get_doctor(id).await?;
        let active_patient_count = self.store.count_active_patients(id).await?;
        let filter = AppointmentFilter {
            doctor_id: Some(id),
            ..Default::default()
        };
        let appointments = self
            .store
            .list_appointments(&filter, PageRequest::first(DETAIL_APPOINTMENTS))
            .await?
            .items;

        Ok(DoctorDetail {
            doctor,
            active_patient_count,
            appointments,
        })
    }

    /// 医生某天的可预约时段
    pub async fn doctor_availability(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Vec<NaiveTime>> {
        self.get_doctor(doctor_id).await?;
        let booked = self.store.scheduled_times(doctor_id, date).await?;
        let slots = available_slots(&booked);
        debug!(
            "Doctor {} has {} free slots on {}",
            doctor_id,
            slots.len(),
            date
        );
        Ok(slots)
    }

    // ========== 患者 ==========

    /// 创建患者
    pub async fn create_patient(&self, new: NewPatient) -> Result<Patient> {
        let patient = Patient::create(new, Utc::now());
        patient.validate()?;
        self.store.insert_patient(&patient).await?;
        info!("Created patient {}", patient.id);
        Ok(patient)
    }

    pub async fn get_patient(&self, id: Uuid) -> Result<Patient> {
        found(self.store.get_patient(id).await?, "patient", id)
    }

    pub async fn update_patient(&self, id: Uuid, update: PatientUpdate) -> Result<Patient> {
        let mut patient = self.get_patient(id).await?;
        patient.apply(update, Utc::now());
        patient.validate()?;
        self.store.update_patient(&patient).await?;
        info!("Updated patient {}", id);
        Ok(patient)
    }

    /// 删除患者及其预约、账单和病历
    pub async fn delete_patient(&self, id: Uuid) -> Result<()> {
        deleted(self.store.delete_patient(id).await?, "patient", id)
    }

    pub async fn list_patients(
        &self,
        filter: &PatientFilter,
        page: Option<i64>,
    ) -> Result<Page<PatientView>> {
        debug!("Listing patients: {:?}, page {:?}", filter, page);
        let request = PageRequest::new(page, self.page_sizes.patients);
        let today = today();
        Ok(self
            .store
            .list_patients(filter, request)
            .await?
            .map(|p| PatientView::new(p, today)))
    }

    pub async fn patient_detail(&self, id: Uuid) -> Result<PatientDetail> {
        self.patient_detail_on(id, today()).await
    }

    /// 患者详情：预约、账单和病历摘要
    pub async fn patient_detail_on(&self, id: Uuid, today: NaiveDate) -> Result<PatientDetail> {
        let patient = self.get_patient(id).await?;

        let appointments = self
            .store
            .list_appointments(
                &AppointmentFilter {
                    patient_id: Some(id),
                    ..Default::default()
                },
                PageRequest::first(DETAIL_APPOINTMENTS),
            )
            .await?
            .items;
        let bills = self
            .store
            .list_bills(
                &BillFilter {
                    patient_id: Some(id),
                    ..Default::default()
                },
                PageRequest::first(DETAIL_BILLS),
            )
            .await?
            .items
            .into_iter()
            .map(|b| BillView::new(b, today))
            .collect();
        let medical_records = self
            .store
            .list_medical_records(id, PageRequest::first(DETAIL_MEDICAL_RECORDS))
            .await?
            .items;

        Ok(PatientDetail {
            patient: PatientView::new(patient, today),
            appointments,
            bills,
            medical_records,
        })
    }

    /// 按姓名快速搜索患者，最多返回 10 条
    pub async fn search_patients(&self, query: &str) -> Result<Vec<PatientBrief>> {
        let term = query.trim();
        debug!("Quick patient search for {:?}", term);
        self.store
            .search_patients_by_name(term, QUICK_SEARCH_LIMIT)
            .await
    }

    // ========== 预约 ==========

    /// 预约挂号；同一医生同一时刻只能有一个预约
    pub async fn create_appointment(&self, new: NewAppointment) -> Result<Appointment> {
        let appointment = Appointment::create(new, Utc::now());
        appointment.validate()?;
        log_conflict(
            self.store.insert_appointment(&appointment).await,
            "appointment",
        )?;
        info!(
            "Booked appointment {} with doctor {} at {} {}",
            appointment.id,
            appointment.doctor_id,
            appointment.appointment_date,
            appointment.appointment_time
        );
        Ok(appointment)
    }

    pub async fn get_appointment(&self, id: Uuid) -> Result<Appointment> {
        found(self.store.get_appointment(id).await?, "appointment", id)
    }

    pub async fn update_appointment(&self, id: Uuid, update: AppointmentUpdate) -> Result<Appointment> {
        let mut appointment = self.get_appointment(id).await?;
        appointment.apply(update, Utc::now());
        appointment.validate()?;
        log_conflict(
            self.store.update_appointment(&appointment).await,
            "appointment update",
        )?;
        info!("Updated appointment {}", id);
        Ok(appointment)
    }

    /// 只修改预约状态
    pub async fn update_appointment_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment> {
        let mut appointment = self.get_appointment(id).await?;
        appointment.status = status;
        appointment.updated_at = Utc::now();
        self.store.update_appointment(&appointment).await?;
        info!("Appointment {} is now {}", id, status);
        Ok(appointment)
    }

    pub async fn delete_appointment(&self, id: Uuid) -> Result<()> {
        deleted(self.store.delete_appointment(id).await?, "appointment", id)
    }

    pub async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
        page: Option<i64>,
    ) -> Result<Page<Appointment>> {
        debug!("Listing appointments: {:?}, page {:?}", filter, page);
        let request = PageRequest::new(page, self.page_sizes.appointments);
        self.store.list_appointments(filter, request).await
    }

    // ========== 账单 ==========

    /// 创建账单及其明细，账单编号由存储层分配
    pub async fn create_bill(&self, new: NewBill) -> Result<BillDetail> {
        let now = Utc::now();
        let today = today();
        let bill = Bill::create(&new, today, now);

        let mut errors = ValidationErrors::new();
        collect_errors(&mut errors, "", bill.validate())?;
        let mut items = Vec::with_capacity(new.items.len());
        for (index, new_item) in new.items.into_iter().enumerate() {
            let prefix = format!("items[{}].", index);
            match BillItem::create(bill.id, new_item, now) {
                Ok(item) => {
                    collect_errors(&mut errors, &prefix, item.validate())?;
                    items.push(item);
                }
                Err(e) => collect_errors(&mut errors, &prefix, Err(e))?,
            }
        }
        errors.into_result()?;

        let bill = self.store.insert_bill(&bill, &items).await.map_err(|e| {
            warn!("Failed to create bill for patient {}: {}", bill.patient_id, e);
            e
        })?;
        info!(
            "Created bill {} ({}) with {} items",
            bill.bill_number,
            bill.id,
            items.len()
        );

        Ok(BillDetail {
            bill: BillView::new(bill, today),
            items,
        })
    }

    pub async fn get_bill(&self, id: Uuid) -> Result<Bill> {
        found(self.store.get_bill(id).await?, "bill", id)
    }

    pub async fn update_bill(&self, id: Uuid, update: BillUpdate) -> Result<BillView> {
        let mut bill = self.get_bill(id).await?;
        bill.apply(update, Utc::now());
        bill.validate()?;
        self.store.update_bill(&bill).await?;
        info!("Updated bill {}", bill.bill_number);
        Ok(BillView::new(bill, today()))
    }

    /// 删除账单及其明细
    pub async fn delete_bill(&self, id: Uuid) -> Result<()> {
        deleted(self.store.delete_bill(id).await?, "bill", id)
    }

    pub async fn list_bills(&self, filter: &BillFilter, page: Option<i64>) -> Result<Page<BillView>> {
        debug!("Listing bills: {:?}, page {:?}", filter, page);
        let request = PageRequest::new(page, self.page_sizes.bills);
        let today = today();
        Ok(self
            .store
            .list_bills(filter, request)
            .await?
            .map(|b| BillView::new(b, today)))
    }

    pub async fn bill_detail(&self, id: Uuid) -> Result<BillDetail> {
        let bill = self.get_bill(id).await?;
        let items = self.store.list_bill_items(id).await?;
        Ok(BillDetail {
            bill: BillView::new(bill, today()),
            items,
        })
    }

    /// 给已有账单追加明细
    pub async fn add_bill_item(&self, bill_id: Uuid, new: NewBillItem) -> Result<BillItem> {
        self.get_bill(bill_id).await?;
        let item = BillItem::create(bill_id, new, Utc::now())?;
        item.validate()?;
        self.store.insert_bill_item(&item).await?;
        info!("Added item {} to bill {}", item.id, bill_id);
        Ok(item)
    }

    pub async fn update_bill_item(&self, id: Uuid, update: BillItemUpdate) -> Result<BillItem> {
        let mut item = found(self.store.get_bill_item(id).await?, "bill_item", id)?;
        item.apply(update, Utc::now())?;
        item.validate()?;
        self.store.update_bill_item(&item).await?;
        info!("Updated bill item {}", id);
        Ok(item)
    }

    pub async fn delete_bill_item(&self, id: Uuid) -> Result<()> {
        deleted(self.store.delete_bill_item(id).await?, "bill_item", id)
    }

    /// 区间内（含两端）已支付账单的收入合计
    pub async fn revenue_summary(&self, start: NaiveDate, end: NaiveDate) -> Result<RevenueSummary> {
        if start > end {
            return Err(HospitalError::validation("end", "结束日期不能早于开始日期"));
        }
        let mut summary = self.store.revenue_summary(start, end).await?;
        summary.total_revenue.rescale(2);
        debug!(
            "Revenue {} to {}: {} over {} bills",
            start, end, summary.total_revenue, summary.bill_count
        );
        Ok(summary)
    }

    // ========== 科室 ==========

    pub async fn create_department(&self, new: NewDepartment) -> Result<Department> {
        let department = Department::create(new, Utc::now());
        department.validate()?;
        log_conflict(self.store.insert_department(&department).await, "department")?;
        info!("Created department {} ({})", department.name, department.id);
        Ok(department)
    }

    pub async fn get_department(&self, id: Uuid) -> Result<Department> {
        found(self.store.get_department(id).await?, "department", id)
    }

    pub async fn update_department(&self, id: Uuid, update: DepartmentUpdate) -> Result<Department> {
        let mut department = self.get_department(id).await?;
        department.apply(update, Utc::now());
        department.validate()?;
        log_conflict(
            self.store.update_department(&department).await,
            "department update",
        )?;
        info!("Updated department {}", id);
        Ok(department)
    }

    pub async fn delete_department(&self, id: Uuid) -> Result<()> {
        deleted(self.store.delete_department(id).await?, "department", id)
    }

    pub async fn list_departments(
        &self,
        filter: &DepartmentFilter,
        page: Option<i64>,
    ) -> Result<Page<Department>> {
        let request = PageRequest::new(page, self.page_sizes.departments);
        self.store.list_departments(filter, request).await
    }

    /// 科室详情：科室主任和全部病房
    pub async fn department_detail(&self, id: Uuid) -> Result<DepartmentDetail> {
        let department = self.get_department(id).await?;
        let head_doctor = match department.head_doctor_id {
            Some(doctor_id) => self.store.get_doctor(doctor_id).await?,
            None => None,
        };

        let filter = RoomFilter {
            department_id: Some(id),
            ..Default::default()
        };
        let mut rooms = Vec::new();
        let mut page = 1;
        loop {
            let batch = self
                .store
                .list_rooms(&filter, PageRequest::new(Some(page), MAX_PAGE_SIZE))
                .await?;
            let has_next = batch.has_next;
            rooms.extend(batch.items);
            if !has_next {
                break;
            }
            page += 1;
        }

        Ok(DepartmentDetail {
            department,
            head_doctor,
            rooms,
        })
    }

    // ========== 病房 ==========

    pub async fn create_room(&self, new: NewRoom) -> Result<Room> {
        let room = Room::create(new, Utc::now());
        room.validate()?;
        log_conflict(self.store.insert_room(&room).await, "room")?;
        info!("Created room {} ({})", room.room_number, room.id);
        Ok(room)
    }

    pub async fn get_room(&self, id: Uuid) -> Result<Room> {
        found(self.store.get_room(id).await?, "room", id)
    }

    pub async fn update_room(&self, id: Uuid, update: RoomUpdate) -> Result<Room> {
        let mut room = self.get_room(id).await?;
        room.apply(update, Utc::now());
        room.validate()?;
        log_conflict(self.store.update_room(&room).await, "room update")?;
        info!("Updated room {}", room.room_number);
        Ok(room)
    }

    pub async fn delete_room(&self, id: Uuid) -> Result<()> {
        deleted(self.store.delete_room(id).await?, "room", id)
    }

    pub async fn list_rooms(&self, filter: &RoomFilter, page: Option<i64>) -> Result<Page<Room>> {
        debug!("Listing rooms: {:?}, page {:?}", filter, page);
        let request = PageRequest::new(page, self.page_sizes.rooms);
        self.store.list_rooms(filter, request).await
    }

    pub async fn room_detail(&self, id: Uuid) -> Result<RoomDetail> {
        let room = self.get_room(id).await?;
        let department = match room.department_id {
            Some(department_id) => self.store.get_department(department_id).await?,
            None => None,
        };
        let current_patient = match room.current_patient_id {
            Some(patient_id) => self.store.get_patient(patient_id).await?.map(|p| p.brief()),
            None => None,
        };
        Ok(RoomDetail {
            room,
            department,
            current_patient,
        })
    }

    // ========== 病历 ==========

    /// 为患者添加病历
    pub async fn create_medical_record(
        &self,
        patient_id: Uuid,
        new: NewMedicalRecord,
    ) -> Result<MedicalRecord> {
        self.get_patient(patient_id).await?;
        let record = MedicalRecord::create(patient_id, new, Utc::now());
        record.validate()?;
        self.store.insert_medical_record(&record).await?;
        info!("Created medical record {} for patient {}", record.id, patient_id);
        Ok(record)
    }

    pub async fn get_medical_record(&self, id: Uuid) -> Result<MedicalRecord> {
        found(self.store.get_medical_record(id).await?, "medical_record", id)
    }

    pub async fn update_medical_record(
        &self,
        id: Uuid,
        update: MedicalRecordUpdate,
    ) -> Result<MedicalRecord> {
        let mut record = self.get_medical_record(id).await?;
        record.apply(update, Utc::now());
        record.validate()?;
        self.store.update_medical_record(&record).await?;
        info!("Updated medical record {}", id);
        Ok(record)
    }

    pub async fn delete_medical_record(&self, id: Uuid) -> Result<()> {
        deleted(self.store.delete_medical_record(id).await?, "medical_record", id)
    }

    pub async fn list_medical_records(
        &self,
        patient_id: Uuid,
        page: Option<i64>,
    ) -> Result<Page<MedicalRecord>> {
        self.get_patient(patient_id).await?;
        let request = PageRequest::new(page, self.page_sizes.medical_records);
        self.store.list_medical_records(patient_id, request).await
    }

    // ========== 报表 ==========

    /// 创建报表，生成者为当前操作用户（可为空）
    pub async fn create_report(
        &self,
        new: NewReport,
        acting_user: Option<&ActingUser>,
    ) -> Result<Report> {
        let generated_by = acting_user.map(|u| u.id.clone());
        let report = Report::create(new, generated_by, Utc::now());
        report.validate()?;
        self.store.insert_report(&report).await?;
        info!("Created report {} ({})", report.title, report.id);
        Ok(report)
    }

    pub async fn get_report(&self, id: Uuid) -> Result<Report> {
        found(self.store.get_report(id).await?, "report", id)
    }

    pub async fn update_report(&self, id: Uuid, update: ReportUpdate) -> Result<Report> {
        let mut report = self.get_report(id).await?;
        report.apply(update, Utc::now());
        report.validate()?;
        self.store.update_report(&report).await?;
        info!("Updated report {}", id);
        Ok(report)
    }

    pub async fn delete_report(&self, id: Uuid) -> Result<()> {
        deleted(self.store.delete_report(id).await?, "report", id)
    }

    pub async fn list_reports(&self, filter: &ReportFilter, page: Option<i64>) -> Result<Page<Report>> {
        let request = PageRequest::new(page, self.page_sizes.reports);
        self.store.list_reports(filter, request).await
    }

    /// 生成收入报表并保存
    ///
    /// 没有操作用户时仍然生成，`generated_by` 为空。
    pub async fn generate_revenue_report(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        acting_user: Option<&ActingUser>,
    ) -> Result<RevenueReport> {
        let summary = self.revenue_summary(start, end).await?;

        let generated_by = match ActingUser::require(acting_user) {
            Ok(user) => Some(user.id.clone()),
            Err(err) => {
                warn!("Generating revenue report without generator: {}", err);
                None
            }
        };

        let now = Utc::now();
        let report = Report::create(
            NewReport {
                title: format!("Revenue Report ({} to {})", start, end),
                report_type: ReportType::Revenue,
                summary: format!(
                    "Total Revenue: ${}, Total Bills: {}",
                    summary.total_revenue, summary.bill_count
                ),
                detailed_content: String::new(),
                status: None,
                report_date: now.date_naive(),
                period_start: Some(start),
                period_end: Some(end),
                file_attachment: None,
            },
            generated_by,
            now,
        );
        report.validate()?;
        self.store.insert_report(&report).await?;
        info!("Generated revenue report {} for {} to {}", report.id, start, end);

        Ok(RevenueReport { report, summary })
    }

    // ========== 统计 ==========

    pub async fn dashboard(&self) -> Result<Dashboard> {
        self.dashboard_on(today()).await
    }

    /// 仪表盘：计数、最近患者和当天预约
    pub async fn dashboard_on(&self, date: NaiveDate) -> Result<Dashboard> {
        let counts = self.store.dashboard_counts(date).await?;
        let recent_patients = self
            .store
            .list_patients(
                &PatientFilter::default(),
                PageRequest::first(DASHBOARD_RECENT_PATIENTS),
            )
            .await?
            .items
            .into_iter()
            .map(|p| PatientView::new(p, date))
            .collect();
        let todays_appointments = self
            .store
            .list_appointments(
                &AppointmentFilter {
                    date: Some(date),
                    ..Default::default()
                },
                PageRequest::first(DASHBOARD_APPOINTMENTS),
            )
            .await?
            .items;

        Ok(Dashboard {
            date,
            counts,
            recent_patients,
            todays_appointments,
        })
    }

    pub fn choices(&self) -> Choices {
        Choices::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::testing::*;

    fn service() -> HospitalService {
        HospitalService::new(Arc::new(MemoryStore::new()), PageSizes::default())
    }

    async fn doctor_and_patient(service: &HospitalService) -> (Doctor, Patient) {
        let doctor = service.create_doctor(new_doctor(1)).await.unwrap();
        let mut new = new_patient("Grace Hopper", date(2024, 1, 1));
        new.assigned_doctor_id = Some(doctor.id);
        let patient = service.create_patient(new).await.unwrap();
        (doctor, patient)
    }

    #[tokio::test]
    async fn test_bill_numbers_follow_creation_order() {
        let service = service();
        let (_, patient) = doctor_and_patient(&service).await;

        let mut numbers = Vec::new();
        for _ in 0..3 {
            let detail = service
                .create_bill(new_bill(patient.id, "10.00", BillStatus::Unpaid, date(2024, 1, 2)))
                .await
                .unwrap();
            numbers.push(detail.bill.bill.bill_number);
        }
        assert_eq!(numbers, vec!["BILL-000001", "BILL-000002", "BILL-000003"]);
    }

    #[tokio::test]
    async fn test_concurrent_bills_get_distinct_numbers() {
        let service = service();
        let (_, patient) = doctor_and_patient(&service).await;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let service = service.clone();
            let new = new_bill(patient.id, "5.00", BillStatus::Unpaid, date(2024, 1, 2));
            handles.push(tokio::spawn(async move { service.create_bill(new).await }));
        }

        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap().unwrap().bill.bill.bill_number);
        }
        numbers.sort();
        numbers.dedup();
        assert_eq!(numbers.len(), 10);
    }

    #[tokio::test]
    async fn test_bill_with_items_computes_totals() {
        let service = service();
        let (_, patient) = doctor_and_patient(&service).await;

        let mut new = new_bill(patient.id, "75.00", BillStatus::Unpaid, date(2024, 1, 2));
        new.paid_amount = dec("25.00");
        new.items = vec![
            new_bill_item("Consultation", 1, "50.00"),
            new_bill_item("Bandages", 5, "5.00"),
        ];
        let detail = service.create_bill(new).await.unwrap();

        assert_eq!(detail.bill.balance_amount, dec("50.00"));
        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.items[1].total_price, dec("25.00"));

        let item = service
            .update_bill_item(
                detail.items[1].id,
                BillItemUpdate {
                    quantity: Some(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(item.total_price, dec("10.00"));

        let reloaded = service.bill_detail(detail.bill.bill.id).await.unwrap();
        assert_eq!(reloaded.items.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_items_are_reported_with_index() {
        let service = service();
        let (_, patient) = doctor_and_patient(&service).await;

        let mut new = new_bill(patient.id, "10.00", BillStatus::Unpaid, date(2024, 1, 2));
        new.items = vec![
            new_bill_item("Fine", 1, "10.00"),
            new_bill_item("", 0, "1.00"),
        ];
        match service.create_bill(new).await {
            Err(HospitalError::Validation(errors)) => {
                assert!(errors.contains("items[1].description"));
                assert!(errors.contains("items[1].quantity"));
                assert_eq!(errors.len(), 2);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_overflowing_item_total_is_validation_error() {
        let service = service();
        let (_, patient) = doctor_and_patient(&service).await;

        let mut new = new_bill(patient.id, "10.00", BillStatus::Unpaid, date(2024, 1, 2));
        let mut huge = new_bill_item("Overflow", 2, "1.00");
        huge.unit_price = rust_decimal::Decimal::MAX;
        new.items = vec![huge.clone()];
        match service.create_bill(new).await {
            Err(HospitalError::Validation(errors)) => {
                assert!(errors.contains("items[0].total_price"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        let detail = service
            .create_bill(new_bill(patient.id, "10.00", BillStatus::Unpaid, date(2024, 1, 2)))
            .await
            .unwrap();
        let err = service.add_bill_item(detail.bill.bill.id, huge).await.unwrap_err();
        assert!(matches!(err, HospitalError::Validation(_)));

        let item = service
            .add_bill_item(detail.bill.bill.id, new_bill_item("Gauze", 2, "1.50"))
            .await
            .unwrap();
        let update = BillItemUpdate {
            unit_price: Some(rust_decimal::Decimal::MAX),
            ..Default::default()
        };
        let err = service.update_bill_item(item.id, update).await.unwrap_err();
        assert!(matches!(err, HospitalError::Validation(_)));
    }

    #[tokio::test]
    async fn test_double_booking_is_conflict() {
        let service = service();
        let (doctor, patient) = doctor_and_patient(&service).await;

        let slot = new_appointment(patient.id, doctor.id, date(2024, 1, 10), time(9, 0));
        service.create_appointment(slot.clone()).await.unwrap();
        let err = service.create_appointment(slot).await.unwrap_err();
        assert!(matches!(err, HospitalError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_availability_skips_scheduled_slots() {
        let service = service();
        let (doctor, patient) = doctor_and_patient(&service).await;

        service
            .create_appointment(new_appointment(patient.id, doctor.id, date(2024, 1, 10), time(9, 0)))
            .await
            .unwrap();
        let completed = service
            .create_appointment(new_appointment(patient.id, doctor.id, date(2024, 1, 10), time(11, 0)))
            .await
            .unwrap();
        service
            .update_appointment_status(completed.id, AppointmentStatus::Completed)
            .await
            .unwrap();

        let slots = service
            .doctor_availability(doctor.id, date(2024, 1, 10))
            .await
            .unwrap();
        assert_eq!(slots.len(), 15);
        assert_eq!(slots[0], time(9, 30));
        assert_eq!(slots[14], time(16, 30));
        assert!(slots.contains(&time(11, 0)));

        let other_day = service
            .doctor_availability(doctor.id, date(2024, 1, 11))
            .await
            .unwrap();
        assert_eq!(other_day.len(), 16);
    }

    #[tokio::test]
    async fn test_availability_for_unknown_doctor() {
        let err = service()
            .doctor_availability(Uuid::new_v4(), date(2024, 1, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, HospitalError::NotFound { entity: "doctor", .. }));
    }

    #[tokio::test]
    async fn test_revenue_counts_paid_bills_in_range() {
        let service = service();
        let (_, patient) = doctor_and_patient(&service).await;

        for (total, status, day) in [
            ("100.00", BillStatus::Paid, 5),
            ("250.50", BillStatus::Paid, 20),
            ("500.00", BillStatus::Unpaid, 10),
            ("999.00", BillStatus::Paid, 31),
        ] {
            service
                .create_bill(new_bill(patient.id, total, status, date(2024, 1, day)))
                .await
                .unwrap();
        }

        let summary = service
            .revenue_summary(date(2024, 1, 5), date(2024, 1, 20))
            .await
            .unwrap();
        assert_eq!(summary.total_revenue, dec("350.50"));
        assert_eq!(summary.bill_count, 2);

        let empty = service
            .revenue_summary(date(2023, 1, 1), date(2023, 12, 31))
            .await
            .unwrap();
        assert_eq!(empty.total_revenue.to_string(), "0.00");
        assert_eq!(empty.bill_count, 0);

        let err = service
            .revenue_summary(date(2024, 2, 1), date(2024, 1, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, HospitalError::Validation(_)));
    }

    #[tokio::test]
    async fn test_revenue_report_without_user() {
        let service = service();
        let (_, patient) = doctor_and_patient(&service).await;
        service
            .create_bill(new_bill(patient.id, "100.00", BillStatus::Paid, date(2024, 3, 1)))
            .await
            .unwrap();

        let generated = service
            .generate_revenue_report(date(2024, 3, 1), date(2024, 3, 31), None)
            .await
            .unwrap();
        let report = &generated.report;
        assert_eq!(report.title, "Revenue Report (2024-03-01 to 2024-03-31)");
        assert_eq!(report.summary, "Total Revenue: $100.00, Total Bills: 1");
        assert_eq!(report.report_type, ReportType::Revenue);
        assert_eq!(report.generated_by, None);
        assert_eq!(report.period_start, Some(date(2024, 3, 1)));

        let user = ActingUser::new("admin");
        let generated = service
            .generate_revenue_report(date(2024, 3, 1), date(2024, 3, 31), Some(&user))
            .await
            .unwrap();
        assert_eq!(generated.report.generated_by.as_deref(), Some("admin"));

        let page = service.list_reports(&ReportFilter::default(), None).await.unwrap();
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_ordered() {
        let service = service();
        for (name, day) in [("Anna Smith", 1), ("Joanna Li", 15), ("Bob Stone", 20), ("ANNABEL Ray", 10)] {
            service
                .create_patient(new_patient(name, date(2024, 1, day)))
                .await
                .unwrap();
        }

        let found = service.search_patients("anna").await.unwrap();
        let names: Vec<&str> = found.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Joanna Li", "ANNABEL Ray", "Anna Smith"]);
    }

    #[tokio::test]
    async fn test_quick_search_limit() {
        let service = service();
        for i in 0..12 {
            service
                .create_patient(new_patient(&format!("Patient {}", i), date(2024, 1, 1)))
                .await
                .unwrap();
        }
        assert_eq!(service.search_patients("patient").await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_deleting_doctor_keeps_patient() {
        let service = service();
        let (doctor, patient) = doctor_and_patient(&service).await;

        service.delete_doctor(doctor.id).await.unwrap();
        let patient = service.get_patient(patient.id).await.unwrap();
        assert_eq!(patient.assigned_doctor_id, None);

        let err = service.delete_doctor(doctor.id).await.unwrap_err();
        assert!(matches!(err, HospitalError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_patient_with_unknown_doctor_is_rejected() {
        let service = service();
        let mut new = new_patient("Orphan", date(2024, 1, 1));
        new.assigned_doctor_id = Some(Uuid::new_v4());
        match service.create_patient(new).await {
            Err(HospitalError::Validation(errors)) => assert!(errors.contains("assigned_doctor_id")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_validation_reports_all_fields() {
        let service = service();
        let mut new = new_doctor(7);
        new.name = String::new();
        new.phone = "12".to_string();
        new.email = "nope".to_string();
        new.years_of_experience = -3;
        match service.create_doctor(new).await {
            Err(HospitalError::Validation(errors)) => assert_eq!(errors.len(), 4),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_pagination_clamps() {
        let service = service();
        for i in 0..12 {
            service.create_doctor(new_doctor(i)).await.unwrap();
        }

        let page = service
            .list_doctors(&DoctorFilter::default(), Some(9))
            .await
            .unwrap();
        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].name, "Dr. Doctor 10");
    }

    #[tokio::test]
    async fn test_inactive_doctors_hidden_by_default() {
        let service = service();
        let doctor = service.create_doctor(new_doctor(1)).await.unwrap();
        service
            .update_doctor(
                doctor.id,
                DoctorUpdate {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let visible = service.list_doctors(&DoctorFilter::default(), None).await.unwrap();
        assert_eq!(visible.total, 0);

        let filter = DoctorFilter {
            include_inactive: true,
            ..Default::default()
        };
        assert_eq!(service.list_doctors(&filter, None).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_doctor_detail_counts_active_patients() {
        let service = service();
        let (doctor, patient) = doctor_and_patient(&service).await;

        let mut discharged = new_patient("Discharged", date(2024, 1, 1));
        discharged.assigned_doctor_id = Some(doctor.id);
        discharged.status = Some(PatientStatus::Discharged);
        service.create_patient(discharged).await.unwrap();

        service
            .create_appointment(new_appointment(patient.id, doctor.id, date(2024, 1, 10), time(10, 0)))
            .await
            .unwrap();

        let detail = service.doctor_detail(doctor.id).await.unwrap();
        assert_eq!(detail.active_patient_count, 1);
        assert_eq!(detail.appointments.len(), 1);
    }

    #[tokio::test]
    async fn test_patient_detail_and_cascade() {
        let service = service();
        let (doctor, patient) = doctor_and_patient(&service).await;

        service
            .create_appointment(new_appointment(patient.id, doctor.id, date(2024, 1, 10), time(10, 0)))
            .await
            .unwrap();
        let bill = service
            .create_bill(new_bill(patient.id, "10.00", BillStatus::Unpaid, date(2024, 1, 2)))
            .await
            .unwrap();
        service
            .create_medical_record(patient.id, new_medical_record(Some(doctor.id), 3))
            .await
            .unwrap();

        let detail = service.patient_detail_on(patient.id, date(2024, 1, 11)).await.unwrap();
        assert_eq!(detail.patient.days_admitted, 10);
        assert_eq!(detail.appointments.len(), 1);
        assert_eq!(detail.bills.len(), 1);
        assert_eq!(detail.medical_records.len(), 1);

        service.delete_patient(patient.id).await.unwrap();
        let err = service.get_bill(bill.bill.bill.id).await.unwrap_err();
        assert!(matches!(err, HospitalError::NotFound { entity: "bill", .. }));
        let appointments = service
            .list_appointments(&AppointmentFilter::default(), None)
            .await
            .unwrap();
        assert_eq!(appointments.total, 0);
    }

    #[tokio::test]
    async fn test_medical_records_require_patient() {
        let service = service();
        let err = service
            .create_medical_record(Uuid::new_v4(), new_medical_record(None, 3))
            .await
            .unwrap_err();
        assert!(matches!(err, HospitalError::NotFound { entity: "patient", .. }));
    }

    #[tokio::test]
    async fn test_department_detail_lists_rooms() {
        let service = service();
        let (doctor, _) = doctor_and_patient(&service).await;

        let mut new = new_department("Cardiology");
        new.head_doctor_id = Some(doctor.id);
        let department = service.create_department(new).await.unwrap();

        for number in 0..35 {
            let mut room = new_room(&format!("C{:03}", number));
            room.department_id = Some(department.id);
            service.create_room(room).await.unwrap();
        }

        let detail = service.department_detail(department.id).await.unwrap();
        assert_eq!(detail.rooms.len(), 35);
        assert_eq!(detail.head_doctor.map(|d| d.id), Some(doctor.id));

        let mut second = new_department("Neurology");
        second.head_doctor_id = Some(doctor.id);
        let err = service.create_department(second).await.unwrap_err();
        assert!(matches!(err, HospitalError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_dashboard_counts() {
        let service = service();
        let (doctor, patient) = doctor_and_patient(&service).await;
        let day = date(2024, 5, 1);

        service
            .create_appointment(new_appointment(patient.id, doctor.id, day, time(14, 0)))
            .await
            .unwrap();
        service
            .create_appointment(new_appointment(patient.id, doctor.id, day, time(9, 30)))
            .await
            .unwrap();
        service
            .create_bill(new_bill(patient.id, "10.00", BillStatus::Unpaid, day))
            .await
            .unwrap();
        service.create_room(new_room("301")).await.unwrap();

        let dashboard = service.dashboard_on(day).await.unwrap();
        assert_eq!(dashboard.counts.total_patients, 1);
        assert_eq!(dashboard.counts.active_patients, 1);
        assert_eq!(dashboard.counts.active_doctors, 1);
        assert_eq!(dashboard.counts.today_appointments, 2);
        assert_eq!(dashboard.counts.pending_bills, 1);
        assert_eq!(dashboard.counts.available_rooms, 1);
        assert_eq!(dashboard.todays_appointments[0].appointment_time, time(9, 30));
        assert_eq!(dashboard.recent_patients.len(), 1);
    }
}
