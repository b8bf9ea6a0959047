//! 数据库查询操作

use crate::connection::DatabasePool;
use crate::models::*;
use crate::schema;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use hospital_core::rules::format_bill_number;
use hospital_core::utils::like_pattern;
use hospital_core::*;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgExecutor, PgPool, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

/// 账单编号分配使用的 advisory lock 键
const BILL_NUMBER_LOCK: i64 = 0x4249_4c4c;

fn not_found_unless(rows_affected: u64, entity: &'static str, id: Uuid) -> Result<()> {
    if rows_affected == 0 {
        Err(HospitalError::not_found(entity, id))
    } else {
        Ok(())
    }
}

// ========== 列表过滤条件 ==========

/// 把过滤条件追加为 WHERE 子句
trait PushFilter: Sync {
    fn push_filter(&self, builder: &mut QueryBuilder<'_, Postgres>);
}

impl PushFilter for DoctorFilter {
    fn push_filter(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" WHERE TRUE");
        if !self.include_inactive {
            builder.push(" AND is_active");
        }
        if let Some(specialty) = self.specialty {
            builder.push(" AND specialty = ").push_bind(specialty.as_str());
        }
        if let Some(term) = self.search_term() {
            let pattern = like_pattern(term);
            builder
                .push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR specialty ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR license_number ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

impl PushFilter for PatientFilter {
    fn push_filter(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" WHERE TRUE");
        if let Some(status) = self.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(term) = self.search_term() {
            let pattern = like_pattern(term);
            builder
                .push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR phone ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR diagnosis ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

impl PushFilter for AppointmentFilter {
    fn push_filter(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" WHERE TRUE");
        if let Some(date) = self.date {
            builder.push(" AND appointment_date = ").push_bind(date);
        }
        if let Some(doctor_id) = self.doctor_id {
            builder.push(" AND doctor_id = ").push_bind(doctor_id);
        }
        if let Some(patient_id) = self.patient_id {
            builder.push(" AND patient_id = ").push_bind(patient_id);
        }
        if let Some(status) = self.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
    }
}

/// 账单查询联结 patients 表（别名 b / p）
impl PushFilter for BillFilter {
    fn push_filter(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" WHERE TRUE");
        if let Some(status) = self.status {
            builder.push(" AND b.status = ").push_bind(status.as_str());
        }
        if let Some(patient_id) = self.patient_id {
            builder.push(" AND b.patient_id = ").push_bind(patient_id);
        }
        if let Some(term) = self.search_term() {
            let pattern = like_pattern(term);
            builder
                .push(" AND (p.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR b.bill_number ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

impl PushFilter for RoomFilter {
    fn push_filter(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" WHERE TRUE");
        if let Some(status) = self.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(room_type) = self.room_type {
            builder.push(" AND room_type = ").push_bind(room_type.as_str());
        }
        if let Some(department_id) = self.department_id {
            builder.push(" AND department_id = ").push_bind(department_id);
        }
    }
}

impl PushFilter for DepartmentFilter {
    fn push_filter(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" WHERE TRUE");
        if !self.include_inactive {
            builder.push(" AND is_active");
        }
    }
}

impl PushFilter for ReportFilter {
    fn push_filter(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" WHERE TRUE");
        if let Some(report_type) = self.report_type {
            builder.push(" AND report_type = ").push_bind(report_type.as_str());
        }
        if let Some(status) = self.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
    }
}

/// 某位患者的病历
struct PatientRecords(Uuid);

impl PushFilter for PatientRecords {
    fn push_filter(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" WHERE patient_id = ").push_bind(self.0);
    }
}

/// 一次分页查询：来源表、列、过滤条件和排序
struct ListQuery<'q, F: PushFilter> {
    columns: &'static str,
    from: &'static str,
    filter: &'q F,
    order_by: &'static str,
}

// ========== 写入辅助 ==========

async fn insert_bill_item_with<'e, E>(executor: E, item: &BillItem) -> Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO bill_items (id, bill_id, item_type, description, quantity, unit_price, total_price, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(item.id)
    .bind(item.bill_id)
    .bind(item.item_type.as_str())
    .bind(&item.description)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.total_price)
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// 数据库查询操作接口
#[derive(Debug, Clone)]
pub struct DatabaseQueries {
    pool: DatabasePool,
}

impl DatabaseQueries {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        self.pool.pool()
    }

    /// 创建数据库表和索引
    pub async fn create_tables(&self) -> Result<()> {
        schema::create_tables(self.pool()).await
    }

    /// 先统计总数、限制页码，再取当前页
    async fn fetch_page<R, T, F>(
        &self,
        query: ListQuery<'_, F>,
        request: PageRequest,
        convert: fn(R) -> Result<T>,
    ) -> Result<Page<T>>
    where
        R: for<'r> FromRow<'r, PgRow> + Send + Unpin,
        T: Send,
        F: PushFilter,
    {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM ");
        count.push(query.from);
        query.filter.push_filter(&mut count);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool()).await?;

        let (page, offset) = request.window(total);
        let mut select = QueryBuilder::<Postgres>::new("SELECT ");
        select.push(query.columns).push(" FROM ").push(query.from);
        query.filter.push_filter(&mut select);
        select
            .push(" ORDER BY ")
            .push(query.order_by)
            .push(" LIMIT ")
            .push_bind(request.per_page)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows: Vec<R> = select.build_query_as().fetch_all(self.pool()).await?;
        debug!("Fetched page {} of {} ({} total)", page, query.from, total);
        let items = rows.into_iter().map(convert).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, page, request.per_page, total))
    }
}

#[async_trait]
impl HospitalStore for DatabaseQueries {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(self.pool()).await?;
        Ok(())
    }

    // ========== 医生相关操作 ==========

    async fn insert_doctor(&self, doctor: &Doctor) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO doctors (id, name, specialty, phone, email, license_number, years_of_experience, qualification, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(doctor.id)
        .bind(&doctor.name)
        .bind(doctor.specialty.as_str())
        .bind(&doctor.phone)
        .bind(&doctor.email)
        .bind(&doctor.license_number)
        .bind(doctor.years_of_experience)
        .bind(&doctor.qualification)
        .bind(doctor.is_active)
        .bind(doctor.created_at)
        .bind(doctor.updated_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn get_doctor(&self, id: Uuid) -> Result<Option<Doctor>> {
        sqlx::query_as::<_, DbDoctor>("SELECT * FROM doctors WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .map(Doctor::try_from)
            .transpose()
    }

    async fn update_doctor(&self, doctor: &Doctor) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE doctors
            SET name = $2, specialty = $3, phone = $4, email = $5, license_number = $6,
                years_of_experience = $7, qualification = $8, is_active = $9, updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(doctor.id)
        .bind(&doctor.name)
        .bind(doctor.specialty.as_str())
        .bind(&doctor.phone)
        .bind(&doctor.email)
        .bind(&doctor.license_number)
        .bind(doctor.years_of_experience)
        .bind(&doctor.qualification)
        .bind(doctor.is_active)
        .bind(doctor.updated_at)
        .execute(self.pool())
        .await?;
        not_found_unless(result.rows_affected(), "doctor", doctor.id)
    }

    async fn delete_doctor(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM doctors WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_doctors(&self, filter: &DoctorFilter, page: PageRequest) -> Result<Page<Doctor>> {
        let query = ListQuery {
            columns: "*",
            from: "doctors",
            filter,
            order_by: "name COLLATE \"C\", id",
        };
        self.fetch_page::<DbDoctor, _, _>(query, page, Doctor::try_from).await
    }

    async fn count_active_patients(&self, doctor_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM patients WHERE assigned_doctor_id = $1 AND status = 'active'",
        )
        .bind(doctor_id)
        .fetch_one(self.pool())
        .await?;
        Ok(count)
    }

    // ========== 患者相关操作 ==========

    async fn insert_patient(&self, patient: &Patient) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO patients (id, name, age, gender, phone, email, address, blood_group, emergency_contact,
                                  emergency_phone, diagnosis, medical_history, allergies, current_medications,
                                  assigned_doctor_id, status, admitted_date, discharge_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            "#,
        )
        .bind(patient.id)
        .bind(&patient.name)
        .bind(patient.age)
        .bind(patient.gender.as_str())
        .bind(&patient.phone)
        .bind(&patient.email)
        .bind(&patient.address)
        .bind(patient.blood_group.map(|g| g.as_str()))
        .bind(&patient.emergency_contact)
        .bind(&patient.emergency_phone)
        .bind(&patient.diagnosis)
        .bind(&patient.medical_history)
        .bind(&patient.allergies)
        .bind(&patient.current_medications)
        .bind(patient.assigned_doctor_id)
        .bind(patient.status.as_str())
        .bind(patient.admitted_date)
        .bind(patient.discharge_date)
        .bind(patient.created_at)
        .bind(patient.updated_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn get_patient(&self, id: Uuid) -> Result<Option<Patient>> {
        sqlx::query_as::<_, DbPatient>("SELECT * FROM patients WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .map(Patient::try_from)
            .transpose()
    }

    async fn update_patient(&self, patient: &Patient) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE patients
            SET name = $2, age = $3, gender = $4, phone = $5, email = $6, address = $7, blood_group = $8,
                emergency_contact = $9, emergency_phone = $10, diagnosis = $11, medical_history = $12,
                allergies = $13, current_medications = $14, assigned_doctor_id = $15, status = $16,
                admitted_date = $17, discharge_date = $18, updated_at = $19
            WHERE id = $1
            "#,
        )
        .bind(patient.id)
        .bind(&patient.name)
        .bind(patient.age)
        .bind(patient.gender.as_str())
        .bind(&patient.phone)
        .bind(&patient.email)
        .bind(&patient.address)
        .bind(patient.blood_group.map(|g| g.as_str()))
        .bind(&patient.emergency_contact)
        .bind(&patient.emergency_phone)
        .bind(&patient.diagnosis)
        .bind(&patient.medical_history)
        .bind(&patient.allergies)
        .bind(&patient.current_medications)
        .bind(patient.assigned_doctor_id)
        .bind(patient.status.as_str())
        .bind(patient.admitted_date)
        .bind(patient.discharge_date)
        .bind(patient.updated_at)
        .execute(self.pool())
        .await?;
        not_found_unless(result.rows_affected(), "patient", patient.id)
    }

    async fn delete_patient(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM patients WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_patients(
        &self,
        filter: &PatientFilter,
        page: PageRequest,
    ) -> Result<Page<Patient>> {
        let query = ListQuery {
            columns: "*",
            from: "patients",
            filter,
            order_by: "admitted_date DESC, id",
        };
        self.fetch_page::<DbPatient, _, _>(query, page, Patient::try_from).await
    }

    async fn search_patients_by_name(&self, term: &str, limit: i64) -> Result<Vec<PatientBrief>> {
        let rows = sqlx::query_as::<_, DbPatientBrief>(
            "SELECT id, name, phone, age FROM patients WHERE name ILIKE $1 ORDER BY admitted_date DESC, id LIMIT $2",
        )
        .bind(like_pattern(term))
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(PatientBrief::from).collect())
    }

    // ========== 预约相关操作 ==========

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO appointments (id, patient_id, doctor_id, appointment_date, appointment_time, appointment_type,
                                      duration_minutes, reason, notes, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(appointment.id)
        .bind(appointment.patient_id)
        .bind(appointment.doctor_id)
        .bind(appointment.appointment_date)
        .bind(appointment.appointment_time)
        .bind(appointment.appointment_type.as_str())
        .bind(appointment.duration_minutes)
        .bind(&appointment.reason)
        .bind(&appointment.notes)
        .bind(appointment.status.as_str())
        .bind(appointment.created_at)
        .bind(appointment.updated_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>> {
        sqlx::query_as::<_, DbAppointment>("SELECT * FROM appointments WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .map(Appointment::try_from)
            .transpose()
    }

    async fn update_appointment(&self, appointment: &Appointment) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE appointments
            SET patient_id = $2, doctor_id = $3, appointment_date = $4, appointment_time = $5,
                appointment_type = $6, duration_minutes = $7, reason = $8, notes = $9, status = $10,
                updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(appointment.id)
        .bind(appointment.patient_id)
        .bind(appointment.doctor_id)
        .bind(appointment.appointment_date)
        .bind(appointment.appointment_time)
        .bind(appointment.appointment_type.as_str())
        .bind(appointment.duration_minutes)
        .bind(&appointment.reason)
        .bind(&appointment.notes)
        .bind(appointment.status.as_str())
        .bind(appointment.updated_at)
        .execute(self.pool())
        .await?;
        not_found_unless(result.rows_affected(), "appointment", appointment.id)
    }

    async fn delete_appointment(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
        page: PageRequest,
    ) -> Result<Page<Appointment>> {
        let query = ListQuery {
            columns: "*",
            from: "appointments",
            filter,
            order_by: "appointment_date, appointment_time, id",
        };
        self.fetch_page::<DbAppointment, _, _>(query, page, Appointment::try_from).await
    }

    async fn scheduled_times(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Vec<NaiveTime>> {
        let times = sqlx::query_scalar(
            r#"
            SELECT appointment_time FROM appointments
            WHERE doctor_id = $1 AND appointment_date = $2 AND status = 'scheduled'
            ORDER BY appointment_time
            "#,
        )
        .bind(doctor_id)
        .bind(date)
        .fetch_all(self.pool())
        .await?;
        Ok(times)
    }

    // ========== 账单相关操作 ==========

    /// 在事务内加 advisory lock 读取最大编号，保证并发创建不会拿到同一编号
    async fn insert_bill(&self, bill: &Bill, items: &[BillItem]) -> Result<Bill> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(BILL_NUMBER_LOCK)
            .execute(&mut *tx)
            .await?;

        let max_suffix: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT MAX(CAST(SUBSTRING(bill_number FROM 6) AS BIGINT))
            FROM bills
            WHERE bill_number ~ '^BILL-[0-9]+$'
            "#,
        )
        .fetch_one(&mut *tx)
        .await?;

        let mut bill = bill.clone();
        let next = max_suffix.unwrap_or(0).max(0) as u64 + 1;
        bill.bill_number = format_bill_number(next);

        sqlx::query(
            r#"
            INSERT INTO bills (id, patient_id, bill_number, total_amount, paid_amount, discount_amount, tax_amount,
                               status, payment_method, bill_date, due_date, payment_date, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(bill.id)
        .bind(bill.patient_id)
        .bind(&bill.bill_number)
        .bind(bill.total_amount)
        .bind(bill.paid_amount)
        .bind(bill.discount_amount)
        .bind(bill.tax_amount)
        .bind(bill.status.as_str())
        .bind(bill.payment_method.map(|m| m.as_str()))
        .bind(bill.bill_date)
        .bind(bill.due_date)
        .bind(bill.payment_date)
        .bind(&bill.description)
        .bind(bill.created_at)
        .bind(bill.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in items {
            insert_bill_item_with(&mut *tx, item).await?;
        }

        tx.commit().await?;
        debug!("Assigned bill number {} to bill {}", bill.bill_number, bill.id);
        Ok(bill)
    }

    async fn get_bill(&self, id: Uuid) -> Result<Option<Bill>> {
        sqlx::query_as::<_, DbBill>("SELECT * FROM bills WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .map(Bill::try_from)
            .transpose()
    }

    async fn update_bill(&self, bill: &Bill) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE bills
            SET patient_id = $2, bill_number = $3, total_amount = $4, paid_amount = $5, discount_amount = $6,
                tax_amount = $7, status = $8, payment_method = $9, bill_date = $10, due_date = $11,
                payment_date = $12, description = $13, updated_at = $14
            WHERE id = $1
            "#,
        )
        .bind(bill.id)
        .bind(bill.patient_id)
        .bind(&bill.bill_number)
        .bind(bill.total_amount)
        .bind(bill.paid_amount)
        .bind(bill.discount_amount)
        .bind(bill.tax_amount)
        .bind(bill.status.as_str())
        .bind(bill.payment_method.map(|m| m.as_str()))
        .bind(bill.bill_date)
        .bind(bill.due_date)
        .bind(bill.payment_date)
        .bind(&bill.description)
        .bind(bill.updated_at)
        .execute(self.pool())
        .await?;
        not_found_unless(result.rows_affected(), "bill", bill.id)
    }

    async fn delete_bill(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM bills WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_bills(&self, filter: &BillFilter, page: PageRequest) -> Result<Page<Bill>> {
        let query = ListQuery {
            columns: "b.*",
            from: "bills b JOIN patients p ON p.id = b.patient_id",
            filter,
            order_by: "b.bill_date DESC, b.id",
        };
        self.fetch_page::<DbBill, _, _>(query, page, Bill::try_from).await
    }

    async fn list_bill_items(&self, bill_id: Uuid) -> Result<Vec<BillItem>> {
        let rows = sqlx::query_as::<_, DbBillItem>(
            "SELECT * FROM bill_items WHERE bill_id = $1 ORDER BY created_at, id",
        )
        .bind(bill_id)
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(BillItem::try_from).collect()
    }

    async fn insert_bill_item(&self, item: &BillItem) -> Result<()> {
        insert_bill_item_with(self.pool(), item).await
    }

    async fn get_bill_item(&self, id: Uuid) -> Result<Option<BillItem>> {
        sqlx::query_as::<_, DbBillItem>("SELECT * FROM bill_items WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .map(BillItem::try_from)
            .transpose()
    }

    async fn update_bill_item(&self, item: &BillItem) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE bill_items
            SET item_type = $2, description = $3, quantity = $4, unit_price = $5, total_price = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(item.id)
        .bind(item.item_type.as_str())
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.total_price)
        .bind(item.updated_at)
        .execute(self.pool())
        .await?;
        not_found_unless(result.rows_affected(), "bill_item", item.id)
    }

    async fn delete_bill_item(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM bill_items WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn revenue_summary(&self, start: NaiveDate, end: NaiveDate) -> Result<RevenueSummary> {
        let (total_revenue, bill_count): (Decimal, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(total_amount), 0), COUNT(*)
            FROM bills
            WHERE status = 'paid' AND bill_date BETWEEN $1 AND $2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(self.pool())
        .await?;

        Ok(RevenueSummary {
            start,
            end,
            total_revenue,
            bill_count,
        })
    }

    // ========== 科室相关操作 ==========

    async fn insert_department(&self, department: &Department) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO departments (id, name, description, head_doctor_id, location, phone, email, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(department.id)
        .bind(&department.name)
        .bind(&department.description)
        .bind(department.head_doctor_id)
        .bind(&department.location)
        .bind(&department.phone)
        .bind(&department.email)
        .bind(department.is_active)
        .bind(department.created_at)
        .bind(department.updated_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn get_department(&self, id: Uuid) -> Result<Option<Department>> {
        let row = sqlx::query_as::<_, DbDepartment>("SELECT * FROM departments WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(Department::from))
    }

    async fn update_department(&self, department: &Department) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE departments
            SET name = $2, description = $3, head_doctor_id = $4, location = $5, phone = $6, email = $7,
                is_active = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(department.id)
        .bind(&department.name)
        .bind(&department.description)
        .bind(department.head_doctor_id)
        .bind(&department.location)
        .bind(&department.phone)
        .bind(&department.email)
        .bind(department.is_active)
        .bind(department.updated_at)
        .execute(self.pool())
        .await?;
        not_found_unless(result.rows_affected(), "department", department.id)
    }

    async fn delete_department(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM departments WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_departments(
        &self,
        filter: &DepartmentFilter,
        page: PageRequest,
    ) -> Result<Page<Department>> {
        let query = ListQuery {
            columns: "*",
            from: "departments",
            filter,
            order_by: "name COLLATE \"C\", id",
        };
        self.fetch_page(query, page, |row: DbDepartment| Ok(row.into())).await
    }

    // ========== 病房相关操作 ==========

    async fn insert_room(&self, room: &Room) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO rooms (id, room_number, room_type, department_id, capacity, floor, status, daily_rate,
                               amenities, current_patient_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(room.id)
        .bind(&room.room_number)
        .bind(room.room_type.as_str())
        .bind(room.department_id)
        .bind(room.capacity)
        .bind(room.floor)
        .bind(room.status.as_str())
        .bind(room.daily_rate)
        .bind(&room.amenities)
        .bind(room.current_patient_id)
        .bind(room.created_at)
        .bind(room.updated_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn get_room(&self, id: Uuid) -> Result<Option<Room>> {
        sqlx::query_as::<_, DbRoom>("SELECT * FROM rooms WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .map(Room::try_from)
            .transpose()
    }

    async fn update_room(&self, room: &Room) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE rooms
            SET room_number = $2, room_type = $3, department_id = $4, capacity = $5, floor = $6, status = $7,
                daily_rate = $8, amenities = $9, current_patient_id = $10, updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(room.id)
        .bind(&room.room_number)
        .bind(room.room_type.as_str())
        .bind(room.department_id)
        .bind(room.capacity)
        .bind(room.floor)
        .bind(room.status.as_str())
        .bind(room.daily_rate)
        .bind(&room.amenities)
        .bind(room.current_patient_id)
        .bind(room.updated_at)
        .execute(self.pool())
        .await?;
        not_found_unless(result.rows_affected(), "room", room.id)
    }

    async fn delete_room(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM rooms WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_rooms(&self, filter: &RoomFilter, page: PageRequest) -> Result<Page<Room>> {
        let query = ListQuery {
            columns: "*",
            from: "rooms",
            filter,
            order_by: "room_number COLLATE \"C\", id",
        };
        self.fetch_page::<DbRoom, _, _>(query, page, Room::try_from).await
    }

    // ========== 病历相关操作 ==========

    async fn insert_medical_record(&self, record: &MedicalRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO medical_records (id, patient_id, doctor_id, visit_date, symptoms, diagnosis, treatment,
                                         prescription, follow_up_date, notes, attachment, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(record.id)
        .bind(record.patient_id)
        .bind(record.doctor_id)
        .bind(record.visit_date)
        .bind(&record.symptoms)
        .bind(&record.diagnosis)
        .bind(&record.treatment)
        .bind(&record.prescription)
        .bind(record.follow_up_date)
        .bind(&record.notes)
        .bind(&record.attachment)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn get_medical_record(&self, id: Uuid) -> Result<Option<MedicalRecord>> {
        let row = sqlx::query_as::<_, DbMedicalRecord>("SELECT * FROM medical_records WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(MedicalRecord::from))
    }

    async fn update_medical_record(&self, record: &MedicalRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE medical_records
            SET doctor_id = $2, visit_date = $3, symptoms = $4, diagnosis = $5, treatment = $6,
                prescription = $7, follow_up_date = $8, notes = $9, attachment = $10, updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(record.id)
        .bind(record.doctor_id)
        .bind(record.visit_date)
        .bind(&record.symptoms)
        .bind(&record.diagnosis)
        .bind(&record.treatment)
        .bind(&record.prescription)
        .bind(record.follow_up_date)
        .bind(&record.notes)
        .bind(&record.attachment)
        .bind(record.updated_at)
        .execute(self.pool())
        .await?;
        not_found_unless(result.rows_affected(), "medical_record", record.id)
    }

    async fn delete_medical_record(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM medical_records WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_medical_records(
        &self,
        patient_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<MedicalRecord>> {
        let query = ListQuery {
            columns: "*",
            from: "medical_records",
            filter: &PatientRecords(patient_id),
            order_by: "visit_date DESC, id",
        };
        self.fetch_page(query, page, |row: DbMedicalRecord| Ok(row.into())).await
    }

    // ========== 报表相关操作 ==========

    async fn insert_report(&self, report: &Report) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reports (id, title, report_type, summary, detailed_content, generated_by, status, report_date,
                                 period_start, period_end, file_attachment, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(report.id)
        .bind(&report.title)
        .bind(report.report_type.as_str())
        .bind(&report.summary)
        .bind(&report.detailed_content)
        .bind(&report.generated_by)
        .bind(report.status.as_str())
        .bind(report.report_date)
        .bind(report.period_start)
        .bind(report.period_end)
        .bind(&report.file_attachment)
        .bind(report.created_at)
        .bind(report.updated_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn get_report(&self, id: Uuid) -> Result<Option<Report>> {
        sqlx::query_as::<_, DbReport>("SELECT * FROM reports WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .map(Report::try_from)
            .transpose()
    }

    async fn update_report(&self, report: &Report) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE reports
            SET title = $2, report_type = $3, summary = $4, detailed_content = $5, status = $6,
                report_date = $7, period_start = $8, period_end = $9, file_attachment = $10, updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(report.id)
        .bind(&report.title)
        .bind(report.report_type.as_str())
        .bind(&report.summary)
        .bind(&report.detailed_content)
        .bind(report.status.as_str())
        .bind(report.report_date)
        .bind(report.period_start)
        .bind(report.period_end)
        .bind(&report.file_attachment)
        .bind(report.updated_at)
        .execute(self.pool())
        .await?;
        not_found_unless(result.rows_affected(), "report", report.id)
    }

    async fn delete_report(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM reports WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_reports(&self, filter: &ReportFilter, page: PageRequest) -> Result<Page<Report>> {
        let query = ListQuery {
            columns: "*",
            from: "reports",
            filter,
            order_by: "report_date DESC, id",
        };
        self.fetch_page::<DbReport, _, _>(query, page, Report::try_from).await
    }

    // ========== 统计 ==========

    async fn dashboard_counts(&self, today: NaiveDate) -> Result<DashboardCounts> {
        let (total_patients, active_patients, active_doctors, today_appointments, pending_bills, available_rooms): (
            i64,
            i64,
            i64,
            i64,
            i64,
            i64,
        ) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM patients),
                (SELECT COUNT(*) FROM patients WHERE status = 'active'),
                (SELECT COUNT(*) FROM doctors WHERE is_active),
                (SELECT COUNT(*) FROM appointments WHERE appointment_date = $1 AND status = 'scheduled'),
                (SELECT COUNT(*) FROM bills WHERE status = 'unpaid'),
                (SELECT COUNT(*) FROM rooms WHERE status = 'available')
            "#,
        )
        .bind(today)
        .fetch_one(self.pool())
        .await?;

        Ok(DashboardCounts {
            total_patients,
            active_patients,
            active_doctors,
            today_appointments,
            pending_bills,
            available_rooms,
        })
    }
}
