//! HTTP处理器

use crate::error::ApiResult;
use crate::params::*;
use crate::server::AppState;
use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
};
use hospital_core::*;
use serde_json::json;
use std::convert::Infallible;
use tracing::{debug, error};
use uuid::Uuid;

/// 上游认证服务写入的用户标识请求头
pub const ACTING_USER_HEADER: &str = "x-user-id";

/// 当前操作用户，未登录时为 `None`
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<ActingUser>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(ACTING_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(ActingUser::new);
        Ok(CurrentUser(user))
    }
}

fn created<T: serde::Serialize>(value: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(value))
}

/// API根路径处理器
pub async fn api_root(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "service": "Hospital Records API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "backend": state.service.backend(),
        "endpoints": {
            "health": "/health",
            "metrics": "/metrics",
            "api": "/api/v1"
        }
    }))
}

/// 健康检查处理器
pub async fn health(State(state): State<AppState>) -> Response {
    let timestamp = chrono::Utc::now().to_rfc3339();
    match state.service.health_check().await {
        Ok(()) => Json(json!({
            "status": "healthy",
            "backend": state.service.backend(),
            "timestamp": timestamp,
        }))
        .into_response(),
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "backend": state.service.backend(),
                    "message": e.to_string(),
                    "timestamp": timestamp,
                })),
            )
                .into_response()
        }
    }
}

/// Prometheus 指标
pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.monitor.get_prometheus_metrics() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Json<Dashboard>> {
    Ok(Json(state.service.dashboard().await?))
}

pub async fn choices(State(state): State<AppState>) -> Json<Choices> {
    Json(state.service.choices())
}

// ========== 医生 ==========

pub async fn list_doctors(
    State(state): State<AppState>,
    Query(params): Query<DoctorParams>,
) -> ApiResult<Json<Page<Doctor>>> {
    debug!("Listing doctors with query: {:?}", params);
    let (filter, page) = params.split();
    Ok(Json(state.service.list_doctors(&filter, page).await?))
}

pub async fn create_doctor(
    State(state): State<AppState>,
    ApiJson(new): ApiJson<NewDoctor>,
) -> ApiResult<impl IntoResponse> {
    let doctor = state.track("create_doctor", state.service.create_doctor(new).await)?;
    Ok(created(doctor))
}

pub async fn doctor_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DoctorDetail>> {
    Ok(Json(state.service.doctor_detail(id).await?))
}

pub async fn update_doctor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(update): ApiJson<DoctorUpdate>,
) -> ApiResult<Json<Doctor>> {
    let doctor = state.track("update_doctor", state.service.update_doctor(id, update).await)?;
    Ok(Json(doctor))
}

pub async fn delete_doctor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.track("delete_doctor", state.service.delete_doctor(id).await)?;
    Ok(StatusCode::NO_CONTENT)
}

/// 空闲时段，格式 `HH:MM`
pub async fn doctor_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<AvailabilityParams>,
) -> ApiResult<impl IntoResponse> {
    let slots = state.service.doctor_availability(id, params.date).await?;
    let available: Vec<String> = slots
        .iter()
        .map(|slot| slot.format("%H:%M").to_string())
        .collect();

    Ok(Json(json!({
        "doctor_id": id,
        "date": params.date,
        "available_slots": available,
    })))
}

// ========== 患者 ==========

pub async fn list_patients(
    State(state): State<AppState>,
    Query(params): Query<PatientParams>,
) -> ApiResult<Json<Page<PatientView>>> {
    debug!("Listing patients with query: {:?}", params);
    let (filter, page) = params.split();
    Ok(Json(state.service.list_patients(&filter, page).await?))
}

pub async fn create_patient(
    State(state): State<AppState>,
    ApiJson(new): ApiJson<NewPatient>,
) -> ApiResult<impl IntoResponse> {
    let patient = state.track("create_patient", state.service.create_patient(new).await)?;
    Ok(created(patient))
}

pub async fn patient_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PatientDetail>> {
    Ok(Json(state.service.patient_detail(id).await?))
}

pub async fn update_patient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(update): ApiJson<PatientUpdate>,
) -> ApiResult<Json<Patient>> {
    let patient = state.track("update_patient", state.service.update_patient(id, update).await)?;
    Ok(Json(patient))
}

pub async fn delete_patient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.track("delete_patient", state.service.delete_patient(id).await)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn search_patients(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<PatientBrief>>> {
    Ok(Json(state.service.search_patients(&params.q).await?))
}

pub async fn list_medical_records(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<MedicalRecord>>> {
    let records = state
        .service
        .list_medical_records(patient_id, params.page)
        .await?;
    Ok(Json(records))
}

pub async fn create_medical_record(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
    ApiJson(new): ApiJson<NewMedicalRecord>,
) -> ApiResult<impl IntoResponse> {
    let record = state.track(
        "create_medical_record",
        state.service.create_medical_record(patient_id, new).await,
    )?;
    Ok(created(record))
}

// ========== 病历 ==========

pub async fn get_medical_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MedicalRecord>> {
    Ok(Json(state.service.get_medical_record(id).await?))
}

pub async fn update_medical_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(update): ApiJson<MedicalRecordUpdate>,
) -> ApiResult<Json<MedicalRecord>> {
    let record = state.track(
        "update_medical_record",
        state.service.update_medical_record(id, update).await,
    )?;
    Ok(Json(record))
}

pub async fn delete_medical_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.track(
        "delete_medical_record",
        state.service.delete_medical_record(id).await,
    )?;
    Ok(StatusCode::NO_CONTENT)
}

// ========== 预约 ==========

pub async fn list_appointments(
    State(state): State<AppState>,
    Query(params): Query<AppointmentParams>,
) -> ApiResult<Json<Page<Appointment>>> {
    debug!("Listing appointments with query: {:?}", params);
    let (filter, page) = params.split();
    Ok(Json(state.service.list_appointments(&filter, page).await?))
}

pub async fn create_appointment(
    State(state): State<AppState>,
    ApiJson(new): ApiJson<NewAppointment>,
) -> ApiResult<impl IntoResponse> {
    let appointment = state.track(
        "create_appointment",
        state.service.create_appointment(new).await,
    )?;
    Ok(created(appointment))
}

pub async fn get_appointment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Appointment>> {
    Ok(Json(state.service.get_appointment(id).await?))
}

pub async fn update_appointment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(update): ApiJson<AppointmentUpdate>,
) -> ApiResult<Json<Appointment>> {
    let appointment = state.track(
        "update_appointment",
        state.service.update_appointment(id, update).await,
    )?;
    Ok(Json(appointment))
}

pub async fn update_appointment_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(change): ApiJson<StatusChange>,
) -> ApiResult<Json<Appointment>> {
    let appointment = state.track(
        "update_appointment_status",
        state
            .service
            .update_appointment_status(id, change.status)
            .await,
    )?;
    Ok(Json(appointment))
}

pub async fn delete_appointment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.track("delete_appointment", state.service.delete_appointment(id).await)?;
    Ok(StatusCode::NO_CONTENT)
}

// ========== 账单 ==========

pub async fn list_bills(
    State(state): State<AppState>,
    Query(params): Query<BillParams>,
) -> ApiResult<Json<Page<BillView>>> {
    debug!("Listing bills with query: {:?}", params);
    let (filter, page) = params.split();
    Ok(Json(state.service.list_bills(&filter, page).await?))
}

pub async fn create_bill(
    State(state): State<AppState>,
    ApiJson(new): ApiJson<NewBill>,
) -> ApiResult<impl IntoResponse> {
    let detail = state.track("create_bill", state.service.create_bill(new).await)?;
    Ok(created(detail))
}

pub async fn bill_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BillDetail>> {
    Ok(Json(state.service.bill_detail(id).await?))
}

pub async fn update_bill(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(update): ApiJson<BillUpdate>,
) -> ApiResult<Json<BillView>> {
    let bill = state.track("update_bill", state.service.update_bill(id, update).await)?;
    Ok(Json(bill))
}

pub async fn delete_bill(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.track("delete_bill", state.service.delete_bill(id).await)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_bill_item(
    State(state): State<AppState>,
    Path(bill_id): Path<Uuid>,
    ApiJson(new): ApiJson<NewBillItem>,
) -> ApiResult<impl IntoResponse> {
    let item = state.track("add_bill_item", state.service.add_bill_item(bill_id, new).await)?;
    Ok(created(item))
}

pub async fn update_bill_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(update): ApiJson<BillItemUpdate>,
) -> ApiResult<Json<BillItem>> {
    let item = state.track(
        "update_bill_item",
        state.service.update_bill_item(id, update).await,
    )?;
    Ok(Json(item))
}

pub async fn delete_bill_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.track("delete_bill_item", state.service.delete_bill_item(id).await)?;
    Ok(StatusCode::NO_CONTENT)
}

// ========== 科室 ==========

pub async fn list_departments(
    State(state): State<AppState>,
    Query(params): Query<DepartmentParams>,
) -> ApiResult<Json<Page<Department>>> {
    let (filter, page) = params.split();
    Ok(Json(state.service.list_departments(&filter, page).await?))
}

pub async fn create_department(
    State(state): State<AppState>,
    ApiJson(new): ApiJson<NewDepartment>,
) -> ApiResult<impl IntoResponse> {
    let department = state.track(
        "create_department",
        state.service.create_department(new).await,
    )?;
    Ok(created(department))
}

pub async fn department_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DepartmentDetail>> {
    Ok(Json(state.service.department_detail(id).await?))
}

pub async fn update_department(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(update): ApiJson<DepartmentUpdate>,
) -> ApiResult<Json<Department>> {
    let department = state.track(
        "update_department",
        state.service.update_department(id, update).await,
    )?;
    Ok(Json(department))
}

pub async fn delete_department(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.track("delete_department", state.service.delete_department(id).await)?;
    Ok(StatusCode::NO_CONTENT)
}

// ========== 病房 ==========

pub async fn list_rooms(
    State(state): State<AppState>,
    Query(params): Query<RoomParams>,
) -> ApiResult<Json<Page<Room>>> {
    let (filter, page) = params.split();
    Ok(Json(state.service.list_rooms(&filter, page).await?))
}

pub async fn create_room(
    State(state): State<AppState>,
    ApiJson(new): ApiJson<NewRoom>,
) -> ApiResult<impl IntoResponse> {
    let room = state.track("create_room", state.service.create_room(new).await)?;
    Ok(created(room))
}

pub async fn room_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RoomDetail>> {
    Ok(Json(state.service.room_detail(id).await?))
}

pub async fn update_room(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(update): ApiJson<RoomUpdate>,
) -> ApiResult<Json<Room>> {
    let room = state.track("update_room", state.service.update_room(id, update).await)?;
    Ok(Json(room))
}

pub async fn delete_room(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.track("delete_room", state.service.delete_room(id).await)?;
    Ok(StatusCode::NO_CONTENT)
}

// ========== 报表 ==========

pub async fn list_reports(
    State(state): State<AppState>,
    Query(params): Query<ReportParams>,
) -> ApiResult<Json<Page<Report>>> {
    let (filter, page) = params.split();
    Ok(Json(state.service.list_reports(&filter, page).await?))
}

pub async fn create_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(new): ApiJson<NewReport>,
) -> ApiResult<impl IntoResponse> {
    let report = state.track(
        "create_report",
        state.service.create_report(new, user.as_ref()).await,
    )?;
    Ok(created(report))
}

pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Report>> {
    Ok(Json(state.service.get_report(id).await?))
}

pub async fn update_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(update): ApiJson<ReportUpdate>,
) -> ApiResult<Json<Report>> {
    let report = state.track("update_report", state.service.update_report(id, update).await)?;
    Ok(Json(report))
}

pub async fn delete_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.track("delete_report", state.service.delete_report(id).await)?;
    Ok(StatusCode::NO_CONTENT)
}

/// 生成收入报表
pub async fn generate_revenue_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(range): ApiJson<RevenueRange>,
) -> ApiResult<impl IntoResponse> {
    let report = state.track(
        "generate_revenue_report",
        state
            .service
            .generate_revenue_report(range.start, range.end, user.as_ref())
            .await,
    )?;
    Ok(created(report))
}
