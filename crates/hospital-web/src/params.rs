//! 查询参数与请求体
//!
//! 查询串中的空值（`?status=`）视为未提供；无法解析的页码按第一页处理。
//! 请求体解析失败统一返回 400 校验错误。

use crate::error::ApiError;
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use chrono::NaiveDate;
use hospital_core::*;
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

/// JSON 请求体提取器，解析失败时返回 `{error, message, status, fields}` 格式的校验错误
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(body_error(rejection)),
        }
    }
}

fn body_error(rejection: JsonRejection) -> ApiError {
    let message = match &rejection {
        JsonRejection::MissingJsonContentType(_) => {
            "请求头缺少 Content-Type: application/json".to_string()
        }
        _ => rejection.body_text(),
    };
    ApiError(HospitalError::validation("body", message))
}

fn empty_as_none<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

fn lenient_page<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|p| p.trim().parse().ok()))
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    #[serde(default, deserialize_with = "lenient_page")]
    pub page: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DoctorParams {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub specialty: Option<Specialty>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub include_inactive: Option<bool>,
    #[serde(default, deserialize_with = "lenient_page")]
    pub page: Option<i64>,
}

impl DoctorParams {
    pub fn split(self) -> (DoctorFilter, Option<i64>) {
        let filter = DoctorFilter {
            search: self.search,
            specialty: self.specialty,
            include_inactive: self.include_inactive.unwrap_or(false),
        };
        (filter, self.page)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PatientParams {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub status: Option<PatientStatus>,
    #[serde(default, deserialize_with = "lenient_page")]
    pub page: Option<i64>,
}

impl PatientParams {
    pub fn split(self) -> (PatientFilter, Option<i64>) {
        let filter = PatientFilter {
            search: self.search,
            status: self.status,
        };
        (filter, self.page)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AppointmentParams {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub doctor_id: Option<Uuid>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub patient_id: Option<Uuid>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(default, deserialize_with = "lenient_page")]
    pub page: Option<i64>,
}

impl AppointmentParams {
    pub fn split(self) -> (AppointmentFilter, Option<i64>) {
        let filter = AppointmentFilter {
            date: self.date,
            doctor_id: self.doctor_id,
            patient_id: self.patient_id,
            status: self.status,
        };
        (filter, self.page)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct BillParams {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub status: Option<BillStatus>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub patient_id: Option<Uuid>,
    #[serde(default, deserialize_with = "lenient_page")]
    pub page: Option<i64>,
}

impl BillParams {
    pub fn split(self) -> (BillFilter, Option<i64>) {
        let filter = BillFilter {
            search: self.search,
            status: self.status,
            patient_id: self.patient_id,
        };
        (filter, self.page)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RoomParams {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub status: Option<RoomStatus>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub room_type: Option<RoomType>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub department_id: Option<Uuid>,
    #[serde(default, deserialize_with = "lenient_page")]
    pub page: Option<i64>,
}

impl RoomParams {
    pub fn split(self) -> (RoomFilter, Option<i64>) {
        let filter = RoomFilter {
            status: self.status,
            room_type: self.room_type,
            department_id: self.department_id,
        };
        (filter, self.page)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DepartmentParams {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub include_inactive: Option<bool>,
    #[serde(default, deserialize_with = "lenient_page")]
    pub page: Option<i64>,
}

impl DepartmentParams {
    pub fn split(self) -> (DepartmentFilter, Option<i64>) {
        let filter = DepartmentFilter {
            include_inactive: self.include_inactive.unwrap_or(false),
        };
        (filter, self.page)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportParams {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub report_type: Option<ReportType>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub status: Option<ReportStatus>,
    #[serde(default, deserialize_with = "lenient_page")]
    pub page: Option<i64>,
}

impl ReportParams {
    pub fn split(self) -> (ReportFilter, Option<i64>) {
        let filter = ReportFilter {
            report_type: self.report_type,
            status: self.status,
        };
        (filter, self.page)
    }
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityParams {
    pub date: NaiveDate,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

/// 预约状态修改
#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: AppointmentStatus,
}

/// 收入报表区间（含两端）
#[derive(Debug, Deserialize)]
pub struct RevenueRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}
