//! 错误响应

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use hospital_core::{FieldError, HospitalError};
use serde_json::json;
use tracing::error;

/// 接口层错误，包装核心错误并映射为 HTTP 状态码
#[derive(Debug)]
pub struct ApiError(pub HospitalError);

impl From<HospitalError> for ApiError {
    fn from(err: HospitalError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            HospitalError::Validation(_) => StatusCode::BAD_REQUEST,
            HospitalError::NotFound { .. } => StatusCode::NOT_FOUND,
            HospitalError::Conflict(_) => StatusCode::CONFLICT,
            HospitalError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            HospitalError::Config(_)
            | HospitalError::Database(_)
            | HospitalError::Serialization(_)
            | HospitalError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }

        let fields: &[FieldError] = match &self.0 {
            HospitalError::Validation(errors) => errors.errors(),
            _ => &[],
        };
        let body = Json(json!({
            "error": true,
            "message": self.0.to_string(),
            "status": status.as_u16(),
            "fields": fields,
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
