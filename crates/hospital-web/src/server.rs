//! Web服务器

use crate::error::{ApiError, ApiResult};
use crate::handlers::*;
use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post},
    Router,
};
use hospital_admin::ServiceMonitor;
use hospital_core::{HospitalError, HospitalService};
use std::net::SocketAddr;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// 处理器共享状态
#[derive(Clone)]
pub struct AppState {
    pub service: HospitalService,
    pub monitor: ServiceMonitor,
}

impl AppState {
    pub fn new(service: HospitalService, monitor: ServiceMonitor) -> Self {
        Self { service, monitor }
    }

    /// 按结果记录一次写操作
    pub fn track<T>(&self, operation: &str, result: hospital_core::Result<T>) -> ApiResult<T> {
        let outcome = match &result {
            Ok(_) => "ok",
            Err(HospitalError::Validation(_)) => "invalid",
            Err(HospitalError::NotFound { .. }) => "not_found",
            Err(HospitalError::Conflict(_)) => "conflict",
            Err(_) => "error",
        };
        self.monitor.record_operation(operation, outcome);
        result.map_err(ApiError::from)
    }
}

pub struct WebServer {
    addr: SocketAddr,
    app: Router,
}

impl WebServer {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        Self {
            addr,
            app: create_app(state),
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        info!("Starting web server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start web server: {}", e))?;

        info!("Web server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

/// 完整路由
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(api_root))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .nest("/api/v1", api_routes())
        .layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}

/// API v1 路由
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/choices", get(choices))
        .route("/doctors", get(list_doctors).post(create_doctor))
        .route(
            "/doctors/:id",
            get(doctor_detail).patch(update_doctor).delete(delete_doctor),
        )
        .route("/doctors/:id/availability", get(doctor_availability))
        .route("/patients", get(list_patients).post(create_patient))
        .route("/patients/search", get(search_patients))
        .route(
            "/patients/:id",
            get(patient_detail).patch(update_patient).delete(delete_patient),
        )
        .route(
            "/patients/:id/medical-records",
            get(list_medical_records).post(create_medical_record),
        )
        .route(
            "/medical-records/:id",
            get(get_medical_record)
                .patch(update_medical_record)
                .delete(delete_medical_record),
        )
        .route("/appointments", get(list_appointments).post(create_appointment))
        .route(
            "/appointments/:id",
            get(get_appointment)
                .patch(update_appointment)
                .delete(delete_appointment),
        )
        .route("/appointments/:id/status", post(update_appointment_status))
        .route("/bills", get(list_bills).post(create_bill))
        .route(
            "/bills/:id",
            get(bill_detail).patch(update_bill).delete(delete_bill),
        )
        .route("/bills/:id/items", post(add_bill_item))
        .route(
            "/bill-items/:id",
            patch(update_bill_item).delete(delete_bill_item),
        )
        .route("/departments", get(list_departments).post(create_department))
        .route(
            "/departments/:id",
            get(department_detail)
                .patch(update_department)
                .delete(delete_department),
        )
        .route("/rooms", get(list_rooms).post(create_room))
        .route(
            "/rooms/:id",
            get(room_detail).patch(update_room).delete(delete_room),
        )
        .route("/reports", get(list_reports).post(create_report))
        .route("/reports/revenue", post(generate_revenue_report))
        .route(
            "/reports/:id",
            get(get_report).patch(update_report).delete(delete_report),
        )
}

/// 请求计数与耗时
async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;
    state.monitor.record_http_request(
        method.as_str(),
        &path,
        response.status().as_u16(),
        started.elapsed(),
    );
    response
}
