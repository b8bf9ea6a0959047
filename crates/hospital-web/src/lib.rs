//! # 医院系统 HTTP 接口
//!
//! JSON 接口，统一挂在 `/api/v1` 下。

pub mod error;
pub mod handlers;
pub mod params;
pub mod server;

pub use error::ApiError;
pub use params::ApiJson;
pub use server::{create_app, AppState, WebServer};
