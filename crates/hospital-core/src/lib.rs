//! # Hospital Core
//!
//! 医院管理系统的核心模块：实体定义、字段校验、派生规则、查询与分页、
//! 存储接口以及业务服务。

pub mod error;
pub mod inputs;
pub mod memory;
pub mod models;
pub mod query;
pub mod rules;
pub mod service;
pub mod store;
pub mod utils;
pub mod validation;
pub mod views;

#[cfg(test)]
mod testing;

pub use error::{FieldError, HospitalError, Result, ValidationErrors};
pub use inputs::*;
pub use memory::MemoryStore;
pub use models::*;
pub use query::{
    AppointmentFilter, BillFilter, DepartmentFilter, DoctorFilter, Page, PageRequest, PageSizes,
    PatientFilter, ReportFilter, RoomFilter,
};
pub use service::HospitalService;
pub use store::{DashboardCounts, HospitalStore, RevenueSummary};
pub use validation::Validate;
pub use views::*;
