//! # 医院系统运维模块
//!
//! 配置加载与校验、日志初始化以及 Prometheus 指标

pub mod config;
pub mod logging;
pub mod monitoring;

pub use config::{ConfigManager, ConfigValidator, HospitalConfig};
pub use logging::init_logging;
pub use monitoring::ServiceMonitor;
