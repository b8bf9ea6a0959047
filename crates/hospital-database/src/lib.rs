//! # 医院数据库模块
//!
//! `HospitalStore` 的 PostgreSQL 实现：连接池、建表语句、行模型和查询。

pub mod connection;
pub mod models;
pub mod queries;
pub mod schema;

// 重新导出主要类型
pub use connection::{DatabasePool, PoolSettings};
pub use models::*;
pub use queries::DatabaseQueries;
