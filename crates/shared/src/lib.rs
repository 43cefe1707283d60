//! 共享库
//!
//! 包含通知服务共用的配置、错误处理、PostgreSQL 连接、MongoDB 连接、可观测性等基础设施代码。

pub mod config;
pub mod database;
pub mod document_store;
pub mod error;
pub mod observability;
pub mod test_utils;
