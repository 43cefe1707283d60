//! StudentHub 通知分发
//!
//! 将通知写入通知中心，并按渠道投递到邮件、短信或设备推送。
//!
//! ## 核心功能
//!
//! - **系统通知**：按请求指定的渠道（EMAIL/SMS/PUSH/IN_APP）投递
//! - **用户通知**：写入通知中心，HIGH 优先级额外推送到用户设备
//! - **投递结果**：记录写入后返回投递结果，投递失败不影响记录
//!
//! ## 模块结构
//!
//! - `types`: 请求、记录、收件人和投递结果
//! - `error`: 错误类型定义
//! - `formatter`: 通知类型到标题/主题的映射
//! - `store`: 通知记录持久化（MongoDB）
//! - `recipient`: 收件人目录（PostgreSQL）
//! - `channels`: 邮件、短信、推送发送器
//! - `dispatcher`: 分发编排
//! - `metrics`: 分发指标
//! - `bootstrap`: 启动装配

pub mod bootstrap;
pub mod channels;
pub mod dispatcher;
pub mod error;
pub mod formatter;
pub mod metrics;
pub mod recipient;
pub mod store;
pub mod types;

pub use dispatcher::NotificationDispatcher;
pub use error::{NotificationError, Result};
pub use types::{
    Channel, DeliveryOutcome, DeliveryReceipt, Dispatched, LinkedEntityType, NotificationActor,
    Priority, PushReport, RecipientInfo, SkipReason, SystemNotificationRecord,
    SystemNotificationRequest, SystemNotificationType, UserNotificationRecord,
    UserNotificationRequest, UserNotificationType,
};
