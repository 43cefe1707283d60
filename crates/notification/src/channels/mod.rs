//! 通知渠道实现
//!
//! 定义各渠道发送器 trait 并提供基于 HTTP API 的具体实现。
//!
//! ## 支持的渠道
//!
//! - **Email**: SendGrid v3 Mail Send
//! - **SMS**: Twilio Messages API
//! - **Push**: FCM HTTP v1（逐 token 并发发送，汇总为多播结果）
//!
//! 各发送器持有进程级共享的 `reqwest::Client`，由启动流程显式构造后注入分发器。

mod email;
mod fcm_auth;
mod push;
mod sms;

pub use email::SendGridEmailSender;
pub use fcm_auth::{AccessTokenProvider, ServiceAccountTokenProvider, StaticTokenProvider};
pub use push::FcmPushSender;
pub use sms::TwilioSmsSender;

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tracing::warn;

use crate::error::Result;
use crate::types::PushReport;

// ==================== 消息结构 ====================

/// 邮件消息
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub content: String,
    pub data: HashMap<String, serde_json::Value>,
}

/// 短信消息
#[derive(Debug, Clone, PartialEq)]
pub struct SmsMessage {
    pub to: String,
    pub body: String,
}

/// 推送消息，`tokens` 中的每个设备都会收到同一条通知
#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub tokens: Vec<String>,
    pub title: String,
    pub body: String,
    pub data: HashMap<String, serde_json::Value>,
}

// ==================== 发送器接口 ====================

/// 邮件发送器
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// 发送成功时返回服务商消息 ID（如有）
    async fn send_email(&self, message: &EmailMessage) -> Result<Option<String>>;
}

/// 短信发送器
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmsSender: Send + Sync {
    /// 发送成功时返回服务商消息 SID
    async fn send_sms(&self, message: &SmsMessage) -> Result<String>;
}

/// 推送发送器
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PushSender: Send + Sync {
    /// 多播发送，单个 token 失败计入报告而不是返回错误
    async fn send_push(&self, message: &PushMessage) -> Result<PushReport>;
}

/// 失效 token 处理扩展点
///
/// 失效 token 应立即移除还是批量清理尚未确定，当前只记录日志，
/// 同时失效列表会随 `PushReport` 返回给调用方。
#[async_trait]
pub trait FailedTokenHandler: Send + Sync {
    async fn handle_failed_tokens(&self, tokens: &[String]);
}

/// 仅记录日志的失效 token 处理器
#[derive(Debug, Default, Clone)]
pub struct LogFailedTokens;

#[async_trait]
impl FailedTokenHandler for LogFailedTokens {
    async fn handle_failed_tokens(&self, tokens: &[String]) {
        crate::metrics::record_failed_tokens(tokens.len());
        warn!(count = tokens.len(), tokens = ?tokens, "检测到无效的推送 token");
    }
}

// ==================== 数据转换 ====================

/// 将数据载荷转换为纯字符串映射
///
/// FCM 的 data 字段只接受字符串值：字符串原样保留，
/// 其余值（数字、布尔、null、对象、数组）转为 JSON 文本。
pub fn prepare_data(data: &HashMap<String, serde_json::Value>) -> BTreeMap<String, String> {
    data.iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}

/// 截断服务商错误响应，避免日志中出现超长正文
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX_LEN: usize = 512;
    if body.len() <= MAX_LEN {
        return body.to_string();
    }
    let mut end = MAX_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
