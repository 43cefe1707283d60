//! 通知服务错误类型
//!
//! 区分持久化、收件人查询和渠道投递三类错误：
//! 持久化错误向调用方传播，后两类在分发器内被捕获并记录为投递失败。

use thiserror::Error;

use crate::types::Channel;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("通知持久化失败: {0}")]
    Persistence(String),

    #[error("收件人查询失败: {0}")]
    RecipientLookup(#[from] sqlx::Error),

    #[error("渠道已禁用: {0}")]
    ChannelDisabled(Channel),

    #[error("通知发送失败: 渠道={channel}, 原因={reason}")]
    SendFailed { channel: Channel, reason: String },

    #[error("HTTP 请求失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("推送凭证获取失败: {0}")]
    Credentials(String),
}

pub type Result<T> = std::result::Result<T, NotificationError>;

impl NotificationError {
    pub fn send_failed(channel: Channel, reason: impl Into<String>) -> Self {
        Self::SendFailed {
            channel,
            reason: reason.into(),
        }
    }
}

impl From<mongodb::error::Error> for NotificationError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for NotificationError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Credentials(err.to_string())
    }
}
