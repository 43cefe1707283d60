//! SMS 短信通知渠道
//!
//! 通过 Twilio Messages API 发送短信。

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use hub_shared::config::SmsConfig;

use super::{SmsMessage, SmsSender, truncate_body};
use crate::error::{NotificationError, Result};
use crate::types::Channel;

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    code: Option<i64>,
    message: String,
}

/// Twilio 短信发送器
pub struct TwilioSmsSender {
    client: reqwest::Client,
    config: SmsConfig,
}

impl TwilioSmsSender {
    pub fn new(client: reqwest::Client, config: SmsConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.endpoint.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

#[async_trait]
impl SmsSender for TwilioSmsSender {
    #[instrument(skip(self, message), fields(to = %message.to))]
    async fn send_sms(&self, message: &SmsMessage) -> Result<String> {
        if !self.config.enabled {
            return Err(NotificationError::ChannelDisabled(Channel::Sms));
        }

        debug!(body_length = message.body.len(), "SMS 发送中...");

        let response = self
            .client
            .post(self.endpoint())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .form(&[
                ("To", message.to.as_str()),
                ("From", self.config.from_number.as_str()),
                ("Body", message.body.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let reason = match serde_json::from_str::<TwilioErrorBody>(&text) {
                Ok(err) => match err.code {
                    Some(code) => format!("HTTP {}: [{}] {}", status.as_u16(), code, err.message),
                    None => format!("HTTP {}: {}", status.as_u16(), err.message),
                },
                Err(_) => format!("HTTP {}: {}", status.as_u16(), truncate_body(&text)),
            };
            return Err(NotificationError::send_failed(Channel::Sms, reason));
        }

        let resource: MessageResource = response.json().await?;

        info!(message_sid = %resource.sid, "SMS 发送成功");
        Ok(resource.sid)
    }
}
