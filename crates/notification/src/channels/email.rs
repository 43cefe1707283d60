//! Email 邮件通知渠道
//!
//! 通过 SendGrid v3 API 发送邮件，同时携带纯文本和 HTML 两种正文。

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, instrument};

use hub_shared::config::EmailConfig;

use super::{EmailMessage, EmailSender, prepare_data, truncate_body};
use crate::error::{NotificationError, Result};
use crate::types::Channel;

#[derive(Serialize)]
struct MailSendRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    custom_args: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: &'a str,
}

/// SendGrid 邮件发送器
pub struct SendGridEmailSender {
    client: reqwest::Client,
    config: EmailConfig,
}

impl SendGridEmailSender {
    pub fn new(client: reqwest::Client, config: EmailConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self) -> String {
        format!("{}/v3/mail/send", self.config.endpoint.trim_end_matches('/'))
    }

    /// 构建 HTML 邮件内容
    fn build_html_content(&self, subject: &str, content: &str) -> String {
        let subject = escape_html(subject);
        let content = escape_html(content).replace('\n', "<br>");
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>{subject}</title>
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
        .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
        .header {{ background: #4f46e5; color: white; padding: 20px; border-radius: 8px 8px 0 0; }}
        .content {{ background: #f9f9f9; padding: 20px; border-radius: 0 0 8px 8px; }}
        .footer {{ text-align: center; color: #888; font-size: 12px; margin-top: 20px; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>{subject}</h1>
        </div>
        <div class="content">
            <p>{content}</p>
        </div>
        <div class="footer">
            <p>This email was sent automatically by {from_name}. Please do not reply.</p>
        </div>
    </div>
</body>
</html>"#,
            from_name = escape_html(&self.config.from_name),
        )
    }
}

#[async_trait]
impl EmailSender for SendGridEmailSender {
    #[instrument(skip(self, message), fields(to = %message.to, subject = %message.subject))]
    async fn send_email(&self, message: &EmailMessage) -> Result<Option<String>> {
        if !self.config.enabled {
            return Err(NotificationError::ChannelDisabled(Channel::Email));
        }

        let html = self.build_html_content(&message.subject, &message.content);
        let body = MailSendRequest {
            personalizations: vec![Personalization {
                to: vec![Address {
                    email: &message.to,
                    name: None,
                }],
            }],
            from: Address {
                email: &self.config.from_address,
                name: Some(&self.config.from_name),
            },
            subject: &message.subject,
            content: vec![
                Content {
                    content_type: "text/plain",
                    value: &message.content,
                },
                Content {
                    content_type: "text/html",
                    value: &html,
                },
            ],
            custom_args: prepare_data(&message.data),
        };

        debug!(content_length = html.len(), "Email 发送中...");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(NotificationError::send_failed(
                Channel::Email,
                format!("HTTP {}: {}", status.as_u16(), truncate_body(&text)),
            ));
        }

        let message_id = response
            .headers()
            .get("x-message-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        info!(message_id = ?message_id, "Email 发送成功");
        Ok(message_id)
    }
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
