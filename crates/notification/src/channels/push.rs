//! Push 推送通知渠道
//!
//! FCM HTTP v1 没有多播接口，多播通过对每个 token 并发调用 `messages:send` 实现，
//! 再按 token 顺序汇总为 `PushReport`。单个 token 失败不会使整次发送失败；
//! 只有获取访问令牌失败时整次发送才返回错误。

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use hub_shared::config::PushConfig;

use super::{
    AccessTokenProvider, FailedTokenHandler, PushMessage, PushSender, prepare_data, truncate_body,
};
use crate::error::{NotificationError, Result};
use crate::types::{Channel, PushReport};

#[derive(Serialize)]
struct SendRequest<'a> {
    message: FcmMessage<'a>,
}

#[derive(Serialize)]
struct FcmMessage<'a> {
    token: &'a str,
    notification: FcmNotification<'a>,
    data: &'a BTreeMap<String, String>,
}

#[derive(Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
}

/// FCM 推送发送器
pub struct FcmPushSender {
    client: reqwest::Client,
    config: PushConfig,
    tokens: Arc<dyn AccessTokenProvider>,
    failed_token_handler: Arc<dyn FailedTokenHandler>,
}

impl FcmPushSender {
    pub fn new(
        client: reqwest::Client,
        config: PushConfig,
        tokens: Arc<dyn AccessTokenProvider>,
        failed_token_handler: Arc<dyn FailedTokenHandler>,
    ) -> Self {
        Self {
            client,
            config,
            tokens,
            failed_token_handler,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/projects/{}/messages:send",
            self.config.endpoint.trim_end_matches('/'),
            self.config.project_id
        )
    }

    /// 向单个设备发送，返回是否被 FCM 接受
    async fn send_one(
        &self,
        endpoint: &str,
        access_token: &str,
        device_token: &str,
        message: &PushMessage,
        data: &BTreeMap<String, String>,
    ) -> bool {
        let body = SendRequest {
            message: FcmMessage {
                token: device_token,
                notification: FcmNotification {
                    title: &message.title,
                    body: &message.body,
                },
                data,
            },
        };

        let result = self
            .client
            .post(endpoint)
            .bearer_auth(access_token)
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .json(&body)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                let status = response.status().as_u16();
                let text = response.text().await.unwrap_or_default();
                debug!(status, body = %truncate_body(&text), "FCM 拒绝了推送 token");
                false
            }
            Err(e) => {
                warn!(error = %e, "FCM 请求失败");
                false
            }
        }
    }
}

#[async_trait]
impl PushSender for FcmPushSender {
    #[instrument(skip(self, message), fields(token_count = message.tokens.len(), title = %message.title))]
    async fn send_push(&self, message: &PushMessage) -> Result<PushReport> {
        if !self.config.enabled {
            return Err(NotificationError::ChannelDisabled(Channel::Push));
        }

        if message.tokens.is_empty() {
            warn!("没有可用的推送 token，跳过发送");
            return Ok(PushReport::empty());
        }

        let access_token = self.tokens.access_token().await?;
        let endpoint = self.endpoint();
        let data = prepare_data(&message.data);

        let results = join_all(message.tokens.iter().map(|token| {
            self.send_one(&endpoint, &access_token, token, message, &data)
        }))
        .await;

        let report = PushReport::from_outcomes(
            message
                .tokens
                .iter()
                .map(String::as_str)
                .zip(results),
        );

        if !report.failed_tokens.is_empty() {
            self.failed_token_handler
                .handle_failed_tokens(&report.failed_tokens)
                .await;
        }

        info!(
            success_count = report.success_count,
            failure_count = report.failure_count,
            "Push 发送完成"
        );
        Ok(report)
    }
}
