//! FCM 访问令牌
//!
//! FCM HTTP v1 使用 OAuth2 访问令牌鉴权。服务账号用私钥签发 JWT 断言，
//! 在 token 端点换取访问令牌，令牌在过期前复用。

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use hub_shared::config::PushConfig;

use super::truncate_body;
use crate::error::{NotificationError, Result};

const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// 提前刷新的余量，避免令牌在请求途中过期
const REFRESH_MARGIN_SECS: i64 = 60;

/// 访问令牌来源
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// 固定令牌（测试或外部注入令牌时使用）
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: DateTime<Utc>,
}

/// 服务账号令牌
pub struct ServiceAccountTokenProvider {
    client: reqwest::Client,
    client_email: String,
    token_uri: String,
    timeout: Duration,
    key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenProvider {
    /// 解析服务账号私钥
    ///
    /// 私钥常以单行环境变量形式配置，字面量 `\n` 会被还原为换行。
    pub fn new(client: reqwest::Client, config: &PushConfig) -> Result<Self> {
        if config.client_email.is_empty() {
            return Err(NotificationError::Credentials(
                "缺少服务账号 client_email".to_string(),
            ));
        }

        let pem = config.private_key.replace("\\n", "\n");
        let key = EncodingKey::from_rsa_pem(pem.as_bytes())?;

        Ok(Self {
            client,
            client_email: config.client_email.clone(),
            token_uri: config.token_uri.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
            key,
            cached: Mutex::new(None),
        })
    }

    fn sign_assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let iat = now.timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: FCM_SCOPE,
            aud: &self.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &self.key,
        )?)
    }

    #[instrument(skip(self))]
    async fn exchange(&self, now: DateTime<Utc>) -> Result<CachedToken> {
        let assertion = self.sign_assertion(now)?;

        let response = self
            .client
            .post(&self.token_uri)
            .timeout(self.timeout)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(NotificationError::Credentials(format!(
                "HTTP {}: {}",
                status.as_u16(),
                truncate_body(&text)
            )));
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = (token.expires_in - REFRESH_MARGIN_SECS).max(0);

        debug!(expires_in = token.expires_in, "FCM 访问令牌已刷新");

        Ok(CachedToken {
            value: token.access_token,
            refresh_at: now + chrono::Duration::seconds(lifetime),
        })
    }
}

#[async_trait]
impl AccessTokenProvider for ServiceAccountTokenProvider {
    async fn access_token(&self) -> Result<String> {
        // 持锁刷新，并发请求只触发一次换取
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref()
            && token.refresh_at > now
        {
            return Ok(token.value.clone());
        }

        let token = self.exchange(now).await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }
}
