//! 启动装配
//!
//! 进程启动时调用一次：建立数据库连接、准备索引、构造共享 HTTP 客户端和各渠道发送器，
//! 然后注入分发器。发送器与客户端的生命周期与进程一致。

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use hub_shared::config::AppConfig;
use hub_shared::database::Database;
use hub_shared::document_store::DocumentStore;

use crate::channels::{
    AccessTokenProvider, FcmPushSender, LogFailedTokens, SendGridEmailSender,
    ServiceAccountTokenProvider, StaticTokenProvider, TwilioSmsSender,
};
use crate::dispatcher::NotificationDispatcher;
use crate::metrics::describe_metrics;
use crate::recipient::PgRecipientDirectory;
use crate::store::MongoNotificationStore;

const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// 构建渠道发送器共用的 HTTP 客户端
pub fn build_http_client(service_name: &str) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(format!("{}/{}", service_name, env!("CARGO_PKG_VERSION")))
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .build()
        .context("HTTP 客户端构建失败")
}

/// 根据配置装配通知分发器
pub async fn build_dispatcher(config: &AppConfig) -> Result<NotificationDispatcher> {
    describe_metrics();

    let database = Database::connect(&config.database)
        .await
        .context("PostgreSQL 连接失败")?;
    let documents = DocumentStore::connect(&config.mongo)
        .await
        .context("MongoDB 连接失败")?;

    let store = MongoNotificationStore::new(&documents);
    store.ensure_indexes().await.context("通知索引创建失败")?;

    let client = build_http_client(&config.service_name)?;

    // 推送关闭时发送器不会请求令牌，无需解析服务账号
    let access_tokens: Arc<dyn AccessTokenProvider> = if config.push.enabled {
        Arc::new(
            ServiceAccountTokenProvider::new(client.clone(), &config.push)
                .context("FCM 服务账号配置无效")?,
        )
    } else {
        Arc::new(StaticTokenProvider::new(String::new()))
    };

    let dispatcher = NotificationDispatcher::new(
        Arc::new(store),
        Arc::new(PgRecipientDirectory::new(database.pool().clone())),
        Arc::new(SendGridEmailSender::new(client.clone(), config.email.clone())),
        Arc::new(TwilioSmsSender::new(client.clone(), config.sms.clone())),
        Arc::new(FcmPushSender::new(
            client,
            config.push.clone(),
            access_tokens,
            Arc::new(LogFailedTokens),
        )),
    );

    info!(
        email_enabled = config.email.enabled,
        sms_enabled = config.sms.enabled,
        push_enabled = config.push.enabled,
        "通知分发器已就绪"
    );

    Ok(dispatcher)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client("hub-notification").is_ok());
    }

    #[tokio::test]
    #[ignore = "需要 PostgreSQL 和 MongoDB"]
    async fn test_build_dispatcher() {
        let config = AppConfig {
            database: hub_shared::test_utils::test_database_config(),
            mongo: hub_shared::test_utils::test_mongo_config(),
            ..Default::default()
        };

        assert!(build_dispatcher(&config).await.is_ok());
    }
}
