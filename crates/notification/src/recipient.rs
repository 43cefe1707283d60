//! 收件人目录
//!
//! 从关系库按用户 ID 读取寻址信息（邮箱、手机号、推送 token、推送开关）。
//! 结果不缓存，每次分发都读取最新数据。

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use crate::error::Result;
use crate::types::RecipientInfo;

/// 收件人目录接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    /// 用户不存在时返回 `Ok(None)`
    async fn recipient_info(&self, user_id: &str) -> Result<Option<RecipientInfo>>;
}

/// 用户表中与通知相关的列
///
/// 用户表由 Prisma 管理，列名为 camelCase，需要加引号访问。
#[derive(Debug, sqlx::FromRow)]
struct UserContactRow {
    id: String,
    email: Option<String>,
    #[sqlx(rename = "phoneNumber")]
    phone_number: Option<String>,
    #[sqlx(rename = "fcmTokens")]
    fcm_tokens: Option<Vec<String>>,
    #[sqlx(rename = "pushNotificationsEnabled")]
    push_notifications_enabled: Option<bool>,
}

impl From<UserContactRow> for RecipientInfo {
    fn from(row: UserContactRow) -> Self {
        let mut info = RecipientInfo::new(row.id)
            .with_push_enabled(row.push_notifications_enabled.unwrap_or(false))
            .with_push_tokens(row.fcm_tokens.unwrap_or_default());
        if let Some(email) = row.email {
            info = info.with_email(email);
        }
        if let Some(phone) = row.phone_number {
            info = info.with_phone(phone);
        }
        info
    }
}

/// 基于 PostgreSQL 的收件人目录
pub struct PgRecipientDirectory {
    pool: PgPool,
}

impl PgRecipientDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecipientDirectory for PgRecipientDirectory {
    async fn recipient_info(&self, user_id: &str) -> Result<Option<RecipientInfo>> {
        let row = sqlx::query_as::<_, UserContactRow>(
            r#"
            SELECT id, email, "phoneNumber", "fcmTokens", "pushNotificationsEnabled"
            FROM "User"
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        debug!(user_id, found = row.is_some(), "收件人信息查询完成");

        Ok(row.map(RecipientInfo::from))
    }
}
