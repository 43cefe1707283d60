//! 通知记录持久化
//!
//! 系统通知和用户通知分别写入文档库中的两个集合。每次分发恰好写入一条记录，
//! 写入后本模块不再修改记录（已读状态等由其他模块维护）。

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Collection, IndexModel};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use hub_shared::document_store::DocumentStore;

use crate::error::Result;
use crate::types::{
    Channel, LinkedEntityType, NotificationActor, NotificationStatus, Priority,
    SystemNotificationRecord, SystemNotificationRequest, SystemNotificationType,
    USER_NOTIFICATION_TTL_DAYS, UserNotificationRecord, UserNotificationRequest,
    UserNotificationType,
};

pub const SYSTEM_NOTIFICATIONS: &str = "system_notifications";
pub const USER_NOTIFICATIONS: &str = "user_notifications";

/// 通知记录存储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// 写入一条系统通知并返回已持久化的记录
    async fn create_system_notification(
        &self,
        request: &SystemNotificationRequest,
    ) -> Result<SystemNotificationRecord>;

    /// 写入一条用户通知并返回已持久化的记录
    async fn create_user_notification(
        &self,
        request: &UserNotificationRequest,
    ) -> Result<UserNotificationRecord>;
}

// ==================== 文档结构 ====================

/// 系统通知在文档库中的形态
///
/// 时间字段以 BSON date 存储，便于范围查询和 TTL 索引。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemNotificationDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub notification_type: SystemNotificationType,
    pub channel: Channel,
    pub message: String,
    pub recipient: Option<String>,
    pub data: HashMap<String, serde_json::Value>,
    pub metadata: Option<serde_json::Value>,
    pub status: NotificationStatus,
    pub is_read: bool,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl From<&SystemNotificationRecord> for SystemNotificationDocument {
    fn from(record: &SystemNotificationRecord) -> Self {
        Self {
            id: record.id.clone(),
            user_id: record.user_id.clone(),
            notification_type: record.notification_type.clone(),
            channel: record.channel,
            message: record.message.clone(),
            recipient: record.recipient.clone(),
            data: record.data.clone(),
            metadata: record.metadata.clone(),
            status: record.status,
            is_read: record.is_read,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// 用户通知在文档库中的形态
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNotificationDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub notification_type: UserNotificationType,
    pub content: String,
    pub is_read: bool,
    pub priority: Priority,
    pub linked_entity_type: Option<LinkedEntityType>,
    pub linked_entity_id: Option<String>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub sender: Option<NotificationActor>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl From<&UserNotificationRecord> for UserNotificationDocument {
    fn from(record: &UserNotificationRecord) -> Self {
        Self {
            id: record.id.clone(),
            user_id: record.user_id.clone(),
            notification_type: record.notification_type.clone(),
            content: record.content.clone(),
            is_read: record.is_read,
            priority: record.priority,
            linked_entity_type: record.linked_entity_type,
            linked_entity_id: record.linked_entity_id.clone(),
            metadata: record.metadata.clone(),
            sender: record.sender.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

// ==================== MongoDB 实现 ====================

/// 基于 MongoDB 的通知存储
pub struct MongoNotificationStore {
    system: Collection<SystemNotificationDocument>,
    user: Collection<UserNotificationDocument>,
}

impl MongoNotificationStore {
    pub fn new(store: &DocumentStore) -> Self {
        Self {
            system: store.collection(SYSTEM_NOTIFICATIONS),
            user: store.collection(USER_NOTIFICATIONS),
        }
    }

    /// 创建查询索引和 TTL 索引（幂等）
    ///
    /// 用户通知在 `createdAt` 之后 30 天由 MongoDB 自动删除。
    #[instrument(skip(self))]
    pub async fn ensure_indexes(&self) -> Result<()> {
        let ttl = Duration::from_secs(USER_NOTIFICATION_TTL_DAYS as u64 * 24 * 60 * 60);

        let user_indexes = vec![
            IndexModel::builder().keys(doc! { "userId": 1 }).build(),
            IndexModel::builder()
                .keys(doc! { "userId": 1, "isRead": 1 })
                .build(),
            IndexModel::builder()
                .keys(doc! { "createdAt": 1 })
                .options(
                    IndexOptions::builder()
                        .name("createdAt_ttl".to_string())
                        .expire_after(ttl)
                        .build(),
                )
                .build(),
        ];
        self.user.create_indexes(user_indexes, None).await?;

        self.system
            .create_index(IndexModel::builder().keys(doc! { "userId": 1 }).build(), None)
            .await?;

        info!("通知集合索引已就绪");
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for MongoNotificationStore {
    #[instrument(skip(self, request), fields(channel = %request.channel))]
    async fn create_system_notification(
        &self,
        request: &SystemNotificationRequest,
    ) -> Result<SystemNotificationRecord> {
        let record = SystemNotificationRecord::from_request(request);

        self.system
            .insert_one(SystemNotificationDocument::from(&record), None)
            .await?;

        debug!(notification_id = %record.id, "系统通知已写入");
        Ok(record)
    }

    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    async fn create_user_notification(
        &self,
        request: &UserNotificationRequest,
    ) -> Result<UserNotificationRecord> {
        let record = UserNotificationRecord::from_request(request);

        self.user
            .insert_one(UserNotificationDocument::from(&record), None)
            .await?;

        debug!(notification_id = %record.id, "用户通知已写入");
        Ok(record)
    }
}
