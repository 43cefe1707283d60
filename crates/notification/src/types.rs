//! 通知类型定义
//!
//! 定义通知请求、持久化记录、收件人信息以及投递结果等数据结构。
//! 序列化字段统一使用 camelCase，枚举值使用 SCREAMING_SNAKE_CASE，与 GraphQL 层保持一致。

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 用户通知的保留天数，过期后由文档库 TTL 索引清理
pub const USER_NOTIFICATION_TTL_DAYS: i64 = 30;

// ==================== 枚举 ====================

/// 通知投递渠道
///
/// 封闭枚举，未知渠道在反序列化边界即被拒绝，分发逻辑对各渠道做穷尽匹配。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    Email,
    Sms,
    Push,
    InApp,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "EMAIL",
            Self::Sms => "SMS",
            Self::Push => "PUSH",
            Self::InApp => "IN_APP",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 系统通知类型
///
/// 上游可能传入尚未登记的类型码，统一落入 `Other` 并原样保存。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SystemNotificationType {
    EventUpdate,
    EventReminder,
    PaymentConfirmation,
    PaymentFailed,
    SubscriptionExpiring,
    SystemAlert,
    Welcome,
    Other(String),
}

impl SystemNotificationType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::EventUpdate => "EVENT_UPDATE",
            Self::EventReminder => "EVENT_REMINDER",
            Self::PaymentConfirmation => "PAYMENT_CONFIRMATION",
            Self::PaymentFailed => "PAYMENT_FAILED",
            Self::SubscriptionExpiring => "SUBSCRIPTION_EXPIRING",
            Self::SystemAlert => "SYSTEM_ALERT",
            Self::Welcome => "WELCOME",
            Self::Other(code) => code,
        }
    }
}

impl From<&str> for SystemNotificationType {
    fn from(code: &str) -> Self {
        match code {
            "EVENT_UPDATE" => Self::EventUpdate,
            "EVENT_REMINDER" => Self::EventReminder,
            "PAYMENT_CONFIRMATION" => Self::PaymentConfirmation,
            "PAYMENT_FAILED" => Self::PaymentFailed,
            "SUBSCRIPTION_EXPIRING" => Self::SubscriptionExpiring,
            "SYSTEM_ALERT" => Self::SystemAlert,
            "WELCOME" => Self::Welcome,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for SystemNotificationType {
    fn from(code: String) -> Self {
        Self::from(code.as_str())
    }
}

impl From<SystemNotificationType> for String {
    fn from(value: SystemNotificationType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for SystemNotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 用户互动通知类型（点赞、评论、关注等）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UserNotificationType {
    Like,
    Comment,
    Follow,
    Mention,
    Tag,
    Share,
    Custom,
    Other(String),
}

impl UserNotificationType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Like => "LIKE",
            Self::Comment => "COMMENT",
            Self::Follow => "FOLLOW",
            Self::Mention => "MENTION",
            Self::Tag => "TAG",
            Self::Share => "SHARE",
            Self::Custom => "CUSTOM",
            Self::Other(code) => code,
        }
    }
}

impl From<&str> for UserNotificationType {
    fn from(code: &str) -> Self {
        match code {
            "LIKE" => Self::Like,
            "COMMENT" => Self::Comment,
            "FOLLOW" => Self::Follow,
            "MENTION" => Self::Mention,
            "TAG" => Self::Tag,
            "SHARE" => Self::Share,
            "CUSTOM" => Self::Custom,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for UserNotificationType {
    fn from(code: String) -> Self {
        Self::from(code.as_str())
    }
}

impl From<UserNotificationType> for String {
    fn from(value: UserNotificationType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for UserNotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 通知优先级
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// 通知关联的业务实体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkedEntityType {
    Post,
    Comment,
    User,
    Event,
    Course,
    Message,
}

impl LinkedEntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Comment => "COMMENT",
            Self::User => "USER",
            Self::Event => "EVENT",
            Self::Course => "COURSE",
            Self::Message => "MESSAGE",
        }
    }
}

/// 系统通知的投递状态
///
/// 记录创建后不再被本模块修改，新记录始终为 `Pending`。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    #[default]
    Pending,
}

// ==================== 请求 ====================

/// 触发用户通知的操作者
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationActor {
    pub id: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

/// 系统通知请求
///
/// 由调用方构造，不会被持久化本身；持久化的是据此生成的 `SystemNotificationRecord`。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemNotificationRequest {
    #[serde(rename = "type")]
    pub notification_type: SystemNotificationType,
    pub channel: Channel,
    pub message: String,
    #[serde(default)]
    pub user_id: Option<String>,
    /// 邮箱或手机号，EMAIL/SMS 渠道使用
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl SystemNotificationRequest {
    pub fn new(
        notification_type: impl Into<SystemNotificationType>,
        channel: Channel,
        message: impl Into<String>,
    ) -> Self {
        Self {
            notification_type: notification_type.into(),
            channel,
            message: message.into(),
            user_id: None,
            recipient: None,
            data: HashMap::new(),
            metadata: None,
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// 用户通知请求（通知中心条目）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNotificationRequest {
    pub user_id: String,
    #[serde(rename = "type")]
    pub notification_type: UserNotificationType,
    pub content: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub linked_entity_type: Option<LinkedEntityType>,
    #[serde(default)]
    pub linked_entity_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub sender: Option<NotificationActor>,
}

impl UserNotificationRequest {
    pub fn new(
        user_id: impl Into<String>,
        notification_type: impl Into<UserNotificationType>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            notification_type: notification_type.into(),
            content: content.into(),
            priority: Priority::Normal,
            linked_entity_type: None,
            linked_entity_id: None,
            metadata: HashMap::new(),
            sender: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_linked_entity(
        mut self,
        entity_type: LinkedEntityType,
        entity_id: impl Into<String>,
    ) -> Self {
        self.linked_entity_type = Some(entity_type);
        self.linked_entity_id = Some(entity_id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_sender(mut self, sender: NotificationActor) -> Self {
        self.sender = Some(sender);
        self
    }
}

// ==================== 持久化记录 ====================

/// 系统通知记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemNotificationRecord {
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SystemNotificationRecord {
    /// 根据请求生成待写入的记录
    pub fn from_request(request: &SystemNotificationRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7().to_string(),
            user_id: request.user_id.clone(),
            notification_type: request.notification_type.clone(),
            channel: request.channel,
            message: request.message.clone(),
            recipient: request.recipient.clone(),
            data: request.data.clone(),
            metadata: request.metadata.clone(),
            status: NotificationStatus::Pending,
            is_read: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// 用户通知记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNotificationRecord {
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl UserNotificationRecord {
    pub fn from_request(request: &UserNotificationRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7().to_string(),
            user_id: request.user_id.clone(),
            notification_type: request.notification_type.clone(),
            content: request.content.clone(),
            is_read: false,
            priority: request.priority,
            linked_entity_type: request.linked_entity_type,
            linked_entity_id: request.linked_entity_id.clone(),
            metadata: request.metadata.clone(),
            sender: request.sender.clone(),
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::days(USER_NOTIFICATION_TTL_DAYS),
        }
    }
}

// ==================== 收件人 ====================

/// 收件人寻址信息
///
/// 每次分发时从关系库按需读取的只读投影，不做缓存。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientInfo {
    pub user_id: String,
    pub email_address: Option<String>,
    pub phone_number: Option<String>,
    /// 去重且保留原始顺序的设备 token
    pub push_tokens: Vec<String>,
    pub push_enabled: bool,
}

impl RecipientInfo {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email_address = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone_number = Some(phone.into());
        self
    }

    /// 设置推送 token，丢弃空白项和重复项
    pub fn with_push_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_tokens.clear();
        for token in tokens {
            let token = token.into();
            if token.trim().is_empty() || self.push_tokens.contains(&token) {
                continue;
            }
            self.push_tokens.push(token);
        }
        self
    }

    pub fn with_push_enabled(mut self, enabled: bool) -> Self {
        self.push_enabled = enabled;
        self
    }

    pub fn has_push_tokens(&self) -> bool {
        !self.push_tokens.is_empty()
    }
}

// ==================== 投递结果 ====================

/// 多播推送的汇总结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushReport {
    pub success_count: usize,
    pub failure_count: usize,
    /// 投递失败的 token，按请求顺序排列，供调用方安排清理
    pub failed_tokens: Vec<String>,
}

impl PushReport {
    pub fn empty() -> Self {
        Self::default()
    }

    /// 按 token 顺序汇总逐条发送结果
    pub fn from_outcomes<'a, I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, bool)>,
    {
        let mut report = Self::default();
        for (token, ok) in outcomes {
            if ok {
                report.success_count += 1;
            } else {
                report.failure_count += 1;
                report.failed_tokens.push(token.to_string());
            }
        }
        report
    }

    pub fn total(&self) -> usize {
        self.success_count + self.failure_count
    }
}

/// 渠道服务商返回的投递凭据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryReceipt {
    Email { message_id: Option<String> },
    Sms { message_sid: String },
    Push(PushReport),
}

/// 未尝试投递的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    /// EMAIL/SMS 请求缺少收件地址
    MissingRecipient,
    /// PUSH 请求缺少用户 ID
    MissingUserId,
    /// 用户不存在
    UnknownUser,
    /// 用户没有可用的设备 token
    NoPushTokens,
    /// 用户关闭了推送
    PushDisabled,
    /// 渠道在配置中被禁用
    ChannelDisabled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MissingRecipient => "missing recipient",
            Self::MissingUserId => "missing user id",
            Self::UnknownUser => "unknown user",
            Self::NoPushTokens => "no push tokens",
            Self::PushDisabled => "push disabled by user",
            Self::ChannelDisabled => "channel disabled",
        };
        f.write_str(s)
    }
}

/// 单次分发的投递结果
///
/// 记录已经持久化之后的渠道投递状态。投递失败不会回滚记录，
/// 调用方可据此决定是否向用户展示投递状态。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryOutcome {
    /// 通知中心记录即为全部投递
    InAppOnly,
    Delivered { receipt: DeliveryReceipt },
    Skipped { reason: SkipReason },
    Failed { reason: String },
}

impl DeliveryOutcome {
    pub fn delivered(receipt: DeliveryReceipt) -> Self {
        Self::Delivered { receipt }
    }

    pub fn skipped(reason: SkipReason) -> Self {
        Self::Skipped { reason }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// 指标标签
    pub fn label(&self) -> &'static str {
        match self {
            Self::InAppOnly => "in_app",
            Self::Delivered { .. } => "delivered",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "failed",
        }
    }
}

/// 分发返回值：已持久化的记录 + 投递结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dispatched<R> {
    pub record: R,
    pub delivery: DeliveryOutcome,
}

impl<R> Dispatched<R> {
    pub fn new(record: R, delivery: DeliveryOutcome) -> Self {
        Self { record, delivery }
    }

    /// 推送失败的 token（非推送或无失败时为空）
    pub fn failed_tokens(&self) -> &[String] {
        match &self.delivery {
            DeliveryOutcome::Delivered {
                receipt: DeliveryReceipt::Push(report),
            } => &report.failed_tokens,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_channel_wire_names() {
        assert_eq!(serde_json::to_value(Channel::InApp).unwrap(), json!("IN_APP"));
        assert_eq!(
            serde_json::from_value::<Channel>(json!("SMS")).unwrap(),
            Channel::Sms
        );
        assert_eq!(Channel::Push.to_string(), "PUSH");
    }

    #[test]
    fn test_unknown_channel_rejected_at_boundary() {
        let raw = json!({"type": "WELCOME", "channel": "FAX", "message": "Hi"});
        assert!(serde_json::from_value::<SystemNotificationRequest>(raw).is_err());
    }

    #[test]
    fn test_notification_type_round_trip_keeps_unknown_code() {
        let t: SystemNotificationType = serde_json::from_value(json!("BRAND_NEW")).unwrap();
        assert_eq!(t, SystemNotificationType::Other("BRAND_NEW".to_string()));
        assert_eq!(serde_json::to_value(&t).unwrap(), json!("BRAND_NEW"));

        let t: UserNotificationType = serde_json::from_value(json!("LIKE")).unwrap();
        assert_eq!(t, UserNotificationType::Like);
    }

    #[test]
    fn test_system_request_deserialize_defaults() {
        let raw = json!({
            "type": "EVENT_UPDATE",
            "channel": "EMAIL",
            "message": "Venue changed",
            "recipient": "a@b.com"
        });
        let request: SystemNotificationRequest = serde_json::from_value(raw).unwrap();

        assert_eq!(request.notification_type, SystemNotificationType::EventUpdate);
        assert_eq!(request.channel, Channel::Email);
        assert_eq!(request.recipient.as_deref(), Some("a@b.com"));
        assert!(request.user_id.is_none());
        assert!(request.data.is_empty());
    }

    #[test]
    fn test_user_request_default_priority() {
        let raw = json!({"userId": "u1", "type": "FOLLOW", "content": "x followed you"});
        let request: UserNotificationRequest = serde_json::from_value(raw).unwrap();
        assert_eq!(request.priority, Priority::Normal);
        assert!(request.metadata.is_empty());
    }

    #[test]
    fn test_system_record_from_request() {
        let request = SystemNotificationRequest::new("WELCOME", Channel::Email, "Hi")
            .with_recipient("a@b.com")
            .with_data("plan", json!("pro"));

        let record = SystemNotificationRecord::from_request(&request);

        assert_eq!(record.notification_type, SystemNotificationType::Welcome);
        assert_eq!(record.message, "Hi");
        assert_eq!(record.status, NotificationStatus::Pending);
        assert!(!record.is_read);
        assert_eq!(record.data.get("plan"), Some(&json!("pro")));
        assert!(Uuid::parse_str(&record.id).is_ok());
    }

    #[test]
    fn test_user_record_expiry() {
        let request = UserNotificationRequest::new("u1", UserNotificationType::Comment, "nice");
        let record = UserNotificationRecord::from_request(&request);

        assert_eq!(
            record.expires_at - record.created_at,
            Duration::days(USER_NOTIFICATION_TTL_DAYS)
        );
        assert_eq!(record.priority, Priority::Normal);
    }

    #[test]
    fn test_recipient_tokens_deduplicated() {
        let info = RecipientInfo::new("u1").with_push_tokens(vec!["t1", "", "t2", "t1", "  "]);

        assert_eq!(info.push_tokens, vec!["t1".to_string(), "t2".to_string()]);
        assert!(info.has_push_tokens());
        assert!(!RecipientInfo::new("u2").has_push_tokens());
    }

    #[test]
    fn test_push_report_from_outcomes() {
        let report = PushReport::from_outcomes(vec![("a", true), ("b", false), ("c", false)]);

        assert_eq!(report.success_count, 1);
        assert_eq!(report.failure_count, 2);
        assert_eq!(report.failed_tokens, vec!["b".to_string(), "c".to_string()]);
        assert_eq!(report.total(), 3);
    }

    #[test]
    fn test_dispatched_failed_tokens() {
        let report = PushReport::from_outcomes(vec![("a", false)]);
        let dispatched = Dispatched::new(
            "record",
            DeliveryOutcome::delivered(DeliveryReceipt::Push(report)),
        );
        assert_eq!(dispatched.failed_tokens(), ["a".to_string()]);

        let in_app = Dispatched::new("record", DeliveryOutcome::InAppOnly);
        assert!(in_app.failed_tokens().is_empty());
        assert_eq!(in_app.delivery.label(), "in_app");
    }
}
