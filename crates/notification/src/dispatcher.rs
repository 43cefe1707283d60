//! 通知分发器
//!
//! 每次分发先写入通知记录，再按渠道解析收件人并调用对应发送器。
//!
//! ## 错误语义
//!
//! - 持久化失败：直接返回错误，不尝试任何发送
//! - 收件人查询失败、渠道发送失败：记录日志后吞掉，结果体现在 [`DeliveryOutcome::Failed`]
//! - 渠道被禁用或缺少寻址信息：[`DeliveryOutcome::Skipped`]
//!
//! 记录一经写入，不会因为投递失败而回滚。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::channels::{EmailMessage, EmailSender, PushMessage, PushSender, SmsMessage, SmsSender};
use crate::error::{NotificationError, Result};
use crate::formatter::{system_subject, system_title, user_title};
use crate::metrics::{DispatchKind, record_dispatch, record_send_duration};
use crate::recipient::RecipientDirectory;
use crate::store::NotificationStore;
use crate::types::{
    Channel, DeliveryOutcome, DeliveryReceipt, Dispatched, Priority, RecipientInfo, SkipReason,
    SystemNotificationRecord, SystemNotificationRequest, UserNotificationRecord,
    UserNotificationRequest,
};

/// 通知分发器
///
/// 所有依赖由启动流程显式构造后注入，分发器自身不持有可变状态，可在请求间共享。
#[derive(Clone)]
pub struct NotificationDispatcher {
    store: Arc<dyn NotificationStore>,
    recipients: Arc<dyn RecipientDirectory>,
    email: Arc<dyn EmailSender>,
    sms: Arc<dyn SmsSender>,
    push: Arc<dyn PushSender>,
}

impl NotificationDispatcher {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        recipients: Arc<dyn RecipientDirectory>,
        email: Arc<dyn EmailSender>,
        sms: Arc<dyn SmsSender>,
        push: Arc<dyn PushSender>,
    ) -> Self {
        Self {
            store,
            recipients,
            email,
            sms,
            push,
        }
    }

    /// 分发系统通知
    ///
    /// 返回已写入的记录和本次投递结果。只有持久化失败才返回 `Err`。
    #[instrument(
        skip(self, request),
        fields(
            notification_type = %request.notification_type,
            channel = %request.channel,
            user_id = ?request.user_id
        )
    )]
    pub async fn dispatch_system_notification(
        &self,
        request: &SystemNotificationRequest,
    ) -> Result<Dispatched<SystemNotificationRecord>> {
        let record = self
            .store
            .create_system_notification(request)
            .await
            .inspect_err(|e| error!(error = %e, "系统通知写入失败"))?;

        let delivery = match self.deliver_system(request).await {
            Ok(outcome) => outcome,
            Err(e) => swallow(request.channel, e),
        };

        log_outcome(&record.id, request.channel, &delivery);
        record_dispatch(DispatchKind::System, request.channel, &delivery);

        Ok(Dispatched::new(record, delivery))
    }

    /// 分发用户通知
    ///
    /// 只有 HIGH 优先级会额外尝试推送，其余优先级仅写入通知中心。
    #[instrument(
        skip(self, request),
        fields(
            notification_type = %request.notification_type,
            user_id = %request.user_id,
            priority = ?request.priority
        )
    )]
    pub async fn dispatch_user_notification(
        &self,
        request: &UserNotificationRequest,
    ) -> Result<Dispatched<UserNotificationRecord>> {
        let record = self
            .store
            .create_user_notification(request)
            .await
            .inspect_err(|e| error!(error = %e, "用户通知写入失败"))?;

        let channel = user_delivery_channel(request.priority);
        let delivery = match channel {
            Channel::Push => match self.deliver_user_push(request, &record).await {
                Ok(outcome) => outcome,
                Err(e) => swallow(channel, e),
            },
            _ => DeliveryOutcome::InAppOnly,
        };

        log_outcome(&record.id, channel, &delivery);
        record_dispatch(DispatchKind::User, channel, &delivery);

        Ok(Dispatched::new(record, delivery))
    }

    async fn deliver_system(&self, request: &SystemNotificationRequest) -> Result<DeliveryOutcome> {
        match request.channel {
            Channel::Email => {
                let Some(to) = non_empty(request.recipient.as_deref()) else {
                    return Ok(DeliveryOutcome::skipped(SkipReason::MissingRecipient));
                };

                let message = EmailMessage {
                    to: to.to_string(),
                    subject: system_subject(&request.notification_type).to_string(),
                    content: request.message.clone(),
                    data: request.data.clone(),
                };

                let started = Instant::now();
                let result = self.email.send_email(&message).await;
                record_send_duration(Channel::Email, started.elapsed().as_secs_f64());

                let message_id = result?;
                Ok(DeliveryOutcome::delivered(DeliveryReceipt::Email { message_id }))
            }
            Channel::Sms => {
                let Some(to) = non_empty(request.recipient.as_deref()) else {
                    return Ok(DeliveryOutcome::skipped(SkipReason::MissingRecipient));
                };

                let message = SmsMessage {
                    to: to.to_string(),
                    body: request.message.clone(),
                };

                let started = Instant::now();
                let result = self.sms.send_sms(&message).await;
                record_send_duration(Channel::Sms, started.elapsed().as_secs_f64());

                let message_sid = result?;
                Ok(DeliveryOutcome::delivered(DeliveryReceipt::Sms { message_sid }))
            }
            Channel::Push => {
                let Some(user_id) = non_empty(request.user_id.as_deref()) else {
                    return Ok(DeliveryOutcome::skipped(SkipReason::MissingUserId));
                };

                let recipient = match self.push_recipient(user_id).await? {
                    Ok(recipient) => recipient,
                    Err(reason) => return Ok(DeliveryOutcome::skipped(reason)),
                };

                let message = PushMessage {
                    tokens: recipient.push_tokens,
                    title: system_title(&request.notification_type).to_string(),
                    body: request.message.clone(),
                    data: request.data.clone(),
                };

                self.send_push(&message).await
            }
            Channel::InApp => Ok(DeliveryOutcome::InAppOnly),
        }
    }

    async fn deliver_user_push(
        &self,
        request: &UserNotificationRequest,
        record: &UserNotificationRecord,
    ) -> Result<DeliveryOutcome> {
        let recipient = match self.push_recipient(&request.user_id).await? {
            Ok(recipient) => recipient,
            Err(reason) => return Ok(DeliveryOutcome::skipped(reason)),
        };

        let message = PushMessage {
            tokens: recipient.push_tokens,
            title: user_title(&request.notification_type).to_string(),
            body: request.content.clone(),
            data: user_push_data(request, record),
        };

        self.send_push(&message).await
    }

    /// 查询推送收件人
    ///
    /// 外层 `Err` 为查询失败；内层 `Err` 为应跳过推送的原因。
    async fn push_recipient(
        &self,
        user_id: &str,
    ) -> Result<std::result::Result<RecipientInfo, SkipReason>> {
        let Some(recipient) = self.recipients.recipient_info(user_id).await? else {
            return Ok(Err(SkipReason::UnknownUser));
        };

        if !recipient.push_enabled {
            return Ok(Err(SkipReason::PushDisabled));
        }

        if !recipient.has_push_tokens() {
            return Ok(Err(SkipReason::NoPushTokens));
        }

        Ok(Ok(recipient))
    }

    async fn send_push(&self, message: &PushMessage) -> Result<DeliveryOutcome> {
        let started = Instant::now();
        let result = self.push.send_push(message).await;
        record_send_duration(Channel::Push, started.elapsed().as_secs_f64());

        let report = result?;
        Ok(DeliveryOutcome::delivered(DeliveryReceipt::Push(report)))
    }
}

/// 用户通知推送的数据载荷
///
/// 固定字段在前，`metadata` 中的同名键覆盖固定字段。
fn user_push_data(
    request: &UserNotificationRequest,
    record: &UserNotificationRecord,
) -> HashMap<String, Value> {
    let mut data = HashMap::new();
    data.insert("notificationId".to_string(), Value::String(record.id.clone()));
    data.insert(
        "type".to_string(),
        Value::String(request.notification_type.as_str().to_string()),
    );
    if let Some(entity_type) = request.linked_entity_type {
        data.insert(
            "linkedEntityType".to_string(),
            Value::String(entity_type.as_str().to_string()),
        );
    }
    if let Some(entity_id) = &request.linked_entity_id {
        data.insert("linkedEntityId".to_string(), Value::String(entity_id.clone()));
    }
    data.extend(request.metadata.clone());
    data
}

/// 用户通知的实际投递渠道：HIGH 优先级走推送，其余只进通知中心
fn user_delivery_channel(priority: Priority) -> Channel {
    if priority == Priority::High {
        Channel::Push
    } else {
        Channel::InApp
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// 将投递阶段的错误转为投递结果
fn swallow(channel: Channel, err: NotificationError) -> DeliveryOutcome {
    match err {
        NotificationError::ChannelDisabled(_) => {
            warn!(%channel, "渠道已禁用，跳过投递");
            DeliveryOutcome::skipped(SkipReason::ChannelDisabled)
        }
        other => {
            error!(%channel, error = %other, "通知投递失败，记录已保留");
            DeliveryOutcome::failed(other.to_string())
        }
    }
}

fn log_outcome(notification_id: &str, channel: Channel, outcome: &DeliveryOutcome) {
    match outcome {
        DeliveryOutcome::InAppOnly => {
            info!(notification_id, %channel, outcome = outcome.label(), "通知已写入通知中心");
        }
        DeliveryOutcome::Delivered { receipt } => {
            info!(notification_id, %channel, outcome = outcome.label(), receipt = ?receipt, "通知已投递");
        }
        DeliveryOutcome::Skipped { reason } => {
            info!(notification_id, %channel, outcome = outcome.label(), %reason, "通知未投递");
        }
        DeliveryOutcome::Failed { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{MockEmailSender, MockPushSender, MockSmsSender};
    use crate::recipient::MockRecipientDirectory;
    use crate::store::MockNotificationStore;
    use crate::types::{LinkedEntityType, PushReport, SystemNotificationType, UserNotificationType};
    use serde_json::json;

    struct Mocks {
        store: MockNotificationStore,
        recipients: MockRecipientDirectory,
        email: MockEmailSender,
        sms: MockSmsSender,
        push: MockPushSender,
    }

    impl Mocks {
        fn new() -> Self {
            let mut store = MockNotificationStore::new();
            store
                .expect_create_system_notification()
                .returning(|req| Ok(SystemNotificationRecord::from_request(req)));
            store
                .expect_create_user_notification()
                .returning(|req| Ok(UserNotificationRecord::from_request(req)));

            let mut email = MockEmailSender::new();
            email.expect_send_email().never();
            let mut sms = MockSmsSender::new();
            sms.expect_send_sms().never();
            let mut push = MockPushSender::new();
            push.expect_send_push().never();

            Self {
                store,
                recipients: MockRecipientDirectory::new(),
                email,
                sms,
                push,
            }
        }

        fn build(self) -> NotificationDispatcher {
            NotificationDispatcher::new(
                Arc::new(self.store),
                Arc::new(self.recipients),
                Arc::new(self.email),
                Arc::new(self.sms),
                Arc::new(self.push),
            )
        }
    }

    fn push_user(user_id: &str, enabled: bool, tokens: Vec<&str>) -> RecipientInfo {
        RecipientInfo::new(user_id)
            .with_push_enabled(enabled)
            .with_push_tokens(tokens)
    }

    #[tokio::test]
    async fn test_in_app_performs_no_send() {
        let dispatcher = Mocks::new().build();
        let request = SystemNotificationRequest::new("SYSTEM_ALERT", Channel::InApp, "Maintenance")
            .with_user_id("u1");

        let dispatched = dispatcher.dispatch_system_notification(&request).await.unwrap();

        assert_eq!(dispatched.delivery, DeliveryOutcome::InAppOnly);
        assert_eq!(dispatched.record.channel, Channel::InApp);
        assert_eq!(dispatched.record.message, "Maintenance");
    }

    #[tokio::test]
    async fn test_welcome_email_uses_subject_table() {
        let mut mocks = Mocks::new();
        mocks.email.checkpoint();
        mocks
            .email
            .expect_send_email()
            .withf(|m| m.to == "a@b.com" && m.subject == "Welcome to StudentHub" && m.content == "Hi")
            .times(1)
            .returning(|_| Ok(Some("msg-1".to_string())));
        let dispatcher = mocks.build();

        let request = SystemNotificationRequest::new("WELCOME", Channel::Email, "Hi")
            .with_recipient("a@b.com");
        let dispatched = dispatcher.dispatch_system_notification(&request).await.unwrap();

        assert_eq!(
            dispatched.record.notification_type,
            SystemNotificationType::Welcome
        );
        assert_eq!(
            dispatched.delivery,
            DeliveryOutcome::delivered(DeliveryReceipt::Email {
                message_id: Some("msg-1".to_string())
            })
        );
    }

    #[tokio::test]
    async fn test_email_without_recipient_is_skipped() {
        let dispatcher = Mocks::new().build();
        let request = SystemNotificationRequest::new("EVENT_UPDATE", Channel::Email, "moved");

        let dispatched = dispatcher.dispatch_system_notification(&request).await.unwrap();

        assert_eq!(
            dispatched.delivery,
            DeliveryOutcome::skipped(SkipReason::MissingRecipient)
        );
    }

    #[tokio::test]
    async fn test_sms_delivered() {
        let mut mocks = Mocks::new();
        mocks.sms.checkpoint();
        mocks
            .sms
            .expect_send_sms()
            .withf(|m| m.to == "+15550001111" && m.body == "Your payment failed")
            .times(1)
            .returning(|_| Ok("SM123".to_string()));
        let dispatcher = mocks.build();

        let request =
            SystemNotificationRequest::new("PAYMENT_FAILED", Channel::Sms, "Your payment failed")
                .with_recipient("+15550001111");
        let dispatched = dispatcher.dispatch_system_notification(&request).await.unwrap();

        assert_eq!(
            dispatched.delivery,
            DeliveryOutcome::delivered(DeliveryReceipt::Sms {
                message_sid: "SM123".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_send_failure_is_swallowed() {
        let mut mocks = Mocks::new();
        mocks.sms.checkpoint();
        mocks
            .sms
            .expect_send_sms()
            .times(1)
            .returning(|_| Err(NotificationError::send_failed(Channel::Sms, "HTTP 500: boom")));
        let dispatcher = mocks.build();

        let request = SystemNotificationRequest::new("EVENT_REMINDER", Channel::Sms, "tomorrow")
            .with_recipient("+15550001111");
        let dispatched = dispatcher.dispatch_system_notification(&request).await.unwrap();

        assert!(dispatched.delivery.is_failure());
        assert_eq!(dispatched.record.message, "tomorrow");
    }

    #[tokio::test]
    async fn test_channel_disabled_is_skipped() {
        let mut mocks = Mocks::new();
        mocks.email.checkpoint();
        mocks
            .email
            .expect_send_email()
            .times(1)
            .returning(|_| Err(NotificationError::ChannelDisabled(Channel::Email)));
        let dispatcher = mocks.build();

        let request =
            SystemNotificationRequest::new("WELCOME", Channel::Email, "Hi").with_recipient("a@b.com");
        let dispatched = dispatcher.dispatch_system_notification(&request).await.unwrap();

        assert_eq!(
            dispatched.delivery,
            DeliveryOutcome::skipped(SkipReason::ChannelDisabled)
        );
    }

    #[tokio::test]
    async fn test_persistence_failure_propagates_without_send() {
        let mut mocks = Mocks::new();
        mocks.store.checkpoint();
        mocks
            .store
            .expect_create_system_notification()
            .times(1)
            .returning(|_| Err(NotificationError::Persistence("connection refused".to_string())));
        let dispatcher = mocks.build();

        let request =
            SystemNotificationRequest::new("WELCOME", Channel::Email, "Hi").with_recipient("a@b.com");
        let result = dispatcher.dispatch_system_notification(&request).await;

        assert!(matches!(result, Err(NotificationError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_user_persistence_failure_skips_lookup() {
        let mut mocks = Mocks::new();
        mocks.store.checkpoint();
        mocks
            .store
            .expect_create_user_notification()
            .times(1)
            .returning(|_| Err(NotificationError::Persistence("timeout".to_string())));
        mocks.recipients.expect_recipient_info().never();
        let dispatcher = mocks.build();

        let request = UserNotificationRequest::new("u1", UserNotificationType::Like, "liked")
            .with_priority(Priority::High);
        let result = dispatcher.dispatch_user_notification(&request).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_push_missing_user_id_is_skipped() {
        let dispatcher = Mocks::new().build();
        let request = SystemNotificationRequest::new("SYSTEM_ALERT", Channel::Push, "alert");

        let dispatched = dispatcher.dispatch_system_notification(&request).await.unwrap();

        assert_eq!(
            dispatched.delivery,
            DeliveryOutcome::skipped(SkipReason::MissingUserId)
        );
    }

    #[tokio::test]
    async fn test_push_with_no_tokens_sends_nothing() {
        let mut mocks = Mocks::new();
        mocks
            .recipients
            .expect_recipient_info()
            .withf(|id| id == "u1")
            .returning(|id| Ok(Some(push_user(id, true, vec![]))));
        let dispatcher = mocks.build();

        let request =
            SystemNotificationRequest::new("EVENT_UPDATE", Channel::Push, "moved").with_user_id("u1");
        let dispatched = dispatcher.dispatch_system_notification(&request).await.unwrap();

        assert_eq!(
            dispatched.delivery,
            DeliveryOutcome::skipped(SkipReason::NoPushTokens)
        );
        assert_eq!(dispatched.record.user_id.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn test_push_disabled_user_sends_nothing() {
        let mut mocks = Mocks::new();
        mocks
            .recipients
            .expect_recipient_info()
            .returning(|id| Ok(Some(push_user(id, false, vec!["t1"]))));
        let dispatcher = mocks.build();

        let request =
            SystemNotificationRequest::new("EVENT_UPDATE", Channel::Push, "moved").with_user_id("u1");
        let dispatched = dispatcher.dispatch_system_notification(&request).await.unwrap();

        assert_eq!(
            dispatched.delivery,
            DeliveryOutcome::skipped(SkipReason::PushDisabled)
        );
    }

    #[tokio::test]
    async fn test_push_unknown_user() {
        let mut mocks = Mocks::new();
        mocks
            .recipients
            .expect_recipient_info()
            .returning(|_| Ok(None));
        let dispatcher = mocks.build();

        let request =
            SystemNotificationRequest::new("EVENT_UPDATE", Channel::Push, "moved").with_user_id("ghost");
        let dispatched = dispatcher.dispatch_system_notification(&request).await.unwrap();

        assert_eq!(
            dispatched.delivery,
            DeliveryOutcome::skipped(SkipReason::UnknownUser)
        );
    }

    #[tokio::test]
    async fn test_recipient_lookup_failure_is_swallowed() {
        let mut mocks = Mocks::new();
        mocks
            .recipients
            .expect_recipient_info()
            .returning(|_| Err(sqlx::Error::PoolTimedOut.into()));
        let dispatcher = mocks.build();

        let request =
            SystemNotificationRequest::new("EVENT_UPDATE", Channel::Push, "moved").with_user_id("u1");
        let dispatched = dispatcher.dispatch_system_notification(&request).await.unwrap();

        assert!(dispatched.delivery.is_failure());
    }

    #[tokio::test]
    async fn test_system_push_reports_failed_tokens() {
        let mut mocks = Mocks::new();
        mocks
            .recipients
            .expect_recipient_info()
            .returning(|id| Ok(Some(push_user(id, true, vec!["t1", "t2"]))));
        mocks.push.checkpoint();
        mocks
            .push
            .expect_send_push()
            .withf(|m| {
                m.tokens == vec!["t1".to_string(), "t2".to_string()]
                    && m.title == "Event Reminder"
                    && m.body == "starts soon"
                    && m.data.get("eventId") == Some(&json!("e1"))
            })
            .times(1)
            .returning(|_| Ok(PushReport::from_outcomes(vec![("t1", true), ("t2", false)])));
        let dispatcher = mocks.build();

        let request = SystemNotificationRequest::new("EVENT_REMINDER", Channel::Push, "starts soon")
            .with_user_id("u1")
            .with_data("eventId", json!("e1"));
        let dispatched = dispatcher.dispatch_system_notification(&request).await.unwrap();

        assert_eq!(dispatched.failed_tokens(), ["t2".to_string()]);
    }

    #[tokio::test]
    async fn test_user_notification_normal_priority_is_in_app_only() {
        let mut mocks = Mocks::new();
        mocks.recipients.expect_recipient_info().never();
        let dispatcher = mocks.build();

        let request = UserNotificationRequest::new("u1", UserNotificationType::Follow, "Ada followed you");
        let dispatched = dispatcher.dispatch_user_notification(&request).await.unwrap();

        assert_eq!(dispatched.delivery, DeliveryOutcome::InAppOnly);
        assert_eq!(dispatched.record.user_id, "u1");
    }

    #[tokio::test]
    async fn test_user_notification_high_priority_push_payload() {
        let mut mocks = Mocks::new();
        mocks
            .recipients
            .expect_recipient_info()
            .returning(|id| Ok(Some(push_user(id, true, vec!["t1"]))));
        mocks.push.checkpoint();
        mocks
            .push
            .expect_send_push()
            .withf(|m| {
                m.title == "You were tagged"
                    && m.body == "Ada tagged you"
                    && m.data.get("type") == Some(&json!("TAG"))
                    && m.data.get("linkedEntityType") == Some(&json!("POST"))
                    && m.data.get("linkedEntityId") == Some(&json!("p1"))
                    && m.data.get("count") == Some(&json!(5))
                    // metadata 覆盖固定字段
                    && m.data.get("notificationId") == Some(&json!("override"))
            })
            .times(1)
            .returning(|m| Ok(PushReport::from_outcomes(m.tokens.iter().map(|t| (t.as_str(), true)))));
        let dispatcher = mocks.build();

        let request = UserNotificationRequest::new("u1", UserNotificationType::Tag, "Ada tagged you")
            .with_priority(Priority::High)
            .with_linked_entity(LinkedEntityType::Post, "p1")
            .with_metadata("count", json!(5))
            .with_metadata("notificationId", json!("override"));
        let dispatched = dispatcher.dispatch_user_notification(&request).await.unwrap();

        assert!(matches!(
            dispatched.delivery,
            DeliveryOutcome::Delivered {
                receipt: DeliveryReceipt::Push(PushReport { success_count: 1, .. })
            }
        ));
    }

    #[tokio::test]
    async fn test_user_notification_push_disabled() {
        let mut mocks = Mocks::new();
        mocks
            .recipients
            .expect_recipient_info()
            .returning(|id| Ok(Some(push_user(id, false, vec!["t1"]))));
        let dispatcher = mocks.build();

        let request = UserNotificationRequest::new("u1", UserNotificationType::Mention, "@you")
            .with_priority(Priority::High);
        let dispatched = dispatcher.dispatch_user_notification(&request).await.unwrap();

        assert_eq!(
            dispatched.delivery,
            DeliveryOutcome::skipped(SkipReason::PushDisabled)
        );
    }

    #[tokio::test]
    async fn test_system_push_failure_is_swallowed() {
        let mut mocks = Mocks::new();
        mocks
            .recipients
            .expect_recipient_info()
            .returning(|id| Ok(Some(push_user(id, true, vec!["t1"]))));
        mocks.push.checkpoint();
        mocks
            .push
            .expect_send_push()
            .times(1)
            .returning(|_| Err(NotificationError::send_failed(Channel::Push, "HTTP 503: unavailable")));
        let dispatcher = mocks.build();

        let request = SystemNotificationRequest::new("EVENT_REMINDER", Channel::Push, "starts soon")
            .with_user_id("u1");
        let dispatched = dispatcher.dispatch_system_notification(&request).await.unwrap();

        assert!(dispatched.delivery.is_failure());
        assert!(dispatched.failed_tokens().is_empty());
        assert_eq!(dispatched.record.channel, Channel::Push);
        assert_eq!(dispatched.record.message, "starts soon");
    }

    #[tokio::test]
    async fn test_user_push_failure_is_swallowed() {
        let mut mocks = Mocks::new();
        mocks
            .recipients
            .expect_recipient_info()
            .returning(|id| Ok(Some(push_user(id, true, vec!["t1"]))));
        mocks.push.checkpoint();
        mocks
            .push
            .expect_send_push()
            .times(1)
            .returning(|_| Err(NotificationError::Credentials("HTTP 401: invalid_grant".to_string())));
        let dispatcher = mocks.build();

        let request = UserNotificationRequest::new("u1", UserNotificationType::Comment, "Great talk!")
            .with_priority(Priority::High);
        let dispatched = dispatcher.dispatch_user_notification(&request).await.unwrap();

        match &dispatched.delivery {
            DeliveryOutcome::Failed { reason } => assert!(reason.contains("invalid_grant")),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(dispatched.record.user_id, "u1");
        assert_eq!(dispatched.record.content, "Great talk!");
    }

    #[test]
    fn test_user_delivery_channel_follows_priority() {
        assert_eq!(user_delivery_channel(Priority::High), Channel::Push);
        assert_eq!(user_delivery_channel(Priority::Normal), Channel::InApp);
        assert_eq!(user_delivery_channel(Priority::Low), Channel::InApp);
    }

    #[test]
    fn test_user_push_data_includes_record_id() {
        let request = UserNotificationRequest::new("u1", UserNotificationType::Like, "liked");
        let record = UserNotificationRecord::from_request(&request);

        let data = user_push_data(&request, &record);

        assert_eq!(data.get("notificationId"), Some(&json!(record.id)));
        assert_eq!(data.get("type"), Some(&json!("LIKE")));
        assert!(!data.contains_key("linkedEntityType"));
        assert!(!data.contains_key("linkedEntityId"));
    }
}
