//! 通知标题/主题格式化
//!
//! 通知类型到展示文案的静态映射。未登记的类型回退到默认文案。

use crate::types::{SystemNotificationType, UserNotificationType};

/// 系统通知的默认主题
pub const DEFAULT_SYSTEM_SUBJECT: &str = "StudentHub Notification";

/// 用户通知的默认标题
pub const DEFAULT_USER_TITLE: &str = "New Notification";

/// 系统通知的邮件主题
pub fn system_subject(notification_type: &SystemNotificationType) -> &'static str {
    match notification_type {
        SystemNotificationType::EventUpdate => "Event Update",
        SystemNotificationType::EventReminder => "Event Reminder",
        SystemNotificationType::PaymentConfirmation => "Payment Confirmation",
        SystemNotificationType::PaymentFailed => "Payment Failed",
        SystemNotificationType::SubscriptionExpiring => "Subscription Expiring Soon",
        SystemNotificationType::SystemAlert => "Important System Alert",
        SystemNotificationType::Welcome => "Welcome to StudentHub",
        SystemNotificationType::Other(_) => DEFAULT_SYSTEM_SUBJECT,
    }
}

/// 系统通知的推送标题，与邮件主题共用一张表
pub fn system_title(notification_type: &SystemNotificationType) -> &'static str {
    system_subject(notification_type)
}

/// 用户通知的推送标题
pub fn user_title(notification_type: &UserNotificationType) -> &'static str {
    match notification_type {
        UserNotificationType::Like => "New Like",
        UserNotificationType::Comment => "New Comment",
        UserNotificationType::Follow => "New Follower",
        UserNotificationType::Mention => "New Mention",
        UserNotificationType::Tag => "You were tagged",
        UserNotificationType::Share => "Someone shared your post",
        UserNotificationType::Custom | UserNotificationType::Other(_) => DEFAULT_USER_TITLE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_subject_table() {
        let cases = [
            ("EVENT_UPDATE", "Event Update"),
            ("EVENT_REMINDER", "Event Reminder"),
            ("PAYMENT_CONFIRMATION", "Payment Confirmation"),
            ("PAYMENT_FAILED", "Payment Failed"),
            ("SUBSCRIPTION_EXPIRING", "Subscription Expiring Soon"),
            ("SYSTEM_ALERT", "Important System Alert"),
            ("WELCOME", "Welcome to StudentHub"),
        ];

        for (code, expected) in cases {
            let t = SystemNotificationType::from(code);
            assert_eq!(system_subject(&t), expected, "type {}", code);
            assert_eq!(system_title(&t), expected);
        }
    }

    #[test]
    fn test_system_subject_fallback() {
        let t = SystemNotificationType::from("NOT_A_TYPE");
        assert_eq!(system_subject(&t), "StudentHub Notification");
    }

    #[test]
    fn test_user_title_table() {
        let cases = [
            ("LIKE", "New Like"),
            ("COMMENT", "New Comment"),
            ("FOLLOW", "New Follower"),
            ("MENTION", "New Mention"),
            ("TAG", "You were tagged"),
            ("SHARE", "Someone shared your post"),
        ];

        for (code, expected) in cases {
            assert_eq!(user_title(&UserNotificationType::from(code)), expected);
        }
    }

    #[test]
    fn test_user_title_fallback() {
        assert_eq!(user_title(&UserNotificationType::Custom), "New Notification");
        assert_eq!(
            user_title(&UserNotificationType::from("POKE")),
            "New Notification"
        );
    }
}
