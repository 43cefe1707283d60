//! 通知分发指标
//!
//! 指标名称集中在此定义，分发器和发送器通过便捷函数记录。

use crate::types::{Channel, DeliveryOutcome};

pub const DISPATCH_TOTAL: &str = "notification_dispatch_total";
pub const SEND_DURATION_SECONDS: &str = "notification_send_duration_seconds";
pub const PUSH_TOKENS_FAILED_TOTAL: &str = "push_tokens_failed_total";

/// 分发类别：系统通知或用户通知
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchKind {
    System,
    User,
}

impl DispatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
        }
    }
}

/// 注册指标描述（出现在 /metrics 的 HELP 注释中）
pub fn describe_metrics() {
    metrics::describe_counter!(DISPATCH_TOTAL, "Total number of notification dispatches");
    metrics::describe_histogram!(
        SEND_DURATION_SECONDS,
        "Channel provider send duration in seconds"
    );
    metrics::describe_counter!(
        PUSH_TOKENS_FAILED_TOTAL,
        "Total number of push tokens rejected by the provider"
    );
}

/// 记录一次分发结果
#[inline]
pub fn record_dispatch(kind: DispatchKind, channel: Channel, outcome: &DeliveryOutcome) {
    metrics::counter!(
        DISPATCH_TOTAL,
        "kind" => kind.as_str(),
        "channel" => channel.as_str(),
        "outcome" => outcome.label()
    )
    .increment(1);
}

/// 记录渠道发送耗时
#[inline]
pub fn record_send_duration(channel: Channel, duration_secs: f64) {
    metrics::histogram!(SEND_DURATION_SECONDS, "channel" => channel.as_str())
        .record(duration_secs);
}

/// 记录失效的推送 token 数量
#[inline]
pub fn record_failed_tokens(count: usize) {
    metrics::counter!(PUSH_TOKENS_FAILED_TOTAL).increment(count as u64);
}
