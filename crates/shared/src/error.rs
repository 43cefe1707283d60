//! 统一错误处理模块
//!
//! 定义基础设施层共享的错误类型，使用 thiserror 提供良好的错误信息。

use thiserror::Error;

/// 基础设施错误类型
#[derive(Debug, Error)]
pub enum HubError {
    // ==================== 数据库错误 ====================
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("文档存储错误: {0}")]
    DocumentStore(#[from] mongodb::error::Error),

    // ==================== 配置错误 ====================
    #[error("配置错误: {0}")]
    Config(#[from] config::ConfigError),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, HubError>;

impl HubError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_) => "DATABASE_ERROR",
            Self::DocumentStore(_) => "DOCUMENT_STORE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    /// 是否为可重试错误
    ///
    /// 通知链路本身不做重试，此标记仅供调用方决定是否重放请求。
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::DocumentStore(_))
    }
}
