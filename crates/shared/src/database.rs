//! 关系库连接管理模块
//!
//! 用户表（含邮箱、手机号、推送 token）位于 Prisma 管理的 PostgreSQL 中。
//! 通知链路只读取该库，连接池按只读查询的负载配置。

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::{debug, info, instrument};

use crate::config::DatabaseConfig;
use crate::error::Result;

const APPLICATION_NAME: &str = "studenthub-notification";

/// PostgreSQL 连接池包装
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 创建连接池并校验连通性
    ///
    /// 每个连接都设置 `statement_timeout`，避免慢查询拖住分发请求。
    #[instrument(skip(config))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to user database...");

        let statement_timeout_ms = config.statement_timeout_ms;
        let options = PgConnectOptions::from_str(&config.url)?
            .application_name(APPLICATION_NAME)
            .options([("statement_timeout", statement_timeout_ms.to_string())]);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect_with(options)
            .await?;

        let database = Self { pool };
        database.health_check().await?;

        info!(
            max_connections = config.max_connections,
            statement_timeout_ms, "User database connection pool created"
        );

        Ok(database)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        debug!(
            size = self.pool.size(),
            idle = self.pool.num_idle(),
            "User database healthy"
        );
        Ok(())
    }

    /// 关闭连接池，等待借出的连接归还
    pub async fn close(&self) {
        self.pool.close().await;
        info!("User database connection pool closed");
    }
}
