//! 文档库连接管理模块
//!
//! 管理 MongoDB 客户端的创建和生命周期。客户端内部自带连接池，
//! 进程内创建一次后按需克隆即可。

use std::time::Duration;

use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};
use tracing::{info, instrument};

use crate::config::MongoConfig;
use crate::error::Result;

/// MongoDB 连接包装
#[derive(Clone)]
pub struct DocumentStore {
    client: Client,
    database: Database,
}

impl DocumentStore {
    /// 建立连接并执行一次 ping 校验
    #[instrument(skip(config), fields(database = %config.database))]
    pub async fn connect(config: &MongoConfig) -> Result<Self> {
        info!("Connecting to document store...");

        let mut options = ClientOptions::parse(&config.url).await?;
        options.max_pool_size = Some(config.max_pool_size);
        options.min_pool_size = Some(config.min_pool_size);
        options.connect_timeout = Some(Duration::from_secs(config.connect_timeout_seconds));
        options.app_name = Some("studenthub-notification".to_string());

        let client = Client::with_options(options)?;
        let database = client.database(&config.database);

        let store = Self { client, database };
        store.health_check().await?;

        info!("Document store connection established");

        Ok(store)
    }

    /// 获取数据库句柄
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// 获取类型化集合
    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.database.collection::<T>(name)
    }

    /// 健康检查
    pub async fn health_check(&self) -> Result<()> {
        self.database.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }

    /// 关闭客户端，等待进行中的操作结束
    pub async fn close(self) {
        self.client.shutdown().await;
        info!("Document store connection closed");
    }
}
