//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过 exporter 自带的 HTTP 监听器暴露，供 Prometheus 抓取。

use std::net::SocketAddr;

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

/// 安装 Prometheus recorder 并启动 `/metrics` 监听
///
/// 必须在 tokio 运行时内调用。
pub fn init(service_name: &str, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", service_name.to_string())
        .install()?;

    ::metrics::counter!("service_starts_total").increment(1);

    info!(%addr, "Prometheus exporter listening");
    Ok(())
}
