//! 服务监控
//!
//! Prometheus 指标：按方法和状态码统计的 HTTP 请求数、请求耗时以及按操作和结果统计的业务操作数。
//! 路径只写入调试日志，避免记录 ID 造成标签基数膨胀。

use anyhow::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::{Duration, Instant};
use tracing::debug;

/// 服务指标收集器
#[derive(Debug, Clone)]
pub struct ServiceMonitor {
    /// Prometheus指标注册表
    registry: Registry,
    /// HTTP请求计数器，按 method / status 区分
    http_requests_total: IntCounterVec,
    /// HTTP请求延迟直方图，按 method 区分
    http_request_duration: HistogramVec,
    /// 业务操作计数器
    operations_total: IntCounterVec,
    /// 启动时间
    start_time: Instant,
}

impl ServiceMonitor {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("hospital_http_requests_total", "Total number of HTTP requests"),
            &["method", "status"],
        )?;

        let http_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "hospital_http_request_duration_seconds",
                "HTTP request duration in seconds",
            ),
            &["method"],
        )?;

        let operations_total = IntCounterVec::new(
            Opts::new(
                "hospital_operations_total",
                "Record operations by operation and outcome",
            ),
            &["operation", "outcome"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration.clone()))?;
        registry.register(Box::new(operations_total.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration,
            operations_total,
            start_time: Instant::now(),
        })
    }

    /// 记录HTTP请求
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration: Duration) {
        debug!("HTTP request: {} {} - {} in {:?}", method, path, status, duration);

        let status = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, status.as_str()])
            .inc();
        self.http_request_duration
            .with_label_values(&[method])
            .observe(duration.as_secs_f64());
    }

    /// 记录一次业务操作，例如 `("create_bill", "ok")`
    pub fn record_operation(&self, operation: &str, outcome: &str) {
        self.operations_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    pub fn http_requests(&self, method: &str, status: u16) -> u64 {
        self.http_requests_total
            .with_label_values(&[method, status.to_string().as_str()])
            .get()
    }

    pub fn operations(&self, operation: &str, outcome: &str) -> u64 {
        self.operations_total
            .with_label_values(&[operation, outcome])
            .get()
    }

    /// Prometheus 文本格式
    pub fn get_prometheus_metrics(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;

        Ok(String::from_utf8(buffer)?)
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}
