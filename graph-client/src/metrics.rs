use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::retry::RetryMetrics;

/// The four Graph API calls the moderator makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Accounts,
    Posts,
    Comments,
    HideComment,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Accounts => "accounts",
            Endpoint::Posts => "posts",
            Endpoint::Comments => "comments",
            Endpoint::HideComment => "hide_comment",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct RequestMetrics {
    pub endpoint: Endpoint,
    pub status_code: Option<u16>,
    pub response_time: Duration,
    /// Time spent waiting on the rate limiter before sending.
    pub queue_wait_time: Duration,
    pub success: bool,
    pub rate_limited: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EndpointMetrics {
    pub request_count: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub rate_limited_count: u64,
    pub total_response_time: Duration,
    pub max_response_time: Duration,
    pub total_queue_wait_time: Duration,
    pub max_queue_wait_time: Duration,
}

impl EndpointMetrics {
    fn update(&mut self, metrics: &RequestMetrics) {
        self.request_count += 1;
        self.total_response_time += metrics.response_time;
        self.max_response_time = self.max_response_time.max(metrics.response_time);
        self.total_queue_wait_time += metrics.queue_wait_time;
        self.max_queue_wait_time = self.max_queue_wait_time.max(metrics.queue_wait_time);

        if metrics.success {
            self.success_count += 1;
        } else {
            self.error_count += 1;
        }
        if metrics.rate_limited {
            self.rate_limited_count += 1;
        }
    }

    pub fn average_response_time(&self) -> Duration {
        if self.request_count == 0 {
            Duration::ZERO
        } else {
            self.total_response_time / self.request_count as u32
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ApiMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub rate_limited_requests: u64,
    pub by_endpoint: BTreeMap<Endpoint, EndpointMetrics>,
}

/// Everything the client counts, as exported at shutdown.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClientMetrics {
    pub requests: ApiMetrics,
    pub retries: RetryMetrics,
}

#[derive(Debug, Default)]
pub struct MetricsCollector {
    metrics: RwLock<ApiMetrics>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_request(&self, request_metrics: RequestMetrics) {
        let mut metrics = self.metrics.write().await;

        metrics.total_requests += 1;
        if request_metrics.success {
            metrics.successful_requests += 1;
        } else {
            metrics.failed_requests += 1;
        }
        if request_metrics.rate_limited {
            metrics.rate_limited_requests += 1;
        }

        metrics
            .by_endpoint
            .entry(request_metrics.endpoint)
            .or_default()
            .update(&request_metrics);
    }

    pub async fn get_metrics(&self) -> ApiMetrics {
        self.metrics.read().await.clone()
    }

    pub async fn reset_metrics(&self) {
        *self.metrics.write().await = ApiMetrics::default();
    }

    pub async fn export_metrics(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.get_metrics().await)
    }
}
