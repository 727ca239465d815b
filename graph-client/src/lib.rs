pub mod api;
pub mod metrics;
pub mod rate_limiter;
pub mod retry;


pub use api::{GraphApiClient, GraphClientConfig};
pub use metrics::{ApiMetrics, ClientMetrics, Endpoint};
pub use rate_limiter::RateLimitConfig;
pub use retry::{RetryConfig, RetryMetrics};
