use crate::metrics::{ApiMetrics, ClientMetrics, Endpoint, MetricsCollector, RequestMetrics};
use crate::rate_limiter::{RateLimitConfig, RateLimiter};
use crate::retry::{RetryConfig, RetryExecutor, RetryMetrics};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use commentguard_core::{
    AccessToken, Comment, CoreError, GraphApiError, ModerationConfig, Page, PageCommentsApi,
    PostId,
};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

const USER_AGENT: &str = concat!("commentguard/", env!("CARGO_PKG_VERSION"));
const COMMENT_FIELDS: &str = "id,message,created_time";
const DEFAULT_RATE_LIMIT_RETRY_SECS: u64 = 60;
const DEFAULT_MAX_COMMENT_PAGES: usize = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct GraphList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub paging: Option<GraphPaging>,
}

impl<T> GraphList<T> {
    /// Cursor of the next page, if the API says there is one.
    pub fn next_cursor(&self) -> Option<String> {
        let paging = self.paging.as_ref()?;
        paging.next.as_ref()?;
        paging.cursors.as_ref()?.after.clone()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphPaging {
    #[serde(default)]
    pub cursors: Option<GraphCursors>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphCursors {
    #[serde(default)]
    pub after: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphPageData {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub access_token: Option<AccessToken>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphPostData {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphCommentData {
    pub id: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub created_time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphMutationResult {
    #[serde(default)]
    pub success: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphErrorEnvelope {
    pub error: GraphErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub error_subcode: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct GraphClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub rate_limit: RateLimitConfig,
    pub retry: RetryConfig,
    /// Upper bound on comment pages followed per post.
    pub max_comment_pages: usize,
}

impl GraphClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            rate_limit: RateLimitConfig::graph_api(),
            retry: RetryConfig::graph_api(),
            max_comment_pages: DEFAULT_MAX_COMMENT_PAGES,
        }
    }

    pub fn from_moderation_config(config: &ModerationConfig) -> Self {
        Self {
            timeout: config.request_timeout(),
            ..Self::new(config.graph_api_base.clone())
        }
    }
}

/// Parses Graph timestamps (`2024-03-01T11:58:00+0000`, RFC 3339 also
/// accepted) and converts them to UTC.
pub fn parse_graph_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z")
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Maps a non-success response to the error taxonomy. The Graph error code
/// wins over the HTTP status: throttling, for instance, arrives as 400/403.
pub fn classify_error_response(
    status: StatusCode,
    body: Option<&GraphErrorBody>,
    retry_after: Option<u64>,
    resource: &str,
) -> GraphApiError {
    let rate_limited = || GraphApiError::RateLimitExceeded {
        retry_after: retry_after.unwrap_or(DEFAULT_RATE_LIMIT_RETRY_SECS),
    };

    if let Some(code) = body.and_then(|b| b.code) {
        match code {
            190 | 102 => return GraphApiError::InvalidToken,
            4 | 17 | 32 | 613 => return rate_limited(),
            10 | 200..=299 => {
                return GraphApiError::PermissionDenied {
                    resource: resource.to_string(),
                }
            }
            803 => {
                return GraphApiError::NotFound {
                    resource: resource.to_string(),
                }
            }
            100 if body.and_then(|b| b.error_subcode) == Some(33) => {
                return GraphApiError::NotFound {
                    resource: resource.to_string(),
                }
            }
            _ => {}
        }
    }

    match status {
        StatusCode::UNAUTHORIZED => GraphApiError::InvalidToken,
        StatusCode::FORBIDDEN => GraphApiError::PermissionDenied {
            resource: resource.to_string(),
        },
        StatusCode::NOT_FOUND => GraphApiError::NotFound {
            resource: resource.to_string(),
        },
        StatusCode::TOO_MANY_REQUESTS => rate_limited(),
        s if s.is_server_error() => GraphApiError::ServerError {
            status_code: s.as_u16(),
        },
        s => match body {
            Some(body) => GraphApiError::Rejected {
                code: body.code.unwrap_or_else(|| i64::from(s.as_u16())),
                message: body.message.clone(),
            },
            None => GraphApiError::InvalidResponse {
                details: format!("Unexpected status {} for {}", s, resource),
            },
        },
    }
}

/// Client for the page-comment surface of the Graph API.
#[derive(Debug)]
pub struct GraphApiClient {
    http_client: Client,
    base_url: Url,
    rate_limiter: RateLimiter,
    retry: RetryExecutor,
    metrics: MetricsCollector,
    max_comment_pages: usize,
}

impl GraphApiClient {
    pub fn new(config: GraphClientConfig) -> Result<Self, CoreError> {
        // A trailing slash keeps a version segment ("/v19.0") when joining.
        let mut base = config.base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base).map_err(|e| CoreError::Internal {
            message: format!("Invalid Graph API base URL '{}': {}", config.base_url, e),
        })?;

        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            rate_limiter: RateLimiter::new(config.rate_limit),
            retry: RetryExecutor::new(config.retry),
            metrics: MetricsCollector::new(),
            max_comment_pages: config.max_comment_pages.max(1),
        })
    }

    pub fn from_moderation_config(config: &ModerationConfig) -> Result<Self, CoreError> {
        Self::new(GraphClientConfig::from_moderation_config(config))
    }

    /// One request/response exchange. The token travels as the
    /// `access_token` query parameter and is stripped from any error.
    async fn send_once<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: Endpoint,
        path: &str,
        token: &AccessToken,
        query: &[(&str, String)],
    ) -> Result<T, CoreError> {
        let url = self.base_url.join(path).map_err(|e| CoreError::Internal {
            message: format!("Invalid request path '{}': {}", path, e),
        })?;

        let permit = self.rate_limiter.acquire_permit().await?;
        let queue_wait = permit.queue_wait_time;
        let start_time = Instant::now();

        debug!("Graph API request: {} /{}", method, path);
        let result = self
            .http_client
            .request(method.clone(), url)
            .query(&[("access_token", token.secret())])
            .query(query)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                let e = e.without_url();
                self.record(endpoint, None, start_time, queue_wait, false, false)
                    .await;
                error!("Network error for {} /{}: {}", method, path, e);
                return Err(if e.is_timeout() {
                    CoreError::GraphApi(GraphApiError::RequestTimeout)
                } else {
                    CoreError::Network(e)
                });
            }
        };

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let body = response
            .text()
            .await
            .map_err(|e| CoreError::Network(e.without_url()))?;

        if !status.is_success() {
            let graph_error = serde_json::from_str::<GraphErrorEnvelope>(&body)
                .ok()
                .map(|envelope| envelope.error);
            let api_error =
                classify_error_response(status, graph_error.as_ref(), retry_after, path);
            let rate_limited = matches!(api_error, GraphApiError::RateLimitExceeded { .. });
            self.record(
                endpoint,
                Some(status),
                start_time,
                queue_wait,
                false,
                rate_limited,
            )
            .await;

            warn!(
                "Graph API {} /{} failed with {}: {}",
                method, path, status, api_error
            );
            return Err(CoreError::GraphApi(api_error));
        }

        self.record(endpoint, Some(status), start_time, queue_wait, true, false)
            .await;
        drop(permit);

        serde_json::from_str::<T>(&body).map_err(|e| {
            error!("Failed to parse {} response: {}", endpoint, e);
            CoreError::GraphApi(GraphApiError::InvalidResponse {
                details: format!("Failed to parse {} response: {}", endpoint, e),
            })
        })
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: Endpoint,
        path: &str,
        token: &AccessToken,
        query: &[(&str, String)],
    ) -> Result<T, CoreError> {
        self.retry
            .execute(endpoint.as_str(), || {
                self.send_once(method.clone(), endpoint, path, token, query)
            })
            .await
    }

    async fn record(
        &self,
        endpoint: Endpoint,
        status: Option<StatusCode>,
        start_time: Instant,
        queue_wait: Duration,
        success: bool,
        rate_limited: bool,
    ) {
        self.metrics
            .record_request(RequestMetrics {
                endpoint,
                status_code: status.map(|s| s.as_u16()),
                response_time: start_time.elapsed(),
                queue_wait_time: queue_wait,
                success,
                rate_limited,
            })
            .await;
    }

    pub async fn get_metrics(&self) -> ApiMetrics {
        self.metrics.get_metrics().await
    }

    pub fn get_retry_metrics(&self) -> RetryMetrics {
        self.retry.get_metrics()
    }

    /// Request counters together with retry counters.
    pub async fn client_metrics(&self) -> ClientMetrics {
        ClientMetrics {
            requests: self.get_metrics().await,
            retries: self.get_retry_metrics(),
        }
    }

    pub async fn export_metrics(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.client_metrics().await)
    }

    pub async fn available_rate_tokens(&self) -> u32 {
        self.rate_limiter.available_tokens().await
    }
}

#[async_trait]
impl PageCommentsApi for GraphApiClient {
    async fn list_pages(&self, account_token: &AccessToken) -> Result<Vec<Page>, CoreError> {
        let listing: GraphList<GraphPageData> = self
            .request(Method::GET, Endpoint::Accounts, "me/accounts", account_token, &[])
            .await?;

        let pages: Vec<Page> = listing
            .data
            .into_iter()
            .filter_map(|data| match data.access_token {
                Some(access_token) => Some(Page {
                    id: data.id,
                    name: data.name.unwrap_or_default(),
                    access_token,
                }),
                None => {
                    warn!("Page {} returned without a page token; skipping", data.id);
                    None
                }
            })
            .collect();

        info!("Account manages {} pages", pages.len());
        Ok(pages)
    }

    async fn list_posts(
        &self,
        page_id: &str,
        page_token: &AccessToken,
        limit: Option<u32>,
    ) -> Result<Vec<PostId>, CoreError> {
        let path = format!("{}/posts", page_id);
        let mut query = vec![("fields", "id".to_string())];
        if let Some(limit) = limit.filter(|l| *l > 0) {
            query.push(("limit", limit.to_string()));
        }

        let listing: GraphList<GraphPostData> = self
            .request(Method::GET, Endpoint::Posts, &path, page_token, &query)
            .await?;

        debug!("Page {} returned {} posts", page_id, listing.data.len());
        Ok(listing.data.into_iter().map(|post| post.id).collect())
    }

    async fn list_comments(
        &self,
        post_id: &str,
        page_token: &AccessToken,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Comment>, CoreError> {
        let path = format!("{}/comments", post_id);
        let mut comments = Vec::new();
        let mut after: Option<String> = None;

        for _ in 0..self.max_comment_pages {
            let mut query = vec![
                ("fields", COMMENT_FIELDS.to_string()),
                ("filter", "stream".to_string()),
                ("order", "reverse_chronological".to_string()),
            ];
            if let Some(cursor) = after.take() {
                query.push(("after", cursor));
            }

            let listing: GraphList<GraphCommentData> = self
                .request(Method::GET, Endpoint::Comments, &path, page_token, &query)
                .await?;
            let next = listing.next_cursor();

            let batch = comments_from_listing(listing.data);
            // Newest first: once a page reaches past the cutoff, later pages are older still.
            let reached_cutoff = since
                .map(|cutoff| batch.iter().any(|c| c.created_time < cutoff))
                .unwrap_or(false);
            comments.extend(batch);

            match next {
                Some(cursor) if !reached_cutoff => after = Some(cursor),
                _ => break,
            }
        }

        if after.is_some() {
            warn!(
                "Post {} has more than {} pages of comments; the rest is skipped",
                post_id, self.max_comment_pages
            );
        }

        debug!("Post {} returned {} comments", post_id, comments.len());
        Ok(comments)
    }

    async fn hide_comment(
        &self,
        comment_id: &str,
        page_token: &AccessToken,
    ) -> Result<(), CoreError> {
        let query = [("is_hidden", "true".to_string())];
        let result: GraphMutationResult = self
            .request(
                Method::POST,
                Endpoint::HideComment,
                comment_id,
                page_token,
                &query,
            )
            .await?;

        if !result.success {
            return Err(CoreError::GraphApi(GraphApiError::MutationRefused {
                details: format!("Graph API reported success=false for {}", comment_id),
            }));
        }

        info!("Comment hidden: {}", comment_id);
        Ok(())
    }
}

fn comments_from_listing(data: Vec<GraphCommentData>) -> Vec<Comment> {
    data.into_iter()
        .filter_map(|data| {
            let created_time = data.created_time.as_deref().and_then(parse_graph_timestamp);
            match created_time {
                Some(created_time) => Some(Comment {
                    id: data.id,
                    message: data.message,
                    created_time,
                }),
                None => {
                    warn!(
                        "Comment {} has no usable created_time ({:?}); skipping",
                        data.id, data.created_time
                    );
                    None
                }
            }
        })
        .collect()
}
