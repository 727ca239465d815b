#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use commentguard_core::{
    AccessToken, Comment, CoreError, Denylist, GraphApiError, ModerationConfig, Page,
    PageCommentsApi, PostId, SubstringPolicy,
};
use moderation_service::Orchestrator;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

pub fn minutes_ago(minutes: i64) -> DateTime<Utc> {
    now() - Duration::minutes(minutes)
}

pub fn comment(id: &str, message: Option<&str>, created_time: DateTime<Utc>) -> Comment {
    Comment {
        id: id.to_string(),
        message: message.map(str::to_string),
        created_time,
    }
}

pub fn page(id: &str, name: &str) -> Page {
    Page {
        id: id.to_string(),
        name: name.to_string(),
        access_token: AccessToken::new(format!("token-{}", id)),
    }
}

pub fn config(page_name: Option<&str>, lookback_minutes: u32, denylist: &str) -> ModerationConfig {
    ModerationConfig {
        account_token: AccessToken::new("user-token"),
        page_name: page_name.map(str::to_string),
        lookback_minutes,
        post_limit: None,
        denylist: Denylist::parse(denylist),
        graph_api_base: "https://graph.example.test".to_string(),
        request_timeout_secs: 5,
        max_concurrent_posts: 2,
    }
}

pub fn orchestrator(api: Arc<FakeGraph>, config: ModerationConfig) -> Orchestrator {
    let policy = Arc::new(SubstringPolicy::new(config.denylist.clone()));
    Orchestrator::new(api, policy, Arc::new(config))
}

/// In-memory Graph API. Records which token every call carried.
#[derive(Default)]
pub struct FakeGraph {
    pub pages: Vec<Page>,
    pub posts: HashMap<String, Vec<PostId>>,
    pub comments: HashMap<PostId, Vec<Comment>>,
    pub reject_account: bool,
    pub failing_pages: HashSet<String>,
    pub failing_posts: HashSet<PostId>,
    pub failing_hides: HashSet<String>,
    /// Page tokens rejected when listing comments.
    pub revoked_tokens: HashSet<String>,
    /// Page tokens rejected when hiding.
    pub revoked_hide_tokens: HashSet<String>,
    pub hide_delay: Option<StdDuration>,
    pub post_limits: Mutex<Vec<Option<u32>>>,
    /// (post or page id, token) for every list call.
    pub list_calls: Mutex<Vec<(String, String)>>,
    /// (comment id, token) for every successful hide.
    pub hidden: Mutex<Vec<(String, String)>>,
    /// Every hide attempt, failed ones included.
    pub hide_calls: Mutex<Vec<String>>,
}

impl FakeGraph {
    pub fn with_pages(pages: Vec<Page>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    pub fn with_posts(mut self, page_id: &str, posts: &[&str]) -> Self {
        self.posts.insert(
            page_id.to_string(),
            posts.iter().map(|p| p.to_string()).collect(),
        );
        self
    }

    pub fn with_comments(mut self, post_id: &str, comments: Vec<Comment>) -> Self {
        self.comments.insert(post_id.to_string(), comments);
        self
    }

    /// Comment listings made with `token`. Post ids carry an underscore.
    pub fn comment_calls_with(&self, token: &str) -> usize {
        self.list_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, used)| id.contains('_') && used == token)
            .count()
    }

    pub fn hidden_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .hidden
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl PageCommentsApi for FakeGraph {
    async fn list_pages(&self, account_token: &AccessToken) -> Result<Vec<Page>, CoreError> {
        if self.reject_account || account_token.secret() != "user-token" {
            return Err(CoreError::GraphApi(GraphApiError::InvalidToken));
        }
        Ok(self.pages.clone())
    }

    async fn list_posts(
        &self,
        page_id: &str,
        page_token: &AccessToken,
        limit: Option<u32>,
    ) -> Result<Vec<PostId>, CoreError> {
        self.list_calls
            .lock()
            .unwrap()
            .push((page_id.to_string(), page_token.secret().to_string()));
        self.post_limits.lock().unwrap().push(limit);

        if self.failing_pages.contains(page_id) {
            return Err(CoreError::GraphApi(GraphApiError::ServerError {
                status_code: 500,
            }));
        }
        Ok(self.posts.get(page_id).cloned().unwrap_or_default())
    }

    async fn list_comments(
        &self,
        post_id: &str,
        page_token: &AccessToken,
        _since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Comment>, CoreError> {
        self.list_calls
            .lock()
            .unwrap()
            .push((post_id.to_string(), page_token.secret().to_string()));

        if self.revoked_tokens.contains(page_token.secret()) {
            return Err(CoreError::GraphApi(GraphApiError::InvalidToken));
        }
        if self.failing_posts.contains(post_id) {
            return Err(CoreError::GraphApi(GraphApiError::RequestTimeout));
        }
        Ok(self.comments.get(post_id).cloned().unwrap_or_default())
    }

    async fn hide_comment(
        &self,
        comment_id: &str,
        page_token: &AccessToken,
    ) -> Result<(), CoreError> {
        self.hide_calls.lock().unwrap().push(comment_id.to_string());
        if let Some(delay) = self.hide_delay {
            tokio::time::sleep(delay).await;
        }

        if self.revoked_hide_tokens.contains(page_token.secret()) {
            return Err(CoreError::GraphApi(GraphApiError::InvalidToken));
        }
        if self.failing_hides.contains(comment_id) {
            return Err(CoreError::GraphApi(GraphApiError::Rejected {
                code: 1,
                message: "cannot hide".to_string(),
            }));
        }
        // Already hidden comments succeed again, like the real API.
        self.hidden
            .lock()
            .unwrap()
            .push((comment_id.to_string(), page_token.secret().to_string()));
        Ok(())
    }
}
