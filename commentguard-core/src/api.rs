use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::types::{AccessToken, Comment, Page, PostId};

/// The remote page-comment API surface the moderation pipeline consumes.
///
/// Every page-level call takes the page's own token explicitly; there is no
/// ambient "current page" state.
#[async_trait]
pub trait PageCommentsApi: Send + Sync {
    /// Pages managed by the account, each with its page-scoped token.
    async fn list_pages(&self, account_token: &AccessToken) -> Result<Vec<Page>, CoreError>;

    /// Most recent post ids of a page. `None` uses the API's default page size.
    async fn list_posts(
        &self,
        page_id: &str,
        page_token: &AccessToken,
        limit: Option<u32>,
    ) -> Result<Vec<PostId>, CoreError>;

    /// Comments of a post, replies included, newest first. `since` lets the
    /// implementation stop paging once older comments are reached; callers
    /// still apply their own window.
    async fn list_comments(
        &self,
        post_id: &str,
        page_token: &AccessToken,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Comment>, CoreError>;

    /// Marks a comment hidden. Hiding an already hidden comment succeeds.
    async fn hide_comment(&self, comment_id: &str, page_token: &AccessToken)
        -> Result<(), CoreError>;
}
