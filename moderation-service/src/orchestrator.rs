use chrono::{DateTime, Utc};
use commentguard_core::{
    Comment, CycleSummary, LookbackWindow, ModerationConfig, ModerationError, Page,
    PageCommentsApi, PolicyEvaluator,
};
use futures::stream::{self, StreamExt};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::resolver::resolve_pages;

/// Everything one cycle needs, built fresh per `run_cycle`.
#[derive(Debug, Clone)]
pub struct CycleContext {
    pub cycle_id: Uuid,
    pub window: LookbackWindow,
    pub post_limit: Option<u32>,
}

impl CycleContext {
    pub fn new(now: DateTime<Utc>, config: &ModerationConfig) -> Self {
        Self {
            cycle_id: Uuid::new_v4(),
            window: LookbackWindow::new(now, config.lookback_minutes),
            post_limit: config.post_limit,
        }
    }
}

/// Runs the moderation pipeline: pages, posts, comments, window, policy, hide.
pub struct Orchestrator {
    api: Arc<dyn PageCommentsApi>,
    policy: Arc<dyn PolicyEvaluator>,
    config: Arc<ModerationConfig>,
}

impl Orchestrator {
    pub fn new(
        api: Arc<dyn PageCommentsApi>,
        policy: Arc<dyn PolicyEvaluator>,
        config: Arc<ModerationConfig>,
    ) -> Self {
        Self {
            api,
            policy,
            config,
        }
    }

    pub fn config(&self) -> &ModerationConfig {
        &self.config
    }

    pub async fn run_cycle(&self) -> Result<CycleSummary, ModerationError> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Runs one cycle with `now` as the window's reference point.
    ///
    /// Only page resolution failures abort the cycle; every later failure is
    /// recorded in the summary and its siblings carry on.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<CycleSummary, ModerationError> {
        let ctx = CycleContext::new(now, &self.config);
        let span = info_span!("cycle", cycle_id = %ctx.cycle_id);

        self.run_in_context(&ctx, now).instrument(span).await
    }

    async fn run_in_context(
        &self,
        ctx: &CycleContext,
        now: DateTime<Utc>,
    ) -> Result<CycleSummary, ModerationError> {
        info!(
            "Starting moderation cycle (window from {} to {})",
            ctx.window.cutoff(),
            ctx.window.reference_now()
        );

        let pages = resolve_pages(
            self.api.as_ref(),
            &self.config.account_token,
            self.config.page_name.as_deref(),
        )
        .await?;

        let mut summary = CycleSummary::new(ctx.cycle_id, now);
        for page in &pages {
            summary.merge(self.process_page(ctx, page).await);
        }

        info!(
            pages = summary.pages_processed,
            posts = summary.posts_scanned,
            evaluated = summary.comments_evaluated,
            hidden = summary.comments_hidden,
            errors = summary.errors.len(),
            "Moderation cycle finished"
        );
        Ok(summary)
    }

    async fn process_page(&self, ctx: &CycleContext, page: &Page) -> CycleSummary {
        let mut summary = CycleSummary::new(ctx.cycle_id, ctx.window.reference_now());

        let posts = match self
            .api
            .list_posts(&page.id, &page.access_token, ctx.post_limit)
            .await
        {
            Ok(posts) => posts,
            Err(e) => {
                let error = ModerationError::from_fetch(format!("posts of page {}", page.id), &e);
                warn!("Skipping page '{}': {}", page.name, error);
                summary.record_error(error);
                return summary;
            }
        };

        summary.pages_processed = 1;
        if posts.is_empty() {
            info!("No posts to analyze on page '{}'", page.name);
            return summary;
        }

        debug!("Scanning {} posts on page '{}'", posts.len(), page.name);
        // Set by the first call that finds the page token rejected. Posts not
        // started yet are skipped and the page gets a single Auth error.
        let token_rejected = OnceLock::new();
        let partials: Vec<CycleSummary> = stream::iter(posts)
            .map(|post_id| self.process_post(ctx, page, post_id, &token_rejected))
            .buffer_unordered(self.config.max_concurrent_posts.max(1))
            .collect()
            .await;

        for partial in partials {
            summary.merge(partial);
        }
        if let Some(reason) = token_rejected.into_inner() {
            warn!("Page '{}' token rejected; remaining posts skipped", page.name);
            summary.record_error(ModerationError::Auth {
                scope: format!("page {}", page.id),
                reason,
            });
        }
        summary
    }

    async fn process_post(
        &self,
        ctx: &CycleContext,
        page: &Page,
        post_id: String,
        token_rejected: &OnceLock<String>,
    ) -> CycleSummary {
        let mut summary = CycleSummary::new(ctx.cycle_id, ctx.window.reference_now());
        if token_rejected.get().is_some() {
            debug!("Skipping post {}: page token rejected", post_id);
            return summary;
        }

        let comments = match self
            .api
            .list_comments(&post_id, &page.access_token, Some(ctx.window.cutoff()))
            .await
        {
            Ok(comments) => comments,
            Err(e) if e.is_auth_failure() => {
                let _ = token_rejected.set(e.to_string());
                return summary;
            }
            Err(e) => {
                let error = ModerationError::from_fetch(format!("comments of post {}", post_id), &e);
                warn!("Skipping post {}: {}", post_id, error);
                summary.record_error(error);
                return summary;
            }
        };
        summary.posts_scanned = 1;

        let recent: Vec<&Comment> = comments
            .iter()
            .filter(|comment| ctx.window.contains(&comment.created_time))
            .collect();
        if recent.is_empty() {
            debug!("No new comments to analyze on post {}", post_id);
            return summary;
        }

        for comment in recent {
            if token_rejected.get().is_some() {
                break;
            }
            summary.comments_evaluated += 1;
            if !self.policy.should_hide(comment.message.as_deref()) {
                continue;
            }

            info!("Hiding comment {} on post {}", comment.id, post_id);
            match self.api.hide_comment(&comment.id, &page.access_token).await {
                Ok(()) => summary.comments_hidden += 1,
                Err(e) if e.is_auth_failure() => {
                    let _ = token_rejected.set(e.to_string());
                    break;
                }
                Err(e) => {
                    let error = ModerationError::from_action(&comment.id, &e);
                    warn!("{}", error);
                    summary.record_error(error);
                }
            }
        }

        summary
    }
}
