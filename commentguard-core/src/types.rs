use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::ModerationError;

/// An access token. Never printed: `Debug` redacts it.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// A managed page together with its own page-scoped token.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub id: String,
    pub name: String,
    pub access_token: AccessToken,
}

pub type PostId = String;

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    pub message: Option<String>,
    pub created_time: DateTime<Utc>,
}

/// Outcome of one orchestration cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleSummary {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub pages_processed: usize,
    pub posts_scanned: usize,
    pub comments_evaluated: usize,
    pub comments_hidden: usize,
    pub errors: Vec<ModerationError>,
}

impl CycleSummary {
    pub fn new(cycle_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            cycle_id,
            started_at,
            pages_processed: 0,
            posts_scanned: 0,
            comments_evaluated: 0,
            comments_hidden: 0,
            errors: Vec::new(),
        }
    }

    /// Folds a partial result (one post or one page) into this summary.
    pub fn merge(&mut self, other: CycleSummary) {
        self.pages_processed += other.pages_processed;
        self.posts_scanned += other.posts_scanned;
        self.comments_evaluated += other.comments_evaluated;
        self.comments_hidden += other.comments_hidden;
        self.errors.extend(other.errors);
    }

    pub fn record_error(&mut self, error: ModerationError) {
        self.errors.push(error);
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
