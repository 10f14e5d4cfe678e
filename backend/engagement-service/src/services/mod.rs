//! Engagement engines.
//!
//! Mutating engines (toggle, threads) publish `EngagementEvent`s into an
//! `EngagementEventSink` after their own writes succeed. The notification
//! engine is the production sink.
use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::EngagementEvent;

pub mod notifications;
pub mod posts;
pub mod ranking;
pub mod threads;
pub mod toggle;

pub use notifications::{
    excerpt, EmitOutcome, NotificationEngine, NotificationPage, NotificationSettings,
};
pub use posts::{PostListRequest, PostPage, PostService, PostSortBy};
pub use ranking::{popularity_score, rank, rank_at};
pub use threads::{CommentPage, ThreadManager};
pub use toggle::{ToggleEngine, ToggleOutcome};

/// Receives domain events after the mutation that produced them committed.
///
/// Implementations must not fail the caller: errors are handled inside.
#[async_trait]
pub trait EngagementEventSink: Send + Sync {
    async fn publish(&self, event: EngagementEvent);
}

pub type SharedEventSink = Arc<dyn EngagementEventSink>;
