//! Popularity ranking over an already-fetched window of posts.
//!
//! score = likes * 3 + comments * 2 + max(0, 30 - age_days) * 0.5
//!
//! `age_days` is whole days since creation, clamped at zero for clocks that
//! run behind the store. Ordering is score descending, then newest first.
use chrono::{DateTime, Utc};

use crate::domain::{PostCounts, PostWithCounts};

const LIKE_WEIGHT: f64 = 3.0;
const COMMENT_WEIGHT: f64 = 2.0;
const RECENCY_WINDOW_DAYS: i64 = 30;
const RECENCY_WEIGHT: f64 = 0.5;

pub fn popularity_score(counts: PostCounts, created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_days = (now - created_at).num_days().max(0);
    let recency_bonus = (RECENCY_WINDOW_DAYS - age_days).max(0) as f64 * RECENCY_WEIGHT;
    counts.likes as f64 * LIKE_WEIGHT + counts.comments as f64 * COMMENT_WEIGHT + recency_bonus
}

/// Rank posts as of now, attaching `popularity_score` to each
pub fn rank(posts: Vec<PostWithCounts>) -> Vec<PostWithCounts> {
    rank_at(posts, Utc::now())
}

pub fn rank_at(mut posts: Vec<PostWithCounts>, now: DateTime<Utc>) -> Vec<PostWithCounts> {
    for entry in posts.iter_mut() {
        entry.popularity_score = Some(popularity_score(entry.counts, entry.post.created_at, now));
    }

    // sort_by is stable: equal score and timestamp keep their fetched order
    posts.sort_by(|a, b| {
        let score_a = a.popularity_score.unwrap_or_default();
        let score_b = b.popularity_score.unwrap_or_default();
        score_b
            .total_cmp(&score_a)
            .then_with(|| b.post.created_at.cmp(&a.post.created_at))
    });
    posts
}
