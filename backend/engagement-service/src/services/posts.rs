use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

use super::ranking;
use crate::domain::{
    NewPost, Pagination, Post, PostChanges, PostQuery, PostSortColumn, PostStatus,
    PostWithCounts, SortOrder, TagWithCount,
};
use crate::error::{AppError, Result};
use crate::store::SharedStore;

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;
const MAX_TITLE_CHARS: usize = 200;

/// Orderings accepted by the post listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PostSortBy {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
    /// Ranked by popularity score within the fetched page
    Popularity,
}

impl FromStr for PostSortBy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "createdAt" => Ok(PostSortBy::CreatedAt),
            "updatedAt" => Ok(PostSortBy::UpdatedAt),
            "title" => Ok(PostSortBy::Title),
            "popularity" => Ok(PostSortBy::Popularity),
            other => Err(format!("unsupported sortBy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PostListRequest {
    /// None lists published posts
    pub status: Option<PostStatus>,
    pub search: Option<String>,
    pub tag: Option<String>,
    pub user_id: Option<Uuid>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: PostSortBy,
    pub sort_order: SortOrder,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostPage {
    pub posts: Vec<PostWithCounts>,
    pub pagination: Pagination,
}

/// Post CRUD and the listing read path that feeds the ranking engine
pub struct PostService {
    store: SharedStore,
}

impl PostService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn create_post(
        &self,
        actor_id: Uuid,
        title: &str,
        content: &str,
        status: PostStatus,
        tags: Vec<String>,
    ) -> Result<PostWithCounts> {
        let title = validate_title(title)?;
        let content = validate_content(content)?;

        let post = self
            .store
            .insert_post(NewPost {
                user_id: actor_id,
                title,
                content,
                status,
                tags,
            })
            .await?;

        info!(post_id = %post.id, actor_id = %actor_id, status = post.status.as_str(), "post created");
        self.single(post).await
    }

    pub async fn get_post(&self, post_id: Uuid) -> Result<PostWithCounts> {
        let post = self
            .store
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))?;
        self.single(post).await
    }

    /// Owner-only partial update; `changes.tags` replaces the tag set
    pub async fn update_post(
        &self,
        actor_id: Uuid,
        post_id: Uuid,
        mut changes: PostChanges,
    ) -> Result<PostWithCounts> {
        self.owned_post(actor_id, post_id, "update").await?;

        if let Some(title) = changes.title.as_deref() {
            changes.title = Some(validate_title(title)?);
        }
        if let Some(content) = changes.content.as_deref() {
            changes.content = Some(validate_content(content)?);
        }

        let post = self
            .store
            .update_post(post_id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))?;
        self.single(post).await
    }

    /// Owner-only; comments, likes and notifications on the post go with it
    pub async fn delete_post(&self, actor_id: Uuid, post_id: Uuid) -> Result<()> {
        self.owned_post(actor_id, post_id, "delete").await?;
        self.store.delete_post(post_id).await?;
        info!(post_id = %post_id, actor_id = %actor_id, "post deleted");
        Ok(())
    }

    pub async fn list_posts(&self, request: PostListRequest) -> Result<PostPage> {
        let status = Some(request.status.unwrap_or(PostStatus::Published));
        self.list(status, request).await
    }

    /// All of a user's posts unless a status is given
    pub async fn list_posts_by_user(
        &self,
        user_id: Uuid,
        status: Option<PostStatus>,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<PostPage> {
        let request = PostListRequest {
            user_id: Some(user_id),
            page,
            limit,
            ..Default::default()
        };
        self.list(status, request).await
    }

    pub async fn list_tags(&self) -> Result<Vec<TagWithCount>> {
        Ok(self.store.list_tags().await?)
    }

    async fn list(&self, status: Option<PostStatus>, request: PostListRequest) -> Result<PostPage> {
        let page = request.page.unwrap_or(1).max(1);
        let limit = request
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);

        // Popularity ranks the newest-first window
        let (sort, order) = match request.sort_by {
            PostSortBy::CreatedAt => (PostSortColumn::CreatedAt, request.sort_order),
            PostSortBy::UpdatedAt => (PostSortColumn::UpdatedAt, request.sort_order),
            PostSortBy::Title => (PostSortColumn::Title, request.sort_order),
            PostSortBy::Popularity => (PostSortColumn::CreatedAt, SortOrder::Desc),
        };

        let query = PostQuery {
            status,
            search: request.search.filter(|s| !s.trim().is_empty()),
            tag: request.tag.filter(|t| !t.trim().is_empty()),
            user_id: request.user_id,
            sort,
            order,
            limit,
            offset: Pagination::offset(page, limit),
        };
        let (posts, total) = self.store.list_posts(&query).await?;

        let mut posts = self.with_counts(posts).await?;
        if request.sort_by == PostSortBy::Popularity {
            posts = ranking::rank(posts);
        }

        Ok(PostPage {
            posts,
            pagination: Pagination::new(page, limit, total),
        })
    }

    async fn owned_post(&self, actor_id: Uuid, post_id: Uuid, action: &str) -> Result<Post> {
        let post = self
            .store
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))?;
        if post.user_id != actor_id {
            return Err(AppError::Forbidden(format!(
                "You can only {} your own posts",
                action
            )));
        }
        Ok(post)
    }

    async fn single(&self, post: Post) -> Result<PostWithCounts> {
        self.with_counts(vec![post])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal("post view assembly returned nothing".into()))
    }

    async fn with_counts(&self, posts: Vec<Post>) -> Result<Vec<PostWithCounts>> {
        let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let counts = self.store.post_counts(&ids).await?;

        let mut author_ids: Vec<Uuid> = posts.iter().map(|p| p.user_id).collect();
        author_ids.sort();
        author_ids.dedup();
        let authors = self.store.find_users(&author_ids).await?;

        Ok(posts
            .into_iter()
            .map(|post| PostWithCounts {
                counts: counts.get(&post.id).copied().unwrap_or_default(),
                author: authors.get(&post.user_id).cloned(),
                popularity_score: None,
                post,
            })
            .collect())
    }
}

fn validate_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Post title must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::Validation(format!(
            "Post title must be at most {} characters",
            MAX_TITLE_CHARS
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_content(content: &str) -> Result<String> {
    if content.trim().is_empty() {
        return Err(AppError::Validation("Post content must not be empty".into()));
    }
    Ok(content.to_string())
}
