use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use super::{EngagementStore, StoreError, StoreResult};
use crate::domain::{
    Comment, CommentCounts, CommentQuery, LikeTarget, NewComment, NewNotification, NewPost,
    Notification, NotificationKey, NotificationKind, Post, PostChanges, PostCounts, PostQuery,
    PostStatus, Tag, TagWithCount, UserSummary,
};

const PG_UNIQUE_VIOLATION: &str = "23505";
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";

/// Substring ILIKE pattern with `\`, `%` and `_` in the needle matched literally
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Translate constraint failures into store errors the engines can branch on
fn map_db_error(err: sqlx::Error) -> StoreError {
    if let Some(db_err) = err.as_database_error() {
        let constraint = db_err.constraint().unwrap_or("unknown").to_string();
        match db_err.code().as_deref() {
            Some(PG_UNIQUE_VIOLATION) => return StoreError::UniqueViolation(constraint),
            Some(PG_FOREIGN_KEY_VIOLATION) => return StoreError::ForeignKeyViolation(constraint),
            _ => {}
        }
    }
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Unavailable(err.to_string())
        }
        other => StoreError::Database(other),
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    content: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct PostTagRow {
    post_id: Uuid,
    id: Uuid,
    name: String,
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    triggered_by: Uuid,
    kind: String,
    post_id: Option<Uuid>,
    comment_id: Option<Uuid>,
    message: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = StoreError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let kind = row
            .kind
            .parse::<NotificationKind>()
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(e.into())))?;
        Ok(Notification {
            id: row.id,
            user_id: row.user_id,
            triggered_by: row.triggered_by,
            kind,
            post_id: row.post_id,
            comment_id: row.comment_id,
            message: row.message,
            is_read: row.is_read,
            created_at: row.created_at,
        })
    }
}

const POST_COLUMNS: &str = "id, user_id, title, content, status, created_at, updated_at";
const COMMENT_COLUMNS: &str = "id, user_id, post_id, parent_id, content, created_at, updated_at";
const NOTIFICATION_COLUMNS: &str =
    "id, user_id, triggered_by, kind, post_id, comment_id, message, is_read, created_at";

/// PostgreSQL-backed `EngagementStore`
#[derive(Clone)]
pub struct PgEngagementStore {
    pool: PgPool,
}

impl PgEngagementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach tags and image URLs to bare post rows, preserving row order
    async fn hydrate_posts(&self, rows: Vec<PostRow>) -> StoreResult<Vec<Post>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

        let tag_rows = sqlx::query_as::<_, PostTagRow>(
            r#"
            SELECT pt.post_id, t.id, t.name
            FROM post_tags pt
            JOIN tags t ON t.id = pt.tag_id
            WHERE pt.post_id = ANY($1)
            ORDER BY t.name
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let image_rows: Vec<(Uuid, String)> = sqlx::query_as(
            r#"
            SELECT post_id, url
            FROM post_images
            WHERE post_id = ANY($1)
            ORDER BY position
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let mut tags: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        for row in tag_rows {
            tags.entry(row.post_id).or_default().push(Tag {
                id: row.id,
                name: row.name,
            });
        }
        let mut images: HashMap<Uuid, Vec<String>> = HashMap::new();
        for (post_id, url) in image_rows {
            images.entry(post_id).or_default().push(url);
        }

        rows.into_iter()
            .map(|row| -> StoreResult<Post> {
                let status = row
                    .status
                    .parse::<PostStatus>()
                    .map_err(|e| StoreError::Database(sqlx::Error::Decode(e.into())))?;
                Ok(Post {
                    id: row.id,
                    user_id: row.user_id,
                    title: row.title,
                    content: row.content,
                    status,
                    created_at: row.created_at,
                    updated_at: row.updated_at,
                    tags: tags.remove(&row.id).unwrap_or_default(),
                    image_urls: images.remove(&row.id).unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Replace a post's tag set, creating lower-cased tags on first use
    async fn replace_tags(
        tx: &mut Transaction<'_, Postgres>,
        post_id: Uuid,
        names: &[String],
    ) -> StoreResult<()> {
        sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut **tx)
            .await
            .map_err(map_db_error)?;

        let mut seen: Vec<String> = Vec::new();
        for name in names {
            let name = name.trim().to_lowercase();
            if name.is_empty() || seen.contains(&name) {
                continue;
            }

            let tag_id: Uuid = sqlx::query_scalar(
                r#"
                INSERT INTO tags (name)
                VALUES ($1)
                ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                RETURNING id
                "#,
            )
            .bind(&name)
            .fetch_one(&mut **tx)
            .await
            .map_err(map_db_error)?;

            sqlx::query("INSERT INTO post_tags (post_id, tag_id) VALUES ($1, $2)")
                .bind(post_id)
                .bind(tag_id)
                .execute(&mut **tx)
                .await
                .map_err(map_db_error)?;

            seen.push(name);
        }
        Ok(())
    }
}

#[async_trait]
impl EngagementStore for PgEngagementStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<UserSummary>> {
        sqlx::query_as::<_, UserSummary>(
            "SELECT id, username, first_name, last_name, avatar_url FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn find_users(&self, user_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, UserSummary>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let users = sqlx::query_as::<_, UserSummary>(
            "SELECT id, username, first_name, last_name, avatar_url FROM users WHERE id = ANY($1)",
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }

    async fn find_post(&self, post_id: Uuid) -> StoreResult<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {} FROM posts WHERE id = $1",
            POST_COLUMNS
        ))
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        match row {
            Some(row) => Ok(self.hydrate_posts(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn insert_post(&self, new_post: NewPost) -> StoreResult<Post> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let row = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            INSERT INTO posts (user_id, title, content, status)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            POST_COLUMNS
        ))
        .bind(new_post.user_id)
        .bind(&new_post.title)
        .bind(&new_post.content)
        .bind(new_post.status.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        Self::replace_tags(&mut tx, row.id, &new_post.tags).await?;
        tx.commit().await.map_err(map_db_error)?;

        let post_id = row.id;
        self.find_post(post_id)
            .await?
            .ok_or_else(|| StoreError::Unavailable(format!("post {} vanished after insert", post_id)))
    }

    async fn update_post(&self, post_id: Uuid, changes: PostChanges) -> StoreResult<Option<Post>> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let updated = sqlx::query(
            r#"
            UPDATE posts
            SET title = COALESCE($2, title),
                content = COALESCE($3, content),
                status = COALESCE($4, status),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(post_id)
        .bind(changes.title.as_deref())
        .bind(changes.content.as_deref())
        .bind(changes.status.map(|s| s.as_str()))
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        if let Some(tags) = changes.tags.as_ref() {
            Self::replace_tags(&mut tx, post_id, tags).await?;
        }
        tx.commit().await.map_err(map_db_error)?;

        self.find_post(post_id).await
    }

    async fn delete_post(&self, post_id: Uuid) -> StoreResult<u64> {
        // Comments, likes, tags and notifications cascade
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected())
    }

    async fn list_posts(&self, query: &PostQuery) -> StoreResult<(Vec<Post>, i64)> {
        fn push_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, query: &'a PostQuery) {
            qb.push(" WHERE TRUE");
            if let Some(status) = query.status {
                qb.push(" AND p.status = ").push_bind(status.as_str());
            }
            if let Some(user_id) = query.user_id {
                qb.push(" AND p.user_id = ").push_bind(user_id);
            }
            if let Some(search) = query.search.as_ref() {
                let pattern = contains_pattern(search);
                qb.push(" AND (p.title ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" ESCAPE '\\' OR p.content ILIKE ")
                    .push_bind(pattern)
                    .push(" ESCAPE '\\')");
            }
            if let Some(tag) = query.tag.as_ref() {
                qb.push(
                    " AND EXISTS (SELECT 1 FROM post_tags pt JOIN tags t ON t.id = pt.tag_id \
                     WHERE pt.post_id = p.id AND t.name = LOWER(",
                )
                .push_bind(tag.as_str())
                .push("))");
            }
        }

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts p");
        push_filters(&mut count_qb, query);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT p.id, p.user_id, p.title, p.content, p.status, p.created_at, p.updated_at FROM posts p",
        );
        push_filters(&mut qb, query);
        qb.push(format!(
            " ORDER BY p.{} {}, p.id",
            query.sort.as_sql(),
            query.order.as_sql()
        ));
        qb.push(" LIMIT ")
            .push_bind(query.limit)
            .push(" OFFSET ")
            .push_bind(query.offset);

        let rows: Vec<PostRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok((self.hydrate_posts(rows).await?, total))
    }

    async fn post_counts(&self, post_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, PostCounts>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<(Uuid, i64, i64)> = sqlx::query_as(
            r#"
            SELECT p.id,
                   (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id),
                   (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id)
            FROM posts p
            WHERE p.id = ANY($1)
            "#,
        )
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows
            .into_iter()
            .map(|(id, comments, likes)| (id, PostCounts { comments, likes }))
            .collect())
    }

    async fn list_tags(&self) -> StoreResult<Vec<TagWithCount>> {
        sqlx::query_as::<_, TagWithCount>(
            r#"
            SELECT t.id, t.name, COUNT(pt.post_id) AS post_count
            FROM tags t
            LEFT JOIN post_tags pt ON pt.tag_id = t.id
            GROUP BY t.id, t.name
            ORDER BY post_count DESC, t.name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn like_exists(&self, user_id: Uuid, target: LikeTarget) -> StoreResult<bool> {
        let sql = match target {
            LikeTarget::Post(_) => {
                "SELECT EXISTS(SELECT 1 FROM post_likes WHERE user_id = $1 AND post_id = $2)"
            }
            LikeTarget::Comment(_) => {
                "SELECT EXISTS(SELECT 1 FROM comment_likes WHERE user_id = $1 AND comment_id = $2)"
            }
        };
        sqlx::query_scalar(sql)
            .bind(user_id)
            .bind(target.id())
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn insert_like(&self, user_id: Uuid, target: LikeTarget) -> StoreResult<()> {
        // No ON CONFLICT: the toggle engine needs to see the race
        let sql = match target {
            LikeTarget::Post(_) => "INSERT INTO post_likes (user_id, post_id) VALUES ($1, $2)",
            LikeTarget::Comment(_) => {
                "INSERT INTO comment_likes (user_id, comment_id) VALUES ($1, $2)"
            }
        };
        sqlx::query(sql)
            .bind(user_id)
            .bind(target.id())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }

    async fn delete_like(&self, user_id: Uuid, target: LikeTarget) -> StoreResult<u64> {
        let sql = match target {
            LikeTarget::Post(_) => "DELETE FROM post_likes WHERE user_id = $1 AND post_id = $2",
            LikeTarget::Comment(_) => {
                "DELETE FROM comment_likes WHERE user_id = $1 AND comment_id = $2"
            }
        };
        let result = sqlx::query(sql)
            .bind(user_id)
            .bind(target.id())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected())
    }

    async fn find_comment(&self, comment_id: Uuid) -> StoreResult<Option<Comment>> {
        sqlx::query_as::<_, Comment>(&format!(
            "SELECT {} FROM comments WHERE id = $1",
            COMMENT_COLUMNS
        ))
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn insert_comment(&self, new_comment: NewComment) -> StoreResult<Comment> {
        sqlx::query_as::<_, Comment>(&format!(
            r#"
            INSERT INTO comments (user_id, post_id, parent_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            COMMENT_COLUMNS
        ))
        .bind(new_comment.user_id)
        .bind(new_comment.post_id)
        .bind(new_comment.parent_id)
        .bind(&new_comment.content)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update_comment_content(
        &self,
        comment_id: Uuid,
        content: &str,
    ) -> StoreResult<Option<Comment>> {
        sqlx::query_as::<_, Comment>(&format!(
            r#"
            UPDATE comments
            SET content = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COMMENT_COLUMNS
        ))
        .bind(comment_id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete_comment(&self, comment_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected())
    }

    async fn delete_replies(&self, parent_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM comments WHERE parent_id = $1")
            .bind(parent_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected())
    }

    async fn list_top_level_comments(&self, post_id: Uuid) -> StoreResult<Vec<Comment>> {
        sqlx::query_as::<_, Comment>(&format!(
            r#"
            SELECT {}
            FROM comments
            WHERE post_id = $1 AND parent_id IS NULL
            ORDER BY created_at ASC, id
            "#,
            COMMENT_COLUMNS
        ))
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn list_replies(&self, parent_ids: &[Uuid]) -> StoreResult<Vec<Comment>> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, Comment>(&format!(
            r#"
            SELECT {}
            FROM comments
            WHERE parent_id = ANY($1)
            ORDER BY created_at ASC, id
            "#,
            COMMENT_COLUMNS
        ))
        .bind(parent_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn list_user_comments(&self, user_id: Uuid) -> StoreResult<Vec<Comment>> {
        sqlx::query_as::<_, Comment>(&format!(
            r#"
            SELECT {}
            FROM comments
            WHERE user_id = $1
            ORDER BY created_at DESC, id
            "#,
            COMMENT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn query_comments(&self, query: &CommentQuery) -> StoreResult<(Vec<Comment>, i64)> {
        fn push_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, query: &'a CommentQuery) {
            qb.push(" WHERE TRUE");
            if let Some(post_id) = query.post_id {
                qb.push(" AND post_id = ")
                    .push_bind(post_id)
                    .push(" AND parent_id IS NULL");
            }
            if let Some(user_id) = query.user_id {
                qb.push(" AND user_id = ").push_bind(user_id);
            }
        }

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM comments");
        push_filters(&mut count_qb, query);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM comments", COMMENT_COLUMNS));
        push_filters(&mut qb, query);
        qb.push(" ORDER BY created_at ASC, id LIMIT ")
            .push_bind(query.limit)
            .push(" OFFSET ")
            .push_bind(query.offset);

        let comments: Vec<Comment> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok((comments, total))
    }

    async fn comment_counts(
        &self,
        comment_ids: &[Uuid],
    ) -> StoreResult<HashMap<Uuid, CommentCounts>> {
        if comment_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<(Uuid, i64, i64)> = sqlx::query_as(
            r#"
            SELECT c.id,
                   (SELECT COUNT(*) FROM comment_likes l WHERE l.comment_id = c.id),
                   (SELECT COUNT(*) FROM comments r WHERE r.parent_id = c.id)
            FROM comments c
            WHERE c.id = ANY($1)
            "#,
        )
        .bind(comment_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows
            .into_iter()
            .map(|(id, likes, replies)| (id, CommentCounts { likes, replies }))
            .collect())
    }

    async fn insert_notification(
        &self,
        new_notification: NewNotification,
    ) -> StoreResult<Notification> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            INSERT INTO notifications (user_id, triggered_by, kind, post_id, comment_id, message)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        ))
        .bind(new_notification.user_id)
        .bind(new_notification.triggered_by)
        .bind(new_notification.kind.as_str())
        .bind(new_notification.post_id)
        .bind(new_notification.comment_id)
        .bind(&new_notification.message)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        row.try_into()
    }

    async fn find_recent_notification(
        &self,
        key: &NotificationKey,
        since: DateTime<Utc>,
    ) -> StoreResult<Option<Notification>> {
        let target_column = match key.target {
            LikeTarget::Post(_) => "post_id",
            LikeTarget::Comment(_) => "comment_id",
        };
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            SELECT {}
            FROM notifications
            WHERE user_id = $1 AND triggered_by = $2 AND kind = $3
              AND {} = $4 AND created_at >= $5
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            NOTIFICATION_COLUMNS, target_column
        ))
        .bind(key.recipient_id)
        .bind(key.triggered_by)
        .bind(key.kind.as_str())
        .bind(key.target.id())
        .bind(since)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        row.map(Notification::try_from).transpose()
    }

    async fn delete_notifications(&self, key: &NotificationKey) -> StoreResult<u64> {
        let target_column = match key.target {
            LikeTarget::Post(_) => "post_id",
            LikeTarget::Comment(_) => "comment_id",
        };
        let result = sqlx::query(&format!(
            r#"
            DELETE FROM notifications
            WHERE user_id = $1 AND triggered_by = $2 AND kind = $3 AND {} = $4
            "#,
            target_column
        ))
        .bind(key.recipient_id)
        .bind(key.triggered_by)
        .bind(key.kind.as_str())
        .bind(key.target.id())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(result.rows_affected())
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            SELECT {}
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
            NOTIFICATION_COLUMNS
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.into_iter().map(Notification::try_from).collect()
    }

    async fn count_notifications(&self, user_id: Uuid, unread_only: bool) -> StoreResult<i64> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM notifications
            WHERE user_id = $1 AND ($2 = FALSE OR is_read = FALSE)
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(result.rows_affected())
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(result.rows_affected())
    }

    async fn delete_notification(&self, notification_id: Uuid, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(notification_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected())
    }
}
