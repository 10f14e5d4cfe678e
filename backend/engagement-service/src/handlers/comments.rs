/// Comment handlers - HTTP endpoints for comment threads
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::Result;
use crate::middleware::AuthenticatedActor;
use crate::services::ThreadManager;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
    pub post_id: Uuid,
    /// Set when replying to another comment on the same post
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CommentListParams {
    pub post_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    #[validate(range(min = 1))]
    pub page: Option<i64>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<i64>,
}

/// POST /api/v1/comments
pub async fn create_comment(
    threads: web::Data<Arc<ThreadManager>>,
    actor: AuthenticatedActor,
    req: web::Json<CreateCommentRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let comment = threads
        .create_comment(actor.id(), req.post_id, &req.content, req.parent_id)
        .await?;
    Ok(HttpResponse::Created().json(comment))
}

/// GET /api/v1/comments
pub async fn list_comments(
    threads: web::Data<Arc<ThreadManager>>,
    query: web::Query<CommentListParams>,
) -> Result<HttpResponse> {
    query.validate()?;
    let page = threads
        .list_comments(
            query.post_id,
            query.user_id,
            query.page.unwrap_or(1),
            query.limit.unwrap_or(20),
        )
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

/// GET /api/v1/comments/{id}
pub async fn get_comment(
    threads: web::Data<Arc<ThreadManager>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let comment = threads.get_comment(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(comment))
}

/// PUT /api/v1/comments/{id}
pub async fn update_comment(
    threads: web::Data<Arc<ThreadManager>>,
    actor: AuthenticatedActor,
    path: web::Path<Uuid>,
    req: web::Json<UpdateCommentRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let comment = threads
        .update_comment(actor.id(), path.into_inner(), &req.content)
        .await?;
    Ok(HttpResponse::Ok().json(comment))
}

/// DELETE /api/v1/comments/{id}
pub async fn delete_comment(
    threads: web::Data<Arc<ThreadManager>>,
    actor: AuthenticatedActor,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let comment_id = path.into_inner();
    let removed = threads.delete_comment(actor.id(), comment_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("Comment {} has been deleted successfully", comment_id),
        "removed": removed,
    })))
}

/// GET /api/v1/posts/{id}/comments
pub async fn list_post_comments(
    threads: web::Data<Arc<ThreadManager>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let comments = threads.list_by_post(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(comments))
}

/// GET /api/v1/comments/{id}/replies
pub async fn list_replies(
    threads: web::Data<Arc<ThreadManager>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let replies = threads.list_replies(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(replies))
}

/// GET /api/v1/users/{id}/comments
pub async fn list_user_comments(
    threads: web::Data<Arc<ThreadManager>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let comments = threads.list_by_user(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(comments))
}
