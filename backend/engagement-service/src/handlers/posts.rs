/// Post handlers - CRUD, listing and tags
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::domain::{PostChanges, PostStatus, SortOrder};
use crate::error::{AppError, Result};
use crate::middleware::AuthenticatedActor;
use crate::services::{PostListRequest, PostService, PostSortBy};

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1))]
    pub content: String,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub content: Option<String>,
    pub status: Option<PostStatus>,
    /// Replaces the whole tag set when present
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostListParams {
    pub status: Option<String>,
    pub search: Option<String>,
    pub tag: Option<String>,
    pub user_id: Option<Uuid>,
    #[validate(range(min = 1))]
    pub page: Option<i64>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UserPostParams {
    pub status: Option<String>,
    #[validate(range(min = 1))]
    pub page: Option<i64>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<i64>,
}

fn parse_status(status: Option<&str>) -> Result<Option<PostStatus>> {
    status
        .map(|s| s.parse::<PostStatus>().map_err(AppError::Validation))
        .transpose()
}

/// POST /api/v1/posts
pub async fn create_post(
    service: web::Data<Arc<PostService>>,
    actor: AuthenticatedActor,
    req: web::Json<CreatePostRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let req = req.into_inner();
    let post = service
        .create_post(actor.id(), &req.title, &req.content, req.status, req.tags)
        .await?;
    Ok(HttpResponse::Created().json(post))
}

/// GET /api/v1/posts
pub async fn list_posts(
    service: web::Data<Arc<PostService>>,
    query: web::Query<PostListParams>,
) -> Result<HttpResponse> {
    query.validate()?;
    let query = query.into_inner();

    let sort_by = match query.sort_by.as_deref() {
        Some(value) => value.parse::<PostSortBy>().map_err(AppError::Validation)?,
        None => PostSortBy::default(),
    };

    let page = service
        .list_posts(PostListRequest {
            status: parse_status(query.status.as_deref())?,
            search: query.search,
            tag: query.tag,
            user_id: query.user_id,
            page: query.page,
            limit: query.limit,
            sort_by,
            sort_order: query.sort_order.unwrap_or_default(),
        })
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

/// GET /api/v1/posts/{id}
pub async fn get_post(
    service: web::Data<Arc<PostService>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let post = service.get_post(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(post))
}

/// PUT /api/v1/posts/{id}
pub async fn update_post(
    service: web::Data<Arc<PostService>>,
    actor: AuthenticatedActor,
    path: web::Path<Uuid>,
    req: web::Json<UpdatePostRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let req = req.into_inner();
    let post = service
        .update_post(
            actor.id(),
            path.into_inner(),
            PostChanges {
                title: req.title,
                content: req.content,
                status: req.status,
                tags: req.tags,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(post))
}

/// DELETE /api/v1/posts/{id}
pub async fn delete_post(
    service: web::Data<Arc<PostService>>,
    actor: AuthenticatedActor,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let post_id = path.into_inner();
    service.delete_post(actor.id(), post_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("Post {} has been deleted successfully", post_id),
    })))
}

/// GET /api/v1/users/{id}/posts
pub async fn list_user_posts(
    service: web::Data<Arc<PostService>>,
    path: web::Path<Uuid>,
    query: web::Query<UserPostParams>,
) -> Result<HttpResponse> {
    query.validate()?;
    let page = service
        .list_posts_by_user(
            path.into_inner(),
            parse_status(query.status.as_deref())?,
            query.page,
            query.limit,
        )
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

/// GET /api/v1/tags
pub async fn list_tags(service: web::Data<Arc<PostService>>) -> Result<HttpResponse> {
    let tags = service.list_tags().await?;
    Ok(HttpResponse::Ok().json(tags))
}
