/// Like toggle handlers
use actix_web::{web, HttpResponse};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::LikeTarget;
use crate::error::Result;
use crate::middleware::AuthenticatedActor;
use crate::services::ToggleEngine;

/// POST /api/v1/posts/{id}/like
pub async fn toggle_post_like(
    engine: web::Data<Arc<ToggleEngine>>,
    actor: AuthenticatedActor,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let outcome = engine
        .toggle_like(actor.id(), LikeTarget::Post(path.into_inner()))
        .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// POST /api/v1/comments/{id}/like
pub async fn toggle_comment_like(
    engine: web::Data<Arc<ToggleEngine>>,
    actor: AuthenticatedActor,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let outcome = engine
        .toggle_like(actor.id(), LikeTarget::Comment(path.into_inner()))
        .await?;
    Ok(HttpResponse::Ok().json(outcome))
}
