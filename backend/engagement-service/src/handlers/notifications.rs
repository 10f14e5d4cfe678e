/// Notification inbox handlers. Every route acts on the authenticated
/// recipient's own notifications.
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::MessageResponse;
use crate::error::Result;
use crate::middleware::AuthenticatedActor;
use crate::services::NotificationEngine;

#[derive(Debug, Deserialize, Validate)]
pub struct NotificationListParams {
    #[validate(range(min = 1))]
    pub page: Option<i64>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<i64>,
}

/// GET /api/v1/notifications
pub async fn list_notifications(
    engine: web::Data<Arc<NotificationEngine>>,
    actor: AuthenticatedActor,
    query: web::Query<NotificationListParams>,
) -> Result<HttpResponse> {
    query.validate()?;
    let page = engine
        .list(actor.id(), query.page.unwrap_or(1), query.limit.unwrap_or(20))
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

/// GET /api/v1/notifications/unread-count
pub async fn unread_count(
    engine: web::Data<Arc<NotificationEngine>>,
    actor: AuthenticatedActor,
) -> Result<HttpResponse> {
    let count = engine.unread_count(actor.id()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "unreadCount": count })))
}

/// PATCH /api/v1/notifications/{id}/read
pub async fn mark_read(
    engine: web::Data<Arc<NotificationEngine>>,
    actor: AuthenticatedActor,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    engine.mark_read(path.into_inner(), actor.id()).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Notification marked as read")))
}

/// PATCH /api/v1/notifications/read-all
pub async fn mark_all_read(
    engine: web::Data<Arc<NotificationEngine>>,
    actor: AuthenticatedActor,
) -> Result<HttpResponse> {
    engine.mark_all_read(actor.id()).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("All notifications marked as read")))
}

/// DELETE /api/v1/notifications/{id}
pub async fn delete_notification(
    engine: web::Data<Arc<NotificationEngine>>,
    actor: AuthenticatedActor,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    engine.delete(path.into_inner(), actor.id()).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Notification deleted")))
}
