/// HTTP handlers for engagement endpoints
///
/// - Likes: toggle on posts and comments
/// - Comments: threads, replies and owner-only edits
/// - Notifications: the authenticated recipient's inbox
/// - Posts: CRUD, listing (optionally popularity-ranked) and tags
///
/// Handlers take the actor from `AuthenticatedActor` only; no request field
/// is trusted as an identity.
use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::store::SharedStore;

pub mod comments;
pub mod likes;
pub mod notifications;
pub mod posts;

/// Body for mutations that return no entity
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Register every `/api/v1` route
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            // Posts
            .service(
                web::resource("/posts")
                    .route(web::get().to(posts::list_posts))
                    .route(web::post().to(posts::create_post)),
            )
            .service(
                web::resource("/posts/{id}")
                    .route(web::get().to(posts::get_post))
                    .route(web::put().to(posts::update_post))
                    .route(web::delete().to(posts::delete_post)),
            )
            .route("/posts/{id}/like", web::post().to(likes::toggle_post_like))
            .route(
                "/posts/{id}/comments",
                web::get().to(comments::list_post_comments),
            )
            .route("/users/{id}/posts", web::get().to(posts::list_user_posts))
            .route("/users/{id}/comments", web::get().to(comments::list_user_comments))
            .route("/tags", web::get().to(posts::list_tags))
            // Comments
            .service(
                web::resource("/comments")
                    .route(web::get().to(comments::list_comments))
                    .route(web::post().to(comments::create_comment)),
            )
            .service(
                web::resource("/comments/{id}")
                    .route(web::get().to(comments::get_comment))
                    .route(web::put().to(comments::update_comment))
                    .route(web::delete().to(comments::delete_comment)),
            )
            .route(
                "/comments/{id}/like",
                web::post().to(likes::toggle_comment_like),
            )
            .route(
                "/comments/{id}/replies",
                web::get().to(comments::list_replies),
            )
            // Notifications: fixed paths before `{id}`
            .route(
                "/notifications",
                web::get().to(notifications::list_notifications),
            )
            .route(
                "/notifications/unread-count",
                web::get().to(notifications::unread_count),
            )
            .route(
                "/notifications/read-all",
                web::patch().to(notifications::mark_all_read),
            )
            .route(
                "/notifications/{id}/read",
                web::patch().to(notifications::mark_read),
            )
            .route(
                "/notifications/{id}",
                web::delete().to(notifications::delete_notification),
            ),
    );
}

/// GET /health
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// GET /ready
pub async fn ready(store: web::Data<SharedStore>) -> HttpResponse {
    match store.ping().await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "status": "ready" })),
        Err(err) => {
            tracing::warn!(error = %err, "readiness check failed");
            HttpResponse::ServiceUnavailable()
                .json(serde_json::json!({ "status": "unavailable" }))
        }
    }
}
