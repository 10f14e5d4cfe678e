/// HTTP surface: authentication, status codes and the main engagement flow
mod common;

use actix_web::http::StatusCode;
use actix_web::{test, App};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use common::fixture;
use engagement_service::middleware::{Claims, JwtAuthMiddleware, JwtValidator};

const SECRET: &str = "integration-test-secret";

fn bearer(user_id: Uuid) -> (&'static str, String) {
    let exp = (chrono::Utc::now().timestamp() + 3600) as usize;
    let token = encode(
        &Header::new(Algorithm::HS256),
        &Claims {
            sub: user_id.to_string(),
            exp,
            iat: None,
        },
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();
    ("Authorization", format!("Bearer {}", token))
}

macro_rules! engagement_app {
    ($engagement:expr) => {{
        let engagement = $engagement.clone();
        test::init_service(
            App::new()
                .wrap(JwtAuthMiddleware::new(Arc::new(JwtValidator::new(SECRET))))
                .configure(move |cfg| engagement.configure(cfg)),
        )
        .await
    }};
}

#[actix_web::test]
async fn test_health_is_public() {
    let fx = fixture();
    let app = engagement_app!(fx.engagement);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/ready").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_mutation_without_token_is_unauthorized() {
    let fx = fixture();
    let author = fx.user("author").await;
    let post = fx.post(&author, "Post").await;
    let app = engagement_app!(fx.engagement);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/posts/{}/like", post.post.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert_eq!(fx.store.notification_rows().await, 0);
}

#[actix_web::test]
async fn test_invalid_token_is_rejected() {
    let fx = fixture();
    let app = engagement_app!(fx.engagement);

    let req = test::TestRequest::get()
        .uri("/api/v1/notifications")
        .insert_header(("Authorization", "Bearer not-a-jwt"))
        .to_request();
    let err = test::try_call_service(&app, req).await.err().unwrap();
    assert_eq!(
        err.as_response_error().status_code(),
        StatusCode::UNAUTHORIZED
    );
}

#[actix_web::test]
async fn test_like_then_read_inbox_flow() {
    let fx = fixture();
    let author = fx.user("author").await;
    let reader = fx.named_user("reader", Some("Rita"), Some("Reader")).await;
    let app = engagement_app!(fx.engagement);

    let req = test::TestRequest::post()
        .uri("/api/v1/posts")
        .insert_header(bearer(author.id))
        .set_json(json!({
            "title": "Hello world",
            "content": "first post",
            "status": "PUBLISHED",
            "tags": ["intro"]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let post: Value = test::read_body_json(resp).await;
    let post_id = post["id"].as_str().unwrap().to_string();
    assert_eq!(post["user_id"], author.id.to_string());

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/posts/{}/like", post_id))
        .insert_header(bearer(reader.id))
        .to_request();
    let liked: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(liked["liked"], true);
    assert_eq!(liked["message"], "Post liked successfully");

    let req = test::TestRequest::get()
        .uri("/api/v1/notifications")
        .insert_header(bearer(author.id))
        .to_request();
    let inbox: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(inbox["unreadCount"], 1);
    assert_eq!(inbox["pagination"]["total"], 1);
    assert_eq!(
        inbox["notifications"][0]["message"],
        "Rita Reader liked your post: \"Hello world\""
    );
    assert_eq!(inbox["notifications"][0]["kind"], "POST_LIKE");

    let req = test::TestRequest::patch()
        .uri("/api/v1/notifications/read-all")
        .insert_header(bearer(author.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/v1/notifications/unread-count")
        .insert_header(bearer(author.id))
        .to_request();
    let count: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(count["unreadCount"], 0);
}

#[actix_web::test]
async fn test_cross_post_reply_is_forbidden() {
    let fx = fixture();
    let author = fx.user("author").await;
    let reader = fx.user("reader").await;
    let p1 = fx.post(&author, "P1").await;
    let p2 = fx.post(&author, "P2").await;
    let on_p2 = fx.comment(&author, p2.post.id, "on p2").await;
    let app = engagement_app!(fx.engagement);

    let req = test::TestRequest::post()
        .uri("/api/v1/comments")
        .insert_header(bearer(reader.id))
        .set_json(json!({
            "content": "wrong thread",
            "postId": p1.post.id,
            "parentId": on_p2.id
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "INVALID_RELATION");
    assert_eq!(fx.store.comment_rows().await, 1);
}

#[actix_web::test]
async fn test_unknown_sort_is_bad_request() {
    let fx = fixture();
    let app = engagement_app!(fx.engagement);

    let req = test::TestRequest::get()
        .uri("/api/v1/posts?sortBy=bogus")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[actix_web::test]
async fn test_popularity_listing_is_public() {
    let fx = fixture();
    let author = fx.user("author").await;
    fx.post(&author, "Only one").await;
    let app = engagement_app!(fx.engagement);

    let req = test::TestRequest::get()
        .uri("/api/v1/posts?sortBy=popularity")
        .to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page["posts"][0]["popularityScore"], 15.0);
    assert_eq!(page["posts"][0]["author"]["username"], "author");
}

#[actix_web::test]
async fn test_missing_post_comment_listing_is_not_found() {
    let fx = fixture();
    let app = engagement_app!(fx.engagement);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/posts/{}/comments", Uuid::new_v4()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_page_far_past_the_end_is_empty() {
    let fx = fixture();
    let author = fx.user("author").await;
    fx.post(&author, "Only one").await;
    let app = engagement_app!(fx.engagement);

    let req = test::TestRequest::get()
        .uri("/api/v1/posts?page=9223372036854775807&limit=100")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let page: Value = test::read_body_json(resp).await;
    assert_eq!(page["posts"].as_array().unwrap().len(), 0);
    assert_eq!(page["pagination"]["total"], 1);
}
