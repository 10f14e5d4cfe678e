pub mod config;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AppError, Result};

use actix_web::web;
use std::sync::Arc;

use services::{
    NotificationEngine, NotificationSettings, PostService, SharedEventSink, ThreadManager,
    ToggleEngine,
};
use store::SharedStore;

/// The engines wired over one store, with the notification engine as the
/// event sink for toggles and threads.
#[derive(Clone)]
pub struct Engagement {
    pub store: SharedStore,
    pub toggle: Arc<ToggleEngine>,
    pub threads: Arc<ThreadManager>,
    pub notifications: Arc<NotificationEngine>,
    pub posts: Arc<PostService>,
}

impl Engagement {
    pub fn new(store: SharedStore, settings: NotificationSettings) -> Self {
        let notifications = Arc::new(NotificationEngine::new(store.clone(), settings));
        let sink: SharedEventSink = notifications.clone();

        Self {
            toggle: Arc::new(ToggleEngine::new(store.clone(), sink.clone())),
            threads: Arc::new(ThreadManager::new(store.clone(), sink)),
            posts: Arc::new(PostService::new(store.clone())),
            notifications,
            store,
        }
    }

    /// Register app data and the `/api/v1` routes
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(
            web::JsonConfig::default()
                .error_handler(|err, _| AppError::Validation(err.to_string()).into()),
        )
        .app_data(
            web::QueryConfig::default()
                .error_handler(|err, _| AppError::Validation(err.to_string()).into()),
        )
        .app_data(web::Data::new(self.store.clone()))
        .app_data(web::Data::new(self.toggle.clone()))
        .app_data(web::Data::new(self.threads.clone()))
        .app_data(web::Data::new(self.notifications.clone()))
        .app_data(web::Data::new(self.posts.clone()))
        .route("/health", web::get().to(handlers::health))
        .route("/ready", web::get().to(handlers::ready))
        .route("/metrics", web::get().to(metrics::serve_metrics));
        handlers::register_routes(cfg);
    }
}
