use actix_web::{App, HttpServer};
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use engagement_service::config::{Config, StoreBackend};
use engagement_service::metrics::MetricsMiddleware;
use engagement_service::middleware::{JwtAuthMiddleware, JwtValidator};
use engagement_service::store::{MemoryStore, PgEngagementStore, SharedStore};
use engagement_service::Engagement;

fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,actix_web=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn build_store(config: &Config) -> Result<SharedStore> {
    match config.store.backend {
        StoreBackend::Memory => {
            info!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let database = config
                .database
                .as_ref()
                .context("database configuration missing for postgres backend")?;

            let pool = PgPoolOptions::new()
                .max_connections(database.max_connections)
                .min_connections(database.min_connections)
                .acquire_timeout(Duration::from_secs(10))
                .idle_timeout(Duration::from_secs(600))
                .connect(&database.url)
                .await
                .context("Failed to connect to database")?;
            info!("Database pool created");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run database migrations")?;
            info!("Database migrations completed");

            Ok(Arc::new(PgEngagementStore::new(pool)))
        }
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(&config.app.log_format);

    info!(
        env = %config.app.env,
        backend = ?config.store.backend,
        "Starting engagement-service"
    );

    let store = build_store(&config).await?;
    let engagement = Engagement::new(store, config.notifications.settings());
    let validator = Arc::new(JwtValidator::new(&config.auth.jwt_secret));

    let addr = format!("{}:{}", config.app.host, config.app.http_port);
    info!("Starting HTTP server on {}", addr);

    HttpServer::new(move || {
        let engagement = engagement.clone();
        App::new()
            .wrap(JwtAuthMiddleware::new(validator.clone()))
            .wrap(MetricsMiddleware::default())
            .wrap(TracingLogger::default())
            .configure(move |cfg| engagement.configure(cfg))
    })
    .bind(&addr)
    .with_context(|| format!("Failed to bind {}", addr))?
    .run()
    .await
    .context("HTTP server error")?;

    info!("engagement-service stopped");
    Ok(())
}
