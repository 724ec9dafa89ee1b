mod bootstrap;
mod catalog;
mod health;
mod rate_limit;

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{middleware, Router};
use storefront_core::config::{AppConfig, LoadOptions};
use storefront_core::ranking::{PopularityRanker, SimilarityEngine};
use storefront_db::repositories::{SqlCatalogRepository, SqlOrderRepository};
use storefront_db::DbPool;
use tokio::sync::Notify;

use crate::bootstrap::Application;
use crate::catalog::CatalogState;
use crate::rate_limit::RateLimiter;

fn init_logging(config: &AppConfig) {
    use storefront_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Logging must be up before bootstrap emits its first event.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let address: SocketAddr = format!("{}:{}", app.config.server.bind_address, app.config.server.port)
        .parse()
        .context("server.bind_address and server.port must form a socket address")?;
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let router = build_router(&app)?;

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        %address,
        "storefront-server listening"
    );

    let shutdown = Arc::new(Notify::new());
    let server = axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(wait_for_shutdown(shutdown.clone()))
        .into_future();

    tokio::select! {
        result = server => result.context("server terminated with an error")?,
        _ = async {
            shutdown.notified().await;
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!(
                event_name = "system.server.shutdown_timeout",
                correlation_id = "shutdown",
                grace_secs = grace.as_secs(),
                "in-flight requests did not drain before the shutdown deadline"
            );
        }
    }

    app.db_pool.close().await;
    tracing::info!(
        event_name = "system.server.stopped",
        correlation_id = "shutdown",
        "storefront-server stopped"
    );

    Ok(())
}

fn build_router(app: &Application) -> Result<Router> {
    let similarity = SimilarityEngine::with_limit(app.config.ranking.similar_limit)?;
    let popularity = PopularityRanker::with_limit(app.config.ranking.popular_limit)?;
    let state = CatalogState::new(
        Arc::new(SqlCatalogRepository::new(app.db_pool.clone())),
        Arc::new(SqlOrderRepository::new(app.db_pool.clone())),
        similarity,
        popularity,
    );

    let limiter =
        RateLimiter::new(app.config.server.rate_limit_per_sec, app.config.server.rate_limit_burst);

    Ok(assemble_router(state, limiter, app.db_pool.clone()))
}

/// Catalog routes behind the per-client limiter, with `/health` left unlimited.
fn assemble_router(state: CatalogState, limiter: Arc<RateLimiter>, db_pool: DbPool) -> Router {
    let api = catalog::router(state)
        .layer(middleware::from_fn_with_state(limiter, rate_limit::enforce));

    api.merge(health::router(db_pool))
}

async fn wait_for_shutdown(shutdown: Arc<Notify>) {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %error,
            "failed to listen for shutdown signal"
        );
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "storefront-server draining in-flight requests"
    );
    shutdown.notify_one();
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::sync::Arc;

    use axum::{
        body::Body,
        extract::ConnectInfo,
        http::{Request, StatusCode},
        Router,
    };
    use rust_decimal::Decimal;
    use storefront_core::domain::catalog::CatalogItem;
    use storefront_core::ranking::{PopularityRanker, SimilarityEngine};
    use storefront_db::repositories::{InMemoryCatalogRepository, InMemoryOrderRepository};
    use storefront_db::{connect_with_settings, migrations};
    use tower::ServiceExt;

    use super::assemble_router;
    use crate::catalog::CatalogState;
    use crate::rate_limit::RateLimiter;

    async fn app(burst: u32) -> Router {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");
        migrations::run_pending(&pool).await.expect("migrations should apply");

        let state = CatalogState::new(
            Arc::new(InMemoryCatalogRepository::with_items([CatalogItem::new(
                1,
                "Canvas Tote",
                Decimal::new(2_500, 2),
            )])),
            Arc::new(InMemoryOrderRepository::default()),
            SimilarityEngine::new(),
            PopularityRanker::new(),
        );
        assemble_router(state, RateLimiter::new(1, burst), pool)
    }

    fn get(uri: &str, client: Option<IpAddr>) -> Request<Body> {
        let mut request = Request::get(uri).body(Body::empty()).expect("request");
        if let Some(client) = client {
            request.extensions_mut().insert(ConnectInfo(SocketAddr::new(client, 50_000)));
        }
        request
    }

    #[tokio::test]
    async fn catalog_routes_are_limited_while_health_is_not() {
        let app = app(1).await;

        let first = app.clone().oneshot(get("/api/items/popular", None)).await.expect("response");
        assert_eq!(first.status(), StatusCode::OK);

        let second = app.clone().oneshot(get("/api/items/popular", None)).await.expect("response");
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

        let detail = app.clone().oneshot(get("/api/items/canvas-tote", None)).await.expect("response");
        assert_eq!(detail.status(), StatusCode::TOO_MANY_REQUESTS, "routes share the client budget");

        for _ in 0..3 {
            let health = app.clone().oneshot(get("/health", None)).await.expect("response");
            assert_eq!(health.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn router_keys_the_limit_by_peer_address() {
        let app = app(1).await;
        let shopper = Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10)));
        let neighbour = Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 11)));

        let first = app.clone().oneshot(get("/api/items/popular", shopper)).await.expect("response");
        assert_eq!(first.status(), StatusCode::OK);
        let again = app.clone().oneshot(get("/api/items/popular", shopper)).await.expect("response");
        assert_eq!(again.status(), StatusCode::TOO_MANY_REQUESTS);

        let other = app.oneshot(get("/api/items/popular", neighbour)).await.expect("response");
        assert_eq!(other.status(), StatusCode::OK);
    }
}
