mod api;
mod middleware;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use rrv_db::{MemoryRestaurantCache, ReviewBackend, ReviewStore};
use rrv_search::{RestaurantSearch, SearchConfig};

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = rrv_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let store = ReviewBackend::from_config(&config).await?;
    let search = RestaurantSearch::new(&SearchConfig::from_app_config(&config))?;
    tracing::info!(
        env = %config.env,
        store = store.backend_name(),
        static_dir = ?config.static_dir,
        "starting rrv-server"
    );

    let state = AppState {
        store: Arc::new(store),
        search: Arc::new(search),
        cache: Arc::new(MemoryRestaurantCache::new()),
    };
    let app = build_app(
        state,
        AuthState::from_config(&config),
        default_rate_limit_state(),
        config.static_dir.as_deref(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
