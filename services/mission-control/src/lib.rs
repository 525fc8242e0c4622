//! Mission control - Stratolink website, activation and telemetry dashboard
//!
//! Receives LoRaWAN uplinks from the network server, stores them as
//! telemetry rows, and serves the live map, the activation wizard and the
//! public pages.

pub mod activation;
pub mod config;
pub mod dashboard;
pub mod demo;
pub mod error;
pub mod io;
pub mod model;
pub mod pages;
pub mod poller;
pub mod state;
pub mod store;
pub mod ttn;
pub mod uplink;
pub mod webhook;

pub use config::{load_config, Config};
pub use error::{MissionControlError, Result};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio_util::sync::CancellationToken;

use crate::demo::DemoFeed;
use crate::io::ReqwestHttpClient;
use crate::poller::Poller;
use crate::state::AppState;

/// Assemble every route of the service
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(pages::routes())
        .merge(activation::routes())
        .merge(webhook::routes())
        .merge(dashboard::routes())
        .merge(demo::routes())
        .with_state(state)
}

/// Run the mission-control service with the given configuration
pub async fn run(config: Config) -> Result<()> {
    let http: Arc<dyn io::HttpClient> = Arc::new(ReqwestHttpClient::new());
    let store = store::from_config(&config.database, http);
    let cancel = CancellationToken::new();

    let port = config.server.port;
    let demo_config = config.demo.clone();
    let app = AppState::new(Arc::clone(&store), config);

    // Setup shutdown handler
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl-c");
        tracing::info!("Shutdown signal received");
        cancel_for_signal.cancel();
    });

    if demo_config.enabled {
        let feed = DemoFeed::new(&demo_config);
        let store = Arc::clone(&store);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            feed.run(store, demo_config.interval, cancel).await;
        });
    }

    let poller = Poller::new(
        Arc::clone(&store),
        Arc::clone(&app.fleet),
        app.config.dashboard.poll_interval,
        app.config.dashboard.latest_limit,
        cancel.clone(),
    );
    let poller_handle = tokio::spawn(async move { poller.run().await });

    let router = build_router(app);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to port {}: {}", port, e);
            cancel.cancel();
            let _ = poller_handle.await;
            return Err(e.into());
        }
    };
    tracing::info!("Mission control listening on http://{}", addr);

    let cancel_for_server = cancel.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            cancel_for_server.cancelled().await;
        })
        .await?;

    cancel.cancel();
    let _ = poller_handle.await;
    tracing::info!("Mission control stopped");

    Ok(())
}
