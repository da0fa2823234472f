//! Gemini relay server.
//!
//! Run with: cargo run -p gemini-relay-server
//!
//! Then connect a WebSocket client to ws://localhost:8000/ws and send a message.

mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use gemini_relay_core::Relay;
use gemini_relay_gemini::GeminiProvider;
use gemini_relay_transport::{RelayState, create_router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine.
    let _ = dotenv::dotenv();
    let args = Args::parse();

    init_tracing(args.log_json);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %args.addr,
        model = %args.model,
        on_provider_error = %args.on_provider_error,
        "Starting gemini-relay"
    );

    let provider = GeminiProvider::new(args.gemini_config())?;
    let relay = Relay::new(Arc::new(provider));

    let app = create_router(RelayState::new(relay, args.on_provider_error))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("Failed to bind {}", args.addr))?;
    tracing::info!("Server listening on ws://{}/ws", args.addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
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
                tracing::error!("Failed to listen for SIGTERM: {e}");
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

    tracing::info!("Shutdown signal received");
}
