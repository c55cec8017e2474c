//! Parley Gateway - HTTP/WebSocket messaging server
//!
//! This is the main entry point for the gateway service. It opens the
//! store, builds the real-time core, and serves the API.
//!
//! # Environment
//!
//! - `LISTEN_ADDR` (default `0.0.0.0:8080`)
//! - `DATA_DIR` (default `/data/parley`)
//! - `JWT_SECRET` shared HS256 secret, required unless in dev mode
//! - `JWT_ISSUER` expected `iss` claim, optional
//! - `TYPING_REQUIRES_FRIENDSHIP` (`true`/`false`, default `false`)
//!
//! # Dev Mode
//!
//! Build with `--features dev-mode` and set `DEV_MODE=true` to use a mock
//! JWT validator. Use tokens in format: `test-token:<user-uuid>`

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use parley_auth::{AuthConfig, JwtValidator, SecretValidator};
use parley_gateway::{create_router, GatewayConfig, GatewayState};
use parley_realtime::{RealtimeConfig, RealtimeService};
use parley_store::RocksStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,parley=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Parley Gateway");

    // Load configuration from environment
    let listen_addr = std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into());
    let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/parley".into());
    let jwt_issuer = std::env::var("JWT_ISSUER").ok();
    let typing_requires_friendship = env_flag("TYPING_REQUIRES_FRIENDSHIP");

    tracing::info!(
        listen_addr = %listen_addr,
        data_dir = %data_dir,
        jwt_issuer = ?jwt_issuer,
        typing_requires_friendship,
        "Gateway configuration loaded"
    );

    // Initialize RocksDB store
    tracing::info!(path = %data_dir, "Opening RocksDB store");
    let store = Arc::new(RocksStore::open(&data_dir)?);

    let realtime_config = RealtimeConfig {
        typing_requires_friendship,
        ..Default::default()
    };
    let gateway_config = GatewayConfig {
        listen_addr,
        ..Default::default()
    };

    #[cfg(feature = "dev-mode")]
    {
        if env_flag("DEV_MODE") {
            tracing::warn!("DEV MODE ENABLED - using mock JWT validator");
            tracing::warn!("Use tokens in format: test-token:<user-uuid>");
            let jwt_validator = Arc::new(parley_auth::MockJwtValidator);
            return serve(store, jwt_validator, realtime_config, gateway_config).await;
        }
    }

    let secret = std::env::var("JWT_SECRET").map_err(|_| "JWT_SECRET must be set")?;
    let jwt_validator = Arc::new(SecretValidator::new(&AuthConfig {
        secret,
        issuer: jwt_issuer,
        ..Default::default()
    }));
    tracing::info!("JWT validator initialized");

    serve(store, jwt_validator, realtime_config, gateway_config).await
}

/// Build the service graph around `jwt_validator` and run the server.
async fn serve<V>(
    store: Arc<RocksStore>,
    jwt_validator: Arc<V>,
    realtime_config: RealtimeConfig,
    gateway_config: GatewayConfig,
) -> Result<(), Box<dyn std::error::Error>>
where
    V: JwtValidator + 'static,
{
    let listen_addr = gateway_config.listen_addr.clone();

    let realtime = Arc::new(RealtimeService::new(
        store,
        Arc::clone(&jwt_validator),
        realtime_config,
    ));
    tracing::info!("Realtime service initialized");

    let state = GatewayState::new(realtime, jwt_validator, gateway_config);
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Read a boolean environment variable; anything but `true` or `1` is off.
fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| matches!(v.trim(), "true" | "1"))
}
