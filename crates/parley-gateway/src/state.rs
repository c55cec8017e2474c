//! Gateway application state.
//!
//! This module defines the shared state that is available to all request handlers.

use std::sync::Arc;

use parley_auth::JwtValidator;
use parley_realtime::RealtimeService;
use parley_store::Store;

use crate::config::GatewayConfig;

/// Shared application state for the gateway.
///
/// This struct holds references to all services needed by the HTTP handlers.
pub struct GatewayState<S, V>
where
    S: Store,
    V: JwtValidator,
{
    /// The real-time core, owning the presence registry.
    pub realtime: Arc<RealtimeService<S, V>>,
    /// The JWT validator for authentication.
    pub jwt_validator: Arc<V>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl<S, V> GatewayState<S, V>
where
    S: Store,
    V: JwtValidator,
{
    /// Create a new gateway state.
    #[must_use]
    pub fn new(
        realtime: Arc<RealtimeService<S, V>>,
        jwt_validator: Arc<V>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            realtime,
            jwt_validator,
            config,
        }
    }
}

impl<S, V> Clone for GatewayState<S, V>
where
    S: Store,
    V: JwtValidator,
{
    fn clone(&self) -> Self {
        Self {
            realtime: Arc::clone(&self.realtime),
            jwt_validator: Arc::clone(&self.jwt_validator),
            config: self.config.clone(),
        }
    }
}
