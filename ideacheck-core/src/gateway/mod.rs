//! # HTTP Gateway
//!
//! JSON-over-HTTP surface for the flows, built on axum. Every route runs
//! through the shared [`Orchestrator`](crate::orchestrator::Orchestrator),
//! so the form bounds and the flow timeout apply exactly as they do in the CLI.

mod error;
mod server;

pub use error::ApiError;
pub use server::{GatewayServer, SharedGateway, router as gateway_router, run as run_gateway};

use serde::{Deserialize, Serialize};

/// Configuration for the HTTP gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Allow any origin, method and header. Needed when a browser UI is served from elsewhere.
    pub cors_permissive: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_permissive: false,
        }
    }
}

impl GatewayConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_config_default() {
        let config = GatewayConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert!(!config.cors_permissive);
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_gateway_config_serialization() {
        let config = GatewayConfig {
            host: "0.0.0.0".into(),
            port: 9090,
            cors_permissive: true,
        };
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: GatewayConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.host, "0.0.0.0");
        assert_eq!(deserialized.port, 9090);
        assert!(deserialized.cors_permissive);
    }
}
