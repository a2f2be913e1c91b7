//! Response types for the health endpoints.

use serde::Serialize;
use std::collections::HashMap;
use storefront_core::Timestamp;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: Timestamp,
    pub checks: HashMap<String, HealthCheckResult>,
    pub version: String,
}

/// Readiness check response
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub timestamp: Timestamp,
}

/// Health check result for individual components
#[derive(Debug, Serialize, Clone)]
pub struct HealthCheckResult {
    pub healthy: bool,
    pub message: String,
}

/// Overall health status
#[derive(Debug)]
pub struct HealthStatus {
    pub is_healthy: bool,
    pub checks: HashMap<String, HealthCheckResult>,
}

impl HealthStatus {
    /// Render as the public health response
    pub fn into_response(self) -> HealthResponse {
        HealthResponse {
            status: if self.is_healthy {
                "healthy".to_string()
            } else {
                "unhealthy".to_string()
            },
            timestamp: Timestamp::now(),
            checks: self.checks,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
