//! Process configuration read once at startup from environment variables.
//!
//! The only truly process-global state. Everything else is threaded
//! through as a context object.

/// Edge gateway / control-plane configuration.
///
/// Read from env vars: `CONTROL_PLANE_URL`, `GATEWAY_ID`,
/// `GATEWAY_ENVIRONMENT`, `JWT_SECRET`, `SYNC_INTERVAL_SECONDS`,
/// `LEDGER_SOFT_CAP`, `LEDGER_HARD_CAP`, `DEADLINE_MS`.
#[derive(Debug, Clone)]
pub struct Config {
    pub control_plane_url: String,
    pub gateway_id: String,
    pub gateway_environment: String,
    pub jwt_secret: String,
    pub sync_interval_seconds: u64,
    pub ledger_soft_cap: usize,
    pub ledger_hard_cap: usize,
    pub deadline_ms: u64,
    pub port: u16,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Config {
    /// Load configuration from the process environment, falling back to
    /// development-safe defaults for anything unset.
    pub fn from_env() -> Self {
        Self {
            control_plane_url: env_or("CONTROL_PLANE_URL", "http://localhost:8000"),
            gateway_id: env_or("GATEWAY_ID", "edge-gateway-001"),
            gateway_environment: env_or("GATEWAY_ENVIRONMENT", "edge"),
            jwt_secret: env_or("JWT_SECRET", "dev-shared-secret-change-in-production"),
            sync_interval_seconds: env_parse_or("SYNC_INTERVAL_SECONDS", 30),
            ledger_soft_cap: env_parse_or("LEDGER_SOFT_CAP", 10_000),
            ledger_hard_cap: env_parse_or("LEDGER_HARD_CAP", 100_000),
            deadline_ms: env_parse_or("DEADLINE_MS", 5_000),
            port: env_parse_or("PORT", 8001),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane_when_env_unset() {
        // Use keys unlikely to be set in CI/dev shells.
        let cfg = Config {
            control_plane_url: env_or("SENTINEL_TEST_UNSET_URL", "http://localhost:8000"),
            gateway_id: env_or("SENTINEL_TEST_UNSET_ID", "edge-gateway-001"),
            gateway_environment: env_or("SENTINEL_TEST_UNSET_ENV", "edge"),
            jwt_secret: env_or("SENTINEL_TEST_UNSET_SECRET", "dev-shared-secret-change-in-production"),
            sync_interval_seconds: env_parse_or("SENTINEL_TEST_UNSET_SYNC", 30),
            ledger_soft_cap: env_parse_or("SENTINEL_TEST_UNSET_SOFT", 10_000),
            ledger_hard_cap: env_parse_or("SENTINEL_TEST_UNSET_HARD", 100_000),
            deadline_ms: env_parse_or("SENTINEL_TEST_UNSET_DEADLINE", 5_000),
            port: env_parse_or("SENTINEL_TEST_UNSET_PORT", 8001),
        };
        assert_eq!(cfg.sync_interval_seconds, 30);
        assert_eq!(cfg.ledger_soft_cap, 10_000);
        assert_eq!(cfg.port, 8001);
    }
}
