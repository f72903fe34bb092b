//! Shared gateway state: the C1/C4/C5/C6/C7 instances wired together
//! behind the locks each needs.

use parking_lot::RwLock;
use sentinel_core::config::Config;
use sentinel_core::types::Environment;
use sentinel_ledger::LocalLedger;
use sentinel_passport::token::KeyMaterial;
use sentinel_passport::{PassportService, RevocationRegistry};
use sentinel_pipeline::EnvironmentRegistry;
use sentinel_policy::LocalPolicyEnforcer;
use sentinel_sync::{ControlPlaneSyncClient, SyncEngine, SyncMode};
use std::sync::Arc;
use std::time::Duration;

pub struct AppState {
    pub config: Config,
    pub environment: Environment,
    pub passport_service: PassportService,
    pub enforcer: Arc<RwLock<LocalPolicyEnforcer>>,
    pub ledger: Arc<LocalLedger>,
    pub env_registry: Arc<EnvironmentRegistry>,
    pub sync_engine: Arc<SyncEngine>,
}

impl AppState {
    /// Build the gateway's state from configuration. Does not perform
    /// the startup sync — call `bootstrap_sync` once the state exists.
    pub fn from_config(config: Config) -> Self {
        let environment = Environment::parse(&config.gateway_environment).unwrap_or(Environment::Edge);
        let key = KeyMaterial::hmac(config.jwt_secret.as_bytes());
        let revocation = Arc::new(RevocationRegistry::new());
        let passport_service = PassportService::new(key, "sentinel-control-plane", revocation.clone());
        let enforcer = Arc::new(RwLock::new(LocalPolicyEnforcer::new()));
        let ledger = Arc::new(LocalLedger::new(config.gateway_id.clone()));
        let env_registry = Arc::new(EnvironmentRegistry::new());
        let client = ControlPlaneSyncClient::new(config.control_plane_url.clone(), config.gateway_id.clone());
        let sync_engine = Arc::new(SyncEngine::new(client, enforcer.clone(), revocation, ledger.clone(), environment));

        Self { config, environment, passport_service, enforcer, ledger, env_registry, sync_engine }
    }

    pub fn mode(&self) -> &'static str {
        match self.sync_engine.mode() {
            SyncMode::Online => "online",
            SyncMode::Degraded => "degraded",
        }
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.config.deadline_ms)
    }
}
