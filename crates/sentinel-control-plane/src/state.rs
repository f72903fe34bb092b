//! Shared control-plane state: the master instances of C1/C2/C3/C5.

use sentinel_core::config::Config;
use sentinel_ledger::MasterLedger;
use sentinel_passport::token::KeyMaterial;
use sentinel_passport::{PassportService, RevocationRegistry};
use sentinel_policy::PolicyStore;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub passport_service: PassportService,
    pub revocation: Arc<RevocationRegistry>,
    pub policy_store: PolicyStore,
    pub ledger: MasterLedger,
}

impl AppState {
    pub fn from_config(config: Config) -> Self {
        let key = KeyMaterial::hmac(config.jwt_secret.as_bytes());
        let revocation = Arc::new(RevocationRegistry::new());
        let passport_service = PassportService::new(key, "sentinel-control-plane", revocation.clone());

        Self { config, passport_service, revocation, policy_store: PolicyStore::new(), ledger: MasterLedger::new() }
    }
}
