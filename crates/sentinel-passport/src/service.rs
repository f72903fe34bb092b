//! Passport Service (C1): issue, verify, rotate, revoke.

use crate::revocation::RevocationRegistry;
use crate::token::{self, AgClaims, KeyMaterial, TokenError, TokenPayload};
use sentinel_core::types::{AgentClaims, Environment, Tier};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

const DEFAULT_TTL_SECONDS: i64 = 24 * 60 * 60;

/// Input to `Issue`: everything needed to mint a new passport, before a
/// `jti`/`iat`/`exp` are assigned.
#[derive(Debug, Clone)]
pub struct PassportData {
    pub agent_id: String,
    pub role: String,
    pub tier: Tier,
    pub trust_score: f64,
    pub authority_limit: f64,
    pub allowed_environments: HashSet<Environment>,
    pub dna_fingerprint: String,
    /// Override the default 24h TTL, in seconds.
    pub ttl_seconds: Option<i64>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IssueError {
    #[error("allowed_environments must be non-empty")]
    EmptyEnvironments,
    #[error("exp must be greater than iat")]
    NonPositiveTtl,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("passport has expired")]
    Expired,
    #[error("passport signature is invalid")]
    BadSignature,
    #[error("passport is malformed")]
    Malformed,
    #[error("passport has been revoked")]
    Revoked,
}

impl From<TokenError> for VerifyError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => VerifyError::Expired,
            TokenError::BadSignature => VerifyError::BadSignature,
            TokenError::Malformed => VerifyError::Malformed,
        }
    }
}

fn now_unix() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before epoch").as_secs() as i64
}

/// Issues, verifies, rotates, and revokes agent passports.
///
/// Stateless apart from the revocation snapshot pointer: the signature
/// check uses only the key material, never the network.
pub struct PassportService {
    key: KeyMaterial,
    issuer: String,
    revocation: Arc<RevocationRegistry>,
}

impl PassportService {
    pub fn new(key: KeyMaterial, issuer: impl Into<String>, revocation: Arc<RevocationRegistry>) -> Self {
        Self { key, issuer: issuer.into(), revocation }
    }

    pub fn revocation_registry(&self) -> &Arc<RevocationRegistry> {
        &self.revocation
    }

    /// Issue a signed passport token. Does not touch the revocation set.
    pub fn issue(&self, data: PassportData) -> Result<String, IssueError> {
        if data.allowed_environments.is_empty() {
            return Err(IssueError::EmptyEnvironments);
        }
        let ttl = data.ttl_seconds.unwrap_or(DEFAULT_TTL_SECONDS);
        if ttl <= 0 {
            return Err(IssueError::NonPositiveTtl);
        }

        let iat = now_unix();
        let payload = TokenPayload {
            sub: data.agent_id.clone(),
            jti: Uuid::new_v4().to_string(),
            iss: self.issuer.clone(),
            iat,
            exp: iat + ttl,
            ag: AgClaims {
                role: data.role,
                tier: data.tier,
                trust_score: data.trust_score,
                authority_limit: data.authority_limit,
                allowed_environments: data.allowed_environments,
                dna_fingerprint: data.dna_fingerprint,
            },
        };

        let token = token::encode(&payload, &self.key);
        tracing::info!(agent_id = %data.agent_id, jti = %payload.jti, tier = %payload.ag.tier, "passport issued");
        Ok(token)
    }

    /// Verify signature, expiry, and revocation. No I/O.
    pub fn verify(&self, token_str: &str) -> Result<AgentClaims, VerifyError> {
        let payload = token::decode_and_verify(token_str, &self.key, now_unix())?;
        if self.revocation.contains(&payload.jti) {
            return Err(VerifyError::Revoked);
        }
        Ok(payload.to_agent_claims())
    }

    /// Revoke a passport by `jti`. Idempotent.
    pub fn revoke(&self, jti: &str) {
        self.revocation.add(jti);
        tracing::warn!(jti = %jti, "passport revoked");
    }

    /// Best-effort decode of `old_token` (even if expired), revoke its
    /// `jti`, then issue a new passport. The new token is usable
    /// immediately; the old `jti` is revoked before this returns.
    pub fn rotate(&self, old_token: &str, new_data: PassportData) -> Result<String, IssueError> {
        if let Ok(old_payload) = token::decode_unverified(old_token) {
            self.revoke(&old_payload.jti);
        }
        self.issue(new_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> PassportService {
        PassportService::new(
            KeyMaterial::hmac("test-secret"),
            "sentinel-control-plane",
            Arc::new(RevocationRegistry::new()),
        )
    }

    fn sample_data(agent_id: &str) -> PassportData {
        PassportData {
            agent_id: agent_id.to_string(),
            role: "settlement-bot".into(),
            tier: Tier::T2,
            trust_score: 0.8,
            authority_limit: 50_000.0,
            allowed_environments: [Environment::Edge].into_iter().collect(),
            dna_fingerprint: "deadbeef".into(),
            ttl_seconds: None,
        }
    }

    #[test]
    fn issue_then_verify_yields_same_claims() {
        let svc = service();
        let token = svc.issue(sample_data("agent-1")).unwrap();
        let claims = svc.verify(&token).unwrap();
        assert_eq!(claims.agent_id, "agent-1");
        assert_eq!(claims.tier, Tier::T2);
        assert_eq!(claims.authority_limit, 50_000.0);
    }

    #[test]
    fn issue_rejects_empty_environments() {
        let svc = service();
        let mut data = sample_data("agent-1");
        data.allowed_environments.clear();
        assert_eq!(svc.issue(data), Err(IssueError::EmptyEnvironments));
    }

    #[test]
    fn issue_rejects_non_positive_ttl() {
        let svc = service();
        let mut data = sample_data("agent-1");
        data.ttl_seconds = Some(0);
        assert_eq!(svc.issue(data), Err(IssueError::NonPositiveTtl));
    }

    #[test]
    fn revoke_then_verify_fails_with_revoked() {
        let svc = service();
        let token = svc.issue(sample_data("agent-1")).unwrap();
        let claims = svc.verify(&token).unwrap();
        // jti isn't exposed on AgentClaims; revoke via rotate path instead.
        let _ = claims;
        let rotated = svc.rotate(&token, sample_data("agent-1")).unwrap();
        assert!(svc.verify(&token).is_err());
        assert!(svc.verify(&rotated).is_ok());
    }

    #[test]
    fn rotate_revokes_old_and_activates_new_atomically() {
        let svc = service();
        let old_token = svc.issue(sample_data("agent-1")).unwrap();
        let new_token = svc.rotate(&old_token, sample_data("agent-1")).unwrap();

        assert_eq!(svc.verify(&old_token), Err(VerifyError::Revoked));
        assert!(svc.verify(&new_token).is_ok());
    }

    #[test]
    fn rotate_accepts_already_malformed_old_token() {
        let svc = service();
        let new_token = svc.rotate("not-a-real-token", sample_data("agent-1")).unwrap();
        assert!(svc.verify(&new_token).is_ok());
    }

    #[test]
    fn revoke_is_idempotent() {
        let svc = service();
        svc.revoke("some-jti");
        svc.revoke("some-jti");
        assert!(svc.revocation_registry().contains("some-jti"));
    }
}
