//! Signed JWT-equivalent passport tokens.
//!
//! header `{alg, typ}`, payload with standard claims (`sub, jti, iss,
//! iat, exp`) plus the claims block under key `ag`, signature over
//! header+payload. `alg` is `HS256` (dev, HMAC-SHA256) or `RS256`
//! (production, signed with Ed25519 under the same external `alg` name;
//! see DESIGN.md).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey as EdSigningKey, Verifier, VerifyingKey};
use hmac::{Hmac, Mac};
use sentinel_core::types::{AgentClaims, Environment, Tier};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashSet;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SigningAlgorithm {
    #[serde(rename = "HS256")]
    Hs256,
    #[serde(rename = "RS256")]
    Rs256,
}

impl SigningAlgorithm {
    fn as_str(self) -> &'static str {
        match self {
            SigningAlgorithm::Hs256 => "HS256",
            SigningAlgorithm::Rs256 => "RS256",
        }
    }
}

/// Key material for signing and verifying tokens. Constructed once at
/// gateway/control-plane startup from `Config`.
pub enum KeyMaterial {
    Hmac { secret: Vec<u8> },
    Ed25519 { signing_key: EdSigningKey, verifying_key: VerifyingKey },
}

impl KeyMaterial {
    pub fn hmac(secret: impl Into<Vec<u8>>) -> Self {
        KeyMaterial::Hmac { secret: secret.into() }
    }

    pub fn generate_ed25519() -> Self {
        let mut csprng = rand::rngs::OsRng;
        let signing_key = EdSigningKey::generate(&mut csprng);
        let verifying_key = signing_key.verifying_key();
        KeyMaterial::Ed25519 { signing_key, verifying_key }
    }

    pub fn algorithm(&self) -> SigningAlgorithm {
        match self {
            KeyMaterial::Hmac { .. } => SigningAlgorithm::Hs256,
            KeyMaterial::Ed25519 { .. } => SigningAlgorithm::Rs256,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// The `ag` claims block embedded in every passport token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgClaims {
    pub role: String,
    pub tier: Tier,
    pub trust_score: f64,
    pub authority_limit: f64,
    pub allowed_environments: HashSet<Environment>,
    pub dna_fingerprint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPayload {
    pub sub: String,
    pub jti: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub ag: AgClaims,
}

impl TokenPayload {
    /// Flatten `sub` + `ag` into the cross-crate [`AgentClaims`] shape
    /// the policy enforcer and pipeline consume.
    pub fn to_agent_claims(&self) -> AgentClaims {
        AgentClaims {
            agent_id: self.sub.clone(),
            role: self.ag.role.clone(),
            tier: self.ag.tier,
            trust_score: self.ag.trust_score,
            authority_limit: self.ag.authority_limit,
            allowed_environments: self.ag.allowed_environments.clone(),
            dna_fingerprint: self.ag.dna_fingerprint.clone(),
            passport_jti: self.jti.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("signature verification failed")]
    BadSignature,
    #[error("token has expired")]
    Expired,
}

fn b64_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

fn b64_decode(s: &str) -> Result<Vec<u8>, TokenError> {
    URL_SAFE_NO_PAD.decode(s).map_err(|_| TokenError::Malformed)
}

fn sign_bytes(key: &KeyMaterial, message: &[u8]) -> Vec<u8> {
    match key {
        KeyMaterial::Hmac { secret } => {
            let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
            mac.update(message);
            mac.finalize().into_bytes().to_vec()
        }
        KeyMaterial::Ed25519 { signing_key, .. } => signing_key.sign(message).to_bytes().to_vec(),
    }
}

fn verify_bytes(key: &KeyMaterial, message: &[u8], signature: &[u8]) -> bool {
    match key {
        KeyMaterial::Hmac { secret } => {
            let Ok(mut mac) = HmacSha256::new_from_slice(secret) else { return false };
            mac.update(message);
            mac.verify_slice(signature).is_ok()
        }
        KeyMaterial::Ed25519 { verifying_key, .. } => {
            let Ok(sig_bytes): Result<[u8; 64], _> = signature.try_into() else { return false };
            let sig = Signature::from_bytes(&sig_bytes);
            verifying_key.verify(message, &sig).is_ok()
        }
    }
}

/// Encode and sign a token. No I/O, no network call.
pub fn encode(payload: &TokenPayload, key: &KeyMaterial) -> String {
    let header = Header { alg: key.algorithm().as_str().to_string(), typ: "JWT".to_string() };
    let header_b64 = b64_encode(serde_json::to_string(&header).unwrap().as_bytes());
    let payload_b64 = b64_encode(serde_json::to_string(payload).unwrap().as_bytes());
    let signing_input = format!("{header_b64}.{payload_b64}");
    let signature = sign_bytes(key, signing_input.as_bytes());
    format!("{signing_input}.{}", b64_encode(&signature))
}

/// Decode a token's payload without checking the signature. Used only
/// where the caller explicitly accepts that risk (best-effort rotation
/// of an already-expired/invalid token).
pub fn decode_unverified(token: &str) -> Result<TokenPayload, TokenError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(TokenError::Malformed);
    }
    let payload_bytes = b64_decode(parts[1])?;
    serde_json::from_slice(&payload_bytes).map_err(|_| TokenError::Malformed)
}

/// Decode and verify signature + expiry. Does not check revocation —
/// that is the caller's (`PassportService::verify`) responsibility.
pub fn decode_and_verify(token: &str, key: &KeyMaterial, now_unix: i64) -> Result<TokenPayload, TokenError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(TokenError::Malformed);
    }
    let signing_input = format!("{}.{}", parts[0], parts[1]);
    let signature = b64_decode(parts[2])?;
    if !verify_bytes(key, signing_input.as_bytes(), &signature) {
        return Err(TokenError::BadSignature);
    }

    let payload_bytes = b64_decode(parts[1])?;
    let payload: TokenPayload = serde_json::from_slice(&payload_bytes).map_err(|_| TokenError::Malformed)?;

    if now_unix > payload.exp {
        return Err(TokenError::Expired);
    }

    Ok(payload)
}
