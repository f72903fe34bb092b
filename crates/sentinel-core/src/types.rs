//! Core domain types shared across the governance control plane.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

/// Trust tier, ordered `T4 < T3 < T2 < T1`.
///
/// Determined by trust-score thresholds: T4 `[0,0.60)`, T3 `[0.60,0.75)`,
/// T2 `[0.75,0.90)`, T1 `[0.90,1.00]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    T1,
    T2,
    T3,
    T4,
}

impl Tier {
    /// Ordinal rank used by the `tier_minimum` rule: `T4`=1 ... `T1`=4.
    pub fn rank(self) -> u8 {
        match self {
            Tier::T4 => 1,
            Tier::T3 => 2,
            Tier::T2 => 3,
            Tier::T1 => 4,
        }
    }

    /// Derive a tier from a trust score per the thresholds above.
    pub fn from_trust_score(score: f64) -> Self {
        if score >= 0.90 {
            Tier::T1
        } else if score >= 0.75 {
            Tier::T2
        } else if score >= 0.60 {
            Tier::T3
        } else {
            Tier::T4
        }
    }
}

impl From<f64> for Tier {
    fn from(score: f64) -> Self {
        Tier::from_trust_score(score)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::T1 => "T1",
            Tier::T2 => "T2",
            Tier::T3 => "T3",
            Tier::T4 => "T4",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "T1" => Ok(Tier::T1),
            "T2" => Ok(Tier::T2),
            "T3" => Ok(Tier::T3),
            "T4" => Ok(Tier::T4),
            other => Err(format!("unknown tier: {other}")),
        }
    }
}

/// Deployment locus of an agent. An agent's passport constrains which
/// environments its actions may legally originate from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    Cloud,
    Edge,
    Client,
    OnPremise,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Cloud => "cloud",
            Environment::Edge => "edge",
            Environment::Client => "client",
            Environment::OnPremise => "on-premise",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cloud" => Some(Environment::Cloud),
            "edge" => Some(Environment::Edge),
            "client" => Some(Environment::Client),
            "on-premise" => Some(Environment::OnPremise),
            _ => None,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Environment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Environment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Environment::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("unknown environment: {s}")))
    }
}

/// The `ag` claims block embedded in a passport, and the authoritative
/// view of an agent an enforcer or pipeline step consumes. Owned by
/// external collaborators (trust scoring, tier assignment); the core
/// only consumes these fields from verified passport claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentClaims {
    pub agent_id: String,
    pub role: String,
    pub tier: Tier,
    pub trust_score: f64,
    pub authority_limit: f64,
    pub allowed_environments: HashSet<Environment>,
    pub dna_fingerprint: String,
    /// The passport's own `jti`, carried through so the ledger can
    /// record which token authorized an action.
    pub passport_jti: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_rank_orders_correctly() {
        assert!(Tier::T1.rank() > Tier::T2.rank());
        assert!(Tier::T2.rank() > Tier::T3.rank());
        assert!(Tier::T3.rank() > Tier::T4.rank());
    }

    #[test]
    fn tier_from_trust_score_boundaries() {
        assert_eq!(Tier::from_trust_score(0.0), Tier::T4);
        assert_eq!(Tier::from_trust_score(0.59), Tier::T4);
        assert_eq!(Tier::from_trust_score(0.60), Tier::T3);
        assert_eq!(Tier::from_trust_score(0.75), Tier::T2);
        assert_eq!(Tier::from_trust_score(0.90), Tier::T1);
        assert_eq!(Tier::from_trust_score(1.0), Tier::T1);
    }

    #[test]
    fn environment_round_trips_through_json() {
        for env in [Environment::Cloud, Environment::Edge, Environment::Client, Environment::OnPremise] {
            let json = serde_json::to_string(&env).unwrap();
            let back: Environment = serde_json::from_str(&json).unwrap();
            assert_eq!(back, env);
        }
        assert_eq!(serde_json::to_string(&Environment::OnPremise).unwrap(), "\"on-premise\"");
    }
}
