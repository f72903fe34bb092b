//! Environment registry (C7): tracks where agents are running via
//! heartbeats, classifies liveness, and flags forbidden environment
//! crossings. In-memory only — a restart resets all `last_seen` to
//! unknown.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sentinel_core::types::Environment;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

const HEARTBEAT_TTL_SECONDS: i64 = 90;
const STALE_AFTER_SECONDS: i64 = 300;
const ENVIRONMENT_HISTORY_CAPACITY: usize = 32;
const RECENT_ALERTS_CAPACITY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Liveness {
    Alive,
    Stale,
    Dead,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentLocation {
    pub agent_id: String,
    pub environment: Environment,
    pub host_id: String,
    pub region: String,
    pub agent_version: String,
    pub passport_jti: String,
    pub last_seen: DateTime<Utc>,
    pub metadata: serde_json::Value,
}

impl AgentLocation {
    pub fn liveness(&self) -> Liveness {
        let age = (Utc::now() - self.last_seen).num_seconds();
        if age < HEARTBEAT_TTL_SECONDS {
            Liveness::Alive
        } else if age < STALE_AFTER_SECONDS {
            Liveness::Stale
        } else {
            Liveness::Dead
        }
    }

    pub fn is_alive(&self) -> bool {
        self.liveness() == Liveness::Alive
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossingAlert {
    pub agent_id: String,
    pub from_environment: Environment,
    pub to_environment: Environment,
    pub host_id: String,
    pub timestamp: DateTime<Utc>,
    pub severity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HeartbeatStatus {
    Ok,
    Alert,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    pub status: HeartbeatStatus,
    pub alert: Option<CrossingAlert>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetStatus {
    pub total_agents: usize,
    pub by_environment: HashMap<String, usize>,
    pub by_liveness: HashMap<String, usize>,
    pub recent_alerts: Vec<CrossingAlert>,
}

pub struct HeartbeatInput {
    pub agent_id: String,
    pub environment: Environment,
    pub host_id: String,
    pub region: String,
    pub agent_version: String,
    pub passport_jti: String,
    pub metadata: serde_json::Value,
}

struct Inner {
    locations: HashMap<String, AgentLocation>,
    history: HashMap<String, VecDeque<Environment>>,
    alerts: VecDeque<CrossingAlert>,
    forbidden_transitions: Vec<(Environment, Environment)>,
}

/// Tracks agent location over time and flags forbidden environment
/// crossings. Not persisted; purely in-memory, last-writer-wins per
/// agent.
pub struct EnvironmentRegistry {
    inner: RwLock<Inner>,
}

impl Default for EnvironmentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentRegistry {
    pub fn new() -> Self {
        Self::with_forbidden_transitions(vec![(Environment::Client, Environment::Cloud)])
    }

    pub fn with_forbidden_transitions(forbidden_transitions: Vec<(Environment, Environment)>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                locations: HashMap::new(),
                history: HashMap::new(),
                alerts: VecDeque::new(),
                forbidden_transitions,
            }),
        }
    }

    pub fn heartbeat(&self, input: HeartbeatInput) -> HeartbeatResponse {
        let mut inner = self.inner.write();
        let previous_env = inner.locations.get(&input.agent_id).map(|loc| loc.environment);

        let location = AgentLocation {
            agent_id: input.agent_id.clone(),
            environment: input.environment,
            host_id: input.host_id.clone(),
            region: input.region,
            agent_version: input.agent_version,
            passport_jti: input.passport_jti,
            last_seen: Utc::now(),
            metadata: input.metadata,
        };
        inner.locations.insert(input.agent_id.clone(), location.clone());

        let history = inner.history.entry(input.agent_id.clone()).or_default();
        history.push_back(input.environment);
        if history.len() > ENVIRONMENT_HISTORY_CAPACITY {
            history.pop_front();
        }

        if let Some(prev_env) = previous_env {
            if prev_env != input.environment && inner.forbidden_transitions.contains(&(prev_env, input.environment)) {
                let alert = CrossingAlert {
                    agent_id: input.agent_id,
                    from_environment: prev_env,
                    to_environment: input.environment,
                    host_id: input.host_id,
                    timestamp: Utc::now(),
                    severity: "high".to_string(),
                };
                inner.alerts.push_back(alert.clone());
                if inner.alerts.len() > RECENT_ALERTS_CAPACITY {
                    inner.alerts.pop_front();
                }
                tracing::warn!(agent_id = %alert.agent_id, from = ?alert.from_environment, to = ?alert.to_environment, "forbidden environment crossing");
                return HeartbeatResponse { status: HeartbeatStatus::Alert, alert: Some(alert) };
            }
        }

        HeartbeatResponse { status: HeartbeatStatus::Ok, alert: None }
    }

    pub fn get_location(&self, agent_id: &str) -> Option<AgentLocation> {
        self.inner.read().locations.get(agent_id).cloned()
    }

    pub fn get_environment_history(&self, agent_id: &str) -> Vec<Environment> {
        self.inner.read().history.get(agent_id).cloned().unwrap_or_default().into_iter().collect()
    }

    pub fn get_agents_in_environment(&self, environment: Environment, alive_only: bool) -> Vec<AgentLocation> {
        self.inner
            .read()
            .locations
            .values()
            .filter(|loc| loc.environment == environment && (!alive_only || loc.is_alive()))
            .cloned()
            .collect()
    }

    pub fn fleet_status(&self) -> FleetStatus {
        let inner = self.inner.read();
        let mut by_environment: HashMap<String, usize> = HashMap::new();
        let mut by_liveness: HashMap<String, usize> = HashMap::new();

        for loc in inner.locations.values() {
            *by_environment.entry(loc.environment.to_string()).or_insert(0) += 1;
            let liveness_key = match loc.liveness() {
                Liveness::Alive => "alive",
                Liveness::Stale => "stale",
                Liveness::Dead => "dead",
            };
            *by_liveness.entry(liveness_key.to_string()).or_insert(0) += 1;
        }

        FleetStatus {
            total_agents: inner.locations.len(),
            by_environment,
            by_liveness,
            recent_alerts: inner.alerts.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(agent_id: &str, env: Environment) -> HeartbeatInput {
        HeartbeatInput {
            agent_id: agent_id.to_string(),
            environment: env,
            host_id: "host-1".into(),
            region: "us-central1".into(),
            agent_version: "1.0".into(),
            passport_jti: "jti-1".into(),
            metadata: serde_json::json!({}),
        }
    }

    #[test]
    fn first_heartbeat_establishes_state_without_alert() {
        let registry = EnvironmentRegistry::new();
        let response = registry.heartbeat(input("agent-1", Environment::Edge));
        assert_eq!(response.status, HeartbeatStatus::Ok);
        assert!(registry.get_location("agent-1").is_some());
    }

    #[test]
    fn client_to_cloud_is_a_forbidden_crossing() {
        let registry = EnvironmentRegistry::new();
        registry.heartbeat(input("agent-1", Environment::Client));
        let response = registry.heartbeat(input("agent-1", Environment::Cloud));
        assert_eq!(response.status, HeartbeatStatus::Alert);
        assert!(response.alert.is_some());
    }

    #[test]
    fn client_to_edge_to_cloud_is_not_flagged() {
        let registry = EnvironmentRegistry::new();
        registry.heartbeat(input("agent-1", Environment::Client));
        registry.heartbeat(input("agent-1", Environment::Edge));
        let response = registry.heartbeat(input("agent-1", Environment::Cloud));
        assert_eq!(response.status, HeartbeatStatus::Ok);
    }

    #[test]
    fn environment_history_is_capped() {
        let registry = EnvironmentRegistry::new();
        for _ in 0..40 {
            registry.heartbeat(input("agent-1", Environment::Edge));
        }
        assert_eq!(registry.get_environment_history("agent-1").len(), 32);
    }

    #[test]
    fn recent_alerts_ring_is_bounded() {
        let registry = EnvironmentRegistry::new();
        for i in 0..15 {
            let env = if i % 2 == 0 { Environment::Client } else { Environment::Cloud };
            registry.heartbeat(input("agent-1", env));
        }
        let status = registry.fleet_status();
        assert!(status.recent_alerts.len() <= 10);
    }

    #[test]
    fn fleet_status_groups_by_environment_and_liveness() {
        let registry = EnvironmentRegistry::new();
        registry.heartbeat(input("agent-1", Environment::Edge));
        registry.heartbeat(input("agent-2", Environment::Cloud));
        let status = registry.fleet_status();
        assert_eq!(status.total_agents, 2);
        assert_eq!(status.by_environment.get("edge"), Some(&1));
        assert_eq!(status.by_liveness.get("alive"), Some(&2));
    }
}
