//! Sentinel-Pipeline: the authorization pipeline, prophecy simulator,
//! and environment registry (C7).

pub mod env_registry;
pub mod pipeline;
pub mod prophecy;

pub use env_registry::{AgentLocation, CrossingAlert, EnvironmentRegistry, FleetStatus, HeartbeatInput, HeartbeatResponse, HeartbeatStatus, Liveness};
pub use pipeline::{authorize, AuthorizeError, AuthorizeRequest, AuthorizeResponse, PipelineContext};
pub use prophecy::{should_trigger_prophecy, simulate, ComplianceRisk, PathType, ProphecyPath, ProphecyResult};
