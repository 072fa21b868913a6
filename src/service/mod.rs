//! Workspace watch service: per-workspace orchestration and the registry.
//!
//! [`WatchServiceRegistry::watch`] is the only entry point the application
//! needs. Topology and OS access are injected through
//! [`TopologyProvider`] and [`WatchFacility`](crate::watcher::WatchFacility).

mod bootstrap;
mod orchestrator;
mod provider;
mod registry;

pub use bootstrap::{BootstrapPlan, deliver_chunks};
pub use orchestrator::{
    CallbackListener, OrchestratorContext, OrchestratorState, WatchListener,
    WorkspaceWatchOrchestrator,
};
pub use provider::{FilesystemTopology, StaticTopology, TopologyProvider};
pub use registry::WatchServiceRegistry;
