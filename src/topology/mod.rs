//! Workspace topology: which project roots an IDE workspace contains.
//!
//! A workspace is either a single project or an aggregate `.xcworkspace`
//! whose `contents.xcworkspacedata` manifest references other projects,
//! possibly through nested groups.
//!
//! # Layout
//!
//! ```text
//! TopologyResolver
//!   - classifies the workspace root (aggregate / project bundle / folder)
//!   - reads the manifest           -> manifest::parse_manifest
//!   - resolves each location       -> location::Location
//!   - normalizes + de-duplicates
//! ```
//!
//! Resolution never fails from the caller's point of view: unreadable or
//! malformed manifests are logged and produce an empty root list.

mod error;
mod location;
mod manifest;
mod resolver;

pub use error::TopologyError;
pub use location::{Location, normalize_path};
pub use manifest::{ManifestEntry, parse_manifest};
pub use resolver::{TopologyResolver, WORKSPACE_MANIFEST};

/// Extension of aggregate workspace bundles.
pub const WORKSPACE_EXTENSION: &str = "xcworkspace";

/// Extension of single-project bundles.
pub const PROJECT_EXTENSION: &str = "xcodeproj";
