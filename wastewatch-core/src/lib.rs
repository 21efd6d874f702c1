//! Core of the wastewatch dashboard: domain model, backend ports, map overlay reconciliation,
//! routed-path lifetime, health polling, and the reducers behind the statistics screens.

/// Bundle of backend ports.
pub mod backend;
/// Display helpers for health figures.
pub mod format;
/// Marker, line and badge descriptors.
pub mod icon;
/// Background-loaded state that survives failures.
pub mod loadable;
/// Domain models and identifiers.
pub mod model;
/// Layer reconciliation of points and routes.
pub mod overlay;
/// Traits describing backend and routing-service capabilities.
pub mod ports;
/// Plain-text report export.
pub mod report;
/// Ownership of the single routed path.
pub mod routing;
/// High-level service facade used by clients.
pub mod service;
/// Bearer-token session.
pub mod session;
/// Percentages and counts.
pub mod stats;
/// Map view composition.
pub mod surface;
/// Health polling.
pub mod telemetry;

pub use backend::Backend;
pub use model::*;
pub use ports::*;
pub use service::*;
pub use session::Session;
