//! Traits describing backend and routing-service capabilities and shared helper types.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Error as ReqwestError;

use crate::model::{
    Alert, AuthResponse, CollectionPoint, Employee, EmployeeId, GeoPoint, HealthSnapshot,
    Incident, LoginRequest, PointId, RegisterRequest, Route, RouteId, RouteStatus, Vehicle,
    VehicleId,
};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to the backend or the routing service.
pub enum PortError {
    /// Network layer failed, timed out, or the body could not be decoded.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// Server answered with a non-success status.
    #[error("{context} (HTTP {status})")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Operation that failed, e.g. "Failed to fetch routes".
        context: &'static str,
    },
    /// Routing service could not produce a path.
    #[error("Routing service error: {0}")]
    Routing(String),
    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PortError {
    /// Whether the error came from an HTTP 404.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            PortError::Status { status, .. } => *status == 404,
            PortError::Network(err) => err.status().is_some_and(|code| code.as_u16() == 404),
            PortError::Routing(_) | PortError::Internal(_) => false,
        }
    }
}

#[async_trait]
/// Collection point resource (`/points`).
pub trait PointPort: Send + Sync {
    /// List all points.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails.
    async fn list(&self) -> Result<Vec<CollectionPoint>, PortError>;

    /// Fetch one point.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails or the point is unknown.
    async fn get(&self, id: &PointId) -> Result<CollectionPoint, PortError>;

    /// Create a point and return the stored version.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails.
    async fn create(&self, point: &CollectionPoint) -> Result<CollectionPoint, PortError>;

    /// Replace a point.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails.
    async fn update(
        &self,
        id: &PointId,
        point: &CollectionPoint,
    ) -> Result<CollectionPoint, PortError>;

    /// Delete a point.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails.
    async fn delete(&self, id: &PointId) -> Result<(), PortError>;

    /// Containers at or above the alert threshold.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails.
    async fn alerts(&self) -> Result<Vec<Alert>, PortError>;

    /// Points the backend considers due for collection.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails.
    async fn needing_collection(&self) -> Result<Vec<CollectionPoint>, PortError>;
}

#[async_trait]
/// Route resource (`/routes`).
pub trait RoutePort: Send + Sync {
    /// List all routes.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails.
    async fn list(&self) -> Result<Vec<Route>, PortError>;

    /// Ask the backend optimizer for a new route.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails or nothing needs collection.
    async fn generate(&self) -> Result<Route, PortError>;

    /// Move a route to a new lifecycle status.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails.
    async fn update_status(&self, id: &RouteId, status: RouteStatus) -> Result<Route, PortError>;

    /// Delete a route.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails.
    async fn delete(&self, id: &RouteId) -> Result<(), PortError>;
}

#[async_trait]
/// Employee resource (`/employees`).
pub trait EmployeePort: Send + Sync {
    /// List all employees.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails.
    async fn list(&self) -> Result<Vec<Employee>, PortError>;

    /// Create an employee.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails.
    async fn create(&self, employee: &Employee) -> Result<Employee, PortError>;

    /// Replace an employee.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails.
    async fn update(&self, id: &EmployeeId, employee: &Employee) -> Result<Employee, PortError>;

    /// Delete an employee.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails.
    async fn delete(&self, id: &EmployeeId) -> Result<(), PortError>;
}

#[async_trait]
/// Vehicle resource (`/vehicles`).
pub trait VehiclePort: Send + Sync {
    /// List all vehicles.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails.
    async fn list(&self) -> Result<Vec<Vehicle>, PortError>;

    /// Create a vehicle.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails.
    async fn create(&self, vehicle: &Vehicle) -> Result<Vehicle, PortError>;

    /// Replace a vehicle.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails.
    async fn update(&self, id: &VehicleId, vehicle: &Vehicle) -> Result<Vehicle, PortError>;

    /// Delete a vehicle.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails.
    async fn delete(&self, id: &VehicleId) -> Result<(), PortError>;
}

#[async_trait]
/// Incident resource (`/incidents`).
pub trait IncidentPort: Send + Sync {
    /// List reported incidents.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails.
    async fn list(&self) -> Result<Vec<Incident>, PortError>;
}

#[async_trait]
/// Server health endpoint (`/monitoring/health`).
pub trait HealthPort: Send + Sync {
    /// Take one health sample.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails.
    async fn health(&self) -> Result<HealthSnapshot, PortError>;
}

#[async_trait]
/// Authentication endpoints (`/auth`).
pub trait AuthPort: Send + Sync {
    /// Exchange credentials for a token.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the credentials are rejected or the request fails.
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, PortError>;

    /// Create an account and return its token.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the account exists or the request fails.
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, PortError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Extras a routing service could draw besides the path line.
pub struct PathOptions {
    /// Let the service place its own waypoint markers.
    pub markers: bool,
    /// Produce turn-by-turn instructions.
    pub instructions: bool,
    /// Return alternative paths.
    pub alternatives: bool,
}

impl PathOptions {
    /// Path line only; markers come from the overlay engine.
    #[must_use]
    pub fn geometry_only() -> Self {
        Self {
            markers: false,
            instructions: false,
            alternatives: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Ordered waypoints to connect with a drivable path.
pub struct PathRequest {
    /// Depot, stops in order, depot.
    pub waypoints: Vec<GeoPoint>,
    /// Rendering extras.
    pub options: PathOptions,
}

#[derive(Debug, Clone, PartialEq)]
/// Drawable path returned by a routing service.
pub struct PathGeometry {
    /// Polyline vertices in drawing order.
    pub coordinates: Vec<GeoPoint>,
    /// Total length in meters.
    pub distance_m: f64,
    /// Estimated driving time.
    pub duration: Duration,
}

#[async_trait]
/// External routing service that turns waypoints into path geometry.
pub trait PathPort: Send + Sync {
    /// Compute a path through the waypoints in order.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the service is unreachable or finds no path.
    async fn compute_path(&self, request: &PathRequest) -> Result<PathGeometry, PortError>;
}
