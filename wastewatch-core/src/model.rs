//! Domain data structures for collection points, routes, fleet, and server health.

use std::fmt;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Fill level at or above which a container counts as critical.
pub const CRITICAL_FILL_LEVEL: u8 = 90;
/// Fill level at or above which a container counts as a warning.
pub const WARNING_FILL_LEVEL: u8 = 50;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Whether the backend has not assigned this id yet; empty ids are left off the wire.
            #[must_use]
            pub fn is_unassigned(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_owned())
            }
        }
    };
}

string_id!(
    /// Identifier of a collection point.
    PointId
);
string_id!(
    /// Identifier of a collection route.
    RouteId
);
string_id!(
    /// Identifier of an employee.
    EmployeeId
);
string_id!(
    /// Identifier of a vehicle.
    VehicleId
);
string_id!(
    /// Identifier of a reported incident.
    IncidentId
);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Bare WGS84 coordinate used for waypoints and path geometry.
pub struct GeoPoint {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Geographic location with an optional postal address.
pub struct Location {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Human-readable address.
    #[serde(default)]
    pub address: Option<String>,
}

impl Location {
    /// Coordinate part of the location.
    #[must_use]
    pub fn geo(&self) -> GeoPoint {
        GeoPoint {
            lat: self.latitude,
            lon: self.longitude,
        }
    }

    /// Address or a placeholder when the backend did not send one.
    #[must_use]
    pub fn address_or_na(&self) -> &str {
        self.address.as_deref().unwrap_or("N/A")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
/// Waste fractions handled by a container.
pub enum WasteType {
    /// Plastics and packaging.
    Plastic,
    /// Glass.
    Glass,
    /// Organic waste.
    Organic,
    /// Residual waste.
    General,
}

impl fmt::Display for WasteType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WasteType::Plastic => "PLASTIC",
            WasteType::Glass => "GLASS",
            WasteType::Organic => "ORGANIC",
            WasteType::General => "GENERAL",
        };
        formatter.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
/// Operational status of a collection point.
pub enum PointStatus {
    /// In service.
    Active,
    /// Temporarily out of service.
    Maintenance,
    /// Damaged.
    Broken,
}

impl PointStatus {
    /// Wire value of the status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PointStatus::Active => "ACTIVE",
            PointStatus::Maintenance => "MAINTENANCE",
            PointStatus::Broken => "BROKEN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
/// Container fill level, guaranteed to lie in `0..=100`.
pub struct FillLevel(u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("fill level {0} is outside 0..=100")]
/// Raised when a fill level outside the percentage range is decoded.
pub struct FillLevelError(pub i64);

impl FillLevel {
    /// Build a fill level, rejecting values above 100.
    ///
    /// # Errors
    ///
    /// Returns [`FillLevelError`] for values outside `0..=100`.
    pub fn new(percent: u8) -> Result<Self, FillLevelError> {
        if percent > 100 {
            return Err(FillLevelError(i64::from(percent)));
        }
        Ok(Self(percent))
    }

    /// Raw percentage value.
    #[must_use]
    pub fn percent(self) -> u8 {
        self.0
    }

    /// Whether the container needs an alert.
    #[must_use]
    pub fn is_critical(self) -> bool {
        self.0 >= CRITICAL_FILL_LEVEL
    }
}

impl TryFrom<i64> for FillLevel {
    type Error = FillLevelError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        u8::try_from(raw)
            .ok()
            .and_then(|percent| Self::new(percent).ok())
            .ok_or(FillLevelError(raw))
    }
}

impl fmt::Display for FillLevel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}%", self.0)
    }
}

impl Serialize for FillLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.0)
    }
}

impl<'de> Deserialize<'de> for FillLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Self::try_from(raw).map_err(serde::de::Error::custom)
    }
}

fn default_capacity() -> f64 {
    1000.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Waste container at a fixed location.
pub struct CollectionPoint {
    /// Unique identifier; empty on create.
    #[serde(default, skip_serializing_if = "PointId::is_unassigned")]
    pub id: PointId,
    /// Where the container stands; older records may lack it.
    #[serde(default)]
    pub location: Option<Location>,
    /// Waste fraction collected.
    pub waste_type: WasteType,
    /// Container capacity in kg.
    #[serde(default = "default_capacity")]
    pub capacity: f64,
    /// Current fill level.
    pub fill_level: FillLevel,
    /// Operational status.
    pub status: PointStatus,
    /// Time the container was last emptied.
    #[serde(default)]
    pub last_emptied: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
/// Collection urgency of a route stop.
pub enum Priority {
    /// Collect first.
    High,
    /// Normal urgency.
    Medium,
    /// Collect when convenient.
    Low,
}

impl Priority {
    /// Wire value of the priority.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// One stop of a route, referencing a collection point.
pub struct RouteStop {
    /// Referenced point; may dangle when the point was deleted.
    pub point_id: PointId,
    /// Collection urgency.
    pub priority: Priority,
    /// Address copied when the route was generated.
    #[serde(default)]
    pub cached_address: Option<String>,
    /// Waste type copied when the route was generated.
    #[serde(default)]
    pub cached_waste_type: Option<WasteType>,
    /// Volume expected at this stop, in kg.
    #[serde(default)]
    pub cached_capacity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
/// Lifecycle of a route.
pub enum RouteStatus {
    /// Generated, not started.
    Planned,
    /// Vehicle is on the road.
    InProgress,
    /// All stops collected.
    Completed,
}

impl RouteStatus {
    /// Wire value used by the status endpoint.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RouteStatus::Planned => "PLANNED",
            RouteStatus::InProgress => "IN_PROGRESS",
            RouteStatus::Completed => "COMPLETED",
        }
    }

    /// Status following this one in the normal lifecycle.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            RouteStatus::Planned => RouteStatus::InProgress,
            RouteStatus::InProgress | RouteStatus::Completed => RouteStatus::Completed,
        }
    }
}

impl fmt::Display for RouteStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.pad(self.as_str())
    }
}

fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Collection route produced by the optimizer.
pub struct Route {
    /// Unique identifier.
    pub id: RouteId,
    /// Lifecycle status.
    pub status: RouteStatus,
    /// Day the route is scheduled for.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Assigned vehicle.
    #[serde(default)]
    pub vehicle_id: Option<VehicleId>,
    /// Capacity of the assigned vehicle at generation time.
    #[serde(default)]
    pub cached_vehicle_capacity: f64,
    /// Crew assigned to the route.
    #[serde(default, deserialize_with = "nullable_vec")]
    pub employee_ids: Vec<EmployeeId>,
    /// Ordered stops.
    #[serde(default, rename = "pointsToCollect", deserialize_with = "nullable_vec")]
    pub stops: Vec<RouteStop>,
    /// Estimated driving distance in km.
    #[serde(default, rename = "estimatedDistanceKm")]
    pub estimated_distance_km: f64,
    /// Start and end of the route.
    #[serde(default)]
    pub depot_location: Option<Location>,
}

impl Route {
    /// Short identifier suitable for headings (last six characters).
    #[must_use]
    pub fn short_id(&self) -> &str {
        let raw = self.id.0.as_str();
        let cut = raw
            .char_indices()
            .rev()
            .nth(5)
            .map_or(0, |(offset, _)| offset);
        raw.get(cut..).unwrap_or(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
/// Job of an employee.
pub enum Role {
    /// Drives the truck.
    Driver,
    /// Empties containers.
    Collector,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Member of the collection crew.
pub struct Employee {
    /// Unique identifier; empty on create.
    #[serde(default, skip_serializing_if = "EmployeeId::is_unassigned")]
    pub id: EmployeeId,
    /// Full name.
    pub name: String,
    /// Job.
    pub role: Role,
    /// Free for assignment; `false` means currently on a route.
    pub available: bool,
    /// Waste types the employee is trained for.
    #[serde(default, deserialize_with = "nullable_vec")]
    pub competencies: Vec<WasteType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
/// Availability of a vehicle.
pub enum VehicleStatus {
    /// Parked and free.
    Available,
    /// On the road.
    InUse,
    /// In the workshop.
    Maintenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Collection truck.
pub struct Vehicle {
    /// Unique identifier; empty on create.
    #[serde(default, skip_serializing_if = "VehicleId::is_unassigned")]
    pub id: VehicleId,
    /// License plate.
    pub plate_number: String,
    /// Load capacity.
    pub capacity: u32,
    /// Availability.
    pub status: VehicleStatus,
    /// Last known position.
    #[serde(default)]
    pub current_location: Option<Location>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
/// Category of a field incident.
pub enum IncidentType {
    /// Container damaged.
    BinDamaged,
    /// Waste dumped outside a container.
    IllegalDumping,
    /// Truck could not reach the container.
    AccessBlocked,
    /// Truck problem.
    VehicleIssue,
    /// Anything else.
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Incident reported by a driver.
pub struct Incident {
    /// Unique identifier.
    pub id: IncidentId,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Category.
    #[serde(rename = "type")]
    pub kind: IncidentType,
    /// User who reported it.
    #[serde(default)]
    pub reporter_id: Option<String>,
    /// When it was reported.
    #[serde(default)]
    pub date: Option<NaiveDateTime>,
    /// Free-text location, for example `"lat,lon"`.
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Full-container alert computed by the backend.
pub struct Alert {
    /// Alert category, e.g. `FullContainer`.
    pub alert_type: String,
    /// Point the alert is about.
    pub container_id: PointId,
    /// `HIGH` or `MEDIUM`.
    pub priority: String,
    /// Fill level at alert time.
    pub fill_level: u8,
    /// Human-readable message.
    pub message: String,
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(
        duration: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// One sample of backend server health.
pub struct HealthSnapshot {
    /// Heap in use, bytes.
    pub used_memory: u64,
    /// Free heap, bytes.
    pub free_memory: u64,
    /// Maximum allocatable heap, bytes.
    pub max_memory: u64,
    /// Currently reserved heap, bytes.
    #[serde(default)]
    pub total_memory: u64,
    /// One-minute load average; negative when the platform cannot report it.
    pub system_load: f64,
    /// CPU cores available to the server.
    pub available_processors: u32,
    /// Live threads.
    pub active_threads: u32,
    /// Time since server start.
    #[serde(with = "millis")]
    pub uptime: Duration,
}

#[derive(Debug, Clone, Serialize)]
/// Body of `POST /auth/login`.
pub struct LoginRequest {
    /// Account name.
    pub username: String,
    /// Plain password; sent once, never stored.
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
/// Body of `POST /auth/register`.
pub struct RegisterRequest {
    /// Account name.
    pub username: String,
    /// Plain password.
    pub password: String,
    /// Requested role, server default when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
/// Token returned by the auth endpoints.
pub struct AuthResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    /// Role granted to the account.
    pub role: String,
    /// Account name.
    pub username: String,
}
