//! High-level service facade used by the screens.

use tracing::{debug, info};

use crate::backend::Backend;
use crate::model::{
    Alert, CollectionPoint, Employee, Incident, LoginRequest, RegisterRequest, Route, RouteId,
    RouteStatus, Vehicle,
};
use crate::ports::PortError;
use crate::session::Session;
use crate::stats::{DashboardOverview, StatisticsReport};

/// Number of active routes shown before the list is expanded.
pub const ACTIVE_ROUTES_PREVIEW: usize = 5;
/// Number of recent routes and incidents shown on the dashboard.
pub const RECENT_ITEMS: usize = 5;

#[derive(Debug, Clone, PartialEq, Default)]
/// Everything the dashboard needs, loaded together.
pub struct DashboardData {
    /// Full-container alerts.
    pub alerts: Vec<Alert>,
    /// All collection points.
    pub points: Vec<CollectionPoint>,
    /// All routes.
    pub routes: Vec<Route>,
    /// Reported incidents.
    pub incidents: Vec<Incident>,
}

impl DashboardData {
    /// Headline figures.
    #[must_use]
    pub fn overview(&self) -> DashboardOverview {
        DashboardOverview::from_points(&self.points)
    }

    /// Routes on the road.
    pub fn active_routes(&self) -> impl Iterator<Item = &Route> {
        self.routes
            .iter()
            .filter(|route| route.status == RouteStatus::InProgress)
    }

    /// Active routes to list and how many stay hidden behind the "show more" toggle.
    #[must_use]
    pub fn visible_active_routes(&self, show_all: bool) -> (Vec<&Route>, usize) {
        let active: Vec<&Route> = self.active_routes().collect();
        if show_all || active.len() <= ACTIVE_ROUTES_PREVIEW {
            return (active, 0);
        }
        let hidden = active.len() - ACTIVE_ROUTES_PREVIEW;
        (active.into_iter().take(ACTIVE_ROUTES_PREVIEW).collect(), hidden)
    }

    /// First routes in backend order.
    pub fn recent_routes(&self, limit: usize) -> impl Iterator<Item = &Route> {
        self.routes.iter().take(limit)
    }

    /// First incidents in backend order.
    pub fn recent_incidents(&self, limit: usize) -> impl Iterator<Item = &Incident> {
        self.incidents.iter().take(limit)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
/// Collections behind the statistics screen.
pub struct StatisticsData {
    /// All collection points.
    pub points: Vec<CollectionPoint>,
    /// All employees.
    pub employees: Vec<Employee>,
    /// All vehicles.
    pub vehicles: Vec<Vehicle>,
    /// All routes.
    pub routes: Vec<Route>,
}

impl StatisticsData {
    /// Reduce the collections to the figures on screen.
    #[must_use]
    pub fn report(&self) -> StatisticsReport {
        StatisticsReport::build(&self.points, &self.vehicles, &self.routes, &self.employees)
    }
}

/// Public entry point for loading and mutating backend data.
#[derive(Clone)]
pub struct WasteService {
    backend: Backend,
}

impl WasteService {
    /// Create a new service over the given ports.
    #[must_use]
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// Underlying ports, for operations the service does not wrap.
    #[must_use]
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Load alerts, points, routes and incidents concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first [`PortError`]; nothing is returned when any of the four loads fails.
    pub async fn load_dashboard(&self) -> Result<DashboardData, PortError> {
        let (alerts, points, routes, incidents) = tokio::try_join!(
            self.backend.points.alerts(),
            self.backend.points.list(),
            self.backend.routes.list(),
            self.backend.incidents.list(),
        )?;
        debug!(
            alerts = alerts.len(),
            points = points.len(),
            routes = routes.len(),
            incidents = incidents.len(),
            "dashboard loaded"
        );
        Ok(DashboardData {
            alerts,
            points,
            routes,
            incidents,
        })
    }

    /// Load points, employees, vehicles and routes concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first [`PortError`] of the four loads.
    pub async fn load_statistics(&self) -> Result<StatisticsData, PortError> {
        let (points, employees, vehicles, routes) = tokio::try_join!(
            self.backend.points.list(),
            self.backend.employees.list(),
            self.backend.vehicles.list(),
            self.backend.routes.list(),
        )?;
        Ok(StatisticsData {
            points,
            employees,
            vehicles,
            routes,
        })
    }

    /// Load the two collections a map needs.
    ///
    /// # Errors
    ///
    /// Returns the first [`PortError`] of the two loads.
    pub async fn load_map(&self) -> Result<(Vec<CollectionPoint>, Vec<Route>), PortError> {
        tokio::try_join!(self.backend.points.list(), self.backend.routes.list())
    }

    /// Points the backend considers due for collection.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails.
    pub async fn points_needing_collection(&self) -> Result<Vec<CollectionPoint>, PortError> {
        self.backend.points.needing_collection().await
    }

    /// Ask the optimizer for a new route.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the backend rejects the request.
    pub async fn generate_route(&self) -> Result<Route, PortError> {
        let route = self.backend.routes.generate().await?;
        info!(route = %route.id, stops = route.stops.len(), "route generated");
        Ok(route)
    }

    /// Move a route to `status`.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the backend rejects the change.
    pub async fn set_route_status(
        &self,
        id: &RouteId,
        status: RouteStatus,
    ) -> Result<Route, PortError> {
        let route = self.backend.routes.update_status(id, status).await?;
        info!(route = %id, %status, "route status changed");
        Ok(route)
    }

    /// Move a route one step along its lifecycle.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the backend rejects the change.
    pub async fn advance_route(&self, route: &Route) -> Result<Route, PortError> {
        self.set_route_status(&route.id, route.status.next()).await
    }

    /// Delete a route.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the backend rejects the request.
    pub async fn delete_route(&self, id: &RouteId) -> Result<(), PortError> {
        self.backend.routes.delete(id).await?;
        info!(route = %id, "route deleted");
        Ok(())
    }

    /// Exchange credentials for a session.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the credentials are rejected.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, PortError> {
        let response = self
            .backend
            .auth
            .login(&LoginRequest {
                username: username.to_owned(),
                password: password.to_owned(),
            })
            .await?;
        info!(username = %response.username, role = %response.role, "logged in");
        Ok(Session::from_auth(response))
    }

    /// Create an account and return its session.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the account cannot be created.
    pub async fn register(&self, request: &RegisterRequest) -> Result<Session, PortError> {
        let response = self.backend.auth.register(request).await?;
        info!(username = %response.username, "account registered");
        Ok(Session::from_auth(response))
    }
}
