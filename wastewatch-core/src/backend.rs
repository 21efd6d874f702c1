//! Bundle of the backend ports a [`crate::service::WasteService`] talks to.

use std::sync::Arc;

use crate::ports::{
    AuthPort, EmployeePort, HealthPort, IncidentPort, PointPort, RoutePort, VehiclePort,
};

/// One implementation per backend resource.
///
/// Each port is held separately so tests can replace a single resource; production code builds
/// the bundle from one client with [`Backend::from_client`].
#[derive(Clone)]
pub struct Backend {
    /// Collection points and alerts.
    pub points: Arc<dyn PointPort>,
    /// Routes and the optimizer trigger.
    pub routes: Arc<dyn RoutePort>,
    /// Crew.
    pub employees: Arc<dyn EmployeePort>,
    /// Fleet.
    pub vehicles: Arc<dyn VehiclePort>,
    /// Field incidents.
    pub incidents: Arc<dyn IncidentPort>,
    /// Server health.
    pub health: Arc<dyn HealthPort>,
    /// Login and registration.
    pub auth: Arc<dyn AuthPort>,
}

impl Backend {
    /// Use one client for every resource.
    #[must_use]
    pub fn from_client<C>(client: &Arc<C>) -> Self
    where
        C: PointPort
            + RoutePort
            + EmployeePort
            + VehiclePort
            + IncidentPort
            + HealthPort
            + AuthPort
            + 'static,
    {
        Self {
            points: Arc::<C>::clone(client),
            routes: Arc::<C>::clone(client),
            employees: Arc::<C>::clone(client),
            vehicles: Arc::<C>::clone(client),
            incidents: Arc::<C>::clone(client),
            health: Arc::<C>::clone(client),
            auth: Arc::<C>::clone(client),
        }
    }
}
