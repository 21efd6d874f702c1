//! REST client for the waste-management backend.
//!
//! [`ApiClient`] implements every backend port of `wastewatch-core` on top of one
//! [`reqwest::Client`]. The bearer token comes from the [`Session`] handed in at construction.
//! Entity ids travel as percent-encoded path segments.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, Url, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use wastewatch_core::{
    Alert, AuthPort, AuthResponse, Backend, CollectionPoint, Employee, EmployeeId, EmployeePort,
    HealthPort, HealthSnapshot, Incident, IncidentPort, LoginRequest, PointId, PointPort,
    PortError, RegisterRequest, Route, RouteId, RoutePort, RouteStatus, Session, Vehicle,
    VehicleId, VehiclePort,
};

/// Backend address used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8086/api";

/// HTTP implementation of the backend ports.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    session: Session,
}

impl ApiClient {
    /// Build a client with its own connection pool and request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Network`] when the HTTP client cannot be constructed and
    /// [`PortError::Internal`] when `base_url` is not a usable base URL.
    pub fn new(base_url: &str, session: Session, timeout: Duration) -> Result<Self, PortError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("wastewatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::from_reqwest(base_url, client, session)
    }

    /// Wrap an existing [`reqwest::Client`].
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Internal`] when `base_url` does not parse or cannot carry a path.
    pub fn from_reqwest(
        base_url: &str,
        client: Client,
        session: Session,
    ) -> Result<Self, PortError> {
        let parsed = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|err| PortError::Internal(format!("invalid backend URL {base_url}: {err}")))?;
        if parsed.cannot_be_a_base() {
            return Err(PortError::Internal(format!(
                "backend URL {base_url} cannot carry a path"
            )));
        }
        Ok(Self {
            client,
            base_url: parsed,
            session,
        })
    }

    /// Same connection pool, different session.
    #[must_use]
    pub fn with_session(&self, session: Session) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            session,
        }
    }

    /// Session attached to outgoing requests.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Port bundle backed by this client.
    #[must_use]
    pub fn into_backend(self) -> Backend {
        Backend::from_client(&Arc::new(self))
    }

    /// Base URL with `segments` appended, each one percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, PortError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                PortError::Internal(format!("backend URL {} cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, PortError> {
        let url = self.endpoint(segments)?;
        debug!(%method, %url, "backend request");
        let req = self.client.request(method, url);
        Ok(match self.session.bearer() {
            Some(bearer) => req.header(header::AUTHORIZATION, bearer),
            None => req,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        context: &'static str,
    ) -> Result<T, PortError> {
        fetch_json(self.request(Method::GET, segments)?, context).await
    }

    async fn send_json<B, T>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
        context: &'static str,
    ) -> Result<T, PortError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        fetch_json(self.request(method, segments)?.json(body), context).await
    }

    async fn delete_at(&self, segments: &[&str], context: &'static str) -> Result<(), PortError> {
        send_checked(self.request(Method::DELETE, segments)?, context).await?;
        Ok(())
    }
}

#[async_trait]
impl PointPort for ApiClient {
    async fn list(&self) -> Result<Vec<CollectionPoint>, PortError> {
        self.get_json(&["points"], "Failed to fetch collection points").await
    }

    async fn get(&self, id: &PointId) -> Result<CollectionPoint, PortError> {
        self.get_json(&["points", id.0.as_str()], "Failed to fetch collection point")
            .await
    }

    async fn create(&self, point: &CollectionPoint) -> Result<CollectionPoint, PortError> {
        self.send_json(Method::POST, &["points"], point, "Failed to create collection point")
            .await
    }

    async fn update(
        &self,
        id: &PointId,
        point: &CollectionPoint,
    ) -> Result<CollectionPoint, PortError> {
        self.send_json(
            Method::PUT,
            &["points", id.0.as_str()],
            point,
            "Failed to update collection point",
        )
        .await
    }

    async fn delete(&self, id: &PointId) -> Result<(), PortError> {
        self.delete_at(&["points", id.0.as_str()], "Failed to delete collection point").await
    }

    async fn alerts(&self) -> Result<Vec<Alert>, PortError> {
        self.get_json(&["points", "alerts"], "Failed to fetch alerts").await
    }

    async fn needing_collection(&self) -> Result<Vec<CollectionPoint>, PortError> {
        self.get_json(
            &["points", "needing-collection"],
            "Failed to fetch points needing collection",
        )
        .await
    }
}

#[async_trait]
impl RoutePort for ApiClient {
    async fn list(&self) -> Result<Vec<Route>, PortError> {
        self.get_json(&["routes"], "Failed to fetch routes").await
    }

    async fn generate(&self) -> Result<Route, PortError> {
        fetch_json(
            self.request(Method::POST, &["routes", "generate"])?,
            "Failed to generate route",
        )
        .await
    }

    async fn update_status(&self, id: &RouteId, status: RouteStatus) -> Result<Route, PortError> {
        let req = self
            .request(Method::PATCH, &["routes", id.0.as_str(), "status"])?
            .query(&[("status", status.as_str())]);
        fetch_json(req, "Failed to update route status").await
    }

    async fn delete(&self, id: &RouteId) -> Result<(), PortError> {
        self.delete_at(&["routes", id.0.as_str()], "Failed to delete route").await
    }
}

#[async_trait]
impl EmployeePort for ApiClient {
    async fn list(&self) -> Result<Vec<Employee>, PortError> {
        self.get_json(&["employees"], "Failed to fetch employees").await
    }

    async fn create(&self, employee: &Employee) -> Result<Employee, PortError> {
        self.send_json(Method::POST, &["employees"], employee, "Failed to create employee")
            .await
    }

    async fn update(&self, id: &EmployeeId, employee: &Employee) -> Result<Employee, PortError> {
        self.send_json(
            Method::PUT,
            &["employees", id.0.as_str()],
            employee,
            "Failed to update employee",
        )
        .await
    }

    async fn delete(&self, id: &EmployeeId) -> Result<(), PortError> {
        self.delete_at(&["employees", id.0.as_str()], "Failed to delete employee").await
    }
}

#[async_trait]
impl VehiclePort for ApiClient {
    async fn list(&self) -> Result<Vec<Vehicle>, PortError> {
        self.get_json(&["vehicles"], "Failed to fetch vehicles").await
    }

    async fn create(&self, vehicle: &Vehicle) -> Result<Vehicle, PortError> {
        self.send_json(Method::POST, &["vehicles"], vehicle, "Failed to create vehicle")
            .await
    }

    async fn update(&self, id: &VehicleId, vehicle: &Vehicle) -> Result<Vehicle, PortError> {
        self.send_json(
            Method::PUT,
            &["vehicles", id.0.as_str()],
            vehicle,
            "Failed to update vehicle",
        )
        .await
    }

    async fn delete(&self, id: &VehicleId) -> Result<(), PortError> {
        self.delete_at(&["vehicles", id.0.as_str()], "Failed to delete vehicle").await
    }
}

#[async_trait]
impl IncidentPort for ApiClient {
    async fn list(&self) -> Result<Vec<Incident>, PortError> {
        self.get_json(&["incidents"], "Failed to fetch incidents").await
    }
}

#[async_trait]
impl HealthPort for ApiClient {
    async fn health(&self) -> Result<HealthSnapshot, PortError> {
        self.get_json(&["monitoring", "health"], "Failed to fetch server health")
            .await
    }
}

#[async_trait]
impl AuthPort for ApiClient {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, PortError> {
        self.send_json(Method::POST, &["auth", "login"], request, "Login failed")
            .await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, PortError> {
        self.send_json(Method::POST, &["auth", "register"], request, "Registration failed")
            .await
    }
}

// Send a request and turn non-success statuses into `PortError::Status`.
async fn send_checked(
    req: RequestBuilder,
    context: &'static str,
) -> Result<Response, PortError> {
    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(PortError::Status {
            status: status.as_u16(),
            context,
        });
    }
    Ok(resp)
}

async fn fetch_json<T: DeserializeOwned>(
    req: RequestBuilder,
    context: &'static str,
) -> Result<T, PortError> {
    send_checked(req, context)
        .await?
        .json()
        .await
        .map_err(PortError::from)
}
