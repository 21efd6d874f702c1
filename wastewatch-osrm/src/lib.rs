//! Path geometry from an OSRM routing server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use wastewatch_core::model::GeoPoint;
use wastewatch_core::ports::{PathGeometry, PathPort, PathRequest, PortError};

/// Public OSRM demo server.
pub const DEFAULT_SERVICE_URL: &str = "https://router.project-osrm.org/route/v1";

const PROFILE: &str = "driving";

/// Response from /route/v1/{profile}/{coordinates}
#[derive(Debug, Deserialize)]
struct RouteResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

/// Single route; only the first one is used
#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: LineString,
    /// meters
    distance: f64,
    /// seconds
    duration: f64,
}

/// `GeoJSON` line string, coordinates as [lon, lat]
#[derive(Debug, Deserialize)]
struct LineString {
    coordinates: Vec<[f64; 2]>,
}

/// [`PathPort`] that asks an OSRM server for driving routes.
pub struct OsrmPathPort {
    client: Client,
    service_url: String,
}

impl OsrmPathPort {
    /// Build a port with its own HTTP client and request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Network`] when the HTTP client cannot be constructed.
    pub fn new(service_url: &str, timeout: Duration) -> Result<Self, PortError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::from_reqwest(service_url, client))
    }

    /// Wrap an existing [`reqwest::Client`].
    #[must_use]
    pub fn from_reqwest(service_url: &str, client: Client) -> Self {
        Self {
            client,
            service_url: service_url.trim_end_matches('/').to_owned(),
        }
    }

    fn url(&self, waypoints: &[GeoPoint]) -> String {
        let coordinates = waypoints
            .iter()
            .map(|point| format!("{},{}", point.lon, point.lat))
            .collect::<Vec<_>>()
            .join(";");
        format!("{}/{PROFILE}/{coordinates}", self.service_url)
    }
}

#[async_trait]
impl PathPort for OsrmPathPort {
    async fn compute_path(&self, request: &PathRequest) -> Result<PathGeometry, PortError> {
        if request.waypoints.len() < 2 {
            return Err(PortError::Routing(
                "at least two waypoints are required".to_owned(),
            ));
        }

        // Markers are drawn client-side; OSRM never returns any.
        let url = self.url(&request.waypoints);
        debug!(%url, "requesting OSRM route");
        let req = self.client.get(url).query(&[
            ("overview", "full"),
            ("geometries", "geojson"),
            ("alternatives", bool_param(request.options.alternatives)),
            ("steps", bool_param(request.options.instructions)),
        ]);

        let resp = req.send().await?;
        let status = resp.status();
        let body = match resp.json::<RouteResponse>().await {
            Ok(body) => body,
            Err(err) if status.is_success() => return Err(err.into()),
            Err(_) => {
                return Err(PortError::Status {
                    status: status.as_u16(),
                    context: "Routing request failed",
                });
            }
        };

        if body.code != "Ok" {
            let detail = body.message.unwrap_or_default();
            return Err(PortError::Routing(format!("{} {detail}", body.code).trim_end().to_owned()));
        }

        let route = body
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| PortError::Routing("NoRoute".to_owned()))?;

        Ok(PathGeometry {
            coordinates: route
                .geometry
                .coordinates
                .into_iter()
                .map(|[lon, lat]| GeoPoint { lat, lon })
                .collect(),
            distance_m: route.distance,
            duration: Duration::try_from_secs_f64(route.duration).unwrap_or_default(),
        })
    }
}

fn bool_param(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_lists_lon_lat_pairs_in_order() {
        let port = OsrmPathPort::from_reqwest("http://osrm.local/route/v1/", Client::new());
        let url = port.url(&[
            GeoPoint { lat: 36.8, lon: 10.18 },
            GeoPoint { lat: 36.81, lon: 10.17 },
        ]);
        assert_eq!(url, "http://osrm.local/route/v1/driving/10.18,36.8;10.17,36.81");
    }
}
