// Integration tests for `OsrmPathPort` using wiremock.
#![expect(clippy::unwrap_used, clippy::indexing_slicing, reason = "test code")]

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wastewatch_core::model::GeoPoint;
use wastewatch_core::ports::{PathOptions, PathPort, PathRequest, PortError};
use wastewatch_osrm::OsrmPathPort;

const DEPOT: GeoPoint = GeoPoint { lat: 36.8, lon: 10.18 };
const STOP: GeoPoint = GeoPoint { lat: 36.81, lon: 10.17 };

async fn setup() -> (MockServer, OsrmPathPort) {
    let server = MockServer::start().await;
    let port =
        OsrmPathPort::new(&format!("{}/route/v1", server.uri()), Duration::from_secs(5)).unwrap();
    (server, port)
}

fn request() -> PathRequest {
    PathRequest {
        waypoints: vec![DEPOT, STOP, DEPOT],
        options: PathOptions::geometry_only(),
    }
}

#[tokio::test]
async fn decodes_first_route_geometry() {
    let (server, port) = setup().await;

    Mock::given(method("GET"))
        .and(path("/route/v1/driving/10.18,36.8;10.17,36.81;10.18,36.8"))
        .and(query_param("overview", "full"))
        .and(query_param("geometries", "geojson"))
        .and(query_param("alternatives", "false"))
        .and(query_param("steps", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "Ok",
            "routes": [
                {
                    "geometry": {"type": "LineString",
                                 "coordinates": [[10.18, 36.8], [10.175, 36.805], [10.17, 36.81]]},
                    "distance": 2_450.5,
                    "duration": 312.4
                },
                {
                    "geometry": {"type": "LineString", "coordinates": []},
                    "distance": 9_999.0,
                    "duration": 999.0
                }
            ],
            "waypoints": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let geometry = port.compute_path(&request()).await.unwrap();

    assert_eq!(geometry.coordinates.len(), 3);
    assert_eq!(geometry.coordinates[1], GeoPoint { lat: 36.805, lon: 10.175 });
    assert!((geometry.distance_m - 2_450.5).abs() < f64::EPSILON);
    assert_eq!(geometry.duration.as_secs(), 312);
}

#[tokio::test]
async fn no_route_is_a_routing_error() {
    let (server, port) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "NoRoute",
            "message": "Impossible route between points"
        })))
        .mount(&server)
        .await;

    let err = port.compute_path(&request()).await.unwrap_err();

    assert!(
        matches!(&err, PortError::Routing(msg) if msg == "NoRoute Impossible route between points"),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn server_error_without_body_is_a_status_error() {
    let (server, port) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = port.compute_path(&request()).await.unwrap_err();

    assert!(matches!(err, PortError::Status { status: 502, .. }));
}

#[tokio::test]
async fn single_waypoint_is_rejected_without_a_request() {
    let (server, port) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = port
        .compute_path(&PathRequest {
            waypoints: vec![DEPOT],
            options: PathOptions::geometry_only(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, PortError::Routing(_)));
}
