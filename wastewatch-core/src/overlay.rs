//! Merges points and routes into one consistent set of map layers.
//!
//! A point referenced by any route stop is *claimed*: it is drawn only as a numbered stop of
//! that route. Everything else is *free* and drawn with a fill-level marker. The result is a
//! fresh [`LayerSet`] on every call; nothing is patched in place.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::icon::{IconDescriptor, depot_icon, point_icon, route_stop_icon};
use crate::model::{CollectionPoint, GeoPoint, PointId, Priority, Route, RouteId, RouteStatus};
use crate::routing::PathKey;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Identity of a marker, stable across recomputations.
pub enum MarkerKey {
    /// Free collection point.
    Point(PointId),
    /// Depot of a route.
    Depot(RouteId),
    /// Stop of a route.
    Stop {
        /// Owning route.
        route: RouteId,
        /// Referenced point.
        point: PointId,
    },
}

#[derive(Debug, Clone, PartialEq)]
/// One marker ready to draw.
pub struct Marker {
    /// Stable identity.
    pub key: MarkerKey,
    /// Where to draw it.
    pub position: GeoPoint,
    /// How to draw it.
    pub icon: IconDescriptor,
    /// Popup heading.
    pub title: String,
    /// Popup body lines.
    pub details: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
/// A resolved stop of a route plan.
pub struct StopWaypoint {
    /// Zero-based position in the route's stop list, gaps included.
    pub index: usize,
    /// Referenced point.
    pub point_id: PointId,
    /// Point coordinate.
    pub position: GeoPoint,
    /// Collection urgency.
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq)]
/// Waypoint sequence for one route.
pub struct RoutePlan {
    /// Route identity.
    pub route_id: RouteId,
    /// Route status, used for line styling.
    pub status: RouteStatus,
    /// Depot coordinate, when the route has one.
    pub depot: Option<GeoPoint>,
    /// Stops that resolved to a located point, in stop-list order.
    pub stops: Vec<StopWaypoint>,
}

impl RoutePlan {
    /// Depot, stops, depot; `None` when there is no depot or no resolvable stop.
    #[must_use]
    pub fn waypoints(&self) -> Option<Vec<GeoPoint>> {
        let depot = self.depot?;
        if self.stops.is_empty() {
            return None;
        }
        let mut waypoints = Vec::with_capacity(self.stops.len().saturating_add(2));
        waypoints.push(depot);
        waypoints.extend(self.stops.iter().map(|stop| stop.position));
        waypoints.push(depot);
        Some(waypoints)
    }

    /// Identity of the path this plan would draw.
    #[must_use]
    pub fn path_key(&self) -> Option<PathKey> {
        self.waypoints().map(|waypoints| PathKey {
            route: self.route_id.clone(),
            status: self.status,
            waypoints,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A route stop that could not be placed on the map.
pub enum StaleReference {
    /// The referenced point no longer exists.
    MissingPoint {
        /// Owning route.
        route: RouteId,
        /// Dangling reference.
        point: PointId,
        /// Zero-based stop position.
        index: usize,
    },
    /// The point exists but has no location.
    Unlocated {
        /// Owning route.
        route: RouteId,
        /// Point without coordinates.
        point: PointId,
        /// Zero-based stop position.
        index: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
/// Everything the map draws for one pair of point and route collections.
pub struct LayerSet {
    /// Points referenced by at least one route.
    pub claimed: BTreeSet<PointId>,
    /// Points not referenced by any route, in input order.
    pub free: Vec<CollectionPoint>,
    /// Markers for located free points.
    pub point_markers: Vec<Marker>,
    /// One marker per route with a depot.
    pub depot_markers: Vec<Marker>,
    /// Numbered stop markers, route by route.
    pub stop_markers: Vec<Marker>,
    /// Waypoint plans, one per route, in input order.
    pub plans: Vec<RoutePlan>,
    /// Stops skipped because their point could not be placed.
    pub stale: Vec<StaleReference>,
}

impl LayerSet {
    /// All markers in draw order: free points, depots, then stops on top.
    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.point_markers
            .iter()
            .chain(self.depot_markers.iter())
            .chain(self.stop_markers.iter())
    }

    /// Plan of the given route.
    #[must_use]
    pub fn plan(&self, route: &RouteId) -> Option<&RoutePlan> {
        self.plans.iter().find(|plan| &plan.route_id == route)
    }

    /// Whether the point is drawn as part of a route.
    #[must_use]
    pub fn is_claimed(&self, point: &PointId) -> bool {
        self.claimed.contains(point)
    }
}

/// Build the layer set for the given points and routes.
///
/// Claiming ignores route status: a completed route still claims its points.
#[must_use]
pub fn reconcile(points: &[CollectionPoint], routes: &[Route]) -> LayerSet {
    let mut by_id: HashMap<&PointId, &CollectionPoint> = HashMap::with_capacity(points.len());
    for point in points {
        by_id.entry(&point.id).or_insert(point);
    }

    // Stops pointing at unknown ids are reported as stale, never claimed.
    let claimed: BTreeSet<PointId> = routes
        .iter()
        .flat_map(|route| route.stops.iter())
        .filter(|stop| by_id.contains_key(&stop.point_id))
        .map(|stop| stop.point_id.clone())
        .collect();

    let free: Vec<CollectionPoint> = points
        .iter()
        .filter(|point| !claimed.contains(&point.id))
        .cloned()
        .collect();

    let point_markers = free.iter().filter_map(free_point_marker).collect();

    let mut layers = LayerSet {
        claimed,
        free,
        point_markers,
        ..LayerSet::default()
    };

    for route in routes {
        let depot = route.depot_location.as_ref().map(|location| {
            layers.depot_markers.push(Marker {
                key: MarkerKey::Depot(route.id.clone()),
                position: location.geo(),
                icon: depot_icon(),
                title: "Depot".to_owned(),
                details: vec![
                    location.address_or_na().to_owned(),
                    format!("Route status: {}", route.status),
                ],
            });
            location.geo()
        });

        let mut stops = Vec::with_capacity(route.stops.len());
        for (index, stop) in route.stops.iter().enumerate() {
            let Some(point) = by_id.get(&stop.point_id) else {
                debug!(
                    route = %route.id,
                    point = %stop.point_id,
                    index,
                    "route stop references a missing point"
                );
                layers.stale.push(StaleReference::MissingPoint {
                    route: route.id.clone(),
                    point: stop.point_id.clone(),
                    index,
                });
                continue;
            };
            let Some(location) = point.location.as_ref() else {
                debug!(
                    route = %route.id,
                    point = %stop.point_id,
                    index,
                    "route stop point has no location"
                );
                layers.stale.push(StaleReference::Unlocated {
                    route: route.id.clone(),
                    point: stop.point_id.clone(),
                    index,
                });
                continue;
            };

            layers.stop_markers.push(Marker {
                key: MarkerKey::Stop {
                    route: route.id.clone(),
                    point: stop.point_id.clone(),
                },
                position: location.geo(),
                icon: route_stop_icon(index),
                title: format!("Stop #{} - {}", index.saturating_add(1), point.waste_type),
                details: vec![
                    location.address_or_na().to_owned(),
                    format!("Fill level: {}", point.fill_level),
                    format!("Priority: {}", stop.priority.as_str()),
                ],
            });
            stops.push(StopWaypoint {
                index,
                point_id: stop.point_id.clone(),
                position: location.geo(),
                priority: stop.priority,
            });
        }

        layers.plans.push(RoutePlan {
            route_id: route.id.clone(),
            status: route.status,
            depot,
            stops,
        });
    }

    debug!(
        free = layers.free.len(),
        claimed = layers.claimed.len(),
        routes = layers.plans.len(),
        stale = layers.stale.len(),
        "reconciled map layers"
    );
    layers
}

fn free_point_marker(point: &CollectionPoint) -> Option<Marker> {
    let location = point.location.as_ref()?;
    Some(Marker {
        key: MarkerKey::Point(point.id.clone()),
        position: location.geo(),
        icon: point_icon(point.fill_level.percent()),
        title: format!("{} Container", point.waste_type),
        details: vec![
            location.address_or_na().to_owned(),
            format!("Fill level: {}", point.fill_level),
            format!("Status: {}", point.status.as_str()),
        ],
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::icon::IconKind;
    use crate::model::{FillLevel, Location, PointStatus, RouteStop, WasteType};

    fn point(id: &str, fill: u8, lat: f64) -> CollectionPoint {
        CollectionPoint {
            id: PointId::from(id),
            location: Some(Location {
                latitude: lat,
                longitude: 10.0,
                address: Some(format!("{id} street")),
            }),
            waste_type: WasteType::General,
            capacity: 1000.0,
            fill_level: FillLevel::new(fill).unwrap_or_default(),
            status: PointStatus::Active,
            last_emptied: None,
        }
    }

    fn route(id: &str, status: RouteStatus, stops: &[&str], depot: bool) -> Route {
        Route {
            id: RouteId::from(id),
            status,
            date: None,
            vehicle_id: None,
            cached_vehicle_capacity: 0.0,
            employee_ids: Vec::new(),
            stops: stops
                .iter()
                .map(|stop| RouteStop {
                    point_id: PointId::from(*stop),
                    priority: Priority::High,
                    cached_address: None,
                    cached_waste_type: None,
                    cached_capacity: 0.0,
                })
                .collect(),
            estimated_distance_km: 0.0,
            depot_location: depot.then(|| Location {
                latitude: 36.0,
                longitude: 10.0,
                address: Some("Depot".to_owned()),
            }),
        }
    }

    #[test]
    fn one_claimed_point_yields_one_numbered_stop() {
        let points = vec![point("p1", 95, 1.0), point("p2", 60, 2.0), point("p3", 10, 3.0)];
        let routes = vec![route("r1", RouteStatus::InProgress, &["p1"], true)];

        let layers = reconcile(&points, &routes);

        let free_ids: Vec<&str> = layers.free.iter().map(|point| point.id.0.as_str()).collect();
        assert_eq!(free_ids, vec!["p2", "p3"]);
        assert_eq!(layers.claimed, BTreeSet::from([PointId::from("p1")]));
        assert_eq!(layers.stop_markers.len(), 1);
        let stop = layers.stop_markers.first().expect("one stop marker");
        assert_eq!(stop.icon.label.as_deref(), Some("1"));
        assert_eq!(
            stop.key,
            MarkerKey::Stop {
                route: RouteId::from("r1"),
                point: PointId::from("p1"),
            }
        );
    }

    #[test]
    fn claimed_and_free_partition_the_input() {
        let points: Vec<_> = (0..8)
            .map(|idx| point(&format!("p{idx}"), 40, f64::from(idx)))
            .collect();
        let routes = vec![
            route("r1", RouteStatus::Planned, &["p1", "p3"], true),
            route("r2", RouteStatus::Completed, &["p3", "p6", "ghost"], false),
        ];

        let layers = reconcile(&points, &routes);

        let free: HashSet<&PointId> = layers.free.iter().map(|point| &point.id).collect();
        let claimed: HashSet<&PointId> = layers.claimed.iter().collect();
        let input: HashSet<&PointId> = points.iter().map(|point| &point.id).collect();

        assert!(free.is_disjoint(&claimed), "free and claimed overlap");
        assert!(claimed.is_subset(&input), "claimed holds ids outside the input");
        let union: HashSet<&PointId> = free.union(&claimed).copied().collect();
        assert_eq!(union, input);
    }

    #[test]
    fn unknown_stop_ids_are_stale_not_claimed() {
        let points = vec![point("p1", 10, 1.0)];
        let routes = vec![route("r1", RouteStatus::Planned, &["p1", "ghost"], true)];

        let layers = reconcile(&points, &routes);

        assert_eq!(layers.claimed, BTreeSet::from([PointId::from("p1")]));
        assert!(!layers.is_claimed(&PointId::from("ghost")));
        assert_eq!(
            layers.stale,
            vec![StaleReference::MissingPoint {
                route: RouteId::from("r1"),
                point: PointId::from("ghost"),
                index: 1,
            }]
        );
    }

    #[test]
    fn completed_routes_still_claim_their_points() {
        let points = vec![point("p1", 10, 1.0)];
        let routes = vec![route("done", RouteStatus::Completed, &["p1"], true)];

        let layers = reconcile(&points, &routes);

        assert!(layers.free.is_empty(), "completed route must still claim p1");
        assert!(layers.point_markers.is_empty(), "no free marker for a claimed point");
    }

    #[test]
    fn stale_stop_is_skipped_but_keeps_numbering() {
        let points = vec![point("p1", 10, 1.0), point("p3", 10, 3.0)];
        let routes = vec![route("r1", RouteStatus::InProgress, &["p1", "gone", "p3"], true)];

        let layers = reconcile(&points, &routes);

        let labels: Vec<_> = layers
            .stop_markers
            .iter()
            .filter_map(|marker| marker.icon.label.clone())
            .collect();
        assert_eq!(labels, vec!["1".to_owned(), "3".to_owned()]);
        assert_eq!(
            layers.stale,
            vec![StaleReference::MissingPoint {
                route: RouteId::from("r1"),
                point: PointId::from("gone"),
                index: 1,
            }]
        );
        let waypoints = layers
            .plan(&RouteId::from("r1"))
            .and_then(RoutePlan::waypoints)
            .expect("route has a drawable plan");
        assert_eq!(waypoints.len(), 4, "depot, p1, p3, depot");
    }

    #[test]
    fn one_depot_marker_per_route_without_dedup() {
        let points = vec![point("p1", 10, 1.0)];
        let routes = vec![
            route("r1", RouteStatus::Planned, &[], true),
            route("r2", RouteStatus::Planned, &[], true),
            route("r3", RouteStatus::Planned, &[], false),
        ];

        let layers = reconcile(&points, &routes);

        let keys: Vec<_> = layers.depot_markers.iter().map(|marker| marker.key.clone()).collect();
        assert_eq!(
            keys,
            vec![MarkerKey::Depot(RouteId::from("r1")), MarkerKey::Depot(RouteId::from("r2"))]
        );
        assert!(layers.plans.iter().all(|plan| plan.waypoints().is_none()), "no stops, no path");
    }

    #[test]
    fn free_markers_follow_fill_level() {
        let points = vec![point("p1", 95, 1.0), point("p2", 60, 2.0)];
        let layers = reconcile(&points, &[]);

        let kinds: Vec<_> = layers.point_markers.iter().map(|marker| marker.icon.kind).collect();
        assert_eq!(
            kinds,
            vec![
                IconKind::Point(crate::icon::FillSeverity::Critical),
                IconKind::Point(crate::icon::FillSeverity::Warning),
            ]
        );
    }

    #[test]
    fn reconcile_is_deterministic() {
        let points = vec![point("p2", 60, 2.0), point("p1", 95, 1.0), point("p3", 10, 3.0)];
        let routes = vec![
            route("r2", RouteStatus::Planned, &["p3", "p1"], true),
            route("r1", RouteStatus::InProgress, &["p2"], false),
        ];

        assert_eq!(reconcile(&points, &routes), reconcile(&points, &routes));
    }
}
