//! Lifetime management for the single external path drawn on a map surface.
//!
//! The adapter owns at most one [`RoutingHandle`]. Every request releases the previous handle
//! before asking the routing service for new geometry, and every handle is released exactly
//! once: on the next request, on [`RoutingAdapter::release`], or when the adapter is dropped.

use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::icon::LineStyle;
use crate::model::{GeoPoint, RouteId, RouteStatus};
use crate::ports::{PathGeometry, PathOptions, PathPort, PathRequest, PortError};

/// Fewest waypoints worth a request: depot, one stop, depot.
const MIN_WAYPOINTS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
/// Identity of a requested path: the route, its status, and the exact waypoint sequence.
pub struct PathKey {
    /// Route the path belongs to.
    pub route: RouteId,
    /// Status the line is styled for.
    pub status: RouteStatus,
    /// Depot, stops, depot.
    pub waypoints: Vec<GeoPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Opaque number of a routing handle, unique per adapter.
pub struct HandleId(u64);

impl HandleId {
    /// Raw sequence number.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A path as handed to the drawing layer.
pub struct DrawnPath {
    /// Route the path belongs to.
    pub route: RouteId,
    /// Geometry returned by the routing service.
    pub geometry: PathGeometry,
    /// Stroke to draw it with.
    pub style: LineStyle,
}

/// Drawing surface that displays the adapter's path.
pub trait PathLayer: Send + Sync {
    /// Display the path owned by `handle`.
    fn show(&self, handle: HandleId, path: &DrawnPath);

    /// Remove the path owned by `handle`.
    fn clear(&self, handle: HandleId);
}

/// [`PathLayer`] that keeps the single visible path in a shared slot.
#[derive(Debug, Clone, Default)]
pub struct PathSlot {
    inner: Arc<Mutex<Option<(HandleId, DrawnPath)>>>,
}

impl PathSlot {
    /// Copy of the path currently shown, if any.
    #[must_use]
    pub fn current(&self) -> Option<DrawnPath> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(_, path)| path.clone())
    }
}

impl PathLayer for PathSlot {
    fn show(&self, handle: HandleId, path: &DrawnPath) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = Some((handle, path.clone()));
    }

    fn clear(&self, handle: HandleId) {
        let mut slot = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|(shown, _)| *shown == handle) {
            *slot = None;
        }
    }
}

/// Exclusive ownership of one requested or drawn path.
#[derive(Debug)]
pub struct RoutingHandle {
    id: HandleId,
    key: PathKey,
    cancel: CancellationToken,
    shown: bool,
}

impl RoutingHandle {
    /// Handle number.
    #[must_use]
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Path this handle owns.
    #[must_use]
    pub fn key(&self) -> &PathKey {
        &self.key
    }

    /// Whether the geometry reached the drawing layer.
    #[must_use]
    pub fn is_shown(&self) -> bool {
        self.shown
    }
}

#[derive(Debug)]
/// Result of a path request.
pub enum PathOutcome {
    /// Nothing to draw: no depot or no resolvable stop.
    Skipped,
    /// Path drawn under the given handle.
    Drawn(HandleId),
    /// The routing service failed; markers stay, the line is omitted.
    Failed(PortError),
    /// The adapter was shut down while the request was in flight.
    Cancelled,
}

/// Owner of the one external path of a map surface.
pub struct RoutingAdapter {
    port: Arc<dyn PathPort>,
    layer: Arc<dyn PathLayer>,
    scope: CancellationToken,
    current: Option<RoutingHandle>,
    next_id: u64,
}

impl RoutingAdapter {
    /// Create an adapter drawing into `layer` with paths from `port`.
    #[must_use]
    pub fn new(port: Arc<dyn PathPort>, layer: Arc<dyn PathLayer>) -> Self {
        Self {
            port,
            layer,
            scope: CancellationToken::new(),
            current: None,
            next_id: 0,
        }
    }

    /// The live handle, requested or drawn.
    #[must_use]
    pub fn handle(&self) -> Option<&RoutingHandle> {
        self.current.as_ref()
    }

    /// Key of the live handle.
    #[must_use]
    pub fn current_key(&self) -> Option<&PathKey> {
        self.current.as_ref().map(RoutingHandle::key)
    }

    /// Token that cancels the in-flight request and every later one.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.scope.clone()
    }

    /// Release the live handle. Returns whether there was one.
    pub fn release(&mut self) -> bool {
        let Some(handle) = self.current.take() else {
            return false;
        };
        handle.cancel.cancel();
        if handle.shown {
            self.layer.clear(handle.id);
        }
        debug!(handle = handle.id.0, route = %handle.key.route, "released routing handle");
        true
    }

    /// Release the live handle and refuse further requests.
    pub fn shutdown(&mut self) {
        self.scope.cancel();
        self.release();
    }

    /// Replace the current path with one for `key`.
    ///
    /// The previous handle is always released first, even when `key` turns out to have
    /// nothing to draw.
    pub async fn request(&mut self, key: Option<PathKey>, style: LineStyle) -> PathOutcome {
        self.release();

        let Some(key) = key.filter(|key| key.waypoints.len() >= MIN_WAYPOINTS) else {
            return PathOutcome::Skipped;
        };
        if self.scope.is_cancelled() {
            return PathOutcome::Cancelled;
        }

        self.next_id = self.next_id.wrapping_add(1);
        let id = HandleId(self.next_id);
        let cancel = self.scope.child_token();
        let request = PathRequest {
            waypoints: key.waypoints.clone(),
            options: PathOptions::geometry_only(),
        };
        let route = key.route.clone();
        self.current = Some(RoutingHandle {
            id,
            key,
            cancel: cancel.clone(),
            shown: false,
        });
        debug!(handle = id.0, %route, waypoints = request.waypoints.len(), "requesting path");

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = self.port.compute_path(&request) => Some(result),
        };

        match result {
            None => {
                self.release();
                PathOutcome::Cancelled
            }
            Some(Ok(geometry)) => {
                let drawn = DrawnPath {
                    route,
                    geometry,
                    style,
                };
                self.layer.show(id, &drawn);
                if let Some(handle) = self.current.as_mut() {
                    handle.shown = true;
                }
                PathOutcome::Drawn(id)
            }
            Some(Err(err)) => {
                warn!(
                    handle = id.0,
                    %route,
                    error = %err,
                    "path request failed, drawing markers only"
                );
                self.release();
                PathOutcome::Failed(err)
            }
        }
    }
}

impl Drop for RoutingAdapter {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::icon::route_line_style;
    use crate::model::RouteStatus;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Compute(usize),
        Show(u64),
        Clear(u64),
    }

    #[derive(Default)]
    struct Journal {
        events: Mutex<Vec<Event>>,
        shown: Mutex<Vec<u64>>,
        max_shown: Mutex<usize>,
        requests: Mutex<Vec<PathRequest>>,
    }

    impl Journal {
        fn events(&self) -> Vec<Event> {
            self.events.lock().map(|events| events.clone()).unwrap_or_default()
        }

        fn push(&self, event: Event) {
            if let Ok(mut events) = self.events.lock() {
                events.push(event);
            }
        }
    }

    struct RecordingLayer(Arc<Journal>);

    impl PathLayer for RecordingLayer {
        fn show(&self, handle: HandleId, _path: &DrawnPath) {
            self.0.push(Event::Show(handle.get()));
            if let (Ok(mut shown), Ok(mut max)) = (self.0.shown.lock(), self.0.max_shown.lock()) {
                shown.push(handle.get());
                *max = (*max).max(shown.len());
            }
        }

        fn clear(&self, handle: HandleId) {
            self.0.push(Event::Clear(handle.get()));
            if let Ok(mut shown) = self.0.shown.lock() {
                shown.retain(|id| *id != handle.get());
            }
        }
    }

    struct StubPort {
        journal: Arc<Journal>,
        fail: bool,
    }

    #[async_trait]
    impl PathPort for StubPort {
        async fn compute_path(&self, request: &PathRequest) -> Result<PathGeometry, PortError> {
            self.journal.push(Event::Compute(request.waypoints.len()));
            if let Ok(mut requests) = self.journal.requests.lock() {
                requests.push(request.clone());
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            if self.fail {
                return Err(PortError::Routing("no route".to_owned()));
            }
            Ok(PathGeometry {
                coordinates: request.waypoints.clone(),
                distance_m: 1200.0,
                duration: Duration::from_secs(300),
            })
        }
    }

    fn adapter(fail: bool) -> (RoutingAdapter, Arc<Journal>) {
        let journal = Arc::new(Journal::default());
        let port = Arc::new(StubPort {
            journal: Arc::clone(&journal),
            fail,
        });
        let layer = Arc::new(RecordingLayer(Arc::clone(&journal)));
        (RoutingAdapter::new(port, layer), journal)
    }

    fn key(route: &str, stops: usize) -> PathKey {
        let depot = GeoPoint { lat: 36.8, lon: 10.18 };
        let mut waypoints = vec![depot];
        waypoints.extend((0..stops).map(|idx| GeoPoint {
            lat: 36.81 + f64::from(u32::try_from(idx).unwrap_or_default()) / 100.0,
            lon: 10.19,
        }));
        waypoints.push(depot);
        PathKey {
            route: RouteId::from(route),
            status: RouteStatus::InProgress,
            waypoints,
        }
    }

    fn style() -> LineStyle {
        route_line_style(RouteStatus::InProgress)
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_requests_never_overlap() {
        let (mut adapter, journal) = adapter(false);

        let first = adapter.request(Some(key("r1", 2)), style()).await;
        let second = adapter.request(Some(key("r1", 3)), style()).await;

        assert!(matches!(first, PathOutcome::Drawn(_)), "first: {first:?}");
        assert!(matches!(second, PathOutcome::Drawn(_)), "second: {second:?}");
        assert_eq!(
            journal.events(),
            vec![
                Event::Compute(4),
                Event::Show(1),
                Event::Clear(1),
                Event::Compute(5),
                Event::Show(2),
            ]
        );
        assert_eq!(journal.max_shown.lock().map(|max| *max).unwrap_or_default(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn requests_suppress_service_markers() {
        let (mut adapter, journal) = adapter(false);

        adapter.request(Some(key("r1", 1)), style()).await;

        let requests = journal
            .requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default();
        assert_eq!(requests.len(), 1);
        assert!(
            requests.iter().all(|request| request.options == PathOptions::geometry_only()),
            "adapter must only ask for geometry"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_to_draw_releases_and_skips() {
        let (mut adapter, journal) = adapter(false);

        adapter.request(Some(key("r1", 1)), style()).await;
        let outcome = adapter.request(None, style()).await;
        let too_short = adapter
            .request(
                Some(PathKey {
                    route: RouteId::from("r2"),
                    status: RouteStatus::Planned,
                    waypoints: vec![GeoPoint { lat: 1.0, lon: 1.0 }; 2],
                }),
                style(),
            )
            .await;

        assert!(matches!(outcome, PathOutcome::Skipped), "outcome: {outcome:?}");
        assert!(matches!(too_short, PathOutcome::Skipped), "outcome: {too_short:?}");
        assert!(adapter.handle().is_none(), "no live handle after skip");
        assert_eq!(
            journal.events(),
            vec![Event::Compute(3), Event::Show(1), Event::Clear(1)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failure_degrades_to_no_line() {
        let (mut adapter, journal) = adapter(true);

        let outcome = adapter.request(Some(key("r1", 2)), style()).await;

        assert!(
            matches!(outcome, PathOutcome::Failed(PortError::Routing(_))),
            "outcome: {outcome:?}"
        );
        assert!(adapter.handle().is_none(), "failed request leaves no handle");
        assert_eq!(journal.events(), vec![Event::Compute(4)]);
    }

    #[tokio::test(start_paused = true)]
    async fn release_happens_exactly_once() {
        let (mut adapter, journal) = adapter(false);

        adapter.request(Some(key("r1", 2)), style()).await;
        assert!(adapter.release(), "first release frees the handle");
        assert!(!adapter.release(), "second release is a no-op");
        drop(adapter);

        let clears = journal
            .events()
            .into_iter()
            .filter(|event| matches!(event, Event::Clear(_)))
            .count();
        assert_eq!(clears, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_releases_the_live_handle() {
        let (mut adapter, journal) = adapter(false);

        adapter.request(Some(key("r1", 2)), style()).await;
        drop(adapter);

        assert_eq!(journal.events().last(), Some(&Event::Clear(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_in_flight_request() {
        let (mut adapter, journal) = adapter(false);
        let token = adapter.shutdown_token();

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            token.cancel();
        });
        let outcome = adapter.request(Some(key("r1", 2)), style()).await;
        canceller.await.ok();

        assert!(matches!(outcome, PathOutcome::Cancelled), "outcome: {outcome:?}");
        assert!(adapter.handle().is_none(), "cancelled request leaves no handle");
        assert!(
            !journal.events().iter().any(|event| matches!(event, Event::Show(_))),
            "cancelled path must never be shown"
        );
        let again = adapter.request(Some(key("r1", 2)), style()).await;
        assert!(matches!(again, PathOutcome::Cancelled), "shut down adapter refuses work");
    }

    #[test]
    fn path_slot_ignores_clear_for_other_handles() {
        let slot = PathSlot::default();
        let path = DrawnPath {
            route: RouteId::from("r1"),
            geometry: PathGeometry {
                coordinates: Vec::new(),
                distance_m: 0.0,
                duration: Duration::ZERO,
            },
            style: style(),
        };
        slot.show(HandleId(2), &path);
        slot.clear(HandleId(1));
        assert!(slot.current().is_some(), "stale clear must not hide the new path");
        slot.clear(HandleId(2));
        assert!(slot.current().is_none(), "own clear hides the path");
    }
}
