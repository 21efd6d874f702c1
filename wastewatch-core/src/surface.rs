//! The map view: reconciled layers plus the one routed path of the selected route.

use std::sync::Arc;

use tracing::debug;

use crate::icon::route_line_style;
use crate::model::{CollectionPoint, Route, RouteId, RouteStatus};
use crate::overlay::{LayerSet, RoutePlan, reconcile};
use crate::ports::{PathPort, PortError};
use crate::routing::{PathLayer, PathOutcome, RoutingAdapter};
use crate::service::WasteService;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
/// What the map shows instead of, or next to, the path line.
pub enum PathNote {
    /// No route selected or nothing drawable.
    #[default]
    None,
    /// Path line is on screen.
    Drawn,
    /// Routing service failed; markers only.
    Unavailable(String),
}

/// Map view owning its layers and routing adapter.
///
/// Marker layers are rebuilt synchronously on every [`MapSurface::apply`]. The path line is
/// brought in line with the selection by [`MapSurface::sync_path`], which only talks to the
/// routing service when the selected waypoints or the route status actually changed.
pub struct MapSurface {
    points: Vec<CollectionPoint>,
    routes: Vec<Route>,
    layers: LayerSet,
    selected: Option<RouteId>,
    pinned: bool,
    adapter: RoutingAdapter,
    note: PathNote,
}

impl MapSurface {
    /// Empty surface drawing paths from `port` into `layer`.
    #[must_use]
    pub fn new(port: Arc<dyn PathPort>, layer: Arc<dyn PathLayer>) -> Self {
        Self {
            points: Vec::new(),
            routes: Vec::new(),
            layers: LayerSet::default(),
            selected: None,
            pinned: false,
            adapter: RoutingAdapter::new(port, layer),
            note: PathNote::None,
        }
    }

    /// Replace the data and rebuild every layer.
    ///
    /// A route picked with [`MapSurface::select`] stays selected while it still exists;
    /// otherwise the first route with something to draw is selected.
    pub fn apply(&mut self, points: Vec<CollectionPoint>, routes: Vec<Route>) {
        self.layers = reconcile(&points, &routes);
        self.points = points;
        self.routes = routes;

        let still_there = self
            .selected
            .as_ref()
            .is_some_and(|id| self.layers.plan(id).is_some());
        if !(self.pinned && still_there) {
            self.pinned = false;
            self.selected = self.default_selection();
        }
        debug!(selected = ?self.selected, "map layers applied");
    }

    /// Load points and routes, then apply them and sync the path.
    ///
    /// # Errors
    ///
    /// Returns the [`PortError`] of a failed load; the previous layers stay untouched.
    pub async fn refresh(&mut self, service: &WasteService) -> Result<(), PortError> {
        let (points, routes) = service.load_map().await?;
        self.apply(points, routes);
        self.sync_path().await;
        Ok(())
    }

    fn default_selection(&self) -> Option<RouteId> {
        self.layers
            .plans
            .iter()
            .find(|plan| plan.waypoints().is_some())
            .map(|plan| plan.route_id.clone())
    }

    /// Pin the path to `route`, or go back to the default selection with `None`.
    pub fn select(&mut self, route: Option<RouteId>) {
        match route.filter(|id| self.layers.plan(id).is_some()) {
            Some(id) => {
                self.selected = Some(id);
                self.pinned = true;
            }
            None => {
                self.pinned = false;
                self.selected = self.default_selection();
            }
        }
    }

    /// Pin the next route in list order, wrapping around.
    pub fn select_next(&mut self) {
        let plans = &self.layers.plans;
        let next = match self
            .selected
            .as_ref()
            .and_then(|id| plans.iter().position(|plan| &plan.route_id == id))
        {
            Some(position) => plans.iter().cycle().nth(position.saturating_add(1)),
            None => plans.first(),
        };
        let next = next.map(|plan| plan.route_id.clone());
        self.select(next);
    }

    /// Bring the path line in line with the selected route.
    ///
    /// Returns `None` when the drawn path already matches the selection.
    pub async fn sync_path(&mut self) -> Option<PathOutcome> {
        let target = self.selected_plan().and_then(RoutePlan::path_key);
        let drawn = self.adapter.handle().filter(|handle| handle.is_shown());
        if drawn.is_some_and(|handle| Some(handle.key()) == target.as_ref()) {
            return None;
        }
        if target.is_none() && self.adapter.handle().is_none() {
            self.note = PathNote::None;
            return None;
        }

        let status = target.as_ref().map_or(RouteStatus::Planned, |key| key.status);
        let style = route_line_style(status);
        let outcome = self.adapter.request(target, style).await;
        self.note = match &outcome {
            PathOutcome::Drawn(_) => PathNote::Drawn,
            PathOutcome::Failed(err) => PathNote::Unavailable(err.to_string()),
            PathOutcome::Skipped | PathOutcome::Cancelled => PathNote::None,
        };
        Some(outcome)
    }

    /// Release the path and refuse further routing work.
    pub fn teardown(&mut self) {
        self.adapter.shutdown();
        self.note = PathNote::None;
    }

    /// Current layers.
    #[must_use]
    pub fn layers(&self) -> &LayerSet {
        &self.layers
    }

    /// Points the layers were built from.
    #[must_use]
    pub fn points(&self) -> &[CollectionPoint] {
        &self.points
    }

    /// Routes the layers were built from.
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Selected route, if any.
    #[must_use]
    pub fn selected(&self) -> Option<&RouteId> {
        self.selected.as_ref()
    }

    /// Plan of the selected route.
    #[must_use]
    pub fn selected_plan(&self) -> Option<&RoutePlan> {
        self.selected.as_ref().and_then(|id| self.layers.plan(id))
    }

    /// Status of the path line.
    #[must_use]
    pub fn path_note(&self) -> &PathNote {
        &self.note
    }
}

impl Drop for MapSurface {
    fn drop(&mut self) {
        self.teardown();
    }
}
