use std::sync::Arc;
use std::time::Duration;

use wastewatch_core::loadable::Loadable;
use wastewatch_core::routing::PathSlot;
use wastewatch_core::surface::MapSurface;
use wastewatch_core::telemetry::{TelemetryPoller, TelemetryState};
use wastewatch_core::{DashboardData, PathPort, Route, RouteId, StatisticsData, WasteService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Screen {
    Dashboard,
    Map,
    Monitor,
    Statistics,
}

impl Screen {
    pub(crate) const ALL: [Self; 4] = [Self::Dashboard, Self::Map, Self::Monitor, Self::Statistics];

    pub(crate) fn title(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Map => "Map",
            Self::Monitor => "Server",
            Self::Statistics => "Statistics",
        }
    }

    pub(crate) fn next(self) -> Self {
        match self {
            Self::Dashboard => Self::Map,
            Self::Map => Self::Monitor,
            Self::Monitor => Self::Statistics,
            Self::Statistics => Self::Dashboard,
        }
    }

    pub(crate) fn previous(self) -> Self {
        match self {
            Self::Dashboard => Self::Statistics,
            Self::Map => Self::Dashboard,
            Self::Monitor => Self::Map,
            Self::Statistics => Self::Monitor,
        }
    }
}

pub(crate) struct App {
    pub service: Arc<WasteService>,

    pub screen: Screen,

    pub dashboard: Loadable<DashboardData>,
    pub show_all_active: bool,
    pub route_index: usize,
    pub pending_delete: Option<RouteId>,

    pub map: MapSurface,
    pub path: PathSlot,

    pub poll_interval: Duration,
    pub poller: Option<TelemetryPoller>,
    pub telemetry: TelemetryState,

    pub statistics: Loadable<StatisticsData>,

    pub is_loading: bool,
    pub error_message: Option<String>,
    pub notice: Option<String>,
}

impl App {
    pub(crate) fn new(
        service: Arc<WasteService>,
        routing: Arc<dyn PathPort>,
        poll_interval: Duration,
    ) -> Self {
        let path = PathSlot::default();
        let map = MapSurface::new(routing, Arc::new(path.clone()));
        Self {
            service,
            screen: Screen::Dashboard,
            dashboard: Loadable::new(),
            show_all_active: false,
            route_index: 0,
            pending_delete: None,
            map,
            path,
            poll_interval,
            poller: None,
            telemetry: TelemetryState::default(),
            statistics: Loadable::new(),
            is_loading: false,
            error_message: None,
            notice: None,
        }
    }

    /// Change screens. The server monitor polls only while it is visible.
    pub(crate) fn switch_screen(&mut self, screen: Screen) {
        if self.screen == screen {
            return;
        }
        if self.screen == Screen::Monitor {
            self.poller = None;
        }
        if screen == Screen::Monitor {
            let health = Arc::clone(&self.service.backend().health);
            let mut poller = TelemetryPoller::new(health, self.poll_interval);
            poller.activate();
            self.telemetry = poller.state();
            self.poller = Some(poller);
        }
        self.screen = screen;
        self.error_message = None;
        self.pending_delete = None;
    }

    /// Copy the latest health sample out of the poller.
    pub(crate) fn sync_telemetry(&mut self) {
        if let Some(poller) = &self.poller {
            self.telemetry = poller.state();
        }
    }

    pub(crate) fn routes(&self) -> &[Route] {
        self.dashboard
            .data()
            .map(|data| data.routes.as_slice())
            .unwrap_or_default()
    }

    pub(crate) fn selected_route(&self) -> Option<&Route> {
        self.routes().get(self.route_index)
    }

    pub(crate) fn select_previous_route(&mut self) {
        self.route_index = self.route_index.saturating_sub(1);
    }

    pub(crate) fn select_next_route(&mut self) {
        if self.route_index.saturating_add(1) < self.routes().len() {
            self.route_index += 1;
        }
    }

    /// Keep the route cursor inside the list after a reload.
    pub(crate) fn clamp_route_index(&mut self) {
        self.route_index = self
            .route_index
            .min(self.routes().len().saturating_sub(1));
    }

    /// Error to show for the current screen, most recent first.
    pub(crate) fn current_error(&self) -> Option<&str> {
        if let Some(message) = &self.error_message {
            return Some(message);
        }
        match self.screen {
            Screen::Dashboard => self.dashboard.error(),
            Screen::Statistics => self.statistics.error(),
            Screen::Map => None,
            Screen::Monitor => self.telemetry.error.as_deref(),
        }
    }

    /// Whether any load for the current screen is in flight.
    pub(crate) fn busy(&self) -> bool {
        self.is_loading
            || match self.screen {
                Screen::Dashboard => self.dashboard.is_loading(),
                Screen::Statistics => self.statistics.is_loading(),
                Screen::Map | Screen::Monitor => false,
            }
    }
}

#[cfg(test)]
impl App {
    /// App wired to a backend nobody listens on; nothing in here sends a request by itself.
    pub(crate) fn offline() -> Self {
        use wastewatch_api::ApiClient;
        use wastewatch_core::Session;
        use wastewatch_osrm::OsrmPathPort;

        let timeout = Duration::from_millis(200);
        let client = ApiClient::new("http://127.0.0.1:9/api", Session::anonymous(), timeout)
            .expect("client builds");
        let routing =
            OsrmPathPort::new("http://127.0.0.1:9/route/v1", timeout).expect("client builds");
        Self::new(
            Arc::new(WasteService::new(client.into_backend())),
            Arc::new(routing),
            Duration::from_secs(5),
        )
    }

    pub(crate) fn with_routes(mut self, routes: Vec<Route>) -> Self {
        let ticket = self.dashboard.begin();
        let data = DashboardData {
            alerts: Vec::new(),
            points: Vec::new(),
            routes,
            incidents: Vec::new(),
        };
        self.dashboard.settle(ticket, Ok::<_, String>(data));
        self
    }
}

#[cfg(test)]
pub(crate) fn route(id: &str) -> Route {
    use wastewatch_core::RouteStatus;

    Route {
        id: RouteId::from(id),
        status: RouteStatus::Planned,
        date: None,
        vehicle_id: None,
        cached_vehicle_capacity: 0.0,
        employee_ids: Vec::new(),
        stops: Vec::new(),
        estimated_distance_km: 0.0,
        depot_location: None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use wastewatch_core::telemetry::PollPhase;

    use super::*;

    #[test]
    fn screens_cycle_both_ways() {
        for screen in Screen::ALL {
            assert_eq!(screen.next().previous(), screen);
        }
        assert_eq!(Screen::Statistics.next(), Screen::Dashboard);
    }

    #[tokio::test]
    async fn monitor_owns_a_poller_only_while_visible() {
        let mut app = App::offline();

        app.switch_screen(Screen::Monitor);
        let receiver = app
            .poller
            .as_ref()
            .map(TelemetryPoller::subscribe)
            .expect("poller started");
        assert_eq!(receiver.borrow().phase, PollPhase::Polling);

        app.switch_screen(Screen::Statistics);
        assert!(app.poller.is_none(), "poller dropped on leave");
        assert_eq!(receiver.borrow().phase, PollPhase::Stopped);
    }

    #[tokio::test]
    async fn route_cursor_stays_in_bounds() {
        let mut app = App::offline().with_routes(vec![route("r1"), route("r2")]);

        app.select_next_route();
        app.select_next_route();
        assert_eq!(app.selected_route().map(|route| route.id.0.as_str()), Some("r2"));

        app = app.with_routes(vec![route("r1")]);
        app.route_index = 1;
        app.clamp_route_index();
        assert_eq!(app.route_index, 0);

        app.select_previous_route();
        assert_eq!(app.route_index, 0);
    }
}
