//! Pure reducers producing the counts and percentages shown on the dashboard and statistics
//! screens.

use crate::icon::FillSeverity;
use crate::model::{
    CollectionPoint, Employee, PointStatus, Route, RouteStatus, Vehicle, VehicleStatus,
};

/// Estimated kilograms of waste per fill percent of one container.
const KG_PER_FILL_PERCENT: u64 = 10;

#[expect(clippy::cast_precision_loss, reason = "collection sizes are far below 2^52")]
fn approx(count: usize) -> f64 {
    count as f64
}

/// Share of `count` in `total` as a percentage rounded to one decimal.
///
/// An empty total yields `0.0`.
#[must_use]
pub fn calc_pct(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (approx(count) / approx(total) * 1000.0).round() / 10.0
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
/// Points grouped by fill-level band.
pub struct FillBreakdown {
    /// Number of points considered.
    pub total: usize,
    /// Points at 90% or above.
    pub critical: usize,
    /// Points from 50% to 89%.
    pub warning: usize,
    /// Points below 50%.
    pub normal: usize,
}

impl FillBreakdown {
    /// Count points per band.
    #[must_use]
    pub fn from_points(points: &[CollectionPoint]) -> Self {
        points.iter().fold(
            Self {
                total: points.len(),
                ..Self::default()
            },
            |mut acc, point| {
                match FillSeverity::from_fill_level(point.fill_level.percent()) {
                    FillSeverity::Critical => acc.critical += 1,
                    FillSeverity::Warning => acc.warning += 1,
                    FillSeverity::Normal => acc.normal += 1,
                }
                acc
            },
        )
    }

    /// Percentage of critical points.
    #[must_use]
    pub fn critical_pct(&self) -> f64 {
        calc_pct(self.critical, self.total)
    }

    /// Percentage of warning points.
    #[must_use]
    pub fn warning_pct(&self) -> f64 {
        calc_pct(self.warning, self.total)
    }

    /// Percentage of normal points.
    #[must_use]
    pub fn normal_pct(&self) -> f64 {
        calc_pct(self.normal, self.total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Vehicle availability counts.
pub struct FleetStats {
    /// Vehicles known.
    pub total: usize,
    /// Vehicles on the road.
    pub in_use: usize,
    /// Vehicles parked and free.
    pub available: usize,
    /// Vehicles in the workshop.
    pub maintenance: usize,
}

impl FleetStats {
    /// Count vehicles per status.
    #[must_use]
    pub fn from_vehicles(vehicles: &[Vehicle]) -> Self {
        let count = |status: VehicleStatus| {
            vehicles
                .iter()
                .filter(|vehicle| vehicle.status == status)
                .count()
        };
        Self {
            total: vehicles.len(),
            in_use: count(VehicleStatus::InUse),
            available: count(VehicleStatus::Available),
            maintenance: count(VehicleStatus::Maintenance),
        }
    }

    /// Share of the fleet currently in use.
    #[must_use]
    pub fn utilisation_pct(&self) -> f64 {
        calc_pct(self.in_use, self.total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Route lifecycle counts.
pub struct RouteStats {
    /// Routes known.
    pub total: usize,
    /// Finished routes.
    pub completed: usize,
    /// Routes on the road.
    pub in_progress: usize,
    /// Routes not started.
    pub planned: usize,
}

impl RouteStats {
    /// Count routes per status.
    #[must_use]
    pub fn from_routes(routes: &[Route]) -> Self {
        let count = |status: RouteStatus| {
            routes
                .iter()
                .filter(|route| route.status == status)
                .count()
        };
        Self {
            total: routes.len(),
            completed: count(RouteStatus::Completed),
            in_progress: count(RouteStatus::InProgress),
            planned: count(RouteStatus::Planned),
        }
    }

    /// Share of routes completed.
    #[must_use]
    pub fn completion_pct(&self) -> f64 {
        calc_pct(self.completed, self.total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Crew headcount.
pub struct Workforce {
    /// Employees known.
    pub employees: usize,
    /// Employees currently assigned, i.e. not available.
    pub on_duty: usize,
}

impl Workforce {
    /// Count employees and those on duty.
    #[must_use]
    pub fn from_employees(employees: &[Employee]) -> Self {
        Self {
            employees: employees.len(),
            on_duty: employees.iter().filter(|employee| !employee.available).count(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Headline figures of the dashboard and the exported report.
pub struct DashboardOverview {
    /// Points known.
    pub total_points: usize,
    /// Points in service.
    pub active_points: usize,
    /// Points at or above the critical fill level.
    pub alert_points: usize,
    /// Mean fill level rounded to a whole percent.
    pub avg_fill_level: u64,
    /// Estimated waste in kg.
    pub total_waste_kg: u64,
    /// Estimated CO2 saved in kg.
    pub co2_saved_kg: u64,
}

impl DashboardOverview {
    /// Reduce the point collection to headline figures.
    #[must_use]
    pub fn from_points(points: &[CollectionPoint]) -> Self {
        let fill_sum: u64 = points
            .iter()
            .map(|point| u64::from(point.fill_level.percent()))
            .sum();
        let count = u64::try_from(points.len()).unwrap_or(u64::MAX);
        let avg_fill_level = if count == 0 {
            0
        } else {
            (2 * fill_sum + count) / (2 * count)
        };
        let total_waste_kg = fill_sum * KG_PER_FILL_PERCENT;
        Self {
            total_points: points.len(),
            active_points: points
                .iter()
                .filter(|point| point.status == PointStatus::Active)
                .count(),
            alert_points: points
                .iter()
                .filter(|point| point.fill_level.is_critical())
                .count(),
            avg_fill_level,
            total_waste_kg,
            co2_saved_kg: total_waste_kg.div_ceil(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
/// Everything the statistics screen shows.
pub struct StatisticsReport {
    /// Fill-level bands.
    pub fill: FillBreakdown,
    /// Fleet utilisation.
    pub fleet: FleetStats,
    /// Route performance.
    pub routes: RouteStats,
    /// Crew headcount.
    pub workforce: Workforce,
    /// Mean fill level, whole percent.
    pub avg_fill_level: u64,
}

impl StatisticsReport {
    /// Reduce all four collections at once.
    #[must_use]
    pub fn build(
        points: &[CollectionPoint],
        vehicles: &[Vehicle],
        routes: &[Route],
        employees: &[Employee],
    ) -> Self {
        Self {
            fill: FillBreakdown::from_points(points),
            fleet: FleetStats::from_vehicles(vehicles),
            routes: RouteStats::from_routes(routes),
            workforce: Workforce::from_employees(employees),
            avg_fill_level: DashboardOverview::from_points(points).avg_fill_level,
        }
    }
}
