//! Plain-text system report built from a dashboard load.

use std::fmt;

use chrono::NaiveDateTime;

use crate::service::DashboardData;

/// Routes listed in the report.
const REPORT_ROUTES: usize = 10;

/// Printable report; render it with [`ToString::to_string`] or `write!`.
#[derive(Debug, Clone, Copy)]
pub struct Report<'data> {
    data: &'data DashboardData,
    generated: NaiveDateTime,
}

impl<'data> Report<'data> {
    /// Report over `data`, stamped with `generated`.
    #[must_use]
    pub fn new(data: &'data DashboardData, generated: NaiveDateTime) -> Self {
        Self { data, generated }
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let overview = self.data.overview();
        writeln!(formatter, "Smart Waste Management - System Report")?;
        writeln!(formatter, "Generated on: {}", self.generated.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(formatter)?;

        writeln!(formatter, "System Overview")?;
        writeln!(formatter, "  {:<30} {}", "Total Collection Points", overview.total_points)?;
        writeln!(formatter, "  {:<30} {}", "Active Points", overview.active_points)?;
        writeln!(formatter, "  {:<30} {}", "Critical Alerts", overview.alert_points)?;
        writeln!(formatter, "  {:<30} {}%", "Average Fill Level", overview.avg_fill_level)?;
        writeln!(
            formatter,
            "  {:<30} {} kg",
            "Total Waste Collected (Est.)", overview.total_waste_kg
        )?;
        writeln!(formatter, "  {:<30} {} kg", "CO2 Emission Saved", overview.co2_saved_kg)?;

        if !self.data.alerts.is_empty() {
            writeln!(formatter)?;
            writeln!(formatter, "Active Alerts")?;
            for alert in &self.data.alerts {
                writeln!(
                    formatter,
                    "  [{}] {} {}% {}",
                    alert.priority, alert.container_id, alert.fill_level, alert.message
                )?;
            }
        }

        writeln!(formatter)?;
        writeln!(formatter, "Recent Routes")?;
        for route in self.data.recent_routes(REPORT_ROUTES) {
            let date = route
                .date
                .map_or_else(|| "N/A".to_owned(), |date| date.to_string());
            let vehicle = route
                .vehicle_id
                .as_ref()
                .map_or("N/A", |vehicle| vehicle.0.as_str());
            writeln!(
                formatter,
                "  {date}  {:<11}  {vehicle:<12}  {:.1} km",
                route.status, route.estimated_distance_km
            )?;
        }

        if !self.data.incidents.is_empty() {
            writeln!(formatter)?;
            writeln!(formatter, "Reported Incidents")?;
            for incident in &self.data.incidents {
                let date = incident
                    .date
                    .map_or_else(|| "N/A".to_owned(), |date| date.date().to_string());
                writeln!(formatter, "  {date}  {:?}  {}", incident.kind, incident.description)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::model::{Alert, PointId, RouteStatus};
    use crate::service::fake::{point, route};

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .and_then(|date| date.and_hms_opt(8, 30, 0))
            .expect("valid timestamp")
    }

    #[test]
    fn report_lists_overview_and_sections() {
        let data = DashboardData {
            alerts: vec![Alert {
                alert_type: "FullContainer".to_owned(),
                container_id: PointId::from("p1"),
                priority: "HIGH".to_owned(),
                fill_level: 95,
                message: "Container at p1 street is 95% full".to_owned(),
            }],
            points: vec![point("p1", 95, None), point("p2", 60, None), point("p3", 10, None)],
            routes: vec![route("r1", RouteStatus::InProgress, &["p1"])],
            incidents: Vec::new(),
        };

        let text = Report::new(&data, stamp()).to_string();

        assert!(text.contains("Generated on: 2026-03-02 08:30:00"), "{text}");
        assert!(text.contains("CO2 Emission Saved"), "{text}");
        assert!(text.contains("825 kg"), "{text}");
        assert!(text.contains("[HIGH] p1 95%"), "{text}");
        assert!(text.contains("IN_PROGRESS"), "{text}");
        assert!(!text.contains("Reported Incidents"), "empty sections are omitted: {text}");
    }
}
