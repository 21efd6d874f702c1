//! Marker, line and badge descriptors derived from entity state.
//!
//! Every threshold and color lives in one table here so the map, the dashboard and the
//! statistics screen agree on what "critical" looks like.

use crate::model::{
    CRITICAL_FILL_LEVEL, PointStatus, RouteStatus, VehicleStatus, WARNING_FILL_LEVEL,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Fill-level band of a container.
pub enum FillSeverity {
    /// Below 50%.
    Normal,
    /// 50% to 89%.
    Warning,
    /// 90% and above.
    Critical,
}

impl FillSeverity {
    /// Band for a fill percentage.
    #[must_use]
    pub fn from_fill_level(fill_level: u8) -> Self {
        if fill_level >= CRITICAL_FILL_LEVEL {
            FillSeverity::Critical
        } else if fill_level >= WARNING_FILL_LEVEL {
            FillSeverity::Warning
        } else {
            FillSeverity::Normal
        }
    }

    /// Stable name of the band.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FillSeverity::Normal => "normal",
            FillSeverity::Warning => "warning",
            FillSeverity::Critical => "critical",
        }
    }

    /// Marker color of the band.
    #[must_use]
    pub fn color(self) -> MarkerColor {
        match self {
            FillSeverity::Normal => MarkerColor::Green,
            FillSeverity::Warning => MarkerColor::Orange,
            FillSeverity::Critical => MarkerColor::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Palette shared by markers, lines and badges.
pub enum MarkerColor {
    /// Healthy.
    Green,
    /// Needs attention soon.
    Orange,
    /// Needs attention now.
    Red,
    /// Depots and planned routes.
    Blue,
    /// Route stops.
    Purple,
    /// Finished or inactive.
    Gray,
}

impl MarkerColor {
    /// CSS-style hex code.
    #[must_use]
    pub fn hex(self) -> &'static str {
        match self {
            MarkerColor::Green => "#48bb78",
            MarkerColor::Orange => "#ed8936",
            MarkerColor::Red => "#f56565",
            MarkerColor::Blue => "#4299e1",
            MarkerColor::Purple => "#805ad5",
            MarkerColor::Gray => "#718096",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Outline of a marker.
pub enum MarkerShape {
    /// Round marker.
    Circle,
    /// Square marker.
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// What a marker stands for.
pub enum IconKind {
    /// Free collection point.
    Point(FillSeverity),
    /// Numbered stop of a route.
    RouteStop,
    /// Start and end of a route.
    Depot,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Visual description of one map marker.
pub struct IconDescriptor {
    /// Semantic kind.
    pub kind: IconKind,
    /// Fill color.
    pub color: MarkerColor,
    /// Outline.
    pub shape: MarkerShape,
    /// Edge length in pixels.
    pub size: u8,
    /// Text drawn inside the marker.
    pub label: Option<String>,
}

/// Marker for a free collection point.
#[must_use]
pub fn point_icon(fill_level: u8) -> IconDescriptor {
    let severity = FillSeverity::from_fill_level(fill_level);
    IconDescriptor {
        kind: IconKind::Point(severity),
        color: severity.color(),
        shape: MarkerShape::Circle,
        size: 20,
        label: None,
    }
}

/// Numbered marker for the stop at zero-based `index`.
#[must_use]
pub fn route_stop_icon(index: usize) -> IconDescriptor {
    IconDescriptor {
        kind: IconKind::RouteStop,
        color: MarkerColor::Purple,
        shape: MarkerShape::Circle,
        size: 26,
        label: Some(index.saturating_add(1).to_string()),
    }
}

/// Marker for a route depot.
#[must_use]
pub fn depot_icon() -> IconDescriptor {
    IconDescriptor {
        kind: IconKind::Depot,
        color: MarkerColor::Blue,
        shape: MarkerShape::Square,
        size: 30,
        label: Some("D".to_owned()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// Stroke used for a route's path line.
pub struct LineStyle {
    /// Stroke color.
    pub color: MarkerColor,
    /// Opacity in `0.0..=1.0`.
    pub opacity: f32,
    /// Stroke width in pixels.
    pub weight: u8,
}

/// Path-line stroke for a route in the given status.
#[must_use]
pub fn route_line_style(status: RouteStatus) -> LineStyle {
    let color = match status {
        RouteStatus::InProgress => MarkerColor::Green,
        RouteStatus::Completed => MarkerColor::Gray,
        RouteStatus::Planned => MarkerColor::Blue,
    };
    LineStyle {
        color,
        opacity: 0.7,
        weight: 5,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Status pill shown next to an entity.
pub struct Badge {
    /// Text of the pill.
    pub label: &'static str,
    /// Pill color.
    pub color: MarkerColor,
}

/// Badge for a collection point status.
#[must_use]
pub fn point_status_badge(status: PointStatus) -> Badge {
    match status {
        PointStatus::Active => Badge {
            label: "ACTIVE",
            color: MarkerColor::Green,
        },
        PointStatus::Maintenance => Badge {
            label: "MAINTENANCE",
            color: MarkerColor::Orange,
        },
        PointStatus::Broken => Badge {
            label: "BROKEN",
            color: MarkerColor::Red,
        },
    }
}

/// Badge for a route status.
#[must_use]
pub fn route_status_badge(status: RouteStatus) -> Badge {
    match status {
        RouteStatus::Planned => Badge {
            label: "PLANNED",
            color: MarkerColor::Blue,
        },
        RouteStatus::InProgress => Badge {
            label: "IN PROGRESS",
            color: MarkerColor::Green,
        },
        RouteStatus::Completed => Badge {
            label: "COMPLETED",
            color: MarkerColor::Gray,
        },
    }
}

/// Badge for a vehicle status.
#[must_use]
pub fn vehicle_status_badge(status: VehicleStatus) -> Badge {
    match status {
        VehicleStatus::Available => Badge {
            label: "AVAILABLE",
            color: MarkerColor::Green,
        },
        VehicleStatus::InUse => Badge {
            label: "IN USE",
            color: MarkerColor::Blue,
        },
        VehicleStatus::Maintenance => Badge {
            label: "MAINTENANCE",
            color: MarkerColor::Orange,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_thresholds_are_boundary_exact() {
        let cases = [
            (0, "normal"),
            (49, "normal"),
            (50, "warning"),
            (89, "warning"),
            (90, "critical"),
            (100, "critical"),
        ];
        for (level, expected) in cases {
            let icon = point_icon(level);
            let IconKind::Point(severity) = icon.kind else {
                panic!("point icon has point kind");
            };
            assert_eq!(severity.as_str(), expected, "fill level {level}");
        }
    }

    #[test]
    fn route_stop_labels_are_one_based() {
        assert_eq!(route_stop_icon(0).label.as_deref(), Some("1"));
        assert_eq!(route_stop_icon(9).label.as_deref(), Some("10"));
    }

    #[test]
    fn depot_icon_is_constant() {
        assert_eq!(depot_icon(), depot_icon());
        assert_eq!(depot_icon().shape, MarkerShape::Square);
    }

    #[test]
    fn line_color_follows_route_status() {
        assert_eq!(route_line_style(RouteStatus::InProgress).color, MarkerColor::Green);
        assert_eq!(route_line_style(RouteStatus::Completed).color, MarkerColor::Gray);
        assert_eq!(route_line_style(RouteStatus::Planned).color, MarkerColor::Blue);
    }
}
