use serde::Serialize;
use time::OffsetDateTime;

use crate::reports::TrendSeries;

/// Turns trend series into something a client can draw.
pub trait ChartRenderer {
    type Output;

    fn render(&self, title: &str, series: &TrendSeries) -> Self::Output;
}

/// Line colours assigned to series in legend order, wrapping around.
const PALETTE: [&str; 6] = ["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    #[serde(with = "time::serde::rfc3339")]
    pub x: OffsetDateTime,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub label: &'static str,
    pub color: &'static str,
    pub points: Vec<ChartPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPayload {
    pub title: String,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetRenderer;

impl ChartRenderer for DatasetRenderer {
    type Output = ChartPayload;

    fn render(&self, title: &str, series: &TrendSeries) -> ChartPayload {
        let datasets = series
            .series
            .iter()
            .zip(PALETTE.iter().copied().cycle())
            .map(|(s, color)| Dataset {
                label: s.parameter,
                color,
                points: s
                    .points
                    .iter()
                    .map(|p| ChartPoint { x: p.timestamp, y: p.value })
                    .collect(),
            })
            .collect();

        ChartPayload {
            title: title.to_string(),
            x_label: "Timestamp",
            y_label: "Value",
            datasets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::{ParameterSeries, TrendPoint};
    use time::macros::datetime;

    #[test]
    fn datasets_follow_series_order_and_cycle_colours() {
        let point = TrendPoint {
            timestamp: datetime!(2024-01-01 00:00:00 UTC),
            value: 1.0,
        };
        let names = ["IA", "IB", "IC", "VA", "VB", "VC", "I0"];
        let series = TrendSeries {
            series: names
                .iter()
                .map(|n| ParameterSeries {
                    parameter: *n,
                    points: vec![point.clone()],
                })
                .collect(),
        };

        let chart = DatasetRenderer.render("Parameter Trends", &series);
        assert_eq!(chart.title, "Parameter Trends");
        let labels: Vec<_> = chart.datasets.iter().map(|d| d.label).collect();
        assert_eq!(labels, names);
        assert_eq!(chart.datasets[6].color, chart.datasets[0].color);
        assert_eq!(chart.datasets[0].points, vec![ChartPoint { x: point.timestamp, y: 1.0 }]);
    }
}
