//! Chart specifications
//!
//! Charts are plain data until rendered; `to_vega_lite` turns each one into a
//! Vega-Lite document the page embeds.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Value};

use newsycle_core::{Outlet, REPORT_DATE_FORMAT};
use newsycle_extractor::{EntityAnalysis, FrequencyTable};
use newsycle_vector::SimilarityMatrix;

const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

/// Spectral 10-class palette, red to blue
///
/// Bars take colors from the end, so the most frequent entity is always blue.
pub const SPECTRAL10_REVERSED: [&str; 10] = [
    "#9e0142", "#d53e4f", "#f46d43", "#fdae61", "#fee08b", "#e6f598", "#abdda4", "#66c2a5",
    "#3288bd", "#5e4fa2",
];

const BAR_WIDTH: u32 = 700;
const BAR_HEIGHT: u32 = 350;
const HEATMAP_WIDTH: u32 = 850;
const HEATMAP_HEIGHT: u32 = 450;

// ============================================================================
// Bar charts
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub text: String,
    pub count: usize,
    pub color: &'static str,
}

/// Horizontal bar chart of one outlet's top entities
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChartSpec {
    pub outlet: Outlet,
    pub title: String,
    /// Least frequent first; the last bar is drawn on top
    pub bars: Vec<Bar>,
}

impl BarChartSpec {
    pub fn from_table(outlet: Outlet, table: &FrequencyTable, top_n: usize) -> Self {
        let top = table.top(top_n.min(SPECTRAL10_REVERSED.len()));
        let offset = SPECTRAL10_REVERSED.len() - top.len();

        let bars = top
            .iter()
            .rev()
            .enumerate()
            .map(|(i, entry)| Bar {
                text: entry.text.clone(),
                count: entry.count,
                color: SPECTRAL10_REVERSED[offset + i],
            })
            .collect();

        Self {
            title: format!("{} Top Mentions", outlet.id().to_uppercase()),
            outlet,
            bars,
        }
    }

    pub fn from_analysis(analysis: &EntityAnalysis, top_n: usize) -> Self {
        Self::from_table(analysis.outlet().clone(), analysis.combined(), top_n)
    }

    /// Chart body without the schema header, usable inside a grid
    fn view(&self) -> Value {
        let values: Vec<Value> = self
            .bars
            .iter()
            .map(|bar| json!({"entity": bar.text, "count": bar.count, "color": bar.color}))
            .collect();
        let top_down: Vec<&str> = self.bars.iter().rev().map(|b| b.text.as_str()).collect();

        json!({
            "title": self.title,
            "width": BAR_WIDTH,
            "height": BAR_HEIGHT,
            "data": {"values": values},
            "mark": {"type": "bar", "tooltip": true},
            "encoding": {
                "y": {
                    "field": "entity",
                    "type": "nominal",
                    "sort": top_down,
                    "title": null,
                    "axis": {"labelFontSize": 14, "ticks": false}
                },
                "x": {
                    "field": "count",
                    "type": "quantitative",
                    "title": "Mentions",
                    "scale": {"domainMin": 0}
                },
                "color": {"field": "color", "type": "nominal", "scale": null, "legend": null}
            }
        })
    }

    pub fn to_vega_lite(&self) -> Value {
        let mut spec = self.view();
        spec["$schema"] = json!(VEGA_LITE_SCHEMA);
        spec
    }
}

/// Bar charts laid out in rows of `columns`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartGrid {
    pub columns: usize,
    pub charts: Vec<BarChartSpec>,
}

impl ChartGrid {
    pub fn new(charts: Vec<BarChartSpec>, columns: usize) -> Self {
        Self {
            columns: columns.max(1),
            charts,
        }
    }

    pub fn rows(&self) -> usize {
        self.charts.len().div_ceil(self.columns)
    }

    pub fn to_vega_lite(&self) -> Value {
        let views: Vec<Value> = self.charts.iter().map(BarChartSpec::view).collect();
        json!({
            "$schema": VEGA_LITE_SCHEMA,
            "columns": self.columns,
            "concat": views,
            "config": {"view": {"stroke": null}}
        })
    }
}

// ============================================================================
// Heatmap
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatCell {
    pub x: Outlet,
    pub y: Outlet,
    pub sim: f64,
}

/// Outlet-by-outlet similarity heatmap
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapSpec {
    pub title: String,
    pub outlets: Vec<Outlet>,
    pub cells: Vec<HeatCell>,
    /// Color scale bounds
    pub low: f64,
    pub high: f64,
}

impl HeatmapSpec {
    /// Color range runs from `min - low_offset` to `max`
    pub fn from_matrix(matrix: &SimilarityMatrix, date: NaiveDate, low_offset: f64) -> Self {
        let cells: Vec<HeatCell> = matrix
            .cells()
            .map(|(x, y, sim)| HeatCell {
                x: x.clone(),
                y: y.clone(),
                sim,
            })
            .collect();

        let (low, high) = match (matrix.min(), matrix.max()) {
            (Some(min), Some(max)) => (min - low_offset, max),
            _ => (0.0, 1.0),
        };

        Self {
            title: format!(
                "News Topic Similarity Between Outlets on {}",
                date.format(REPORT_DATE_FORMAT)
            ),
            outlets: matrix.outlets().to_vec(),
            cells,
            low,
            high,
        }
    }

    pub fn to_vega_lite(&self) -> Value {
        let values: Vec<Value> = self
            .cells
            .iter()
            .map(|c| json!({"x": c.x, "y": c.y, "sim": c.sim}))
            .collect();
        let axis_order: Vec<&str> = self.outlets.iter().map(Outlet::id).collect();
        let label_axis = json!({"labelFontSize": 14, "labelFontWeight": "bold", "ticks": false});

        json!({
            "$schema": VEGA_LITE_SCHEMA,
            "title": self.title,
            "width": HEATMAP_WIDTH,
            "height": HEATMAP_HEIGHT,
            "data": {"values": values},
            "mark": "rect",
            "encoding": {
                "x": {
                    "field": "x",
                    "type": "nominal",
                    "sort": axis_order,
                    "title": null,
                    "axis": {"labelAngle": -30, "labelFontSize": 14, "labelFontWeight": "bold", "ticks": false}
                },
                "y": {
                    "field": "y",
                    "type": "nominal",
                    "sort": axis_order,
                    "title": null,
                    "axis": label_axis
                },
                "color": {
                    "field": "sim",
                    "type": "quantitative",
                    "title": "Similarity",
                    "scale": {"domain": [self.low, self.high], "range": SPECTRAL10_REVERSED}
                },
                "tooltip": [{"field": "sim", "type": "quantitative", "title": "Similarity", "format": ".3f"}]
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bars_ascending_with_blue_on_top() {
        let table = FrequencyTable::from_mentions(["NATO", "NATO", "NATO", "Brussels", "Gaza", "Gaza"]);
        let chart = BarChartSpec::from_table(Outlet::from("cnn"), &table, 10);

        let texts: Vec<&str> = chart.bars.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["Brussels", "Gaza", "NATO"]);
        assert_eq!(chart.bars.last().unwrap().color, "#5e4fa2");
        assert_eq!(chart.title, "CNN Top Mentions");

        let spec = chart.to_vega_lite();
        assert_eq!(spec["encoding"]["y"]["sort"], json!(["NATO", "Gaza", "Brussels"]));
        assert_eq!(spec["data"]["values"][2]["count"], 3);
    }

    #[test]
    fn test_bars_capped_at_ten() {
        let mentions: Vec<String> = (0..15).map(|i| format!("Entity {i}")).collect();
        let table = FrequencyTable::from_mentions(mentions.iter().map(String::as_str));
        let chart = BarChartSpec::from_table(Outlet::from("cnn"), &table, 10);

        assert_eq!(chart.bars.len(), 10);
        assert_eq!(chart.bars[0].color, SPECTRAL10_REVERSED[0]);
    }

    #[test]
    fn test_empty_table_gives_zero_bars() {
        let chart = BarChartSpec::from_table(Outlet::from("fox-news"), &FrequencyTable::default(), 10);
        assert!(chart.bars.is_empty());
        assert_eq!(chart.to_vega_lite()["data"]["values"], json!([]));
    }

    #[test]
    fn test_grid_layout() {
        let charts: Vec<BarChartSpec> = ["a", "b", "c", "d", "e", "f"]
            .into_iter()
            .map(|o| BarChartSpec::from_table(Outlet::from(o), &FrequencyTable::default(), 10))
            .collect();
        let grid = ChartGrid::new(charts, 2);

        assert_eq!(grid.rows(), 3);
        let spec = grid.to_vega_lite();
        assert_eq!(spec["columns"], 2);
        assert_eq!(spec["concat"].as_array().unwrap().len(), 6);
        assert!(spec["concat"][0].get("$schema").is_none());
    }
}
