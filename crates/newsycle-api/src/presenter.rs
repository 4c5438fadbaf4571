//! HTML rendering of a report
//!
//! Each chart becomes a script/markup pair: the markup is an empty container
//! and the script embeds the chart's Vega-Lite document into it.

use newsycle_core::REPORT_DATE_FORMAT;
use newsycle_report::Report;
use serde_json::Value;

const PAGE_TEMPLATE: &str = include_str!("../templates/graph.html");

/// Script and container markup for one chart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartComponents {
    pub script: String,
    pub div: String,
}

/// Build the embed pair for a Vega-Lite document
pub fn components(spec: &Value, element_id: &str) -> ChartComponents {
    let id = escape_html(element_id);
    let script = format!(
        "<script type=\"text/javascript\">\nvegaEmbed(\"#{id}\", {}, {{\"actions\": false}}).catch(console.error);\n</script>",
        escape_script_json(&spec.to_string())
    );
    let div = format!("<div id=\"{id}\" class=\"newsycle-chart\"></div>");
    ChartComponents { script, div }
}

/// Render the report page for the report's own date
pub fn render_page(report: &Report) -> String {
    let grid = components(&report.grid.to_vega_lite(), "entity-grid");
    let heatmap = components(&report.heatmap.to_vega_lite(), "similarity-heatmap");
    let date = escape_html(&report.date.format(REPORT_DATE_FORMAT).to_string());

    fill_template(
        PAGE_TEMPLATE,
        &[
            ("date", date.as_str()),
            ("script", grid.script.as_str()),
            ("div", grid.div.as_str()),
            ("script2", heatmap.script.as_str()),
            ("div2", heatmap.div.as_str()),
        ],
    )
}

/// Substitute `{{ name }}` placeholders in a single pass
///
/// Substituted values are never rescanned, so chart data that happens to
/// contain placeholder syntax is left alone.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim();
                match values.iter().find(|(key, _)| *key == name) {
                    Some((_, value)) => out.push_str(value),
                    None => out.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Keep JSON from closing the surrounding script element
fn escape_script_json(json: &str) -> String {
    json.replace("</", "<\\/")
}
