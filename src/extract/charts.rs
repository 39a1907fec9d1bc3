//! Chart extraction and the chart degradation policy.

use crate::color::normalize;
use crate::config::ChartDegradation;
use crate::source::{ChartNode, DataRefNode, Palette, ShapeNode, SheetNode};
use crate::types::{
    Axis, AxisKind, BarDirection, Chart, ChartGrouping, ChartKind, DataReference, DiagnosticKind,
    Diagnostics, Legend, Series,
};

/// Charts in drawing order. Charts the model cannot represent in full are
/// reduced or dropped according to `policy`, with a diagnostic either way.
pub fn extract(
    sheet: &SheetNode,
    palette: &Palette,
    policy: ChartDegradation,
    diags: &mut Diagnostics,
) -> Vec<Chart> {
    sheet
        .shapes
        .iter()
        .filter_map(|shape| match shape {
            ShapeNode::Chart(node) => chart(node, palette, policy, diags),
            ShapeNode::Picture(_) => None,
        })
        .collect()
}

fn chart(
    node: &ChartNode,
    palette: &Palette,
    policy: ChartDegradation,
    diags: &mut Diagnostics,
) -> Option<Chart> {
    let location = location(node);

    let Some(plot_type) = node.plot_type.as_deref() else {
        let reason = node.error.as_deref().unwrap_or("no plot area");
        diags.warn(
            DiagnosticKind::MalformedChart,
            location,
            format!("chart could not be read: {reason}"),
        );
        return degrade(node, ChartKind::Other("unknown".to_string()), policy);
    };
    let kind = ChartKind::from_plot_element(plot_type);

    if let Some(reason) = node.error.as_deref() {
        diags.warn(
            DiagnosticKind::MalformedChart,
            location,
            format!("{plot_type} chart is malformed: {reason}"),
        );
        return degrade(node, kind, policy);
    }

    if !kind.is_supported() {
        diags.warn(
            DiagnosticKind::UnsupportedChartKind,
            location,
            format!("chart type {plot_type} is not supported"),
        );
        return degrade(node, kind, policy);
    }

    if let Some(series) = node
        .series
        .iter()
        .find(|s| s.values.as_ref().map_or(true, data_ref_is_empty))
    {
        diags.warn(
            DiagnosticKind::MalformedChart,
            location,
            format!("series {} has no values", series.index),
        );
        return degrade(node, kind, policy);
    }

    Some(Chart {
        kind,
        title: node.title.clone(),
        name: node.name.clone(),
        legend: node.legend.as_ref().map(|l| Legend {
            position: l.position.clone().unwrap_or_else(|| "r".to_string()),
            overlay: l.overlay,
        }),
        bar_direction: node.bar_direction.as_deref().and_then(|d| match d {
            "bar" => Some(BarDirection::Bar),
            "col" => Some(BarDirection::Col),
            _ => None,
        }),
        grouping: node.grouping.as_deref().and_then(ChartGrouping::from_str_val),
        series: node
            .series
            .iter()
            .map(|s| Series {
                index: s.index,
                name: s.name.clone(),
                name_ref: s.name_ref.clone(),
                values: s.values.as_ref().map(data_ref).unwrap_or_default(),
                categories: s.categories.as_ref().map(data_ref),
                color: s.color.as_ref().map(|c| normalize(c, palette)),
            })
            .collect(),
        axes: node
            .axes
            .iter()
            .filter_map(|a| {
                Some(Axis {
                    kind: AxisKind::from_element(&a.element)?,
                    title: a.title.clone(),
                    position: a.position.clone(),
                    min: a.min,
                    max: a.max,
                    major_unit: a.major_unit,
                    minor_unit: a.minor_unit,
                    number_format: a.number_format.clone(),
                    deleted: a.deleted,
                })
            })
            .collect(),
        anchor: node.anchor,
        degraded: false,
    })
}

fn degrade(node: &ChartNode, kind: ChartKind, policy: ChartDegradation) -> Option<Chart> {
    match policy {
        ChartDegradation::MinimalRecord => {
            let mut chart = Chart::minimal(kind, node.title.clone(), node.anchor);
            chart.name.clone_from(&node.name);
            Some(chart)
        }
        ChartDegradation::Omit => None,
    }
}

fn location(node: &ChartNode) -> Option<String> {
    node.name.clone().or_else(|| {
        node.anchor
            .as_ref()
            .and_then(|a| a.top_left())
            .map(|c| c.to_string())
    })
}

fn data_ref_is_empty(data: &DataRefNode) -> bool {
    data.formula.is_none() && data.num_cache.is_empty() && data.str_cache.is_empty()
}

fn data_ref(data: &DataRefNode) -> DataReference {
    DataReference {
        formula: data.formula.clone(),
        numbers: data.num_cache.clone(),
        strings: data.str_cache.clone(),
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::source::{AxisNode, SeriesNode};

    fn bar_chart() -> ChartNode {
        ChartNode {
            name: Some("Chart 1".into()),
            plot_type: Some("barChart".into()),
            title: Some("Sales".into()),
            bar_direction: Some("col".into()),
            grouping: Some("clustered".into()),
            series: vec![SeriesNode {
                index: 0,
                name: Some("2024".into()),
                values: Some(DataRefNode {
                    formula: Some("Sheet1!$B$2:$B$4".into()),
                    num_cache: vec![Some(1.0), None, Some(3.0)],
                    str_cache: Vec::new(),
                }),
                ..SeriesNode::default()
            }],
            axes: vec![
                AxisNode {
                    element: "catAx".into(),
                    ..AxisNode::default()
                },
                AxisNode {
                    element: "valAx".into(),
                    min: Some(0.0),
                    ..AxisNode::default()
                },
            ],
            ..ChartNode::default()
        }
    }

    fn run(nodes: Vec<ChartNode>, policy: ChartDegradation) -> (Vec<Chart>, Vec<DiagnosticKind>) {
        let mut sheet = SheetNode::new("S");
        sheet.shapes = nodes.into_iter().map(ShapeNode::Chart).collect();
        let mut diags = Diagnostics::for_sheet("S");
        let charts = extract(&sheet, &Palette::standard(), policy, &mut diags);
        (charts, diags.iter().map(|d| d.kind).collect())
    }

    #[test]
    fn test_full_chart() {
        let (charts, diags) = run(vec![bar_chart()], ChartDegradation::MinimalRecord);
        assert!(diags.is_empty());
        let chart = &charts[0];
        assert_eq!(chart.kind, ChartKind::Bar);
        assert!(!chart.degraded);
        assert_eq!(chart.bar_direction, Some(BarDirection::Col));
        assert_eq!(chart.grouping, Some(ChartGrouping::Clustered));
        assert_eq!(chart.series[0].values.numbers, vec![Some(1.0), None, Some(3.0)]);
        assert_eq!(chart.axes.len(), 2);
        assert_eq!(chart.axes[1].min, Some(0.0));
    }

    #[test]
    fn test_unsupported_kind_minimal_record() {
        let mut node = bar_chart();
        node.plot_type = Some("funnelChart".into());

        let (charts, diags) = run(vec![node], ChartDegradation::MinimalRecord);
        assert_eq!(diags, vec![DiagnosticKind::UnsupportedChartKind]);
        let chart = &charts[0];
        assert!(chart.degraded);
        assert_eq!(chart.kind, ChartKind::Other("funnelChart".into()));
        assert_eq!(chart.title.as_deref(), Some("Sales"));
        assert!(chart.series.is_empty());
    }

    #[test]
    fn test_malformed_chart_omitted() {
        let mut node = bar_chart();
        node.series[0].values = None;

        let (charts, diags) = run(vec![node, bar_chart()], ChartDegradation::Omit);
        assert_eq!(diags, vec![DiagnosticKind::MalformedChart]);
        assert_eq!(charts.len(), 1);
        assert!(!charts[0].degraded);
    }

    #[test]
    fn test_unreadable_chart_part() {
        let node = ChartNode {
            error: Some("chart part missing".into()),
            ..ChartNode::default()
        };

        let (charts, diags) = run(vec![node], ChartDegradation::MinimalRecord);
        assert_eq!(diags, vec![DiagnosticKind::MalformedChart]);
        assert_eq!(charts[0].kind, ChartKind::Other("unknown".into()));
        assert!(charts[0].degraded);
    }
}
