use serde::Serialize;

use super::{Anchor, Color};

/// Chart kinds with structured extraction support.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartKind {
    Bar,
    Bar3D,
    Line,
    Line3D,
    Pie,
    Pie3D,
    OfPie,
    Doughnut,
    Area,
    Area3D,
    Scatter,
    Bubble,
    Radar,
    Stock,
    Surface,
    Surface3D,
    /// A plot element the extractor does not model; the raw element name is kept.
    #[serde(untagged)]
    Other(String),
}

impl ChartKind {
    /// Map a DrawingML plot element name (`barChart`, `pie3DChart`, ...).
    pub fn from_plot_element(name: &str) -> Self {
        match name {
            "barChart" => Self::Bar,
            "bar3DChart" => Self::Bar3D,
            "lineChart" => Self::Line,
            "line3DChart" => Self::Line3D,
            "pieChart" => Self::Pie,
            "pie3DChart" => Self::Pie3D,
            "ofPieChart" => Self::OfPie,
            "doughnutChart" => Self::Doughnut,
            "areaChart" => Self::Area,
            "area3DChart" => Self::Area3D,
            "scatterChart" => Self::Scatter,
            "bubbleChart" => Self::Bubble,
            "radarChart" => Self::Radar,
            "stockChart" => Self::Stock,
            "surfaceChart" => Self::Surface,
            "surface3DChart" => Self::Surface3D,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BarDirection {
    Bar,
    Col,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartGrouping {
    Clustered,
    Stacked,
    PercentStacked,
    Standard,
}

impl ChartGrouping {
    pub fn from_str_val(s: &str) -> Option<Self> {
        match s {
            "clustered" => Some(Self::Clustered),
            "stacked" => Some(Self::Stacked),
            "percentStacked" => Some(Self::PercentStacked),
            "standard" => Some(Self::Standard),
            _ => None,
        }
    }
}

/// A data reference plus whatever values the source cached for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataReference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub numbers: Vec<Option<f64>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub strings: Vec<String>,
}

impl DataReference {
    pub fn is_empty(&self) -> bool {
        self.formula.is_none() && self.numbers.is_empty() && self.strings.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_ref: Option<String>,
    pub values: DataReference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<DataReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AxisKind {
    Category,
    Value,
    Date,
    Series,
}

impl AxisKind {
    pub fn from_element(name: &str) -> Option<Self> {
        match name {
            "catAx" => Some(Self::Category),
            "valAx" => Some(Self::Value),
            "dateAx" => Some(Self::Date),
            "serAx" => Some(Self::Series),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Axis {
    pub kind: AxisKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major_unit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minor_unit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_format: Option<String>,
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Legend {
    pub position: String,
    pub overlay: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub kind: ChartKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<Legend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bar_direction: Option<BarDirection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grouping: Option<ChartGrouping>,
    pub series: Vec<Series>,
    pub axes: Vec<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Anchor>,
    /// Set on minimal records produced for unsupported or malformed charts.
    pub degraded: bool,
}

impl Chart {
    /// Minimal record: kind and title only.
    pub fn minimal(kind: ChartKind, title: Option<String>, anchor: Option<Anchor>) -> Self {
        Self {
            kind,
            title,
            name: None,
            legend: None,
            bar_direction: None,
            grouping: None,
            series: Vec::new(),
            axes: Vec::new(),
            anchor,
            degraded: true,
        }
    }
}
