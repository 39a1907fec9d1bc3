//! Analysis options.
//!
//! Every field has a default, so callers can pass a partial JSON object.

use serde::Deserialize;

use crate::error::Result;
use crate::styles::DEFAULT_MAX_HOPS;

/// 16 MiB
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 16 * 1024 * 1024;

/// What to do with a chart the engine cannot fully represent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartDegradation {
    /// Keep kind and title with no series, flagged `degraded`.
    #[default]
    MinimalRecord,
    /// Leave the chart out of the worksheet.
    Omit,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisOptions {
    /// Image payloads above this size are replaced by a placeholder.
    pub max_image_bytes: usize,
    /// Longest style parent chain followed before giving up.
    pub max_style_hops: usize,
    pub chart_degradation: ChartDegradation,
    /// Worker pool size. `None` uses rayon's default.
    pub worker_threads: Option<usize>,
    /// Extract worksheets concurrently. Ignored without the `parallel` feature.
    pub parallel: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            max_style_hops: DEFAULT_MAX_HOPS,
            chart_degradation: ChartDegradation::default(),
            worker_threads: None,
            parallel: true,
        }
    }
}

impl AnalysisOptions {
    /// Parse options from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Options for single-threaded extraction.
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }
}
