//! The canonicalization engine.
//!
//! Reads workbook metadata once, freezes the style tables behind a seeded
//! [`StyleResolver`], then extracts every worksheet (in parallel when
//! enabled) and assembles the [`Workbook`].

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::AnalysisOptions;
use crate::error::{Result, Stage, XlcanonError};
use crate::extract::{cells, charts, images, rules, structure};
use crate::source::{ParsedContainer, RawProperties, SheetNode, WorkbookMeta};
use crate::styles::StyleResolver;
use crate::types::{
    CalculationMode, Capabilities, DateSystem, DefinedName, Diagnostic, DiagnosticKind,
    Diagnostics, DocumentProperties, Feature, Workbook, Worksheet,
};

/// Shared flag for stopping an analysis from another thread.
///
/// Checked before each worksheet. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(XlcanonError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Workbook-wide inputs every sheet extraction reads.
struct SheetInputs<'c> {
    container: &'c dyn ParsedContainer,
    capabilities: Capabilities,
    date_1904: bool,
}

/// One extracted sheet plus the diagnostics it produced.
type SheetOutput = (Worksheet, Vec<Diagnostic>);

#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    options: AnalysisOptions,
    cancel: CancellationToken,
}

impl Analyzer {
    pub fn new(options: AnalysisOptions) -> Self {
        Self {
            options,
            cancel: CancellationToken::default(),
        }
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Build the canonical model for a parsed container.
    ///
    /// Fails on missing metadata, duplicate sheet names, cyclic styles, or
    /// cancellation. Everything else degrades into diagnostics.
    pub fn analyze(&self, container: &dyn ParsedContainer) -> Result<Workbook> {
        self.cancel.check()?;
        let format = container.format();
        log::info!(
            "analyzing {format} workbook with {} sheets",
            container.sheets().len()
        );

        let meta = container
            .metadata()
            .map_err(|e| e.in_stage(Stage::Metadata, None))?;
        check_unique_names(container.sheets()).map_err(|e| e.in_stage(Stage::Metadata, None))?;

        let mut diags = Diagnostics::for_workbook();
        let properties = properties(&meta.properties, &mut diags);
        let calculation_mode = calculation_mode(meta.calculation_mode.as_deref(), &mut diags);

        let capabilities = container.capabilities();
        for feature in capabilities.unsupported() {
            diags.info(
                DiagnosticKind::UnsupportedFeature,
                None,
                format!("{feature} not supported by {format} workbooks"),
            );
        }

        let mut seed = StyleResolver::new(
            container.styles(),
            container.palette(),
            self.options.max_style_hops,
        );
        seed.default_formatting()
            .map_err(|e| e.in_stage(Stage::Styles, None))?;

        let inputs = SheetInputs {
            container,
            capabilities,
            date_1904: meta.date_1904,
        };
        let sheets = self.extract_sheets(&inputs, &seed)?;

        let mut diagnostics = diags.into_vec();
        let mut worksheets = Vec::with_capacity(sheets.len());
        for (sheet, sheet_diags) in sheets {
            worksheets.push(sheet);
            diagnostics.extend(sheet_diags);
        }

        log::info!(
            "analysis finished: {} sheets, {} diagnostics",
            worksheets.len(),
            diagnostics.len()
        );

        Ok(Workbook {
            source_format: format,
            properties,
            date_system: if meta.date_1904 {
                DateSystem::Excel1904
            } else {
                DateSystem::Excel1900
            },
            calculation_mode,
            defined_names: defined_names(meta),
            active_sheet: meta
                .active_sheet
                .and_then(|i| usize::try_from(i).ok())
                .filter(|i| *i < worksheets.len()),
            worksheets,
            capabilities,
            diagnostics,
        })
    }

    #[cfg(feature = "parallel")]
    fn extract_sheets(
        &self,
        inputs: &SheetInputs<'_>,
        seed: &StyleResolver<'_>,
    ) -> Result<Vec<SheetOutput>> {
        use rayon::prelude::*;

        let sheets = inputs.container.sheets();
        if !self.options.parallel || sheets.len() < 2 {
            return self.extract_sequential(inputs, seed);
        }

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.worker_threads.unwrap_or(0))
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                log::warn!("worker pool unavailable ({e}), extracting sequentially");
                return self.extract_sequential(inputs, seed);
            }
        };

        pool.install(|| {
            sheets
                .par_iter()
                .enumerate()
                .map_init(
                    || seed.fork(),
                    |resolver, (index, node)| self.extract_sheet(inputs, resolver, index, node),
                )
                .collect()
        })
    }

    #[cfg(not(feature = "parallel"))]
    fn extract_sheets(
        &self,
        inputs: &SheetInputs<'_>,
        seed: &StyleResolver<'_>,
    ) -> Result<Vec<SheetOutput>> {
        self.extract_sequential(inputs, seed)
    }

    fn extract_sequential(
        &self,
        inputs: &SheetInputs<'_>,
        seed: &StyleResolver<'_>,
    ) -> Result<Vec<SheetOutput>> {
        let mut resolver = seed.fork();
        inputs
            .container
            .sheets()
            .iter()
            .enumerate()
            .map(|(index, node)| self.extract_sheet(inputs, &mut resolver, index, node))
            .collect()
    }

    /// Run the extractors for one sheet: structure, cells, rules, charts,
    /// then images.
    fn extract_sheet(
        &self,
        inputs: &SheetInputs<'_>,
        resolver: &mut StyleResolver<'_>,
        index: usize,
        node: &SheetNode,
    ) -> Result<SheetOutput> {
        self.cancel.check()?;
        let caps = inputs.capabilities;
        let palette = inputs.container.palette();
        let mut diags = Diagnostics::for_sheet(&node.name);

        let structure = structure::extract(node, palette, &mut diags);

        let cells = cells::extract(node, resolver, inputs.date_1904, &mut diags)
            .map_err(|e| e.in_stage(Stage::Cells, Some(&node.name)))?;

        let data_validations = if caps.supports(Feature::DataValidation) {
            rules::data_validations(node, &mut diags)
        } else {
            Vec::new()
        };
        let conditional_formatting = if caps.supports(Feature::ConditionalFormatting) {
            rules::conditional_formatting(node, resolver, &mut diags)
        } else {
            Vec::new()
        };

        let charts = if caps.supports(Feature::Charts) {
            charts::extract(node, palette, self.options.chart_degradation, &mut diags)
        } else {
            Vec::new()
        };

        let images = if caps.supports(Feature::Images) {
            images::extract(node, self.options.max_image_bytes, &mut diags)
        } else {
            Vec::new()
        };

        log::debug!(
            "sheet '{}': {} cells, {} merges, {} charts, {} images",
            node.name,
            cells.len(),
            structure.merges.len(),
            charts.len(),
            images.len()
        );

        let worksheet = Worksheet {
            name: node.name.clone(),
            index,
            state: node.state,
            cells,
            merges: structure.merges,
            columns: structure.columns,
            rows: structure.rows,
            default_column_width: structure.default_column_width,
            default_row_height: structure.default_row_height,
            freeze_pane: structure.freeze_pane,
            auto_filter: structure.auto_filter,
            tab_color: structure.tab_color,
            view: structure.view,
            page: structure.page,
            data_validations,
            conditional_formatting,
            charts,
            images,
        };
        Ok((worksheet, diags.into_vec()))
    }
}

/// Sheet names are compared case-insensitively, as spreadsheet apps do.
fn check_unique_names(sheets: &[SheetNode]) -> Result<()> {
    let mut seen = HashSet::with_capacity(sheets.len());
    for sheet in sheets {
        if !seen.insert(sheet.name.to_lowercase()) {
            return Err(XlcanonError::DuplicateSheetName(sheet.name.clone()));
        }
    }
    Ok(())
}

fn properties(raw: &RawProperties, diags: &mut Diagnostics) -> DocumentProperties {
    DocumentProperties {
        title: raw.title.clone(),
        subject: raw.subject.clone(),
        creator: raw.creator.clone(),
        keywords: raw.keywords.clone(),
        description: raw.description.clone(),
        last_modified_by: raw.last_modified_by.clone(),
        created: timestamp(raw.created.as_deref(), "created", diags),
        modified: timestamp(raw.modified.as_deref(), "modified", diags),
        category: raw.category.clone(),
        content_status: raw.content_status.clone(),
        application: raw.application.clone(),
    }
}

fn timestamp(text: Option<&str>, field: &str, diags: &mut Diagnostics) -> Option<DateTime<Utc>> {
    let text = text?.trim();
    match DateTime::parse_from_rfc3339(text) {
        Ok(parsed) => Some(parsed.with_timezone(&Utc)),
        Err(e) => {
            diags.warn(
                DiagnosticKind::InvalidMetadata,
                Some(field.to_string()),
                format!("unparseable {field} timestamp {text:?}: {e}"),
            );
            None
        }
    }
}

/// Absent means automatic; an unknown mode is reported and treated the same.
fn calculation_mode(text: Option<&str>, diags: &mut Diagnostics) -> CalculationMode {
    let Some(text) = text else {
        return CalculationMode::Auto;
    };
    CalculationMode::from_str_val(text).unwrap_or_else(|| {
        diags.warn(
            DiagnosticKind::InvalidMetadata,
            Some("calcMode".to_string()),
            format!("unknown calculation mode {text:?}"),
        );
        CalculationMode::Auto
    })
}

fn defined_names(meta: &WorkbookMeta) -> Vec<DefinedName> {
    meta.defined_names
        .iter()
        .map(|d| DefinedName {
            name: d.name.clone(),
            value: d.value.clone(),
            local_sheet: d.local_sheet,
            hidden: d.hidden,
        })
        .collect()
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
    use crate::source::{OpenXmlContainer, StyleRecord, StyleTable, WorkbookNode};
    use chrono::TimeZone;

    fn container(names: &[&str]) -> OpenXmlContainer {
        OpenXmlContainer::new(WorkbookNode {
            metadata: Some(WorkbookMeta::default()),
            sheets: names.iter().map(|n| SheetNode::new(*n)).collect(),
            ..WorkbookNode::default()
        })
    }

    #[test]
    fn test_duplicate_sheet_names_case_insensitive() {
        let err = Analyzer::default()
            .analyze(&container(&["Data", "data"]))
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Metadata));
        assert!(matches!(err.root(), XlcanonError::DuplicateSheetName(n) if n == "data"));
    }

    #[test]
    fn test_missing_metadata() {
        let err = Analyzer::default()
            .analyze(&OpenXmlContainer::new(WorkbookNode::default()))
            .unwrap_err();
        assert!(matches!(err.root(), XlcanonError::MissingMetadata(_)));
    }

    #[test]
    fn test_cyclic_default_style_is_fatal() {
        let tree = WorkbookNode {
            metadata: Some(WorkbookMeta::default()),
            styles: StyleTable {
                records: vec![StyleRecord {
                    parent: Some(0),
                    ..StyleRecord::default()
                }],
                ..StyleTable::default()
            },
            ..WorkbookNode::default()
        };
        let err = Analyzer::default()
            .analyze(&OpenXmlContainer::new(tree))
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Styles));
    }

    #[test]
    fn test_properties_timestamps() {
        let raw = RawProperties {
            title: Some("Report".into()),
            created: Some("2024-03-01T12:30:00Z".into()),
            modified: Some("yesterday".into()),
            ..RawProperties::default()
        };
        let mut diags = Diagnostics::for_workbook();
        let props = properties(&raw, &mut diags);

        assert_eq!(
            props.created,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap())
        );
        assert!(props.modified.is_none());
        let items = diags.into_vec();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, DiagnosticKind::InvalidMetadata);
        assert_eq!(items[0].location.as_deref(), Some("modified"));
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let err = Analyzer::default()
            .with_cancellation(token)
            .analyze(&container(&["A"]))
            .unwrap_err();
        assert!(matches!(err, XlcanonError::Cancelled));
    }

    #[test]
    fn test_active_sheet_out_of_range_is_dropped() {
        let mut tree = container(&["A", "B"]).into_tree();
        tree.metadata = Some(WorkbookMeta {
            active_sheet: Some(5),
            ..WorkbookMeta::default()
        });

        let wb = Analyzer::default()
            .analyze(&OpenXmlContainer::new(tree))
            .unwrap();
        assert_eq!(wb.active_sheet, None);
        assert_eq!(wb.worksheets[1].index, 1);
    }

    #[test]
    fn test_calculation_mode() {
        let analyze = |mode: Option<&str>| {
            let mut tree = container(&["A"]).into_tree();
            tree.metadata = Some(WorkbookMeta {
                calculation_mode: mode.map(str::to_string),
                ..WorkbookMeta::default()
            });
            Analyzer::default()
                .analyze(&OpenXmlContainer::new(tree))
                .unwrap()
        };

        assert_eq!(analyze(None).calculation_mode, CalculationMode::Auto);
        assert_eq!(analyze(Some("manual")).calculation_mode, CalculationMode::Manual);

        let wb = analyze(Some("sometimes"));
        assert_eq!(wb.calculation_mode, CalculationMode::Auto);
        let invalid: Vec<_> = wb
            .diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::InvalidMetadata)
            .collect();
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid[0].location.as_deref(), Some("calcMode"));
    }
}
