//! Chart part parsing (xl/charts/chartN.xml).
//!
//! Charts are reached from a drawing's `graphicFrame` through the drawing
//! relationships. A chart part looks like:
//!
//! ```xml
//! <c:chartSpace>
//!   <c:chart>
//!     <c:title><c:tx><c:rich><a:p><a:r><a:t>Sales</a:t></a:r></a:p></c:rich></c:tx></c:title>
//!     <c:plotArea>
//!       <c:barChart>
//!         <c:barDir val="col"/>
//!         <c:grouping val="clustered"/>
//!         <c:ser>
//!           <c:idx val="0"/>
//!           <c:tx><c:strRef><c:f>Sheet1!$B$1</c:f></c:strRef></c:tx>
//!           <c:cat><c:strRef><c:f>Sheet1!$A$2:$A$5</c:f></c:strRef></c:cat>
//!           <c:val><c:numRef><c:f>Sheet1!$B$2:$B$5</c:f></c:numRef></c:val>
//!         </c:ser>
//!       </c:barChart>
//!       <c:catAx>...</c:catAx>
//!       <c:valAx>...</c:valAx>
//!     </c:plotArea>
//!     <c:legend><c:legendPos val="r"/></c:legend>
//!   </c:chart>
//! </c:chartSpace>
//! ```

use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::Result;
use crate::source::{AxisNode, ChartNode, DataRefNode, LegendNode, RawColor, SeriesNode};
use crate::xml_helpers::{attr_string, attr_u32, attr_val, attr_val_f64, attr_val_u32, read_text};

use super::theme::scheme_color_index;

const AXIS_ELEMENTS: [&[u8]; 4] = [b"catAx", b"valAx", b"dateAx", b"serAx"];

/// Which part of a series a reference or cache belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeriesPart {
    Name,
    Categories,
    Values,
}

/// Parse a chart part. Unreadable XML leaves `error` set on the result,
/// keeping whatever was read before the failure.
pub(super) fn parse_chart<R: BufRead>(reader: R) -> ChartNode {
    let mut chart = ChartNode::default();
    if let Err(e) = read_chart(reader, &mut chart) {
        log::warn!("chart part is malformed: {e}");
        chart.error = Some(e.to_string());
    }
    chart
}

#[allow(clippy::too_many_lines)]
fn read_chart<R: BufRead>(reader: R, chart: &mut ChartNode) -> Result<()> {
    let mut xml = Reader::from_reader(reader);
    // Title runs keep their edge spaces
    xml.trim_text(false);

    let mut buf = Vec::new();
    // Open element names; text elements read whole are never pushed
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut current_series: Option<SeriesNode> = None;
    let mut current_axis: Option<AxisNode> = None;
    let mut current_pt: Option<usize> = None;
    let mut title_text = String::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(ref event @ (Event::Start(ref e) | Event::Empty(ref e))) => {
                let is_start = matches!(event, Event::Start(_));
                let local_name = e.local_name();
                let name = local_name.as_ref();
                let parent = stack.last().map_or(&b""[..], Vec::as_slice);
                let mut consumed = false;

                match name {
                    _ if parent == b"plotArea" && name.ends_with(b"Chart") => {
                        if chart.plot_type.is_none() {
                            chart.plot_type =
                                Some(String::from_utf8_lossy(name).into_owned());
                        }
                    }
                    b"barDir" if chart.bar_direction.is_none() => {
                        chart.bar_direction = attr_val(e);
                    }
                    b"grouping" if parent.ends_with(b"Chart") && chart.grouping.is_none() => {
                        chart.grouping = attr_val(e);
                    }
                    b"ser" if is_start => current_series = Some(SeriesNode::default()),
                    b"idx" if parent == b"ser" => {
                        if let Some(series) = current_series.as_mut() {
                            series.index = attr_val_u32(e).unwrap_or(0);
                        }
                    }
                    b"ptCount" => {
                        let count = attr_val_u32(e).and_then(|n| usize::try_from(n).ok());
                        if let (Some(series), Some(part), Some(count)) =
                            (current_series.as_mut(), series_part(&stack), count)
                        {
                            let numeric = is_numeric_cache(&stack);
                            if let Some(data) = data_ref(series, part) {
                                if numeric {
                                    data.num_cache.resize(count, None);
                                } else {
                                    data.str_cache.resize(count, String::new());
                                }
                            }
                        }
                    }
                    b"pt" => {
                        current_pt = attr_u32(e, b"idx").and_then(|i| usize::try_from(i).ok());
                    }
                    b"f" if is_start => {
                        consumed = true;
                        let formula = read_text(&mut xml)?.trim().to_string();
                        if let (Some(series), Some(part)) =
                            (current_series.as_mut(), series_part(&stack))
                        {
                            match part {
                                SeriesPart::Name => series.name_ref = Some(formula),
                                _ => {
                                    if let Some(data) = data_ref(series, part) {
                                        data.formula = Some(formula);
                                    }
                                }
                            }
                        }
                    }
                    b"v" if is_start => {
                        consumed = true;
                        let text = read_text(&mut xml)?;
                        if let Some(series) = current_series.as_mut() {
                            store_value(series, &stack, current_pt, text);
                        } else if stack.iter().any(|n| n == b"title") {
                            push_title_text(&mut title_text, text.trim());
                        }
                    }
                    b"t" if is_start => {
                        consumed = true;
                        let text = read_text(&mut xml)?;
                        if stack.iter().any(|n| n == b"title") {
                            title_text.push_str(&text);
                        }
                    }
                    b"p" if stack.iter().any(|n| n == b"title") && !title_text.is_empty() => {
                        title_text.push(' ');
                    }
                    b"srgbClr" | b"schemeClr" if is_series_fill(&stack) => {
                        if let Some(series) = current_series.as_mut() {
                            if series.color.is_none() {
                                series.color = series_color(name, attr_val(e));
                            }
                        }
                    }
                    _ if parent == b"plotArea" && AXIS_ELEMENTS.contains(&name) => {
                        current_axis = Some(AxisNode {
                            element: String::from_utf8_lossy(name).into_owned(),
                            ..AxisNode::default()
                        });
                    }
                    b"axPos" | b"min" | b"max" | b"majorUnit" | b"minorUnit" | b"numFmt"
                    | b"delete" => {
                        if let Some(axis) = current_axis.as_mut() {
                            match name {
                                b"axPos" => axis.position = attr_val(e),
                                b"min" if parent == b"scaling" => axis.min = attr_val_f64(e),
                                b"max" if parent == b"scaling" => axis.max = attr_val_f64(e),
                                b"majorUnit" => axis.major_unit = attr_val_f64(e),
                                b"minorUnit" => axis.minor_unit = attr_val_f64(e),
                                b"numFmt" if AXIS_ELEMENTS.contains(&parent) => {
                                    axis.number_format = attr_string(e, b"formatCode");
                                }
                                b"delete" => {
                                    axis.deleted =
                                        attr_val(e).is_some_and(|v| v == "1" || v == "true");
                                }
                                _ => {}
                            }
                        }
                    }
                    b"legend" if parent == b"chart" => {
                        chart.legend = Some(LegendNode::default());
                    }
                    b"legendPos" | b"overlay" if parent == b"legend" => {
                        if let Some(legend) = chart.legend.as_mut() {
                            if name == b"legendPos" {
                                legend.position = attr_val(e);
                            } else {
                                legend.overlay =
                                    attr_val(e).is_some_and(|v| v == "1" || v == "true");
                            }
                        }
                    }
                    _ => {}
                }

                if is_start && !consumed {
                    stack.push(name.to_vec());
                }
            }

            Ok(Event::End(ref e)) => {
                stack.pop();
                match e.local_name().as_ref() {
                    b"ser" => {
                        if let Some(series) = current_series.take() {
                            chart.series.push(series);
                        }
                    }
                    b"pt" => current_pt = None,
                    b"title" => {
                        let text = std::mem::take(&mut title_text);
                        let text = text.trim();
                        if !text.is_empty() {
                            if let Some(axis) = current_axis.as_mut() {
                                axis.title = Some(text.to_string());
                            } else if current_series.is_none() && chart.title.is_none() {
                                chart.title = Some(text.to_string());
                            }
                        }
                    }
                    name if AXIS_ELEMENTS.contains(&name) => {
                        if let Some(axis) = current_axis.take() {
                            chart.axes.push(axis);
                        }
                    }
                    _ => {}
                }
            }

            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

/// The series part enclosing the current position, if any.
fn series_part(stack: &[Vec<u8>]) -> Option<SeriesPart> {
    let ser = stack.iter().rposition(|n| n == b"ser")?;
    match stack.get(ser + 1)?.as_slice() {
        b"tx" => Some(SeriesPart::Name),
        b"cat" | b"xVal" => Some(SeriesPart::Categories),
        b"val" | b"yVal" => Some(SeriesPart::Values),
        _ => None,
    }
}

fn is_numeric_cache(stack: &[Vec<u8>]) -> bool {
    stack
        .iter()
        .any(|n| matches!(n.as_slice(), b"numRef" | b"numLit" | b"numCache"))
}

fn data_ref(series: &mut SeriesNode, part: SeriesPart) -> Option<&mut DataRefNode> {
    match part {
        SeriesPart::Name => None,
        SeriesPart::Categories => Some(series.categories.get_or_insert_with(DataRefNode::default)),
        SeriesPart::Values => Some(series.values.get_or_insert_with(DataRefNode::default)),
    }
}

fn store_value(series: &mut SeriesNode, stack: &[Vec<u8>], pt: Option<usize>, text: String) {
    let Some(part) = series_part(stack) else {
        return;
    };
    if part == SeriesPart::Name {
        if series.name.is_none() {
            series.name = Some(text);
        }
        return;
    }

    let numeric = is_numeric_cache(stack);
    let Some(data) = data_ref(series, part) else {
        return;
    };
    let index = pt.unwrap_or(if numeric {
        data.num_cache.len()
    } else {
        data.str_cache.len()
    });

    if numeric {
        if data.num_cache.len() <= index {
            data.num_cache.resize(index + 1, None);
        }
        if let Some(slot) = data.num_cache.get_mut(index) {
            *slot = text.trim().parse().ok();
        }
    } else {
        if data.str_cache.len() <= index {
            data.str_cache.resize(index + 1, String::new());
        }
        if let Some(slot) = data.str_cache.get_mut(index) {
            *slot = text;
        }
    }
}

/// Series fill: `ser/spPr/solidFill/<color>`. Line and point fills are skipped.
fn is_series_fill(stack: &[Vec<u8>]) -> bool {
    matches!(
        stack,
        [.., ser, sp_pr, fill] if ser == b"ser" && sp_pr == b"spPr" && fill == b"solidFill"
    )
}

fn series_color(element: &[u8], val: Option<String>) -> Option<RawColor> {
    let val = val?;
    match element {
        b"srgbClr" => Some(RawColor::Rgb(val)),
        _ => scheme_color_index(&val).map(|index| RawColor::Theme { index, tint: 0.0 }),
    }
}

fn push_title_text(title: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    if !title.is_empty() {
        title.push(' ');
    }
    title.push_str(text);
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

    const BAR_CHART: &str = r##"<c:chartSpace xmlns:c="http://schemas.openxmlformats.org/drawingml/2006/chart" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">
  <c:chart>
    <c:title><c:tx><c:rich><a:p><a:r><a:t>Quarterly </a:t></a:r><a:r><a:t>Sales</a:t></a:r></a:p></c:rich></c:tx><c:overlay val="0"/></c:title>
    <c:plotArea>
      <c:barChart>
        <c:barDir val="bar"/>
        <c:grouping val="stacked"/>
        <c:ser>
          <c:idx val="2"/>
          <c:tx><c:strRef><c:f>Sheet1!$B$1</c:f><c:strCache><c:ptCount val="1"/><c:pt idx="0"><c:v>Revenue</c:v></c:pt></c:strCache></c:strRef></c:tx>
          <c:spPr><a:solidFill><a:schemeClr val="accent2"/></a:solidFill><a:ln><a:solidFill><a:srgbClr val="000000"/></a:solidFill></a:ln></c:spPr>
          <c:cat><c:strRef><c:f>Sheet1!$A$2:$A$4</c:f><c:strCache><c:ptCount val="3"/><c:pt idx="0"><c:v>Q1</c:v></c:pt><c:pt idx="1"><c:v>Q2</c:v></c:pt><c:pt idx="2"><c:v>Q3</c:v></c:pt></c:strCache></c:strRef></c:cat>
          <c:val><c:numRef><c:f>Sheet1!$B$2:$B$4</c:f><c:numCache><c:formatCode>General</c:formatCode><c:ptCount val="3"/><c:pt idx="0"><c:v>10</c:v></c:pt><c:pt idx="2"><c:v>30.5</c:v></c:pt></c:numCache></c:numRef></c:val>
        </c:ser>
      </c:barChart>
      <c:catAx><c:axId val="1"/><c:scaling><c:orientation val="minMax"/></c:scaling><c:delete val="0"/><c:axPos val="l"/></c:catAx>
      <c:valAx>
        <c:axId val="2"/>
        <c:scaling><c:orientation val="minMax"/><c:max val="100"/><c:min val="0"/></c:scaling>
        <c:delete val="1"/>
        <c:axPos val="b"/>
        <c:title><c:tx><c:rich><a:p><a:r><a:t>Amount</a:t></a:r></a:p></c:rich></c:tx></c:title>
        <c:numFmt formatCode="#,##0" sourceLinked="0"/>
        <c:majorUnit val="25"/>
      </c:valAx>
    </c:plotArea>
    <c:legend><c:legendPos val="b"/><c:overlay val="1"/></c:legend>
  </c:chart>
</c:chartSpace>"##;

    #[test]
    fn test_bar_chart() {
        let chart = parse_chart(BAR_CHART.as_bytes());

        assert_eq!(chart.error, None);
        assert_eq!(chart.plot_type.as_deref(), Some("barChart"));
        assert_eq!(chart.title.as_deref(), Some("Quarterly Sales"));
        assert_eq!(chart.bar_direction.as_deref(), Some("bar"));
        assert_eq!(chart.grouping.as_deref(), Some("stacked"));
        assert_eq!(
            chart.legend,
            Some(LegendNode {
                position: Some("b".into()),
                overlay: true
            })
        );

        assert_eq!(chart.series.len(), 1);
        let series = &chart.series[0];
        assert_eq!(series.index, 2);
        assert_eq!(series.name.as_deref(), Some("Revenue"));
        assert_eq!(series.name_ref.as_deref(), Some("Sheet1!$B$1"));
        assert_eq!(series.color, Some(RawColor::Theme { index: 5, tint: 0.0 }));

        let categories = series.categories.as_ref().unwrap();
        assert_eq!(categories.formula.as_deref(), Some("Sheet1!$A$2:$A$4"));
        assert_eq!(categories.str_cache, vec!["Q1", "Q2", "Q3"]);

        let values = series.values.as_ref().unwrap();
        assert_eq!(values.formula.as_deref(), Some("Sheet1!$B$2:$B$4"));
        assert_eq!(values.num_cache, vec![Some(10.0), None, Some(30.5)]);

        assert_eq!(chart.axes.len(), 2);
        assert_eq!(chart.axes[0].element, "catAx");
        assert_eq!(chart.axes[0].position.as_deref(), Some("l"));
        assert!(!chart.axes[0].deleted);
        let value_axis = &chart.axes[1];
        assert_eq!(value_axis.title.as_deref(), Some("Amount"));
        assert_eq!(value_axis.min, Some(0.0));
        assert_eq!(value_axis.max, Some(100.0));
        assert_eq!(value_axis.major_unit, Some(25.0));
        assert_eq!(value_axis.number_format.as_deref(), Some("#,##0"));
        assert!(value_axis.deleted);
    }

    #[test]
    fn test_scatter_uses_x_and_y_values() {
        let xml = r#"<c:chartSpace xmlns:c="c"><c:chart><c:plotArea><c:scatterChart>
  <c:ser><c:idx val="0"/>
    <c:xVal><c:numRef><c:f>S!$A$1:$A$2</c:f><c:numCache><c:pt idx="0"><c:v>1</c:v></c:pt><c:pt idx="1"><c:v>2</c:v></c:pt></c:numCache></c:numRef></c:xVal>
    <c:yVal><c:numRef><c:f>S!$B$1:$B$2</c:f><c:numCache><c:pt idx="0"><c:v>4</c:v></c:pt><c:pt idx="1"><c:v>8</c:v></c:pt></c:numCache></c:numRef></c:yVal>
  </c:ser>
</c:scatterChart></c:plotArea></c:chart></c:chartSpace>"#;
        let chart = parse_chart(xml.as_bytes());

        assert_eq!(chart.plot_type.as_deref(), Some("scatterChart"));
        let series = &chart.series[0];
        assert_eq!(
            series.categories.as_ref().unwrap().num_cache,
            vec![Some(1.0), Some(2.0)]
        );
        assert_eq!(
            series.values.as_ref().unwrap().num_cache,
            vec![Some(4.0), Some(8.0)]
        );
        assert_eq!(chart.title, None);
        assert_eq!(chart.legend, None);
    }

    #[test]
    fn test_malformed_part_sets_error() {
        let xml = r#"<c:chartSpace xmlns:c="c"><c:chart><c:plotArea><c:lineChart></c:barChart>"#;
        let chart = parse_chart(xml.as_bytes());
        assert!(chart.error.is_some());
        assert_eq!(chart.plot_type.as_deref(), Some("lineChart"));
    }
}
