//! Chart metadata descriptors (`xl/charts/chart*.xml`).
//!
//! Charts are preserved, not interpreted: the parser extracts a small
//! descriptor (type, title, series count) and keeps the raw part bytes so
//! a writer can re-emit the chart literally.

use quick_xml::events::Event;

use crate::sax;
use crate::Result;

/// The recognized chart families. Unrecognized plot elements keep their tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartType {
    Bar,
    Column,
    Line,
    Pie,
    Area,
    Scatter,
    Doughnut,
    Radar,
    Bubble,
    Unknown(String),
}

/// Descriptor for one chart part.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub chart_type: ChartType,
    pub title: Option<String>,
    pub series_count: usize,
    /// The untouched part payload, re-emitted verbatim on write.
    pub raw_xml: Vec<u8>,
}

impl ChartData {
    /// The literal bytes to write back into a package.
    pub fn to_xml(&self) -> &[u8] {
        &self.raw_xml
    }
}

/// Parse a chart part into a descriptor, keeping the payload verbatim.
pub fn parse_chart(part: &str, data: &[u8]) -> Result<ChartData> {
    let mut reader = sax::reader(data);
    let mut buf = Vec::new();

    let mut chart_type: Option<ChartType> = None;
    let mut series_count = 0usize;
    let mut title: Option<String> = None;
    let mut in_title = false;
    let mut title_depth = 0usize;
    let mut in_title_text = false;
    let mut title_buf = String::new();

    loop {
        buf.clear();
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| crate::Error::malformed(part, e))?;
        match event {
            Event::Start(ref e) => {
                let local = e.local_name();
                let local = local.as_ref();
                if in_title {
                    title_depth += 1;
                    if local == b"t" {
                        in_title_text = true;
                    }
                } else if local == b"title" {
                    in_title = true;
                    title_depth = 0;
                } else {
                    classify_plot_element(local, &mut chart_type, &mut series_count);
                }
            }
            Event::Empty(ref e) => {
                if !in_title {
                    classify_plot_element(e.local_name().as_ref(), &mut chart_type, &mut series_count);
                }
            }
            Event::Text(ref t) => {
                if in_title_text {
                    title_buf.push_str(&t.unescape().map_err(|e| crate::Error::malformed(part, e))?);
                }
            }
            Event::End(ref e) => {
                if in_title {
                    if e.local_name().as_ref() == b"t" {
                        in_title_text = false;
                    }
                    if title_depth == 0 {
                        in_title = false;
                        if !title_buf.is_empty() {
                            title = Some(std::mem::take(&mut title_buf));
                        }
                    } else {
                        title_depth -= 1;
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(ChartData {
        chart_type: chart_type.unwrap_or_else(|| ChartType::Unknown("chart".to_string())),
        title,
        series_count,
        raw_xml: data.to_vec(),
    })
}

/// Map a plot-area child element to a chart family, and count series.
fn classify_plot_element(local: &[u8], chart_type: &mut Option<ChartType>, series: &mut usize) {
    match local {
        b"ser" => *series += 1,
        b"barChart" | b"bar3DChart" => {
            // Direction is refined later by <barDir>; default to bar.
            if chart_type.is_none() {
                *chart_type = Some(ChartType::Bar);
            }
        }
        b"lineChart" | b"line3DChart" => assign(chart_type, ChartType::Line),
        b"pieChart" | b"pie3DChart" => assign(chart_type, ChartType::Pie),
        b"areaChart" | b"area3DChart" => assign(chart_type, ChartType::Area),
        b"scatterChart" => assign(chart_type, ChartType::Scatter),
        b"doughnutChart" => assign(chart_type, ChartType::Doughnut),
        b"radarChart" => assign(chart_type, ChartType::Radar),
        b"bubbleChart" => assign(chart_type, ChartType::Bubble),
        _ if local.ends_with(b"Chart") => {
            let tag = String::from_utf8_lossy(local).into_owned();
            assign(chart_type, ChartType::Unknown(tag));
        }
        _ => {}
    }
}

fn assign(slot: &mut Option<ChartType>, value: ChartType) {
    if slot.is_none() {
        *slot = Some(value);
    }
}

/// Refine bar charts into columns when the bar direction is vertical.
pub fn refine_bar_direction(data: &mut ChartData) {
    if data.chart_type != ChartType::Bar {
        return;
    }
    // <c:barDir val="col"/> marks a column chart.
    let raw = String::from_utf8_lossy(&data.raw_xml);
    if let Some(pos) = raw.find("barDir") {
        let tail = &raw[pos..raw.len().min(pos + 40)];
        if tail.contains("val=\"col\"") {
            data.chart_type = ChartType::Column;
        }
    }
}
