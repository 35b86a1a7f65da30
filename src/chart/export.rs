use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use log::info;
use serde::{Deserialize, Serialize};

use super::figure::{Figure, Trace, TraceMode, TraceType};
use crate::color::{hex_to_rgb, series_color};
use crate::data::model::CellValue;
use crate::error::ChartError;

// ---------------------------------------------------------------------------
// Export format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Jpg,
    Png,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Jpg => "jpg",
            ExportFormat::Png => "png",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "jpg" | "jpeg" => Ok(ExportFormat::Jpg),
            "png" => Ok(ExportFormat::Png),
            _ => Err(ChartError::UnknownExportFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

// ---------------------------------------------------------------------------
// Exporter seam
// ---------------------------------------------------------------------------

/// Turns a chart description into document or image bytes.
pub trait ChartExporter {
    fn export(&self, figure: &Figure, format: ExportFormat) -> Result<Vec<u8>, ChartError>;
}

/// Parse a serialized chart description and export it.
pub fn export_chart(
    document: &str,
    format: ExportFormat,
    exporter: &dyn ChartExporter,
) -> Result<Vec<u8>, ChartError> {
    let figure = Figure::from_json(document)?;
    exporter.export(&figure, format)
}

// ---------------------------------------------------------------------------
// Raster exporter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    pub width: u32,
    pub height: u32,
    /// Blank border around the plot area, in pixels.
    pub margin: u32,
    /// 1..=100
    pub jpeg_quality: u8,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
            margin: 60,
            jpeg_quality: 90,
        }
    }
}

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([68, 68, 68]);
const GRID: Rgb<u8> = Rgb([220, 220, 220]);
const MIN_PLOT_SIDE: u32 = 16;

/// Draws traces onto a bitmap and encodes it as JPEG or PNG.
///
/// Only axes and series are drawn. The layout title, the axis titles and the
/// tick labels are left out, so that text is lost in the image. PDF is not
/// supported.
#[derive(Debug, Clone, Default)]
pub struct RasterExporter {
    pub config: RasterConfig,
}

impl RasterExporter {
    pub fn new(config: RasterConfig) -> Self {
        Self { config }
    }

    pub fn render(&self, figure: &Figure) -> RgbImage {
        let width = self.config.width.max(MIN_PLOT_SIDE);
        let height = self.config.height.max(MIN_PLOT_SIDE);
        // a margin that would swallow the plot area shrinks to fit
        let margin = self.config.margin.min((width.min(height) - MIN_PLOT_SIDE) / 2);
        let mut img = RgbImage::from_pixel(width, height, WHITE);

        let area = PlotArea {
            left: margin as f64,
            top: margin as f64,
            right: (width - margin) as f64,
            bottom: (height - margin) as f64,
        };
        let xs = XScale::from_traces(&figure.data);
        let ys = YScale::from_traces(&figure.data);

        if ys.min < 0.0 && ys.max > 0.0 {
            let y0 = area.y(&ys, 0.0);
            draw_line(&mut img, (area.left, y0), (area.right, y0), GRID, 1.0);
        }
        draw_line(&mut img, (area.left, area.bottom), (area.right, area.bottom), AXIS, 1.0);
        draw_line(&mut img, (area.left, area.top), (area.left, area.bottom), AXIS, 1.0);

        let n_bars = figure.data.iter().filter(|t| t.kind == TraceType::Bar).count();
        let mut bar_idx = 0;
        for (idx, trace) in figure.data.iter().enumerate() {
            let color = Rgb(hex_to_rgb(trace.color().unwrap_or(series_color(idx))));
            match trace.kind {
                TraceType::Bar => {
                    draw_bars(&mut img, trace, &area, &xs, &ys, bar_idx, n_bars, color);
                    bar_idx += 1;
                }
                TraceType::Scatter => draw_scatter(&mut img, trace, &area, &xs, &ys, color),
            }
        }
        img
    }

    fn encode(&self, img: RgbImage, format: ExportFormat) -> Result<Vec<u8>, ChartError> {
        let mut buf = Vec::new();
        match format {
            ExportFormat::Jpg => {
                let quality = self.config.jpeg_quality.clamp(1, 100);
                JpegEncoder::new_with_quality(&mut buf, quality).encode_image(&img)?;
            }
            ExportFormat::Png => {
                DynamicImage::ImageRgb8(img).write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
            }
            ExportFormat::Pdf => return Err(ChartError::UnsupportedExportFormat(format)),
        }
        Ok(buf)
    }
}

impl ChartExporter for RasterExporter {
    fn export(&self, figure: &Figure, format: ExportFormat) -> Result<Vec<u8>, ChartError> {
        if format == ExportFormat::Pdf {
            return Err(ChartError::UnsupportedExportFormat(format));
        }
        let img = self.render(figure);
        let bytes = self.encode(img, format)?;
        info!(
            "exported {} trace(s) as {format} ({} bytes)",
            figure.data.len(),
            bytes.len()
        );
        Ok(bytes)
    }
}

// ---------------------------------------------------------------------------
// Scales
// ---------------------------------------------------------------------------

struct PlotArea {
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
}

impl PlotArea {
    fn y(&self, ys: &YScale, v: f64) -> f64 {
        self.bottom - (v - ys.min) / (ys.max - ys.min) * (self.bottom - self.top)
    }
}

/// Numeric x positions when every x value is a number, categories otherwise.
enum XScale {
    Numeric { min: f64, max: f64, slots: usize },
    Category(Vec<String>),
}

impl XScale {
    fn from_traces(traces: &[Trace]) -> Self {
        let values: Vec<&CellValue> = traces
            .iter()
            .flat_map(|t| t.x.iter())
            .filter(|v| !v.is_blank())
            .collect();

        if !values.is_empty() && values.iter().all(|v| v.as_f64().is_some()) {
            let nums: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
            let min = nums.iter().copied().fold(f64::INFINITY, f64::min);
            let max = nums.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let mut distinct = nums.clone();
            distinct.sort_by(f64::total_cmp);
            distinct.dedup();
            return XScale::Numeric {
                min,
                max,
                slots: distinct.len(),
            };
        }

        let mut categories: Vec<String> = Vec::new();
        for v in values {
            let label = v.to_string();
            if !categories.contains(&label) {
                categories.push(label);
            }
        }
        XScale::Category(categories)
    }

    fn slots(&self) -> usize {
        let n = match self {
            XScale::Numeric { slots, .. } => *slots,
            XScale::Category(c) => c.len(),
        };
        n.max(1)
    }

    fn position(&self, v: &CellValue, area: &PlotArea) -> Option<f64> {
        let span = area.right - area.left;
        match self {
            XScale::Numeric { min, max, .. } => {
                let v = v.as_f64()?;
                let frac = if max > min { (v - min) / (max - min) } else { 0.5 };
                // keep half a slot free at each end so bars fit
                let pad = span / (2.0 * self.slots() as f64);
                Some(area.left + pad + frac * (span - 2.0 * pad))
            }
            XScale::Category(categories) => {
                let label = v.to_string();
                let idx = categories.iter().position(|c| *c == label)?;
                Some(area.left + (idx as f64 + 0.5) * span / categories.len() as f64)
            }
        }
    }
}

struct YScale {
    min: f64,
    max: f64,
}

impl YScale {
    fn from_traces(traces: &[Trace]) -> Self {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in traces.iter().flat_map(|t| t.y.iter()).filter_map(CellValue::as_f64) {
            min = min.min(v);
            max = max.max(v);
        }
        if traces.iter().any(|t| t.kind == TraceType::Bar) {
            min = min.min(0.0);
            max = max.max(0.0);
        }
        if !min.is_finite() || !max.is_finite() {
            return YScale { min: 0.0, max: 1.0 };
        }
        if max - min < f64::EPSILON {
            return YScale {
                min: min - 1.0,
                max: max + 1.0,
            };
        }
        let pad = (max - min) * 0.05;
        YScale {
            min: min - pad,
            max: max + pad,
        }
    }
}

// ---------------------------------------------------------------------------
// Drawing
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn draw_bars(
    img: &mut RgbImage,
    trace: &Trace,
    area: &PlotArea,
    xs: &XScale,
    ys: &YScale,
    bar_idx: usize,
    n_bars: usize,
    color: Rgb<u8>,
) {
    let slot = (area.right - area.left) / xs.slots() as f64;
    let group = slot * 0.8;
    let bar = group / n_bars.max(1) as f64;
    let base = area.y(ys, 0.0_f64.clamp(ys.min, ys.max));

    for (x, y) in trace.x.iter().zip(&trace.y) {
        let (Some(center), Some(v)) = (xs.position(x, area), y.as_f64()) else {
            continue;
        };
        let left = center - group / 2.0 + bar_idx as f64 * bar;
        let top = area.y(ys, v);
        fill_rect(img, left + 1.0, top.min(base), left + bar - 1.0, top.max(base), color);
    }
}

fn draw_scatter(
    img: &mut RgbImage,
    trace: &Trace,
    area: &PlotArea,
    xs: &XScale,
    ys: &YScale,
    color: Rgb<u8>,
) {
    let mode = trace.mode.unwrap_or(TraceMode::LinesMarkers);
    let points: Vec<Option<(f64, f64)>> = trace
        .x
        .iter()
        .zip(&trace.y)
        .map(|(x, y)| Some((xs.position(x, area)?, area.y(ys, y.as_f64()?))))
        .collect();

    if mode.has_lines() {
        let width = trace.line.as_ref().map_or(2.0, |l| l.width);
        for pair in points.windows(2) {
            if let (Some(a), Some(b)) = (pair[0], pair[1]) {
                draw_line(img, a, b, color, width);
            }
        }
    }
    if mode.has_markers() {
        let size = trace.marker.as_ref().and_then(|m| m.size).unwrap_or(6.0);
        let r = size / 2.0;
        for (x, y) in points.into_iter().flatten() {
            fill_rect(img, x - r, y - r, x + r, y + r, color);
        }
    }
}

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

fn fill_rect(img: &mut RgbImage, x0: f64, y0: f64, x1: f64, y1: f64, color: Rgb<u8>) {
    let (x0, x1) = (x0.round() as i64, x1.round() as i64);
    let (y0, y1) = (y0.round() as i64, y1.round() as i64);
    for y in y0.min(y1)..=y0.max(y1) {
        for x in x0.min(x1)..=x0.max(x1) {
            put(img, x, y, color);
        }
    }
}

fn draw_line(img: &mut RgbImage, a: (f64, f64), b: (f64, f64), color: Rgb<u8>, width: f64) {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
    let half = (width / 2.0).max(0.0);
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let (x, y) = (a.0 + dx * t, a.1 + dy * t);
        if half < 1.0 {
            put(img, x.round() as i64, y.round() as i64, color);
        } else {
            fill_rect(img, x - half + 0.5, y - half + 0.5, x + half - 0.5, y + half - 0.5, color);
        }
    }
}
