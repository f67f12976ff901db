// src/visualizer.rs

use std::fmt;

use log::debug;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::canvas::{
    colors, numeric_ticks, padded_range, text_width, viridis, Canvas, Margins, PlotArea, TextAnchor, GLYPH_SIZE,
};
use crate::categories::CategoryCodes;
use crate::config::{AnalysisConfig, PlotDimensions};
use crate::error::AnalysisError;

const POINT_ALPHA: f64 = 0.8;
const POINT_RADIUS: i64 = 5;
const LEGEND_WIDTH: i64 = 170;
const LEGEND_LABEL_CHARS: usize = 12;
/// Smallest data region, in pixels, any plot is laid out with.
const MIN_DATA_WIDTH: i64 = 80;
const MIN_DATA_HEIGHT: i64 = 30;

/// Which diagnostic an image shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotRole {
    Contribution,
    Cumulative,
    Scatter,
    Loadings,
}

impl PlotRole {
    pub const ALL: [PlotRole; 4] = [
        PlotRole::Contribution,
        PlotRole::Cumulative,
        PlotRole::Scatter,
        PlotRole::Loadings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlotRole::Contribution => "contribution",
            PlotRole::Cumulative => "cumulative",
            PlotRole::Scatter => "scatter",
            PlotRole::Loadings => "loadings",
        }
    }

    /// Space around the data region; the scatter reserves its right side for the legend.
    pub fn margins(&self) -> Margins {
        match self {
            PlotRole::Scatter => Margins { right: LEGEND_WIDTH, ..Margins::default() },
            _ => Margins::default(),
        }
    }

    /// Smallest canvas that still leaves a usable data region inside
    /// [`PlotRole::margins`].
    pub fn min_dimensions(&self) -> PlotDimensions {
        let m = self.margins();
        PlotDimensions::new(
            (m.left + m.right + MIN_DATA_WIDTH) as u32,
            (m.top + m.bottom + MIN_DATA_HEIGHT) as u32,
        )
    }
}

impl fmt::Display for PlotRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An encoded PNG tagged with the diagnostic it shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotArtifact {
    role: PlotRole,
    width: u32,
    height: u32,
    png: Vec<u8>,
}

impl PlotArtifact {
    pub fn role(&self) -> PlotRole {
        self.role
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn into_png_bytes(self) -> Vec<u8> {
        self.png
    }
}

/// Renders the four PCA diagnostics. Each call draws on a fresh [`Canvas`]
/// that is encoded and dropped before the call returns.
#[derive(Debug, Clone)]
pub struct Visualizer {
    contribution: PlotDimensions,
    cumulative: PlotDimensions,
    scatter: PlotDimensions,
    loadings: PlotDimensions,
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

impl Visualizer {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            contribution: config.contribution_plot,
            cumulative: config.cumulative_plot,
            scatter: config.scatter_plot,
            loadings: config.loadings_plot,
        }
    }

    /// One bar per component, height = explained-variance ratio.
    ///
    /// When the `PC1..PCk` tick labels would overlap, only every n-th bar is
    /// labelled; the bars themselves are always all drawn.
    pub fn contribution_chart(&self, ratios: &[f64]) -> Result<PlotArtifact, AnalysisError> {
        require_non_empty(ratios, PlotRole::Contribution)?;
        let k = ratios.len();
        let mut canvas = Canvas::new(self.contribution.width, self.contribution.height, colors::WHITE);

        let top = ratios.iter().fold(0.0_f64, |m, &r| m.max(r));
        let y_range = (0.0, if top > 0.0 { top * 1.1 } else { 1.0 });
        let area = PlotArea::new(&canvas, PlotRole::Contribution.margins(), (-0.5, k as f64 - 0.5), y_range);

        let stride = label_stride(k, &format!("PC{}", k), area.right - area.left);
        let x_ticks: Vec<(f64, String)> = (0..k)
            .step_by(stride)
            .map(|i| (i as f64, format!("PC{}", i + 1)))
            .collect();
        area.draw_frame(&mut canvas, &x_ticks, &numeric_ticks(y_range, 5));

        for (i, &ratio) in ratios.iter().enumerate() {
            let x0 = area.map_x(i as f64 - 0.4);
            let x1 = area.map_x(i as f64 + 0.4);
            let y = area.map_y(ratio);
            canvas.fill_rect(x0, y, x1, area.bottom - 1, colors::BLUE);
        }
        area.draw_labels(
            &mut canvas,
            Some("Contribution Rate of Each Principal Component"),
            "Principal Components",
            "Contribution Rate",
        );
        finish(PlotRole::Contribution, canvas)
    }

    /// Cumulative contribution against the number of components, starting
    /// from an implicit 0 at x = 0.
    pub fn cumulative_chart(&self, cumulative: &[f64]) -> Result<PlotArtifact, AnalysisError> {
        require_non_empty(cumulative, PlotRole::Cumulative)?;
        let k = cumulative.len();
        let mut canvas = Canvas::new(self.cumulative.width, self.cumulative.height, colors::WHITE);

        let points: Vec<(f64, f64)> = std::iter::once(0.0)
            .chain(cumulative.iter().copied())
            .enumerate()
            .map(|(i, v)| (i as f64, v))
            .collect();
        let x_pad = (k as f64 * 0.05).max(0.1);
        let y_top = cumulative.iter().fold(1.0_f64, |m, &v| m.max(v));
        let y_range = (-0.05 * y_top, y_top * 1.05);
        let area = PlotArea::new(&canvas, PlotRole::Cumulative.margins(), (-x_pad, k as f64 + x_pad), y_range);

        let step = k.div_ceil(10).max(1);
        let x_ticks: Vec<(f64, String)> = (0..=k).step_by(step).map(|i| (i as f64, i.to_string())).collect();
        area.draw_frame(&mut canvas, &x_ticks, &numeric_ticks(y_range, 5));

        for pair in points.windows(2) {
            let (x0, y0) = area.map(pair[0].0, pair[0].1);
            let (x1, y1) = area.map(pair[1].0, pair[1].1);
            canvas.draw_line(x0, y0, x1, y1, colors::BLUE, 2);
        }
        for &(x, y) in &points {
            let (px, py) = area.map(x, y);
            canvas.fill_circle(px, py, 4, colors::BLUE, 1.0);
        }
        area.draw_labels(&mut canvas, None, "Number of Principal Components", "Cumulative Contribution Rate");
        finish(PlotRole::Cumulative, canvas)
    }

    /// PC1 against PC2 score per row, coloured by category code.
    pub fn score_scatter(&self, scores: &Array2<f64>, codes: &CategoryCodes) -> Result<PlotArtifact, AnalysisError> {
        if scores.nrows() != codes.codes().len() {
            return Err(AnalysisError::Validation(format!(
                "{} score rows but {} category codes",
                scores.nrows(),
                codes.codes().len()
            )));
        }
        let coords = leading_pair(scores, PlotRole::Scatter)?;
        let mut canvas = Canvas::new(self.scatter.width, self.scatter.height, colors::WHITE);

        let x_range = padded_range(coords.iter().map(|c| c.0), 0.05);
        let y_range = padded_range(coords.iter().map(|c| c.1), 0.05);
        let area = PlotArea::new(&canvas, PlotRole::Scatter.margins(), x_range, y_range);
        area.draw_frame(&mut canvas, &numeric_ticks(x_range, 6), &numeric_ticks(y_range, 6));

        let n_categories = codes.n_categories();
        for (&(x, y), &code) in coords.iter().zip(codes.codes()) {
            let (px, py) = area.map(x, y);
            canvas.fill_circle(px, py, POINT_RADIUS, category_color(code, n_categories), POINT_ALPHA);
        }
        draw_legend(&mut canvas, &area, codes);
        area.draw_labels(&mut canvas, Some("PCA Scatter Plot with Categories"), "PC1", "PC2");
        finish(PlotRole::Scatter, canvas)
    }

    /// PC1 against PC2 loading per feature, each point labelled with its
    /// feature name.
    pub fn loading_scatter(&self, rotation: &Array2<f64>, feature_names: &[String]) -> Result<PlotArtifact, AnalysisError> {
        if rotation.nrows() != feature_names.len() {
            return Err(AnalysisError::Validation(format!(
                "{} loading rows but {} feature names",
                rotation.nrows(),
                feature_names.len()
            )));
        }
        let coords = leading_pair(rotation, PlotRole::Loadings)?;
        let mut canvas = Canvas::new(self.loadings.width, self.loadings.height, colors::WHITE);

        // Extra room on the left for right-aligned labels.
        let x_range = padded_range(coords.iter().map(|c| c.0), 0.2);
        let y_range = padded_range(coords.iter().map(|c| c.1), 0.1);
        let area = PlotArea::new(&canvas, PlotRole::Loadings.margins(), x_range, y_range);
        area.draw_frame(&mut canvas, &numeric_ticks(x_range, 6), &numeric_ticks(y_range, 6));

        for (&(x, y), name) in coords.iter().zip(feature_names) {
            let (px, py) = area.map(x, y);
            canvas.fill_circle(px, py, POINT_RADIUS, colors::BLUE, POINT_ALPHA);
            canvas.draw_text(px - POINT_RADIUS - 2, py - GLYPH_SIZE / 2, name, colors::TEXT, 1, TextAnchor::Right);
        }
        area.draw_labels(&mut canvas, Some("PCA Component Contribution"), "PC1", "PC2");
        finish(PlotRole::Loadings, canvas)
    }
}

fn require_non_empty(values: &[f64], role: PlotRole) -> Result<(), AnalysisError> {
    if values.is_empty() {
        return Err(AnalysisError::Validation(format!("nothing to draw in the {} plot", role)));
    }
    Ok(())
}

/// Columns 0 and 1 of `matrix` per row; column 1 reads as 0 when absent.
fn leading_pair(matrix: &Array2<f64>, role: PlotRole) -> Result<Vec<(f64, f64)>, AnalysisError> {
    if matrix.ncols() == 0 {
        return Err(AnalysisError::Validation(format!("no components to draw in the {} plot", role)));
    }
    Ok(matrix
        .rows()
        .into_iter()
        .map(|row| (row[0], if row.len() > 1 { row[1] } else { 0.0 }))
        .collect())
}

/// Colour of `code` on the viridis ramp spread over `n_categories`.
pub fn category_color(code: usize, n_categories: usize) -> image::Rgb<u8> {
    if n_categories <= 1 {
        return viridis(0.0);
    }
    viridis(code as f64 / (n_categories - 1) as f64)
}

/// Every `stride`-th tick label fits without overlapping.
fn label_stride(n_labels: usize, widest: &str, available: i64) -> usize {
    let needed = (text_width(widest, 1) + 8) * n_labels as i64;
    if available <= 0 || needed <= available {
        return 1;
    }
    ((needed + available - 1) / available) as usize
}

fn draw_legend(canvas: &mut Canvas, area: &PlotArea, codes: &CategoryCodes) {
    let x = area.right + 16;
    let mut y = area.top;
    canvas.draw_text(x, y, "Categories", colors::BLACK, 1, TextAnchor::Left);
    y += 2 * GLYPH_SIZE;

    let line_height = 2 * POINT_RADIUS + 6;
    let capacity = ((area.bottom - y) / line_height).max(1) as usize;
    let n = codes.n_categories();
    for (code, label) in codes.labels().iter().enumerate() {
        if code + 1 == capacity && n > capacity {
            canvas.draw_text(x, y, &format!("... {} more", n - code), colors::TEXT, 1, TextAnchor::Left);
            break;
        }
        canvas.fill_circle(x + POINT_RADIUS, y + GLYPH_SIZE / 2, POINT_RADIUS, category_color(code, n), POINT_ALPHA);
        let mut text = format!("{}: ", code);
        text.extend(label.chars().take(LEGEND_LABEL_CHARS));
        if label.chars().count() > LEGEND_LABEL_CHARS {
            text.push('~');
        }
        canvas.draw_text(x + 2 * POINT_RADIUS + 6, y, &text, colors::TEXT, 1, TextAnchor::Left);
        y += line_height;
    }
}

fn finish(role: PlotRole, canvas: Canvas) -> Result<PlotArtifact, AnalysisError> {
    let (width, height) = (canvas.width(), canvas.height());
    let png = canvas.into_png().map_err(|source| AnalysisError::Render { role, source })?;
    debug!("Rendered {} plot: {}x{} px, {} PNG bytes.", role, width, height, png.len());
    Ok(PlotArtifact { role, width, height, png })
}
