// src/canvas.rs
//
// Per-render drawing surface. Every plot owns one `Canvas`, draws on it and
// consumes it with `into_png`, so no drawing state outlives a render call.

use std::io::Cursor;

use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{ImageError, ImageFormat, Rgb, RgbImage};

/// Glyph cell size of the bitmap font, in unscaled pixels.
pub const GLYPH_SIZE: i64 = 8;

pub mod colors {
    use image::Rgb;

    pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    pub const TEXT: Rgb<u8> = Rgb([33, 33, 33]);
    pub const GRID: Rgb<u8> = Rgb([222, 222, 222]);
    pub const BLUE: Rgb<u8> = Rgb([31, 119, 180]);
}

/// Where the anchor point sits relative to a horizontal text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Left,
    Center,
    Right,
}

/// Interpolate between two colors
pub fn interpolate_color(c1: Rgb<u8>, c2: Rgb<u8>, t: f64) -> Rgb<u8> {
    let t = t.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| ((1.0 - t) * a as f64 + t * b as f64).round() as u8;
    Rgb([mix(c1.0[0], c2.0[0]), mix(c1.0[1], c2.0[1]), mix(c1.0[2], c2.0[2])])
}

/// Piecewise-linear approximation of the viridis colormap, `t` in [0, 1].
pub fn viridis(t: f64) -> Rgb<u8> {
    const STOPS: [Rgb<u8>; 5] = [
        Rgb([68, 1, 84]),
        Rgb([59, 82, 139]),
        Rgb([33, 145, 140]),
        Rgb([94, 201, 98]),
        Rgb([253, 231, 37]),
    ];
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (STOPS.len() - 1) as f64;
    let idx = (scaled.floor() as usize).min(STOPS.len() - 2);
    interpolate_color(STOPS[idx], STOPS[idx + 1], scaled - idx as f64)
}

fn glyph(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

/// Width in pixels of `text` drawn at `scale`.
pub fn text_width(text: &str, scale: i64) -> i64 {
    text.chars().count() as i64 * GLYPH_SIZE * scale
}

/// An owned RGB raster with the primitives the charts need.
pub struct Canvas {
    image: RgbImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Rgb<u8>) -> Self {
        Self { image: RgbImage::from_pixel(width, height, background) }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Sets a pixel; coordinates outside the canvas are ignored.
    pub fn put(&mut self, x: i64, y: i64, color: Rgb<u8>) {
        if x >= 0 && y >= 0 && x < self.width() as i64 && y < self.height() as i64 {
            self.image.put_pixel(x as u32, y as u32, color);
        }
    }

    /// Alpha-blends `color` over the existing pixel.
    pub fn blend(&mut self, x: i64, y: i64, color: Rgb<u8>, alpha: f64) {
        if x >= 0 && y >= 0 && x < self.width() as i64 && y < self.height() as i64 {
            let below = *self.image.get_pixel(x as u32, y as u32);
            self.image.put_pixel(x as u32, y as u32, interpolate_color(below, color, alpha));
        }
    }

    /// Fills the rectangle spanning both corners, inclusive.
    pub fn fill_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
        let (xa, xb) = (x0.min(x1), x0.max(x1));
        let (ya, yb) = (y0.min(y1), y0.max(y1));
        for y in ya..=yb {
            for x in xa..=xb {
                self.put(x, y, color);
            }
        }
    }

    pub fn stroke_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
        self.draw_line(x0, y0, x1, y0, color, 1);
        self.draw_line(x1, y0, x1, y1, color, 1);
        self.draw_line(x1, y1, x0, y1, color, 1);
        self.draw_line(x0, y1, x0, y0, color, 1);
    }

    /// Bresenham line; `thickness` > 1 stamps a square brush at each step.
    pub fn draw_line(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>, thickness: i64) {
        let (mut x, mut y) = (x0, y0);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let lo = -(thickness - 1) / 2;
        let hi = thickness / 2;
        loop {
            for oy in lo..=hi {
                for ox in lo..=hi {
                    self.put(x + ox, y + oy, color);
                }
            }
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    pub fn fill_circle(&mut self, cx: i64, cy: i64, radius: i64, color: Rgb<u8>, alpha: f64) {
        let r2 = radius * radius;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= r2 {
                    self.blend(cx + dx, cy + dy, color, alpha);
                }
            }
        }
    }

    /// Draws `text` with its top edge at `y`, positioned horizontally by `anchor`.
    pub fn draw_text(&mut self, x: i64, y: i64, text: &str, color: Rgb<u8>, scale: i64, anchor: TextAnchor) {
        let left = match anchor {
            TextAnchor::Left => x,
            TextAnchor::Center => x - text_width(text, scale) / 2,
            TextAnchor::Right => x - text_width(text, scale),
        };
        for (i, c) in text.chars().enumerate() {
            let origin = left + i as i64 * GLYPH_SIZE * scale;
            for (gy, row) in glyph(c).iter().enumerate() {
                for gx in 0..GLYPH_SIZE {
                    if (*row >> gx) & 1 == 1 {
                        let px = origin + gx * scale;
                        let py = y + gy as i64 * scale;
                        self.fill_rect(px, py, px + scale - 1, py + scale - 1, color);
                    }
                }
            }
        }
    }

    /// Draws `text` rotated a quarter turn counter-clockwise (reading upwards),
    /// with its left edge at `x` and centered vertically on `center_y`.
    pub fn draw_text_vertical(&mut self, x: i64, center_y: i64, text: &str, color: Rgb<u8>, scale: i64) {
        let bottom = center_y + text_width(text, scale) / 2;
        for (i, c) in text.chars().enumerate() {
            let origin = i as i64 * GLYPH_SIZE;
            for (gy, row) in glyph(c).iter().enumerate() {
                for gx in 0..GLYPH_SIZE {
                    if (*row >> gx) & 1 == 1 {
                        let px = x + gy as i64 * scale;
                        let py = bottom - (origin + gx + 1) * scale;
                        self.fill_rect(px, py, px + scale - 1, py + scale - 1, color);
                    }
                }
            }
        }
    }

    /// Encodes the canvas as PNG, releasing the raster.
    pub fn into_png(self) -> Result<Vec<u8>, ImageError> {
        let mut bytes = Vec::new();
        self.image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }
}

/// Pixel margins around the data region.
#[derive(Debug, Clone, Copy)]
pub struct Margins {
    pub left: i64,
    pub right: i64,
    pub top: i64,
    pub bottom: i64,
}

impl Default for Margins {
    fn default() -> Self {
        Self { left: 90, right: 30, top: 50, bottom: 70 }
    }
}

/// Maps data coordinates onto the pixel rectangle inside the margins.
#[derive(Debug, Clone, Copy)]
pub struct PlotArea {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
    x_range: (f64, f64),
    y_range: (f64, f64),
}

impl PlotArea {
    pub fn new(canvas: &Canvas, margins: Margins, x_range: (f64, f64), y_range: (f64, f64)) -> Self {
        Self {
            left: margins.left,
            top: margins.top,
            right: canvas.width() as i64 - margins.right,
            bottom: canvas.height() as i64 - margins.bottom,
            x_range,
            y_range,
        }
    }

    pub fn map_x(&self, x: f64) -> i64 {
        let (lo, hi) = self.x_range;
        let t = if hi > lo { (x - lo) / (hi - lo) } else { 0.5 };
        self.left + (t * (self.right - self.left) as f64).round() as i64
    }

    pub fn map_y(&self, y: f64) -> i64 {
        let (lo, hi) = self.y_range;
        let t = if hi > lo { (y - lo) / (hi - lo) } else { 0.5 };
        self.bottom - (t * (self.bottom - self.top) as f64).round() as i64
    }

    pub fn map(&self, x: f64, y: f64) -> (i64, i64) {
        (self.map_x(x), self.map_y(y))
    }

    /// Grid lines at every tick, tick labels, and the axes box.
    pub fn draw_frame(&self, canvas: &mut Canvas, x_ticks: &[(f64, String)], y_ticks: &[(f64, String)]) {
        for (value, label) in x_ticks {
            let px = self.map_x(*value);
            canvas.draw_line(px, self.top, px, self.bottom, colors::GRID, 1);
            canvas.draw_line(px, self.bottom, px, self.bottom + 4, colors::BLACK, 1);
            canvas.draw_text(px, self.bottom + 8, label, colors::TEXT, 1, TextAnchor::Center);
        }
        for (value, label) in y_ticks {
            let py = self.map_y(*value);
            canvas.draw_line(self.left, py, self.right, py, colors::GRID, 1);
            canvas.draw_line(self.left - 4, py, self.left, py, colors::BLACK, 1);
            canvas.draw_text(self.left - 8, py - GLYPH_SIZE / 2, label, colors::TEXT, 1, TextAnchor::Right);
        }
        canvas.stroke_rect(self.left, self.top, self.right, self.bottom, colors::BLACK);
    }

    /// Title above the area, x label below the tick labels, y label rotated on the left.
    pub fn draw_labels(&self, canvas: &mut Canvas, title: Option<&str>, x_label: &str, y_label: &str) {
        let center_x = (self.left + self.right) / 2;
        if let Some(title) = title {
            canvas.draw_text(center_x, (self.top - 2 * GLYPH_SIZE) / 2, title, colors::BLACK, 2, TextAnchor::Center);
        }
        canvas.draw_text(center_x, self.bottom + 30, x_label, colors::BLACK, 2, TextAnchor::Center);
        canvas.draw_text_vertical(12, (self.top + self.bottom) / 2, y_label, colors::BLACK, 2);
    }
}

/// Evenly spaced "nice" values (steps of 1, 2 or 5 times a power of ten)
/// covering `[min, max]`.
pub fn nice_ticks(min: f64, max: f64, target: usize) -> Vec<f64> {
    if !(max > min) || !min.is_finite() || !max.is_finite() {
        return vec![min];
    }
    let step = nice_step(min, max, target);
    let first = (min / step).ceil();
    (0..)
        .map(|i| (first + i as f64) * step)
        .take_while(|v| *v <= max + step * 1e-9)
        .take(64)
        .collect()
}

pub fn nice_step(min: f64, max: f64, target: usize) -> f64 {
    let raw = (max - min) / target.max(1) as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let normalized = raw / magnitude;
    let factor = if normalized <= 1.0 {
        1.0
    } else if normalized <= 2.0 {
        2.0
    } else if normalized <= 5.0 {
        5.0
    } else {
        10.0
    };
    factor * magnitude
}

/// Formats a tick value with just enough decimals for `step`.
pub fn format_tick(value: f64, step: f64) -> String {
    let decimals = if step > 0.0 && step < 1.0 {
        ((-step.log10() - 1e-9).ceil() as usize).min(6)
    } else {
        0
    };
    let value = if value.abs() < step.abs() * 1e-9 { 0.0 } else { value };
    format!("{:.*}", decimals, value)
}

/// Labelled ticks for a numeric axis spanning `range`.
pub fn numeric_ticks(range: (f64, f64), target: usize) -> Vec<(f64, String)> {
    let step = nice_step(range.0, range.1, target);
    nice_ticks(range.0, range.1, target)
        .into_iter()
        .map(|v| (v, format_tick(v, step)))
        .collect()
}

/// `[min, max]` of `values` widened by `pad` of the span on both sides;
/// a zero span is widened to +-1.
pub fn padded_range<I: IntoIterator<Item = f64>>(values: I, pad: f64) -> (f64, f64) {
    let (min, max) = values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !min.is_finite() || !max.is_finite() {
        return (-1.0, 1.0);
    }
    let span = max - min;
    if span < 1e-12 {
        return (min - 1.0, max + 1.0);
    }
    (min - span * pad, max + span * pad)
}
