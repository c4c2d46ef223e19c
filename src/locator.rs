//! Icon location by normalized cross-correlation template matching.
//!
//! Scores follow the zero-mean normalized correlation coefficient
//! (`TM_CCOEFF_NORMED`): for every placement of the template inside the
//! screen,
//!
//! ```text
//!            Σ (T - mean T)(I - mean I)
//! R = ─────────────────────────────────────────
//!     sqrt(Σ (T - mean T)² · Σ (I - mean I)²)
//! ```
//!
//! computed over 8-bit Rec.601 luma. Window sums come from integral images;
//! the cross term is an exact integer sum, so identical inputs score 1.0 up
//! to float rounding. Rows of the score map are computed in parallel.

use std::path::Path;

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::error::{Result, TapError};

/// Default acceptance threshold (inclusive).
pub const DEFAULT_THRESHOLD: f32 = 0.8;

/// Color of the debug rectangle drawn around a match.
const DEBUG_RECT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Thickness of the debug rectangle in pixels.
const DEBUG_RECT_THICKNESS: u32 = 2;

/// Row segment length for `u32` dot products; 4096 * 255 * 255 < `u32::MAX`.
const DOT_CHUNK: usize = 4096;

/// Rec.601 luma weights in 14-bit fixed point (sum 16384).
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;

/// Best placement of a template inside a screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IconMatch {
    /// Left edge of the matched box.
    pub x: u32,
    /// Top edge of the matched box.
    pub y: u32,
    /// Template width.
    pub width: u32,
    /// Template height.
    pub height: u32,
    /// Correlation score in `[-1, 1]`.
    pub score: f32,
}

impl IconMatch {
    /// Center of the matched box (integer division).
    #[must_use]
    pub const fn center(&self) -> (u32, u32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }
}

/// Returns true if `score` passes `threshold`. The boundary is a match.
#[must_use]
pub fn accepts(score: f32, threshold: f32) -> bool {
    score >= threshold
}

/// Correlation scores for every template placement, row-major.
#[derive(Debug, Clone)]
pub struct ScoreMap {
    width: u32,
    height: u32,
    scores: Vec<f32>,
}

impl ScoreMap {
    /// Number of horizontal placements (`screen_w - template_w + 1`).
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of vertical placements (`screen_h - template_h + 1`).
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Score of the placement with top-left corner `(x, y)`.
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.scores
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Global maximum as `(x, y, score)`; the first one in row-major order
    /// wins ties.
    pub fn max(&self) -> (u32, u32, f32) {
        let mut best = (0usize, f32::NEG_INFINITY);
        for (i, &score) in self.scores.iter().enumerate() {
            if score > best.1 {
                best = (i, score);
            }
        }
        let w = self.width as usize;
        ((best.0 % w) as u32, (best.0 / w) as u32, best.1)
    }
}

/// Summed-area tables for pixel values and their squares.
struct Integral {
    stride: usize,
    sum: Vec<u64>,
    sum_sq: Vec<u64>,
}

impl Integral {
    fn new(img: &GrayImage) -> Self {
        let (w, h) = (img.width() as usize, img.height() as usize);
        let stride = w + 1;
        let mut sum = vec![0u64; stride * (h + 1)];
        let mut sum_sq = vec![0u64; stride * (h + 1)];
        let raw = img.as_raw();

        for y in 0..h {
            let mut row = 0u64;
            let mut row_sq = 0u64;
            for x in 0..w {
                let v = u64::from(raw[y * w + x]);
                row += v;
                row_sq += v * v;
                sum[(y + 1) * stride + x + 1] = sum[y * stride + x + 1] + row;
                sum_sq[(y + 1) * stride + x + 1] = sum_sq[y * stride + x + 1] + row_sq;
            }
        }

        Self {
            stride,
            sum,
            sum_sq,
        }
    }

    fn window(&self, table: &[u64], x: usize, y: usize, w: usize, h: usize) -> u64 {
        let s = self.stride;
        table[(y + h) * s + x + w] + table[y * s + x] - table[y * s + x + w] - table[(y + h) * s + x]
    }
}

/// Compute the correlation surface of `template` over `screen`.
///
/// Returns `None` when the template is empty or larger than the screen in
/// either dimension.
pub fn correlation_map(screen: &GrayImage, template: &GrayImage) -> Option<ScoreMap> {
    let (sw, sh) = (screen.width() as usize, screen.height() as usize);
    let (tw, th) = (template.width() as usize, template.height() as usize);
    if tw == 0 || th == 0 || tw > sw || th > sh {
        return None;
    }

    let n = (tw * th) as i128;
    let t_raw = template.as_raw();
    let s_raw = screen.as_raw();

    let t_sum: i128 = t_raw.iter().map(|&v| i128::from(v)).sum();
    let t_sum_sq: i128 = t_raw.iter().map(|&v| i128::from(v) * i128::from(v)).sum();
    let t_var = n * t_sum_sq - t_sum * t_sum;

    let integral = Integral::new(screen);
    let (mw, mh) = (sw - tw + 1, sh - th + 1);
    let mut scores = vec![0f32; mw * mh];

    scores
        .par_chunks_mut(mw)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, score) in row.iter_mut().enumerate() {
                let cross: u64 = (0..th)
                    .map(|ty| {
                        let start = (y + ty) * sw + x;
                        dot(&t_raw[ty * tw..(ty + 1) * tw], &s_raw[start..start + tw])
                    })
                    .sum();

                let i_sum = i128::from(integral.window(&integral.sum, x, y, tw, th));
                let i_sum_sq = i128::from(integral.window(&integral.sum_sq, x, y, tw, th));
                let i_var = n * i_sum_sq - i_sum * i_sum;
                let num = n * i128::from(cross) - t_sum * i_sum;

                *score = normalized_score(num, t_var, i_var);
            }
        });

    Some(ScoreMap {
        width: mw as u32,
        height: mh as u32,
        scores,
    })
}

/// Exact dot product of two pixel rows.
fn dot(a: &[u8], b: &[u8]) -> u64 {
    a.chunks(DOT_CHUNK)
        .zip(b.chunks(DOT_CHUNK))
        .map(|(a, b)| {
            let part: u32 = a
                .iter()
                .zip(b)
                .map(|(&a, &b)| u32::from(a) * u32::from(b))
                .sum();
            u64::from(part)
        })
        .sum()
}

/// Flat template over a flat window scores 1.0; flat against textured
/// scores 0.0.
fn normalized_score(num: i128, t_var: i128, i_var: i128) -> f32 {
    match (t_var == 0, i_var == 0) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => {
            let denom = (t_var as f64).sqrt() * (i_var as f64).sqrt();
            (num as f64 / denom).clamp(-1.0, 1.0) as f32
        }
    }
}

/// Best placement of `template` in `screen`, regardless of threshold.
pub fn best_match(screen: &GrayImage, template: &GrayImage) -> Option<IconMatch> {
    let map = correlation_map(screen, template)?;
    let (x, y, score) = map.max();
    Some(IconMatch {
        x,
        y,
        width: template.width(),
        height: template.height(),
        score,
    })
}

/// 8-bit luma with Rec.601 weights (`0.299 R + 0.587 G + 0.114 B`).
///
/// Alpha is dropped. Grayscale input passes through unchanged.
#[must_use]
pub fn luma_bt601(img: &DynamicImage) -> GrayImage {
    if let Some(gray) = img.as_luma8() {
        return gray.clone();
    }
    let rgb = img.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let weighted = LUMA_R * u32::from(r) + LUMA_G * u32::from(g) + LUMA_B * u32::from(b);
        Luma([((weighted + (1 << 13)) >> 14) as u8])
    })
}

/// Load an image file.
///
/// # Errors
///
/// Returns an error if the file does not exist or cannot be decoded.
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    if !path.exists() {
        return Err(TapError::ImageNotFound {
            path: path.display().to_string(),
        });
    }
    image::open(path).map_err(|e| TapError::ImageProcessing(format!("{}: {e}", path.display())))
}

/// Draw the match rectangle onto a copy of `screen`.
pub fn annotate_match(screen: &DynamicImage, found: &IconMatch) -> RgbImage {
    let mut canvas = screen.to_rgb8();
    let (w, h) = canvas.dimensions();
    if w == 0 || h == 0 {
        return canvas;
    }

    let x0 = found.x;
    let y0 = found.y;
    let x1 = (found.x + found.width).min(w - 1);
    let y1 = (found.y + found.height).min(h - 1);

    for t in 0..DEBUG_RECT_THICKNESS {
        let (left, top) = (x0 + t, y0 + t);
        let (right, bottom) = (x1.saturating_sub(t), y1.saturating_sub(t));
        if left > right || top > bottom {
            break;
        }
        let ring = Rect::at(left as i32, top as i32).of_size(right - left + 1, bottom - top + 1);
        draw_hollow_rect_mut(&mut canvas, ring, DEBUG_RECT_COLOR);
    }
    canvas
}

/// Write the annotated screen to `path`.
///
/// # Errors
///
/// Returns an error if the image cannot be encoded or written.
pub fn save_debug_image(screen: &DynamicImage, found: &IconMatch, path: &Path) -> Result<()> {
    annotate_match(screen, found)
        .save(path)
        .map_err(|e| TapError::ImageProcessing(format!("{}: {e}", path.display())))
}

/// Template matcher with a fixed acceptance threshold.
#[derive(Debug, Clone, Copy)]
pub struct IconLocator {
    threshold: f32,
}

impl Default for IconLocator {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl IconLocator {
    /// Create a locator.
    ///
    /// # Errors
    ///
    /// Returns an error unless `0 < threshold <= 1`.
    pub fn new(threshold: f32) -> Result<Self> {
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(TapError::InvalidThreshold { value: threshold });
        }
        Ok(Self { threshold })
    }

    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Locate `template` in `screen`; `None` below the threshold.
    pub fn locate(&self, screen: &DynamicImage, template: &DynamicImage) -> Option<IconMatch> {
        let found = best_match(&luma_bt601(screen), &luma_bt601(template));
        match found {
            Some(m) if accepts(m.score, self.threshold) => Some(m),
            Some(m) => {
                debug!(score = m.score, threshold = self.threshold, "Best score below threshold");
                None
            }
            None => {
                warn!(
                    screen_w = screen.width(),
                    screen_h = screen.height(),
                    template_w = template.width(),
                    template_h = template.height(),
                    "Template does not fit inside screen"
                );
                None
            }
        }
    }

    /// Locate using image files, writing an annotated copy of the screen to
    /// `debug_out` on success.
    ///
    /// Unreadable inputs are logged and reported as no match. A failed debug
    /// write is logged and does not change the result.
    #[instrument(skip(self), fields(template = %template_path.display()))]
    pub fn locate_files(
        &self,
        screen_path: &Path,
        template_path: &Path,
        debug_out: Option<&Path>,
    ) -> Option<IconMatch> {
        let (screen, template) = match (load_image(screen_path), load_image(template_path)) {
            (Ok(s), Ok(t)) => (s, t),
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Could not read image");
                return None;
            }
        };

        let found = self.locate(&screen, &template)?;
        let (cx, cy) = found.center();
        debug!(score = found.score, cx, cy, "Icon found");

        if let Some(out) = debug_out {
            if let Err(e) = save_debug_image(&screen, &found, out) {
                warn!(path = %out.display(), error = %e, "Could not write debug image");
            }
        }
        Some(found)
    }
}
