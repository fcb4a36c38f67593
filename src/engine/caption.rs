// SYNOID Shorts Caption Renderer
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Rasterises 2-word caption bursts into transparent 1080x500 layers:
// big gold text, black outline, shrunk until it fits the frame width.

use super::chunking::CaptionChunk;
use super::CANVAS_WIDTH;
use crate::error::Result;
use fontdue::{Font, FontSettings};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const LAYER_WIDTH: u32 = CANVAS_WIDTH;
pub const LAYER_HEIGHT: u32 = 500;

/// Gold/yellow fill used by the shorts look.
pub const FILL_COLOR: [u8; 3] = [0xFF, 0xD7, 0x00];
pub const OUTLINE_COLOR: [u8; 3] = [0x00, 0x00, 0x00];

#[derive(Debug, Clone, PartialEq)]
pub struct CaptionStyle {
    pub seed_size: f32,
    pub min_size: f32,
    pub size_step: f32,
    /// Fraction of the canvas width the text may occupy.
    pub max_width_ratio: f32,
    pub fill: [u8; 3],
    pub outline: [u8; 3],
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            seed_size: 150.0,
            min_size: 50.0,
            size_step: 5.0,
            max_width_ratio: 0.9,
            fill: FILL_COLOR,
            outline: OUTLINE_COLOR,
        }
    }
}

impl CaptionStyle {
    pub fn max_text_width(&self) -> f32 {
        LAYER_WIDTH as f32 * self.max_width_ratio
    }

    /// Auto-shrink: step down from the seed size while the text is too
    /// wide, never below the floor. Overflow at the floor is accepted.
    pub fn shrink_to_fit<F>(&self, measure: F) -> f32
    where
        F: Fn(f32) -> f32,
    {
        let limit = self.max_text_width();
        let mut size = self.seed_size;
        while size > self.min_size && measure(size) > limit {
            size = (size - self.size_step).max(self.min_size);
        }
        size
    }

    pub fn stroke_width(size: f32) -> u32 {
        (size / 15.0).floor().max(0.0) as u32
    }
}

/// Where a caption font may come from, in resolution order.
#[derive(Debug, Clone, PartialEq)]
pub enum FontSource {
    File(PathBuf),
    /// Whatever `fc-match` names for a bold sans-serif.
    SystemDefault,
}

const BOLD_CANDIDATES: &[&str] = &[
    "C:/Windows/Fonts/arialbd.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "/usr/share/fonts/truetype/msttcorefonts/Arial_Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
];

const REGULAR_CANDIDATES: &[&str] = &[
    "C:/Windows/Fonts/arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
];

#[derive(Debug, Clone)]
pub struct FontChain {
    sources: Vec<FontSource>,
}

impl Default for FontChain {
    fn default() -> Self {
        Self::with_preferred(None)
    }
}

impl FontChain {
    pub fn with_preferred(preferred: Option<PathBuf>) -> Self {
        let mut sources = Vec::new();
        if let Some(path) = preferred {
            sources.push(FontSource::File(path));
        }
        sources.extend(
            BOLD_CANDIDATES
                .iter()
                .chain(REGULAR_CANDIDATES)
                .map(|p| FontSource::File(PathBuf::from(p))),
        );
        sources.push(FontSource::SystemDefault);
        Self { sources }
    }

    pub fn sources(&self) -> &[FontSource] {
        &self.sources
    }

    /// First source that parses wins.
    pub fn resolve(&self) -> Option<(Font, PathBuf)> {
        for source in &self.sources {
            let path = match source {
                FontSource::File(path) => path.clone(),
                FontSource::SystemDefault => match system_default_font() {
                    Some(path) => path,
                    None => continue,
                },
            };
            if !path.is_file() {
                continue;
            }
            match load_font(&path) {
                Ok(font) => return Some((font, path)),
                Err(e) => debug!("[CAPTION] Skipping font {:?}: {}", path, e),
            }
        }
        None
    }
}

fn load_font(path: &Path) -> std::result::Result<Font, String> {
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    let settings = FontSettings {
        scale: CaptionStyle::default().seed_size,
        ..FontSettings::default()
    };
    Font::from_bytes(bytes, settings).map_err(|e| e.to_string())
}

fn system_default_font() -> Option<PathBuf> {
    let output = std::process::Command::new("fc-match")
        .args(["-f", "%{file}", "sans-serif:bold"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if path.is_empty() {
        None
    } else {
        Some(PathBuf::from(path))
    }
}

/// A caption layer written to disk, ready to overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionLayer {
    pub path: PathBuf,
    pub start_offset: f64,
    pub span: f64,
    pub font_size: f32,
}

impl CaptionLayer {
    pub fn end(&self) -> f64 {
        self.start_offset + self.span
    }
}

#[derive(Clone)]
pub struct CaptionRenderer {
    font: Option<Arc<Font>>,
    style: CaptionStyle,
}

impl CaptionRenderer {
    /// Never fails: without any usable font, layers come out transparent.
    /// Blocks on disk and process I/O; async callers use [`Self::load`].
    pub fn new(chain: &FontChain, style: CaptionStyle) -> Self {
        let font = match chain.resolve() {
            Some((font, path)) => {
                info!("[CAPTION] Using font {:?}", path);
                Some(Arc::new(font))
            }
            None => {
                warn!("[CAPTION] No caption font could be loaded; captions will be blank");
                None
            }
        };
        Self { font, style }
    }

    /// `new` off the async workers: resolving the chain may shell out to
    /// `fc-match` and reads font files from disk.
    pub async fn load(chain: FontChain, style: CaptionStyle) -> Self {
        let fallback = style.clone();
        match tokio::task::spawn_blocking(move || Self::new(&chain, style)).await {
            Ok(renderer) => renderer,
            Err(e) => {
                warn!("[CAPTION] Font lookup task failed ({}); captions will be blank", e);
                Self {
                    font: None,
                    style: fallback,
                }
            }
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn style(&self) -> &CaptionStyle {
        &self.style
    }

    /// Advance width of `text` at `size`, kerning included.
    pub fn measure(&self, text: &str, size: f32) -> f32 {
        match &self.font {
            Some(font) => measure_with(font, text, size),
            None => 0.0,
        }
    }

    pub fn fit_font_size(&self, text: &str) -> f32 {
        self.style.shrink_to_fit(|size| self.measure(text, size))
    }

    /// Renders one burst. The caller upper-cases the text.
    pub fn render(&self, text: &str) -> (RgbaImage, f32) {
        let size = self.fit_font_size(text);
        let mut layer = RgbaImage::new(LAYER_WIDTH, LAYER_HEIGHT);
        let font = match &self.font {
            Some(font) => font,
            None => return (layer, size),
        };

        let (w, h) = (LAYER_WIDTH as usize, LAYER_HEIGHT as usize);
        let fill = glyph_coverage(font, text, size, w, h);
        let outline = dilate(&fill, w, h, CaptionStyle::stroke_width(size) as usize);
        composite(&mut layer, &outline, &fill, self.style.outline, self.style.fill);
        (layer, size)
    }

    pub fn render_to_file(&self, text: &str, path: &Path) -> Result<f32> {
        let (layer, size) = self.render(text);
        layer.save(path)?;
        Ok(size)
    }

    /// Writes one PNG per chunk into `dir`, rasterising in parallel.
    pub fn render_layers(
        &self,
        chunks: &[CaptionChunk],
        dir: &Path,
        prefix: &str,
    ) -> Result<Vec<CaptionLayer>> {
        chunks
            .par_iter()
            .enumerate()
            .map(|(idx, chunk)| -> Result<CaptionLayer> {
                let path = dir.join(format!("{}_caption_{:04}.png", prefix, idx));
                let font_size = self.render_to_file(&chunk.text, &path)?;
                Ok(CaptionLayer {
                    path,
                    start_offset: chunk.start_offset,
                    span: chunk.span,
                    font_size,
                })
            })
            .collect()
    }
}

fn measure_with(font: &Font, text: &str, size: f32) -> f32 {
    let mut width = 0.0;
    let mut prev: Option<char> = None;
    for ch in text.chars() {
        if let Some(p) = prev {
            width += font.horizontal_kern(p, ch, size).unwrap_or(0.0);
        }
        width += font.metrics(ch, size).advance_width;
        prev = Some(ch);
    }
    width
}

/// Coverage mask of the glyph run, centred on the layer's middle point.
fn glyph_coverage(font: &Font, text: &str, size: f32, w: usize, h: usize) -> Vec<u8> {
    let mut mask = vec![0u8; w * h];
    let (ascent, descent) = font
        .horizontal_line_metrics(size)
        .map(|m| (m.ascent, m.descent))
        .unwrap_or((size * 0.8, -size * 0.2));

    let baseline = h as f32 / 2.0 + (ascent + descent) / 2.0;
    let mut pen_x = w as f32 / 2.0 - measure_with(font, text, size) / 2.0;
    let mut prev: Option<char> = None;

    for ch in text.chars() {
        if let Some(p) = prev {
            pen_x += font.horizontal_kern(p, ch, size).unwrap_or(0.0);
        }
        let (metrics, bitmap) = font.rasterize(ch, size);
        let left = (pen_x + metrics.xmin as f32).round() as i64;
        let top = (baseline - metrics.ymin as f32 - metrics.height as f32).round() as i64;

        for gy in 0..metrics.height {
            let y = top + gy as i64;
            if y < 0 || y >= h as i64 {
                continue;
            }
            for gx in 0..metrics.width {
                let x = left + gx as i64;
                if x < 0 || x >= w as i64 {
                    continue;
                }
                let coverage = bitmap[gy * metrics.width + gx];
                let slot = &mut mask[y as usize * w + x as usize];
                *slot = (*slot).max(coverage);
            }
        }

        pen_x += metrics.advance_width;
        prev = Some(ch);
    }
    mask
}

/// Max-filter over the square [-r, r]^2. Same result as stamping the
/// run at every integer offset inside the stroke radius.
fn dilate(mask: &[u8], w: usize, h: usize, r: usize) -> Vec<u8> {
    if r == 0 {
        return mask.to_vec();
    }

    let mut rows = vec![0u8; w * h];
    for y in 0..h {
        let row = &mask[y * w..(y + 1) * w];
        for x in 0..w {
            let lo = x.saturating_sub(r);
            let hi = (x + r).min(w - 1);
            rows[y * w + x] = row[lo..=hi].iter().copied().max().unwrap_or(0);
        }
    }

    let mut out = vec![0u8; w * h];
    for x in 0..w {
        for y in 0..h {
            let lo = y.saturating_sub(r);
            let hi = (y + r).min(h - 1);
            let mut best = 0u8;
            for yy in lo..=hi {
                best = best.max(rows[yy * w + x]);
                if best == 255 {
                    break;
                }
            }
            out[y * w + x] = best;
        }
    }
    out
}

/// Outline colour first, fill on top (straight-alpha source-over).
fn composite(layer: &mut RgbaImage, outline: &[u8], fill: &[u8], outline_rgb: [u8; 3], fill_rgb: [u8; 3]) {
    for (i, pixel) in layer.pixels_mut().enumerate() {
        let oa = outline[i] as f32 / 255.0;
        let fa = fill[i] as f32 / 255.0;
        let alpha = fa + oa * (1.0 - fa);
        if alpha <= 0.0 {
            continue;
        }
        let mut rgba = [0u8; 4];
        for c in 0..3 {
            let v = (fill_rgb[c] as f32 * fa + outline_rgb[c] as f32 * oa * (1.0 - fa)) / alpha;
            rgba[c] = v.round().clamp(0.0, 255.0) as u8;
        }
        rgba[3] = (alpha * 255.0).round().clamp(0.0, 255.0) as u8;
        *pixel = Rgba(rgba);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shrink_stops_when_text_fits() {
        let style = CaptionStyle::default();
        // 10 glyphs at 0.8em each: fits 972px once size <= 121.5
        let size = style.shrink_to_fit(|s| s * 0.8 * 10.0);
        assert_eq!(size, 120.0);
        assert!(size < style.seed_size);
    }

    #[test]
    fn test_shrink_keeps_seed_for_short_text() {
        let style = CaptionStyle::default();
        assert_eq!(style.shrink_to_fit(|s| s * 2.0), 150.0);
    }

    #[test]
    fn test_shrink_floors_at_minimum() {
        let style = CaptionStyle::default();
        assert_eq!(style.shrink_to_fit(|s| s * 100.0), 50.0);
    }

    #[test]
    fn test_stroke_width_scales_with_size() {
        assert_eq!(CaptionStyle::stroke_width(150.0), 10);
        assert_eq!(CaptionStyle::stroke_width(50.0), 3);
        assert_eq!(CaptionStyle::stroke_width(14.0), 0);
    }

    #[test]
    fn test_dilate_square_radius() {
        let (w, h) = (7, 7);
        let mut mask = vec![0u8; w * h];
        mask[3 * w + 3] = 200;
        let out = dilate(&mask, w, h, 2);
        assert_eq!(out[1 * w + 1], 200);
        assert_eq!(out[5 * w + 5], 200);
        assert_eq!(out[0 * w + 3], 0);
        assert_eq!(out.iter().filter(|&&v| v > 0).count(), 25);
    }

    #[test]
    fn test_composite_fill_over_outline() {
        let mut layer = RgbaImage::new(3, 1);
        let outline = [255, 255, 0];
        let fill = [0, 255, 0];
        composite(&mut layer, &outline, &fill, OUTLINE_COLOR, FILL_COLOR);
        assert_eq!(layer.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(layer.get_pixel(1, 0).0, [0xFF, 0xD7, 0x00, 255]);
        assert_eq!(layer.get_pixel(2, 0).0[3], 0);
    }

    #[test]
    fn test_chain_ends_with_system_default() {
        let chain = FontChain::with_preferred(Some(PathBuf::from("/fonts/custom.ttf")));
        assert_eq!(chain.sources().first(), Some(&FontSource::File(PathBuf::from("/fonts/custom.ttf"))));
        assert_eq!(chain.sources().last(), Some(&FontSource::SystemDefault));
    }

    #[test]
    fn test_renderer_without_font_is_transparent() {
        let chain = FontChain {
            sources: vec![FontSource::File(PathBuf::from("__missing_font_xyz.ttf"))],
        };
        let renderer = CaptionRenderer::new(&chain, CaptionStyle::default());
        assert!(!renderer.has_font());
        let (layer, _) = renderer.render("HELLO WORLD");
        assert_eq!(layer.dimensions(), (LAYER_WIDTH, LAYER_HEIGHT));
        assert!(layer.pixels().all(|p| p.0[3] == 0));
    }

    #[tokio::test]
    async fn test_load_off_runtime_keeps_style() {
        let chain = FontChain {
            sources: vec![FontSource::File(PathBuf::from("__missing_font_xyz.ttf"))],
        };
        let style = CaptionStyle {
            seed_size: 120.0,
            ..CaptionStyle::default()
        };
        let renderer = CaptionRenderer::load(chain, style.clone()).await;
        assert!(!renderer.has_font());
        assert_eq!(renderer.style(), &style);
    }

    #[test]
    fn test_real_font_shrinks_long_caption() {
        let renderer = CaptionRenderer::new(&FontChain::default(), CaptionStyle::default());
        if !renderer.has_font() {
            eprintln!("no system font available, skipping");
            return;
        }
        let long = "INCOMPREHENSIBILITIES EXTRAORDINARILY";
        assert!(renderer.measure(long, 150.0) > renderer.style().max_text_width());
        let size = renderer.fit_font_size(long);
        assert!(size < 150.0);
        assert!(size >= 50.0);

        let (layer, _) = renderer.render("HI");
        // Corners stay transparent, the centre carries ink.
        assert_eq!(layer.get_pixel(0, 0).0[3], 0);
        assert_eq!(layer.get_pixel(LAYER_WIDTH - 1, LAYER_HEIGHT - 1).0[3], 0);
        assert!(layer.pixels().any(|p| p.0 == [0xFF, 0xD7, 0x00, 255]));
        assert!(layer.pixels().any(|p| p.0 == [0, 0, 0, 255]));
    }
}
