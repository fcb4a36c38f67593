// SYNOID Shorts Fit-to-Target
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Forces an arbitrary visual into the 1080x1920 frame without letterbox
// bars or aspect distortion. Two policies exist on purpose: stills are
// assumed close to landscape, background footage close to portrait.

use super::{target_ratio, CANVAS_HEIGHT, CANVAS_WIDTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitPolicy {
    /// Center-crop the overlong dimension to 9:16, then scale.
    WidthFirst,
    /// Scale to 1920 tall, then center-crop to 1080 wide.
    HeightFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitGeometry {
    CropThenScale { crop: CropRect },
    ScaleThenCrop { scaled: (u32, u32), crop: CropRect },
}

impl FitPolicy {
    pub fn geometry(self, src_width: u32, src_height: u32) -> FitGeometry {
        let (w, h) = (src_width.max(1), src_height.max(1));
        match self {
            FitPolicy::WidthFirst => FitGeometry::CropThenScale {
                crop: width_first_crop(w, h),
            },
            FitPolicy::HeightFirst => height_first(w, h),
        }
    }
}

fn width_first_crop(w: u32, h: u32) -> CropRect {
    let ratio = target_ratio();
    let current = w as f64 / h as f64;
    if current > ratio {
        let new_width = ((h as f64 * ratio) as u32).clamp(1, w);
        CropRect {
            x: (w / 2).saturating_sub(new_width / 2),
            y: 0,
            width: new_width,
            height: h,
        }
    } else {
        let new_height = ((w as f64 / ratio) as u32).clamp(1, h);
        CropRect {
            x: 0,
            y: (h / 2).saturating_sub(new_height / 2),
            width: w,
            height: new_height,
        }
    }
}

fn height_first(w: u32, h: u32) -> FitGeometry {
    let mut scaled_w = even((w as f64 * CANVAS_HEIGHT as f64 / h as f64).round() as u32);
    let mut scaled_h = CANVAS_HEIGHT;
    if scaled_w < CANVAS_WIDTH {
        // Footage narrower than 9:16 cannot fill the width at 1920 tall;
        // cover the width instead and trim the height.
        scaled_w = CANVAS_WIDTH;
        scaled_h = even((h as f64 * CANVAS_WIDTH as f64 / w as f64).round() as u32)
            .max(CANVAS_HEIGHT);
    }
    FitGeometry::ScaleThenCrop {
        scaled: (scaled_w, scaled_h),
        crop: CropRect {
            x: (scaled_w / 2).saturating_sub(CANVAS_WIDTH / 2),
            y: (scaled_h / 2).saturating_sub(CANVAS_HEIGHT / 2),
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
        },
    }
}

fn even(v: u32) -> u32 {
    (v + 1) & !1
}

impl FitGeometry {
    /// Frame size after the whole chain runs.
    pub fn output_size(&self) -> (u32, u32) {
        match self {
            FitGeometry::CropThenScale { .. } => (CANVAS_WIDTH, CANVAS_HEIGHT),
            FitGeometry::ScaleThenCrop { crop, .. } => (crop.width, crop.height),
        }
    }

    /// ffmpeg filter chain (no labels) implementing the fit.
    pub fn to_filter(&self) -> String {
        match self {
            FitGeometry::CropThenScale { crop } => format!(
                "crop={}:{}:{}:{},scale={}:{},setsar=1",
                crop.width, crop.height, crop.x, crop.y, CANVAS_WIDTH, CANVAS_HEIGHT
            ),
            FitGeometry::ScaleThenCrop { scaled, crop } => format!(
                "scale={}:{},crop={}:{}:{}:{},setsar=1",
                scaled.0, scaled.1, crop.width, crop.height, crop.x, crop.y
            ),
        }
    }
}
