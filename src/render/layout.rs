//! Display box sizing
//!
//! A block's rendered size comes from up to three optional inputs: `width`,
//! `height` and `ratio`. The resolution order is fixed so the same block
//! always sizes the same way, and the result is clamped to the container
//! width so animations never overflow the note column.

use crate::core::config::BlockConfig;

/// Width used when a block gives no sizing at all.
pub const DEFAULT_WIDTH: f32 = 480.0;
/// Aspect applied when only one dimension is given.
pub const DEFAULT_ASPECT: f32 = 16.0 / 9.0;

/// Logical (CSS pixel) size of the animation surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayBox {
    pub width: f32,
    pub height: f32,
}

impl DisplayBox {
    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }

    /// Physical pixel size at a device pixel ratio, at least 1x1.
    pub fn backing_size(&self, device_pixel_ratio: f32) -> (u32, u32) {
        let dpr = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        let w = (self.width * dpr).round().max(1.0) as u32;
        let h = (self.height * dpr).round().max(1.0) as u32;
        (w, h)
    }
}

/// Size a block. Priority: both dimensions, then one dimension plus ratio,
/// then ratio alone at the default width, then one dimension at the
/// artboard's intrinsic aspect (the default aspect before the runtime has
/// reported one). Wider-than-container boxes scale down preserving aspect.
pub fn display_box(
    config: &BlockConfig,
    intrinsic: Option<(f32, f32)>,
    container_width: Option<f32>,
) -> DisplayBox {
    let aspect = intrinsic
        .filter(|(w, h)| w.is_finite() && h.is_finite() && *w > 0.0 && *h > 0.0)
        .map(|(w, h)| w / h)
        .unwrap_or(DEFAULT_ASPECT);

    let (width, height) = match (config.width, config.height, config.ratio) {
        (Some(w), Some(h), _) => (w, h),
        (Some(w), None, Some(r)) => (w, w / r),
        (None, Some(h), Some(r)) => (h * r, h),
        (None, None, Some(r)) => (DEFAULT_WIDTH, DEFAULT_WIDTH / r),
        (Some(w), None, None) => (w, w / aspect),
        (None, Some(h), None) => (h * aspect, h),
        (None, None, None) => (DEFAULT_WIDTH, DEFAULT_WIDTH / aspect),
    };

    let unclamped = DisplayBox { width, height };
    match container_width {
        Some(max) if max > 0.0 && unclamped.width > max => DisplayBox {
            width: max,
            height: max / unclamped.aspect(),
        },
        _ => unclamped,
    }
}
