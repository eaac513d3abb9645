//! Filter compositor: turns a [`FilterState`] into a surface-ready descriptor.
//!
//! The descriptor is the single source of truth for what every surface
//! renders. Capture records exactly what the primary surface composites, so
//! the preview and the exported artifact only match if both surfaces receive
//! the same descriptor.

use serde::Serialize;
use vidtrim_edit_model::filter::FilterState;

/// One stage of the filter chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "amount", rename_all = "lowercase")]
pub enum FilterStage {
    Brightness(f64),
    Saturate(f64),
    Contrast(f64),
}

impl FilterStage {
    /// CSS filter-function form, e.g. `brightness(0.5)`.
    pub fn css(&self) -> String {
        match self {
            FilterStage::Brightness(v) => format!("brightness({v})"),
            FilterStage::Saturate(v) => format!("saturate({v})"),
            FilterStage::Contrast(v) => format!("contrast({v})"),
        }
    }

    /// `videobalance` settings that realise this stage on its own.
    ///
    /// `videobalance` scales luma by `contrast` around black, adds
    /// `brightness`, and scales chroma by `saturation`. Multiplying RGB by
    /// `k` scales both luma and chroma by `k`; contrast around mid-grey also
    /// scales chroma and shifts luma by `0.5 * (1 - c)`.
    pub fn video_balance(&self) -> VideoBalance {
        match *self {
            FilterStage::Brightness(k) => VideoBalance {
                brightness: 0.0,
                saturation: k,
                contrast: k,
            },
            FilterStage::Saturate(s) => VideoBalance {
                brightness: 0.0,
                saturation: s,
                contrast: 1.0,
            },
            FilterStage::Contrast(c) => VideoBalance {
                brightness: (0.5 - 0.5 * c).clamp(-1.0, 1.0),
                saturation: c,
                contrast: c,
            },
        }
    }

    /// Apply this stage to a linear-ish RGB triple in `[0, 1]`.
    fn apply(&self, [r, g, b]: [f64; 3]) -> [f64; 3] {
        let out = match *self {
            FilterStage::Brightness(k) => [r * k, g * k, b * k],
            FilterStage::Saturate(s) => [
                (0.213 + 0.787 * s) * r + (0.715 - 0.715 * s) * g + (0.072 - 0.072 * s) * b,
                (0.213 - 0.213 * s) * r + (0.715 + 0.285 * s) * g + (0.072 - 0.072 * s) * b,
                (0.213 - 0.213 * s) * r + (0.715 - 0.715 * s) * g + (0.072 + 0.928 * s) * b,
            ],
            FilterStage::Contrast(c) => [
                (r - 0.5) * c + 0.5,
                (g - 0.5) * c + 0.5,
                (b - 0.5) * c + 0.5,
            ],
        };
        out.map(|v| v.clamp(0.0, 1.0))
    }
}

/// Property values for one GStreamer `videobalance` element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VideoBalance {
    /// Additive luma offset in `[-1, 1]`.
    pub brightness: f64,
    /// Saturation in `[0, 2]`.
    pub saturation: f64,
    /// Contrast in `[0, 2]`.
    pub contrast: f64,
}

/// Composable filter chain: brightness, then saturate, then contrast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FilterDescriptor {
    stages: [FilterStage; 3],
}

impl FilterDescriptor {
    /// Compose the descriptor for a filter state.
    pub fn compose(state: &FilterState) -> Self {
        Self {
            stages: [
                FilterStage::Brightness(state.brightness()),
                FilterStage::Saturate(state.saturation()),
                FilterStage::Contrast(state.contrast()),
            ],
        }
    }

    pub fn stages(&self) -> &[FilterStage; 3] {
        &self.stages
    }

    /// Space-separated CSS filter chain.
    pub fn css(&self) -> String {
        self.stages
            .iter()
            .map(FilterStage::css)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// One `videobalance` per stage, in chain order.
    pub fn video_balance_chain(&self) -> [VideoBalance; 3] {
        self.stages.map(|stage| stage.video_balance())
    }

    /// Run one 8-bit RGB pixel through the chain.
    pub fn apply_rgb(&self, pixel: [u8; 3]) -> [u8; 3] {
        let mut value = pixel.map(|c| c as f64 / 255.0);
        for stage in &self.stages {
            value = stage.apply(value);
        }
        value.map(|c| (c * 255.0).round() as u8)
    }

    /// Whether this descriptor leaves pixels untouched.
    pub fn is_identity(&self) -> bool {
        *self == Self::compose(&FilterState::default())
    }
}

impl Default for FilterDescriptor {
    fn default() -> Self {
        Self::compose(&FilterState::default())
    }
}
