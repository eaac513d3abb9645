//! Visual adjustment parameters.

use serde::{Deserialize, Serialize};

/// Lower bound of every filter parameter.
pub const FILTER_MIN: f64 = 0.0;
/// Upper bound of every filter parameter.
pub const FILTER_MAX: f64 = 2.0;
/// Neutral value of every filter parameter.
pub const FILTER_NEUTRAL: f64 = 1.0;

/// One of the three adjustable filter parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterParam {
    Brightness,
    Saturation,
    Contrast,
}

/// Brightness, saturation, and contrast multipliers, each in `[0, 2]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    brightness: f64,
    saturation: f64,
    contrast: f64,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            brightness: FILTER_NEUTRAL,
            saturation: FILTER_NEUTRAL,
            contrast: FILTER_NEUTRAL,
        }
    }
}

impl FilterState {
    /// Build a filter state, clamping every component.
    pub fn new(brightness: f64, saturation: f64, contrast: f64) -> Self {
        Self {
            brightness: clamp_param(brightness),
            saturation: clamp_param(saturation),
            contrast: clamp_param(contrast),
        }
    }

    pub fn brightness(&self) -> f64 {
        self.brightness
    }

    pub fn saturation(&self) -> f64 {
        self.saturation
    }

    pub fn contrast(&self) -> f64 {
        self.contrast
    }

    pub fn get(&self, param: FilterParam) -> f64 {
        match param {
            FilterParam::Brightness => self.brightness,
            FilterParam::Saturation => self.saturation,
            FilterParam::Contrast => self.contrast,
        }
    }

    /// Set one parameter. Returns the stored (clamped) value.
    pub fn set(&mut self, param: FilterParam, value: f64) -> f64 {
        let value = clamp_param(value);
        match param {
            FilterParam::Brightness => self.brightness = value,
            FilterParam::Saturation => self.saturation = value,
            FilterParam::Contrast => self.contrast = value,
        }
        value
    }

    /// Whether every parameter is at its neutral value.
    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }
}

/// Clamp a filter value into `[0, 2]`; non-finite input maps to neutral.
fn clamp_param(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(FILTER_MIN, FILTER_MAX)
    } else {
        FILTER_NEUTRAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_neutral() {
        let filter = FilterState::default();
        assert!(filter.is_neutral());
        assert_eq!(filter.brightness(), 1.0);
    }

    #[test]
    fn setters_clamp() {
        let mut filter = FilterState::default();
        assert_eq!(filter.set(FilterParam::Brightness, 3.5), 2.0);
        assert_eq!(filter.set(FilterParam::Contrast, -1.0), 0.0);
        assert_eq!(filter.set(FilterParam::Saturation, f64::NAN), 1.0);
        assert_eq!(filter.get(FilterParam::Brightness), 2.0);
        assert!(!filter.is_neutral());
    }

    #[test]
    fn serializes_with_plain_field_names() {
        let json = serde_json::to_string(&FilterState::new(0.5, 1.0, 1.5)).unwrap();
        assert_eq!(json, r#"{"brightness":0.5,"saturation":1.0,"contrast":1.5}"#);
    }
}
