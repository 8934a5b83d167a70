//! Layer options and their validated, immutable form.

use crate::adaptive::{avg_ratio, ParameterStrategy, ThresholdTable};
use crate::color::ColorTransfer;
use crate::error::{HeatmapError, Result};
use crate::kernel::MAX_POWER;
use crate::sample::{InputSample, RangeOverride, ValueRange};

pub const DEFAULT_RESOLUTION_FACTOR: f32 = 0.3;
pub const DEFAULT_OPACITY: f32 = 0.5;
pub const DEFAULT_POWER: f32 = 3.0;
/// Opacity used by the adaptive preset.
pub const ADAPTIVE_OPACITY: f32 = 0.7;

/// One vertex of an area-of-interest ring, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// What a frame stage does with a projection matrix shorter than 16 floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatrixPolicy {
    /// Render with the identity matrix and report it.
    #[default]
    SubstituteIdentity,
    /// Skip the stage for this frame and report it.
    SkipFrame,
}

/// Caller-facing options. Validated into [`InterpolationConfig`] when the
/// layer is built.
#[derive(Debug, Clone)]
pub struct HeatmapOptions {
    pub id: String,
    pub data: Vec<InputSample>,
    /// Accumulation buffer size relative to the viewport, in (0, 1].
    pub resolution_factor: f32,
    pub min_value: Option<f32>,
    pub max_value: Option<f32>,
    pub opacity: f32,
    /// IDW power exponent, in [1, 8].
    pub power: f32,
    pub aoi: Option<Vec<GeoPoint>>,
    pub color: ColorTransfer,
    /// Forward per-frame diagnostics to the log.
    pub verbose: bool,
    pub matrix_policy: MatrixPolicy,
}

impl Default for HeatmapOptions {
    fn default() -> Self {
        Self {
            id: "heatmap".into(),
            data: Vec::new(),
            resolution_factor: DEFAULT_RESOLUTION_FACTOR,
            min_value: None,
            max_value: None,
            opacity: DEFAULT_OPACITY,
            power: DEFAULT_POWER,
            aoi: None,
            color: ColorTransfer::default(),
            verbose: false,
            matrix_policy: MatrixPolicy::default(),
        }
    }
}

impl HeatmapOptions {
    pub fn new(id: impl Into<String>, data: Vec<InputSample>) -> Self {
        Self {
            id: id.into(),
            data,
            ..Default::default()
        }
    }

    /// Preset that derives power and resolution from the data with the
    /// default threshold table.
    pub fn adaptive(id: impl Into<String>, data: Vec<InputSample>) -> Self {
        Self::adaptive_with(id, data, &ThresholdTable)
    }

    pub fn adaptive_with(
        id: impl Into<String>,
        data: Vec<InputSample>,
        strategy: &dyn ParameterStrategy,
    ) -> Self {
        let values: Vec<f32> = data.iter().map(|s| s.val).collect();
        let params = strategy.select(&values);
        let range = ValueRange::from_values(values.iter().copied());

        log::info!(
            "Heatmap parameters: p={} resolution_factor={} range={:?} avg_ratio={:.3}",
            params.power,
            params.resolution_factor,
            range,
            avg_ratio(&values),
        );

        Self {
            id: id.into(),
            data,
            resolution_factor: params.resolution_factor,
            min_value: range.map(|r| r.min),
            max_value: range.map(|r| r.max),
            opacity: ADAPTIVE_OPACITY,
            power: params.power,
            color: ColorTransfer::Banded,
            ..Default::default()
        }
    }

    pub fn with_resolution_factor(mut self, factor: f32) -> Self {
        self.resolution_factor = factor;
        self
    }

    pub fn with_value_range(mut self, min: Option<f32>, max: Option<f32>) -> Self {
        self.min_value = min;
        self.max_value = max;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_power(mut self, power: f32) -> Self {
        self.power = power;
        self
    }

    pub fn with_aoi(mut self, aoi: Vec<GeoPoint>) -> Self {
        self.aoi = Some(aoi);
        self
    }

    pub fn with_color(mut self, color: ColorTransfer) -> Self {
        self.color = color;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_matrix_policy(mut self, policy: MatrixPolicy) -> Self {
        self.matrix_policy = policy;
        self
    }

    pub fn range_override(&self) -> RangeOverride {
        RangeOverride {
            min: self.min_value,
            max: self.max_value,
        }
    }

    pub fn validate(&self) -> Result<InterpolationConfig> {
        if !(1.0..=MAX_POWER).contains(&self.power) {
            return Err(HeatmapError::InvalidConfig(format!(
                "power must be in [1, {MAX_POWER}], got {}",
                self.power
            )));
        }
        if !(self.resolution_factor > 0.0 && self.resolution_factor <= 1.0) {
            return Err(HeatmapError::InvalidConfig(format!(
                "resolution factor must be in (0, 1], got {}",
                self.resolution_factor
            )));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(HeatmapError::InvalidConfig(format!(
                "opacity must be in [0, 1], got {}",
                self.opacity
            )));
        }
        for bound in [self.min_value, self.max_value].into_iter().flatten() {
            if !bound.is_finite() {
                return Err(HeatmapError::InvalidConfig(format!(
                    "value range bounds must be finite, got {bound}"
                )));
            }
        }
        self.color.validate().map_err(HeatmapError::InvalidConfig)?;

        Ok(InterpolationConfig {
            power: self.power,
            resolution_factor: self.resolution_factor,
            opacity: self.opacity,
            color: self.color.clone(),
            aoi_exact_match: self.resolution_factor == 1.0,
            matrix_policy: self.matrix_policy,
        })
    }
}

/// Interpolation settings for the lifetime of one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationConfig {
    pub power: f32,
    pub resolution_factor: f32,
    pub opacity: f32,
    pub color: ColorTransfer,
    /// The accumulation pass rasterizes the AOI itself rather than the full
    /// viewport. Only safe at full resolution, where buffer texels line up
    /// with the draw pass pixels.
    pub aoi_exact_match: bool,
    pub matrix_policy: MatrixPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> Vec<InputSample> {
        vec![
            InputSample::new(40.70, -74.00, 10.0),
            InputSample::new(40.71, -74.01, 2.0),
            InputSample::new(40.72, -73.99, 1.0),
        ]
    }

    #[test]
    fn defaults_validate() {
        let cfg = HeatmapOptions::new("h", data()).validate().unwrap();
        assert_eq!(cfg.power, DEFAULT_POWER);
        assert_eq!(cfg.resolution_factor, DEFAULT_RESOLUTION_FACTOR);
        assert_eq!(cfg.opacity, DEFAULT_OPACITY);
        assert!(!cfg.aoi_exact_match);
    }

    #[test]
    fn exact_match_only_at_full_resolution() {
        let cfg = HeatmapOptions::new("h", data())
            .with_resolution_factor(1.0)
            .validate()
            .unwrap();
        assert!(cfg.aoi_exact_match);
    }

    #[test]
    fn rejects_out_of_range_options() {
        let base = HeatmapOptions::new("h", data());
        assert!(base.clone().with_power(0.5).validate().is_err());
        assert!(base.clone().with_power(f32::NAN).validate().is_err());
        assert!(base.clone().with_power(MAX_POWER + 1.0).validate().is_err());
        assert!(base.clone().with_power(12.0).validate().is_err());
        assert!(base.clone().with_power(MAX_POWER).validate().is_ok());
        assert!(base.clone().with_resolution_factor(0.0).validate().is_err());
        assert!(base.clone().with_resolution_factor(1.5).validate().is_err());
        assert!(base.clone().with_opacity(-0.1).validate().is_err());
        assert!(base
            .clone()
            .with_value_range(Some(f32::INFINITY), None)
            .validate()
            .is_err());
        assert!(matches!(
            base.with_color(ColorTransfer::Custom("nope".into())).validate(),
            Err(HeatmapError::InvalidConfig(_))
        ));
    }

    #[test]
    fn adaptive_preset() {
        // mean 13/3 over max 10 -> 0.433, middle band
        let opts = HeatmapOptions::adaptive("smart", data());
        assert_eq!(opts.power, 3.0);
        assert_eq!(opts.resolution_factor, 0.5);
        assert_eq!(opts.opacity, ADAPTIVE_OPACITY);
        assert_eq!(opts.min_value, Some(1.0));
        assert_eq!(opts.max_value, Some(10.0));
        assert_eq!(opts.color, ColorTransfer::Banded);
        assert!(opts.validate().is_ok());
    }
}
