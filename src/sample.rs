//! Input samples and the value normalizer.

use glam::Vec2;

use crate::projection::Projector;

/// Normalized value assigned to every sample when the value range is
/// degenerate (all samples equal, or a single sample with no override).
///
/// A flat dataset renders as uniformly "hot" rather than producing NaN.
pub const DEGENERATE_NORMALIZED: f32 = 1.0;

/// Raw geolocated reading supplied by the application.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputSample {
    pub lat: f64,
    pub lon: f64,
    pub val: f32,
}

impl InputSample {
    pub fn new(lat: f64, lon: f64, val: f32) -> Self {
        Self { lat, lon, val }
    }
}

/// A sample projected into the host's planar space, with its value rescaled
/// to [0, 1]. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub position: Vec2,
    pub raw_value: f32,
    pub normalized_value: f32,
}

/// Caller-supplied bounds. Each side is independent and can only widen the
/// data-derived range.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RangeOverride {
    pub min: Option<f32>,
    pub max: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

impl ValueRange {
    /// Min/max over finite values. `None` when there are none.
    pub fn from_values(values: impl IntoIterator<Item = f32>) -> Option<Self> {
        values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<Self>, v| match acc {
                None => Some(Self { min: v, max: v }),
                Some(r) => Some(Self {
                    min: r.min.min(v),
                    max: r.max.max(v),
                }),
            })
    }

    /// Effective range: the union of the data range and the override.
    pub fn effective(
        values: impl IntoIterator<Item = f32>,
        overrides: RangeOverride,
    ) -> Option<Self> {
        let data = Self::from_values(values);
        let min = match (data.map(|r| r.min), overrides.min) {
            (Some(d), Some(o)) => Some(d.min(o)),
            (d, o) => d.or(o),
        };
        let max = match (data.map(|r| r.max), overrides.max) {
            (Some(d), Some(o)) => Some(d.max(o)),
            (d, o) => d.or(o),
        };
        match (min, max) {
            (Some(min), Some(max)) => Some(Self { min, max }),
            _ => None,
        }
    }

    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.span() > 0.0) || !self.span().is_finite()
    }

    pub fn normalize(&self, value: f32) -> f32 {
        if self.is_degenerate() {
            return DEGENERATE_NORMALIZED;
        }
        (value - self.min) / self.span()
    }
}

/// Projects and normalizes the input set against its effective range.
///
/// Returns the samples together with the range used, so the draw stage can
/// reuse it. With no input and no override the range is `None` and the
/// sample list is empty.
pub fn normalize_samples(
    input: &[InputSample],
    overrides: RangeOverride,
    projector: &dyn Projector,
) -> (Vec<Sample>, Option<ValueRange>) {
    let range = ValueRange::effective(input.iter().map(|s| s.val), overrides);
    let samples = match range {
        Some(range) => input
            .iter()
            .filter(|s| s.val.is_finite())
            .map(|s| Sample {
                position: projector.project(s.lat, s.lon),
                raw_value: s.val,
                normalized_value: range.normalize(s.val),
            })
            .collect(),
        None => Vec::new(),
    };
    (samples, range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::WebMercator;

    fn input(vals: &[f32]) -> Vec<InputSample> {
        vals.iter()
            .enumerate()
            .map(|(i, &v)| InputSample::new(40.0 + i as f64 * 0.01, -73.9, v))
            .collect()
    }

    #[test]
    fn extremes_map_to_unit_interval() {
        let (samples, range) =
            normalize_samples(&input(&[5.0, 10.0, 7.5, 20.0]), RangeOverride::default(), &WebMercator);
        let range = range.unwrap();
        assert_eq!(range, ValueRange { min: 5.0, max: 20.0 });
        assert!(samples.iter().all(|s| (0.0..=1.0).contains(&s.normalized_value)));
        assert!((samples[0].normalized_value - 0.0).abs() < 1e-6);
        assert!((samples[3].normalized_value - 1.0).abs() < 1e-6);
        assert!((samples[2].normalized_value - 0.1666667).abs() < 1e-5);
    }

    #[test]
    fn override_only_widens() {
        let narrow = RangeOverride {
            min: Some(6.0),
            max: Some(8.0),
        };
        let r = ValueRange::effective([5.0, 10.0], narrow).unwrap();
        assert_eq!(r, ValueRange { min: 5.0, max: 10.0 });

        let wide = RangeOverride {
            min: Some(0.0),
            max: None,
        };
        let r = ValueRange::effective([5.0, 10.0], wide).unwrap();
        assert_eq!(r, ValueRange { min: 0.0, max: 10.0 });
        assert!((r.normalize(5.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn single_sample_uses_constant() {
        let (samples, range) =
            normalize_samples(&input(&[100.0]), RangeOverride::default(), &WebMercator);
        assert!(range.unwrap().is_degenerate());
        assert_eq!(samples[0].normalized_value, DEGENERATE_NORMALIZED);
        assert!(samples[0].normalized_value.is_finite());
    }

    #[test]
    fn equal_values_share_constant() {
        let (samples, _) =
            normalize_samples(&input(&[3.0, 3.0, 3.0]), RangeOverride::default(), &WebMercator);
        assert!(samples.iter().all(|s| s.normalized_value == DEGENERATE_NORMALIZED));
    }

    #[test]
    fn override_breaks_degeneracy() {
        let overrides = RangeOverride {
            min: Some(0.0),
            max: None,
        };
        let (samples, _) = normalize_samples(&input(&[100.0]), overrides, &WebMercator);
        assert!((samples[0].normalized_value - 1.0).abs() < 1e-6);
    }

    #[test]
    fn empty_input() {
        let (samples, range) = normalize_samples(&[], RangeOverride::default(), &WebMercator);
        assert!(samples.is_empty());
        assert!(range.is_none());
    }

    #[test]
    fn non_finite_values_are_dropped() {
        let (samples, range) =
            normalize_samples(&input(&[1.0, f32::NAN, 3.0]), RangeOverride::default(), &WebMercator);
        assert_eq!(samples.len(), 2);
        assert_eq!(range.unwrap(), ValueRange { min: 1.0, max: 3.0 });
    }
}
