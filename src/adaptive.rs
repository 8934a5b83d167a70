//! Picks interpolation sharpness and compute resolution from the shape of
//! the sample values.
//!
//! Low mean-to-peak ratios (sparse, mostly quiet data) get a gentler
//! falloff and a coarser accumulation buffer; concentrated data gets a
//! sharper falloff and a finer buffer so peaks stay local.

/// Output of a [`ParameterStrategy`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpolationParams {
    pub power: f32,
    pub resolution_factor: f32,
}

pub trait ParameterStrategy {
    fn select(&self, values: &[f32]) -> InterpolationParams;
}

/// Below this ratio the data is considered sparse.
pub const SPARSE_RATIO: f32 = 0.2;
/// Above this ratio the data is considered concentrated.
pub const DENSE_RATIO: f32 = 0.6;

/// Threshold table over `mean / max`:
///
/// | ratio            | power | resolution |
/// |------------------|-------|------------|
/// | `< 0.2`          | 2     | 0.4        |
/// | `0.2 ..= 0.6`    | 3     | 0.5        |
/// | `> 0.6`          | 4     | 0.6        |
///
/// Both boundaries fall in the middle band.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdTable;

impl ParameterStrategy for ThresholdTable {
    fn select(&self, values: &[f32]) -> InterpolationParams {
        params_for_ratio(avg_ratio(values))
    }
}

pub fn params_for_ratio(ratio: f32) -> InterpolationParams {
    let (power, resolution_factor) = if ratio < SPARSE_RATIO {
        (2.0, 0.4)
    } else if ratio > DENSE_RATIO {
        (4.0, 0.6)
    } else {
        (3.0, 0.5)
    };
    InterpolationParams {
        power,
        resolution_factor,
    }
}

/// `mean / max` over the values. Empty input, a zero maximum, or a
/// non-finite quotient yield 0.
pub fn avg_ratio(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: f64 = values.iter().map(|&v| v as f64).sum();
    let avg = sum / values.len() as f64;
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max) as f64;
    if max == 0.0 {
        return 0.0;
    }
    let ratio = avg / max;
    if ratio.is_finite() {
        ratio as f32
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_table_rows() {
        assert_eq!(
            params_for_ratio(0.1),
            InterpolationParams {
                power: 2.0,
                resolution_factor: 0.4
            }
        );
        assert_eq!(
            params_for_ratio(0.4),
            InterpolationParams {
                power: 3.0,
                resolution_factor: 0.5
            }
        );
        assert_eq!(
            params_for_ratio(0.9),
            InterpolationParams {
                power: 4.0,
                resolution_factor: 0.6
            }
        );
    }

    #[test]
    fn boundaries_fall_in_middle_band() {
        assert_eq!(params_for_ratio(0.6).power, 3.0);
        assert_eq!(params_for_ratio(0.2).power, 3.0);
    }

    #[test]
    fn ratio_from_values() {
        // mean 10, max 100
        let values = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 100.0];
        assert!((avg_ratio(&values) - 0.1).abs() < 1e-6);
        assert_eq!(ThresholdTable.select(&values).resolution_factor, 0.4);

        // flat data is fully concentrated
        assert_eq!(ThresholdTable.select(&[5.0, 5.0]).power, 4.0);
    }

    #[test]
    fn zero_max_guarded() {
        assert_eq!(avg_ratio(&[0.0, 0.0]), 0.0);
        assert_eq!(avg_ratio(&[]), 0.0);
        assert_eq!(ThresholdTable.select(&[0.0]).power, 2.0);
    }
}
