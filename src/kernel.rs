//! The per-pixel IDW kernel.
//!
//! The accumulation and draw shaders evaluate exactly these formulas; the
//! constants are injected into their WGSL so both sides agree. The CPU
//! versions here evaluate single points, e.g. for hit-testing or checks.

use glam::Vec2;

/// Lower bound on sample distance, in normalized buffer coordinates.
pub const MIN_DISTANCE: f32 = 1e-4;
/// Lower bound on the accumulated weight before division.
pub const MIN_WEIGHT: f32 = 1e-6;
/// Largest usable power. `1 / MIN_DISTANCE^p` leaves f32 range above this,
/// and a sample's own pixel would resolve `inf / inf`.
pub const MAX_POWER: f32 = 8.0;

/// Weight of a sample at `dist`: `1 / max(dist, MIN_DISTANCE)^power`.
#[inline]
pub fn weight(dist: f32, power: f32) -> f32 {
    1.0 / dist.max(MIN_DISTANCE).powf(power)
}

/// Turns accumulated `(Σ u·w, Σ w)` into the clamped scalar fed to the
/// color transfer function.
#[inline]
pub fn resolve(weighted: f32, total_weight: f32) -> f32 {
    let u = weighted / total_weight.max(MIN_WEIGHT);
    if u.is_nan() {
        return 0.0;
    }
    u.clamp(0.0, 1.0)
}

/// Accumulated `(Σ u·w, Σ w)` at `x` for samples given as
/// `(position, normalized value)` in the same normalized space.
pub fn accumulate_at(samples: &[(Vec2, f32)], x: Vec2, power: f32) -> (f32, f32) {
    samples.iter().fold((0.0, 0.0), |(wv, w), &(p, u)| {
        let wi = weight(x.distance(p), power);
        (wv + u * wi, w + wi)
    })
}

/// Interpolated value at `x`.
pub fn probe(samples: &[(Vec2, f32)], x: Vec2, power: f32) -> f32 {
    let (wv, w) = accumulate_at(samples, x, power);
    resolve(wv, w)
}

/// WGSL declarations for the kernel constants.
pub(crate) fn wgsl_constants() -> String {
    format!(
        "const MIN_DISTANCE: f32 = {:e};\nconst MIN_WEIGHT: f32 = {:e};\n",
        MIN_DISTANCE, MIN_WEIGHT
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_is_capped_at_min_distance() {
        assert_eq!(weight(0.0, 2.0), weight(MIN_DISTANCE, 2.0));
        assert!((weight(MIN_DISTANCE, 2.0) - 1e8).abs() / 1e8 < 1e-4);
        assert!(weight(0.5, 3.0) > weight(0.6, 3.0));
    }

    #[test]
    fn single_sample_peaks_at_itself() {
        let c = Vec2::new(0.5, 0.5);
        let samples = [(c, 1.0)];
        let (_, w_center) = accumulate_at(&samples, c, 3.0);
        let (_, w_off) = accumulate_at(&samples, Vec2::new(0.6, 0.5), 3.0);
        assert!(w_center > w_off);
        assert!((probe(&samples, c, 3.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn constant_values_interpolate_to_constant() {
        let samples = [(Vec2::new(0.2, 0.3), 1.0), (Vec2::new(0.8, 0.6), 1.0)];
        for power in [1.0, 2.0, 3.0, 4.0] {
            for &(x, y) in &[(0.0, 0.0), (0.5, 0.5), (0.2, 0.3), (1.0, 0.9)] {
                let u = probe(&samples, Vec2::new(x, y), power);
                assert!((u - 1.0).abs() < 1e-6, "p={power} at ({x},{y}) -> {u}");
            }
        }
    }

    #[test]
    fn peak_survives_at_max_power() {
        let c = Vec2::new(0.5, 0.5);
        let samples = [(c, 1.0), (Vec2::new(1.0, 1.0), 0.0), (Vec2::ZERO, 0.0)];
        let (wv, w) = accumulate_at(&samples, c, MAX_POWER);
        assert!(wv.is_finite() && w.is_finite());
        assert!((probe(&samples, c, MAX_POWER) - 1.0).abs() < 1e-6);
        assert!(weight(0.0, MAX_POWER).is_finite());
    }

    #[test]
    fn resolve_clamps_and_guards() {
        assert_eq!(resolve(0.0, 0.0), 0.0);
        assert_eq!(resolve(5.0, 1.0), 1.0);
        assert_eq!(resolve(-1.0, 1.0), 0.0);
        assert!((resolve(0.25, 0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn midpoint_between_extremes() {
        let samples = [(Vec2::new(0.25, 0.5), 0.0), (Vec2::new(0.75, 0.5), 1.0)];
        assert!((probe(&samples, Vec2::new(0.5, 0.5), 2.0) - 0.5).abs() < 1e-5);
        assert!(probe(&samples, Vec2::new(0.7, 0.5), 2.0) > 0.9);
    }

    #[test]
    fn constants_render_as_wgsl() {
        let src = wgsl_constants();
        assert!(src.contains("const MIN_DISTANCE: f32 = 1e-4;"));
        assert!(src.contains("const MIN_WEIGHT: f32 = 1e-6;"));
    }
}
