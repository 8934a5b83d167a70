use idw_heatmap::InputSample;

/// Midtown Manhattan.
const CENTER: (f64, f64) = (40.758, -73.9855);
/// Spread of generated venues, in degrees.
const SPREAD: f64 = 0.03;

/// Synthetic per-venue busyness readings clustered around a few hotspots.
pub fn generate(count: usize, rng: &mut fastrand::Rng) -> Vec<InputSample> {
    let hotspots = [(0.0, 0.0), (0.012, -0.008), (-0.015, 0.01)];

    (0..count)
        .map(|_| {
            // Sum of uniforms, roughly normal.
            let jitter = |rng: &mut fastrand::Rng| (rng.f64() + rng.f64() + rng.f64() - 1.5) * SPREAD;
            let lat = CENTER.0 + jitter(rng);
            let lon = CENTER.1 + jitter(rng);

            let heat: f64 = hotspots
                .iter()
                .map(|(dlat, dlon)| {
                    let d2 = (lat - CENTER.0 - dlat).powi(2) + (lon - CENTER.1 - dlon).powi(2);
                    (-d2 / (2.0 * 0.006f64.powi(2))).exp()
                })
                .sum();
            let busyness = (heat * 80.0 + rng.f64() * 15.0).min(100.0);

            InputSample::new(lat, lon, busyness as f32)
        })
        .collect()
}

/// Mean position of the samples, used as the initial view center.
pub fn centroid(samples: &[InputSample]) -> (f64, f64) {
    if samples.is_empty() {
        return CENTER;
    }
    let n = samples.len() as f64;
    let (lat, lon) = samples
        .iter()
        .fold((0.0, 0.0), |(lat, lon), s| (lat + s.lat, lon + s.lon));
    (lat / n, lon / n)
}
