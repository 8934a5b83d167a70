//! Geographic-to-planar projection and projection-matrix handling.

use std::f64::consts::PI;

use glam::{Mat4, Vec2};

/// Latitude limit of the world rectangle used when no AOI is given.
pub const WORLD_LAT_LIMIT: f64 = 85.0;

/// Maps (lat, lon) in degrees into the host's planar rendering space.
pub trait Projector {
    fn project(&self, lat: f64, lon: f64) -> Vec2;
}

impl<F> Projector for F
where
    F: Fn(f64, f64) -> Vec2,
{
    fn project(&self, lat: f64, lon: f64) -> Vec2 {
        self(lat, lon)
    }
}

/// Normalized Web Mercator: the world spans [0, 1] on both axes, y grows
/// southward.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebMercator;

impl Projector for WebMercator {
    fn project(&self, lat: f64, lon: f64) -> Vec2 {
        let x = (180.0 + lon) / 360.0;
        let y = (180.0 - (180.0 / PI) * (PI / 4.0 + lat * PI / 360.0).tan().ln()) / 360.0;
        Vec2::new(x as f32, y as f32)
    }
}

/// Corners of the projected world rectangle, in ring order.
pub fn world_corners(projector: &dyn Projector) -> [Vec2; 4] {
    [
        projector.project(-WORLD_LAT_LIMIT, -180.0),
        projector.project(WORLD_LAT_LIMIT, -180.0),
        projector.project(WORLD_LAT_LIMIT, 180.0),
        projector.project(-WORLD_LAT_LIMIT, 180.0),
    ]
}

/// Interprets a column-major 4x4 matrix. Extra trailing elements are
/// ignored; anything shorter than 16 is rejected.
pub fn parse_matrix(m: &[f32]) -> Option<Mat4> {
    if m.len() < 16 {
        return None;
    }
    Some(Mat4::from_cols_slice(&m[..16]))
}
