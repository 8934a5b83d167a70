//! Live inverse-distance-weighted heat surfaces over a 2D map.
//!
//! A [`HeatmapLayer`] takes sparse geolocated samples and renders a
//! continuous surface with two wgpu passes per frame: an additive
//! accumulation of `(u·w, w)` into a downsampled float buffer, then a
//! full-resolution resolve through a color transfer function, clipped to an
//! optional area of interest.
//!
//! The host owns the device, the surface, the projection matrix, and frame
//! scheduling. See `src/bin/heatmap-demo` for a minimal winit host.

pub mod adaptive;
pub mod color;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod kernel;
pub mod projection;
pub mod render;
pub mod sample;
pub mod triangulate;

pub use adaptive::{InterpolationParams, ParameterStrategy, ThresholdTable};
pub use color::ColorTransfer;
pub use config::{GeoPoint, HeatmapOptions, InterpolationConfig, MatrixPolicy};
pub use diagnostics::{Diagnostic, DiagnosticSink, LogSink, MemorySink, SkipReason, Stage};
pub use error::{HeatmapError, Result};
pub use projection::{Projector, WebMercator};
pub use render::{HeatmapLayer, RenderContext};
pub use sample::{InputSample, Sample, ValueRange};
