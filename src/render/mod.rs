pub mod accumulate;
pub mod draw;
pub mod geometry;
pub mod instance;

use std::sync::Arc;

use glam::{Mat4, Vec2};

use self::accumulate::{
    buffer_size, check_support, AccumulationPipeline, AccumulationTarget, ACCUMULATION_FORMAT,
};
use self::draw::DrawPipeline;
use self::geometry::layer_meshes;
use self::instance::{FrameUniforms, SampleInstance};
use crate::config::{HeatmapOptions, InterpolationConfig, MatrixPolicy};
use crate::diagnostics::{Diagnostic, DiagnosticSink, LogSink, SkipReason, Stage};
use crate::error::{HeatmapError, Result};
use crate::projection::{parse_matrix, world_corners, Projector};
use crate::sample::{normalize_samples, InputSample, RangeOverride, Sample, ValueRange};

/// What the host hands over when the layer is added to it.
pub struct RenderContext<'a> {
    /// Adapter the device was created from, queried for float target support.
    pub adapter: &'a wgpu::Adapter,
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    /// Format of the surface the draw pass composites onto.
    pub target_format: wgpu::TextureFormat,
    /// Current viewport size in pixels.
    pub viewport: (u32, u32),
    pub projector: &'a dyn Projector,
}

/// Everything allocated on the GPU for one attached layer.
struct GpuResources {
    device: wgpu::Device,
    queue: wgpu::Queue,
    accumulation: AccumulationPipeline,
    draw: DrawPipeline,
    /// `None` while the viewport is zero-sized.
    target: Option<(AccumulationTarget, wgpu::BindGroup)>,
    viewport: (u32, u32),
}

impl GpuResources {
    fn destroy(self) {
        self.accumulation.destroy();
        self.draw.destroy();
        if let Some((target, _)) = self.target {
            target.texture.destroy();
        }
    }
}

enum Lifecycle {
    /// Built, not yet attached.
    Pending,
    Attached(Box<GpuResources>),
    /// Terminal.
    Detached,
}

/// Inverse-distance-weighted heat surface layer.
///
/// The host drives it: [`attach`](Self::attach) once, then per frame
/// [`accumulate`](Self::accumulate) followed by [`draw`](Self::draw), with
/// [`on_resize`](Self::on_resize) whenever the viewport changes, and finally
/// [`detach`](Self::detach). Frame operations outside the attached state do
/// nothing.
pub struct HeatmapLayer {
    id: String,
    config: InterpolationConfig,
    input: Vec<InputSample>,
    overrides: RangeOverride,
    aoi: Option<Vec<(f64, f64)>>,
    samples: Vec<Sample>,
    range: Option<ValueRange>,
    sink: Arc<dyn DiagnosticSink>,
    state: Lifecycle,
    frame: u64,
}

impl HeatmapLayer {
    /// Validates `options`. Diagnostics go to the log.
    pub fn new(options: HeatmapOptions) -> Result<Self> {
        let sink = Arc::new(LogSink::new(options.verbose));
        Self::with_sink(options, sink)
    }

    pub fn with_sink(options: HeatmapOptions, sink: Arc<dyn DiagnosticSink>) -> Result<Self> {
        let config = options.validate()?;
        let overrides = options.range_override();
        Ok(Self {
            id: options.id,
            config,
            input: options.data,
            overrides,
            aoi: options
                .aoi
                .map(|ring| ring.iter().map(|p| (p.lat, p.lon)).collect()),
            samples: Vec::new(),
            range: None,
            sink,
            state: Lifecycle::Pending,
            frame: 0,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &InterpolationConfig {
        &self.config
    }

    /// Projected, normalized samples. Empty until attached.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Effective value range computed at attach time.
    pub fn value_range(&self) -> Option<ValueRange> {
        self.range
    }

    pub fn is_attached(&self) -> bool {
        matches!(self.state, Lifecycle::Attached(_))
    }

    /// Number of completed accumulation passes.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Current accumulation buffer dimensions, if allocated.
    pub fn buffer_size(&self) -> Option<(u32, u32)> {
        match &self.state {
            Lifecycle::Attached(gpu) => gpu.target.as_ref().map(|(t, _)| t.size()),
            _ => None,
        }
    }

    fn emit(&self, event: Diagnostic) {
        self.sink.emit(event);
    }

    /// Allocates pipelines, geometry, and the accumulation buffer, and
    /// normalizes the samples.
    ///
    /// Fails if the device cannot render and blend into the Rg32Float
    /// accumulation target, or if a pipeline does not validate (e.g. a
    /// broken custom color function).
    /// On failure nothing is kept and the layer stays unattached.
    pub fn attach(&mut self, ctx: &RenderContext<'_>) -> Result<()> {
        match self.state {
            Lifecycle::Pending => {}
            Lifecycle::Attached(_) => return Err(HeatmapError::AlreadyAttached(self.id.clone())),
            Lifecycle::Detached => return Err(HeatmapError::AlreadyDetached(self.id.clone())),
        }

        check_support(
            ctx.device.features(),
            ctx.adapter.get_texture_format_features(ACCUMULATION_FORMAT),
        )?;

        let (samples, range) = normalize_samples(&self.input, self.overrides, ctx.projector);
        if let Some(r) = range {
            self.emit(Diagnostic::Normalized {
                min: r.min,
                max: r.max,
                degenerate: r.is_degenerate(),
                samples: samples.len(),
            });
        }

        let aoi: Option<Vec<Vec2>> = self.aoi.as_ref().map(|ring| {
            ring.iter()
                .map(|&(lat, lon)| ctx.projector.project(lat, lon))
                .collect()
        });
        let (draw_mesh, accumulation_mesh) = layer_meshes(
            aoi.as_deref(),
            world_corners(ctx.projector),
            self.config.aoi_exact_match,
        );
        self.emit(Diagnostic::Triangulated {
            vertices: draw_mesh.vertices.len(),
            triangles: draw_mesh.triangle_count(),
        });

        let instances: Vec<SampleInstance> = samples.iter().map(SampleInstance::from).collect();

        ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let accumulation = AccumulationPipeline::new(ctx.device, &accumulation_mesh, &instances);
        if let Some(err) = pollster::block_on(ctx.device.pop_error_scope()) {
            return Err(HeatmapError::Pipeline {
                stage: Stage::Accumulate.label(),
                message: err.to_string(),
            });
        }

        ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let draw = DrawPipeline::new(ctx.device, ctx.target_format, &draw_mesh, &self.config.color);
        if let Some(err) = pollster::block_on(ctx.device.pop_error_scope()) {
            accumulation.destroy();
            return Err(HeatmapError::Pipeline {
                stage: Stage::Draw.label(),
                message: err.to_string(),
            });
        }

        let target = buffer_size(ctx.viewport, self.config.resolution_factor).map(|size| {
            let target = AccumulationTarget::new(ctx.device, size);
            let bind_group = draw.bind_target(ctx.device, &target);
            (target, bind_group)
        });
        let (buffer_width, buffer_height) = target.as_ref().map(|(t, _)| t.size()).unwrap_or((0, 0));

        self.samples = samples;
        self.range = range;
        self.state = Lifecycle::Attached(Box::new(GpuResources {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            accumulation,
            draw,
            target,
            viewport: ctx.viewport,
        }));

        self.emit(Diagnostic::Attached {
            id: self.id.clone(),
            samples: self.samples.len(),
            buffer_width,
            buffer_height,
        });
        Ok(())
    }

    /// Reallocates the accumulation buffer for a new viewport size. Previous
    /// contents are discarded. No-op when the buffer size does not change.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        let Lifecycle::Attached(gpu) = &mut self.state else {
            return;
        };
        gpu.viewport = (width, height);

        let wanted = buffer_size((width, height), self.config.resolution_factor);
        let current = gpu.target.as_ref().map(|(t, _)| t.size());
        if wanted == current {
            return;
        }

        if let Some((old, _)) = gpu.target.take() {
            old.texture.destroy();
        }
        if let Some(size) = wanted {
            let target = AccumulationTarget::new(&gpu.device, size);
            let bind_group = gpu.draw.bind_target(&gpu.device, &target);
            gpu.target = Some((target, bind_group));
        }

        let (w, h) = wanted.unwrap_or((0, 0));
        self.sink.emit(Diagnostic::BufferResized { width: w, height: h });
    }

    /// Resolves the host matrix according to the configured policy.
    fn frame_matrix(&self, stage: Stage, matrix: &[f32]) -> Option<Mat4> {
        if let Some(m) = parse_matrix(matrix) {
            return Some(m);
        }
        match self.config.matrix_policy {
            MatrixPolicy::SubstituteIdentity => {
                self.emit(Diagnostic::MatrixCoerced {
                    stage,
                    len: matrix.len(),
                });
                Some(Mat4::IDENTITY)
            }
            MatrixPolicy::SkipFrame => {
                self.emit(Diagnostic::FrameSkipped {
                    stage,
                    reason: SkipReason::MalformedMatrix,
                });
                None
            }
        }
    }

    /// Why `stage` cannot run this frame, if it cannot.
    fn skip_reason(&self, stage: Stage) -> Option<SkipReason> {
        let Lifecycle::Attached(gpu) = &self.state else {
            return Some(SkipReason::NotAttached);
        };
        if self.samples.is_empty() {
            return Some(SkipReason::NoSamples);
        }
        if gpu.target.is_none() {
            return Some(SkipReason::BufferUnallocated);
        }
        let index_count = match stage {
            Stage::Accumulate => gpu.accumulation.mesh.index_count,
            Stage::Draw => gpu.draw.mesh.index_count,
        };
        if index_count == 0 {
            return Some(SkipReason::EmptyGeometry);
        }
        None
    }

    /// Compute pass: clears the accumulation buffer and adds every sample's
    /// `(u·w, w)` contribution into it.
    ///
    /// `matrix` is the host's column-major projection matrix.
    pub fn accumulate(&mut self, encoder: &mut wgpu::CommandEncoder, matrix: &[f32]) {
        let stage = Stage::Accumulate;
        if let Some(reason) = self.skip_reason(stage) {
            self.emit(Diagnostic::FrameSkipped { stage, reason });
            return;
        }
        let Some(matrix) = self.frame_matrix(stage, matrix) else {
            return;
        };
        let Lifecycle::Attached(gpu) = &self.state else {
            return;
        };
        let Some((target, _)) = &gpu.target else {
            return;
        };

        let uniforms = FrameUniforms::new(
            matrix,
            target.size(),
            self.config.power,
            self.config.opacity,
        );
        gpu.accumulation.encode(&gpu.queue, encoder, target, &uniforms);

        self.frame += 1;
        self.emit(Diagnostic::FrameAccumulated {
            frame: self.frame,
            samples: self.samples.len(),
        });
    }

    /// Draw pass: resolves the accumulation buffer through the color
    /// transfer function onto `view`, clipped to the AOI.
    pub fn draw(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView, matrix: &[f32]) {
        let stage = Stage::Draw;
        if let Some(reason) = self.skip_reason(stage) {
            self.emit(Diagnostic::FrameSkipped { stage, reason });
            return;
        }
        let Some(matrix) = self.frame_matrix(stage, matrix) else {
            return;
        };
        let Lifecycle::Attached(gpu) = &self.state else {
            return;
        };
        let Some((_, bind_group)) = &gpu.target else {
            return;
        };

        let uniforms = FrameUniforms::new(
            matrix,
            gpu.viewport,
            self.config.power,
            self.config.opacity,
        );
        gpu.draw.encode(&gpu.queue, encoder, view, bind_group, &uniforms);
    }

    /// Releases every GPU resource. The layer cannot be attached again.
    pub fn detach(&mut self) {
        let previous = std::mem::replace(&mut self.state, Lifecycle::Detached);
        if let Lifecycle::Attached(gpu) = previous {
            gpu.destroy();
            self.emit(Diagnostic::Detached {
                id: self.id.clone(),
            });
        }
    }
}

impl Drop for HeatmapLayer {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeoPoint;
    use crate::diagnostics::MemorySink;

    fn layer(options: HeatmapOptions) -> (HeatmapLayer, MemorySink) {
        let sink = MemorySink::new();
        let layer = HeatmapLayer::with_sink(options, Arc::new(sink.clone())).unwrap();
        (layer, sink)
    }

    fn options() -> HeatmapOptions {
        HeatmapOptions::new(
            "test",
            vec![
                InputSample::new(40.70, -74.00, 1.0),
                InputSample::new(40.75, -73.95, 9.0),
            ],
        )
    }

    #[test]
    fn construction_validates() {
        assert!(HeatmapLayer::new(options().with_power(0.0)).is_err());
        let (layer, sink) = layer(options().with_aoi(vec![
            GeoPoint::new(40.6, -74.1),
            GeoPoint::new(40.8, -74.1),
            GeoPoint::new(40.8, -73.9),
        ]));
        assert_eq!(layer.id(), "test");
        assert!(!layer.is_attached());
        assert!(layer.samples().is_empty());
        assert!(sink.events().is_empty());
    }

    #[test]
    fn resize_before_attach_is_ignored() {
        let (mut layer, sink) = layer(options());
        layer.on_resize(800, 600);
        assert_eq!(layer.buffer_size(), None);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn detach_is_terminal_and_idempotent() {
        let (mut layer, sink) = layer(options());
        layer.detach();
        layer.detach();
        assert!(!layer.is_attached());
        // nothing was allocated, so nothing is reported
        assert_eq!(sink.count(|e| matches!(e, Diagnostic::Detached { .. })), 0);
        assert_eq!(layer.skip_reason(Stage::Draw), Some(SkipReason::NotAttached));
    }

    #[test]
    fn matrix_policy() {
        let (identity, sink) = layer(options());
        assert_eq!(identity.frame_matrix(Stage::Draw, &[0.0; 4]), Some(Mat4::IDENTITY));
        assert_eq!(
            sink.events(),
            vec![Diagnostic::MatrixCoerced {
                stage: Stage::Draw,
                len: 4
            }]
        );

        let (strict, sink) = layer(options().with_matrix_policy(MatrixPolicy::SkipFrame));
        assert_eq!(strict.frame_matrix(Stage::Accumulate, &[]), None);
        assert_eq!(
            sink.events(),
            vec![Diagnostic::FrameSkipped {
                stage: Stage::Accumulate,
                reason: SkipReason::MalformedMatrix
            }]
        );

        let m = Mat4::from_scale(glam::Vec3::splat(3.0));
        assert_eq!(strict.frame_matrix(Stage::Draw, &m.to_cols_array()), Some(m));
    }
}
