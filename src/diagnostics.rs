//! Observable events emitted by the heatmap layer.
//!
//! Stage code never talks to the `log` facade directly. It emits typed
//! [`Diagnostic`] values into a [`DiagnosticSink`], so hosts can route them
//! anywhere and tests can assert on them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Which per-frame stage an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Accumulate,
    Draw,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Self::Accumulate => "accumulate",
            Self::Draw => "draw",
        }
    }
}

/// Why a frame stage did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Layer was never attached, or has been detached.
    NotAttached,
    /// There are no samples to interpolate.
    NoSamples,
    /// The accumulation buffer is not allocated (zero-sized viewport).
    BufferUnallocated,
    /// The AOI triangulated to zero triangles.
    EmptyGeometry,
    /// Projection matrix was malformed and the policy is to skip.
    MalformedMatrix,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    Attached {
        id: String,
        samples: usize,
        buffer_width: u32,
        buffer_height: u32,
    },
    Normalized {
        min: f32,
        max: f32,
        degenerate: bool,
        samples: usize,
    },
    Triangulated {
        vertices: usize,
        triangles: usize,
    },
    BufferResized {
        width: u32,
        height: u32,
    },
    /// A projection matrix had the wrong length and was replaced by identity.
    MatrixCoerced {
        stage: Stage,
        len: usize,
    },
    FrameSkipped {
        stage: Stage,
        reason: SkipReason,
    },
    FrameAccumulated {
        frame: u64,
        samples: usize,
    },
    Detached {
        id: String,
    },
}

impl Diagnostic {
    /// Per-frame events are only forwarded by a verbose [`LogSink`], except
    /// for the first [`Diagnostic::MatrixCoerced`].
    pub fn is_per_frame(&self) -> bool {
        matches!(
            self,
            Self::MatrixCoerced { .. } | Self::FrameSkipped { .. } | Self::FrameAccumulated { .. }
        )
    }
}

/// Receiver for layer diagnostics.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, event: Diagnostic);
}

/// Forwards diagnostics to the `log` facade.
#[derive(Debug, Default)]
pub struct LogSink {
    pub verbose: bool,
    matrix_warned: AtomicBool,
}

impl LogSink {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            matrix_warned: AtomicBool::new(false),
        }
    }

    /// A coerced matrix is always warned about once; repeats need `verbose`.
    fn forwards(&self, event: &Diagnostic) -> bool {
        if self.verbose || !event.is_per_frame() {
            return true;
        }
        matches!(event, Diagnostic::MatrixCoerced { .. })
            && !self.matrix_warned.swap(true, Ordering::Relaxed)
    }
}

impl DiagnosticSink for LogSink {
    fn emit(&self, event: Diagnostic) {
        if !self.forwards(&event) {
            return;
        }
        match event {
            Diagnostic::Attached {
                id,
                samples,
                buffer_width,
                buffer_height,
            } => log::info!(
                "[heatmap:{id}] attached: {samples} samples, accumulation buffer {buffer_width}x{buffer_height}"
            ),
            Diagnostic::Normalized {
                min,
                max,
                degenerate,
                samples,
            } => {
                if degenerate {
                    log::warn!(
                        "[heatmap] value range [{min}, {max}] is degenerate, {samples} samples use the constant fallback"
                    );
                } else {
                    log::debug!("[heatmap] normalized {samples} samples over [{min}, {max}]");
                }
            }
            Diagnostic::Triangulated {
                vertices,
                triangles,
            } => log::debug!("[heatmap] AOI: {vertices} vertices -> {triangles} triangles"),
            Diagnostic::BufferResized { width, height } => {
                log::debug!("[heatmap] accumulation buffer resized to {width}x{height}")
            }
            Diagnostic::MatrixCoerced { stage, len } => log::warn!(
                "[heatmap] {} matrix has {len} elements (expected 16), using identity",
                stage.label()
            ),
            Diagnostic::FrameSkipped { stage, reason } => {
                log::debug!("[heatmap] {} skipped: {reason:?}", stage.label())
            }
            Diagnostic::FrameAccumulated { frame, samples } => {
                log::trace!("[heatmap] frame {frame}: accumulated {samples} samples")
            }
            Diagnostic::Detached { id } => log::info!("[heatmap:{id}] detached, GPU resources released"),
        }
    }
}

/// Collects diagnostics in memory. Clones share the same event list.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<Diagnostic>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far.
    pub fn events(&self) -> Vec<Diagnostic> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn count(&self, pred: impl Fn(&Diagnostic) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&self, event: Diagnostic) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_clones_share_events() {
        let sink = MemorySink::new();
        let handle = sink.clone();
        sink.emit(Diagnostic::BufferResized {
            width: 4,
            height: 2,
        });
        handle.emit(Diagnostic::Detached { id: "a".into() });

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            Diagnostic::BufferResized {
                width: 4,
                height: 2
            }
        );
    }

    #[test]
    fn quiet_log_sink_warns_once_about_matrices() {
        let coerced = Diagnostic::MatrixCoerced {
            stage: Stage::Draw,
            len: 9,
        };
        let skipped = Diagnostic::FrameSkipped {
            stage: Stage::Accumulate,
            reason: SkipReason::NoSamples,
        };

        let quiet = LogSink::new(false);
        assert!(quiet.forwards(&coerced));
        assert!(!quiet.forwards(&coerced));
        assert!(!quiet.forwards(&skipped));
        assert!(quiet.forwards(&Diagnostic::Detached { id: "a".into() }));

        let verbose = LogSink::new(true);
        assert!(verbose.forwards(&coerced));
        assert!(verbose.forwards(&coerced));
        assert!(verbose.forwards(&skipped));
    }

    #[test]
    fn per_frame_classification() {
        assert!(Diagnostic::FrameSkipped {
            stage: Stage::Draw,
            reason: SkipReason::NoSamples
        }
        .is_per_frame());
        assert!(!Diagnostic::Detached { id: "x".into() }.is_per_frame());
    }
}
