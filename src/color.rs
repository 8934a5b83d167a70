//! Color transfer functions, expressed as WGSL spliced into the draw shader.
//!
//! Every transfer provides `fn value_to_color(v: f32) -> vec3<f32>` and
//! `fn value_to_color4(v: f32, opacity: f32) -> vec4<f32>`. The draw shader
//! only calls the latter, with `v` already clamped to [0, 1].

/// Diverging ramp: blue at 0, green at 0.5, red at 1.
const DIVERGING_WGSL: &str = "
fn value_to_color(v: f32) -> vec3<f32> {
    return vec3<f32>(max((v - 0.5) * 2.0, 0.0), 1.0 - 2.0 * abs(v - 0.5), max((0.5 - v) * 2.0, 0.0));
}
";

/// Three hard bands: blue below 0.3, green-yellow to 0.7, red-orange above.
const BANDED_WGSL: &str = "
fn value_to_color(v: f32) -> vec3<f32> {
    if (v < 0.3) {
        return vec3<f32>(0.0, 0.0, 1.0 - v);
    } else if (v < 0.7) {
        return vec3<f32>(v * 2.0 - 0.6, 1.0, 0.0);
    }
    return vec3<f32>(1.0, 1.0 - v, 0.0);
}
";

const DEFAULT_RGBA_WGSL: &str = "
fn value_to_color4(v: f32, opacity: f32) -> vec4<f32> {
    return vec4<f32>(value_to_color(v), opacity);
}
";

const RGB_FN: &str = "fn value_to_color(";
const RGBA_FN: &str = "fn value_to_color4(";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ColorTransfer {
    #[default]
    Diverging,
    Banded,
    /// WGSL defining `value_to_color`.
    Custom(String),
    /// WGSL defining both `value_to_color` and `value_to_color4`, for
    /// transfers that vary alpha with the value.
    CustomRgba(String),
}

impl ColorTransfer {
    /// Checks that custom snippets define the functions the draw shader calls.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Custom(src) if !src.contains(RGB_FN) => {
                Err("custom color transfer must define `fn value_to_color(v: f32) -> vec3<f32>`".into())
            }
            Self::CustomRgba(src) if !src.contains(RGBA_FN) => Err(
                "custom rgba color transfer must define `fn value_to_color4(v: f32, opacity: f32) -> vec4<f32>`"
                    .into(),
            ),
            Self::CustomRgba(src) if !src.contains(RGB_FN) => {
                Err("custom rgba color transfer must also define `fn value_to_color`".into())
            }
            _ => Ok(()),
        }
    }

    /// The WGSL prelude for the draw shader.
    pub fn wgsl(&self) -> String {
        match self {
            Self::Diverging => format!("{DIVERGING_WGSL}{DEFAULT_RGBA_WGSL}"),
            Self::Banded => format!("{BANDED_WGSL}{DEFAULT_RGBA_WGSL}"),
            Self::Custom(src) => format!("{src}\n{DEFAULT_RGBA_WGSL}"),
            Self::CustomRgba(src) => src.clone(),
        }
    }

    /// CPU evaluation of the built-in ramps. `None` for custom WGSL.
    pub fn eval(&self, v: f32) -> Option<[f32; 3]> {
        let v = v.clamp(0.0, 1.0);
        match self {
            Self::Diverging => Some([
                ((v - 0.5) * 2.0).max(0.0),
                1.0 - 2.0 * (v - 0.5).abs(),
                ((0.5 - v) * 2.0).max(0.0),
            ]),
            Self::Banded => Some(if v < 0.3 {
                [0.0, 0.0, 1.0 - v]
            } else if v < 0.7 {
                [v * 2.0 - 0.6, 1.0, 0.0]
            } else {
                [1.0, 1.0 - v, 0.0]
            }),
            Self::Custom(_) | Self::CustomRgba(_) => None,
        }
    }
}
