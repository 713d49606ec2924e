//! The animation-instance seam
//!
//! The Rive runtime itself is an external collaborator: this module declares
//! the narrow capability surface the plugin relies on. An instance is
//! constructed from an [`InstanceSpec`], reports load progress through polled
//! [`InstanceEvent`]s (drained once per host tick), and exposes playback
//! control. Rendering suspension is a *declared* optional capability rather
//! than something probed for at call time.

use std::sync::Arc;

use crate::runtime::blob::BlobRef;

/// How the asset bytes reach the runtime constructor.
#[derive(Debug, Clone)]
pub enum AssetDelivery {
    /// Decoded buffer handed to the constructor directly.
    Buffer(Arc<Vec<u8>>),
    /// Bytes served through a temporary blob reference.
    Blob(BlobRef),
}

impl AssetDelivery {
    pub fn kind(&self) -> DeliveryKind {
        match self {
            AssetDelivery::Buffer(_) => DeliveryKind::Buffer,
            AssetDelivery::Blob(_) => DeliveryKind::Blob,
        }
    }
}

/// Delivery mechanism without the payload, used by the retry ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryKind {
    Buffer,
    Blob,
}

/// How the drawn animation is scaled into its display box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fit {
    #[default]
    Contain,
    Cover,
    Fill,
    FitWidth,
    FitHeight,
    ScaleDown,
    None,
}

impl Fit {
    /// Map a config string to the runtime enum. Accepts lower/camel/kebab
    /// spellings; unrecognized values are nothing, and the caller falls back
    /// to the default fit.
    pub fn from_name(name: &str) -> Option<Self> {
        match normalize(name).as_str() {
            "contain" => Some(Fit::Contain),
            "cover" => Some(Fit::Cover),
            "fill" => Some(Fit::Fill),
            "fitwidth" => Some(Fit::FitWidth),
            "fitheight" => Some(Fit::FitHeight),
            "scaledown" => Some(Fit::ScaleDown),
            "none" => Some(Fit::None),
            _ => None,
        }
    }
}

/// Where the drawn animation sits inside its display box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Center,
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl Alignment {
    pub fn from_name(name: &str) -> Option<Self> {
        match normalize(name).as_str() {
            "center" => Some(Alignment::Center),
            "topleft" => Some(Alignment::TopLeft),
            "topcenter" => Some(Alignment::TopCenter),
            "topright" => Some(Alignment::TopRight),
            "centerleft" => Some(Alignment::CenterLeft),
            "centerright" => Some(Alignment::CenterRight),
            "bottomleft" => Some(Alignment::BottomLeft),
            "bottomcenter" => Some(Alignment::BottomCenter),
            "bottomright" => Some(Alignment::BottomRight),
            _ => None,
        }
    }
}

fn normalize(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Layout options forwarded to the runtime constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Layout {
    pub fit: Fit,
    pub alignment: Alignment,
}

impl Layout {
    /// Build from the raw config strings, falling back to defaults for
    /// absent or unrecognized values.
    pub fn from_config(fit: Option<&str>, alignment: Option<&str>) -> Self {
        Self {
            fit: fit.and_then(Fit::from_name).unwrap_or_default(),
            alignment: alignment.and_then(Alignment::from_name).unwrap_or_default(),
        }
    }
}

/// Everything a runtime module needs to construct one instance.
#[derive(Debug, Clone)]
pub struct InstanceSpec {
    pub delivery: AssetDelivery,
    pub autoplay: bool,
    pub loop_animation: bool,
    pub artboard: Option<String>,
    pub state_machines: Vec<String>,
    pub animations: Vec<String>,
    pub layout: Layout,
}

/// Load progress reported by the runtime, drained once per tick.
#[derive(Debug, Clone, PartialEq)]
pub enum InstanceEvent {
    /// The asset decoded; `intrinsic_size` is the artboard's natural
    /// width/height when the runtime exposes it.
    Loaded { intrinsic_size: Option<(f32, f32)> },
    /// The runtime rejected the asset.
    Failed { reason: String },
}

/// A constructed runtime instance.
///
/// Playback calls on an instance that has not reported `Loaded` yet are the
/// runtime's problem to tolerate; the block layer already gates them.
pub trait AnimationInstance {
    fn play(&mut self);
    fn pause(&mut self);
    fn reset(&mut self);

    /// Next pending load event, if any. Called once per host tick until the
    /// instance reports an outcome.
    fn poll_event(&mut self) -> Option<InstanceEvent>;

    /// Optional capability: suspend and resume the continuous render loop.
    /// Backends without one return `None` and the caller skips suspension.
    fn render_control(&mut self) -> Option<&mut dyn RenderControl> {
        None
    }
}

/// Render-loop suspension, for backends that support it.
pub trait RenderControl {
    fn stop_rendering(&mut self);
    fn start_rendering(&mut self);
}
