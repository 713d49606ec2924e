//! Seams around the Rive runtime: backend acquisition, instance capability,
//! and the blob-reference store used by the alternate delivery path.

pub mod backend;
pub mod blob;
pub mod instance;
pub mod scripted;

pub use backend::{CachingRuntime, RendererBackend, RuntimeModule, RuntimeProvider};
pub use blob::{BlobRef, BlobStore};
pub use instance::{
    Alignment, AnimationInstance, AssetDelivery, DeliveryKind, Fit, InstanceEvent, InstanceSpec,
    Layout, RenderControl,
};
pub use scripted::{ScriptedOutcome, ScriptedRuntime};
