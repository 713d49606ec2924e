//! Rive Blocks - Rive animations in rendered markdown notes
//!
//! Turns ```rive code blocks into running animations: block configuration
//! parsing with frontmatter and settings defaults, vault asset resolution,
//! a renderer fallback ladder with deadlines, and the caching, blob and
//! observer plumbing a host wires its UI to.

pub mod core;
pub mod error;
pub mod plugin;
pub mod render;
pub mod runtime;

pub use crate::core::cache::BufferCache;
pub use crate::core::config::BlockConfig;
pub use crate::core::settings::{PluginSettings, SettingsStore};
pub use crate::core::vault::{DirectoryVault, MemoryVault, VaultAdapter};
pub use crate::error::BlockError;
pub use crate::plugin::{BlockView, Notice, RenderContext, RivePlugin};
pub use crate::render::block::{BlockId, RiveBlock};
pub use crate::render::orchestrator::{LoadState, LOAD_TIMEOUT};
pub use crate::runtime::backend::{RendererBackend, RuntimeModule, RuntimeProvider};
