//! Plugin settings and host-backed persistence
//!
//! The host owns the storage (a flat JSON value per plugin); this module owns
//! the shape and the defaults-merge. Loading tolerates missing or partial
//! data: absent keys fill from defaults, unknown keys are ignored, and a
//! corrupt payload falls back to defaults with a warning.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::runtime::backend::RendererBackend;

/// Host-provided persistence for the plugin's settings object.
pub trait SettingsStore {
    /// Previously saved data, `None` when nothing was ever saved.
    fn load_data(&self) -> Result<Option<serde_json::Value>>;
    fn save_data(&mut self, data: serde_json::Value) -> Result<()>;
}

/// Global defaults applied under frontmatter and block-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSettings {
    /// Start playback as soon as a block loads.
    pub default_autoplay: bool,
    /// Loop animations by default.
    pub default_loop: bool,
    /// Backend requested when a block does not name one.
    pub default_renderer: RendererBackend,
    /// Base directory prepended to relative `src` references.
    pub assets_base: Option<String>,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            default_autoplay: true,
            default_loop: true,
            default_renderer: RendererBackend::Canvas,
            assets_base: None,
        }
    }
}

impl PluginSettings {
    /// Load from the host store, merging stored keys over defaults.
    pub fn load(store: &dyn SettingsStore) -> Self {
        match store.load_data() {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!("Ignoring malformed plugin settings: {}", e);
                    Self::default()
                }
            },
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!("Failed to read plugin settings: {}", e);
                Self::default()
            }
        }
    }

    /// Persist through the host store.
    pub fn save(&self, store: &mut dyn SettingsStore) -> Result<()> {
        let value = serde_json::to_value(self).context("Failed to serialize plugin settings")?;
        store.save_data(value)?;
        tracing::info!("Saved Rive plugin settings");
        Ok(())
    }
}
