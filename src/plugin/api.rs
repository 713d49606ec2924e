//! Plugin surface types
//!
//! What the host sees of the plugin: command palette entries, notices to
//! toast at the user, the context a render pass runs in and the per-block
//! view handed back for the host to put on screen.

use std::collections::BTreeMap;

use crate::render::block::BlockId;
use crate::render::layout::DisplayBox;
use crate::runtime::backend::RendererBackend;

/// Command palette id: acquire the default runtime module as a smoke test.
pub const CMD_TEST_LOAD: &str = "rive-test-load";
/// Command palette id: restart the most recently loaded animation.
pub const CMD_RESTART_LAST: &str = "rive-restart-last";

/// A command palette entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginCommand {
    pub id: &'static str,
    pub name: &'static str,
}

/// Commands the plugin registers with the host.
pub const COMMANDS: &[PluginCommand] = &[
    PluginCommand {
        id: CMD_TEST_LOAD,
        name: "Rive: Test runtime load",
    },
    PluginCommand {
        id: CMD_RESTART_LAST,
        name: "Rive: Restart last animation",
    },
];

/// Plugin metadata the host displays.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PluginManifest {
    /// Plugin ID
    pub id: String,
    /// Plugin name
    pub name: String,
    /// Plugin version
    pub version: String,
    /// Plugin description
    pub description: String,
}

pub fn manifest() -> PluginManifest {
    PluginManifest {
        id: "rive-blocks".to_string(),
        name: "Rive Blocks".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        description: "Embed Rive animations in rendered notes".to_string(),
    }
}

/// User-facing toast raised by a plugin operation. The host drains these
/// once per frame and renders them however it renders notices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
}

impl Notice {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Where a render pass is happening.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    /// Vault path of the note being rendered.
    pub note_path: Option<String>,
    /// Container width in CSS pixels, when the host already knows it.
    pub container_width: Option<f32>,
    /// `rive.*` frontmatter overrides for the note, normalized keys.
    pub frontmatter: BTreeMap<String, String>,
}

impl RenderContext {
    pub fn for_note(note_path: impl Into<String>) -> Self {
        Self {
            note_path: Some(note_path.into()),
            ..Self::default()
        }
    }
}

/// Everything the host needs to put one block on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockView {
    pub id: BlockId,
    pub size: DisplayBox,
    /// Backend the current (or upcoming) instance runs on.
    pub backend: RendererBackend,
    pub show_controls: bool,
    /// Status line for the control strip.
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_ids_are_stable() {
        assert_eq!(COMMANDS.len(), 2);
        assert!(COMMANDS.iter().any(|c| c.id == CMD_TEST_LOAD));
        assert!(COMMANDS.iter().any(|c| c.id == CMD_RESTART_LAST));
    }

    #[test]
    fn manifest_round_trips_through_json() {
        let m = manifest();
        assert_eq!(m.id, "rive-blocks");

        let json = serde_json::to_string(&m).unwrap();
        let back: PluginManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.version, m.version);
    }
}
