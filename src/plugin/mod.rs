//! Plugin facade
//!
//! [`RivePlugin`] is what a host embeds: it reacts to render passes,
//! observer callbacks, palette commands and frame ticks, and owns every
//! piece of shared state behind them (the block registry, the asset buffer
//! cache, the blob store, the per-backend runtime cache and the observer
//! ledger). The vault and settings store stay host-owned and are passed
//! into the calls that need them.

pub mod api;
pub mod registry;

pub use api::{
    manifest, BlockView, Notice, PluginCommand, PluginManifest, RenderContext, CMD_RESTART_LAST,
    CMD_TEST_LOAD, COMMANDS,
};
pub use registry::InstanceRegistry;

use std::time::Instant;

use anyhow::Result;

use crate::core::cache::BufferCache;
use crate::core::config::{self, ConfigDefaults};
use crate::core::markdown::{extract_rive_blocks, frontmatter_overrides};
use crate::core::settings::{PluginSettings, SettingsStore};
use crate::core::vault::VaultAdapter;
use crate::render::block::{BlockId, RiveBlock};
use crate::render::observers::{ObserverFlags, ObserverHub};
use crate::render::orchestrator::LoadState;
use crate::runtime::backend::{CachingRuntime, RuntimeProvider};
use crate::runtime::blob::BlobStore;

/// The embedded plugin. One per host window.
pub struct RivePlugin {
    settings: PluginSettings,
    runtime: CachingRuntime<Box<dyn RuntimeProvider>>,
    registry: InstanceRegistry,
    cache: BufferCache,
    blobs: BlobStore,
    observers: ObserverHub,
    notices: Vec<Notice>,
}

impl RivePlugin {
    /// Wrap the host's runtime provider. Modules are acquired lazily, once
    /// per backend, on the first block that needs them.
    pub fn new(runtime: Box<dyn RuntimeProvider>) -> Self {
        Self {
            settings: PluginSettings::default(),
            runtime: CachingRuntime::new(runtime),
            registry: InstanceRegistry::new(),
            cache: BufferCache::new(),
            blobs: BlobStore::new(),
            observers: ObserverHub::new(),
            notices: Vec::new(),
        }
    }

    pub fn manifest(&self) -> PluginManifest {
        api::manifest()
    }

    /// Palette commands to register with the host.
    pub fn commands(&self) -> &'static [PluginCommand] {
        COMMANDS
    }

    pub fn settings(&self) -> &PluginSettings {
        &self.settings
    }

    /// Apply new settings. Blocks already on screen keep the defaults they
    /// were parsed with until their next render.
    pub fn update_settings(&mut self, settings: PluginSettings) {
        self.settings = settings;
    }

    pub fn load_settings(&mut self, store: &dyn SettingsStore) {
        self.settings = PluginSettings::load(store);
    }

    pub fn save_settings(&self, store: &mut dyn SettingsStore) -> Result<()> {
        self.settings.save(store)
    }

    /// Process one ```rive code block. Replaces any earlier incarnation of
    /// the same block and starts its load immediately.
    pub fn render_block(
        &mut self,
        text: &str,
        ordinal: usize,
        ctx: &RenderContext,
        vault: &dyn VaultAdapter,
        now: Instant,
    ) -> BlockView {
        let id = BlockId::new(ctx.note_path.clone().unwrap_or_default(), ordinal);
        let defaults = ConfigDefaults::from(&self.settings);
        let config = config::parse_with_overrides(text, &ctx.frontmatter, &defaults);

        let mut block = RiveBlock::new(id.clone(), config);
        if let Some(width) = ctx.container_width {
            block.set_container_width(width);
        }
        block.launch(
            ctx.note_path.as_deref(),
            vault,
            &mut self.cache,
            &mut self.runtime,
            &mut self.blobs,
            now,
        );

        let view = Self::view_of(&block);
        if let Some(mut old) = self.registry.insert(block) {
            old.teardown(&mut self.blobs);
        }
        self.settle(&id);
        view
    }

    /// Process a whole note: tear down blocks from its previous render,
    /// then render every ```rive block in reading order. Frontmatter
    /// overrides are taken from the note itself.
    pub fn render_document(
        &mut self,
        content: &str,
        ctx: &RenderContext,
        vault: &dyn VaultAdapter,
        now: Instant,
    ) -> Vec<BlockView> {
        let note_path = ctx.note_path.clone().unwrap_or_default();
        for id in self.registry.note_ids(&note_path) {
            self.remove_block(&id);
        }

        let ctx = RenderContext {
            frontmatter: frontmatter_overrides(content),
            ..ctx.clone()
        };

        extract_rive_blocks(content)
            .into_iter()
            .map(|source| self.render_block(&source.text, source.ordinal, &ctx, vault, now))
            .collect()
    }

    /// One host frame: drain runtime events and deadlines for every block.
    pub fn tick(&mut self, now: Instant) {
        for id in self.registry.ids() {
            let Some(block) = self.registry.get_mut(&id) else {
                continue;
            };
            let before = block.state();
            block.tick(&mut self.runtime, &mut self.blobs, now);
            let after = block.state();

            if before != after && after == LoadState::Loaded {
                self.registry.record_loaded(&id);
            } else if before != after {
                self.settle(&id);
            }
        }
    }

    /// Resize observer callback for one block's container.
    pub fn on_container_resize(&mut self, id: &BlockId, width: f32) {
        if let Some(block) = self.registry.get_mut(id) {
            block.set_container_width(width);
        }
    }

    /// Intersection observer callback for one block.
    pub fn on_visibility(&mut self, id: &BlockId, visible: bool) {
        if let Some(block) = self.registry.get_mut(id) {
            block.set_visible(visible);
        }
    }

    /// Window focus change fans out to every block.
    pub fn on_window_focus(&mut self, focused: bool) {
        for block in self.registry.iter_mut() {
            block.set_window_focused(focused);
        }
    }

    pub fn play(&mut self, id: &BlockId) {
        if let Some(block) = self.registry.get_mut(id) {
            block.play();
        }
    }

    pub fn pause(&mut self, id: &BlockId) {
        if let Some(block) = self.registry.get_mut(id) {
            block.pause();
        }
    }

    pub fn toggle(&mut self, id: &BlockId) {
        if let Some(block) = self.registry.get_mut(id) {
            block.toggle();
        }
    }

    pub fn rewind(&mut self, id: &BlockId) {
        if let Some(block) = self.registry.get_mut(id) {
            block.rewind();
        }
    }

    /// Rewind a block to its first frame and play it.
    pub fn restart(&mut self, id: &BlockId) {
        if let Some(block) = self.registry.get_mut(id) {
            block.restart();
        }
    }

    /// A block's container left the DOM.
    pub fn remove_block(&mut self, id: &BlockId) {
        if let Some(mut block) = self.registry.remove(id) {
            block.teardown(&mut self.blobs);
        }
        self.observers.unwire(id);
    }

    /// Host is unloading the plugin: tear down every block and release all
    /// shared state.
    pub fn unload(&mut self) {
        let count = self.registry.len();
        for mut block in self.registry.drain() {
            block.teardown(&mut self.blobs);
        }
        self.observers.clear();
        self.cache.clear();
        if !self.blobs.is_empty() {
            tracing::warn!("{} blob registrations survived unload", self.blobs.len());
        }
        tracing::info!("Rive plugin unloaded ({} blocks torn down)", count);
    }

    /// Run a palette command by id.
    pub fn run_command(&mut self, command: &str) {
        match command {
            CMD_TEST_LOAD => self.command_test_load(),
            CMD_RESTART_LAST => self.command_restart_last(),
            other => tracing::warn!("Unknown command: {}", other),
        }
    }

    /// Command toasts accumulated since the last drain.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn block_view(&self, id: &BlockId) -> Option<BlockView> {
        self.registry.get(id).map(Self::view_of)
    }

    /// Current views for every block of one note, in reading order.
    pub fn note_views(&self, note_path: &str) -> Vec<BlockView> {
        self.registry
            .note_ids(note_path)
            .iter()
            .filter_map(|id| self.block_view(id))
            .collect()
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    pub fn observers(&self) -> &ObserverHub {
        &self.observers
    }

    /// Smoke-test the runtime seam: acquire the default backend module and
    /// toast the outcome.
    fn command_test_load(&mut self) {
        match self.runtime.acquire(self.settings.default_renderer) {
            Ok(_) => {
                tracing::info!("Rive runtime module ready: {}", self.settings.default_renderer);
                self.notices.push(Notice::new("Rive runtime loaded"));
            }
            Err(e) => {
                tracing::error!("Runtime module acquisition failed: {}", e);
                self.notices.push(Notice::new("Failed to load Rive runtime"));
            }
        }
    }

    fn command_restart_last(&mut self) {
        match self.registry.last_loaded_block_mut() {
            Some(block) => {
                block.restart();
                self.notices.push(Notice::new("Rive animation restarted"));
            }
            None => self.notices.push(Notice::new("No Rive animation active")),
        }
    }

    /// Wire or release a block's observers to match its settled state.
    /// Failures stay inline: the block's status text carries them and the
    /// loader has already logged them.
    fn settle(&mut self, id: &BlockId) {
        let Some(block) = self.registry.get(id) else {
            return;
        };
        if block.state().is_terminal() {
            self.observers.unwire(id);
        } else {
            self.observers.wire(id, ObserverFlags::all());
        }
    }

    fn view_of(block: &RiveBlock) -> BlockView {
        BlockView {
            id: block.id().clone(),
            size: block.display_box(),
            backend: block.active_backend(),
            show_controls: block.config().show_controls,
            status: block.status_text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use crate::core::vault::MemoryVault;
    use crate::runtime::backend::{RendererBackend, RuntimeModule};
    use crate::runtime::scripted::{ScriptedOutcome, ScriptedRuntime};

    fn plugin() -> (RivePlugin, ScriptedRuntime) {
        let runtime = ScriptedRuntime::new().with_intrinsic_size(100.0, 50.0);
        (RivePlugin::new(Box::new(runtime.clone())), runtime)
    }

    fn vault() -> MemoryVault {
        let mut vault = MemoryVault::new();
        vault.insert("anims/spinner.riv", b"spinner".to_vec());
        vault.insert("anims/hero.riv", b"hero".to_vec());
        vault
    }

    fn notice_texts(plugin: &mut RivePlugin) -> Vec<String> {
        plugin.take_notices().into_iter().map(|n| n.text).collect()
    }

    const NOTE: &str = "notes/demo.md";

    const CONTENT: &str = "# Demo\n\n```rive\nsrc: /anims/spinner.riv\n```\n\n```js\nlet x = 1;\n```\n\n```rive\nsrc: /anims/hero.riv\nautoplay: false\n```\n";

    #[test]
    fn render_document_registers_and_loads_every_block() {
        let (mut plugin, _runtime) = plugin();
        let vault = vault();
        let now = Instant::now();

        let views = plugin.render_document(CONTENT, &RenderContext::for_note(NOTE), &vault, now);
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].id, BlockId::new(NOTE, 0));
        assert_eq!(views[1].id, BlockId::new(NOTE, 1));
        assert_eq!(plugin.observers().active(), 2);

        plugin.tick(now);
        // Loads are quiet; only palette commands toast.
        assert!(notice_texts(&mut plugin).is_empty());

        let views = plugin.note_views(NOTE);
        assert_eq!(views[0].status, "Playing");
        assert_eq!(views[1].status, "Paused"); // autoplay: false
        assert_eq!(plugin.registry().last_loaded(), Some(&BlockId::new(NOTE, 1)));
    }

    #[test]
    fn rerendering_a_note_replaces_its_blocks() {
        let (mut plugin, _runtime) = plugin();
        let vault = vault();
        let now = Instant::now();

        plugin.render_document(CONTENT, &RenderContext::for_note(NOTE), &vault, now);
        plugin.tick(now);

        // The note shrank to one block.
        let content = "```rive\nsrc: /anims/hero.riv\n```\n";
        let views = plugin.render_document(content, &RenderContext::for_note(NOTE), &vault, now);
        assert_eq!(views.len(), 1);
        assert_eq!(plugin.registry().len(), 1);
        assert_eq!(plugin.observers().active(), 1);
        assert!(plugin.blobs.is_empty());
    }

    #[test]
    fn frontmatter_overrides_reach_every_block_of_the_note() {
        let (mut plugin, _runtime) = plugin();
        let vault = vault();
        let content = "---\nrive.autoplay: \"false\"\n---\n\n```rive\nsrc: /anims/spinner.riv\n```\n";

        let now = Instant::now();
        plugin.render_document(content, &RenderContext::for_note(NOTE), &vault, now);
        plugin.tick(now);

        let id = BlockId::new(NOTE, 0);
        let block = plugin.registry().get(&id).unwrap();
        assert!(block.is_loaded());
        assert!(!block.is_playing());
    }

    #[test]
    fn missing_src_shows_inline_guidance() {
        let (mut plugin, _runtime) = plugin();
        let vault = vault();

        let view = plugin.render_block(
            "autoplay: false",
            0,
            &RenderContext::for_note(NOTE),
            &vault,
            Instant::now(),
        );
        assert_eq!(view.status, "Missing src (src: path/to/file.riv)");
        assert_eq!(plugin.observers().active(), 0);
        assert!(notice_texts(&mut plugin).is_empty());
    }

    #[test]
    fn failed_ladder_settles_with_inline_error() {
        let (mut plugin, runtime) = plugin();
        let vault = vault();
        for _ in 0..3 {
            runtime.script(ScriptedOutcome::RejectConstruct);
        }

        let view = plugin.render_block(
            "src: /anims/spinner.riv\nrenderer: webgl2",
            0,
            &RenderContext::for_note(NOTE),
            &vault,
            Instant::now(),
        );

        assert_eq!(view.status, "Failed to load Rive file: scripted rejection");
        assert_eq!(plugin.observers().active(), 0);
        assert!(plugin.blobs.is_empty());
        assert!(notice_texts(&mut plugin).is_empty());
    }

    #[test]
    fn settings_persist_through_the_host_store() {
        struct MemoryStore {
            data: Option<serde_json::Value>,
        }
        impl SettingsStore for MemoryStore {
            fn load_data(&self) -> Result<Option<serde_json::Value>> {
                Ok(self.data.clone())
            }

            fn save_data(&mut self, data: serde_json::Value) -> Result<()> {
                self.data = Some(data);
                Ok(())
            }
        }

        let (mut plugin, _runtime) = plugin();
        plugin.update_settings(PluginSettings {
            default_autoplay: false,
            ..PluginSettings::default()
        });

        let mut store = MemoryStore { data: None };
        plugin.save_settings(&mut store).unwrap();

        let (mut reloaded, _runtime) = self::plugin();
        reloaded.load_settings(&store);
        assert!(!reloaded.settings().default_autoplay);
        assert!(reloaded.settings().default_loop);
    }

    #[test]
    fn host_registration_surface_lists_both_commands() {
        let (plugin, _runtime) = plugin();
        assert_eq!(plugin.manifest().id, "rive-blocks");

        let ids: Vec<_> = plugin.commands().iter().map(|c| c.id).collect();
        assert_eq!(ids, [CMD_TEST_LOAD, CMD_RESTART_LAST]);
    }

    #[test]
    fn settings_defaults_flow_into_new_blocks() {
        let (mut plugin, _runtime) = plugin();
        let vault = vault();
        plugin.update_settings(PluginSettings {
            default_autoplay: false,
            ..PluginSettings::default()
        });

        let now = Instant::now();
        plugin.render_block(
            "src: /anims/spinner.riv",
            0,
            &RenderContext::for_note(NOTE),
            &vault,
            now,
        );
        plugin.tick(now);

        let block = plugin.registry().get(&BlockId::new(NOTE, 0)).unwrap();
        assert!(block.is_loaded());
        assert!(!block.is_playing());
    }

    #[test]
    fn window_blur_pauses_every_loaded_block() {
        let (mut plugin, runtime) = plugin();
        let vault = vault();
        let now = Instant::now();

        plugin.render_document(CONTENT, &RenderContext::for_note(NOTE), &vault, now);
        plugin.tick(now);
        runtime.clear_actions();

        plugin.on_window_focus(false);
        // Only the autoplaying block had anything to pause.
        assert_eq!(runtime.actions(), ["pause"]);

        plugin.on_window_focus(true);
        assert_eq!(runtime.actions(), ["pause", "play"]);
    }

    #[test]
    fn test_load_command_reports_the_runtime_module() {
        let (mut plugin, _runtime) = plugin();
        plugin.run_command(CMD_TEST_LOAD);
        assert_eq!(notice_texts(&mut plugin), ["Rive runtime loaded"]);
    }

    #[test]
    fn test_load_command_notices_acquisition_failure() {
        struct FailingProvider;
        impl RuntimeProvider for FailingProvider {
            fn acquire(
                &mut self,
                _backend: RendererBackend,
            ) -> anyhow::Result<Rc<dyn RuntimeModule>> {
                anyhow::bail!("module import rejected")
            }
        }

        let mut plugin = RivePlugin::new(Box::new(FailingProvider));
        plugin.run_command(CMD_TEST_LOAD);
        assert_eq!(notice_texts(&mut plugin), ["Failed to load Rive runtime"]);
    }

    #[test]
    fn restart_last_rewinds_the_most_recent_block() {
        let (mut plugin, runtime) = plugin();
        let vault = vault();
        let now = Instant::now();

        plugin.render_document(CONTENT, &RenderContext::for_note(NOTE), &vault, now);
        plugin.tick(now);
        runtime.clear_actions();

        // Last loaded is the second block, paused by its autoplay: false.
        plugin.run_command(CMD_RESTART_LAST);
        assert_eq!(notice_texts(&mut plugin), ["Rive animation restarted"]);
        assert_eq!(runtime.actions(), ["reset", "play"]);

        let id = plugin.registry().last_loaded().cloned().unwrap();
        assert!(plugin.registry().get(&id).unwrap().is_playing());
    }

    #[test]
    fn restart_last_without_anything_loaded_notices() {
        let (mut plugin, _runtime) = plugin();
        plugin.run_command(CMD_RESTART_LAST);
        assert_eq!(notice_texts(&mut plugin), ["No Rive animation active"]);
    }

    #[test]
    fn unload_releases_every_resource() {
        let (mut plugin, runtime) = plugin();
        let vault = vault();
        let now = Instant::now();

        runtime.script(ScriptedOutcome::RejectConstruct); // leaves a blob rung live
        plugin.render_document(CONTENT, &RenderContext::for_note(NOTE), &vault, now);
        assert!(!plugin.blobs.is_empty());

        plugin.unload();
        assert!(plugin.registry().is_empty());
        assert_eq!(plugin.observers().active(), 0);
        assert!(plugin.blobs.is_empty());
        assert!(plugin.cache.is_empty());
    }

    #[test]
    fn observer_callbacks_reach_the_right_block() {
        let (mut plugin, runtime) = plugin();
        let vault = vault();
        let now = Instant::now();

        plugin.render_document(CONTENT, &RenderContext::for_note(NOTE), &vault, now);
        plugin.tick(now);
        runtime.clear_actions();

        let first = BlockId::new(NOTE, 0);
        plugin.on_container_resize(&first, 320.0);
        let view = plugin.block_view(&first).unwrap();
        assert_eq!(view.size.width, 320.0);

        plugin.on_visibility(&first, false);
        assert_eq!(runtime.actions(), ["pause"]);
    }
}
