//! One rendered block
//!
//! A [`RiveBlock`] ties a parsed configuration to a load orchestrator and,
//! once construction succeeds, a live runtime instance. The plugin drives it
//! with the vault, cache, runtime provider and blob store it owns; the block
//! itself keeps the playback and visibility state and makes sure blob
//! registrations never outlive the instance they were created for.

use std::fmt;
use std::time::Instant;

use crate::core::cache::BufferCache;
use crate::core::config::BlockConfig;
use crate::core::vault::VaultAdapter;
use crate::error::BlockError;
use crate::render::layout::{display_box, DisplayBox};
use crate::render::orchestrator::{Attempt, Directive, LoadOrchestrator, LoadState};
use crate::runtime::backend::{RendererBackend, RuntimeProvider};
use crate::runtime::blob::{BlobRef, BlobStore};
use crate::runtime::instance::{
    AnimationInstance, AssetDelivery, DeliveryKind, InstanceEvent, InstanceSpec,
};

/// Stable identity of one rendered block: the note it lives in plus its
/// ordinal among that note's rive blocks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId {
    pub note_path: String,
    pub ordinal: usize,
}

impl BlockId {
    pub fn new(note_path: impl Into<String>, ordinal: usize) -> Self {
        Self {
            note_path: note_path.into(),
            ordinal,
        }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.note_path, self.ordinal)
    }
}

/// A rive block in a rendered note.
pub struct RiveBlock {
    id: BlockId,
    config: BlockConfig,
    orchestrator: LoadOrchestrator,
    instance: Option<Box<dyn AnimationInstance>>,
    /// Live blob registration for the current instance, revoked with it.
    blob: Option<BlobRef>,
    /// Logical playback intent; survives visibility changes.
    playing: bool,
    /// Viewport visibility from the intersection observer.
    visible: bool,
    /// Window focus; a blurred window suspends rendering like scrolling
    /// out of view does.
    focused: bool,
    container_width: Option<f32>,
    intrinsic_size: Option<(f32, f32)>,
}

impl RiveBlock {
    pub fn new(id: BlockId, config: BlockConfig) -> Self {
        Self {
            id,
            config,
            orchestrator: LoadOrchestrator::new(),
            instance: None,
            blob: None,
            playing: false,
            visible: true,
            focused: true,
            container_width: None,
            intrinsic_size: None,
        }
    }

    pub fn id(&self) -> &BlockId {
        &self.id
    }

    pub fn config(&self) -> &BlockConfig {
        &self.config
    }

    pub fn state(&self) -> LoadState {
        self.orchestrator.state()
    }

    pub fn error(&self) -> Option<&BlockError> {
        self.orchestrator.error()
    }

    pub fn resolved_path(&self) -> Option<&str> {
        self.orchestrator.resolved_path()
    }

    pub fn is_loaded(&self) -> bool {
        self.state() == LoadState::Loaded
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Artboard's natural size, once the runtime reported it.
    pub fn intrinsic_size(&self) -> Option<(f32, f32)> {
        self.intrinsic_size
    }

    /// Backend of the current attempt, or the configured one before any.
    pub fn active_backend(&self) -> RendererBackend {
        self.orchestrator
            .attempt()
            .map(|a| a.backend)
            .unwrap_or(self.config.renderer)
    }

    /// Current logical size, after container clamping. Once loaded, the
    /// artboard's intrinsic aspect backs any dimension the block left out.
    pub fn display_box(&self) -> DisplayBox {
        display_box(&self.config, self.intrinsic_size, self.container_width)
    }

    /// Start (or restart) the load and walk as many ladder rungs as
    /// synchronous construction failures allow.
    pub fn launch(
        &mut self,
        note_path: Option<&str>,
        vault: &dyn VaultAdapter,
        cache: &mut BufferCache,
        runtime: &mut dyn RuntimeProvider,
        blobs: &mut BlobStore,
        now: Instant,
    ) {
        self.drop_instance(blobs);
        self.playing = false;
        self.intrinsic_size = None;

        let directive = self
            .orchestrator
            .start(&self.config, note_path, vault, cache, now);
        self.follow(directive, runtime, blobs, now);
    }

    /// One frame of housekeeping: drain instance events, then check the
    /// construction deadline.
    pub fn tick(&mut self, runtime: &mut dyn RuntimeProvider, blobs: &mut BlobStore, now: Instant) {
        let mut events = Vec::new();
        if let Some(instance) = self.instance.as_mut() {
            while let Some(event) = instance.poll_event() {
                events.push(event);
            }
        }

        for event in events {
            match event {
                InstanceEvent::Loaded { intrinsic_size } => self.handle_loaded(intrinsic_size),
                InstanceEvent::Failed { reason } => {
                    let directive = self.orchestrator.on_construct_failed(&reason, now);
                    self.follow(directive, runtime, blobs, now);
                    // Later events belonged to the instance just torn down.
                    break;
                }
            }
        }

        let directive = self.orchestrator.on_tick(now);
        self.follow(directive, runtime, blobs, now);
    }

    /// User intent: run the animation. Ignored until the block is loaded.
    pub fn play(&mut self) {
        if !self.is_loaded() {
            return;
        }
        self.playing = true;
        if let Some(instance) = self.instance.as_mut() {
            // Without render control a hidden block stays paused; playback
            // starts when it scrolls back in.
            if (self.visible && self.focused) || instance.render_control().is_some() {
                instance.play();
            }
        }
    }

    /// User intent: halt the animation. Ignored until the block is loaded.
    pub fn pause(&mut self) {
        if !self.is_loaded() {
            return;
        }
        self.playing = false;
        if let Some(instance) = self.instance.as_mut() {
            instance.pause();
        }
    }

    pub fn toggle(&mut self) {
        if self.playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Rewind to the first frame without reloading the asset.
    pub fn rewind(&mut self) {
        if !self.is_loaded() {
            return;
        }
        if let Some(instance) = self.instance.as_mut() {
            instance.reset();
        }
    }

    /// Rewind and play, clearing any user pause.
    pub fn restart(&mut self) {
        if !self.is_loaded() {
            return;
        }
        self.rewind();
        self.play();
    }

    /// Visibility change from the host's intersection observer. Prefers the
    /// instance's render control; falls back to pause/play while keeping
    /// the logical playback intent.
    pub fn set_visible(&mut self, visible: bool) {
        let before = self.effective_visible();
        self.visible = visible;
        self.apply_effective(before);
    }

    /// Window focus change. A block only renders while its window is
    /// focused and it is in view.
    pub fn set_window_focused(&mut self, focused: bool) {
        let before = self.effective_visible();
        self.focused = focused;
        self.apply_effective(before);
    }

    fn effective_visible(&self) -> bool {
        self.visible && self.focused
    }

    fn apply_effective(&mut self, before: bool) {
        let after = self.effective_visible();
        if before == after || !self.is_loaded() {
            return;
        }
        if after {
            self.resume_rendering();
        } else {
            self.halt_rendering();
        }
    }

    /// Width change from the host's resize observer.
    pub fn set_container_width(&mut self, width: f32) {
        self.container_width = (width.is_finite() && width > 0.0).then_some(width);
    }

    /// Label for the play/pause control.
    pub fn control_label(&self) -> &'static str {
        if self.playing {
            "Pause"
        } else {
            "Play"
        }
    }

    /// Status line for the block's control strip.
    pub fn status_text(&self) -> String {
        match self.state() {
            LoadState::Idle => "Idle".to_string(),
            LoadState::Resolving
            | LoadState::Fetching
            | LoadState::Constructing
            | LoadState::Retrying => "Loading...".to_string(),
            LoadState::Loaded => if self.playing { "Playing" } else { "Paused" }.to_string(),
            LoadState::Error | LoadState::TimedOut => self
                .error()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Failed".to_string()),
        }
    }

    /// Drop the instance, revoke its blob and return the loader to Idle.
    pub fn teardown(&mut self, blobs: &mut BlobStore) {
        self.drop_instance(blobs);
        self.orchestrator.reset();
        self.playing = false;
        self.intrinsic_size = None;
    }

    /// Act on a loader directive, walking further rungs on synchronous
    /// construction failures.
    fn follow(
        &mut self,
        mut directive: Directive,
        runtime: &mut dyn RuntimeProvider,
        blobs: &mut BlobStore,
        now: Instant,
    ) {
        loop {
            match directive {
                Directive::Construct(attempt) => {
                    match self.construct(&attempt, runtime, blobs) {
                        Ok(instance) => {
                            self.instance = Some(instance);
                            break;
                        }
                        Err(err) => {
                            // Unwrap a runtime rejection so the reason is
                            // not wrapped in its own notice text again.
                            let reason = match err.downcast_ref::<BlockError>() {
                                Some(BlockError::Load { reason }) => reason.clone(),
                                Some(other) => other.to_string(),
                                None => err.to_string(),
                            };
                            directive = self.orchestrator.on_construct_failed(&reason, now);
                        }
                    }
                }
                Directive::Wait => break,
                Directive::Fail(_) => {
                    self.drop_instance(blobs);
                    break;
                }
            }
        }
    }

    fn construct(
        &mut self,
        attempt: &Attempt,
        runtime: &mut dyn RuntimeProvider,
        blobs: &mut BlobStore,
    ) -> anyhow::Result<Box<dyn AnimationInstance>> {
        self.drop_instance(blobs);

        let bytes = self
            .orchestrator
            .bytes()
            .ok_or_else(|| anyhow::anyhow!("No bytes fetched for {}", self.id))?;

        let delivery = match attempt.delivery {
            DeliveryKind::Buffer => AssetDelivery::Buffer(bytes),
            DeliveryKind::Blob => {
                let blob = blobs.register(bytes);
                self.blob = Some(blob.clone());
                AssetDelivery::Blob(blob)
            }
        };

        let spec = InstanceSpec {
            delivery,
            autoplay: self.config.autoplay,
            loop_animation: self.config.loop_animation,
            artboard: self.config.artboard.clone(),
            state_machines: self.config.state_machines.clone(),
            animations: self.config.animations.clone(),
            layout: self.config.layout(),
        };

        let module = runtime.acquire(attempt.backend)?;
        let instance = module.construct(spec)?;
        Ok(instance)
    }

    fn handle_loaded(&mut self, intrinsic_size: Option<(f32, f32)>) {
        if self.orchestrator.state() != LoadState::Constructing {
            return;
        }
        self.orchestrator.on_loaded();
        self.intrinsic_size = intrinsic_size;
        self.playing = self.config.autoplay;
        if !self.effective_visible() {
            self.halt_rendering();
        }
    }

    fn halt_rendering(&mut self) {
        let Some(instance) = self.instance.as_mut() else {
            return;
        };
        match instance.render_control() {
            Some(control) => control.stop_rendering(),
            None => {
                if self.playing {
                    instance.pause();
                }
            }
        }
    }

    fn resume_rendering(&mut self) {
        let Some(instance) = self.instance.as_mut() else {
            return;
        };
        match instance.render_control() {
            Some(control) => control.start_rendering(),
            None => {
                if self.playing {
                    instance.play();
                }
            }
        }
    }

    fn drop_instance(&mut self, blobs: &mut BlobStore) {
        if let Some(blob) = self.blob.take() {
            blobs.revoke(&blob);
        }
        self.instance = None;
    }
}
