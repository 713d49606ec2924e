//! Load orchestration
//!
//! Loading a block is a small state machine: resolve the asset path, fetch
//! bytes through the cache, then construct a runtime instance. Construction
//! is the only step that can dawdle or fail asynchronously, so it runs under
//! a deadline and a bounded retry ladder: one retry with blob delivery on
//! the same backend, then one retry on the canvas backend when the block
//! asked for something else. The orchestrator never talks to the runtime
//! itself; it hands out [`Directive`]s and is fed events and ticks back.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::cache::BufferCache;
use crate::core::config::BlockConfig;
use crate::core::vault::{resolve_block_src, VaultAdapter};
use crate::error::BlockError;
use crate::runtime::backend::RendererBackend;
use crate::runtime::instance::DeliveryKind;

/// How long one construction attempt may run before the loader intervenes.
pub const LOAD_TIMEOUT: Duration = Duration::from_secs(8);

/// Where a block is in its load lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Resolving,
    Fetching,
    Constructing,
    Loaded,
    /// Between a failed attempt and the next one.
    Retrying,
    Error,
    TimedOut,
}

impl LoadState {
    /// Every transition the loader may take. Anything else is refused.
    const TRANSITIONS: &'static [(LoadState, LoadState)] = &[
        (Self::Idle, Self::Resolving),
        (Self::Resolving, Self::Fetching),
        (Self::Resolving, Self::Error),
        (Self::Fetching, Self::Constructing),
        (Self::Fetching, Self::Error),
        (Self::Constructing, Self::Loaded),
        (Self::Constructing, Self::Retrying),
        (Self::Constructing, Self::Error),
        (Self::Constructing, Self::TimedOut),
        (Self::Retrying, Self::Constructing),
        // Reset edges: restart and teardown return every live state to Idle.
        (Self::Resolving, Self::Idle),
        (Self::Fetching, Self::Idle),
        (Self::Constructing, Self::Idle),
        (Self::Retrying, Self::Idle),
        (Self::Loaded, Self::Idle),
        (Self::Error, Self::Idle),
        (Self::TimedOut, Self::Idle),
    ];

    pub fn can_transition(from: Self, to: Self) -> bool {
        Self::TRANSITIONS.iter().any(|&(f, t)| f == from && t == to)
    }

    /// Error and TimedOut are final until a restart.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Error | Self::TimedOut)
    }

    /// Settled states no longer react to events or ticks.
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Loaded) || self.is_terminal()
    }
}

/// One construction attempt on the retry ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub backend: RendererBackend,
    pub delivery: DeliveryKind,
    /// 1-based position on the ladder.
    pub number: u32,
}

/// What the orchestrator wants its caller to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Construct an instance for this attempt.
    Construct(Attempt),
    /// Nothing until the next event or tick.
    Wait,
    /// Give up; the error is final.
    Fail(BlockError),
}

/// Drives one block through resolve, fetch, construct and the retry ladder.
pub struct LoadOrchestrator {
    state: LoadState,
    requested: RendererBackend,
    resolved_path: Option<String>,
    bytes: Option<Arc<Vec<u8>>>,
    attempt: Option<Attempt>,
    deadline: Option<Instant>,
    blob_retry_used: bool,
    canvas_retry_used: bool,
    error: Option<BlockError>,
}

impl Default for LoadOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadOrchestrator {
    pub fn new() -> Self {
        Self {
            state: LoadState::Idle,
            requested: RendererBackend::Canvas,
            resolved_path: None,
            bytes: None,
            attempt: None,
            deadline: None,
            blob_retry_used: false,
            canvas_retry_used: false,
            error: None,
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Final error, present exactly when the state is terminal.
    pub fn error(&self) -> Option<&BlockError> {
        self.error.as_ref()
    }

    pub fn resolved_path(&self) -> Option<&str> {
        self.resolved_path.as_deref()
    }

    /// Fetched asset bytes, available from Constructing onward.
    pub fn bytes(&self) -> Option<Arc<Vec<u8>>> {
        self.bytes.clone()
    }

    pub fn attempt(&self) -> Option<&Attempt> {
        self.attempt.as_ref()
    }

    /// Run the synchronous half of the pipeline: resolve the path, fetch
    /// bytes through the cache, and line up the first construction attempt.
    /// Calling this on a non-idle loader restarts it.
    pub fn start(
        &mut self,
        config: &BlockConfig,
        note_path: Option<&str>,
        vault: &dyn VaultAdapter,
        cache: &mut BufferCache,
        now: Instant,
    ) -> Directive {
        self.reset();
        self.transition(LoadState::Resolving);

        if config.src.trim().is_empty() {
            return self.fail(BlockError::MissingSrc);
        }

        let path = resolve_block_src(config, note_path);
        tracing::debug!("Resolved rive src {:?} -> {:?}", config.src, path);
        if !vault.exists(&path) {
            return self.fail(BlockError::NotFound { path });
        }
        self.resolved_path = Some(path.clone());

        self.transition(LoadState::Fetching);
        let bytes = match cache.fetch(vault, &path) {
            Ok(bytes) => bytes,
            Err(err) => {
                return self.fail(BlockError::Load {
                    reason: err.to_string(),
                })
            }
        };
        self.bytes = Some(bytes);

        self.requested = config.renderer;
        let first = Attempt {
            backend: config.renderer,
            delivery: DeliveryKind::Buffer,
            number: 1,
        };
        self.begin_attempt(first, now)
    }

    /// A construction attempt reported failure, synchronously or through a
    /// later event. Stale reports after the loader settled are ignored.
    pub fn on_construct_failed(&mut self, reason: &str, now: Instant) -> Directive {
        if self.state != LoadState::Constructing {
            return Directive::Wait;
        }

        match self.next_rung(false) {
            Some(attempt) => {
                tracing::warn!(
                    "Rive construct failed ({}), retrying via {} with {:?} delivery",
                    reason,
                    attempt.backend,
                    attempt.delivery
                );
                self.transition(LoadState::Retrying);
                self.begin_attempt(attempt, now)
            }
            None => self.fail(BlockError::Load {
                reason: reason.to_string(),
            }),
        }
    }

    /// The current attempt produced a live instance.
    pub fn on_loaded(&mut self) -> Directive {
        if self.state != LoadState::Constructing {
            return Directive::Wait;
        }
        self.transition(LoadState::Loaded);
        self.deadline = None;
        tracing::info!(
            "Rive loaded: {}",
            self.resolved_path.as_deref().unwrap_or_default()
        );
        Directive::Wait
    }

    /// Deadline check. A timeout skips straight to the canvas rung when one
    /// is left, with a fresh deadline; otherwise it is final.
    pub fn on_tick(&mut self, now: Instant) -> Directive {
        if self.state != LoadState::Constructing {
            return Directive::Wait;
        }
        match self.deadline {
            Some(deadline) if now >= deadline => {}
            _ => return Directive::Wait,
        }

        match self.next_rung(true) {
            Some(attempt) => {
                tracing::warn!(
                    "Rive load exceeded {:?}, retrying via {}",
                    LOAD_TIMEOUT,
                    attempt.backend
                );
                self.transition(LoadState::Retrying);
                self.begin_attempt(attempt, now)
            }
            None => self.fail(BlockError::Timeout),
        }
    }

    /// Back to Idle, dropping bytes, attempt bookkeeping and any error.
    pub fn reset(&mut self) {
        if self.state != LoadState::Idle {
            self.transition(LoadState::Idle);
        }
        self.resolved_path = None;
        self.bytes = None;
        self.attempt = None;
        self.deadline = None;
        self.blob_retry_used = false;
        self.canvas_retry_used = false;
        self.error = None;
    }

    /// Next attempt on the ladder: blob delivery on the same backend first,
    /// then the canvas backend. Timeouts skip the blob rung.
    fn next_rung(&mut self, timed_out: bool) -> Option<Attempt> {
        let number = self.attempt.as_ref().map(|a| a.number).unwrap_or(0) + 1;

        if !self.blob_retry_used && !timed_out {
            self.blob_retry_used = true;
            let backend = self
                .attempt
                .as_ref()
                .map(|a| a.backend)
                .unwrap_or(self.requested);
            return Some(Attempt {
                backend,
                delivery: DeliveryKind::Blob,
                number,
            });
        }

        if self.requested != RendererBackend::Canvas && !self.canvas_retry_used {
            // The canvas rung swaps only the backend; whatever delivery the
            // failed attempt used is kept. It also closes the ladder: a
            // failure after it settles the load.
            self.blob_retry_used = true;
            self.canvas_retry_used = true;
            let delivery = self
                .attempt
                .as_ref()
                .map(|a| a.delivery)
                .unwrap_or(DeliveryKind::Buffer);
            return Some(Attempt {
                backend: RendererBackend::Canvas,
                delivery,
                number,
            });
        }

        None
    }

    fn begin_attempt(&mut self, attempt: Attempt, now: Instant) -> Directive {
        self.transition(LoadState::Constructing);
        self.deadline = Some(now + LOAD_TIMEOUT);
        self.attempt = Some(attempt.clone());
        tracing::debug!(
            "Constructing rive instance: {} via {} (attempt {})",
            self.resolved_path.as_deref().unwrap_or_default(),
            attempt.backend,
            attempt.number
        );
        Directive::Construct(attempt)
    }

    fn fail(&mut self, error: BlockError) -> Directive {
        let to = if error == BlockError::Timeout {
            LoadState::TimedOut
        } else {
            LoadState::Error
        };
        self.transition(to);
        self.deadline = None;
        self.attempt = None;
        tracing::error!("Rive load failed: {}", error);
        self.error = Some(error.clone());
        Directive::Fail(error)
    }

    fn transition(&mut self, to: LoadState) {
        if !LoadState::can_transition(self.state, to) {
            debug_assert!(false, "invalid transition {:?} -> {:?}", self.state, to);
            tracing::warn!("Refused load state transition {:?} -> {:?}", self.state, to);
            return;
        }
        tracing::trace!("Load state {:?} -> {:?}", self.state, to);
        self.state = to;
    }
}
