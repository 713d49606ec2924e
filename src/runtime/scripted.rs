//! Scripted runtime
//!
//! A runtime provider that renders nothing: each construction consumes the
//! next scripted outcome and every playback call lands in a shared log. The
//! test suites drive the whole load ladder with it, and a headless host can
//! use it to exercise block plumbing without a real renderer. Handles are
//! shared, so a clone kept outside keeps scripting a provider that was
//! handed off.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use anyhow::Result;

use crate::error::BlockError;
use crate::runtime::backend::{RendererBackend, RuntimeModule, RuntimeProvider};
use crate::runtime::instance::{
    AnimationInstance, DeliveryKind, InstanceEvent, InstanceSpec, RenderControl,
};

/// What the next construction should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedOutcome {
    /// Construction succeeds; the instance reports Loaded on its next poll.
    Load,
    /// Construction returns an error immediately.
    RejectConstruct,
    /// Construction succeeds; the instance reports Failed on its next poll.
    RejectAsync,
    /// Construction succeeds; the instance never reports anything.
    Hang,
}

/// One construction attempt as the runtime saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructRecord {
    pub backend: RendererBackend,
    pub delivery: DeliveryKind,
}

#[derive(Default)]
struct Shared {
    outcomes: RefCell<VecDeque<ScriptedOutcome>>,
    constructs: RefCell<Vec<ConstructRecord>>,
    actions: RefCell<Vec<String>>,
    render_control: Cell<bool>,
    intrinsic_size: Cell<Option<(f32, f32)>>,
}

/// Scripted [`RuntimeProvider`].
#[derive(Clone, Default)]
pub struct ScriptedRuntime {
    shared: Rc<Shared>,
}

impl ScriptedRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instances expose render control (suspend/resume) when enabled.
    pub fn with_render_control(self) -> Self {
        self.shared.render_control.set(true);
        self
    }

    /// Loaded events carry this artboard size.
    pub fn with_intrinsic_size(self, width: f32, height: f32) -> Self {
        self.shared.intrinsic_size.set(Some((width, height)));
        self
    }

    /// Queue the outcome for the next construction. Constructions beyond
    /// the queue simply load.
    pub fn script(&self, outcome: ScriptedOutcome) {
        self.shared.outcomes.borrow_mut().push_back(outcome);
    }

    /// Every construction attempt seen so far, in order.
    pub fn constructs(&self) -> Vec<ConstructRecord> {
        self.shared.constructs.borrow().clone()
    }

    /// Every playback call any instance received, in order.
    pub fn actions(&self) -> Vec<String> {
        self.shared.actions.borrow().clone()
    }

    pub fn clear_actions(&self) {
        self.shared.actions.borrow_mut().clear();
    }
}

impl RuntimeProvider for ScriptedRuntime {
    fn acquire(&mut self, backend: RendererBackend) -> Result<Rc<dyn RuntimeModule>> {
        Ok(Rc::new(ScriptedModule {
            backend,
            shared: self.shared.clone(),
        }))
    }
}

struct ScriptedModule {
    backend: RendererBackend,
    shared: Rc<Shared>,
}

impl RuntimeModule for ScriptedModule {
    fn backend(&self) -> RendererBackend {
        self.backend
    }

    fn construct(&self, spec: InstanceSpec) -> Result<Box<dyn AnimationInstance>, BlockError> {
        self.shared.constructs.borrow_mut().push(ConstructRecord {
            backend: self.backend,
            delivery: spec.delivery.kind(),
        });

        let outcome = self
            .shared
            .outcomes
            .borrow_mut()
            .pop_front()
            .unwrap_or(ScriptedOutcome::Load);

        match outcome {
            ScriptedOutcome::RejectConstruct => Err(BlockError::Load {
                reason: "scripted rejection".to_string(),
            }),
            ScriptedOutcome::Load => Ok(Box::new(ScriptedInstance {
                pending: Some(InstanceEvent::Loaded {
                    intrinsic_size: self.shared.intrinsic_size.get(),
                }),
                shared: self.shared.clone(),
            })),
            ScriptedOutcome::RejectAsync => Ok(Box::new(ScriptedInstance {
                pending: Some(InstanceEvent::Failed {
                    reason: "scripted async failure".to_string(),
                }),
                shared: self.shared.clone(),
            })),
            ScriptedOutcome::Hang => Ok(Box::new(ScriptedInstance {
                pending: None,
                shared: self.shared.clone(),
            })),
        }
    }
}

struct ScriptedInstance {
    pending: Option<InstanceEvent>,
    shared: Rc<Shared>,
}

impl ScriptedInstance {
    fn record(&self, action: &str) {
        self.shared.actions.borrow_mut().push(action.to_string());
    }
}

impl AnimationInstance for ScriptedInstance {
    fn play(&mut self) {
        self.record("play");
    }
    fn pause(&mut self) {
        self.record("pause");
    }
    fn reset(&mut self) {
        self.record("reset");
    }
    fn poll_event(&mut self) -> Option<InstanceEvent> {
        self.pending.take()
    }
    fn render_control(&mut self) -> Option<&mut dyn RenderControl> {
        self.shared
            .render_control
            .get()
            .then_some(self as &mut dyn RenderControl)
    }
}

impl RenderControl for ScriptedInstance {
    fn stop_rendering(&mut self) {
        self.record("stop-rendering");
    }
    fn start_rendering(&mut self) {
        self.record("start-rendering");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::instance::{AssetDelivery, Layout};
    use std::sync::Arc;

    fn spec() -> InstanceSpec {
        InstanceSpec {
            delivery: AssetDelivery::Buffer(Arc::new(b"riv".to_vec())),
            autoplay: true,
            loop_animation: true,
            artboard: None,
            state_machines: Vec::new(),
            animations: Vec::new(),
            layout: Layout::default(),
        }
    }

    #[test]
    fn unscripted_constructions_load() {
        let mut runtime = ScriptedRuntime::new().with_intrinsic_size(64.0, 32.0);
        let module = runtime.acquire(RendererBackend::Canvas).unwrap();
        let mut instance = module.construct(spec()).unwrap();

        assert_eq!(
            instance.poll_event(),
            Some(InstanceEvent::Loaded {
                intrinsic_size: Some((64.0, 32.0))
            })
        );
        assert_eq!(instance.poll_event(), None);
    }

    #[test]
    fn scripted_outcomes_are_consumed_in_order() {
        let runtime = ScriptedRuntime::new();
        runtime.script(ScriptedOutcome::RejectConstruct);
        runtime.script(ScriptedOutcome::Hang);

        let mut handle = runtime.clone();
        let module = handle.acquire(RendererBackend::Webgl).unwrap();
        assert!(module.construct(spec()).is_err());

        let mut hung = module.construct(spec()).unwrap();
        assert_eq!(hung.poll_event(), None);

        let mut loaded = module.construct(spec()).unwrap();
        assert!(matches!(
            loaded.poll_event(),
            Some(InstanceEvent::Loaded { .. })
        ));

        let records = runtime.constructs();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].backend, RendererBackend::Webgl);
    }

    #[test]
    fn playback_calls_land_in_the_shared_log() {
        let mut runtime = ScriptedRuntime::new();
        let module = runtime.acquire(RendererBackend::Canvas).unwrap();
        let mut instance = module.construct(spec()).unwrap();

        instance.play();
        instance.pause();
        instance.reset();
        assert_eq!(runtime.actions(), ["play", "pause", "reset"]);
    }
}
