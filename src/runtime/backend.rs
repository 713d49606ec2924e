//! Rendering-backend acquisition
//!
//! A backend module (canvas, webgl or webgl2) is acquired on first use and
//! cached so repeated blocks do not reload it. The provider itself is
//! host-supplied; this module only fixes the contract and the caching
//! wrapper.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::BlockError;
use crate::runtime::instance::{AnimationInstance, InstanceSpec};

/// The rendering technology used to draw an animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererBackend {
    #[default]
    Canvas,
    Webgl,
    Webgl2,
}

impl RendererBackend {
    /// Parse a config value. Unknown names yield `None` (permissive parsing).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "canvas" => Some(RendererBackend::Canvas),
            "webgl" => Some(RendererBackend::Webgl),
            "webgl2" => Some(RendererBackend::Webgl2),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RendererBackend::Canvas => "canvas",
            RendererBackend::Webgl => "webgl",
            RendererBackend::Webgl2 => "webgl2",
        }
    }
}

impl fmt::Display for RendererBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A loaded runtime module for one backend.
pub trait RuntimeModule {
    fn backend(&self) -> RendererBackend;

    /// Construct an instance. A synchronous rejection maps straight into the
    /// fallback ladder; an accepted construction reports its real outcome
    /// later through [`AnimationInstance::poll_event`].
    fn construct(&self, spec: InstanceSpec) -> Result<Box<dyn AnimationInstance>, BlockError>;
}

/// Host-supplied source of runtime modules. Acquisition may be expensive
/// (dynamic load); callers go through [`CachingRuntime`] so it happens once
/// per backend.
pub trait RuntimeProvider {
    fn acquire(&mut self, backend: RendererBackend) -> Result<Rc<dyn RuntimeModule>>;
}

impl<T: RuntimeProvider + ?Sized> RuntimeProvider for Box<T> {
    fn acquire(&mut self, backend: RendererBackend) -> Result<Rc<dyn RuntimeModule>> {
        (**self).acquire(backend)
    }
}

/// Per-backend module cache in front of a provider.
pub struct CachingRuntime<P: RuntimeProvider> {
    inner: P,
    modules: HashMap<RendererBackend, Rc<dyn RuntimeModule>>,
}

impl<P: RuntimeProvider> CachingRuntime<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            modules: HashMap::new(),
        }
    }

    /// Backends acquired so far.
    pub fn cached_backends(&self) -> Vec<RendererBackend> {
        self.modules.keys().copied().collect()
    }
}

impl<P: RuntimeProvider> RuntimeProvider for CachingRuntime<P> {
    fn acquire(&mut self, backend: RendererBackend) -> Result<Rc<dyn RuntimeModule>> {
        if let Some(module) = self.modules.get(&backend) {
            return Ok(Rc::clone(module));
        }
        let module = self.inner.acquire(backend)?;
        tracing::debug!("Acquired runtime module: {}", backend);
        self.modules.insert(backend, Rc::clone(&module));
        Ok(module)
    }
}
