//! Host event translation.
//!
//! The adapter owns no business logic: it maps the host's lifecycle
//! callbacks one-to-one onto bridge transitions, synchronously and in
//! delivery order. It never reorders or coalesces events, and `dispatch`
//! does not return until the corresponding bridge work is done.

use std::fmt;

use crate::bridge::{BridgeError, EngineBridge};
use crate::paths::HostContext;

/// A host lifecycle callback, as delivered.
pub enum HostEvent<'a> {
    Create(&'a dyn HostContext),
    Pause,
    Resume,
    SurfaceCreated,
    SurfaceChanged { width: u32, height: u32 },
    SurfaceDestroyed,
    Destroy,
}

impl fmt::Debug for HostEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create(_) => f.write_str("Create"),
            Self::Pause => f.write_str("Pause"),
            Self::Resume => f.write_str("Resume"),
            Self::SurfaceCreated => f.write_str("SurfaceCreated"),
            Self::SurfaceChanged { width, height } => {
                write!(f, "SurfaceChanged({width}x{height})")
            }
            Self::SurfaceDestroyed => f.write_str("SurfaceDestroyed"),
            Self::Destroy => f.write_str("Destroy"),
        }
    }
}

/// Translates host callbacks into bridge transitions.
pub struct LifecycleAdapter {
    bridge: EngineBridge,
}

impl LifecycleAdapter {
    pub fn new(bridge: EngineBridge) -> Self {
        Self { bridge }
    }

    pub fn bridge(&self) -> &EngineBridge {
        &self.bridge
    }

    /// Forwards one host event. Only `Create` can fail, and only
    /// unrecoverably; everything else is absorbed by the bridge.
    pub fn dispatch(&mut self, event: HostEvent<'_>) -> Result<(), BridgeError> {
        log::debug!("host event: {event:?}");
        match event {
            HostEvent::Create(ctx) => self.bridge.on_create(ctx)?,
            HostEvent::Pause => self.bridge.on_pause(),
            HostEvent::Resume => self.bridge.on_resume(),
            HostEvent::SurfaceCreated => self.bridge.on_surface_created(),
            HostEvent::SurfaceChanged { width, height } => {
                self.bridge.on_surface_changed(width, height);
            }
            HostEvent::SurfaceDestroyed => self.bridge.on_surface_destroyed(),
            HostEvent::Destroy => self.bridge.on_destroy(),
        }
        Ok(())
    }
}
