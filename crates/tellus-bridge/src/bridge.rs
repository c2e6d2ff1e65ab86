//! The engine lifecycle state machine.
//!
//! `EngineBridge` is the sole caller into the native engine. It sequences
//! module load, data-path injection, surface-bound init, frame production,
//! pause/resume, and teardown, and it absorbs the benign event races a
//! host can deliver: stale surface events are ignored silently, duplicate
//! teardown is a no-op. Only two conditions cross back to the host as
//! errors, a fatal module-load failure and a path-resolution failure;
//! neither leaves the bridge in a usable state.
//!
//! Phases: `Uninitialized → Loading → Ready ⇄ Paused → Destroyed`.
//! `Destroyed` is terminal.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::{EngineHandle, NativeEngine};
use crate::loader::{EngineLoader, EngineModules, FatalLoadError, LibraryLoader, LoadResult};
use crate::paths::{DataPaths, HostContext, PathResolutionError, resolve_data_paths};
use crate::surface::{SurfaceHost, SurfaceState};

/// Coarse bridge state.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LifecyclePhase {
    Uninitialized,
    Loading,
    Ready,
    Paused,
    Destroyed,
}

/// Unrecoverable startup failure, surfaced to the host.
#[derive(Debug)]
pub enum BridgeError {
    FatalLoad(FatalLoadError),
    PathResolution(PathResolutionError),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FatalLoad(e) => write!(f, "engine startup aborted: {e}"),
            Self::PathResolution(e) => write!(f, "engine startup aborted: {e}"),
        }
    }
}

impl std::error::Error for BridgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FatalLoad(e) => Some(e),
            Self::PathResolution(e) => Some(e),
        }
    }
}

impl From<FatalLoadError> for BridgeError {
    fn from(e: FatalLoadError) -> Self {
        Self::FatalLoad(e)
    }
}

impl From<PathResolutionError> for BridgeError {
    fn from(e: PathResolutionError) -> Self {
        Self::PathResolution(e)
    }
}

/// Supervisor for one native engine instance.
///
/// All methods run on the host's lifecycle context and return only when
/// the corresponding engine work is done; the host may rely on that
/// ordering (e.g. a returned `on_pause` means the frame loop is quiesced).
pub struct EngineBridge {
    modules: EngineModules,
    loader: Box<dyn EngineLoader>,
    surface: SurfaceHost,
    phase: LifecyclePhase,
    engine: Option<Arc<dyn NativeEngine>>,
    handle: Option<EngineHandle>,
    paths: Option<DataPaths>,
    /// A size change arrived while `Paused` and still owes the engine a
    /// viewport update.
    deferred_resize: bool,
}

impl EngineBridge {
    /// Bridge over the real dynamic-library loader.
    pub fn new(modules: EngineModules) -> Self {
        Self::with_loader(modules, Box::new(LibraryLoader))
    }

    /// Bridge over a caller-supplied loader (tests, host simulators).
    pub fn with_loader(modules: EngineModules, loader: Box<dyn EngineLoader>) -> Self {
        Self {
            modules,
            loader,
            surface: SurfaceHost::new(),
            phase: LifecyclePhase::Uninitialized,
            engine: None,
            handle: None,
            paths: None,
            deferred_resize: false,
        }
    }

    /// Overrides the render loop's frame pacing interval.
    pub fn with_frame_interval(mut self, frame_interval: Duration) -> Self {
        self.surface = SurfaceHost::with_frame_interval(frame_interval);
        self
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub fn surface_state(&self) -> SurfaceState {
        self.surface.state()
    }

    /// Host "create". Loads the engine module chain and resolves the data
    /// paths. The bridge then waits in `Loading` for the first surface.
    ///
    /// On either failure the bridge moves to `Destroyed` before the error
    /// is re-signaled, so no later callback can reach the engine. The host
    /// cannot continue in a usable state and is expected to terminate.
    pub fn on_create(&mut self, ctx: &dyn HostContext) -> Result<(), BridgeError> {
        if self.phase != LifecyclePhase::Uninitialized {
            log::warn!("create delivered in phase {:?}; ignored", self.phase);
            return Ok(());
        }
        self.phase = LifecyclePhase::Loading;

        let engine = match self.loader.load(&self.modules) {
            LoadResult::Success(engine) => engine,
            LoadResult::Recoverable(engine, warnings) => {
                for warning in &warnings {
                    log::warn!("continuing without optional module '{}'", warning.module);
                }
                engine
            }
            LoadResult::Fatal(e) => {
                self.phase = LifecyclePhase::Destroyed;
                return Err(e.into());
            }
        };

        let paths = match resolve_data_paths(ctx) {
            Ok(paths) => paths,
            Err(e) => {
                self.phase = LifecyclePhase::Destroyed;
                return Err(e.into());
            }
        };

        log::info!(
            "engine loaded; data roots {} / {}",
            paths.writable_dir.display(),
            paths.packaged_resource_dir.display()
        );
        self.engine = Some(engine);
        self.paths = Some(paths);
        Ok(())
    }

    /// Host "surface created".
    ///
    /// The first surface while `Loading` completes startup: paths are
    /// injected, the engine is initialized, and frame production begins.
    /// A later surface (after the old one was lost) only re-arms frames.
    pub fn on_surface_created(&mut self) {
        match self.phase {
            LifecyclePhase::Loading => {
                self.surface.mark_created();
                self.init_engine();
            }
            LifecyclePhase::Ready => {
                self.surface.mark_created();
                self.surface.run();
            }
            LifecyclePhase::Paused => {
                // Frames stay suspended until resume.
                self.surface.mark_created();
            }
            LifecyclePhase::Uninitialized | LifecyclePhase::Destroyed => {
                log::debug!("stale surface-created event ignored");
            }
        }
    }

    /// Host "surface changed". Forwards a viewport update when the
    /// dimensions actually changed. Native calls are only legal while
    /// `Ready`, so a change delivered while `Paused` is recorded and the
    /// update is deferred until resume.
    pub fn on_surface_changed(&mut self, width: u32, height: u32) {
        if !matches!(self.phase, LifecyclePhase::Ready | LifecyclePhase::Paused) {
            log::debug!("stale surface-changed event ignored");
            return;
        }
        if !self.surface.mark_sized(width, height) {
            return;
        }
        match self.phase {
            LifecyclePhase::Ready => self.surface.resize(width, height),
            _ => self.deferred_resize = true,
        }
    }

    /// Host "surface destroyed". Returns only once the render loop can no
    /// longer touch the drawable; the host may then reclaim it.
    pub fn on_surface_destroyed(&mut self) {
        if self.phase == LifecyclePhase::Destroyed {
            log::debug!("stale surface-destroyed event ignored");
            return;
        }
        self.surface.mark_destroyed();
    }

    /// Host "pause". Quiesces the frame loop, then notifies the engine.
    /// Forwarded at most once per host event, synchronously.
    pub fn on_pause(&mut self) {
        if self.phase != LifecyclePhase::Ready {
            log::debug!("pause delivered in phase {:?}; ignored", self.phase);
            return;
        }
        self.surface.pause();
        if let Some(handle) = &self.handle {
            handle.engine.on_pause();
        }
        self.phase = LifecyclePhase::Paused;
    }

    /// Host "resume". Notifies the engine and re-enters `Ready`. A size
    /// change that arrived while `Paused` is flushed to the engine now,
    /// before frames restart. Frame production restarts only if the
    /// surface is still valid; after a surface loss it waits for the next
    /// surface-created event.
    pub fn on_resume(&mut self) {
        if self.phase != LifecyclePhase::Paused {
            log::debug!("resume delivered in phase {:?}; ignored", self.phase);
            return;
        }
        if let Some(handle) = &self.handle {
            handle.engine.on_resume();
        }
        self.phase = LifecyclePhase::Ready;
        if self.deferred_resize {
            // The recorded size belongs to the current surface only; a
            // surface lost while paused gets sized again on creation.
            if let SurfaceState::Sized { width, height } = self.surface.state() {
                self.surface.resize(width, height);
            }
            self.deferred_resize = false;
        }
        if self.surface.state().is_renderable() {
            self.surface.run();
        }
    }

    /// Host teardown. Stops frame production, shuts the engine down, and
    /// invalidates everything. Terminal; duplicate deliveries are no-ops
    /// (hosts do send them).
    pub fn on_destroy(&mut self) {
        if self.phase == LifecyclePhase::Destroyed {
            log::debug!("duplicate teardown ignored");
            return;
        }
        self.surface.shutdown();
        if let Some(handle) = self.handle.take() {
            handle.engine.shutdown();
        }
        self.engine = None;
        self.paths = None;
        self.phase = LifecyclePhase::Destroyed;
        log::info!("engine bridge destroyed");
    }

    /// `Loading → Ready`. Requires a loaded engine, resolved paths, and a
    /// created surface; issues `set_data_file_path` then `init`, exactly
    /// once each, in that order.
    fn init_engine(&mut self) {
        let (Some(engine), Some(paths)) = (self.engine.as_ref(), self.paths.as_ref()) else {
            log::error!("surface arrived while Loading without engine or paths");
            return;
        };

        engine.set_data_file_path(paths);
        engine.init();

        let engine = engine.clone();
        self.handle = Some(EngineHandle {
            engine: engine.clone(),
        });
        self.surface.start(engine);
        self.surface.run();
        self.phase = LifecyclePhase::Ready;
        log::info!("engine initialized; frame production started");
    }
}
