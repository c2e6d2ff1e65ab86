//! Surface ownership and the render context.
//!
//! `SurfaceHost` owns the GPU-backed drawable and the dedicated thread
//! that produces frames into it. The host's lifecycle context never
//! produces frames; it only sends control messages. Pause and
//! surface-destroyed are handshakes: the sending side blocks until the
//! render loop acknowledges, so the loop is provably quiesced before the
//! host proceeds to reclaim or tear down resources.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};

use crate::engine::NativeEngine;

/// Surface lifecycle as delivered by the host.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceState {
    /// No surface has been provided yet.
    Absent,
    /// A drawable exists but has not reported dimensions.
    Created,
    /// A drawable exists with known dimensions.
    Sized { width: u32, height: u32 },
    /// The drawable was reclaimed by the host.
    Destroyed,
}

impl SurfaceState {
    /// True when a frame may legally target the surface.
    pub fn is_renderable(self) -> bool {
        matches!(self, Self::Created | Self::Sized { .. })
    }
}

enum Command {
    /// Start (or restart) frame production. Sent only while the bridge
    /// holds a live surface, so this also re-arms a loop that saw the
    /// previous surface go away.
    Run,
    /// Stop frame production; reply once the loop has quiesced.
    Pause(Sender<()>),
    /// Forward new surface dimensions to the engine.
    Resize { width: u32, height: u32 },
    /// The surface is going away; reply once no frame can touch it.
    SurfaceLost(Sender<()>),
    /// Tear the render thread down; reply just before it exits.
    Shutdown(Sender<()>),
}

/// Owner of the drawable surface and the frame-producing thread.
///
/// All mutation happens on the host lifecycle context, driven by the
/// bridge; the render thread only ever reads what the commands tell it.
pub struct SurfaceHost {
    state: SurfaceState,
    frame_interval: Duration,
    commands: Option<Sender<Command>>,
    worker: Option<JoinHandle<()>>,
}

impl SurfaceHost {
    pub fn new() -> Self {
        Self::with_frame_interval(Duration::from_millis(16))
    }

    /// Creates a host with a custom frame pacing interval.
    pub fn with_frame_interval(frame_interval: Duration) -> Self {
        Self {
            state: SurfaceState::Absent,
            frame_interval,
            commands: None,
            worker: None,
        }
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    pub(crate) fn mark_created(&mut self) {
        self.state = SurfaceState::Created;
    }

    /// Records new dimensions. Returns false (and records nothing) for a
    /// repeat of the current dimensions or for a surface that does not
    /// exist, so repeated identical change events stay idempotent.
    pub(crate) fn mark_sized(&mut self, width: u32, height: u32) -> bool {
        let sized = SurfaceState::Sized { width, height };
        if self.state == sized {
            return false;
        }
        match self.state {
            SurfaceState::Created | SurfaceState::Sized { .. } => {
                self.state = sized;
                true
            }
            SurfaceState::Absent | SurfaceState::Destroyed => {
                log::debug!("ignoring size change for a surface that does not exist");
                false
            }
        }
    }

    /// Records surface destruction and waits for the render loop to
    /// acknowledge. On return, no frame or resize can touch the old
    /// drawable; the host is free to reclaim it.
    pub(crate) fn mark_destroyed(&mut self) {
        self.state = SurfaceState::Destroyed;
        if let Some(commands) = &self.commands {
            let (ack_tx, ack_rx) = bounded(1);
            if commands.send(Command::SurfaceLost(ack_tx)).is_ok() {
                let _ = ack_rx.recv();
            }
        }
    }

    /// Spawns the render thread, initially idle. No-op if already running.
    pub(crate) fn start(&mut self, engine: Arc<dyn NativeEngine>) {
        if self.worker.is_some() {
            return;
        }

        let (tx, rx) = unbounded();
        let frame_interval = self.frame_interval;
        let spawned = thread::Builder::new()
            .name("tellus-render".to_string())
            .spawn(move || render_loop(&*engine, &rx, frame_interval));

        match spawned {
            Ok(worker) => {
                self.worker = Some(worker);
                self.commands = Some(tx);
            }
            Err(e) => log::error!("failed to spawn render thread: {e}"),
        }
    }

    pub(crate) fn run(&self) {
        if let Some(commands) = &self.commands {
            let _ = commands.send(Command::Run);
        }
    }

    /// Suspends frame production. Blocks until the loop has quiesced; an
    /// in-flight frame is allowed to finish first (cooperative, not a
    /// forced interrupt).
    pub(crate) fn pause(&self) {
        if let Some(commands) = &self.commands {
            let (ack_tx, ack_rx) = bounded(1);
            if commands.send(Command::Pause(ack_tx)).is_ok() {
                let _ = ack_rx.recv();
            }
        }
    }

    pub(crate) fn resize(&self, width: u32, height: u32) {
        if let Some(commands) = &self.commands {
            let _ = commands.send(Command::Resize { width, height });
        }
    }

    /// Stops and joins the render thread, then forgets the surface.
    pub(crate) fn shutdown(&mut self) {
        if let Some(commands) = self.commands.take() {
            let (ack_tx, ack_rx) = bounded(1);
            if commands.send(Command::Shutdown(ack_tx)).is_ok() {
                let _ = ack_rx.recv();
            }
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        self.state = SurfaceState::Absent;
    }
}

impl Default for SurfaceHost {
    fn default() -> Self {
        Self::new()
    }
}

/// The render context. Produces frames while running and the surface is
/// alive; otherwise parks on the command channel. State is re-checked
/// between every pair of native calls, never across one.
fn render_loop(engine: &dyn NativeEngine, commands: &Receiver<Command>, frame_interval: Duration) {
    let mut running = false;
    let mut surface_alive = false;

    loop {
        let command = if running && surface_alive {
            // Frame pacing: the command channel timeout is the tick.
            match commands.recv_timeout(frame_interval) {
                Ok(command) => Some(command),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => return,
            }
        } else {
            match commands.recv() {
                Ok(command) => Some(command),
                Err(_) => return,
            }
        };

        if let Some(command) = command {
            match command {
                Command::Run => {
                    running = true;
                    surface_alive = true;
                }
                Command::Pause(ack) => {
                    running = false;
                    let _ = ack.send(());
                }
                Command::Resize { width, height } => {
                    if surface_alive {
                        engine.resize(width, height);
                    } else {
                        // Benign event race; not an error to anyone.
                        log::debug!("dropping resize for a destroyed surface");
                    }
                }
                Command::SurfaceLost(ack) => {
                    surface_alive = false;
                    let _ = ack.send(());
                }
                Command::Shutdown(ack) => {
                    let _ = ack.send(());
                    return;
                }
            }
            // Commands may have changed the gate; re-check before rendering.
            continue;
        }

        engine.render_frame();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::DataPaths;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    #[derive(Default)]
    struct CountingEngine {
        frames: AtomicUsize,
        resizes: Mutex<Vec<(u32, u32)>>,
    }

    impl NativeEngine for CountingEngine {
        fn set_data_file_path(&self, _paths: &DataPaths) {}
        fn init(&self) {}

        fn resize(&self, width: u32, height: u32) {
            self.resizes.lock().unwrap().push((width, height));
        }

        fn render_frame(&self) {
            self.frames.fetch_add(1, Ordering::SeqCst);
        }

        fn on_pause(&self) {}
        fn on_resume(&self) {}
        fn shutdown(&self) {}
    }

    fn fast_host() -> SurfaceHost {
        SurfaceHost::with_frame_interval(Duration::from_millis(1))
    }

    fn wait_until(deadline: Duration, mut ok: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if ok() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        ok()
    }

    // ── frame production ──────────────────────────────────────────────────

    #[test]
    fn frames_flow_after_run() {
        let engine = Arc::new(CountingEngine::default());
        let mut host = fast_host();
        host.mark_created();
        host.start(engine.clone());
        host.run();

        assert!(wait_until(Duration::from_secs(1), || {
            engine.frames.load(Ordering::SeqCst) > 2
        }));

        host.shutdown();
    }

    #[test]
    fn no_frames_before_run() {
        let engine = Arc::new(CountingEngine::default());
        let mut host = fast_host();
        host.start(engine.clone());

        thread::sleep(Duration::from_millis(30));
        assert_eq!(engine.frames.load(Ordering::SeqCst), 0);

        host.shutdown();
    }

    // ── pause handshake ───────────────────────────────────────────────────

    #[test]
    fn pause_quiesces_before_returning() {
        let engine = Arc::new(CountingEngine::default());
        let mut host = fast_host();
        host.mark_created();
        host.start(engine.clone());
        host.run();

        assert!(wait_until(Duration::from_secs(1), || {
            engine.frames.load(Ordering::SeqCst) > 0
        }));

        host.pause();
        let at_pause = engine.frames.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(engine.frames.load(Ordering::SeqCst), at_pause);

        host.shutdown();
    }

    // ── surface loss ──────────────────────────────────────────────────────

    #[test]
    fn destroyed_surface_stops_frames_and_drops_resizes() {
        let engine = Arc::new(CountingEngine::default());
        let mut host = fast_host();
        host.mark_created();
        host.start(engine.clone());
        host.run();

        assert!(wait_until(Duration::from_secs(1), || {
            engine.frames.load(Ordering::SeqCst) > 0
        }));

        host.mark_destroyed();
        let at_destroy = engine.frames.load(Ordering::SeqCst);
        host.resize(640, 480);
        thread::sleep(Duration::from_millis(30));

        assert_eq!(engine.frames.load(Ordering::SeqCst), at_destroy);
        assert!(engine.resizes.lock().unwrap().is_empty());

        host.shutdown();
    }

    #[test]
    fn run_after_new_surface_resumes_frames() {
        let engine = Arc::new(CountingEngine::default());
        let mut host = fast_host();
        host.mark_created();
        host.start(engine.clone());
        host.run();
        host.mark_destroyed();

        let at_destroy = engine.frames.load(Ordering::SeqCst);
        host.mark_created();
        host.run();

        assert!(wait_until(Duration::from_secs(1), || {
            engine.frames.load(Ordering::SeqCst) > at_destroy
        }));

        host.shutdown();
    }

    // ── sizing ────────────────────────────────────────────────────────────

    #[test]
    fn repeated_identical_size_is_not_a_change() {
        let mut host = fast_host();
        host.mark_created();
        assert!(host.mark_sized(800, 600));
        assert!(!host.mark_sized(800, 600));
        assert!(host.mark_sized(1024, 768));
    }

    #[test]
    fn sizing_an_absent_surface_is_ignored() {
        let mut host = fast_host();
        assert!(!host.mark_sized(800, 600));
        assert_eq!(host.state(), SurfaceState::Absent);
    }

    #[test]
    fn shutdown_without_start_is_a_noop() {
        let mut host = fast_host();
        host.shutdown();
        assert_eq!(host.state(), SurfaceState::Absent);
    }
}
