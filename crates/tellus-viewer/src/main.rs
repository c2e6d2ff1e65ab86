//! Host simulator for the tellus bridge.
//!
//! Replays a typical host lifecycle (create, surface up, run, pause,
//! resume, teardown) against the bridge on a desktop machine, with a stub
//! standing in for the native engine module. Useful for eyeballing the
//! call sequencing without an actual device or engine `.so`.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tellus_bridge::adapter::{HostEvent, LifecycleAdapter};
use tellus_bridge::bridge::EngineBridge;
use tellus_bridge::engine::NativeEngine;
use tellus_bridge::loader::{EngineLoader, EngineModules, LoadResult};
use tellus_bridge::logging::{LoggingConfig, init_logging};
use tellus_bridge::paths::{DataPaths, HostContext};

/// Stand-in for the native engine: logs every call the bridge issues.
struct StubEngine;

impl NativeEngine for StubEngine {
    fn set_data_file_path(&self, paths: &DataPaths) {
        log::info!(
            "[engine] set_data_file_path({}, {})",
            paths.writable_dir.display(),
            paths.packaged_resource_dir.display()
        );
    }

    fn init(&self) {
        log::info!("[engine] init");
    }

    fn resize(&self, width: u32, height: u32) {
        log::info!("[engine] resize({width}, {height})");
    }

    fn render_frame(&self) {
        log::trace!("[engine] frame");
    }

    fn on_pause(&self) {
        log::info!("[engine] pause");
    }

    fn on_resume(&self) {
        log::info!("[engine] resume");
    }

    fn shutdown(&self) {
        log::info!("[engine] shutdown");
    }
}

struct StubLoader;

impl EngineLoader for StubLoader {
    fn load(&mut self, modules: &EngineModules) -> LoadResult {
        log::info!("[loader] pretending to load module '{}'", modules.primary);
        LoadResult::Success(Arc::new(StubEngine))
    }
}

/// Desktop stand-in for the host application context.
struct DesktopContext {
    files: PathBuf,
    package: PathBuf,
}

impl DesktopContext {
    fn prepare() -> Result<Self> {
        let root = std::env::temp_dir().join("tellus-viewer");
        let files = root.join("files");
        let package = root.join("package");
        std::fs::create_dir_all(&files).context("creating writable data dir")?;
        std::fs::create_dir_all(&package).context("creating package resource dir")?;
        Ok(Self { files, package })
    }
}

impl HostContext for DesktopContext {
    fn files_dir(&self) -> Option<PathBuf> {
        Some(self.files.clone())
    }

    fn package_resource_path(&self) -> Option<PathBuf> {
        Some(self.package.clone())
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let ctx = DesktopContext::prepare().context("failed to prepare host directories")?;

    let bridge = EngineBridge::with_loader(EngineModules::default(), Box::new(StubLoader))
        .with_frame_interval(Duration::from_millis(33));
    let mut host = LifecycleAdapter::new(bridge);

    host.dispatch(HostEvent::Create(&ctx))
        .context("engine startup failed")?;
    host.dispatch(HostEvent::SurfaceCreated)?;
    host.dispatch(HostEvent::SurfaceChanged {
        width: 1280,
        height: 720,
    })?;

    log::info!("[host] foreground, rendering");
    thread::sleep(Duration::from_millis(500));

    host.dispatch(HostEvent::Pause)?;
    log::info!("[host] backgrounded");
    thread::sleep(Duration::from_millis(200));

    host.dispatch(HostEvent::Resume)?;
    log::info!("[host] foregrounded again");
    thread::sleep(Duration::from_millis(300));

    host.dispatch(HostEvent::SurfaceDestroyed)?;
    host.dispatch(HostEvent::Destroy)?;
    log::info!("[host] done");

    Ok(())
}
