//! The native engine seam.
//!
//! The engine is an opaque native subsystem; the bridge only sequences a
//! fixed set of calls into it. [`NativeEngine`] is that contract. The
//! production implementation binds symbols out of the dynamically loaded
//! engine module; tests substitute recording doubles.

use std::ffi::{CString, c_char, c_int};
use std::path::Path;
use std::sync::Arc;

use libloading::Library;

use crate::paths::DataPaths;

/// Narrow contract the bridge drives the engine through.
///
/// Call order is fixed by the bridge: `set_data_file_path` before `init`;
/// `init` before any `resize`/`render_frame`; `shutdown` after frame
/// production has stopped. All calls are fire-and-forget; failures inside
/// the engine are its own concern.
pub trait NativeEngine: Send + Sync {
    /// Hands the engine its filesystem roots. Exactly once, before `init`.
    fn set_data_file_path(&self, paths: &DataPaths);

    /// Brings the engine online against the current surface.
    fn init(&self);

    /// Viewport/projection update for new surface dimensions.
    fn resize(&self, width: u32, height: u32);

    /// Produces one frame.
    fn render_frame(&self);

    fn on_pause(&self);
    fn on_resume(&self);

    /// Final teardown. No call may follow this one.
    fn shutdown(&self);
}

/// A live, initialized engine instance.
///
/// At most one exists per process. Owned exclusively by the bridge and
/// dropped on teardown or fatal load failure.
pub struct EngineHandle {
    pub(crate) engine: Arc<dyn NativeEngine>,
}

/// Engine ABI bound out of the loaded module.
///
/// Holds plain function pointers resolved once at load time. This is sound
/// because the loader keeps the library resident for the life of the
/// process (see `loader`); the pointers never dangle.
pub(crate) struct SymbolEngine {
    set_data_file_path: unsafe extern "C" fn(*const c_char, *const c_char),
    init: unsafe extern "C" fn(),
    resize: unsafe extern "C" fn(c_int, c_int),
    frame: unsafe extern "C" fn(),
    pause: unsafe extern "C" fn(),
    resume: unsafe extern "C" fn(),
    shutdown: unsafe extern "C" fn(),
}

impl SymbolEngine {
    /// Resolves the engine ABI from `library`.
    ///
    /// # Safety
    ///
    /// The returned table holds raw pointers into `library`; the caller
    /// must keep the library loaded for as long as the table is callable.
    pub(crate) unsafe fn bind(library: &Library) -> Result<Self, libloading::Error> {
        unsafe {
            Ok(Self {
                set_data_file_path: *library.get(b"oearth_set_data_file_path\0")?,
                init: *library.get(b"oearth_init\0")?,
                resize: *library.get(b"oearth_resize\0")?,
                frame: *library.get(b"oearth_frame\0")?,
                pause: *library.get(b"oearth_pause\0")?,
                resume: *library.get(b"oearth_resume\0")?,
                shutdown: *library.get(b"oearth_shutdown\0")?,
            })
        }
    }
}

/// Converts a validated host path to a C string for the native ABI.
///
/// Interior NULs cannot appear in paths that passed resolution, but the
/// conversion is still checked rather than asserted.
fn c_path(path: &Path) -> Option<CString> {
    match CString::new(path.to_string_lossy().into_owned()) {
        Ok(s) => Some(s),
        Err(e) => {
            log::error!("path {} not representable for native call: {e}", path.display());
            None
        }
    }
}

impl NativeEngine for SymbolEngine {
    fn set_data_file_path(&self, paths: &DataPaths) {
        let (Some(writable), Some(packaged)) = (
            c_path(&paths.writable_dir),
            c_path(&paths.packaged_resource_dir),
        ) else {
            return;
        };

        unsafe { (self.set_data_file_path)(writable.as_ptr(), packaged.as_ptr()) }
    }

    fn init(&self) {
        unsafe { (self.init)() }
    }

    fn resize(&self, width: u32, height: u32) {
        unsafe { (self.resize)(width as c_int, height as c_int) }
    }

    fn render_frame(&self) {
        unsafe { (self.frame)() }
    }

    fn on_pause(&self) {
        unsafe { (self.pause)() }
    }

    fn on_resume(&self) {
        unsafe { (self.resume)() }
    }

    fn shutdown(&self) {
        unsafe { (self.shutdown)() }
    }
}
