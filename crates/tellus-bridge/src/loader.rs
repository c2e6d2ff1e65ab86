//! Native engine module loading.
//!
//! The engine ships as a dynamic library. Loading binds its symbols
//! process-wide, so the module is loaded once per process and never
//! unloaded; later load calls observe the resident library and succeed
//! without touching the filesystem.
//!
//! The load chain allows exactly one fatal step. Optional diagnostic
//! modules (e.g. a sanitizer runtime) are attempted first and may fail
//! freely; a failure there is logged and surfaced as a warning. The
//! primary engine module comes last, and its failure ends engine startup.

use std::fmt;
use std::sync::{Arc, OnceLock};

use libloading::Library;

use crate::engine::{NativeEngine, SymbolEngine};

/// Names of the modules to load, in chain order.
///
/// Names are undecorated; the platform prefix/suffix (`lib…`, `.so`,
/// `.dll`) is applied at load time.
#[derive(Debug, Clone)]
pub struct EngineModules {
    /// The engine itself. Load failure is fatal.
    pub primary: String,
    /// Optional instrumentation modules, tried before the primary.
    pub diagnostics: Vec<String>,
}

impl Default for EngineModules {
    fn default() -> Self {
        Self {
            primary: "oearth".to_string(),
            diagnostics: Vec::new(),
        }
    }
}

/// The primary engine module failed to load.
///
/// Unrecoverable: no engine operation is possible without the primary
/// module, so this propagates to the host.
#[derive(Debug, Clone)]
pub struct FatalLoadError {
    pub module: String,
    pub reason: String,
}

impl fmt::Display for FatalLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "engine module '{}' failed to load: {}", self.module, self.reason)
    }
}

impl std::error::Error for FatalLoadError {}

/// An optional module failed to load; engine startup continued.
#[derive(Debug, Clone)]
pub struct RecoverableLoadWarning {
    pub module: String,
    pub reason: String,
}

impl fmt::Display for RecoverableLoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "optional module '{}' failed to load: {}", self.module, self.reason)
    }
}

/// Tagged outcome of loading the engine module chain.
pub enum LoadResult {
    /// Every module in the chain loaded, or the engine was already
    /// resident.
    Success(Arc<dyn NativeEngine>),
    /// The primary module loaded but one or more optional diagnostic
    /// modules did not. Every warning is surfaced here, in chain order,
    /// as well as logged; startup continues.
    Recoverable(Arc<dyn NativeEngine>, Vec<RecoverableLoadWarning>),
    /// The primary engine module failed to load.
    Fatal(FatalLoadError),
}

/// Source of the engine binding.
///
/// The production implementation is [`LibraryLoader`]; tests and the
/// viewer binary substitute in-process doubles.
pub trait EngineLoader {
    fn load(&mut self, modules: &EngineModules) -> LoadResult;
}

struct ResidentEngine {
    // Never dropped: bound symbols point into this library.
    _library: Library,
    engine: Arc<SymbolEngine>,
}

/// The resident engine module, once loaded. Process-wide by design; the
/// native symbol binding is a process-wide side effect.
static RESIDENT: OnceLock<ResidentEngine> = OnceLock::new();

/// Loads the engine module chain and binds the engine ABI.
pub struct LibraryLoader;

impl LibraryLoader {
    /// Runs the load chain. Idempotent: if the engine is already resident
    /// the call is a no-op success.
    pub fn load(modules: &EngineModules) -> LoadResult {
        if let Some(resident) = RESIDENT.get() {
            log::debug!("engine module already resident; skipping load");
            return LoadResult::Success(resident.engine.clone());
        }

        let warnings = load_diagnostics(&modules.diagnostics);

        let file = libloading::library_filename(&modules.primary);
        let library = match unsafe { Library::new(&file) } {
            Ok(library) => library,
            Err(e) => {
                return LoadResult::Fatal(FatalLoadError {
                    module: modules.primary.clone(),
                    reason: e.to_string(),
                });
            }
        };

        let engine = match unsafe { SymbolEngine::bind(&library) } {
            Ok(engine) => Arc::new(engine),
            Err(e) => {
                return LoadResult::Fatal(FatalLoadError {
                    module: modules.primary.clone(),
                    reason: format!("symbol binding failed: {e}"),
                });
            }
        };

        log::info!("engine module '{}' loaded", modules.primary);

        let resident = RESIDENT.get_or_init(move || ResidentEngine {
            _library: library,
            engine,
        });

        if warnings.is_empty() {
            LoadResult::Success(resident.engine.clone())
        } else {
            LoadResult::Recoverable(resident.engine.clone(), warnings)
        }
    }
}

/// Attempts each optional diagnostic module in order. Failures never end
/// the chain; each one is logged and collected.
fn load_diagnostics(names: &[String]) -> Vec<RecoverableLoadWarning> {
    let mut warnings = Vec::new();
    for name in names {
        let file = libloading::library_filename(name);
        match unsafe { Library::new(&file) } {
            Ok(library) => {
                log::debug!("loaded diagnostic module '{name}'");
                // Keep it resident alongside the engine.
                std::mem::forget(library);
            }
            Err(e) => {
                let w = RecoverableLoadWarning {
                    module: name.clone(),
                    reason: e.to_string(),
                };
                log::warn!("{w}; continuing without it");
                warnings.push(w);
            }
        }
    }
    warnings
}

impl EngineLoader for LibraryLoader {
    fn load(&mut self, modules: &EngineModules) -> LoadResult {
        Self::load(modules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_primary_module_is_fatal() {
        let modules = EngineModules {
            primary: "tellus-no-such-engine-module".to_string(),
            diagnostics: Vec::new(),
        };

        match LibraryLoader::load(&modules) {
            LoadResult::Fatal(e) => {
                assert_eq!(e.module, "tellus-no-such-engine-module");
                assert!(!e.reason.is_empty());
            }
            _ => panic!("expected a fatal load failure"),
        }
    }

    #[test]
    fn missing_diagnostic_module_does_not_mask_primary_failure() {
        // Both modules are absent; the outcome must be governed by the
        // primary alone.
        let modules = EngineModules {
            primary: "tellus-no-such-engine-module".to_string(),
            diagnostics: vec!["tellus-no-such-asan-module".to_string()],
        };

        assert!(matches!(LibraryLoader::load(&modules), LoadResult::Fatal(_)));
    }

    #[test]
    fn every_failed_diagnostic_is_collected_in_order() {
        let names = vec![
            "tellus-no-such-asan-module".to_string(),
            "tellus-no-such-tsan-module".to_string(),
        ];

        let warnings = load_diagnostics(&names);
        let modules: Vec<_> = warnings.iter().map(|w| w.module.as_str()).collect();
        assert_eq!(modules, ["tellus-no-such-asan-module", "tellus-no-such-tsan-module"]);
        assert!(warnings.iter().all(|w| !w.reason.is_empty()));
    }

    #[test]
    fn fatal_error_formats_module_name() {
        let e = FatalLoadError {
            module: "oearth".to_string(),
            reason: "not found".to_string(),
        };
        assert_eq!(e.to_string(), "engine module 'oearth' failed to load: not found");
    }
}
