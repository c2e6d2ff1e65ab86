//! Engine data-path resolution.
//!
//! Before the first native call the engine needs two filesystem roots: a
//! writable per-app data directory and the read-only packaged resource
//! path. Both come from the host and are validated here. The bridge
//! injects them into the engine strictly before `init`; the engine must
//! never see a frame or update call while they are unset.

use std::fmt;
use std::path::PathBuf;

/// Host-provided filesystem lookups.
///
/// Implemented by the real host adapter and by fakes in tests and the
/// viewer binary. A lookup may legitimately come back empty (e.g. the host
/// is not fully constructed yet), hence `Option`.
pub trait HostContext {
    /// Writable per-app data directory.
    fn files_dir(&self) -> Option<PathBuf>;

    /// Read-only path of the installed resource package.
    fn package_resource_path(&self) -> Option<PathBuf>;
}

/// The two resolved engine roots.
///
/// Computed once per bridge construction and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub writable_dir: PathBuf,
    pub packaged_resource_dir: PathBuf,
}

/// A required filesystem path could not be determined.
///
/// Fatal: the engine cannot be safely initialized without both roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolutionError {
    /// Which lookup failed ("writable data directory" or
    /// "packaged resource path").
    pub lookup: &'static str,
    pub reason: String,
}

impl fmt::Display for PathResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to resolve {}: {}", self.lookup, self.reason)
    }
}

impl std::error::Error for PathResolutionError {}

/// Resolves both engine roots from the host context.
///
/// Pure: nothing is cached, so a reconstructed bridge can re-run this
/// against a fresh context. Each root must be non-empty, absolute, and
/// present on the host filesystem.
pub fn resolve_data_paths(ctx: &dyn HostContext) -> Result<DataPaths, PathResolutionError> {
    let writable_dir = checked(ctx.files_dir(), "writable data directory")?;
    let packaged_resource_dir = checked(ctx.package_resource_path(), "packaged resource path")?;

    Ok(DataPaths {
        writable_dir,
        packaged_resource_dir,
    })
}

fn checked(path: Option<PathBuf>, lookup: &'static str) -> Result<PathBuf, PathResolutionError> {
    let err = |reason: String| PathResolutionError { lookup, reason };

    let Some(path) = path else {
        return Err(err("host returned no path".to_string()));
    };

    if path.as_os_str().is_empty() {
        return Err(err("host returned an empty path".to_string()));
    }
    if !path.is_absolute() {
        return Err(err(format!("path is not absolute: {}", path.display())));
    }
    if !path.exists() {
        return Err(err(format!("path does not exist: {}", path.display())));
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct FakeContext {
        files: Option<PathBuf>,
        package: Option<PathBuf>,
    }

    impl HostContext for FakeContext {
        fn files_dir(&self) -> Option<PathBuf> {
            self.files.clone()
        }

        fn package_resource_path(&self) -> Option<PathBuf> {
            self.package.clone()
        }
    }

    fn existing_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("tellus-paths-tests")
            .join(format!("{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn resolves_two_existing_absolute_dirs() {
        let files = existing_dir("files");
        let package = existing_dir("package");
        let ctx = FakeContext {
            files: Some(files.clone()),
            package: Some(package.clone()),
        };

        let paths = resolve_data_paths(&ctx).unwrap();
        assert_eq!(paths.writable_dir, files);
        assert_eq!(paths.packaged_resource_dir, package);
    }

    #[test]
    fn missing_files_dir_lookup_fails() {
        let ctx = FakeContext {
            files: None,
            package: Some(existing_dir("pkg-only")),
        };

        let e = resolve_data_paths(&ctx).unwrap_err();
        assert_eq!(e.lookup, "writable data directory");
    }

    #[test]
    fn empty_package_path_fails() {
        let ctx = FakeContext {
            files: Some(existing_dir("files-empty-pkg")),
            package: Some(PathBuf::new()),
        };

        let e = resolve_data_paths(&ctx).unwrap_err();
        assert_eq!(e.lookup, "packaged resource path");
    }

    #[test]
    fn relative_path_fails() {
        let ctx = FakeContext {
            files: Some(PathBuf::from("relative/data")),
            package: Some(existing_dir("pkg-rel")),
        };

        let e = resolve_data_paths(&ctx).unwrap_err();
        assert!(e.reason.contains("not absolute"), "{}", e.reason);
    }

    #[test]
    fn nonexistent_path_fails() {
        let ctx = FakeContext {
            files: Some(existing_dir("files-ok")),
            package: Some(PathBuf::from("/definitely/not/a/real/tellus/dir")),
        };

        let e = resolve_data_paths(&ctx).unwrap_err();
        assert!(e.reason.contains("does not exist"), "{}", e.reason);
    }

    #[test]
    fn resolution_is_rerunnable() {
        let ctx = FakeContext {
            files: Some(existing_dir("files-rerun")),
            package: Some(existing_dir("pkg-rerun")),
        };

        let first = resolve_data_paths(&ctx).unwrap();
        let second = resolve_data_paths(&ctx).unwrap();
        assert_eq!(first, second);
    }
}
