//! Binary resolution.
//!
//! The engine core does not know where binaries live or how they are
//! installed; it asks a [`BinaryResolver`]. The first resolution for an
//! architecture may be slow (asset extraction), so the engine only resolves
//! off the caller's context or before a spawn, never concurrently with an
//! in-flight execution.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::arch::ArchTag;
use crate::error::FfprocError;
use crate::Result;

/// File name of the managed binary inside an asset directory.
pub const BINARY_NAME: &str = "ffmpeg";

/// Resolves the executable path for the managed binary.
///
/// Implementations may install or extract assets on first call. Both
/// operations are treated as potentially slow by the engine.
pub trait BinaryResolver: Send + Sync {
    /// Resolve the binary variant for the given architecture tag.
    ///
    /// Fails with [`FfprocError::UnsupportedEnvironment`] when `tag` is
    /// [`ArchTag::Unsupported`].
    fn resolve_for_arch(&self, tag: ArchTag) -> Result<PathBuf>;

    /// Resolve a binary path for ad-hoc invocations (e.g. version queries),
    /// independent of the managed per-arch lifecycle.
    ///
    /// `env` carries caller-supplied environment overrides; implementations
    /// may use them to pick an alternate install location.
    fn resolve_default(&self, env: Option<&HashMap<String, String>>) -> Result<PathBuf>;
}

/// Resolver over a directory of prebuilt binary variants.
///
/// Layout: `<base_dir>/<asset-dir>/ffmpeg` per architecture, plus
/// `<base_dir>/ffmpeg` as the default for ad-hoc invocations.
#[derive(Debug, Clone)]
pub struct DirResolver {
    base_dir: PathBuf,
}

impl DirResolver {
    /// Create a resolver rooted at the given base directory.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// The base directory this resolver searches under.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn checked(&self, path: PathBuf) -> Result<PathBuf> {
        if !path.is_file() {
            return Err(FfprocError::BinaryNotFound(path));
        }
        ensure_executable(&path)?;
        debug!(path = %path.display(), "resolved binary");
        Ok(path)
    }
}

impl BinaryResolver for DirResolver {
    fn resolve_for_arch(&self, tag: ArchTag) -> Result<PathBuf> {
        let dir = tag
            .asset_dir()
            .ok_or(FfprocError::UnsupportedEnvironment)?;
        self.checked(self.base_dir.join(dir).join(BINARY_NAME))
    }

    fn resolve_default(&self, _env: Option<&HashMap<String, String>>) -> Result<PathBuf> {
        self.checked(self.base_dir.join(BINARY_NAME))
    }
}

/// Make sure the binary carries the executable bit. Extracted assets
/// sometimes land without one.
#[cfg(unix)]
fn ensure_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let meta = std::fs::metadata(path)?;
    let mut perms = meta.permissions();
    if perms.mode() & 0o111 == 0 {
        perms.set_mode(perms.mode() | 0o755);
        std::fs::set_permissions(path, perms)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(dirs: &[&str]) -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        for dir in dirs {
            let d = tmp.path().join(dir);
            std::fs::create_dir_all(&d).unwrap();
            std::fs::write(d.join(BINARY_NAME), b"#!/bin/sh\n").unwrap();
        }
        tmp
    }

    #[test]
    fn test_resolve_for_arch() {
        let tmp = fixture(&["x86", "armeabi-v7a"]);
        let resolver = DirResolver::new(tmp.path());

        let path = resolver.resolve_for_arch(ArchTag::X86).unwrap();
        assert_eq!(path, tmp.path().join("x86").join(BINARY_NAME));

        let path = resolver.resolve_for_arch(ArchTag::Armv7).unwrap();
        assert!(path.ends_with("armeabi-v7a/ffmpeg"));
    }

    #[test]
    fn test_resolve_unsupported() {
        let tmp = fixture(&[]);
        let resolver = DirResolver::new(tmp.path());

        let err = resolver.resolve_for_arch(ArchTag::Unsupported).unwrap_err();
        assert!(matches!(err, FfprocError::UnsupportedEnvironment));
    }

    #[test]
    fn test_resolve_missing_binary() {
        let tmp = fixture(&[]);
        let resolver = DirResolver::new(tmp.path());

        let err = resolver.resolve_for_arch(ArchTag::X86).unwrap_err();
        assert!(matches!(err, FfprocError::BinaryNotFound(_)));
    }

    #[test]
    fn test_resolve_default() {
        let tmp = fixture(&[]);
        std::fs::write(tmp.path().join(BINARY_NAME), b"#!/bin/sh\n").unwrap();
        let resolver = DirResolver::new(tmp.path());

        let path = resolver.resolve_default(None).unwrap();
        assert_eq!(path, tmp.path().join(BINARY_NAME));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_sets_executable_bit() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = fixture(&["x86"]);
        let bin = tmp.path().join("x86").join(BINARY_NAME);
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o644)).unwrap();

        let resolver = DirResolver::new(tmp.path());
        let path = resolver.resolve_for_arch(ArchTag::X86).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_ne!(mode & 0o111, 0);
    }
}
