//! Host CPU architecture detection.
//!
//! The supported binary variants are prebuilt per instruction set, so the
//! engine needs to classify the host once before the first load. Detection
//! is a pure function of the host; the result is cached for the process
//! lifetime.

use std::sync::OnceLock;

use tracing::info;

/// Discrete classification of host CPU instruction-set support.
///
/// Each supported tag maps to one prebuilt binary variant. Hardware that
/// matches none of the variants is classified as [`ArchTag::Unsupported`]
/// rather than being an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchTag {
    /// x86 / x86_64.
    X86,
    /// 32-bit ARMv7 without NEON.
    Armv7,
    /// ARMv7 with NEON SIMD (also used for aarch64, where NEON is baseline).
    Armv7Neon,
    /// No binary variant exists for this hardware.
    Unsupported,
}

impl ArchTag {
    /// Name of the asset directory holding this variant's binary.
    ///
    /// Returns `None` for [`ArchTag::Unsupported`].
    pub fn asset_dir(&self) -> Option<&'static str> {
        match self {
            ArchTag::X86 => Some("x86"),
            ArchTag::Armv7 => Some("armeabi-v7a"),
            ArchTag::Armv7Neon => Some("armeabi-v7a-neon"),
            ArchTag::Unsupported => None,
        }
    }

    /// Check whether a binary variant exists for this tag.
    pub fn is_supported(&self) -> bool {
        !matches!(self, ArchTag::Unsupported)
    }
}

/// Detect the host architecture tag.
///
/// Deterministic per host and never fails; unsupported hardware yields
/// [`ArchTag::Unsupported`]. The probe runs once per process and the
/// result is cached.
pub fn detect() -> ArchTag {
    static TAG: OnceLock<ArchTag> = OnceLock::new();
    *TAG.get_or_init(|| {
        let tag = probe();
        info!(?tag, "detected host architecture");
        tag
    })
}

fn probe() -> ArchTag {
    if cfg!(any(target_arch = "x86", target_arch = "x86_64")) {
        ArchTag::X86
    } else if cfg!(target_arch = "aarch64") {
        // arm64 cores always carry NEON; run the NEON build.
        ArchTag::Armv7Neon
    } else if cfg!(target_arch = "arm") {
        if cpu_has_neon() {
            ArchTag::Armv7Neon
        } else {
            ArchTag::Armv7
        }
    } else {
        ArchTag::Unsupported
    }
}

/// NEON sniff for 32-bit ARM, read from the kernel's CPU feature list.
fn cpu_has_neon() -> bool {
    std::fs::read_to_string("/proc/cpuinfo")
        .map(|info| {
            info.lines()
                .any(|line| line.starts_with("Features") && line.contains("neon"))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_is_cached() {
        // Two calls must return the same tag
        assert_eq!(detect(), detect());
    }

    #[test]
    fn test_detect_matches_compile_target() {
        let tag = detect();
        if cfg!(any(target_arch = "x86", target_arch = "x86_64")) {
            assert_eq!(tag, ArchTag::X86);
        }
        if cfg!(target_arch = "aarch64") {
            assert_eq!(tag, ArchTag::Armv7Neon);
        }
    }

    #[test]
    fn test_asset_dir_names() {
        assert_eq!(ArchTag::X86.asset_dir(), Some("x86"));
        assert_eq!(ArchTag::Armv7.asset_dir(), Some("armeabi-v7a"));
        assert_eq!(ArchTag::Armv7Neon.asset_dir(), Some("armeabi-v7a-neon"));
        assert_eq!(ArchTag::Unsupported.asset_dir(), None);
    }

    #[test]
    fn test_is_supported() {
        assert!(ArchTag::X86.is_supported());
        assert!(ArchTag::Armv7.is_supported());
        assert!(ArchTag::Armv7Neon.is_supported());
        assert!(!ArchTag::Unsupported.is_supported());
    }
}
