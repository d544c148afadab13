//! Source patches for installed dependencies.
//!
//! `bangla` (pulled in by TTS 0.21) annotates a parameter as
//! `bool | None`, PEP 604 syntax that only parses on Python 3.10+.  On 3.8
//! and 3.9 importing `TTS` dies with a `TypeError` before anything runs.
//! The fix is a plain text substitution in the installed file.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

/// A single find/replace applied to a file inside `site-packages`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompatPatch {
    /// Path relative to a `site-packages` directory.
    pub file: &'static str,
    pub find: &'static str,
    pub replace: &'static str,
}

/// Patches applied after every dependency install.
pub const BUILTIN_PATCHES: &[CompatPatch] = &[CompatPatch {
    file: "bangla/__init__.py",
    find: "ordinal: bool | None = False",
    replace: "ordinal = False",
}];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Applied,
    /// File exists but no longer contains the search text.
    AlreadyApplied,
    /// Package not installed in this site-packages.
    NotPresent,
}

impl CompatPatch {
    pub fn target(&self, site_packages: &Path) -> PathBuf {
        site_packages.join(self.file)
    }

    /// Apply the patch under `site_packages`.  Running it twice is a no-op.
    pub fn apply(&self, site_packages: &Path) -> Result<PatchOutcome> {
        let target = self.target(site_packages);
        if !target.is_file() {
            return Ok(PatchOutcome::NotPresent);
        }

        let content = fs::read_to_string(&target)
            .with_context(|| format!("Cannot read {}", target.display()))?;
        if !content.contains(self.find) {
            return Ok(PatchOutcome::AlreadyApplied);
        }

        fs::write(&target, content.replace(self.find, self.replace))
            .with_context(|| format!("Cannot write {}", target.display()))?;
        Ok(PatchOutcome::Applied)
    }
}

/// Apply every patch in `patches` to every directory in `site_packages`.
///
/// Failures are logged and skipped; a broken patch must not abort setup.
/// Returns the number of files actually modified.
pub fn apply_all(patches: &[CompatPatch], site_packages: &[PathBuf]) -> usize {
    let mut applied = 0;
    for dir in site_packages {
        for patch in patches {
            match patch.apply(dir) {
                Ok(PatchOutcome::Applied) => {
                    println!("[INFO] Patched {}", patch.target(dir).display());
                    applied += 1;
                }
                Ok(PatchOutcome::AlreadyApplied) => {
                    log::debug!("{}: already patched", patch.target(dir).display())
                }
                Ok(PatchOutcome::NotPresent) => {}
                Err(e) => log::warn!("Compatibility patch for {} failed: {e:#}", patch.file),
            }
        }
    }
    applied
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const BANGLA_SRC: &str = "\
def convert_english_digit_to_bangla_digit(number, ordinal: bool | None = False):
    return number
";

    fn site_with_bangla(content: &str) -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        let pkg = tmp.path().join("bangla");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("__init__.py"), content).unwrap();
        tmp
    }

    #[test]
    fn test_apply_rewrites_union_annotation() {
        let site = site_with_bangla(BANGLA_SRC);
        let outcome = BUILTIN_PATCHES[0].apply(site.path()).unwrap();
        assert_eq!(outcome, PatchOutcome::Applied);

        let patched = fs::read_to_string(site.path().join("bangla/__init__.py")).unwrap();
        assert!(patched.contains("(number, ordinal = False)"), "got: {patched}");
        assert!(!patched.contains("| None"));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let site = site_with_bangla(BANGLA_SRC);
        let patch = BUILTIN_PATCHES[0];
        assert_eq!(patch.apply(site.path()).unwrap(), PatchOutcome::Applied);
        let once = fs::read_to_string(site.path().join("bangla/__init__.py")).unwrap();

        assert_eq!(patch.apply(site.path()).unwrap(), PatchOutcome::AlreadyApplied);
        let twice = fs::read_to_string(site.path().join("bangla/__init__.py")).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_missing_package_is_not_present() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(BUILTIN_PATCHES[0].apply(tmp.path()).unwrap(), PatchOutcome::NotPresent);
    }

    #[test]
    fn test_apply_all_counts_modified_files() {
        let a = site_with_bangla(BANGLA_SRC);
        let b = site_with_bangla("ordinal = False\n");
        let c = tempfile::tempdir().unwrap();
        let dirs = vec![a.path().to_path_buf(), b.path().to_path_buf(), c.path().to_path_buf()];

        assert_eq!(apply_all(BUILTIN_PATCHES, &dirs), 1);
        assert_eq!(apply_all(BUILTIN_PATCHES, &dirs), 0);
    }
}
