//! Host probe: locates a Python interpreter and a package installer.
//!
//! Resolution order (both lists are configurable):
//!
//! 1. **Interpreter**: first of `python3`, `python` found on `PATH` whose
//!    `--version` parses and meets the minimum (3.8).
//! 2. **Installer**: `pip3`, `pip` on `PATH`, then `<python> -m pip`.
//!
//! Python 2 prints its version banner on stderr, so both streams are read.

use std::{
    fmt,
    path::{Path, PathBuf},
    process::Command,
};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{LauncherError, LauncherResult};

static RE_PYTHON_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Python\s+(\d+)\.(\d+)(?:\.(\d+))?").unwrap());

// ─────────────────────────────────────────────────────────────────────────────
// Version
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PythonVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl PythonVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Parse the banner printed by `python --version`, e.g. `Python 3.9.7`.
    pub fn parse(banner: &str) -> Option<Self> {
        let caps = RE_PYTHON_VERSION.captures(banner)?;
        let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
        Some(Self {
            major: num(1)?,
            minor: num(2)?,
            patch: num(3).unwrap_or(0),
        })
    }
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Probe results
// ─────────────────────────────────────────────────────────────────────────────

/// How packages get installed on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Installer {
    /// A standalone `pip3` / `pip` executable.
    Executable(PathBuf),
    /// `<python> -m pip`.
    Module,
}

/// A Python interpreter that passed the version check, plus the installer
/// used when the env it creates comes without its own `pip`.
#[derive(Debug, Clone)]
pub struct PythonRuntime {
    pub path: PathBuf,
    pub version: PythonVersion,
    pub installer: Installer,
}

// ─────────────────────────────────────────────────────────────────────────────
// Probing
// ─────────────────────────────────────────────────────────────────────────────

fn version_of(python: &Path) -> Option<PythonVersion> {
    let out = Command::new(python).arg("--version").output().ok()?;
    let stdout = String::from_utf8_lossy(&out.stdout);
    let stderr = String::from_utf8_lossy(&out.stderr);
    PythonVersion::parse(&stdout).or_else(|| PythonVersion::parse(&stderr))
}

/// Find the first interpreter in `candidates` that meets `minimum`.
///
/// A candidate that is present but too old is remembered; if nothing newer
/// turns up the error names it rather than claiming Python is missing.
pub fn find_python(
    candidates: &[String],
    minimum: PythonVersion,
) -> LauncherResult<(PathBuf, PythonVersion)> {
    let mut too_old: Option<(PathBuf, PythonVersion)> = None;

    for name in candidates {
        let Ok(path) = which::which(name) else {
            log::debug!("{name}: not on PATH");
            continue;
        };
        let Some(version) = version_of(&path) else {
            log::debug!("{}: could not read version", path.display());
            continue;
        };
        log::debug!("Found {} (Python {version})", path.display());

        if version >= minimum {
            return Ok((path, version));
        }
        too_old.get_or_insert((path, version));
    }

    match too_old {
        Some((path, found)) => Err(LauncherError::RuntimeTooOld { path, found, required: minimum }),
        None => Err(LauncherError::RuntimeNotFound { tried: candidates.join(", ") }),
    }
}

/// Locate a package installer for `python`.
pub fn find_installer(python: &Path, candidates: &[String]) -> LauncherResult<Installer> {
    for name in candidates {
        if let Ok(path) = which::which(name) {
            log::debug!("Found installer {}", path.display());
            return Ok(Installer::Executable(path));
        }
    }

    let module_ok = Command::new(python)
        .args(["-m", "pip", "--version"])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);
    if module_ok {
        log::debug!("Using {} -m pip", python.display());
        return Ok(Installer::Module);
    }

    let mut tried = candidates.to_vec();
    tried.push(format!("{} -m pip", python.display()));
    Err(LauncherError::InstallerNotFound { tried: tried.join(", ") })
}

/// Full probe: interpreter, version gate, installer.
pub fn probe(
    python_candidates: &[String],
    installer_candidates: &[String],
    minimum: PythonVersion,
    recommended: PythonVersion,
) -> LauncherResult<PythonRuntime> {
    let (path, version) = find_python(python_candidates, minimum)?;
    println!("[INFO] Python {version} detected ({})", path.display());
    if version < recommended {
        log::warn!(
            "Python {}.{} works, but Python {}.{}+ is recommended for best compatibility",
            version.major,
            version.minor,
            recommended.major,
            recommended.minor
        );
    }

    let installer = find_installer(&path, installer_candidates)?;
    Ok(PythonRuntime { path, version, installer })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
