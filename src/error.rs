//! Error taxonomy for the launcher.
//!
//! Every variant is fatal for the current invocation; the binary maps all of
//! them to exit code 1.  Messages carry the remediation text the user needs.

use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

use crate::runtime::PythonVersion;

#[derive(Debug, Error)]
pub enum LauncherError {
    #[error(
        "no Python interpreter found (tried: {tried}).\n\
         Install Python 3.8+ from https://www.python.org/downloads/ or your \
         package manager and make sure it is on PATH"
    )]
    RuntimeNotFound { tried: String },

    #[error(
        "Python {found} at {} is not supported; Python {required}+ is required.\n\
         Recommended: Python 3.10+ for best compatibility",
        .path.display()
    )]
    RuntimeTooOld {
        path: PathBuf,
        found: PythonVersion,
        required: PythonVersion,
    },

    #[error(
        "no package installer found (tried: {tried}).\n\
         Install pip with `python3 -m ensurepip --upgrade` or your package manager"
    )]
    InstallerNotFound { tried: String },

    #[error("failed to create virtual environment at {}: {detail}", .path.display())]
    VenvCreation { path: PathBuf, detail: String },

    #[error(
        "dependency installation failed: {detail}\n\
         Check your network connection, then retry manually with:\n  {retry}"
    )]
    DependencyInstall { detail: String, retry: String },

    #[error("{program} exited with {status}")]
    SynthesisFailed { program: String, status: String },

    #[error("{program} did not finish within {}s and was terminated", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    #[error("text is required unless --info is given")]
    MissingText,

    #[error("invalid configuration in {}: {detail}", .path.display())]
    InvalidConfig { path: PathBuf, detail: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type LauncherResult<T> = std::result::Result<T, LauncherError>;
