//! # tts-launcher
//!
//! Launcher for the [Coqui TTS](https://github.com/coqui-ai/TTS) Python
//! library.  It finds a Python interpreter, keeps a virtual environment with
//! a pinned TTS stack, and forwards synthesis requests to the library's
//! `tts` command.
//!
//! ## Quick start
//!
//! ```no_run
//! use tts_launcher::{Invocation, Launcher, LauncherConfig};
//!
//! let launcher = Launcher::new(LauncherConfig::default());
//! let inv = Invocation {
//!     text: Some("Hello world".into()),
//!     ..Invocation::default()
//! };
//! // Creates ./tts_venv on first run, then writes ./hello_world.wav
//! launcher.run(&inv).unwrap();
//! ```
//!
//! The filename helper is usable on its own:
//!
//! ```
//! assert_eq!(tts_launcher::filename::derive_filename("Hello world", 20), "hello_world.wav");
//! ```
//!
//! ## Pipeline
//! 1. **Probe**: `python3` / `python` ≥ 3.8, plus `pip3` / `pip` / `-m pip`.
//! 2. **Environment**: create or reuse `tts_venv`, install pinned packages.
//! 3. **Patch**: rewrite PEP 604 annotations in `bangla` for Python < 3.10.
//! 4. **Naming**: derive `first_words_of_text.wav` when no path is given.
//! 5. **Forward**: run `<env>/bin/tts --text … --model_name … --out_path …`.
//!
//! ## Environment variables
//! | Variable              | Effect                                   |
//! |-----------------------|------------------------------------------|
//! | `COQUI_MODEL_PATH`    | Model store used by `--info` / updates   |
//! | `TTS_LAUNCHER_CONFIG` | JSON config file                         |
//! | `RUST_LOG`            | Log filter (binary only)                 |

#[cfg(feature = "cli")]
pub mod cli;

pub mod config;
pub mod error;
pub mod filename;
pub mod forward;
pub mod launcher;
pub mod models;
pub mod patch;
pub mod process;
pub mod runtime;
pub mod updates;
pub mod venv;

// ─── Re-exports for convenience ─────────────────────────────────────────────

pub use config::LauncherConfig;
pub use error::{LauncherError, LauncherResult};
pub use launcher::{Invocation, Launcher};
