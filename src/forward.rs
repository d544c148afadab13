//! Forwarding to the library's `tts` console entry point.
//!
//! | Launcher flag        | Forwarded as                      |
//! |----------------------|-----------------------------------|
//! | positional text      | `--text <text>`                   |
//! | `--model-name <m>`   | `--model_name <m>`                |
//! | resolved output path | `--out_path <path>`               |
//! | (CUDA available)     | `--use_cuda true`                 |
//!
//! The library parses `--use_cuda` with Python's `bool()`, so any non-empty
//! value means *on*; for CPU runs the flag is omitted entirely.

use std::{
    fmt,
    ffi::OsString,
    path::{Path, PathBuf},
    process::Command,
    time::Duration,
};

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    error::LauncherResult,
    process::{run_captured, run_inherited},
    venv::IsolatedEnv,
};

/// Characters of the input echoed in progress output.
const PREVIEW_CHARS: usize = 50;

const CUDA_PROBE: &str = "import torch; print(torch.cuda.is_available())";

/// Model identifiers in `tts --list_models` output, e.g.
/// ` 12: tts_models/en/ljspeech/vits [already downloaded]`.
static RE_MODEL_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(tts_models/[^\s\[\]]+)").unwrap());

// ─────────────────────────────────────────────────────────────────────────────
// Device selection
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
        })
    }
}

/// Ask torch inside `env` whether CUDA is usable.  Any failure means CPU.
pub fn detect_device(env: &IsolatedEnv) -> Device {
    let mut cmd = Command::new(env.python());
    cmd.args(["-c", CUDA_PROBE]);
    match run_captured(cmd, Some(Duration::from_secs(60))) {
        Ok(out) if out.success() && out.stdout.trim() == "True" => Device::Cuda,
        Ok(out) if !out.success() => {
            log::debug!("CUDA probe failed: {}", out.diagnostics());
            Device::Cpu
        }
        Ok(_) => Device::Cpu,
        Err(e) => {
            log::debug!("CUDA probe could not run: {e}");
            Device::Cpu
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Synthesis request
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub text: String,
    pub model_name: String,
    pub output: PathBuf,
    pub device: Device,
}

impl SynthesisRequest {
    /// Arguments for the `tts` entry point, in order.
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--text".into(),
            self.text.clone().into(),
            "--model_name".into(),
            self.model_name.clone().into(),
            "--out_path".into(),
            self.output.clone().into(),
        ];
        if self.device == Device::Cuda {
            args.push("--use_cuda".into());
            args.push("true".into());
        }
        args
    }

    /// `Hello world` or the first 50 chars followed by `...`.
    pub fn preview(&self) -> String {
        let mut chars = self.text.chars();
        let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }
}

/// Run the synthesis inside `env`.
///
/// The child's stdout/stderr are the terminal's, so library errors appear
/// exactly as the library prints them.
pub fn synthesize(
    env: &IsolatedEnv,
    request: &SynthesisRequest,
    timeout: Option<Duration>,
) -> LauncherResult<()> {
    log::info!("Loading model: {}", request.model_name);
    log::info!("Using device: {}", request.device);
    println!("[INFO] Generating speech for: '{}'", request.preview());
    println!("[INFO] Output file: {}", request.output.display());

    let mut cmd = Command::new(env.tts_entry_point());
    cmd.args(request.to_args());
    run_inherited(cmd, timeout)
}

// ─────────────────────────────────────────────────────────────────────────────
// Model catalog
// ─────────────────────────────────────────────────────────────────────────────

/// Model identifiers mentioned in `tts --list_models` output, in order,
/// without duplicates.
pub fn parse_model_list(output: &str) -> Vec<String> {
    let mut models: Vec<String> = Vec::new();
    for caps in RE_MODEL_ID.captures_iter(output) {
        let id = caps[1].to_string();
        if !models.contains(&id) {
            models.push(id);
        }
    }
    models
}

/// Ask the library which models it can download.
pub fn list_remote_models(env: &IsolatedEnv) -> Result<Vec<String>> {
    let mut cmd = Command::new(env.tts_entry_point());
    cmd.arg("--list_models");
    let out = run_captured(cmd, Some(Duration::from_secs(120)))
        .context("Failed to run the model listing")?;
    if !out.success() {
        bail!("model listing failed: {}", out.diagnostics());
    }
    Ok(parse_model_list(&out.stdout))
}

// ─────────────────────────────────────────────────────────────────────────────
// Output report
// ─────────────────────────────────────────────────────────────────────────────

/// Sample count and duration of a WAV file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavSummary {
    pub samples: u32,
    pub sample_rate: u32,
    pub channels: u16,
}

impl WavSummary {
    pub fn seconds(&self) -> f32 {
        self.samples as f32 / self.sample_rate.max(1) as f32
    }
}

/// Read the header of the file the library produced.
pub fn inspect_wav(path: &Path) -> Result<WavSummary> {
    let reader = hound::WavReader::open(path)
        .with_context(|| format!("Cannot read WAV: {}", path.display()))?;
    let spec = reader.spec();
    Ok(WavSummary {
        samples: reader.duration(),
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
