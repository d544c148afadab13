//! Command-line surface (`cli` feature).

use std::path::PathBuf;

use clap::Parser;

use crate::{
    config::LauncherConfig,
    error::LauncherResult,
    launcher::Invocation,
};

const EXAMPLES: &str = "\
Examples:
  tts-launcher \"Hello world\"                    # Outputs: hello_world.wav
  tts-launcher \"How are you today\"              # Outputs: how_are_you_today.wav
  tts-launcher \"This is a very long sentence\" --output custom.wav
  tts-launcher \"Compatibility\" -o audio/        # Outputs: audio/compatibility.wav
  tts-launcher \"Hello\" --check-updates
  tts-launcher --info";

fn parse_length(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".into()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

#[derive(Debug, Parser)]
#[command(name = "tts-launcher", version)]
#[command(about = "Text-to-speech launcher: sets up Coqui TTS in a virtual environment and runs it")]
#[command(after_help = EXAMPLES)]
pub struct Cli {
    /// Text to convert to speech (required unless --info)
    pub text: Option<String>,

    /// TTS model to use [default: tts_models/en/ljspeech/vits]
    #[arg(long)]
    pub model_name: Option<String>,

    /// Output file or directory (auto-named from the text if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Check for model updates before processing
    #[arg(long)]
    pub check_updates: bool,

    /// Force CPU usage instead of GPU
    #[arg(long)]
    pub cpu: bool,

    /// Display model information and exit
    #[arg(long)]
    pub info: bool,

    /// Maximum length for the auto-generated filename [default: 20]
    #[arg(long, value_parser = parse_length)]
    pub max_filename_length: Option<usize>,

    /// Abort synthesis after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Virtual environment directory [default: tts_venv]
    #[arg(long)]
    pub venv_dir: Option<PathBuf>,

    /// JSON config file (also read from $TTS_LAUNCHER_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Merge config file and flags; flags win.
    pub fn resolve(&self) -> LauncherResult<(LauncherConfig, Invocation)> {
        let mut config = LauncherConfig::resolve(self.config.as_deref())?;
        if let Some(dir) = &self.venv_dir {
            config.venv_dir = dir.clone();
        }
        if let Some(secs) = self.timeout {
            config.synthesis_timeout_secs = Some(secs);
        }

        let invocation = Invocation {
            text: self.text.clone(),
            model_name: self
                .model_name
                .clone()
                .unwrap_or_else(|| config.default_model.clone()),
            output: self.output.clone(),
            check_updates: self.check_updates,
            force_cpu: self.cpu,
            info: self.info,
            max_filename_length: self.max_filename_length.unwrap_or(config.max_filename_length),
        };
        Ok((config, invocation))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
