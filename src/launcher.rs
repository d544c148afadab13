//! End-to-end flow: probe → environment → (info | synthesis).

use std::path::PathBuf;

use anyhow::Result;

use crate::{
    config::{LauncherConfig, DEFAULT_MODEL},
    error::{LauncherError, LauncherResult},
    filename::resolve_output_path,
    forward::{self, detect_device, Device, SynthesisRequest},
    models::{ModelStore, MODEL_PATH_ENV},
    patch::BUILTIN_PATCHES,
    runtime::{self, PythonRuntime},
    updates::{OfflineCatalog, UpdateChecker},
    venv::IsolatedEnv,
};

/// English models listed by the info report.
const INFO_REMOTE_LIMIT: usize = 10;

/// One invocation's worth of options, after config and flags are merged.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub text: Option<String>,
    pub model_name: String,
    pub output: Option<PathBuf>,
    pub check_updates: bool,
    pub force_cpu: bool,
    pub info: bool,
    pub max_filename_length: usize,
}

impl Default for Invocation {
    fn default() -> Self {
        Self {
            text: None,
            model_name: DEFAULT_MODEL.to_string(),
            output: None,
            check_updates: false,
            force_cpu: false,
            info: false,
            max_filename_length: crate::filename::DEFAULT_MAX_FILENAME_LENGTH,
        }
    }
}

impl Invocation {
    /// Non-blank text, or [`LauncherError::MissingText`] unless `--info`.
    pub fn validate(&self) -> LauncherResult<()> {
        let has_text = self.text.as_deref().map_or(false, |t| !t.trim().is_empty());
        if !self.info && !has_text {
            return Err(LauncherError::MissingText);
        }
        Ok(())
    }
}

pub struct Launcher {
    config: LauncherConfig,
    env: IsolatedEnv,
    store: ModelStore,
}

impl Launcher {
    pub fn new(config: LauncherConfig) -> Self {
        let env = IsolatedEnv::new(config.venv_dir.clone());
        Self {
            config,
            env,
            store: ModelStore::from_env(),
        }
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    pub fn env(&self) -> &IsolatedEnv {
        &self.env
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    /// Locate Python and make sure the environment is ready.
    pub fn prepare(&self) -> Result<PythonRuntime> {
        let minimum = self.config.min_python_version().map_err(anyhow::Error::msg)?;
        let recommended = self
            .config
            .recommended_python_version()
            .map_err(anyhow::Error::msg)?;

        let runtime = runtime::probe(
            &self.config.python_candidates,
            &self.config.installer_candidates,
            minimum,
            recommended,
        )?;
        self.env.ensure(
            &runtime,
            &self.config.requirements,
            BUILTIN_PATCHES,
            self.config.install_timeout(),
        )?;
        Ok(runtime)
    }

    /// Full invocation.  Validation runs before any process is spawned.
    pub fn run(&self, inv: &Invocation) -> Result<()> {
        inv.validate()?;
        self.prepare()?;

        if inv.info {
            self.show_model_info(&inv.model_name);
            return Ok(());
        }

        // `validate` guarantees text is present.
        let text = inv.text.as_deref().unwrap_or_default();
        self.generate(text, inv)
    }

    fn generate(&self, text: &str, inv: &Invocation) -> Result<()> {
        let output = resolve_output_path(inv.output.as_deref(), text, inv.max_filename_length)?;

        if inv.check_updates {
            log::info!("Checking for model updates...");
            let checker = UpdateChecker::new(&self.store);
            if checker.check_for_updates(&inv.model_name, &OfflineCatalog, false) {
                println!("[INFO] A newer version of {} is available", inv.model_name);
            }
            checker.cleanup_cache();
        }

        let device = if inv.force_cpu { Device::Cpu } else { detect_device(&self.env) };

        println!("[INFO] Model location: {}", self.store.root().display());
        println!(
            "[INFO] Model files stored in: {}",
            self.store.model_dir(&inv.model_name).display()
        );

        let request = SynthesisRequest {
            text: text.to_string(),
            model_name: inv.model_name.clone(),
            output: output.clone(),
            device,
        };
        forward::synthesize(&self.env, &request, self.config.synthesis_timeout())?;

        match forward::inspect_wav(&output) {
            Ok(wav) => println!(
                "[INFO] Speech generated successfully: {} ({} samples, {:.2} s)",
                output.display(),
                wav.samples,
                wav.seconds()
            ),
            Err(e) => {
                log::warn!("{e:#}");
                println!("[INFO] Speech generated: {}", output.display());
            }
        }
        Ok(())
    }

    /// Print model paths, local models and a sample of remote models.
    pub fn show_model_info(&self, model_name: &str) {
        let root = self.store.root();
        println!("TTS Model Information:");
        println!("  Model name: {model_name}");
        println!("  Model storage path: {}", root.display());
        println!("  Model directory: {}", self.store.model_dir(model_name).display());
        println!(
            "  Custom model path ({MODEL_PATH_ENV}): {}",
            std::env::var(MODEL_PATH_ENV).unwrap_or_else(|_| "Not set".to_string())
        );

        let local = self.store.list_local_models();
        if local.is_empty() {
            println!("\nNo local models found");
        } else {
            println!("\nLocal models ({} total):", local.len());
            for model in &local {
                println!("  - {}", model.name);
                if let Some(date) = model.last_modified_date() {
                    println!("    Last modified: {date}");
                }
            }
        }

        match forward::list_remote_models(&self.env) {
            Ok(models) => {
                println!("\nAvailable remote models ({} total):", models.len());
                let english: Vec<&String> =
                    models.iter().filter(|m| m.starts_with("tts_models/en/")).collect();
                for model in english.iter().take(INFO_REMOTE_LIMIT) {
                    println!("  - {model}");
                }
                if english.len() > INFO_REMOTE_LIMIT {
                    println!(
                        "  ... and {} more English models",
                        english.len() - INFO_REMOTE_LIMIT
                    );
                }
            }
            Err(e) => log::warn!("Could not list remote models: {e:#}"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_text_rejected() {
        let inv = Invocation::default();
        assert!(matches!(inv.validate(), Err(LauncherError::MissingText)));
    }

    #[test]
    fn test_blank_text_rejected() {
        let inv = Invocation { text: Some("   ".into()), ..Invocation::default() };
        assert!(matches!(inv.validate(), Err(LauncherError::MissingText)));
    }

    #[test]
    fn test_info_without_text_allowed() {
        let inv = Invocation { info: true, ..Invocation::default() };
        assert!(inv.validate().is_ok());
    }

    #[test]
    fn test_text_accepted() {
        let inv = Invocation { text: Some("Hello world".into()), ..Invocation::default() };
        assert!(inv.validate().is_ok());
    }

    #[test]
    fn test_run_validates_before_probing() {
        // A candidate list that cannot resolve would fail the probe; the
        // missing-text error must win because nothing is spawned first.
        let config = LauncherConfig {
            python_candidates: vec!["no-such-python-for-tts-launcher".into()],
            ..LauncherConfig::default()
        };
        let err = Launcher::new(config).run(&Invocation::default()).unwrap_err();
        assert!(matches!(err.downcast_ref::<LauncherError>(), Some(LauncherError::MissingText)));
    }

    #[test]
    fn test_missing_python_is_runtime_not_found() {
        let config = LauncherConfig {
            python_candidates: vec!["no-such-python-for-tts-launcher".into()],
            ..LauncherConfig::default()
        };
        let inv = Invocation { text: Some("Hello".into()), ..Invocation::default() };
        let err = Launcher::new(config).run(&inv).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LauncherError>(),
            Some(LauncherError::RuntimeNotFound { .. })
        ));
    }
}
