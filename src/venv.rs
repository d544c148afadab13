//! Isolated dependency environment: a Python `venv` holding the pinned
//! TTS stack.
//!
//! ## Layout
//! | Platform | Executables        | site-packages                     |
//! |----------|--------------------|-----------------------------------|
//! | Unix     | `<env>/bin/`       | `<env>/lib/python3.X/site-packages` |
//! | Windows  | `<env>\Scripts\`   | `<env>\Lib\site-packages`         |
//!
//! ## Setup sequence ([`IsolatedEnv::ensure`])
//! 1. Create the env with `<python> -m venv` if the directory is missing.
//! 2. Import check: `import TTS, torch`.  Passing → done.
//! 3. Upgrade pip (best effort), install the pinned requirements.
//! 4. Apply compatibility patches, re-run the import check.

use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
    time::Duration,
};

use crate::{
    error::{LauncherError, LauncherResult},
    patch::{self, CompatPatch},
    process::{self, run_captured},
    runtime::{Installer, PythonRuntime},
};

/// Import statement proving the environment is usable.
const IMPORT_CHECK: &str = "import TTS, torch";

#[cfg(windows)]
const BIN_DIR: &str = "Scripts";
#[cfg(not(windows))]
const BIN_DIR: &str = "bin";

/// Handle to a (possibly not yet created) virtual environment.
#[derive(Debug, Clone)]
pub struct IsolatedEnv {
    root: PathBuf,
}

/// What [`IsolatedEnv::ensure`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupReport {
    pub created: bool,
    pub installed: bool,
    pub patched: usize,
}

impl IsolatedEnv {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    // ── Paths ─────────────────────────────────────────────────────────────────

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join(BIN_DIR)
    }

    fn executable(&self, name: &str) -> PathBuf {
        self.bin_dir().join(format!("{name}{}", std::env::consts::EXE_SUFFIX))
    }

    pub fn python(&self) -> PathBuf {
        self.executable("python")
    }

    pub fn pip(&self) -> PathBuf {
        self.executable("pip")
    }

    /// The library's console entry point.
    pub fn tts_entry_point(&self) -> PathBuf {
        self.executable("tts")
    }

    /// Every `site-packages` directory inside the env.
    pub fn site_packages(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();

        let windows_style = self.root.join("Lib").join("site-packages");
        if windows_style.is_dir() {
            dirs.push(windows_style);
        }

        if let Ok(entries) = fs::read_dir(self.root.join("lib")) {
            let mut found: Vec<PathBuf> = entries
                .filter_map(|e| e.ok())
                .filter(|e| e.file_name().to_string_lossy().starts_with("python"))
                .map(|e| e.path().join("site-packages"))
                .filter(|p| p.is_dir())
                .collect();
            found.sort();
            dirs.extend(found);
        }

        dirs
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    /// `pip install <requirements>` targeting the env.
    ///
    /// Uses `<env>/bin/pip` when the env has one.  An env created without
    /// pip falls back to the installer found on the host: `-m pip` through
    /// the env's interpreter, or the host `pip` pointed at it with
    /// `--python`.
    pub fn install_command(&self, runtime: &PythonRuntime, requirements: &[String]) -> Command {
        let mut cmd = if self.pip().exists() {
            Command::new(self.pip())
        } else {
            match &runtime.installer {
                Installer::Module => {
                    let mut cmd = Command::new(self.python());
                    cmd.args(["-m", "pip"]);
                    cmd
                }
                Installer::Executable(pip) => {
                    let mut cmd = Command::new(pip);
                    cmd.arg("--python").arg(self.python());
                    cmd
                }
            }
        };
        cmd.arg("install").args(requirements);
        cmd
    }

    fn upgrade_pip_command(&self) -> Command {
        let mut cmd = Command::new(self.python());
        cmd.args(["-m", "pip", "install", "--upgrade", "pip"]);
        cmd
    }

    fn import_check_command(&self) -> Command {
        let mut cmd = Command::new(self.python());
        cmd.args(["-c", IMPORT_CHECK]);
        cmd
    }

    // ── Setup steps ───────────────────────────────────────────────────────────

    /// Create the env with `runtime`'s interpreter.
    pub fn create(&self, runtime: &PythonRuntime) -> LauncherResult<()> {
        println!("[INFO] Creating virtual environment {}…", self.root.display());
        let mut cmd = Command::new(&runtime.path);
        cmd.args(["-m", "venv"]).arg(&self.root);

        let out = run_captured(cmd, None).map_err(|e| LauncherError::VenvCreation {
            path: self.root.clone(),
            detail: e.to_string(),
        })?;
        if !out.success() {
            return Err(LauncherError::VenvCreation {
                path: self.root.clone(),
                detail: out.diagnostics().to_string(),
            });
        }
        Ok(())
    }

    /// `true` when `import TTS, torch` succeeds inside the env.
    pub fn dependencies_ready(&self) -> bool {
        if !self.python().exists() {
            return false;
        }
        match run_captured(self.import_check_command(), None) {
            Ok(out) if out.success() => true,
            Ok(out) => {
                log::debug!("Import check failed: {}", out.diagnostics());
                false
            }
            Err(e) => {
                log::debug!("Import check could not run: {e}");
                false
            }
        }
    }

    /// Install `requirements`; pip upgrade failures are only warnings.
    pub fn install(
        &self,
        runtime: &PythonRuntime,
        requirements: &[String],
        timeout: Option<Duration>,
    ) -> LauncherResult<()> {
        println!("[INFO] Upgrading pip…");
        match run_captured(self.upgrade_pip_command(), timeout) {
            Ok(out) if out.success() => {}
            Ok(out) => log::warn!("pip upgrade failed: {}", out.diagnostics()),
            Err(e) => log::warn!("pip upgrade failed: {e}"),
        }

        println!("[INFO] Installing TTS and dependencies (this may take several minutes)…");
        let cmd = self.install_command(runtime, requirements);
        let retry = process::render(&cmd);
        let fail = |detail: String| LauncherError::DependencyInstall {
            detail,
            retry: retry.clone(),
        };

        let out = run_captured(cmd, timeout).map_err(|e| fail(e.to_string()))?;
        if !out.success() {
            return Err(fail(out.diagnostics().to_string()));
        }
        Ok(())
    }

    /// Create / verify / install / patch as needed.
    pub fn ensure(
        &self,
        runtime: &PythonRuntime,
        requirements: &[String],
        patches: &[CompatPatch],
        install_timeout: Option<Duration>,
    ) -> LauncherResult<SetupReport> {
        let mut report = SetupReport { created: false, installed: false, patched: 0 };

        if self.exists() {
            println!("[INFO] Virtual environment found: {}", self.root.display());
        } else {
            self.create(runtime)?;
            report.created = true;
        }

        if self.dependencies_ready() {
            log::info!("Dependencies OK");
            return Ok(report);
        }

        self.install(runtime, requirements, install_timeout)?;
        report.installed = true;

        report.patched = patch::apply_all(patches, &self.site_packages());

        if !self.dependencies_ready() {
            log::warn!(
                "`{IMPORT_CHECK}` still fails after installation; synthesis will likely fail"
            );
        }
        println!("[INFO] Virtual environment and dependencies ready");
        Ok(report)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::PythonVersion;

    fn host_runtime(installer: Installer) -> PythonRuntime {
        PythonRuntime {
            path: PathBuf::from("python3"),
            version: PythonVersion::new(3, 9, 7),
            installer,
        }
    }

    fn strings(cmd: &Command) -> Vec<String> {
        std::iter::once(cmd.get_program())
            .chain(cmd.get_args())
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_paths() {
        let env = IsolatedEnv::new("tts_venv");
        let bin = Path::new("tts_venv").join(BIN_DIR);
        let sfx = std::env::consts::EXE_SUFFIX;
        assert_eq!(env.python(), bin.join(format!("python{sfx}")));
        assert_eq!(env.pip(), bin.join(format!("pip{sfx}")));
        assert_eq!(env.tts_entry_point(), bin.join(format!("tts{sfx}")));
    }

    #[test]
    fn test_site_packages_discovery() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("lib/python3.9/site-packages")).unwrap();
        fs::create_dir_all(root.join("lib/python3.11/site-packages")).unwrap();
        fs::create_dir_all(root.join("lib/not-python")).unwrap();
        fs::create_dir_all(root.join("Lib/site-packages")).unwrap();

        let env = IsolatedEnv::new(root);
        let found = env.site_packages();
        assert_eq!(
            found,
            vec![
                root.join("Lib/site-packages"),
                root.join("lib/python3.11/site-packages"),
                root.join("lib/python3.9/site-packages"),
            ]
        );
    }

    #[test]
    fn test_site_packages_empty_env() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(IsolatedEnv::new(tmp.path().join("missing")).site_packages().is_empty());
    }

    #[test]
    fn test_install_command_uses_env_pip() {
        let tmp = tempfile::tempdir().unwrap();
        let env = IsolatedEnv::new(tmp.path());
        fs::create_dir_all(env.bin_dir()).unwrap();
        fs::write(env.pip(), "").unwrap();

        let reqs = vec!["TTS>=0.21.0,<0.22.0".to_string(), "numpy<2.0.0".to_string()];
        let cmd = env.install_command(&host_runtime(Installer::Module), &reqs);
        let args = strings(&cmd);
        assert_eq!(args[0], env.pip().to_string_lossy());
        assert_eq!(&args[1..], ["install", "TTS>=0.21.0,<0.22.0", "numpy<2.0.0"]);
    }

    #[test]
    fn test_install_command_without_env_pip_uses_module() {
        let env = IsolatedEnv::new("no-such-env-for-tts-launcher");
        let reqs = vec!["numpy<2.0.0".to_string()];
        let cmd = env.install_command(&host_runtime(Installer::Module), &reqs);
        let args = strings(&cmd);
        assert_eq!(args[0], env.python().to_string_lossy());
        assert_eq!(&args[1..], ["-m", "pip", "install", "numpy<2.0.0"]);
    }

    #[test]
    fn test_install_command_without_env_pip_targets_env_python() {
        let env = IsolatedEnv::new("no-such-env-for-tts-launcher");
        let reqs = vec!["numpy<2.0.0".to_string()];
        let runtime = host_runtime(Installer::Executable(PathBuf::from("/usr/bin/pip3")));
        let args = strings(&env.install_command(&runtime, &reqs));
        assert_eq!(args[0], "/usr/bin/pip3");
        assert_eq!(args[1], "--python");
        assert_eq!(args[2], env.python().to_string_lossy());
        assert_eq!(&args[3..], ["install", "numpy<2.0.0"]);
    }

    #[test]
    fn test_dependencies_not_ready_without_interpreter() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(!IsolatedEnv::new(tmp.path()).dependencies_ready());
    }
}
