//! Launcher settings.
//!
//! Every field has a default, so a config file only needs the keys it
//! changes:
//!
//! ```json
//! { "venv_dir": "/opt/tts_venv", "synthesis_timeout_secs": 300 }
//! ```
//!
//! Precedence: built-in defaults < JSON file < command-line flags.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{LauncherError, LauncherResult},
    filename::DEFAULT_MAX_FILENAME_LENGTH,
    runtime::PythonVersion,
};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "TTS_LAUNCHER_CONFIG";

/// Voice used when `--model-name` is not given.
pub const DEFAULT_MODEL: &str = "tts_models/en/ljspeech/vits";

fn default_venv_dir() -> PathBuf {
    PathBuf::from("tts_venv")
}

fn default_python_candidates() -> Vec<String> {
    vec!["python3".into(), "python".into()]
}

fn default_installer_candidates() -> Vec<String> {
    vec!["pip3".into(), "pip".into()]
}

fn default_min_python() -> String {
    "3.8".into()
}

fn default_recommended_python() -> String {
    "3.10".into()
}

fn default_requirements() -> Vec<String> {
    [
        "TTS>=0.21.0,<0.22.0",
        "numpy<2.0.0",
        "torch>=2.0.0,<2.3.0",
        "urllib3<2.0.0",
        "torchaudio",
    ]
    .map(String::from)
    .to_vec()
}

fn default_model() -> String {
    DEFAULT_MODEL.into()
}

fn default_max_filename_length() -> usize {
    DEFAULT_MAX_FILENAME_LENGTH
}

fn default_install_timeout_secs() -> Option<u64> {
    Some(600)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LauncherConfig {
    /// Isolated environment directory (created on first run).
    #[serde(default = "default_venv_dir")]
    pub venv_dir: PathBuf,

    #[serde(default = "default_python_candidates")]
    pub python_candidates: Vec<String>,

    #[serde(default = "default_installer_candidates")]
    pub installer_candidates: Vec<String>,

    /// Oldest accepted interpreter, `"MAJOR.MINOR"`.
    #[serde(default = "default_min_python")]
    pub min_python: String,

    /// Below this a warning is printed.
    #[serde(default = "default_recommended_python")]
    pub recommended_python: String,

    /// pip requirement specifiers installed into the environment.
    #[serde(default = "default_requirements")]
    pub requirements: Vec<String>,

    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default = "default_max_filename_length")]
    pub max_filename_length: usize,

    /// Upper bound for the synthesis call; `None` waits indefinitely.
    #[serde(default)]
    pub synthesis_timeout_secs: Option<u64>,

    /// Upper bound for each pip invocation.
    #[serde(default = "default_install_timeout_secs")]
    pub install_timeout_secs: Option<u64>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            venv_dir: default_venv_dir(),
            python_candidates: default_python_candidates(),
            installer_candidates: default_installer_candidates(),
            min_python: default_min_python(),
            recommended_python: default_recommended_python(),
            requirements: default_requirements(),
            default_model: default_model(),
            max_filename_length: default_max_filename_length(),
            synthesis_timeout_secs: None,
            install_timeout_secs: default_install_timeout_secs(),
        }
    }
}

impl LauncherConfig {
    /// Read and validate a JSON config file.
    pub fn load(path: &Path) -> LauncherResult<Self> {
        let invalid = |detail: String| LauncherError::InvalidConfig {
            path: path.to_path_buf(),
            detail,
        };

        let bytes = fs::read(path).map_err(|e| invalid(e.to_string()))?;
        let config: Self = serde_json::from_slice(&bytes).map_err(|e| invalid(e.to_string()))?;
        config.validate().map_err(invalid)?;
        Ok(config)
    }

    /// `explicit` path, else `$TTS_LAUNCHER_CONFIG`, else defaults.
    pub fn resolve(explicit: Option<&Path>) -> LauncherResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => Self::load(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.python_candidates.is_empty() {
            return Err("python_candidates must not be empty".into());
        }
        if self.max_filename_length == 0 {
            return Err("max_filename_length must be at least 1".into());
        }
        self.min_python_version()?;
        self.recommended_python_version()?;
        Ok(())
    }

    fn parse_version(field: &str, value: &str) -> Result<PythonVersion, String> {
        PythonVersion::parse(&format!("Python {value}"))
            .ok_or_else(|| format!("{field}: expected \"MAJOR.MINOR\", got {value:?}"))
    }

    pub fn min_python_version(&self) -> Result<PythonVersion, String> {
        Self::parse_version("min_python", &self.min_python)
    }

    pub fn recommended_python_version(&self) -> Result<PythonVersion, String> {
        Self::parse_version("recommended_python", &self.recommended_python)
    }

    pub fn synthesis_timeout(&self) -> Option<Duration> {
        self.synthesis_timeout_secs.map(Duration::from_secs)
    }

    pub fn install_timeout(&self) -> Option<Duration> {
        self.install_timeout_secs.map(Duration::from_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = LauncherConfig::default();
        assert_eq!(c.venv_dir, PathBuf::from("tts_venv"));
        assert_eq!(c.python_candidates, ["python3", "python"]);
        assert_eq!(c.installer_candidates, ["pip3", "pip"]);
        assert_eq!(c.default_model, "tts_models/en/ljspeech/vits");
        assert_eq!(c.max_filename_length, 20);
        assert_eq!(c.min_python_version().unwrap(), PythonVersion::new(3, 8, 0));
        assert!(c.requirements.iter().any(|r| r.starts_with("TTS>=0.21.0")));
        assert_eq!(c.synthesis_timeout(), None);
        assert_eq!(c.install_timeout(), Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_empty_json_equals_defaults() {
        let c: LauncherConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(c, LauncherConfig::default());
    }

    #[test]
    fn test_load_partial_override() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("launcher.json");
        fs::write(&path, r#"{ "venv_dir": "/opt/env", "synthesis_timeout_secs": 300 }"#).unwrap();

        let c = LauncherConfig::load(&path).unwrap();
        assert_eq!(c.venv_dir, PathBuf::from("/opt/env"));
        assert_eq!(c.synthesis_timeout(), Some(Duration::from_secs(300)));
        assert_eq!(c.max_filename_length, 20);
    }

    #[test]
    fn test_load_rejects_bad_values() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.json");

        fs::write(&path, r#"{ "max_filename_length": 0 }"#).unwrap();
        assert!(matches!(LauncherConfig::load(&path), Err(LauncherError::InvalidConfig { .. })));

        fs::write(&path, r#"{ "min_python": "three" }"#).unwrap();
        assert!(matches!(LauncherConfig::load(&path), Err(LauncherError::InvalidConfig { .. })));

        fs::write(&path, "not json").unwrap();
        assert!(matches!(LauncherConfig::load(&path), Err(LauncherError::InvalidConfig { .. })));
    }

    #[test]
    fn test_load_missing_file() {
        let err = LauncherConfig::load(Path::new("/nonexistent/launcher.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/launcher.json"));
    }
}
