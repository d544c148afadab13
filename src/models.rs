//! Model store: where the TTS library keeps downloaded models.
//!
//! The library stores `tts_models/en/ljspeech/vits` under
//! `<store>/tts_models--en--ljspeech--vits/`.  The store root is
//! `$COQUI_MODEL_PATH` when that points at an existing directory, otherwise
//! `<user data dir>/tts` (`~/.local/share/tts` on Linux).

use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use chrono::{DateTime, Local};

/// Environment override for the store root.
pub const MODEL_PATH_ENV: &str = "COQUI_MODEL_PATH";

/// Extensions counted as model files.
const MODEL_FILE_EXTENSIONS: &[&str] = &["pth", "pt", "json", "ckpt"];

/// `tts_models/en/ljspeech/vits` → `tts_models--en--ljspeech--vits`.
pub fn model_dir_name(model_name: &str) -> String {
    model_name.replace('/', "--")
}

/// Inverse of [`model_dir_name`].
pub fn model_name_from_dir(dir_name: &str) -> String {
    dir_name.replace("--", "/")
}

/// A model found on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalModel {
    pub name: String,
    pub path: PathBuf,
    /// File names of model artefacts, sorted.
    pub files: Vec<String>,
    /// Newest modification time among `files`.
    pub last_modified: Option<SystemTime>,
}

impl LocalModel {
    /// `YYYY-MM-DD HH:MM:SS` in local time.
    pub fn last_modified_date(&self) -> Option<String> {
        self.last_modified.map(|t| {
            DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M:%S").to_string()
        })
    }
}

#[derive(Debug, Clone)]
pub struct ModelStore {
    root: PathBuf,
}

impl ModelStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The library's default store location.
    pub fn default_root() -> PathBuf {
        dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tts")
    }

    /// `$COQUI_MODEL_PATH` if it exists, else [`default_root`](Self::default_root).
    pub fn from_env() -> Self {
        match std::env::var_os(MODEL_PATH_ENV).map(PathBuf::from) {
            Some(custom) if custom.exists() => Self::new(custom),
            Some(custom) => {
                log::warn!(
                    "{MODEL_PATH_ENV}={} does not exist, using the default model path",
                    custom.display()
                );
                Self::new(Self::default_root())
            }
            None => Self::new(Self::default_root()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn model_dir(&self, model_name: &str) -> PathBuf {
        self.root.join(model_dir_name(model_name))
    }

    /// Inspect `model_name` on disk; `None` when its directory is missing.
    pub fn local_model(&self, model_name: &str) -> Option<LocalModel> {
        let dir = self.model_dir(model_name);
        if !dir.is_dir() {
            return None;
        }

        let mut files = Vec::new();
        let mut last_modified: Option<SystemTime> = None;

        if let Ok(entries) = fs::read_dir(&dir) {
            for entry in entries.filter_map(|e| e.ok()) {
                let path = entry.path();
                let is_model_file = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map_or(false, |ext| MODEL_FILE_EXTENSIONS.contains(&ext));
                if !is_model_file || !path.is_file() {
                    continue;
                }
                if let Ok(mtime) = entry.metadata().and_then(|m| m.modified()) {
                    last_modified = Some(last_modified.map_or(mtime, |t| t.max(mtime)));
                }
                files.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        files.sort();

        Some(LocalModel {
            name: model_name.to_string(),
            path: dir,
            files,
            last_modified,
        })
    }

    /// Every model directory in the store (hidden entries skipped), by name.
    pub fn list_local_models(&self) -> Vec<LocalModel> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };

        let mut models: Vec<LocalModel> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| !name.starts_with('.'))
            .filter_map(|name| self.local_model(&model_name_from_dir(&name)))
            .collect();
        models.sort_by(|a, b| a.name.cmp(&b.name));
        models
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_dir_name_round_trip() {
        assert_eq!(model_dir_name("tts_models/en/ljspeech/vits"), "tts_models--en--ljspeech--vits");
        assert_eq!(model_name_from_dir("tts_models--en--vctk--vits"), "tts_models/en/vctk/vits");
    }

    #[test]
    fn test_local_model_missing() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(ModelStore::new(tmp.path()).local_model("nonexistent/model").is_none());
    }

    #[test]
    fn test_local_model_files() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("tts_models--en--ljspeech--vits");
        fs::create_dir_all(&dir).unwrap();
        touch(&dir.join("model.pth"));
        touch(&dir.join("config.json"));
        touch(&dir.join("README.md"));

        let info = ModelStore::new(tmp.path()).local_model("tts_models/en/ljspeech/vits").unwrap();
        assert_eq!(info.name, "tts_models/en/ljspeech/vits");
        assert_eq!(info.path, dir);
        assert_eq!(info.files, ["config.json", "model.pth"]);
        assert!(info.last_modified.is_some());
        assert_eq!(info.last_modified_date().unwrap().len(), "2024-01-01 00:00:00".len());
    }

    #[test]
    fn test_local_model_without_files_has_no_date() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("tts_models--en--empty")).unwrap();
        let info = ModelStore::new(tmp.path()).local_model("tts_models/en/empty").unwrap();
        assert!(info.files.is_empty());
        assert_eq!(info.last_modified, None);
        assert_eq!(info.last_modified_date(), None);
    }

    #[test]
    fn test_list_local_models() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["tts_models--en--vctk--vits", "tts_models--en--ljspeech--vits", ".cache"] {
            let dir = tmp.path().join(name);
            fs::create_dir_all(&dir).unwrap();
            touch(&dir.join("model.pth"));
        }
        touch(&tmp.path().join(".model_cache.json"));

        let names: Vec<String> = ModelStore::new(tmp.path())
            .list_local_models()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, ["tts_models/en/ljspeech/vits", "tts_models/en/vctk/vits"]);
    }

    #[test]
    fn test_list_missing_store() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(ModelStore::new(tmp.path().join("nope")).list_local_models().is_empty());
    }
}
