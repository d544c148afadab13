//! Output naming: derives a `.wav` filename from the text being spoken.
//!
//! | Input                                             | Budget | Result              |
//! |---------------------------------------------------|--------|---------------------|
//! | `Hello world`                                     | 20     | `hello_world.wav`   |
//! | `How are you today?`                              | 20     | `how_are_you_today.wav` |
//! | `This is a very long sentence that keeps going`   | 15     | `this_is_a_very.wav` |
//!
//! The budget applies to the stem only; `.wav` is appended afterwards.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

/// Default cap on the derived stem length.
pub const DEFAULT_MAX_FILENAME_LENGTH: usize = 20;

/// Words taken from the start of the text.
const MAX_WORDS: usize = 5;

/// Stem used when nothing usable survives normalisation.
const FALLBACK_STEM: &str = "speech";

const EXTENSION: &str = ".wav";

// ─────────────────────────────────────────────────────────────────────────────
// Filename derivation
// ─────────────────────────────────────────────────────────────────────────────

/// Lowercase, drop everything outside `[a-z0-9 ]`, keep the first five words.
fn normalized_words(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == ' ')
        .collect();

    cleaned
        .split_whitespace()
        .take(MAX_WORDS)
        .map(str::to_owned)
        .collect()
}

/// Cut `stem` to at most `max_len` bytes, preferring the last `_` boundary.
///
/// The stem is pure ASCII at this point so byte offsets are char offsets.
fn truncate_at_boundary(stem: &str, max_len: usize) -> &str {
    if stem.len() <= max_len {
        return stem;
    }
    // An underscore sitting exactly at `max_len` is also a clean cut.
    match stem[..=max_len].rfind('_') {
        Some(cut) if cut > 0 => &stem[..cut],
        _ => &stem[..max_len],
    }
}

/// Derive the output filename (stem + `.wav`) for `text`.
///
/// Deterministic, at most `max_len` characters before the extension, and
/// restricted to `[a-z0-9_]`.  A `max_len` of 0 is treated as 1 so the
/// stem is never empty.
pub fn derive_filename(text: &str, max_len: usize) -> String {
    let max_len = max_len.max(1);
    let joined = normalized_words(text).join("_");
    let stem = truncate_at_boundary(&joined, max_len).trim_end_matches('_');

    let stem = if stem.is_empty() {
        &FALLBACK_STEM[..FALLBACK_STEM.len().min(max_len)]
    } else {
        stem
    };

    format!("{stem}{EXTENSION}")
}

// ─────────────────────────────────────────────────────────────────────────────
// Output target resolution
// ─────────────────────────────────────────────────────────────────────────────

fn ends_with_separator(path: &Path) -> bool {
    let s = path.as_os_str().to_string_lossy();
    s.ends_with('/') || s.ends_with(std::path::MAIN_SEPARATOR)
}

/// Turn the user's `-o` target into the final file path.
///
/// * `None` → derived filename in the working directory.
/// * existing directory → derived filename inside it.
/// * `dir/` that does not exist yet → directory is created, filename derived.
/// * anything else → used literally; missing parent directories are created.
pub fn resolve_output_path(target: Option<&Path>, text: &str, max_len: usize) -> Result<PathBuf> {
    let Some(target) = target else {
        return Ok(PathBuf::from(derive_filename(text, max_len)));
    };

    if target.is_dir() {
        return Ok(target.join(derive_filename(text, max_len)));
    }

    if ends_with_separator(target) {
        fs::create_dir_all(target)
            .with_context(|| format!("Failed to create directory {}", target.display()))?;
        log::info!("Created directory: {}", target.display());
        return Ok(target.join(derive_filename(text, max_len)));
    }

    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create parent directory {}", parent.display())
            })?;
            log::info!("Created parent directory: {}", parent.display());
        }
    }

    Ok(target.to_path_buf())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
