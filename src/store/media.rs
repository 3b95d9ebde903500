//! Filesystem media store and ffprobe-backed duration probe.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use eyre::{eyre, Result, WrapErr};
use serde::Deserialize;
use tracing::debug;

use crate::store::{MediaProbe, MediaStore};

/// Stores artifacts as files under a base directory. Locations are the file
/// paths, so `delete` on the reject path removes the partial artifact.
pub struct FsMediaStore {
    base_dir: PathBuf,
}

impl FsMediaStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl MediaStore for FsMediaStore {
    fn store(&self, filename: &str, data: &[u8]) -> Result<String> {
        fs::create_dir_all(&self.base_dir).wrap_err("creating uploads directory")?;
        let path = self.base_dir.join(filename);
        fs::write(&path, data).wrap_err("writing artifact")?;
        debug!(path = %path.display(), bytes = data.len(), "stored artifact");
        Ok(path.to_string_lossy().into_owned())
    }

    fn delete(&self, location: &str) -> Result<()> {
        fs::remove_file(Path::new(location)).wrap_err("deleting artifact")
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Reads playback length by shelling out to `ffprobe`.
pub struct FfprobeProbe {
    binary: String,
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self {
            binary: "ffprobe".to_string(),
        }
    }
}

impl FfprobeProbe {
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl MediaProbe for FfprobeProbe {
    fn duration_secs(&self, location: &str) -> Result<f64> {
        let output = Command::new(&self.binary)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "json",
                location,
            ])
            .output()
            .wrap_err("running ffprobe")?;
        if !output.status.success() {
            return Err(eyre!(
                "ffprobe exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let parsed: FfprobeOutput =
            serde_json::from_slice(&output.stdout).wrap_err("parsing ffprobe output")?;
        parsed
            .format
            .and_then(|f| f.duration)
            .ok_or_else(|| eyre!("ffprobe reported no duration"))?
            .parse::<f64>()
            .wrap_err("parsing ffprobe duration")
    }
}
