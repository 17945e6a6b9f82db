use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{anyhow, Context, Result};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::feature::FeatureKind;

/// A viewed binary artifact. The payload lives in a named temp file so the
/// platform viewer can read it; the file is removed when the handle drops,
/// so holding the handle is the only thing keeping the artifact on disk.
#[derive(Debug)]
pub struct ViewHandle {
    kind: FeatureKind,
    file: NamedTempFile,
}

impl ViewHandle {
    /// Write the payload to a temp file carrying the artifact's extension
    /// (viewers pick the application from it).
    pub(crate) fn stage(kind: FeatureKind, payload: &[u8]) -> Result<Self> {
        let filename = kind
            .download_filename()
            .ok_or_else(|| anyhow!("{:?} has no binary artifact", kind))?;
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");

        let mut file = tempfile::Builder::new()
            .prefix("pitchdesk-")
            .suffix(&format!(".{extension}"))
            .tempfile()
            .context("could not create temp file for viewing")?;
        file.write_all(payload)
            .context("could not write artifact payload")?;
        file.flush()?;

        Ok(Self { kind, file })
    }

    /// Stage the payload and hand it to the platform viewer.
    pub fn open(kind: FeatureKind, payload: &[u8]) -> Result<Self> {
        let handle = Self::stage(kind, payload)?;
        open_path(handle.path())?;
        debug!(path = %handle.path().display(), "opened artifact for viewing");
        Ok(handle)
    }

    pub fn kind(&self) -> FeatureKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Save a downloaded artifact under its fixed per-kind filename in the user
/// downloads directory, falling back to the working directory. Returns the
/// path written. Nothing is retained in memory afterwards.
pub fn save_download(kind: FeatureKind, payload: &[u8]) -> Result<PathBuf> {
    let filename = kind
        .download_filename()
        .ok_or_else(|| anyhow!("{:?} has no binary artifact", kind))?;

    let dir = dirs::download_dir().unwrap_or_else(|| PathBuf::from("."));
    let path = dir.join(filename);
    std::fs::write(&path, payload)
        .with_context(|| format!("could not write {}", path.display()))?;
    debug!(path = %path.display(), bytes = payload.len(), "saved artifact");
    Ok(path)
}

/// Open a URL in the default browser.
pub fn open_url(url: &str) -> Result<()> {
    spawn_opener(url)
}

fn open_path(path: &Path) -> Result<()> {
    let path = path
        .to_str()
        .ok_or_else(|| anyhow!("artifact path is not valid UTF-8"))?;
    spawn_opener(path)
}

/// Hand a target to the platform opener without waiting on it. The TUI owns
/// the terminal, so stdout/stderr are discarded.
fn spawn_opener(target: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    let program = "open";
    #[cfg(target_os = "windows")]
    let program = "explorer";
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let program = "xdg-open";

    Command::new(program)
        .arg(target)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("could not launch {program}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_handle_removes_the_file_on_drop() {
        let handle = ViewHandle::stage(FeatureKind::Roadmap, b"%PDF-1.4").unwrap();
        let path = handle.path().to_path_buf();
        assert!(path.exists());

        drop(handle);
        assert!(!path.exists());
    }

    #[test]
    fn view_handle_keeps_the_artifact_extension() {
        let handle = ViewHandle::stage(FeatureKind::Video, &[0u8; 4]).unwrap();
        assert_eq!(handle.kind(), FeatureKind::Video);
        assert_eq!(
            handle.path().extension().and_then(|e| e.to_str()),
            Some("mp4")
        );
    }

    #[test]
    fn link_kinds_have_no_binary_artifact() {
        assert!(ViewHandle::stage(FeatureKind::Slides, b"x").is_err());
        assert!(save_download(FeatureKind::Slides, b"x").is_err());
        assert!(save_download(FeatureKind::Network, b"x").is_err());
    }
}
