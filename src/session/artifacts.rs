use std::{fs, path::PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;

/// Destination for a finished recording. Returns a reference the session
/// stores, e.g. a URL.
pub trait ArtifactSink: Send + Sync {
    fn store(&self, session_id: &str, bytes: &[u8], extension: &str) -> Result<String>;
}

/// Writes recordings into a directory served under `public_prefix`.
pub struct FsArtifactSink {
    root: PathBuf,
    public_prefix: String,
}

impl FsArtifactSink {
    pub fn new(root: PathBuf, public_prefix: impl Into<String>) -> Self {
        Self {
            root,
            public_prefix: public_prefix.into(),
        }
    }
}

fn is_safe_component(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl ArtifactSink for FsArtifactSink {
    fn store(&self, session_id: &str, bytes: &[u8], extension: &str) -> Result<String> {
        if !is_safe_component(session_id) {
            bail!("invalid session id for artifact: {session_id:?}");
        }
        if !is_safe_component(extension) {
            bail!("invalid artifact extension: {extension:?}");
        }
        if bytes.is_empty() {
            bail!("refusing to store empty artifact for session {session_id}");
        }

        fs::create_dir_all(&self.root).with_context(|| {
            format!("failed to create artifact directory {}", self.root.display())
        })?;

        let file_name = format!(
            "session_{session_id}_{}.{extension}",
            Utc::now().timestamp_millis()
        );
        let path = self.root.join(&file_name);
        fs::write(&path, bytes)
            .with_context(|| format!("failed to write artifact {}", path.display()))?;

        let prefix = self.public_prefix.trim_matches('/');
        Ok(if prefix.is_empty() {
            format!("/{file_name}")
        } else {
            format!("/{prefix}/{file_name}")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_file_and_returns_public_path() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsArtifactSink::new(dir.path().join("uploads"), "/uploads/");

        let url = sink.store("abc-123", b"webm bytes", "webm").unwrap();
        assert!(url.starts_with("/uploads/session_abc-123_"));
        assert!(url.ends_with(".webm"));

        let file_name = url.trim_start_matches("/uploads/");
        let written = fs::read(dir.path().join("uploads").join(file_name)).unwrap();
        assert_eq!(written, b"webm bytes");
    }

    #[test]
    fn rejects_path_traversal_and_empty_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsArtifactSink::new(dir.path().to_path_buf(), "uploads");

        assert!(sink.store("../etc", b"x", "webm").is_err());
        assert!(sink.store("abc", b"x", "we/bm").is_err());
        assert!(sink.store("abc", b"", "webm").is_err());
    }
}
