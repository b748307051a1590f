//! Attention monitoring for timed camera sessions.
//!
//! A cascade of detection strategies (landmark gaze, classical face
//! detector, motion/skin heuristic) classifies each camera frame. Debounced
//! and throttled "looking away" warnings are recorded against a session
//! whose lifecycle is persisted in SQLite.

pub mod db;
pub mod error;
pub mod models;
pub mod session;
pub mod settings;
pub mod tracking;
pub mod utils;
pub mod vision;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use log::warn;

pub use db::Database;
pub use error::{SessionError, StrategyInitError, TrackingError};
pub use models::{
    Frame, LandmarkRole, LandmarkSet, Session, SessionStatus, SessionSummary, Warning,
    WarningReason,
};
pub use session::{
    ArtifactSink, FsArtifactSink, SessionController, SessionLifecycle, SessionStart,
    SessionWarningSink,
};
pub use settings::{SettingsStore, TrackingSettings};
pub use tracking::{
    AwayEvent, CascadeState, SessionBinding, StrategyKind, TrackingController, TrackingStatus,
    WarningSink,
};
pub use vision::{Capabilities, CascadeProvider, FrameSlot, FrameSource, LandmarkProvider};

/// Initializes `env_logger` at `Info`, overridable through `RUST_LOG`.
/// Later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();
}

/// Process-wide state: database, settings and the session store.
pub struct App {
    data_dir: PathBuf,
    db: Database,
    settings: SettingsStore,
    sessions: SessionLifecycle,
}

impl App {
    /// Opens (or creates) the data directory and cancels any session a
    /// previous process left active.
    pub async fn open(data_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let db = Database::new(data_dir.join("gazeguard.sqlite3"))?;
        let sessions = SessionLifecycle::new(db.clone());

        let recovered = sessions
            .recover_abandoned()
            .await
            .context("failed to recover abandoned sessions")?;
        if !recovered.is_empty() {
            warn!(
                "Recovered {} abandoned session(s); marked as Cancelled",
                recovered.len()
            );
        }

        let settings = SettingsStore::new(data_dir.join("settings.json"))?;

        Ok(Self {
            data_dir,
            db,
            settings,
            sessions,
        })
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn sessions(&self) -> &SessionLifecycle {
        &self.sessions
    }

    /// Artifact sink writing under `<data_dir>/artifacts`.
    pub fn artifact_sink(&self, public_prefix: &str) -> FsArtifactSink {
        FsArtifactSink::new(self.data_dir.join("artifacts"), public_prefix)
    }

    /// A controller for one subject, using the current tracking settings.
    /// Must be called from inside a tokio runtime.
    pub fn session_controller(
        &self,
        capabilities: Capabilities,
        artifacts: Arc<dyn ArtifactSink>,
    ) -> SessionController {
        SessionController::new(
            self.sessions.clone(),
            capabilities,
            self.settings.tracking(),
            artifacts,
        )
    }
}
