use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::TrackingError;
use crate::settings::TrackingSettings;
use crate::vision::Capabilities;

use super::loop_worker::{tracking_loop, LoopContext};
use super::{AwayEvent, CascadeState, StrategyCascade, StrategyKind, WarningSink};

const EVENT_CAPACITY: usize = 64;

/// The session a tracking run belongs to.
#[derive(Debug, Clone)]
pub struct SessionBinding {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingStatus {
    pub current_strategy: StrategyKind,
    pub cascade_state: CascadeState,
    pub is_tracking: bool,
    pub last_error: Option<String>,
}

/// Starts and stops the per-session tracking loop.
pub struct TrackingController {
    capabilities: Capabilities,
    settings: TrackingSettings,
    sink: Arc<dyn WarningSink>,
    events: broadcast::Sender<AwayEvent>,
    status: Arc<watch::Sender<TrackingStatus>>,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    gate_tx: Option<watch::Sender<bool>>,
}

impl TrackingController {
    pub fn new(
        capabilities: Capabilities,
        settings: TrackingSettings,
        sink: Arc<dyn WarningSink>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (status, _) = watch::channel(TrackingStatus::default());

        Self {
            capabilities,
            settings,
            sink,
            events,
            status: Arc::new(status),
            handle: None,
            cancel_token: None,
            gate_tx: None,
        }
    }

    /// Binds the best available strategy and spawns the frame loop. The only
    /// suspension point is the bounded provider-readiness wait.
    pub async fn start_tracking(
        &mut self,
        session: SessionBinding,
    ) -> Result<StrategyKind, TrackingError> {
        if let Some(handle) = &self.handle {
            if !handle.is_finished() {
                return Err(TrackingError::AlreadyTracking);
            }
            // Previous loop stopped on its own after exhausting the cascade.
            self.stop_tracking();
        }

        if let Some(frames) = &self.capabilities.frames {
            frames.start().map_err(TrackingError::FrameSource)?;
        }

        let mut cascade = StrategyCascade::new(self.capabilities.clone(), self.settings.clone());
        let strategy = match cascade.bind().await {
            Ok(strategy) => strategy,
            Err(err) => {
                if let Some(frames) = &self.capabilities.frames {
                    frames.stop();
                }
                self.status.send_replace(TrackingStatus {
                    current_strategy: StrategyKind::None,
                    cascade_state: CascadeState::Failed,
                    is_tracking: false,
                    last_error: Some(err.to_string()),
                });
                return Err(err);
            }
        };

        // `bind` only succeeds when a frame source exists.
        let Some(frames) = self.capabilities.frames.clone() else {
            return Err(TrackingError::CascadeExhausted);
        };

        let kind = strategy.kind();
        let last_error = cascade.failures().last().map(|(_, message)| message.clone());
        self.status.send_replace(TrackingStatus {
            current_strategy: kind,
            cascade_state: cascade.state(),
            is_tracking: true,
            last_error,
        });

        let cancel_token = CancellationToken::new();
        let (gate_tx, gate_rx) = watch::channel(true);

        info!(
            "tracking session {} with {} strategy",
            session.session_id, kind
        );

        let ctx = LoopContext {
            session_id: session.session_id,
            started_at: session.started_at,
            frames,
            cascade,
            sink: Arc::clone(&self.sink),
            events: self.events.clone(),
            status: Arc::clone(&self.status),
            accepting: gate_rx,
            settings: self.settings.clone(),
        };

        self.handle = Some(tokio::spawn(tracking_loop(ctx, strategy, cancel_token.clone())));
        self.cancel_token = Some(cancel_token);
        self.gate_tx = Some(gate_tx);

        Ok(kind)
    }

    /// Halts the loop, stops the camera and landmark drivers, and drops all
    /// per-strategy counters. Safe to call when already stopped.
    pub fn stop_tracking(&mut self) {
        self.close_session_gate();
        self.gate_tx = None;

        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        let was_running = match self.handle.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        };

        let bound = self.status.borrow().current_strategy;
        if was_running {
            if let Some(frames) = &self.capabilities.frames {
                frames.stop();
            }
            // Only a bound landmark strategy ever initialized the provider.
            if bound == StrategyKind::Landmark {
                if let Some(landmarks) = &self.capabilities.landmarks {
                    landmarks.shutdown();
                }
            }
            info!("tracking stopped");
        }

        self.status.send_modify(|status| {
            status.current_strategy = StrategyKind::None;
            if status.cascade_state != CascadeState::Failed {
                status.cascade_state = CascadeState::Unbound;
            }
            status.is_tracking = false;
        });
    }

    /// Stops accepting classifier output for the current session while the
    /// loop itself keeps running.
    pub fn close_session_gate(&self) {
        if let Some(gate) = &self.gate_tx {
            gate.send_replace(false);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AwayEvent> {
        self.events.subscribe()
    }

    pub fn watch_status(&self) -> watch::Receiver<TrackingStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> TrackingStatus {
        self.status.borrow().clone()
    }

    pub fn current_strategy(&self) -> StrategyKind {
        self.status.borrow().current_strategy
    }

    pub fn is_tracking(&self) -> bool {
        self.status.borrow().is_tracking
    }

    pub fn last_error(&self) -> Option<String> {
        self.status.borrow().last_error.clone()
    }
}

impl Drop for TrackingController {
    fn drop(&mut self) {
        self.stop_tracking();
    }
}
