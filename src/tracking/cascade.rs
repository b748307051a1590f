//! Strategy selection and fallback.
//!
//! Strategies are tried strictly in priority order. A strategy that fails to
//! come up is skipped for the rest of the run; the only way back up the
//! order is a fresh `StrategyCascade`.

use anyhow::Context;
use serde::Serialize;
use tokio::time::{sleep, Duration, Instant};

use crate::error::{StrategyInitError, TrackingError};
use crate::settings::TrackingSettings;
use crate::vision::{
    Capabilities, CascadeStrategy, LandmarkProvider, LandmarkStrategy, MotionSkinHeuristic,
};

use super::{ActiveStrategy, StrategyKind};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CascadeState {
    #[default]
    Unbound,
    LandmarkActive,
    CascadeActive,
    HeuristicActive,
    Failed,
}

impl CascadeState {
    fn bound(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::Landmark => CascadeState::LandmarkActive,
            StrategyKind::Cascade => CascadeState::CascadeActive,
            StrategyKind::Heuristic => CascadeState::HeuristicActive,
            StrategyKind::None => CascadeState::Unbound,
        }
    }

    pub fn strategy(&self) -> StrategyKind {
        match self {
            CascadeState::LandmarkActive => StrategyKind::Landmark,
            CascadeState::CascadeActive => StrategyKind::Cascade,
            CascadeState::HeuristicActive => StrategyKind::Heuristic,
            CascadeState::Unbound | CascadeState::Failed => StrategyKind::None,
        }
    }
}

pub struct StrategyCascade {
    capabilities: Capabilities,
    settings: TrackingSettings,
    state: CascadeState,
    next: Option<StrategyKind>,
    failures: Vec<(StrategyKind, String)>,
}

impl StrategyCascade {
    pub fn new(capabilities: Capabilities, settings: TrackingSettings) -> Self {
        let first = if settings.force_heuristic {
            StrategyKind::Heuristic
        } else {
            StrategyKind::Landmark
        };

        Self {
            capabilities,
            settings,
            state: CascadeState::Unbound,
            next: Some(first),
            failures: Vec::new(),
        }
    }

    pub fn state(&self) -> CascadeState {
        self.state
    }

    pub fn current(&self) -> StrategyKind {
        self.state.strategy()
    }

    /// Every initialization failure seen so far, oldest first.
    pub fn failures(&self) -> &[(StrategyKind, String)] {
        &self.failures
    }

    /// Binds the highest-priority strategy not yet tried that initializes.
    pub async fn bind(&mut self) -> Result<ActiveStrategy, TrackingError> {
        while let Some(kind) = self.next {
            self.next = kind.next();
            match self.initialize(kind).await {
                Ok(strategy) => {
                    self.state = CascadeState::bound(kind);
                    log_info!("bound {kind} strategy");
                    return Ok(strategy);
                }
                Err(err) => {
                    log_warn!("{kind} strategy unavailable, falling back: {err}");
                    self.failures.push((kind, err.to_string()));
                }
            }
        }

        self.state = CascadeState::Failed;
        Err(TrackingError::CascadeExhausted)
    }

    /// Hard re-initialization: retries the current strategy once, then keeps
    /// going down the order.
    pub async fn recover(&mut self) -> Result<ActiveStrategy, TrackingError> {
        let current = self.current();
        if current != StrategyKind::None {
            log_warn!("re-initializing {current} strategy");
            self.next = Some(current);
        }
        self.bind().await
    }

    async fn initialize(&self, kind: StrategyKind) -> Result<ActiveStrategy, StrategyInitError> {
        if self.capabilities.frames.is_none() {
            return Err(StrategyInitError::NoFrameSource);
        }

        match kind {
            StrategyKind::Landmark => {
                let provider = self
                    .capabilities
                    .landmarks
                    .clone()
                    .ok_or(StrategyInitError::Unavailable(kind))?;
                self.wait_until_ready(provider.as_ref()).await?;
                provider
                    .initialize()
                    .context("landmark provider initialize")
                    .map_err(|source| StrategyInitError::Failed { strategy: kind, source })?;
                Ok(ActiveStrategy::Landmark(LandmarkStrategy::new(
                    provider,
                    self.settings.landmark.clone(),
                )))
            }
            StrategyKind::Cascade => {
                let provider = self
                    .capabilities
                    .cascade
                    .clone()
                    .ok_or(StrategyInitError::Unavailable(kind))?;
                provider
                    .load()
                    .context("cascade model load")
                    .map_err(|source| StrategyInitError::Failed { strategy: kind, source })?;
                Ok(ActiveStrategy::Cascade(CascadeStrategy::new(
                    provider,
                    self.settings.cascade.clone(),
                )))
            }
            StrategyKind::Heuristic => Ok(ActiveStrategy::Heuristic(MotionSkinHeuristic::new(
                self.settings.heuristic.clone(),
            ))),
            StrategyKind::None => Err(StrategyInitError::Unavailable(kind)),
        }
    }

    /// Bounded wait for a provider whose library loads asynchronously.
    async fn wait_until_ready(
        &self,
        provider: &dyn LandmarkProvider,
    ) -> Result<(), StrategyInitError> {
        let timeout = Duration::from_millis(self.settings.landmark_ready_timeout_ms);
        let step = Duration::from_millis(self.settings.landmark_ready_poll_ms.max(1));
        let started = Instant::now();

        loop {
            if provider.is_ready() {
                return Ok(());
            }
            let waited = started.elapsed();
            if waited >= timeout {
                return Err(StrategyInitError::NotReady {
                    strategy: StrategyKind::Landmark,
                    waited_ms: waited.as_millis() as u64,
                });
            }
            sleep(step.min(timeout - waited)).await;
        }
    }
}
