use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::models::Frame;
use crate::settings::TrackingSettings;
use crate::vision::{AwayCandidate, FrameOutcome, FrameSource};

use super::{
    ActiveStrategy, AwayEvent, CascadeState, StrategyCascade, StrategyKind, TrackingStatus,
    WarningSink, WarningThrottler,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Everything one session's loop owns. Nothing in here is shared with another
/// session's loop.
pub(crate) struct LoopContext {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub frames: Arc<dyn FrameSource>,
    pub cascade: StrategyCascade,
    pub sink: Arc<dyn WarningSink>,
    pub events: broadcast::Sender<AwayEvent>,
    pub status: Arc<watch::Sender<TrackingStatus>>,
    pub accepting: watch::Receiver<bool>,
    pub settings: TrackingSettings,
}

/// Where the bound strategy currently lives. Detection runs on the blocking
/// pool, so the strategy is moved out for each frame and handed back with
/// the outcome.
enum Worker {
    Idle(ActiveStrategy),
    /// A frame outlived `frame_timeout_ms` and is still being processed.
    /// `missed` counts the frames dropped since.
    Busy {
        handle: JoinHandle<(ActiveStrategy, FrameOutcome)>,
        kind: StrategyKind,
        missed: u32,
    },
    /// The detector panicked and took the strategy with it.
    Lost(StrategyKind),
}

impl Worker {
    fn kind(&self) -> StrategyKind {
        match self {
            Worker::Idle(strategy) => strategy.kind(),
            Worker::Busy { kind, .. } | Worker::Lost(kind) => *kind,
        }
    }
}

/// Session offset: wall-clock gap between session start and loop start,
/// then monotonic time.
struct SessionClock {
    base_offset_ms: u64,
    anchor: Instant,
}

impl SessionClock {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            base_offset_ms: Utc::now()
                .signed_duration_since(started_at)
                .num_milliseconds()
                .max(0) as u64,
            anchor: Instant::now(),
        }
    }

    fn offset_ms(&self) -> u64 {
        self.base_offset_ms + self.anchor.elapsed().as_millis() as u64
    }
}

pub(crate) async fn tracking_loop(
    mut ctx: LoopContext,
    strategy: ActiveStrategy,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(Duration::from_millis(ctx.settings.frame_interval_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let clock = SessionClock::new(ctx.started_at);
    let mut throttler = WarningThrottler::new(ctx.settings.warning_interval_ms);
    let mut worker = Worker::Idle(strategy);
    let mut last_frame_ts: Option<u64> = None;
    let mut consecutive_errors: u32 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("tracking loop shutting down for session {}", ctx.session_id);
                break;
            }
            _ = ticker.tick() => {
                let Some(frame) = ctx.frames.latest_frame() else {
                    continue;
                };
                if last_frame_ts == Some(frame.timestamp_ms) {
                    continue;
                }
                last_frame_ts = Some(frame.timestamp_ms);

                let (next, error) = step(&ctx, worker, frame, &clock, &mut throttler).await;
                worker = next;

                match error {
                    Some(message) => {
                        consecutive_errors += 1;
                        if consecutive_errors == 1 {
                            log_warn!("frame processing failed for session {}: {}", ctx.session_id, message);
                            ctx.status.send_modify(|status| status.last_error = Some(message));
                        }
                        let lost = matches!(worker, Worker::Lost(_));
                        if lost || consecutive_errors >= ctx.settings.max_consecutive_frame_errors {
                            consecutive_errors = 0;
                            match rebind(&mut ctx, worker).await {
                                Some(rebound) => worker = rebound,
                                None => break,
                            }
                        }
                    }
                    None => consecutive_errors = 0,
                }
            }
        }
    }
}

/// Runs one frame through the bound strategy and emits whatever it produced.
/// Returns the worker for the next frame and this frame's error, if any.
async fn step(
    ctx: &LoopContext,
    worker: Worker,
    frame: Frame,
    clock: &SessionClock,
    throttler: &mut WarningThrottler,
) -> (Worker, Option<String>) {
    let mut strategy = match worker {
        Worker::Idle(strategy) => strategy,
        Worker::Busy { handle, kind, missed } if handle.is_finished() => match handle.await {
            Ok((mut strategy, late)) => {
                // The late frame's error was already counted when it timed out.
                emit_all(ctx, throttler, clock, kind, late.candidates);
                for _ in 0..missed {
                    let outcome = strategy.miss_frame();
                    emit_all(ctx, throttler, clock, kind, outcome.candidates);
                }
                strategy
            }
            Err(err) => {
                return (Worker::Lost(kind), Some(format!("{kind} detection panicked: {err}")));
            }
        },
        Worker::Busy { handle, kind, missed } => {
            return (
                Worker::Busy {
                    handle,
                    kind,
                    missed: missed + 1,
                },
                Some(format!("{kind} detection still running, frame dropped")),
            );
        }
        Worker::Lost(kind) => return (Worker::Lost(kind), Some(format!("{kind} strategy lost"))),
    };

    let kind = strategy.kind();
    let mut handle = tokio::task::spawn_blocking(move || {
        let outcome = strategy.process(&frame);
        (strategy, outcome)
    });

    let limit = Duration::from_millis(ctx.settings.frame_timeout_ms.max(1));
    match tokio::time::timeout(limit, &mut handle).await {
        Ok(Ok((strategy, outcome))) => {
            emit_all(ctx, throttler, clock, kind, outcome.candidates);
            (Worker::Idle(strategy), outcome.error)
        }
        Ok(Err(err)) => (Worker::Lost(kind), Some(format!("{kind} detection panicked: {err}"))),
        Err(_) => (
            Worker::Busy {
                handle,
                kind,
                missed: 0,
            },
            Some(format!(
                "{kind} detection exceeded {}ms",
                ctx.settings.frame_timeout_ms
            )),
        ),
    }
}

/// Swaps in a freshly initialized strategy. Returns `None` when the cascade
/// is exhausted and the loop has to stop.
async fn rebind(ctx: &mut LoopContext, worker: Worker) -> Option<Worker> {
    let from = worker.kind();
    log_warn!(
        "{} strategy kept failing for session {}, re-initializing",
        from,
        ctx.session_id
    );
    match worker {
        Worker::Idle(mut strategy) => strategy.shutdown(),
        // Dropping the handle detaches the stalled call; its result is discarded.
        Worker::Busy { .. } => {
            log_warn!("abandoning stalled {from} detection");
        }
        Worker::Lost(_) => {}
    }

    match ctx.cascade.recover().await {
        Ok(strategy) => {
            let kind = strategy.kind();
            let state = ctx.cascade.state();
            ctx.status.send_modify(|status| {
                status.current_strategy = kind;
                status.cascade_state = state;
            });
            Some(Worker::Idle(strategy))
        }
        Err(err) => {
            log_error!("tracking stopped for session {}: {err}", ctx.session_id);
            ctx.frames.stop();
            ctx.status.send_modify(|status| {
                status.current_strategy = StrategyKind::None;
                status.cascade_state = CascadeState::Failed;
                status.is_tracking = false;
                status.last_error = Some(err.to_string());
            });
            None
        }
    }
}

fn emit_all(
    ctx: &LoopContext,
    throttler: &mut WarningThrottler,
    clock: &SessionClock,
    strategy: StrategyKind,
    candidates: Vec<AwayCandidate>,
) {
    for candidate in candidates {
        emit(ctx, throttler, clock.offset_ms(), strategy, candidate);
    }
}

fn emit(
    ctx: &LoopContext,
    throttler: &mut WarningThrottler,
    offset_ms: u64,
    strategy: StrategyKind,
    candidate: AwayCandidate,
) {
    if !*ctx.accepting.borrow() {
        log_debug!(
            "session {} no longer active, discarding {}",
            ctx.session_id,
            candidate.cause
        );
        return;
    }

    if !throttler.admit(offset_ms) {
        log_debug!(
            "throttled {} at {}ms for session {}",
            candidate.cause,
            offset_ms,
            ctx.session_id
        );
        return;
    }

    if let Err(err) = ctx.sink.accept(&ctx.session_id, offset_ms, candidate.cause) {
        log_error!("warning sink rejected warning for session {}: {err:#}", ctx.session_id);
        ctx.status
            .send_modify(|status| status.last_error = Some(format!("warning sink: {err:#}")));
    }

    // No subscribers is fine.
    let _ = ctx.events.send(AwayEvent::new(&ctx.session_id, offset_ms, candidate, strategy));
}
