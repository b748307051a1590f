use anyhow::{anyhow, Result};
use log::{error, warn};
use tokio::sync::{mpsc, oneshot};

use crate::error::SessionError;
use crate::models::WarningReason;
use crate::tracking::WarningSink;

use super::SessionLifecycle;

enum SinkCommand {
    Record {
        session_id: String,
        offset_ms: u64,
        reason: WarningReason,
    },
    Flush(oneshot::Sender<()>),
}

/// Warning sink that records into the session store. `accept` only
/// enqueues; a background writer applies warnings in arrival order.
pub struct SessionWarningSink {
    sender: mpsc::UnboundedSender<SinkCommand>,
}

impl SessionWarningSink {
    /// Spawns the writer task. Must be called from inside a tokio runtime.
    pub fn spawn(lifecycle: SessionLifecycle) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<SinkCommand>();

        tokio::spawn(async move {
            while let Some(command) = receiver.recv().await {
                match command {
                    SinkCommand::Record {
                        session_id,
                        offset_ms,
                        reason,
                    } => match lifecycle.record_warning(&session_id, offset_ms, reason).await {
                        Ok(_) => {}
                        Err(err @ SessionError::InvalidState { .. }) => {
                            warn!("dropping warning for closed session: {err}");
                        }
                        Err(err) => {
                            error!("failed to record warning for session {session_id}: {err}");
                        }
                    },
                    SinkCommand::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });

        Self { sender }
    }

    /// Waits until every warning accepted so far has been applied.
    pub async fn flush(&self) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.sender
            .send(SinkCommand::Flush(done_tx))
            .map_err(|_| anyhow!("warning writer stopped"))?;
        done_rx
            .await
            .map_err(|_| anyhow!("warning writer stopped before flush"))
    }
}

impl WarningSink for SessionWarningSink {
    fn accept(&self, session_id: &str, offset_ms: u64, reason: WarningReason) -> Result<()> {
        self.sender
            .send(SinkCommand::Record {
                session_id: session_id.to_string(),
                offset_ms,
                reason,
            })
            .map_err(|_| anyhow!("warning writer stopped"))
    }
}
