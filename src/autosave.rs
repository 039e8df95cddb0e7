// src/autosave.rs - Deferred write scheduler
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error, info, trace};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant};

use crate::{LuminaError, Result};

/// Something that can write its pending state out.
#[async_trait]
pub trait Flush: Send + Sync + 'static {
    async fn flush(&self);
}

#[derive(Debug, Clone, Copy)]
enum AutosaveCommand {
    /// Restart the idle timer
    Touch,
    /// Write now if anything is pending
    FlushNow,
    /// Write pending changes and exit
    Stop,
}

/// Coalesces bursts of edits into a single write after an idle delay.
///
/// Every [`touch`](Self::touch) re-arms one pending deadline. When the
/// deadline passes the target is flushed once. [`shutdown`](Self::shutdown)
/// cancels the deadline and flushes immediately if a write was pending.
pub struct AutosaveScheduler {
    /// Channel to send commands to the scheduler task
    command_tx: mpsc::UnboundedSender<AutosaveCommand>,

    /// Handle to the scheduler task
    task: Option<JoinHandle<()>>,
}

impl AutosaveScheduler {
    /// Spawns the scheduler task; must be called inside a tokio runtime
    pub fn spawn<F: Flush>(delay: Duration, target: Arc<F>) -> Self {
        debug!("Starting autosave scheduler with {:?} delay", delay);
        let (command_tx, mut command_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            let mut deadline: Option<Instant> = None;

            loop {
                let wake_at = deadline.unwrap_or_else(Instant::now);
                tokio::select! {
                    _ = time::sleep_until(wake_at), if deadline.is_some() => {
                        trace!("Autosave delay elapsed");
                        deadline = None;
                        target.flush().await;
                    }
                    cmd = command_rx.recv() => match cmd {
                        Some(AutosaveCommand::Touch) => {
                            deadline = Some(Instant::now() + delay);
                        }
                        Some(AutosaveCommand::FlushNow) => {
                            if deadline.take().is_some() {
                                target.flush().await;
                            }
                        }
                        // A dropped scheduler behaves like an explicit stop
                        Some(AutosaveCommand::Stop) | None => {
                            if deadline.take().is_some() {
                                target.flush().await;
                            }
                            debug!("Autosave scheduler stopping");
                            break;
                        }
                    }
                }
            }
        });

        AutosaveScheduler {
            command_tx,
            task: Some(task),
        }
    }

    /// Records an edit, postponing the write by the full delay
    pub fn touch(&self) -> Result<()> {
        self.send(AutosaveCommand::Touch)
    }

    /// Writes pending changes without waiting for the delay
    pub fn flush_now(&self) -> Result<()> {
        self.send(AutosaveCommand::FlushNow)
    }

    fn send(&self, cmd: AutosaveCommand) -> Result<()> {
        self.command_tx
            .send(cmd)
            .map_err(|e| LuminaError::ApplicationError {
                message: format!("Autosave scheduler is not running: {:?}", e.0),
            })
    }

    /// Cancels the timer, flushes anything pending, and waits for the task
    pub async fn shutdown(mut self) -> Result<()> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };

        if let Err(e) = self.command_tx.send(AutosaveCommand::Stop) {
            error!("Failed to send stop command to autosave scheduler: {:?}", e.0);
        }

        task.await.map_err(|e| {
            let message = format!("Failed to stop autosave scheduler: {}", e);
            error!("{}", message);
            LuminaError::ApplicationError { message }
        })?;

        info!("Autosave scheduler stopped");
        Ok(())
    }
}
