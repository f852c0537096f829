use crate::infrastructure::config::RetryPolicy;
use crate::infrastructure::document_store::{DocumentSection, DocumentStore};
use crate::infrastructure::error::PersistenceError;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};

enum SaveCommand {
    Write {
        date_key: String,
        section: DocumentSection,
    },
    Flush(oneshot::Sender<Result<(), PersistenceError>>),
}

/// Writes day sections on a single background worker.
///
/// Snapshots queued for the same date and section before the worker gets to
/// them collapse into the newest one. Failed writes are retried with
/// exponential backoff; the last failure is reported by the next `flush`.
pub struct SaveQueue {
    sender: mpsc::UnboundedSender<SaveCommand>,
    worker: JoinHandle<()>,
}

impl SaveQueue {
    /// Starts the worker on the current tokio runtime.
    pub fn spawn<S>(port: Arc<S>, retry_policy: RetryPolicy) -> Result<Self, PersistenceError>
    where
        S: DocumentStore + 'static,
    {
        let handle = Handle::try_current().map_err(|error| {
            PersistenceError::Background(format!("no tokio runtime for save queue: {error}"))
        })?;
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = handle.spawn(run_worker(port, retry_policy, receiver));
        Ok(Self { sender, worker })
    }

    pub fn enqueue(
        &self,
        date_key: impl Into<String>,
        section: DocumentSection,
    ) -> Result<(), PersistenceError> {
        self.sender
            .send(SaveCommand::Write {
                date_key: date_key.into(),
                section,
            })
            .map_err(|_| PersistenceError::Background("save worker stopped".to_string()))
    }

    /// Waits until everything queued so far is written.
    pub async fn flush(&self) -> Result<(), PersistenceError> {
        let (ack, done) = oneshot::channel();
        self.sender
            .send(SaveCommand::Flush(ack))
            .map_err(|_| PersistenceError::Background("save worker stopped".to_string()))?;
        done.await
            .map_err(|_| PersistenceError::Background("save worker dropped flush".to_string()))?
    }

    /// Drains the queue and stops the worker.
    pub async fn shutdown(self) -> Result<(), PersistenceError> {
        let result = self.flush().await;
        drop(self.sender);
        self.worker
            .await
            .map_err(|error| PersistenceError::Background(format!("save worker failed: {error}")))?;
        result
    }
}

async fn run_worker<S>(
    port: Arc<S>,
    retry_policy: RetryPolicy,
    mut receiver: mpsc::UnboundedReceiver<SaveCommand>,
) where
    S: DocumentStore + 'static,
{
    let mut pending: Vec<(String, DocumentSection)> = Vec::new();
    let mut last_error: Option<PersistenceError> = None;

    while let Some(command) = receiver.recv().await {
        let mut batch = vec![command];
        while let Ok(command) = receiver.try_recv() {
            batch.push(command);
        }

        for command in batch {
            match command {
                SaveCommand::Write { date_key, section } => {
                    coalesce(&mut pending, date_key, section);
                }
                SaveCommand::Flush(ack) => {
                    write_pending(&port, &retry_policy, &mut pending, &mut last_error).await;
                    let result = match last_error.take() {
                        Some(error) => Err(error),
                        None => Ok(()),
                    };
                    let _ = ack.send(result);
                }
            }
        }
        write_pending(&port, &retry_policy, &mut pending, &mut last_error).await;
    }
    log::debug!("event=save_queue_stopped");
}

fn coalesce(
    pending: &mut Vec<(String, DocumentSection)>,
    date_key: String,
    section: DocumentSection,
) {
    let existing = pending
        .iter_mut()
        .find(|(key, queued)| *key == date_key && queued.key() == section.key());
    match existing {
        Some((_, queued)) => *queued = section,
        None => pending.push((date_key, section)),
    }
}

async fn write_pending<S>(
    port: &Arc<S>,
    retry_policy: &RetryPolicy,
    pending: &mut Vec<(String, DocumentSection)>,
    last_error: &mut Option<PersistenceError>,
) where
    S: DocumentStore + 'static,
{
    for (date_key, section) in pending.drain(..) {
        if let Err(error) = write_with_retry(port, retry_policy, &date_key, &section).await {
            log::error!(
                "event=background_save_failed date={date_key} section={} error={error}",
                section.key()
            );
            *last_error = Some(error);
        }
    }
}

async fn write_with_retry<S>(
    port: &Arc<S>,
    retry_policy: &RetryPolicy,
    date_key: &str,
    section: &DocumentSection,
) -> Result<(), PersistenceError>
where
    S: DocumentStore + 'static,
{
    let max_attempts = retry_policy.max_attempts.max(1);
    let mut attempt: u8 = 0;
    loop {
        let result = write_blocking(Arc::clone(port), date_key.to_string(), section.clone()).await;
        match result {
            Ok(()) => return Ok(()),
            Err(error) if should_retry(&error) && attempt + 1 < max_attempts => {
                let delay = retry_policy
                    .base_delay_ms
                    .saturating_mul(2u64.saturating_pow(u32::from(attempt)));
                log::warn!(
                    "event=background_save_retry date={date_key} attempt={} delay_ms={delay} \
                     error={error}",
                    attempt + 1
                );
                sleep(Duration::from_millis(delay)).await;
                attempt = attempt.saturating_add(1);
            }
            Err(error) => return Err(error),
        }
    }
}

async fn write_blocking<S>(
    port: Arc<S>,
    date_key: String,
    section: DocumentSection,
) -> Result<(), PersistenceError>
where
    S: DocumentStore + 'static,
{
    tokio::task::spawn_blocking(move || port.write(&date_key, &section))
        .await
        .map_err(|error| PersistenceError::Background(format!("save task failed: {error}")))?
}

fn should_retry(error: &PersistenceError) -> bool {
    matches!(
        error,
        PersistenceError::Io(_)
            | PersistenceError::LockPoisoned(_)
            | PersistenceError::Background(_)
    )
}
