/// Bounded transcode queue
///
/// Jobs go through a bounded channel to a dispatcher task that runs at most
/// `concurrency` workers at once. `enqueue` waits while the channel is full;
/// `submit` never waits and parks the job on a detached task instead.
/// On shutdown queued jobs are abandoned; their records stay `pending` and
/// are picked up by the recovery sweep on the next start.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Mutex, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::db::VideoStore;
use crate::error::Result;
use crate::metrics;
use crate::services::intake::VideoLayout;
use crate::services::worker::{TranscodeJob, TranscodeWorker};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("transcode queue is shut down")]
    Closed,
}

pub struct TranscodeQueue {
    sender: mpsc::Sender<TranscodeJob>,
    shutdown: watch::Sender<bool>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    in_flight: Arc<AtomicUsize>,
}

impl TranscodeQueue {
    /// Spawn the dispatcher on the current runtime
    pub fn start(worker: Arc<TranscodeWorker>, concurrency: usize, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let (shutdown, shutdown_rx) = watch::channel(false);
        let in_flight = Arc::new(AtomicUsize::new(0));

        let dispatcher = tokio::spawn(dispatch(
            worker,
            receiver,
            shutdown_rx,
            Arc::new(Semaphore::new(concurrency.max(1))),
            in_flight.clone(),
        ));

        info!(concurrency, capacity, "transcode queue started");

        Self {
            sender,
            shutdown,
            dispatcher: Mutex::new(Some(dispatcher)),
            in_flight,
        }
    }

    /// Hand a job to the workers, waiting for room in the queue
    pub async fn enqueue(&self, job: TranscodeJob) -> std::result::Result<(), QueueError> {
        if *self.shutdown.borrow() {
            return Err(QueueError::Closed);
        }

        let video_id = job.video_id.clone();
        metrics::TRANSCODE_QUEUE_DEPTH.inc();
        if self.sender.send(job).await.is_err() {
            metrics::TRANSCODE_QUEUE_DEPTH.dec();
            return Err(QueueError::Closed);
        }

        debug!(video_id = %video_id, depth = self.depth(), "transcode job enqueued");
        Ok(())
    }

    /// Hand a job to the workers without waiting
    ///
    /// A full channel does not hold up the caller: the job moves to a
    /// detached task that sends it once a slot frees up. If the queue shuts
    /// down first the job is dropped and its record stays `pending`.
    pub fn submit(&self, job: TranscodeJob) -> std::result::Result<(), QueueError> {
        if *self.shutdown.borrow() {
            return Err(QueueError::Closed);
        }

        let video_id = job.video_id.clone();
        metrics::TRANSCODE_QUEUE_DEPTH.inc();
        match self.sender.try_send(job) {
            Ok(()) => {
                debug!(video_id = %video_id, depth = self.depth(), "transcode job enqueued");
                Ok(())
            }
            Err(TrySendError::Full(job)) => {
                debug!(video_id = %video_id, "transcode queue full, job parked");
                let sender = self.sender.clone();
                tokio::spawn(async move {
                    if sender.send(job).await.is_err() {
                        metrics::TRANSCODE_QUEUE_DEPTH.dec();
                        info!(video_id = %video_id, "queue closed before parked job was taken, left pending");
                    }
                });
                Ok(())
            }
            Err(TrySendError::Closed(_)) => {
                metrics::TRANSCODE_QUEUE_DEPTH.dec();
                Err(QueueError::Closed)
            }
        }
    }

    /// Jobs waiting for a worker
    pub fn depth(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    /// Jobs currently being converted
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_accepting(&self) -> bool {
        !*self.shutdown.borrow() && !self.sender.is_closed()
    }

    /// Re-enqueue every video left `pending` by a previous run
    pub async fn recover_pending(
        &self,
        store: &dyn VideoStore,
        layout: &VideoLayout,
    ) -> Result<usize> {
        let pending = store.list_pending().await?;
        if pending.is_empty() {
            return Ok(0);
        }

        info!(count = pending.len(), "recovering pending videos");
        let mut recovered = 0;
        for record in pending {
            let original_path = match layout.find_original(&record.conversation_id, &record.id).await {
                Some(path) => path,
                // The worker settles jobs whose original is gone
                None => layout.original_path(&record.conversation_id, &record.id, ""),
            };

            let job = TranscodeJob {
                video_id: record.id.clone(),
                original_path,
                canonical_path: record.canonical_path.clone().into(),
            };

            if let Err(e) = self.enqueue(job).await {
                warn!(video_id = %record.id, error = %e, "recovery stopped");
                break;
            }
            metrics::RECOVERED_JOBS_TOTAL.inc();
            recovered += 1;
        }

        Ok(recovered)
    }

    /// Stop accepting jobs and wait up to `grace` for running ones
    ///
    /// Workers still running after the grace period are aborted, which kills
    /// their converter process.
    pub async fn shutdown(&self, grace: Duration) {
        if self.shutdown.send_replace(true) {
            return;
        }

        info!(
            in_flight = self.in_flight(),
            queued = self.depth(),
            grace_secs = grace.as_secs(),
            "shutting down transcode queue"
        );

        let Some(mut dispatcher) = self.dispatcher.lock().await.take() else {
            return;
        };

        match tokio::time::timeout(grace, &mut dispatcher).await {
            Ok(Ok(())) => info!("transcode queue drained"),
            Ok(Err(e)) => error!(error = %e, "transcode dispatcher failed"),
            Err(_) => {
                warn!(
                    in_flight = self.in_flight(),
                    "grace period elapsed, aborting running transcodes"
                );
                dispatcher.abort();
                let _ = dispatcher.await;
            }
        }
    }
}

async fn dispatch(
    worker: Arc<TranscodeWorker>,
    mut receiver: mpsc::Receiver<TranscodeJob>,
    mut shutdown: watch::Receiver<bool>,
    permits: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
) {
    let mut running = JoinSet::new();

    loop {
        tokio::select! {
            biased;

            _ = shutdown.changed() => break,

            Some(_) = running.join_next(), if !running.is_empty() => {}

            job = receiver.recv() => {
                let Some(job) = job else { break };
                metrics::TRANSCODE_QUEUE_DEPTH.dec();

                let permit = tokio::select! {
                    biased;
                    _ = shutdown.changed() => break,
                    permit = permits.clone().acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => break,
                    },
                };

                let worker = worker.clone();
                let in_flight = in_flight.clone();
                in_flight.fetch_add(1, Ordering::SeqCst);
                metrics::TRANSCODE_IN_FLIGHT.inc();

                running.spawn(async move {
                    worker.run(job).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    metrics::TRANSCODE_IN_FLIGHT.dec();
                    drop(permit);
                });
            }
        }
    }

    // Queued jobs stay pending for the next recovery sweep
    receiver.close();
    let abandoned = std::iter::from_fn(|| receiver.try_recv().ok()).count();
    if abandoned > 0 {
        metrics::TRANSCODE_QUEUE_DEPTH.sub(abandoned as i64);
        info!(abandoned, "queued transcodes left pending");
    }

    while let Some(result) = running.join_next().await {
        if let Err(e) = result {
            error!(error = %e, "transcode task failed");
        }
    }
}
