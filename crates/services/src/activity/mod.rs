use async_trait::async_trait;
use bson::{oid::ObjectId, Document};
use crewdesk_config::ActivitySettings;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::dao::base::DaoError;

/// One auditable mutation, produced fire-and-forget after the primary
/// write commits.
#[derive(Debug, Clone)]
pub struct ActivityEvent {
    pub workspace_id: ObjectId,
    pub user_id: ObjectId,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<ObjectId>,
    pub metadata: Document,
}

impl ActivityEvent {
    pub fn new(
        workspace_id: ObjectId,
        user_id: ObjectId,
        action: impl Into<String>,
        entity_type: impl Into<String>,
    ) -> Self {
        Self {
            workspace_id,
            user_id,
            action: action.into(),
            entity_type: entity_type.into(),
            entity_id: None,
            metadata: Document::new(),
        }
    }

    pub fn entity(mut self, entity_id: ObjectId) -> Self {
        self.entity_id = Some(entity_id);
        self
    }

    pub fn metadata(mut self, metadata: Document) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Durable destination for activity events. Persistence is an append,
/// so redelivering the same event is safe.
#[async_trait]
pub trait ActivitySink: Send + Sync + 'static {
    async fn persist(&self, event: &ActivityEvent) -> Result<(), DaoError>;
}

/// An event the workers gave up on, kept for operator inspection.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub event: ActivityEvent,
    pub error: String,
    pub failed_at: bson::DateTime,
}

#[derive(Clone)]
struct PipelineConfig {
    max_attempts: u32,
    retry_base: Duration,
    dead_letter_window: usize,
}

/// Producer handle for the activity-log pipeline.
///
/// `record` never blocks and never fails the caller: a full or closed
/// queue logs a warning and drops the event. Consumption happens on a
/// fixed pool of workers that retry with exponential backoff and park
/// permanently failed events in a bounded dead-letter window.
#[derive(Clone)]
pub struct ActivityLogger {
    tx: Option<mpsc::Sender<ActivityEvent>>,
    dead_letters: Arc<Mutex<VecDeque<DeadLetter>>>,
}

impl ActivityLogger {
    /// A producer with no pipeline behind it. Every `record` call warns
    /// and drops; audit logging degrades silently rather than blocking
    /// functionality.
    pub fn disabled() -> Self {
        Self {
            tx: None,
            dead_letters: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn start(sink: Arc<dyn ActivitySink>, settings: &ActivitySettings) -> Self {
        if !settings.enabled {
            return Self::disabled();
        }

        let (tx, rx) = mpsc::channel::<ActivityEvent>(settings.queue_capacity);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let dead_letters = Arc::new(Mutex::new(VecDeque::new()));
        let config = PipelineConfig {
            max_attempts: settings.max_attempts.max(1),
            retry_base: Duration::from_millis(settings.retry_base_ms),
            dead_letter_window: settings.dead_letter_window.max(1),
        };

        for worker in 0..settings.worker_count.max(1) {
            tokio::spawn(run_worker(
                worker,
                Arc::clone(&rx),
                Arc::clone(&sink),
                config.clone(),
                Arc::clone(&dead_letters),
            ));
        }

        Self {
            tx: Some(tx),
            dead_letters,
        }
    }

    /// Fire-and-forget enqueue. Called after the primary mutation has
    /// committed; the user-facing request never waits on it.
    pub fn record(&self, event: ActivityEvent) {
        match &self.tx {
            Some(tx) => {
                if let Err(e) = tx.try_send(event) {
                    warn!(%e, "Activity event dropped");
                }
            }
            None => {
                warn!(
                    action = %event.action,
                    "Activity pipeline disabled, event dropped"
                );
            }
        }
    }

    /// Snapshot of the bounded trailing window of permanently failed
    /// events.
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.lock().iter().cloned().collect()
    }
}

async fn run_worker(
    worker: usize,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<ActivityEvent>>>,
    sink: Arc<dyn ActivitySink>,
    config: PipelineConfig,
    dead_letters: Arc<Mutex<VecDeque<DeadLetter>>>,
) {
    loop {
        let event = rx.lock().await.recv().await;
        let Some(event) = event else {
            debug!(worker, "Activity worker shutting down");
            break;
        };

        let mut attempt = 0;
        loop {
            match sink.persist(&event).await {
                Ok(()) => {
                    debug!(worker, action = %event.action, "Activity event persisted");
                    break;
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= config.max_attempts {
                        error!(
                            worker,
                            action = %event.action,
                            %e,
                            "Activity event permanently failed"
                        );
                        let mut window = dead_letters.lock();
                        if window.len() >= config.dead_letter_window {
                            window.pop_front();
                        }
                        window.push_back(DeadLetter {
                            event,
                            error: e.to_string(),
                            failed_at: bson::DateTime::now(),
                        });
                        break;
                    }
                    let backoff = config.retry_base * 2_u32.pow(attempt - 1);
                    warn!(
                        worker,
                        action = %event.action,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        %e,
                        "Activity persist failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}
