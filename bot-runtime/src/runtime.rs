//! Event loop: one FIFO queue and one worker per source, a shared handler table, and bounded
//! graceful shutdown.
//!
//! Events from one source are dispatched strictly in arrival order; workers of different sources
//! interleave at await points. A failing or panicking handler is logged and counted once per event and
//! never stops the loop. Shutdown cancels every source, lets workers drain what was already accepted,
//! waits at most the grace period, then closes the session.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use handler_table::HandlerTable;
use notifier_core::{Event, EventKind, HandlerError, NotifierError, Result, Session};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::Config;

/// Events a source may have queued before `emit` waits for its worker.
pub const SOURCE_QUEUE_CAPACITY: usize = 64;

/// Producer of events. Runs until the sink reports shutdown or it fails.
#[async_trait]
pub trait EventSource: Send {
    /// Stable name used in logs and as the ordering domain.
    fn name(&self) -> &str;
    /// Produces events into `sink`. Returning `Err` is treated as unrecoverable and stops the runtime.
    async fn run(self: Box<Self>, sink: EventSink) -> Result<()>;
}

#[derive(Debug, Default)]
struct RuntimeStats {
    accepted: AtomicUsize,
    rejected: AtomicUsize,
    handled: AtomicUsize,
    failed: AtomicUsize,
}

/// Counters reported when the runtime stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Events queued for dispatch.
    pub accepted: usize,
    /// Events refused because shutdown had started.
    pub rejected: usize,
    /// Events whose dispatch completed.
    pub handled: usize,
    /// Events whose dispatch returned an error or panicked.
    pub failed: usize,
    /// The grace period expired and outstanding tasks were aborted.
    pub timed_out: bool,
}

impl RuntimeStats {
    fn summary(&self, timed_out: bool) -> RunSummary {
        RunSummary {
            accepted: self.accepted.load(Ordering::SeqCst),
            rejected: self.rejected.load(Ordering::SeqCst),
            handled: self.handled.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            timed_out,
        }
    }
}

/// Sending side of one source's queue.
#[derive(Clone)]
pub struct EventSink {
    source: Arc<str>,
    tx: mpsc::Sender<Event>,
    cancel: CancellationToken,
    stats: Arc<RuntimeStats>,
}

impl EventSink {
    /// Queues an event. Returns false once shutdown has started; the event is then dropped.
    pub async fn emit(&self, kind: EventKind, payload: Value) -> bool {
        if self.cancel.is_cancelled() {
            return self.reject(kind);
        }
        let event = Event::new(kind, self.source.as_ref(), payload);
        let event_id = event.id.clone();
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => self.reject(kind),
            sent = self.tx.send(event) => match sent {
                Ok(()) => {
                    self.stats.accepted.fetch_add(1, Ordering::SeqCst);
                    debug!(source = %self.source, event_id = %event_id, kind = %kind, "Event accepted");
                    true
                }
                Err(_) => self.reject(kind),
            },
        }
    }

    fn reject(&self, kind: EventKind) -> bool {
        self.stats.rejected.fetch_add(1, Ordering::SeqCst);
        debug!(source = %self.source, kind = %kind, "Event rejected: shutting down");
        false
    }

    /// Completes when shutdown starts.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Token cancelled when shutdown starts, for futures that must own it.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Owns the configuration, the HTTP session, the handler table and the event sources.
pub struct BotRuntime {
    config: Arc<Config>,
    session: Session,
    table: Arc<HandlerTable>,
    sources: Vec<Box<dyn EventSource>>,
}

impl BotRuntime {
    pub fn new(config: Arc<Config>, session: Session, table: HandlerTable) -> Self {
        Self {
            config,
            session,
            table: Arc::new(table),
            sources: Vec::new(),
        }
    }

    /// Registers a source; each source gets its own queue and worker.
    pub fn add_source(mut self, source: Box<dyn EventSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Runs until `shutdown` completes, every source has finished, or a source fails.
    ///
    /// The session is closed exactly once before returning on every path. Returns the source's error
    /// when one failed, otherwise the run counters.
    #[instrument(skip_all, fields(sources = self.sources.len()))]
    pub async fn run<F>(self, shutdown: F) -> Result<RunSummary>
    where
        F: Future<Output = ()>,
    {
        let BotRuntime {
            config,
            session,
            table,
            sources,
        } = self;

        let cancel = CancellationToken::new();
        let stats = Arc::new(RuntimeStats::default());
        let mut source_tasks = JoinSet::new();
        let mut worker_tasks = JoinSet::new();

        for source in sources {
            let name: Arc<str> = Arc::from(source.name());
            let (tx, rx) = mpsc::channel(SOURCE_QUEUE_CAPACITY);
            worker_tasks.spawn(run_worker(name.clone(), rx, table.clone(), stats.clone()));

            let sink = EventSink {
                source: name.clone(),
                tx,
                cancel: cancel.clone(),
                stats: stats.clone(),
            };
            source_tasks.spawn(async move {
                let outcome = source.run(sink).await;
                (name, outcome)
            });
        }
        info!("Runtime started");

        let mut fatal = None;
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                joined = source_tasks.join_next() => match joined {
                    None => {
                        info!("All event sources finished");
                        break;
                    }
                    Some(Ok((name, Ok(())))) => {
                        info!(source = %name, "Event source finished");
                    }
                    Some(Ok((name, Err(e)))) => {
                        error!(source = %name, error = %e, "Event source failed, shutting down");
                        fatal = Some(e);
                        break;
                    }
                    Some(Err(join_error)) => {
                        error!(error = %join_error, "Event source task panicked, shutting down");
                        fatal = Some(NotifierError::Source(join_error.to_string()));
                        break;
                    }
                },
            }
        }

        cancel.cancel();
        let grace = config.shutdown_grace_period;
        info!(grace_secs = grace.as_secs_f64(), "Stopping event sources and draining queues");

        let drained = tokio::time::timeout(grace, async {
            while let Some(joined) = source_tasks.join_next().await {
                match joined {
                    Ok((name, Ok(()))) => debug!(source = %name, "Event source stopped"),
                    Ok((name, Err(e))) => {
                        warn!(source = %name, error = %e, "Event source failed during shutdown")
                    }
                    Err(join_error) => warn!(error = %join_error, "Event source task panicked during shutdown"),
                }
            }
            while worker_tasks.join_next().await.is_some() {}
        })
        .await;

        let timed_out = drained.is_err();
        if timed_out {
            let err = NotifierError::ShutdownTimeout(grace);
            warn!(error = %err, "In-flight handlers did not finish in time");
            source_tasks.abort_all();
            worker_tasks.abort_all();
        }

        session.close();

        let summary = stats.summary(timed_out);
        info!(
            accepted = summary.accepted,
            rejected = summary.rejected,
            handled = summary.handled,
            failed = summary.failed,
            timed_out = summary.timed_out,
            "Runtime stopped"
        );

        match fatal {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }
}

/// Dispatches one source's events sequentially until its queue is closed and empty.
async fn run_worker(
    source: Arc<str>,
    mut rx: mpsc::Receiver<Event>,
    table: Arc<HandlerTable>,
    stats: Arc<RuntimeStats>,
) {
    while let Some(event) = rx.recv().await {
        let outcome = AssertUnwindSafe(table.dispatch(&event)).catch_unwind().await;
        let failure = match outcome {
            Ok(Ok(_)) => None,
            Ok(Err(e)) => Some(e),
            Err(panic) => Some(NotifierError::Handler(HandlerError::Panicked(panic_message(
                panic.as_ref(),
            )))),
        };
        match failure {
            None => {
                stats.handled.fetch_add(1, Ordering::SeqCst);
            }
            Some(e) => {
                stats.failed.fetch_add(1, Ordering::SeqCst);
                error!(
                    source = %source,
                    event_id = %event.id,
                    kind = %event.kind,
                    error = %e,
                    "Event handling failed"
                );
            }
        }
    }
    debug!(source = %source, "Worker drained");
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
