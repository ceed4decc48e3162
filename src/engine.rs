use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::alerts::AlertDispatcher;
use crate::db::Store;
use crate::email::EmailTransport;
use crate::scheduler::{ProbeClients, Scheduler};

/// Owns the background scheduler + alert dispatcher tasks and the single
/// process-wide "monitoring active" flag (§4.6, §5). Start is idempotent;
/// stop propagates one cancellation and waits for both tasks to exit.
pub struct Engine {
    scheduler: Arc<Scheduler>,
    active: AtomicBool,
    cancel: CancellationToken,
    scheduler_task: std::sync::Mutex<Option<JoinHandle<()>>>,
    dispatcher_task: JoinHandle<()>,
}

impl Engine {
    pub fn new(store: Arc<dyn Store>, transport: Arc<dyn EmailTransport>, tick: std::time::Duration) -> Self {
        let (alert_tx, alert_rx) = mpsc::channel(256);
        let scheduler = Arc::new(Scheduler::new(store.clone(), ProbeClients::build(), alert_tx, tick));
        let dispatcher = AlertDispatcher::new(store, transport);

        // The dispatcher idles until the scheduler (started separately,
        // possibly never) sends events. Because the scheduler keeps its
        // own clone of the sending half alive for as long as the Engine
        // exists, the channel never closes on its own — stop() aborts
        // this task explicitly rather than waiting for that to happen.
        let dispatcher_task = tokio::spawn(dispatcher.run(alert_rx));

        Engine {
            scheduler,
            active: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            scheduler_task: std::sync::Mutex::new(None),
            dispatcher_task,
        }
    }

    pub fn scheduler(&self) -> Arc<Scheduler> {
        self.scheduler.clone()
    }

    /// Starts the scheduler loop as a detached background task. A second
    /// call is a no-op (§4.6).
    pub fn start(&self) {
        if self.active.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("engine starting");
        let scheduler = self.scheduler.clone();
        let cancel = self.cancel.clone();
        let task = tokio::spawn(async move { scheduler.run(cancel).await });
        *self.scheduler_task.lock().unwrap() = Some(task);
    }

    /// Cancels the scheduler loop, waits for it to exit, then tears down
    /// the alert dispatcher. Must complete within 2*tick + max(timeout)
    /// in the worst case (§4.6) — in-flight probes observe cancellation
    /// via their own per-call deadlines, not this token directly.
    pub async fn stop(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("engine stopping");
        self.cancel.cancel();
        let handle = self.scheduler_task.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        self.dispatcher_task.abort();
        info!("engine stopped");
    }
}
