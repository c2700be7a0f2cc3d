//! Periodic re-running of a refresh task that can be paused and resumed.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

/// A refresh run; resolves to whether it succeeded.
pub type Task = Arc<dyn Fn() -> BoxFuture<'static, bool> + Send + Sync>;

/// Owns the scheduled refresh task and the time of the last successful run.
///
/// The first scheduled run happens one interval after starting or resuming.
/// Dropping the context cancels the schedule.
pub struct RefreshContext {
    interval: Duration,
    task: Option<Task>,
    last_update: Arc<Mutex<Option<DateTime<Utc>>>>,
    handle: Option<JoinHandle<()>>,
    enabled: bool,
}

impl RefreshContext {
    pub fn new(interval: Duration) -> RefreshContext {
        RefreshContext {
            interval,
            task: None,
            last_update: Arc::new(Mutex::new(None)),
            handle: None,
            enabled: false,
        }
    }

    /// Replaces any current schedule with `task` every `interval`.
    pub fn start(&mut self, interval: Duration, task: Task) {
        self.abort();
        self.interval = interval;
        self.task = Some(task);
        self.enabled = true;
        self.spawn();
        log::info!("Auto-refresh enabled ({}s)", interval.as_secs());
    }

    /// Cancels the schedule and disables it.
    pub fn stop(&mut self) {
        self.abort();
        self.enabled = false;
        log::info!("Auto-refresh disabled");
    }

    /// Cancels the schedule but leaves it enabled.
    pub fn pause(&mut self) {
        if self.handle.is_some() {
            self.abort();
            log::info!("Auto-refresh paused");
        }
    }

    /// Restarts an enabled schedule after [`pause`](Self::pause).
    pub fn resume(&mut self) {
        if self.enabled && self.handle.is_none() {
            self.spawn();
            log::info!("Auto-refresh resumed");
        }
    }

    /// Stops an enabled schedule, or starts the last task again.
    pub fn toggle(&mut self) {
        if self.enabled {
            self.stop();
        } else if let Some(task) = self.task.clone() {
            self.start(self.interval, task);
        }
    }

    /// Runs the task once, outside the schedule.
    pub async fn refresh_now(&self) -> bool {
        match &self.task {
            Some(task) => run(task, &self.last_update).await,
            None => false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update.lock().ok().and_then(|guard| *guard)
    }

    fn spawn(&mut self) {
        let task = match &self.task {
            Some(task) => task.clone(),
            None => return,
        };
        let last_update = self.last_update.clone();
        let period = self.interval.max(Duration::from_millis(1));

        self.handle = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                log::debug!("Scheduled refresh");
                run(&task, &last_update).await;
            }
        }));
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for RefreshContext {
    fn drop(&mut self) {
        self.abort();
    }
}

async fn run(task: &Task, last_update: &Mutex<Option<DateTime<Utc>>>) -> bool {
    let succeeded = task().await;

    if succeeded {
        if let Ok(mut guard) = last_update.lock() {
            *guard = Some(Utc::now());
        }
    } else {
        log::warn!("Refresh failed");
    }

    succeeded
}
