//! Actor wrapper that owns a [`Workspace`] on a single task.
//!
//! HTTP handlers never touch workspace state directly. They send a closure to
//! the actor over an mpsc channel and await its result on a oneshot, so every
//! mutation is serialised without locks. Timer expirations from the
//! [`TokioScheduler`] are fed into the same loop.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{broadcast, mpsc, oneshot};

use super::{Workspace, WorkspaceSettings};
use crate::events::WorkspaceEvent;
use crate::prefs::PreferenceStore;
use crate::scheduler::{Fired, TokioScheduler};

/// Queued commands before senders wait.
const JOB_CAPACITY: usize = 64;

type Job = Box<dyn FnOnce(&mut Workspace) + Send>;

/// Errors from talking to the workspace actor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkspaceError {
    /// The actor task has stopped.
    #[error("workspace actor is no longer running")]
    Closed,
}

/// Cloneable handle to a running workspace actor.
#[derive(Debug, Clone)]
pub struct WorkspaceHandle {
    jobs: mpsc::Sender<Job>,
    events: broadcast::Sender<WorkspaceEvent>,
}

impl WorkspaceHandle {
    /// Run `f` against the workspace and return its result.
    pub async fn with<F, R>(&self, f: F) -> Result<R, WorkspaceError>
    where
        F: FnOnce(&mut Workspace) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move |workspace| {
            let _ = tx.send(f(workspace));
        });
        self.jobs
            .send(job)
            .await
            .map_err(|_| WorkspaceError::Closed)?;
        rx.await.map_err(|_| WorkspaceError::Closed)
    }

    /// Subscribe to workspace change events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<WorkspaceEvent> {
        self.events.subscribe()
    }
}

/// Build a workspace on a tokio-backed scheduler and spawn its actor task.
///
/// The task stops once every [`WorkspaceHandle`] has been dropped; dropping
/// the workspace cancels its pending timers and releases any drag.
pub fn spawn_workspace(
    settings: WorkspaceSettings,
    prefs: Arc<dyn PreferenceStore>,
) -> WorkspaceHandle {
    let (scheduler, fired) = TokioScheduler::new();
    let workspace = Workspace::new(
        settings,
        prefs,
        Arc::new(scheduler),
        StdRng::from_entropy(),
    );
    let events = workspace.events();
    let (jobs, rx) = mpsc::channel(JOB_CAPACITY);

    tokio::spawn(run(workspace, rx, fired));

    WorkspaceHandle { jobs, events }
}

async fn run(
    mut workspace: Workspace,
    mut jobs: mpsc::Receiver<Job>,
    mut fired: mpsc::UnboundedReceiver<Fired>,
) {
    tracing::debug!("Workspace actor started");
    loop {
        tokio::select! {
            job = jobs.recv() => match job {
                Some(job) => job(&mut workspace),
                None => break,
            },
            Some(timer) = fired.recv() => {
                workspace.on_timer(timer);
            }
        }
    }
    tracing::debug!("Workspace actor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::MemoryPrefs;
    use std::time::Duration;
    use url::Url;

    fn handle() -> WorkspaceHandle {
        let settings = WorkspaceSettings::new(Url::parse("http://127.0.0.1:3000").unwrap());
        spawn_workspace(settings, Arc::new(MemoryPrefs::new()))
    }

    #[tokio::test]
    async fn test_with_returns_closure_result() {
        let workspace = handle();
        let theme = workspace.with(|ws| ws.toggle_theme(None)).await.unwrap();
        assert_eq!(theme, crate::prefs::Theme::Light);

        let snapshot = workspace.with(|ws| ws.snapshot()).await.unwrap();
        assert_eq!(snapshot.theme, crate::prefs::Theme::Light);
        assert_eq!(snapshot.messages.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_arrives_through_timer_loop() {
        let workspace = handle();
        let mut events = workspace.subscribe();

        workspace
            .with(|ws| ws.send_message("check mobile layout"))
            .await
            .unwrap()
            .unwrap();

        tokio::time::sleep(Duration::from_millis(1600)).await;

        let mut names = Vec::new();
        while let Ok(event) = events.try_recv() {
            names.push(event.event_name());
        }
        assert_eq!(names, vec!["message", "typing", "message", "typing"]);

        let snapshot = workspace.with(|ws| ws.snapshot()).await.unwrap();
        assert_eq!(snapshot.messages.len(), 3);
        assert!(!snapshot.typing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_preview_timeout_fires_once() {
        let workspace = handle();
        workspace
            .with(|ws| ws.submit_url("example.com"))
            .await
            .unwrap()
            .unwrap();

        tokio::time::sleep(Duration::from_secs(11)).await;
        let preview = workspace.with(|ws| ws.snapshot().preview).await.unwrap();
        assert!(!preview.is_loading);
        assert_eq!(
            preview.load_error.as_deref(),
            Some(crate::preview::LOAD_TIMED_OUT_MESSAGE)
        );
    }
}
