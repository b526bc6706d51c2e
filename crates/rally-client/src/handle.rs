//! Handles to running pipelines.
//!
//! A handle owns its pipeline task. Intents go in through an unbounded
//! queue; views come out through a `watch` channel holding the latest
//! snapshot. Dropping a handle aborts the task, `shutdown` stops it cleanly.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Handle to a pipeline task accepting `C` intents and publishing `V` views.
#[derive(Debug)]
pub struct ClientHandle<C, V> {
    commands: Option<mpsc::UnboundedSender<C>>,
    task: Option<JoinHandle<()>>,
    view: watch::Receiver<V>,
}

impl<C, V> ClientHandle<C, V> {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<C>,
        task: JoinHandle<()>,
        view: watch::Receiver<V>,
    ) -> Self {
        Self {
            commands: Some(commands),
            task: Some(task),
            view,
        }
    }

    /// Subscribe to view snapshots.
    #[must_use]
    pub fn view(&self) -> watch::Receiver<V> {
        self.view.clone()
    }

    /// Whether the pipeline task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Queue an intent. Returns `false` if the pipeline has stopped.
    pub(crate) fn command(&self, command: C) -> bool {
        self.commands
            .as_ref()
            .is_some_and(|commands| commands.send(command).is_ok())
    }

    /// Stop the pipeline: pending intents are processed, the channel is
    /// closed and the task is joined. No view is published afterwards.
    pub async fn shutdown(mut self) {
        self.commands = None;
        if let Some(task) = self.task.take() {
            match task.await {
                Ok(()) => debug!("Pipeline stopped"),
                Err(e) if e.is_cancelled() => debug!("Pipeline cancelled"),
                Err(e) => error!(error = %e, "Pipeline task failed"),
            }
        }
    }
}

impl<C, V: Clone> ClientHandle<C, V> {
    /// The latest view snapshot.
    #[must_use]
    pub fn current(&self) -> V {
        self.view.borrow().clone()
    }
}

impl<C, V> Drop for ClientHandle<C, V> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
