//! Background computations with a single ordered consumer.
//!
//! Workers run on tokio's blocking pool and never touch planner state.
//! Everything they produce travels as an owned message over one unbounded
//! channel, so messages from one worker arrive in the order it sent them.
//! The owner of the queue turns those messages into [`Effect`]s by calling
//! [`AsyncTaskQueue::drain`] or [`AsyncTaskQueue::next_effect`].

use std::collections::{HashMap, HashSet};
use std::fmt;

use tokio::sync::mpsc;

use crate::error::{PlannerError, Result};
use crate::services::ProgressFn;

/// Logical kind of background work. At most one task per target runs at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskTarget {
    CatalogLoad,
    ScheduleSearch,
}

impl fmt::Display for TaskTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskTarget::CatalogLoad => write!(f, "catalog load"),
            TaskTarget::ScheduleSearch => write!(f, "schedule search"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Something the consumer has to apply
#[derive(Debug)]
pub enum Effect<T> {
    Progress {
        id: TaskId,
        target: TaskTarget,
        fraction: f64,
        text: String,
    },
    Completed {
        id: TaskId,
        target: TaskTarget,
        output: T,
    },
    /// The worker returned an error or panicked
    Failed {
        id: TaskId,
        target: TaskTarget,
        error: PlannerError,
    },
}

impl<T> Effect<T> {
    pub fn id(&self) -> TaskId {
        match self {
            Effect::Progress { id, .. } | Effect::Completed { id, .. } | Effect::Failed { id, .. } => *id,
        }
    }

    pub fn target(&self) -> TaskTarget {
        match self {
            Effect::Progress { target, .. } | Effect::Completed { target, .. } | Effect::Failed { target, .. } => {
                *target
            }
        }
    }

    /// True for the last effect a task produces
    pub fn is_final(&self) -> bool {
        !matches!(self, Effect::Progress { .. })
    }
}

enum Message<T> {
    Progress { id: TaskId, fraction: f64, text: String },
    Finished { id: TaskId, result: Result<T> },
    Panicked { id: TaskId },
}

struct ProgressReporter<T> {
    id: TaskId,
    sender: mpsc::UnboundedSender<Message<T>>,
}

impl<T> ProgressReporter<T> {
    fn report(&self, fraction: f64, text: &str) {
        let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
        // The queue may already be gone; progress is best effort.
        let _ = self.sender.send(Message::Progress {
            id: self.id,
            fraction,
            text: text.to_string(),
        });
    }
}

pub struct AsyncTaskQueue<T> {
    sender: mpsc::UnboundedSender<Message<T>>,
    receiver: mpsc::UnboundedReceiver<Message<T>>,
    running: HashMap<TaskId, TaskTarget>,
    disposed: HashSet<TaskId>,
    next_id: u64,
}

impl<T: Send + 'static> Default for AsyncTaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> AsyncTaskQueue<T> {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver,
            running: HashMap::new(),
            disposed: HashSet::new(),
            next_id: 0,
        }
    }

    /// A target stays busy until its final effect has been handed out
    pub fn is_running(&self, target: TaskTarget) -> bool {
        self.running.values().any(|t| *t == target)
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    /// Starts `work` on the blocking pool. Must be called from inside a
    /// tokio runtime.
    pub fn spawn<F>(&mut self, target: TaskTarget, work: F) -> Result<TaskId>
    where
        F: FnOnce(ProgressFn<'_>) -> Result<T> + Send + 'static,
    {
        if self.is_running(target) {
            return Err(PlannerError::TaskBusy { target });
        }

        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.running.insert(id, target);
        tracing::debug!(task = %id, %target, "Starting background task");

        let reporter = ProgressReporter {
            id,
            sender: self.sender.clone(),
        };
        let worker = tokio::task::spawn_blocking(move || {
            let progress = |fraction: f64, text: &str| reporter.report(fraction, text);
            work(&progress)
        });

        let sender = self.sender.clone();
        tokio::spawn(async move {
            let message = match worker.await {
                Ok(result) => Message::Finished { id, result },
                Err(err) => {
                    tracing::error!(task = %id, %target, error = %err, "Background task panicked");
                    Message::Panicked { id }
                }
            };
            let _ = sender.send(message);
        });

        Ok(id)
    }

    /// Drops progress of `id` that has not been handed out yet, and all
    /// later progress. The final effect is still delivered. Returns false
    /// if the task is not running.
    pub fn dispose(&mut self, id: TaskId) -> bool {
        if !self.running.contains_key(&id) {
            return false;
        }
        tracing::debug!(task = %id, "Disposing task progress");
        self.disposed.insert(id)
    }

    /// Every effect available right now, without waiting
    pub fn drain(&mut self) -> Vec<Effect<T>> {
        let mut effects = Vec::new();
        while let Ok(message) = self.receiver.try_recv() {
            if let Some(effect) = self.apply(message) {
                effects.push(effect);
            }
        }
        effects
    }

    /// Waits for the next effect. Returns `None` once nothing is running.
    pub async fn next_effect(&mut self) -> Option<Effect<T>> {
        while !self.running.is_empty() {
            let message = self.receiver.recv().await?;
            if let Some(effect) = self.apply(message) {
                return Some(effect);
            }
        }
        None
    }

    fn apply(&mut self, message: Message<T>) -> Option<Effect<T>> {
        match message {
            Message::Progress { id, fraction, text } => {
                if self.disposed.contains(&id) {
                    return None;
                }
                let target = *self.running.get(&id)?;
                Some(Effect::Progress {
                    id,
                    target,
                    fraction,
                    text,
                })
            }
            Message::Finished { id, result } => {
                let target = self.finish(id)?;
                Some(match result {
                    Ok(output) => Effect::Completed { id, target, output },
                    Err(error) => {
                        tracing::warn!(task = %id, %target, %error, "Background task failed");
                        Effect::Failed { id, target, error }
                    }
                })
            }
            Message::Panicked { id } => {
                let target = self.finish(id)?;
                Some(Effect::Failed {
                    id,
                    target,
                    error: PlannerError::TaskPanicked { target },
                })
            }
        }
    }

    fn finish(&mut self, id: TaskId) -> Option<TaskTarget> {
        self.disposed.remove(&id);
        self.running.remove(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::mpsc as std_mpsc;

    async fn collect_all(queue: &mut AsyncTaskQueue<u32>) -> Vec<Effect<u32>> {
        let mut effects = Vec::new();
        while let Some(effect) = queue.next_effect().await {
            effects.push(effect);
        }
        effects
    }

    #[tokio::test]
    async fn progress_arrives_in_order_before_completion() {
        let mut queue = AsyncTaskQueue::new();
        queue
            .spawn(TaskTarget::CatalogLoad, |progress| {
                progress(0.0, "start");
                progress(0.5, "half");
                progress(2.0, "done");
                Ok(42)
            })
            .unwrap();

        let effects = collect_all(&mut queue).await;
        let fractions: Vec<f64> = effects
            .iter()
            .filter_map(|e| match e {
                Effect::Progress { fraction, .. } => Some(*fraction),
                _ => None,
            })
            .collect();
        assert_eq!(fractions, vec![0.0, 0.5, 1.0]);
        assert!(matches!(effects.last(), Some(Effect::Completed { output: 42, .. })));
        assert!(!queue.is_running(TaskTarget::CatalogLoad));
    }

    #[tokio::test]
    async fn same_target_cannot_overlap_but_different_targets_can() {
        let (release_tx, release_rx) = std_mpsc::channel::<()>();
        let mut queue = AsyncTaskQueue::new();
        queue
            .spawn(TaskTarget::ScheduleSearch, move |_| {
                let _ = release_rx.recv();
                Ok(1)
            })
            .unwrap();

        assert!(matches!(
            queue.spawn(TaskTarget::ScheduleSearch, |_| Ok(2)),
            Err(PlannerError::TaskBusy {
                target: TaskTarget::ScheduleSearch
            })
        ));
        queue.spawn(TaskTarget::CatalogLoad, |_| Ok(3)).unwrap();
        assert_eq!(queue.running_count(), 2);

        release_tx.send(()).unwrap();
        let mut outputs: Vec<u32> = collect_all(&mut queue)
            .await
            .into_iter()
            .filter_map(|e| match e {
                Effect::Completed { output, .. } => Some(output),
                _ => None,
            })
            .collect();
        outputs.sort();
        assert_eq!(outputs, vec![1, 3]);

        // Target is free again once its completion was handed out
        assert!(queue.spawn(TaskTarget::ScheduleSearch, |_| Ok(4)).is_ok());
    }

    #[tokio::test]
    async fn dispose_drops_queued_progress_but_keeps_completion() {
        let (reported_tx, reported_rx) = std_mpsc::channel::<()>();
        let (release_tx, release_rx) = std_mpsc::channel::<()>();
        let mut queue = AsyncTaskQueue::new();
        let id = queue
            .spawn(TaskTarget::ScheduleSearch, move |progress| {
                progress(0.1, "a");
                progress(0.2, "b");
                let _ = reported_tx.send(());
                let _ = release_rx.recv();
                progress(0.9, "c");
                Ok(7)
            })
            .unwrap();

        tokio::task::spawn_blocking(move || reported_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(queue.dispose(id));
        release_tx.send(()).unwrap();

        let effects = collect_all(&mut queue).await;
        assert_eq!(effects.len(), 1);
        assert!(matches!(effects[0], Effect::Completed { output: 7, .. }));
        assert!(!queue.dispose(id));
    }

    #[tokio::test]
    async fn worker_errors_become_failed_effects() {
        let mut queue = AsyncTaskQueue::new();
        queue
            .spawn(TaskTarget::CatalogLoad, |_| {
                Err(PlannerError::UnknownCourseNumber {
                    number: "1".to_string(),
                })
            })
            .unwrap();
        let effects = collect_all(&mut queue).await;
        assert!(matches!(
            &effects[..],
            [Effect::Failed {
                error: PlannerError::UnknownCourseNumber { .. },
                ..
            }]
        ));
    }

    #[tokio::test]
    async fn panics_are_reported_instead_of_hanging() {
        let mut queue: AsyncTaskQueue<u32> = AsyncTaskQueue::new();
        queue
            .spawn(TaskTarget::ScheduleSearch, |_| panic!("scheduler crashed"))
            .unwrap();
        let effects = collect_all(&mut queue).await;
        assert_eq!(effects.len(), 1);
        assert!(effects[0].is_final());
        assert!(matches!(
            effects[0],
            Effect::Failed {
                target: TaskTarget::ScheduleSearch,
                error: PlannerError::TaskPanicked { .. },
                ..
            }
        ));
        assert!(!queue.is_running(TaskTarget::ScheduleSearch));
    }

    #[tokio::test]
    async fn drain_is_empty_when_idle() {
        let mut queue: AsyncTaskQueue<u32> = AsyncTaskQueue::new();
        assert!(queue.drain().is_empty());
        assert!(queue.next_effect().await.is_none());
    }
}
