//! Watch session loop
//!
//! One task, one `select!`: observer events, the debounce deadline, the
//! in-flight sync action and the shutdown signal are multiplexed here, so the
//! coordinator is only ever touched sequentially.

use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::debounce::{ChangeOutcome, Coordinator, CoordinatorStats, Dispatch, TimerHandle};
use crate::observer::Subscription;
use crate::{ChangeEvent, ObserverEvent, SyncAction};

type InFlight<'a, E> = Pin<Box<dyn Future<Output = Result<(), E>> + Send + 'a>>;

/// Source of observer events consumed by the session loop
#[async_trait]
pub trait EventSource: Send {
    /// `None` once the source is exhausted
    async fn next_event(&mut self) -> Option<ObserverEvent>;
}

#[async_trait]
impl EventSource for Subscription {
    async fn next_event(&mut self) -> Option<ObserverEvent> {
        self.next().await
    }
}

#[async_trait]
impl EventSource for mpsc::Receiver<ObserverEvent> {
    async fn next_event(&mut self) -> Option<ObserverEvent> {
        self.recv().await
    }
}

/// Progress reported to the caller for presentation
#[derive(Debug)]
pub enum Notice<'a, E> {
    /// A change was recorded and a countdown (re)started
    Queued {
        event: &'a ChangeEvent,
        rearmed: bool,
        fires_in: Duration,
    },
    /// A change arrived while an action was running
    Dropped { event: &'a ChangeEvent },
    /// The observer reported a non-fatal error
    ObserverError { message: &'a str },
    /// The quiet window elapsed; the action is starting
    Dispatching { dispatch: &'a Dispatch },
    Succeeded,
    Failed { error: &'a E },
    /// Shutdown requested while an action runs; waiting for it
    Draining,
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub stats: CoordinatorStats,
    /// A pending countdown was cancelled by shutdown
    pub cancelled_pending: bool,
}

/// Drive `coordinator` until `shutdown` resolves or `source` is exhausted
///
/// Shutdown cancels the pending countdown and waits for an in-flight action
/// to finish; it never abandons a push half way. When the source ends, the
/// loop keeps going until the coordinator is idle again.
pub async fn run_session<S, A, F, N>(
    coordinator: &mut Coordinator,
    source: &mut S,
    action: &A,
    shutdown: F,
    mut notice: N,
) -> SessionSummary
where
    S: EventSource + ?Sized,
    A: SyncAction + ?Sized,
    F: Future<Output = ()>,
    N: FnMut(Notice<'_, A::Error>),
{
    tokio::pin!(shutdown);
    let mut in_flight: Option<InFlight<'_, A::Error>> = None;
    let mut source_open = true;

    loop {
        if !source_open && in_flight.is_none() && coordinator.pending_timer().is_none() {
            debug!("event source closed and coordinator idle");
            break;
        }

        let timer = coordinator.pending_timer();

        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("shutdown requested");
                break;
            }

            outcome = wait_in_flight(&mut in_flight), if in_flight.is_some() => {
                in_flight = None;
                coordinator.complete(&outcome);
                match &outcome {
                    Ok(()) => notice(Notice::Succeeded),
                    Err(error) => notice(Notice::Failed { error }),
                }
            }

            handle = wait_deadline(timer), if timer.is_some() => {
                if let Some(dispatch) = coordinator.fire(handle) {
                    notice(Notice::Dispatching { dispatch: &dispatch });
                    in_flight = Some(action.run(dispatch.message));
                }
            }

            event = source.next_event(), if source_open => match event {
                Some(ObserverEvent::Change(change)) => {
                    let now = Instant::now();
                    match coordinator.record(&change, now) {
                        ChangeOutcome::Armed { deadline, .. } => notice(Notice::Queued {
                            event: &change,
                            rearmed: false,
                            fires_in: deadline.duration_since(now),
                        }),
                        ChangeOutcome::Rearmed { deadline, .. } => notice(Notice::Queued {
                            event: &change,
                            rearmed: true,
                            fires_in: deadline.duration_since(now),
                        }),
                        ChangeOutcome::Dropped => notice(Notice::Dropped { event: &change }),
                    }
                }
                Some(ObserverEvent::Error(message)) => {
                    notice(Notice::ObserverError { message: &message });
                }
                None => {
                    debug!("event source exhausted");
                    source_open = false;
                }
            },
        }
    }

    let cancelled_pending = coordinator.cancel().is_some();

    if let Some(fut) = in_flight.take() {
        notice(Notice::Draining);
        let outcome = fut.await;
        coordinator.complete(&outcome);
        match &outcome {
            Ok(()) => notice(Notice::Succeeded),
            Err(error) => notice(Notice::Failed { error }),
        }
    }

    SessionSummary {
        stats: coordinator.stats(),
        cancelled_pending,
    }
}

async fn wait_in_flight<E>(slot: &mut Option<InFlight<'_, E>>) -> Result<(), E> {
    match slot {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

async fn wait_deadline(timer: Option<(TimerHandle, Instant)>) -> TimerHandle {
    match timer {
        Some((handle, deadline)) => {
            tokio::time::sleep_until(deadline).await;
            handle
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChangeKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::oneshot;

    const D: Duration = Duration::from_secs(15);

    #[derive(Debug, thiserror::Error)]
    enum FakeError {
        #[error("nothing to commit")]
        NoChanges,
    }

    /// Records every invocation; optionally fails or takes time
    #[derive(Default)]
    struct FakeAction {
        calls: Mutex<Vec<(Instant, String)>>,
        running: AtomicUsize,
        max_running: AtomicUsize,
        fail_first: bool,
        work: Duration,
    }

    #[async_trait]
    impl SyncAction for FakeAction {
        type Error = FakeError;

        async fn run(&self, message: String) -> Result<(), FakeError> {
            let index = {
                let mut calls = self.calls.lock().unwrap();
                calls.push((Instant::now(), message));
                calls.len()
            };
            let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_running.fetch_max(running, Ordering::SeqCst);
            if !self.work.is_zero() {
                tokio::time::sleep(self.work).await;
            }
            self.running.fetch_sub(1, Ordering::SeqCst);

            if self.fail_first && index == 1 {
                Err(FakeError::NoChanges)
            } else {
                Ok(())
            }
        }
    }

    fn change(path: &str, kind: ChangeKind) -> ObserverEvent {
        ObserverEvent::Change(ChangeEvent::new(path, kind))
    }

    fn never() -> impl Future<Output = ()> {
        std::future::pending()
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_dispatches_once_after_last_event() {
        let (tx, mut rx) = mpsc::channel(16);
        let action = Arc::new(FakeAction::default());
        let start = Instant::now();

        let session_action = action.clone();
        let session = tokio::spawn(async move {
            let mut coordinator = Coordinator::new(D);
            run_session(&mut coordinator, &mut rx, session_action.as_ref(), never(), |_| {}).await
        });

        tx.send(change("a.txt", ChangeKind::Modified)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        tx.send(change("b.txt", ChangeKind::Modified)).await.unwrap();
        drop(tx);

        let summary = session.await.unwrap();
        let calls = action.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.duration_since(start), Duration::from_secs(20));
        assert_eq!(summary.stats.dispatched, 1);
        assert_eq!(summary.stats.timer_resets, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_events_produce_one_message_listing_both() {
        let (tx, mut rx) = mpsc::channel(16);
        let action = Arc::new(FakeAction::default());

        let session_action = action.clone();
        let session = tokio::spawn(async move {
            let mut coordinator = Coordinator::new(D);
            run_session(&mut coordinator, &mut rx, session_action.as_ref(), never(), |_| {}).await
        });

        tx.send(change("notes.md", ChangeKind::Modified)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(change("old.md", ChangeKind::Deleted)).await.unwrap();
        drop(tx);

        session.await.unwrap();
        let calls = action.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].1.contains("modified: notes.md"));
        assert!(calls[0].1.contains("deleted: old.md"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_during_processing_never_overlap() {
        let (tx, mut rx) = mpsc::channel(16);
        let action = Arc::new(FakeAction {
            work: Duration::from_secs(10),
            ..FakeAction::default()
        });
        let dropped = Arc::new(AtomicUsize::new(0));

        let session_action = action.clone();
        let session_dropped = dropped.clone();
        let session = tokio::spawn(async move {
            let mut coordinator = Coordinator::new(D);
            run_session(&mut coordinator, &mut rx, session_action.as_ref(), never(), |n| {
                if let Notice::Dropped { .. } = n {
                    session_dropped.fetch_add(1, Ordering::SeqCst);
                }
            })
            .await
        });

        tx.send(change("a.txt", ChangeKind::Modified)).await.unwrap();
        // Action starts at t=15 and runs until t=25
        tokio::time::sleep(Duration::from_secs(18)).await;
        tx.send(change("b.txt", ChangeKind::Modified)).await.unwrap();
        tx.send(change("c.txt", ChangeKind::Added)).await.unwrap();
        drop(tx);

        let summary = session.await.unwrap();
        assert_eq!(action.calls.lock().unwrap().len(), 1);
        assert_eq!(action.max_running.load(Ordering::SeqCst), 1);
        assert_eq!(dropped.load(Ordering::SeqCst), 2);
        assert_eq!(summary.stats.events_dropped, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_returns_to_idle_and_next_burst_runs() {
        let (tx, mut rx) = mpsc::channel(16);
        let action = Arc::new(FakeAction {
            fail_first: true,
            ..FakeAction::default()
        });
        let failures = Arc::new(AtomicUsize::new(0));
        let start = Instant::now();

        let session_action = action.clone();
        let session_failures = failures.clone();
        let session = tokio::spawn(async move {
            let mut coordinator = Coordinator::new(D);
            run_session(&mut coordinator, &mut rx, session_action.as_ref(), never(), |n| {
                if let Notice::Failed { .. } = n {
                    session_failures.fetch_add(1, Ordering::SeqCst);
                }
            })
            .await
        });

        tx.send(change("a.txt", ChangeKind::Modified)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        tx.send(change("b.txt", ChangeKind::Modified)).await.unwrap();
        drop(tx);

        let summary = session.await.unwrap();
        let calls = action.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        // Second burst gets the full window again
        assert_eq!(calls[1].0.duration_since(start), Duration::from_secs(45));
        assert_eq!(failures.load(Ordering::SeqCst), 1);
        assert_eq!(summary.stats.failed, 1);
        assert_eq!(summary.stats.succeeded, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_while_pending_cancels_action() {
        let (tx, mut rx) = mpsc::channel(16);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let action = Arc::new(FakeAction::default());

        let session_action = action.clone();
        let session = tokio::spawn(async move {
            let mut coordinator = Coordinator::new(D);
            let shutdown = async {
                let _ = stop_rx.await;
            };
            run_session(&mut coordinator, &mut rx, session_action.as_ref(), shutdown, |_| {}).await
        });

        tx.send(change("a.txt", ChangeKind::Modified)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        stop_tx.send(()).unwrap();

        let summary = session.await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert!(summary.cancelled_pending);
        assert!(action.calls.lock().unwrap().is_empty());
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_while_processing_waits_for_action() {
        let (tx, mut rx) = mpsc::channel(16);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let action = Arc::new(FakeAction {
            work: Duration::from_secs(10),
            ..FakeAction::default()
        });
        let drained = Arc::new(AtomicUsize::new(0));

        let session_action = action.clone();
        let session_drained = drained.clone();
        let session = tokio::spawn(async move {
            let mut coordinator = Coordinator::new(D);
            let shutdown = async {
                let _ = stop_rx.await;
            };
            run_session(&mut coordinator, &mut rx, session_action.as_ref(), shutdown, |n| {
                if let Notice::Draining = n {
                    session_drained.fetch_add(1, Ordering::SeqCst);
                }
            })
            .await
        });

        tx.send(change("a.txt", ChangeKind::Modified)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(17)).await;
        stop_tx.send(()).unwrap();

        let summary = session.await.unwrap();
        assert!(!summary.cancelled_pending);
        assert_eq!(summary.stats.succeeded, 1);
        assert_eq!(drained.load(Ordering::SeqCst), 1);
        assert_eq!(action.running.load(Ordering::SeqCst), 0);
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn test_observer_errors_are_reported_not_fatal() {
        let (tx, mut rx) = mpsc::channel(16);
        let action = Arc::new(FakeAction::default());
        let errors = Arc::new(Mutex::new(Vec::new()));

        let session_action = action.clone();
        let session_errors = errors.clone();
        let session = tokio::spawn(async move {
            let mut coordinator = Coordinator::new(D);
            run_session(&mut coordinator, &mut rx, session_action.as_ref(), never(), |n| {
                if let Notice::ObserverError { message } = n {
                    session_errors.lock().unwrap().push(message.to_string());
                }
            })
            .await
        });

        tx.send(ObserverEvent::Error("permission denied: secret/".into())).await.unwrap();
        tx.send(change("a.txt", ChangeKind::Added)).await.unwrap();
        drop(tx);

        session.await.unwrap();
        assert_eq!(errors.lock().unwrap().as_slice(), ["permission denied: secret/"]);
        assert_eq!(action.calls.lock().unwrap().len(), 1);
    }
}
