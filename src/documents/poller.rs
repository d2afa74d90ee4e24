//! Waits for the backend to finish analysing a document.
//!
//! A pending document is re-fetched on a fixed interval until its status
//! becomes terminal. [`PollMachine`] holds the state transitions,
//! [`run_poll`] drives them against injectable [`DocumentSource`] and
//! [`Ticker`] implementations, and [`DocumentPoller`] owns the single
//! background task a document view may have.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::documents::model::{Document, DocumentStatus};
use crate::error::ClientError;

#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch_document(&self, id: i64) -> Result<Document, ClientError>;
}

/// Paces successive fetches.
#[async_trait]
pub trait Ticker: Send {
    async fn tick(&mut self);
}

pub struct IntervalTicker {
    interval: Interval,
}

const MIN_PERIOD: Duration = Duration::from_millis(100);

impl IntervalTicker {
    /// First tick fires one full period from now. Periods below 100 ms are raised to it.
    pub fn new(period: Duration) -> Self {
        let period = period.max(MIN_PERIOD);
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling,
    Stopped,
}

/// What the driver must do with its timer after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    StartTimer,
    KeepPolling,
    StopTimer,
    /// Already stopped; nothing to do.
    Ignore,
}

#[derive(Debug)]
pub struct PollMachine {
    state: PollState,
}

impl Default for PollMachine {
    fn default() -> Self {
        Self {
            state: PollState::Idle,
        }
    }
}

impl PollMachine {
    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn observe(&mut self, status: DocumentStatus) -> PollStep {
        match (self.state, status.is_terminal()) {
            (PollState::Stopped, _) => PollStep::Ignore,
            (PollState::Idle, false) => {
                self.state = PollState::Polling;
                PollStep::StartTimer
            }
            (PollState::Polling, false) => PollStep::KeepPolling,
            (PollState::Idle, true) | (PollState::Polling, true) => {
                self.state = PollState::Stopped;
                PollStep::StopTimer
            }
        }
    }

    /// The view went away.
    pub fn teardown(&mut self) -> PollStep {
        let step = match self.state {
            PollState::Polling => PollStep::StopTimer,
            PollState::Idle | PollState::Stopped => PollStep::Ignore,
        };
        self.state = PollState::Stopped;
        step
    }
}

#[derive(Debug)]
pub enum PollEvent {
    Fetched(Document),
    Failed(ClientError),
}

/// Fetch, observe, wait; until the machine stops or the receiver is gone.
///
/// Each fetch completes before the next tick is awaited, so at most one
/// request is in flight.
pub async fn run_poll<S, T>(
    source: &S,
    id: i64,
    ticker: &mut T,
    machine: &Mutex<PollMachine>,
    events: &mpsc::UnboundedSender<PollEvent>,
) where
    S: DocumentSource + ?Sized,
    T: Ticker + ?Sized,
{
    loop {
        let doc = match source.fetch_document(id).await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(id, error = %e, "poll fetch failed, stopping");
                with_machine(machine, |m| m.teardown());
                let _ = events.send(PollEvent::Failed(e));
                return;
            }
        };

        let status = doc.status;
        let step = with_machine(machine, |m| m.observe(status));
        debug!(id, ?status, ?step, "poll observed");

        if events.send(PollEvent::Fetched(doc)).is_err() {
            debug!(id, "document view gone, stopping poll");
            with_machine(machine, |m| m.teardown());
            return;
        }

        match step {
            PollStep::StartTimer => {
                info!(id, "document pending, polling");
                ticker.tick().await;
            }
            PollStep::KeepPolling => ticker.tick().await,
            PollStep::StopTimer => {
                info!(id, ?status, "document analysis finished");
                return;
            }
            PollStep::Ignore => return,
        }
    }
}

fn with_machine<R>(machine: &Mutex<PollMachine>, f: impl FnOnce(&mut PollMachine) -> R) -> R {
    // A panic elsewhere cannot leave the machine half-updated; keep using it.
    let mut guard = machine.lock().unwrap_or_else(|p| p.into_inner());
    f(&mut guard)
}

/// The background poll of one document view.
///
/// Dropping the poller tears the poll down.
pub struct DocumentPoller {
    id: i64,
    source: Arc<dyn DocumentSource>,
    period: Duration,
    machine: Arc<Mutex<PollMachine>>,
    task: Option<JoinHandle<()>>,
}

impl DocumentPoller {
    pub fn new(source: Arc<dyn DocumentSource>, id: i64, period: Duration) -> Self {
        Self {
            id,
            source,
            period,
            machine: Arc::new(Mutex::new(PollMachine::default())),
            task: None,
        }
    }

    pub fn state(&self) -> PollState {
        with_machine(&self.machine, |m| m.state())
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Starts polling on the configured interval.
    ///
    /// Returns `None` when a poll is already running or has already
    /// stopped, so a view never ends up with two timers.
    pub fn start(&mut self) -> Option<mpsc::UnboundedReceiver<PollEvent>> {
        let ticker = IntervalTicker::new(self.period);
        self.start_with(ticker)
    }

    pub fn start_with<T>(&mut self, mut ticker: T) -> Option<mpsc::UnboundedReceiver<PollEvent>>
    where
        T: Ticker + 'static,
    {
        if self.task.is_some() || self.state() != PollState::Idle {
            debug!(id = self.id, "poll already started, ignoring");
            return None;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let source = self.source.clone();
        let machine = self.machine.clone();
        let id = self.id;
        self.task = Some(tokio::spawn(async move {
            run_poll(source.as_ref(), id, &mut ticker, &machine, &tx).await;
        }));
        Some(rx)
    }

    /// Tears the poll down: the timer is cleared and no further fetch is issued.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if with_machine(&self.machine, |m| m.teardown()) == PollStep::StopTimer {
            info!(id = self.id, "poll cancelled");
        }
    }
}

impl Drop for DocumentPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
