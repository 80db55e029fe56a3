//! Async command queue and wall-clock tick driver.
//!
//! [`StoreHandle`] moves a [`GameStateStore`] onto a tokio task and feeds it
//! commands in submission order. [`ClockDriver`] submits [`Command::Tick`]
//! on a fixed interval through the same queue.

use crate::store::{Command, GameStateStore, StoreError};
use sim_core::GameState;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

const QUEUE_DEPTH: usize = 64;

/// Failures seen by queue clients.
#[derive(Debug, Error, PartialEq)]
pub enum HandleError {
    /// The store rejected the command.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The store task is gone.
    #[error("store task has stopped")]
    Closed,
}

enum Request {
    Dispatch {
        command: Command,
        reply: oneshot::Sender<Result<Arc<GameState>, StoreError>>,
    },
    Sync(oneshot::Sender<()>),
}

/// Cloneable entry point into the store's queue.
#[derive(Clone)]
pub struct CommandSender {
    tx: mpsc::Sender<Request>,
}

impl CommandSender {
    /// Queue a command and wait for its result.
    pub async fn dispatch(&self, command: Command) -> Result<Arc<GameState>, HandleError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Dispatch { command, reply })
            .await
            .map_err(|_| HandleError::Closed)?;
        let result = rx.await.map_err(|_| HandleError::Closed)?;
        Ok(result?)
    }

    /// Wait until every command queued before this call has been applied.
    pub async fn sync(&self) -> Result<(), HandleError> {
        let (done, rx) = oneshot::channel();
        self.tx
            .send(Request::Sync(done))
            .await
            .map_err(|_| HandleError::Closed)?;
        rx.await.map_err(|_| HandleError::Closed)
    }
}

/// Owner-side handle of a store running on its own task.
pub struct StoreHandle {
    sender: CommandSender,
    snapshots: watch::Receiver<Arc<GameState>>,
    task: JoinHandle<GameStateStore>,
}

impl StoreHandle {
    /// Move `store` onto a new task. Must be called inside a tokio runtime.
    pub fn spawn(mut store: GameStateStore) -> StoreHandle {
        let (tx, mut rx) = mpsc::channel::<Request>(QUEUE_DEPTH);
        let (publish, snapshots) = watch::channel(store.state());
        let task = tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                match request {
                    Request::Dispatch { command, reply } => {
                        let result = store.dispatch(command);
                        if let Ok(state) = &result {
                            let published = publish.send_if_modified(|current| {
                                if Arc::ptr_eq(current, state) {
                                    false
                                } else {
                                    *current = Arc::clone(state);
                                    true
                                }
                            });
                            if published {
                                debug!(tick = state.tick(), "snapshot broadcast");
                            }
                        }
                        // The caller may have stopped waiting.
                        let _ = reply.send(result);
                    }
                    Request::Sync(done) => {
                        let _ = done.send(());
                    }
                }
            }
            debug!("store queue closed");
            store
        });
        StoreHandle {
            sender: CommandSender { tx },
            snapshots,
            task,
        }
    }

    /// A sender for other tasks.
    pub fn sender(&self) -> CommandSender {
        self.sender.clone()
    }

    /// Queue a command and wait for its result.
    pub async fn dispatch(&self, command: Command) -> Result<Arc<GameState>, HandleError> {
        self.sender.dispatch(command).await
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<GameState> {
        Arc::clone(&self.snapshots.borrow())
    }

    /// Receiver notified on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<GameState>> {
        self.snapshots.clone()
    }

    /// Close the queue and get the store back. Every other [`CommandSender`]
    /// (including running clock drivers) must be dropped first.
    pub async fn shutdown(self) -> Result<GameStateStore, HandleError> {
        drop(self.sender);
        self.task.await.map_err(|_| HandleError::Closed)
    }
}

/// Submits a tick on a fixed wall-clock interval.
pub struct ClockDriver {
    sender: CommandSender,
    task: JoinHandle<()>,
}

impl ClockDriver {
    /// Start ticking every `period`. The first tick fires one period from now.
    pub fn start(sender: CommandSender, period: Duration) -> ClockDriver {
        let period = period.max(Duration::from_millis(1));
        let ticks = sender.clone();
        let task = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match ticks.dispatch(Command::Tick).await {
                    Ok(_) => {}
                    Err(HandleError::Closed) => break,
                    Err(e) => warn!(error = %e, "scheduled tick failed"),
                }
            }
        });
        info!(period_ms = period.as_millis() as u64, "clock driver started");
        ClockDriver { sender, task }
    }

    /// Stop the driver. No tick is applied after this returns.
    pub async fn stop(self) {
        self.task.abort();
        let _ = self.task.await;
        // A tick queued just before the abort is applied here, not later.
        let _ = self.sender.sync().await;
        info!("clock driver stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::{BusinessSetup, DecisionId, FundingStage, Industry, SimConfig};

    fn running_store() -> GameStateStore {
        let mut store = GameStateStore::new(SimConfig::default()).unwrap();
        store
            .dispatch(Command::CreateBusiness(BusinessSetup {
                name: "Async Co".into(),
                industry: Industry::Service,
                stage: FundingStage::Seed,
                starting_cash: None,
            }))
            .unwrap();
        store.dispatch(Command::Resume).unwrap();
        store
    }

    #[tokio::test(start_paused = true)]
    async fn driver_ticks_on_interval_and_stops_cleanly() {
        let handle = StoreHandle::spawn(running_store());
        let driver = ClockDriver::start(handle.sender(), Duration::from_millis(1_000));
        time::sleep(Duration::from_millis(3_500)).await;
        driver.stop().await;
        let ticks = handle.snapshot().tick();
        assert_eq!(ticks, 3);
        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(handle.snapshot().tick(), ticks);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_store_ignores_driver_ticks() {
        let handle = StoreHandle::spawn(running_store());
        handle.dispatch(Command::Pause).await.unwrap();
        let driver = ClockDriver::start(handle.sender(), Duration::from_millis(500));
        time::sleep(Duration::from_secs(5)).await;
        driver.stop().await;
        assert_eq!(handle.snapshot().tick(), 0);
    }

    #[tokio::test]
    async fn handle_publishes_and_returns_typed_errors() {
        let handle = StoreHandle::spawn(GameStateStore::new(SimConfig::default()).unwrap());
        let mut updates = handle.subscribe();
        let s = handle
            .dispatch(Command::CreateBusiness(BusinessSetup {
                name: "Queue".into(),
                industry: Industry::Tech,
                stage: FundingStage::Bootstrapped,
                starting_cash: None,
            }))
            .await
            .unwrap();
        updates.changed().await.unwrap();
        assert!(Arc::ptr_eq(&updates.borrow(), &s));

        let err = handle
            .dispatch(Command::SelectDecision(DecisionId(99)))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            HandleError::Store(StoreError::InvalidDecision(DecisionId(99)))
        );

        let store = handle.shutdown().await.unwrap();
        assert_eq!(store.state().business.as_ref().unwrap().name, "Queue");
    }
}
