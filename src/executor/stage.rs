//! Transaction stage state machine
//!
//! ```text
//! idle ─► approving ─► depositing ──┐
//!   │        ▲  │                    ├─► confirming ─► success
//!   │        └──┘                    │
//!   ├──────────────► depositing ─────┤
//!   └──────────────► withdrawing ────┘
//!
//! any non-terminal stage ─► error
//! cancellation ─► idle
//! ```

use std::fmt;
use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionStage {
    Idle,
    Approving,
    Depositing,
    Withdrawing,
    Confirming,
    Success,
    Error,
}

impl TransactionStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStage::Success | TransactionStage::Error)
    }

    /// A transaction is in flight
    pub fn is_active(&self) -> bool {
        !self.is_terminal() && *self != TransactionStage::Idle
    }

    pub fn can_transition_to(&self, next: TransactionStage) -> bool {
        use TransactionStage::*;

        if next == Error {
            return !self.is_terminal();
        }

        matches!(
            (self, next),
            (Idle, Approving)
                | (Idle, Depositing)
                | (Idle, Withdrawing)
                | (Approving, Approving)
                | (Approving, Depositing)
                | (Depositing, Confirming)
                | (Withdrawing, Confirming)
                | (Confirming, Success)
        )
    }
}

impl fmt::Display for TransactionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStage::Idle => "idle",
            TransactionStage::Approving => "approving",
            TransactionStage::Depositing => "depositing",
            TransactionStage::Withdrawing => "withdrawing",
            TransactionStage::Confirming => "confirming",
            TransactionStage::Success => "success",
            TransactionStage::Error => "error",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid stage transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: TransactionStage,
    pub to: TransactionStage,
}

pub type StageObserver = Box<dyn Fn(TransactionStage) + Send + Sync>;

/// Owns the current stage. Observable through [`StageMachine::subscribe`]
/// or a callback invoked on every change.
pub struct StageMachine {
    tx: watch::Sender<TransactionStage>,
    observer: Option<StageObserver>,
}

impl Default for StageMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StageMachine {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(TransactionStage::Idle);
        Self { tx, observer: None }
    }

    pub fn with_observer(mut self, observer: StageObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn current(&self) -> TransactionStage {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<TransactionStage> {
        self.tx.subscribe()
    }

    pub fn transition(&self, to: TransactionStage) -> Result<(), InvalidTransition> {
        let mut from = TransactionStage::Idle;
        let moved = self.tx.send_if_modified(|stage| {
            from = *stage;
            if from.can_transition_to(to) {
                *stage = to;
                true
            } else {
                false
            }
        });

        if !moved {
            return Err(InvalidTransition { from, to });
        }

        debug!("Stage {} -> {}", from, to);
        self.notify(to);
        Ok(())
    }

    /// Move to `error` unless already settled
    pub fn fail(&self) {
        if self.transition(TransactionStage::Error).is_err() {
            debug!("Stage already {}, not marking error", self.current());
        }
    }

    /// Back to `idle` from anywhere: cancellation or a fresh call
    pub fn reset(&self) {
        let previous = self.tx.send_replace(TransactionStage::Idle);
        if previous != TransactionStage::Idle {
            debug!("Stage {} -> idle", previous);
            self.notify(TransactionStage::Idle);
        }
    }

    fn notify(&self, stage: TransactionStage) {
        if let Some(observer) = &self.observer {
            observer(stage);
        }
    }
}
