//! Disposition state machine
//!
//! Acknowledgements travel over an unordered transport, so a transition is
//! only applied when it moves the message forward in
//! `pending < accepted < delivered < displayed`, or into one of the
//! absorbing failure states. `displayed`, `failed` and `error` are terminal.

use crate::storage::message::MessageState;

/// Why a transition was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Current state is terminal
    Terminal,
    /// Requested state is not ahead of the current one
    Regressive,
    /// Requested state equals the current one
    Unchanged,
    /// Requested state is only ever an initial state
    Unreachable,
}

/// Outcome of a transition request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The new state was applied
    Accepted {
        /// State before the transition
        from: MessageState,
        /// State after the transition
        to: MessageState,
    },
    /// The request was stale or illegal and has been ignored
    Rejected {
        /// State the message stays in
        current: MessageState,
        /// State that was asked for
        requested: MessageState,
        /// Why it was refused
        reason: RejectReason,
    },
}

impl Transition {
    /// Whether the transition was applied
    pub fn is_accepted(&self) -> bool {
        matches!(self, Transition::Accepted { .. })
    }
}

impl MessageState {
    /// Whether no further transition is accepted from this state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MessageState::Displayed | MessageState::Failed | MessageState::Error
        )
    }

    /// Whether this is one of the absorbing failure states
    pub fn is_failure(&self) -> bool {
        matches!(self, MessageState::Failed | MessageState::Error)
    }

    // Received sits level with delivered: an inbound message can only move on to displayed.
    fn rank(&self) -> u8 {
        match self {
            MessageState::Pending => 0,
            MessageState::Accepted => 1,
            MessageState::Delivered | MessageState::Received => 2,
            MessageState::Displayed => 3,
            MessageState::Failed | MessageState::Error => u8::MAX,
        }
    }
}

/// Decide whether `requested` may replace `current`
pub fn transition(current: MessageState, requested: MessageState) -> Transition {
    let reject = |reason| Transition::Rejected {
        current,
        requested,
        reason,
    };

    if current.is_terminal() {
        return reject(RejectReason::Terminal);
    }
    if requested == current {
        return reject(RejectReason::Unchanged);
    }
    if requested.is_failure() {
        return Transition::Accepted {
            from: current,
            to: requested,
        };
    }
    if matches!(requested, MessageState::Pending | MessageState::Received) {
        return reject(RejectReason::Unreachable);
    }
    if requested.rank() > current.rank() {
        Transition::Accepted {
            from: current,
            to: requested,
        }
    } else {
        reject(RejectReason::Regressive)
    }
}
