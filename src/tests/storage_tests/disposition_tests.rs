// Disposition Tests - Testing the delivery/read state machine

use crate::storage::{transition, MessageState, RejectReason, Transition};
use crate::storage::MessageState::*;

fn apply(mut state: MessageState, sequence: &[MessageState]) -> MessageState {
    for next in sequence {
        if let Transition::Accepted { to, .. } = transition(state, *next) {
            state = to;
        }
    }
    state
}

#[test]
fn test_forward_progress_accepted() {
    assert!(transition(Pending, Accepted).is_accepted());
    assert!(transition(Accepted, Delivered).is_accepted());
    assert!(transition(Delivered, Displayed).is_accepted());
}

#[test]
fn test_skipping_forward_accepted() {
    assert_eq!(
        transition(Pending, Delivered),
        Transition::Accepted { from: Pending, to: Delivered }
    );
    assert!(transition(Accepted, Displayed).is_accepted());
}

#[test]
fn test_regression_rejected() {
    assert_eq!(
        transition(Delivered, Accepted),
        Transition::Rejected {
            current: Delivered,
            requested: Accepted,
            reason: RejectReason::Regressive,
        }
    );
}

#[test]
fn test_same_state_rejected() {
    assert!(matches!(
        transition(Accepted, Accepted),
        Transition::Rejected { reason: RejectReason::Unchanged, .. }
    ));
}

#[test]
fn test_displayed_is_absorbing() {
    for requested in [Pending, Accepted, Delivered, Failed, Error] {
        assert!(matches!(
            transition(Displayed, requested),
            Transition::Rejected { reason: RejectReason::Terminal, .. }
        ));
    }
}

#[test]
fn test_failure_states_are_absorbing() {
    for terminal in [Failed, Error] {
        for requested in [Pending, Accepted, Delivered, Displayed, Failed, Error] {
            assert!(!transition(terminal, requested).is_accepted());
        }
    }
}

#[test]
fn test_failure_reachable_from_non_terminal() {
    for current in [Pending, Accepted, Delivered, Received] {
        assert!(transition(current, Failed).is_accepted());
        assert!(transition(current, Error).is_accepted());
    }
}

#[test]
fn test_initial_states_unreachable() {
    assert!(matches!(
        transition(Accepted, Received),
        Transition::Rejected { reason: RejectReason::Unreachable, .. }
    ));
    assert!(matches!(
        transition(Pending, Received),
        Transition::Rejected { reason: RejectReason::Unreachable, .. }
    ));
}

#[test]
fn test_received_only_moves_to_displayed() {
    assert!(transition(Received, Displayed).is_accepted());
    assert!(!transition(Received, Delivered).is_accepted());
    assert!(!transition(Received, Accepted).is_accepted());
}

#[test]
fn test_out_of_order_acknowledgements() {
    // delivered arrives after displayed and must not win
    assert_eq!(apply(Pending, &[Accepted, Displayed, Delivered]), Displayed);
    // accepted arrives late
    assert_eq!(apply(Pending, &[Delivered, Accepted]), Delivered);
    // stale success after a failure
    assert_eq!(apply(Pending, &[Failed, Accepted, Delivered]), Failed);
}

#[test]
fn test_state_never_decreases() {
    let rank = |s: MessageState| match s {
        Pending => 0,
        Accepted => 1,
        Delivered => 2,
        Displayed => 3,
        _ => 4,
    };
    let sequences: [&[MessageState]; 4] = [
        &[Delivered, Accepted, Pending, Displayed, Delivered],
        &[Accepted, Accepted, Pending, Delivered],
        &[Displayed, Error, Failed],
        &[Error, Displayed],
    ];

    for sequence in sequences {
        let mut state = Pending;
        for next in sequence {
            let before = state;
            if let Transition::Accepted { to, .. } = transition(state, *next) {
                state = to;
            }
            assert!(rank(state) >= rank(before), "{:?} -> {:?}", before, state);
        }
    }
}
