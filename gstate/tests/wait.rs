#![cfg(feature = "tokio")]

mod common;
use common::{Switch, SwitchAction, switch_reducer};
use gstate::*;
use tokio_test::{assert_pending, assert_ready, assert_ready_eq, task};

#[test]
fn test_wait_for_resolves_immediately_when_satisfied() {
    let state = GlobalState::new(Some(5));
    let mut wait = task::spawn(state.wait_for(|value| value.copied()));
    assert_ready_eq!(wait.poll(), 5);
}

#[test]
fn test_wait_for_resolves_on_matching_commit() {
    let state = GlobalState::new(Some(0));
    let setter = state.setter();
    let mut wait = task::spawn(state.wait_for(|value| value.filter(|n| **n >= 3).copied()));

    assert_pending!(wait.poll());
    setter.set(1);
    assert_pending!(wait.poll());
    setter.set(3);
    assert!(wait.is_woken());
    assert_ready_eq!(wait.poll(), 3);
}

#[test]
fn test_wait_releases_its_listener() {
    let state = GlobalState::new(Some(0));
    {
        let mut wait = task::spawn(state.wait_value(Some(1)));
        assert_pending!(wait.poll());
        assert_eq!(state.observer_count(), 1);
        state.setter().set(1);
        assert_ready!(wait.poll());
    }
    assert_eq!(state.observer_count(), 0);
}

#[test]
fn test_wait_for_absent() {
    let state = GlobalState::new(Some("x".to_string()));
    let mut wait = task::spawn(state.wait_for(|value| value.is_none()));
    assert_pending!(wait.poll());
    state.setter().clear();
    assert_ready!(wait.poll());
}

#[test]
fn test_predicate_may_commit() {
    let state = GlobalState::new(Some(0));
    let setter = state.setter();
    let mut wait = task::spawn(state.wait_for(|value| {
        if value == Some(&0) {
            setter.set(1);
        }
        value.filter(|n| **n == 1).copied()
    }));

    // the initial check commits 1, which reaches the wait's own listener
    assert_ready_eq!(wait.poll(), 1);
    assert_eq!(state.peek(), Some(1));
}

#[tokio::test]
async fn test_reducer_wait_across_tasks() {
    let store = GlobalReducer::new(switch_reducer, Some(Switch { switch: 0 }));
    let dispatch = store.dispatcher();

    let handle = tokio::spawn(async move {
        for _ in 0..3 {
            tokio::time::sleep(tokio::time::Duration::from_millis(1)).await;
            dispatch.dispatch(SwitchAction::Count);
        }
    });

    store.wait_value(Some(Switch { switch: 3 })).await;
    handle.await.unwrap();
    assert_eq!(store.peek(), Some(Switch { switch: 3 }));
}
