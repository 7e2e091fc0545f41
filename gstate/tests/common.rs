use std::sync::{Arc, Mutex};

use tracing::Level;

#[ctor::ctor]
fn init_tracing() { let _ = tracing_subscriber::fmt().with_max_level(Level::DEBUG).with_test_writer().try_init(); }

/// Returns a recorder and a function that drains everything recorded so far
#[allow(unused)]
pub fn watcher<T: Send + 'static>() -> (impl Fn(T) + Send + Sync + Clone + 'static, impl Fn() -> Vec<T>) {
    let changes = Arc::new(Mutex::new(Vec::new()));
    let record = {
        let changes = changes.clone();
        move |value: T| changes.lock().unwrap().push(value)
    };
    let check = move || changes.lock().unwrap().drain(..).collect::<Vec<T>>();
    (record, check)
}

#[allow(unused)]
#[derive(Debug, Clone, PartialEq)]
pub struct Switch {
    pub switch: u32,
}

#[allow(unused)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SwitchAction {
    Count,
    Reset,
    Noop,
}

#[allow(unused)]
pub fn switch_reducer(state: Option<&Switch>, action: SwitchAction) -> Option<Switch> {
    let prev = state.cloned().unwrap_or(Switch { switch: 0 });
    match action {
        SwitchAction::Count => Some(Switch { switch: prev.switch + 1 }),
        SwitchAction::Reset => Some(Switch { switch: 0 }),
        SwitchAction::Noop => state.cloned(),
    }
}
