/*!
Shared global state for component trees.

A [`GlobalState`] owns one value and an ordered list of listeners. Any number of independent consumers
observe it; each holds a local mirror of the value and a mutator. Committing a value through any mutator
updates the shared cell and then synchronously notifies every attached consumer, in the order they
attached, before the call returns.

[`GlobalReducer`] puts a `(state, action) -> state` reducer in front of the same machinery, so consumers
dispatch actions instead of assigning values.

# Design notes
- The value is an `Option<S>`: `None` is both "never set" and "cleared"
- Literal replacement (`set`, `replace`, `clear`) and updater functions (`update`) are separate entry points,
  so a function is never mistaken for a value
- User code (updaters, reducers, listeners) never runs under a lock, so listeners may mutate the state they
  are listening to
- Listener registration is RAII: dropping a [`ListenerGuard`] or a [`Consumer`] deregisters it

# Basic usage

```rust
use gstate::*;

let theme = GlobalState::new(Some("light".to_string()));

let header = theme.observe();
let sidebar = theme.observe();

let (current, set_theme) = header.state();
assert_eq!(current.as_deref(), Some("light"));

set_theme.set("dark".to_string());
assert_eq!(sidebar.get().as_deref(), Some("dark"));

// a detached consumer stops mirroring, but its mutator still writes the shared value
drop(sidebar);
set_theme.update(|prev| prev.map(|theme| format!("{theme}-contrast")));
assert_eq!(header.get().as_deref(), Some("dark-contrast"));
assert_eq!(theme.observer_count(), 1);
```

# Lifecycle

```rust
use gstate::*;

let count = GlobalState::new(Some(0));

// render first, attach later
let mut consumer = count.consumer();
assert_eq!(consumer.phase(), Phase::Pending);
consumer.attach().unwrap();
assert_eq!(consumer.attach(), Err(LifecycleError::AlreadyAttached));

consumer.detach();
consumer.detach(); // idempotent
assert_eq!(consumer.attach(), Err(LifecycleError::TornDown));
```
*/

mod broadcast;
mod consumer;
mod error;
mod reducer;
mod state;
mod value;
#[cfg(feature = "tokio")]
mod wait;

pub use broadcast::*;
pub use consumer::*;
pub use error::*;
pub use reducer::*;
pub use state::*;
pub use value::*;
#[cfg(feature = "tokio")]
pub use wait::*;
