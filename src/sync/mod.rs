//! Client-side draft synchronization.
//!
//! Split the way the behavior is easiest to test: [`state`] holds the status
//! machine and the pure reducer, [`manager`] owns the effectful control loop
//! (debounced saves, polling, merge adoption) around it.

pub mod manager;
pub mod state;

pub use manager::{SyncHandle, SyncManager};
pub use state::{reduce, Action, Flight, SyncState, SyncStatus};
