//! mg-keeper: correlating engine events with the requests waiting for them
//!
//! A module that needs an engine round trip builds a [`Waiter`] whose
//! predicate closes over its own identifying fields, registers it, fires its
//! command and then waits on the [`Pending`] half. The dispatcher offers every
//! event to [`Keeper::dispatch`]; the first matching waiter is resolved.

pub mod keeper;
pub mod metrics;
pub mod waiter;

pub use keeper::{Keeper, WaiterGuard};
pub use metrics::KeeperMetrics;
pub use waiter::{MatchFn, Pending, Waiter};
