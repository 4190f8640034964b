//! Connection side: lifecycle, subscriptions and request dispatch.
//!
//! The [`ConnectionManager`] owns the link to the point source. The
//! [`SubscriptionRegistry`] owns the configured points and routes their
//! notifications. The [`RequestDispatcher`] serves reads and writes against
//! whichever session is currently active.

mod dispatch;
mod manager;
mod registry;

pub use dispatch::{ReadOutcome, RequestDispatcher, WriteOutcome};
pub use manager::{ConnectionManager, ConnectionSettings};
pub use registry::SubscriptionRegistry;
