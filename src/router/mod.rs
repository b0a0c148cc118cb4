//! Topic routing.
//!
//! [`Subscriptions`] owns the live topic → route table, [`Dispatcher`] turns
//! received bus messages into calls on the reconcilers and the telemetry
//! router.

mod dispatcher;
mod registry;

pub use dispatcher::Dispatcher;
pub use registry::{Route, Subscriptions};
