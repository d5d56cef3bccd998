//! Crewboard notification infrastructure.
//!
//! - [`Notification`] / [`NotificationKind`]: what the lifecycle sweeps emit.
//! - [`NotificationSink`]: the seam the scheduler writes through.
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`, used for live push.
//! - [`PersistentNotifier`]: the production sink; stores each notification
//!   and publishes it on the bus.
//! - [`RecordingSink`]: an in-memory sink for tests and dry runs.

pub mod bus;
pub mod notification;
pub mod persistent;
pub mod recording;

pub use bus::{EventBus, UserNotification};
pub use notification::{project_url, Notification, NotificationKind, NotificationSink, NotifyError};
pub use persistent::PersistentNotifier;
pub use recording::RecordingSink;
