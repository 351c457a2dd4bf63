pub mod dedup;
pub mod engine;
pub mod push;
pub mod sink;

pub use engine::{ReminderEngine, ScanReport};
pub use sink::{DeliveryError, LogSink, Notification, NotificationSink};
