//! Progress notifications for the presentation layer.
//!
//! Every phase of a save (start, retry, rollback, outcome) produces a
//! [`Notification`] delivered to a [`NotificationSink`], so the user always
//! has an accurate picture of what state their data is likely in.

mod notification;
mod sink;

pub use notification::{Notification, Severity};
pub use sink::{
    ChannelNotificationSink, CollectingNotificationSink, LoggingNotificationSink,
    NoOpNotificationSink, NotificationSink,
};
