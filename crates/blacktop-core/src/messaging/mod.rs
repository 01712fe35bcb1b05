//! In-process topic-based publish/subscribe.
//!
//! Lifecycle transitions in the plugin manager, module enable/disable
//! notifications from the module store, and plugin-to-plugin traffic all ride
//! this bus. Per-topic history is bounded; request/response correlation uses
//! ephemeral reply topics.

pub mod error;
pub mod message;
pub mod service;

pub use error::{MessagingError, MessagingResult};
pub use message::Message;
pub use service::{
    sync_handler, HandlerFuture, MessageHandler, MessagingService, MessagingStats, SubscriptionId,
    SubscriptionInfo,
};

#[cfg(test)]
mod tests;
