//! # The subscriber seam.
//!
//! Anything that wants to observe the coordinator implements [`Subscribe`] and is passed
//! to [`CoordinatorBuilder::with_subscribers`](crate::CoordinatorBuilder::with_subscribers).

use async_trait::async_trait;

use crate::events::Event;

/// Observer of runtime events such as stream starts, publish failures and shutdown.
///
/// `on_event` runs on a task owned by this subscriber, so a slow implementation only
/// backs up its own queue. It should not panic; a panic is logged and the event is lost.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    async fn on_event(&self, event: &Event);

    /// Name used when an event is dropped or `on_event` panics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Events that may wait for this subscriber before new ones are dropped. At least 1.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
