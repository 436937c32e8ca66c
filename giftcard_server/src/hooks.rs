//! Event hooks registered by the server.
//!
//! The hooks only log. Orders that fail after some codes were bought are logged as errors, since they need someone to
//! look at them.
use futures::FutureExt;
use giftcard_engine::events::{EventHandlers, EventHooks, EventProducers};
use log::*;

pub const EVENT_BUFFER_SIZE: usize = 128;

pub fn logging_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_paid(|ev| {
            info!("📬️ Order {} has been paid ({} {})", ev.order.order_id, ev.order.crypto_amount, ev.order.payment_method);
            async {}.boxed()
        })
        .on_order_completed(|ev| {
            if ev.delivered {
                info!("📬️ Order {} is complete and its codes were delivered", ev.order.order_id);
            } else {
                warn!(
                    "📬️ Order {} is complete, but its codes could not be delivered. Re-send them from the admin API.",
                    ev.order.order_id
                );
            }
            async {}.boxed()
        })
        .on_order_failed(|ev| {
            if ev.is_partially_fulfilled() {
                error!(
                    "📬️ Order {} failed after {} of {} gift cards were bought. {}. This order needs manual attention.",
                    ev.order.order_id,
                    ev.order.fulfilled_count(),
                    ev.order.items.len(),
                    ev.reason
                );
            } else {
                info!("📬️ Order {} failed. {}", ev.order.order_id, ev.reason);
            }
            async {}.boxed()
        });
    hooks
}

/// Starts the event handlers and returns the producers that feed them
pub async fn start_event_handlers(hooks: EventHooks) -> EventProducers {
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    producers
}
