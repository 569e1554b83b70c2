//! Settlement command handlers.

mod process_webhook;

pub use process_webhook::{
    ProcessWebhookCommand, ProcessWebhookHandler, WebhookOutcome, CANCEL_REASON_ORDER_REFUNDED,
};
