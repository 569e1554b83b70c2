//! PostgreSQL adapters - database implementations of the persistence ports.

mod order_repository;
mod payout_reader;
mod payout_repository;
mod processed_event_store;

pub use order_repository::PostgresOrderRepository;
pub use payout_reader::PostgresPayoutReader;
pub use payout_repository::PostgresPayoutRepository;
pub use processed_event_store::PostgresProcessedEventStore;
