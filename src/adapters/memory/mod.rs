//! In-memory adapters - deterministic port implementations for tests.

mod in_memory;

pub use in_memory::{
    InMemoryOrderRepository, InMemoryPayoutReader, InMemoryPayoutRepository,
    InMemoryProcessedEventStore,
};
