pub mod migrate;
pub mod pg;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

pub use pg::PgMatchStore;
pub use store::MatchStore;

#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryMatchStore;
