pub mod lock;
pub mod migrate;
pub mod pending;
pub mod staging;

pub use lock::TickLock;
pub use migrate::migrate;
pub use pending::PgPendingStore;
pub use staging::PgStagingStore;
