pub mod bridge;
pub mod policy;
pub mod publisher;
pub mod source;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod tick;
pub mod traits;
