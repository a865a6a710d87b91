pub mod config;
pub mod filters;
pub mod observability;
pub mod rows;
pub mod store;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod traders;
pub mod types;
