//! Testing utilities for workflow-engine-core: fixture builders and
//! environment toggles shared by the crate's own tests and by the
//! other workspace crates that depend on these types in their test
//! suites.
//!
//! Gated behind the `test-util` feature rather than `#[cfg(test)]` so
//! that downstream crates can pull fixtures into their own dev-only
//! builds via `workflow-engine-core = { features = ["test-util"] }`
//! in `[dev-dependencies]`.

#[cfg(feature = "test-util")]
pub mod fixtures;

#[cfg(feature = "test-util")]
pub mod test_config;
