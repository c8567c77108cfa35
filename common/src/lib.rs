//! Primitives shared by every crate in the eye-tracking backend.
//!
//! ## Architecture
//!
//! - **common** (this crate): error plumbing with no runtime behavior
//! - **tracker-core**: configuration, OSC workers, orchestration, HTTP routes
//! - **etvr**: binary wiring everything together

pub mod error_location;

pub use error_location::ErrorLocation;

#[cfg(test)]
mod tests;
