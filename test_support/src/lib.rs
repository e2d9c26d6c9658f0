//! Test utilities shared by the kiln integration tests.
//!
//! Provides environment guards, project description fixtures, ready-made
//! variants and a check for the system `ninja` binary.

pub mod env_lock;
pub mod env_var_guard;
pub mod manifest;
pub mod ninja;
pub mod variant;

pub use manifest::{Project, manifest_yaml};
pub use variant::variant;
