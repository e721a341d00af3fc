// Application layer - use cases and orchestration.
// Every client (HTTP API, CLI, seeding) goes through here or through the
// storage contracts directly.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
