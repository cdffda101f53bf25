//! Videostore Core Library
//!
//! Resource identity, the `VideoStore` capability trait, error types and
//! client configuration shared by the client, the CLI and any host embedding
//! a videostore client.

pub mod config;
pub mod error;
pub mod resource;
pub mod store;

// Re-export commonly used types
pub use config::{ClientConfig, MAX_MESSAGE_BYTES};
pub use error::{Result, VideostoreError};
pub use resource::{Api, ApiKind, Resource, ResourceName};
pub use store::{Command, SaveOptions, VideoStore};
