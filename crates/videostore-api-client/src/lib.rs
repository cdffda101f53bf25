//! gRPC client for remote videostore resources.
//!
//! `VideostoreClient` exposes fetch, save and streaming fetch of recorded video
//! ranges. Requests go through a `VideostoreTransport`, implemented for the
//! generated tonic stub; the `ApiRegistry` lets a host build clients by
//! resource name. The CLI uses this client directly.

pub mod client;
pub mod options;
pub mod registry;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{StreamSummary, VideostoreClient};
pub use options::{ClientOptions, RequestEvent, RequestLogger};
pub use registry::{new_client_from_channel, register_videostore_api, ApiRegistry};
pub use transport::{ChunkStream, VideostoreTransport};

// Re-export the shared types so callers only need this crate.
pub use videostore_core::{
    Api, ClientConfig, Command, Resource, ResourceName, Result, SaveOptions, VideoStore,
    VideostoreError,
};
pub use videostore_proto as proto;
