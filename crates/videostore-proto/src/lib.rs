//! Protocol buffer types and the gRPC client and server stubs for the video-store
//! service.
//!
//! The Rust sources are generated from `proto/videostore.proto` and checked in,
//! so building this crate does not require `protoc`.

pub mod v1 {
    include!("viammodules.service.videostore.v1.rs");
}

pub use v1::videostore_service_client::VideostoreServiceClient;
pub use v1::videostore_service_server::{VideostoreService, VideostoreServiceServer};
pub use v1::{
    FetchRequest, FetchResponse, FetchStreamRequest, FetchStreamResponse, SaveRequest,
    SaveResponse,
};
