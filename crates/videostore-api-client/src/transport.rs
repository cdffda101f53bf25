//! Transport seam between the client and the generated gRPC stub.
//!
//! `VideostoreClient` only talks to a `VideostoreTransport`, so hosts can route
//! calls through their own channel setup and tests can substitute a fake server.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tonic::transport::Channel;
use tonic::Status;
use videostore_proto::{
    FetchRequest, FetchResponse, FetchStreamRequest, FetchStreamResponse, SaveRequest,
    SaveResponse, VideostoreServiceClient,
};

/// Ordered chunks of a server-streaming fetch.
pub type ChunkStream = BoxStream<'static, Result<FetchStreamResponse, Status>>;

#[async_trait]
pub trait VideostoreTransport: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, Status>;

    async fn save(&self, request: SaveRequest) -> Result<SaveResponse, Status>;

    async fn fetch_stream(&self, request: FetchStreamRequest) -> Result<ChunkStream, Status>;
}

// The stub needs `&mut self` per call; clones share the underlying channel.
#[async_trait]
impl VideostoreTransport for VideostoreServiceClient<Channel> {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, Status> {
        let mut client = self.clone();
        let response = VideostoreServiceClient::fetch(&mut client, request).await?;
        Ok(response.into_inner())
    }

    async fn save(&self, request: SaveRequest) -> Result<SaveResponse, Status> {
        let mut client = self.clone();
        let response = VideostoreServiceClient::save(&mut client, request).await?;
        Ok(response.into_inner())
    }

    async fn fetch_stream(&self, request: FetchStreamRequest) -> Result<ChunkStream, Status> {
        let mut client = self.clone();
        let response = VideostoreServiceClient::fetch_stream(&mut client, request).await?;
        Ok(response.into_inner().boxed())
    }
}
