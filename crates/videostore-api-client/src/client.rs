//! Client for a remote videostore resource.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tonic::transport::Channel;
use tracing::{debug, warn};
use uuid::Uuid;
use videostore_core::{
    ClientConfig, Command, Resource, ResourceName, Result, SaveOptions, VideoStore,
    VideostoreError, MAX_MESSAGE_BYTES,
};
use videostore_proto::{FetchRequest, FetchStreamRequest, SaveRequest, VideostoreServiceClient};

use crate::options::{ClientOptions, RequestEvent};
use crate::transport::{ChunkStream, VideostoreTransport};

/// Totals for a completed streaming fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub chunks: usize,
    pub bytes: u64,
}

/// Client for one named videostore resource.
///
/// Holds only immutable configuration; clones share the transport and calls
/// made concurrently are independent of each other.
#[derive(Clone, Debug)]
pub struct VideostoreClient<T = VideostoreServiceClient<Channel>> {
    name: ResourceName,
    request_name: String,
    transport: T,
    options: ClientOptions,
}

/// Generated stub over `channel` that accepts responses up to `max_message_bytes`.
pub(crate) fn service_stub(
    channel: Channel,
    max_message_bytes: usize,
) -> VideostoreServiceClient<Channel> {
    VideostoreServiceClient::new(channel).max_decoding_message_size(max_message_bytes)
}

impl VideostoreClient {
    /// Client over an established channel, accepting clips up to `MAX_MESSAGE_BYTES`.
    pub fn new(channel: Channel, name: ResourceName, options: ClientOptions) -> Self {
        Self::with_transport(service_stub(channel, MAX_MESSAGE_BYTES), name, options)
    }

    /// Connect using the endpoint, timeouts and message limit from `config`.
    pub async fn connect(config: &ClientConfig, options: ClientOptions) -> Result<Self> {
        config.validate()?;
        let channel = config.endpoint()?.connect().await?;
        let stub = service_stub(channel, config.max_message_bytes);
        debug!(
            address = %config.address,
            resource = %config.resource_name(),
            "Connected to videostore"
        );
        Ok(Self::with_transport(stub, config.resource_name(), options))
    }
}

impl<T: VideostoreTransport> VideostoreClient<T> {
    pub fn with_transport(transport: T, name: ResourceName, options: ClientOptions) -> Self {
        let request_name = name.short_name();
        Self::from_parts(transport, name, request_name, options)
    }

    /// `name` is what the host addresses; `request_name` is what goes on the wire.
    pub(crate) fn from_parts(
        transport: T,
        name: ResourceName,
        request_name: String,
        options: ClientOptions,
    ) -> Self {
        Self {
            name,
            request_name,
            transport,
            options,
        }
    }

    pub fn name(&self) -> &ResourceName {
        &self.name
    }

    /// Resource name sent in every request.
    pub fn request_name(&self) -> &str {
        &self.request_name
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub async fn fetch(&self, from: &str, to: &str, container: &str) -> Result<Bytes> {
        let request = FetchRequest {
            name: self.request_name.clone(),
            from: from.to_string(),
            to: to.to_string(),
            container: container.to_string(),
            request_id: new_request_id(),
        };
        debug!(
            resource = %self.request_name,
            request_id = %request.request_id,
            from,
            to,
            container,
            "Sending fetch request"
        );
        self.options.log(RequestEvent::Fetch(&request));

        let response = self.transport.fetch(request).await?;
        Ok(response.video_data)
    }

    pub async fn save(&self, from: &str, to: &str, container: &str) -> Result<String> {
        self.save_with(from, to, container, SaveOptions::default())
            .await
    }

    pub async fn save_with(
        &self,
        from: &str,
        to: &str,
        container: &str,
        options: SaveOptions,
    ) -> Result<String> {
        let request = SaveRequest {
            name: self.request_name.clone(),
            from: from.to_string(),
            to: to.to_string(),
            container: container.to_string(),
            metadata: options.metadata,
            r#async: options.r#async,
            request_id: new_request_id(),
        };
        debug!(
            resource = %self.request_name,
            request_id = %request.request_id,
            from,
            to,
            container,
            async_save = request.r#async,
            "Sending save request"
        );
        self.options.log(RequestEvent::Save(&request));

        let response = self.transport.save(request).await?;
        Ok(response.filename)
    }

    /// Stream a range, calling `on_chunk` once per chunk in arrival order.
    ///
    /// A failure at any point is handed to the request logger and returned;
    /// chunks already delivered are not retracted.
    pub async fn fetch_stream<F>(
        &self,
        from: &str,
        to: &str,
        container: &str,
        mut on_chunk: F,
    ) -> Result<()>
    where
        F: FnMut(Bytes) + Send,
    {
        let (request_id, mut stream) = self.open_stream(from, to, container).await?;

        let mut chunks = 0usize;
        while let Some(item) = stream.next().await {
            match item {
                Ok(response) => {
                    chunks += 1;
                    on_chunk(response.video_data);
                }
                Err(status) => return Err(self.stream_failed(&request_id, chunks, status)),
            }
        }

        debug!(resource = %self.request_name, request_id = %request_id, chunks, "Stream finished");
        Ok(())
    }

    /// Stream a range into `writer`, flushing once the stream ends.
    pub async fn fetch_stream_to_writer<W>(
        &self,
        from: &str,
        to: &str,
        container: &str,
        writer: &mut W,
    ) -> Result<StreamSummary>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let (request_id, mut stream) = self.open_stream(from, to, container).await?;

        let mut summary = StreamSummary::default();
        while let Some(item) = stream.next().await {
            match item {
                Ok(response) => {
                    writer.write_all(&response.video_data).await?;
                    summary.chunks += 1;
                    summary.bytes += response.video_data.len() as u64;
                }
                Err(status) => {
                    return Err(self.stream_failed(&request_id, summary.chunks, status))
                }
            }
        }
        writer.flush().await?;

        debug!(
            resource = %self.request_name,
            request_id = %request_id,
            chunks = summary.chunks,
            bytes = summary.bytes,
            "Stream written"
        );
        Ok(summary)
    }

    /// Reserved for vendor-specific commands. Currently answers every command
    /// with an empty result.
    pub async fn do_command(&self, command: &Command) -> Result<Command> {
        debug!(
            resource = %self.request_name,
            keys = command.len(),
            "do_command is not forwarded to the server"
        );
        Ok(Command::new())
    }

    async fn open_stream(
        &self,
        from: &str,
        to: &str,
        container: &str,
    ) -> Result<(String, ChunkStream)> {
        let request = FetchStreamRequest {
            name: self.request_name.clone(),
            from: from.to_string(),
            to: to.to_string(),
            container: container.to_string(),
            request_id: new_request_id(),
        };
        debug!(
            resource = %self.request_name,
            request_id = %request.request_id,
            from,
            to,
            container,
            "Sending fetch stream request"
        );
        self.options.log(RequestEvent::FetchStream(&request));

        let request_id = request.request_id.clone();
        match self.transport.fetch_stream(request).await {
            Ok(stream) => Ok((request_id, stream)),
            Err(status) => Err(self.stream_failed(&request_id, 0, status)),
        }
    }

    fn stream_failed(
        &self,
        request_id: &str,
        chunks: usize,
        status: tonic::Status,
    ) -> VideostoreError {
        warn!(
            resource = %self.request_name,
            request_id,
            chunks,
            code = ?status.code(),
            error = status.message(),
            "Fetch stream failed"
        );
        self.options.log(RequestEvent::StreamError(&status));
        VideostoreError::Rpc(status)
    }
}

fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}

#[async_trait]
impl<T: VideostoreTransport> Resource for VideostoreClient<T> {
    fn name(&self) -> &ResourceName {
        &self.name
    }
}

#[async_trait]
impl<T: VideostoreTransport> VideoStore for VideostoreClient<T> {
    async fn fetch(&self, from: &str, to: &str, container: &str) -> Result<Bytes> {
        VideostoreClient::fetch(self, from, to, container).await
    }

    async fn save_with(
        &self,
        from: &str,
        to: &str,
        container: &str,
        options: SaveOptions,
    ) -> Result<String> {
        VideostoreClient::save_with(self, from, to, container, options).await
    }

    async fn fetch_stream(
        &self,
        from: &str,
        to: &str,
        container: &str,
        on_chunk: &mut (dyn FnMut(Bytes) + Send),
    ) -> Result<()> {
        VideostoreClient::fetch_stream(self, from, to, container, |chunk| on_chunk(chunk)).await
    }

    async fn do_command(&self, command: &Command) -> Result<Command> {
        VideostoreClient::do_command(self, command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockTransport, StreamScript};
    use std::io;
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};
    use tonic::Code;

    /// Sink that accepts `capacity` writes and fails every one after that.
    struct FailingWriter {
        capacity: usize,
        written: Vec<u8>,
    }

    impl AsyncWrite for FailingWriter {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            if self.capacity == 0 {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed")));
            }
            self.capacity -= 1;
            self.written.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn client(transport: MockTransport) -> VideostoreClient<MockTransport> {
        VideostoreClient::with_transport(
            transport,
            ResourceName::videostore("vs1"),
            ClientOptions::default(),
        )
    }

    #[tokio::test]
    async fn fetch_returns_server_bytes_unmodified() {
        let payload = Bytes::from_static(&[0x00, 0x00, 0x00, 0x18, b'f', b't', b'y', b'p', 0xff]);
        let transport = MockTransport::new().with_fetch_response(payload.clone());
        let client = client(transport.clone());

        let video = client
            .fetch("2024-09-06_15-00-33", "2024-09-06_15-01-33", "mp4")
            .await
            .unwrap();
        assert_eq!(video, payload);

        let sent = transport.fetch_requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].name, "vs1");
        assert_eq!(sent[0].from, "2024-09-06_15-00-33");
        assert_eq!(sent[0].to, "2024-09-06_15-01-33");
        assert_eq!(sent[0].container, "mp4");
        assert!(Uuid::parse_str(&sent[0].request_id).is_ok());
    }

    #[tokio::test]
    async fn fetch_propagates_status() {
        let transport = MockTransport::new()
            .with_fetch_error(tonic::Status::invalid_argument("from is after to"));
        let err = client(transport)
            .fetch("b", "a", "mp4")
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(Code::InvalidArgument));
        assert_eq!(err.status().unwrap().message(), "from is after to");
    }

    #[tokio::test]
    async fn save_returns_server_filename() {
        let transport = MockTransport::new().with_save_response("vs1_2024-09-06_15-00-33.mp4");
        let client = client(transport.clone());

        let filename = client.save("a", "b", "mp4").await.unwrap();
        assert_eq!(filename, "vs1_2024-09-06_15-00-33.mp4");

        let sent = transport.save_requests();
        assert_eq!(sent[0].metadata, "");
        assert!(!sent[0].r#async);
    }

    #[tokio::test]
    async fn save_with_forwards_metadata_and_async() {
        let transport = MockTransport::new().with_save_response("clip.mp4");
        let client = client(transport.clone());

        client
            .save_with(
                "a",
                "b",
                "mp4",
                SaveOptions::default()
                    .with_metadata("door-open")
                    .asynchronous(true),
            )
            .await
            .unwrap();

        let sent = transport.save_requests();
        assert_eq!(sent[0].metadata, "door-open");
        assert!(sent[0].r#async);
    }

    #[tokio::test]
    async fn stream_delivers_chunks_in_order() {
        let chunks = vec![
            Bytes::from_static(b"c1"),
            Bytes::from_static(b"c2"),
            Bytes::from_static(b"c3"),
        ];
        let transport = MockTransport::new().with_stream(StreamScript::chunks(chunks.clone()));
        let client = client(transport.clone());

        let mut received = Vec::new();
        client
            .fetch_stream("a", "b", "webm", |chunk| received.push(chunk))
            .await
            .unwrap();
        assert_eq!(received, chunks);

        let sent = transport.stream_requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].name, "vs1");
        assert_eq!(sent[0].container, "webm");
    }

    #[tokio::test]
    async fn stream_error_after_first_chunk() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let recorded = events.clone();
        let options = ClientOptions::default().with_request_logger(move |event| {
            let label = match event {
                RequestEvent::FetchStream(_) => "request".to_string(),
                RequestEvent::StreamError(status) => format!("error:{}", status.message()),
                _ => "other".to_string(),
            };
            recorded.lock().unwrap().push(label);
        });
        let transport = MockTransport::new().with_stream(StreamScript::fail_after(
            vec![Bytes::from_static(b"c1")],
            tonic::Status::unavailable("segment missing"),
        ));
        let client =
            VideostoreClient::with_transport(transport, ResourceName::videostore("vs1"), options);

        let mut received = Vec::new();
        let err = client
            .fetch_stream("a", "b", "mp4", |chunk| received.push(chunk))
            .await
            .unwrap_err();

        assert_eq!(received, vec![Bytes::from_static(b"c1")]);
        assert_eq!(err.code(), Some(Code::Unavailable));
        assert_eq!(err.status().unwrap().message(), "segment missing");
        assert_eq!(
            *events.lock().unwrap(),
            vec!["request".to_string(), "error:segment missing".to_string()]
        );
    }

    #[tokio::test]
    async fn stream_open_failure_is_logged_and_returned() {
        let events = Arc::new(Mutex::new(0usize));
        let counter = events.clone();
        let options = ClientOptions::default().with_request_logger(move |event| {
            if let RequestEvent::StreamError(_) = event {
                *counter.lock().unwrap() += 1;
            }
        });
        let transport = MockTransport::new().with_stream(StreamScript::refuse(
            tonic::Status::not_found("unknown resource"),
        ));
        let client =
            VideostoreClient::with_transport(transport, ResourceName::videostore("vs1"), options);

        let mut calls = 0;
        let err = client
            .fetch_stream("a", "b", "mp4", |_| calls += 1)
            .await
            .unwrap_err();
        assert_eq!(calls, 0);
        assert_eq!(err.code(), Some(Code::NotFound));
        assert_eq!(*events.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn logger_sees_exact_request_before_call() {
        let logged = Arc::new(Mutex::new(Vec::new()));
        let sink = logged.clone();
        let options = ClientOptions::default().with_request_logger(move |event| {
            if let RequestEvent::Fetch(request) = event {
                sink.lock().unwrap().push(request.clone());
            }
        });
        // Sampled by the mock when the call reaches the transport.
        let transport = MockTransport::new().with_fetch_response(Bytes::from_static(b"v"));
        let watched = logged.clone();
        let transport = transport.on_fetch(move || watched.lock().unwrap().len());
        let client = VideostoreClient::with_transport(
            transport.clone(),
            ResourceName::videostore("vs1"),
            options,
        );

        client.fetch("a", "b", "mp4").await.unwrap();

        let logged = logged.lock().unwrap();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0], transport.fetch_requests()[0]);
        assert_eq!(transport.logged_before_fetch(), vec![1]);
    }

    #[tokio::test]
    async fn logger_not_required() {
        let transport = MockTransport::new().with_save_response("f.mp4");
        let client = client(transport);
        assert!(client.options().request_logger.is_none());
        assert_eq!(client.save("a", "b", "mp4").await.unwrap(), "f.mp4");
    }

    #[tokio::test]
    async fn request_ids_are_fresh_per_call() {
        let transport = MockTransport::new().with_fetch_response(Bytes::new());
        let client = client(transport.clone());
        client.fetch("a", "b", "mp4").await.unwrap();
        client.fetch("a", "b", "mp4").await.unwrap();

        let sent = transport.fetch_requests();
        assert_ne!(sent[0].request_id, sent[1].request_id);
    }

    #[tokio::test]
    async fn failed_call_does_not_affect_next_call() {
        let transport = MockTransport::new()
            .with_fetch_error(tonic::Status::internal("boom"))
            .with_fetch_response(Bytes::from_static(b"ok"));
        let client = client(transport);

        assert!(client.fetch("a", "b", "mp4").await.is_err());
        assert_eq!(
            client.fetch("a", "b", "mp4").await.unwrap(),
            Bytes::from_static(b"ok")
        );
    }

    #[tokio::test]
    async fn do_command_returns_empty_result() {
        let client = client(MockTransport::new());
        let mut command = Command::new();
        command.insert("command".to_string(), serde_json::json!("get-storage-state"));

        assert!(client.do_command(&command).await.unwrap().is_empty());
        assert!(client.do_command(&Command::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stream_to_writer_concatenates_chunks() {
        let transport = MockTransport::new().with_stream(StreamScript::chunks(vec![
            Bytes::from_static(b"abc"),
            Bytes::from_static(b"de"),
        ]));
        let client = client(transport);

        let mut out = Vec::new();
        let summary = client
            .fetch_stream_to_writer("a", "b", "mp4", &mut out)
            .await
            .unwrap();
        assert_eq!(out, b"abcde");
        assert_eq!(summary, StreamSummary { chunks: 2, bytes: 5 });
    }

    #[tokio::test]
    async fn stream_to_writer_stops_at_sink_error() {
        let transport = MockTransport::new().with_stream(StreamScript::chunks(vec![
            Bytes::from_static(b"c1"),
            Bytes::from_static(b"c2"),
            Bytes::from_static(b"c3"),
        ]));
        let client = client(transport.clone());

        let mut sink = FailingWriter {
            capacity: 1,
            written: Vec::new(),
        };
        let err = client
            .fetch_stream_to_writer("a", "b", "mp4", &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, VideostoreError::Io(ref e)
            if e.kind() == io::ErrorKind::BrokenPipe));
        assert!(err.status().is_none());
        assert_eq!(sink.written, b"c1");
        assert_eq!(transport.stream_items_pulled(), 2);
    }

    #[tokio::test]
    async fn stream_to_writer_returns_mid_stream_status() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let recorded = errors.clone();
        let options = ClientOptions::default().with_request_logger(move |event| {
            if let RequestEvent::StreamError(status) = event {
                recorded.lock().unwrap().push(status.code());
            }
        });
        let transport = MockTransport::new().with_stream(StreamScript::fail_after(
            vec![Bytes::from_static(b"abc")],
            tonic::Status::data_loss("segment truncated"),
        ));
        let client = VideostoreClient::with_transport(
            transport.clone(),
            ResourceName::videostore("vs1"),
            options,
        );

        let mut out = Vec::new();
        let err = client
            .fetch_stream_to_writer("a", "b", "mp4", &mut out)
            .await
            .unwrap_err();

        assert_eq!(out, b"abc");
        assert_eq!(err.code(), Some(Code::DataLoss));
        assert_eq!(err.status().unwrap().message(), "segment truncated");
        assert_eq!(*errors.lock().unwrap(), vec![Code::DataLoss]);
        assert_eq!(transport.stream_items_pulled(), 2);
    }

    #[tokio::test]
    async fn usable_as_dyn_video_store() {
        let transport = MockTransport::new()
            .with_save_response("clip.mp4")
            .with_stream(StreamScript::chunks(vec![Bytes::from_static(b"x")]));
        let store: Arc<dyn VideoStore> = Arc::new(client(transport));

        assert_eq!(store.name(), &ResourceName::videostore("vs1"));
        assert_eq!(store.save("a", "b", "mp4").await.unwrap(), "clip.mp4");

        let mut total = 0;
        store
            .fetch_stream("a", "b", "mp4", &mut |chunk: Bytes| total += chunk.len())
            .await
            .unwrap();
        assert_eq!(total, 1);
        store.close().await.unwrap();
    }
}
