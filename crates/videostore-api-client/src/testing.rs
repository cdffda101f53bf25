//! In-memory transport for exercising the client without a server.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tonic::Status;
use videostore_proto::{
    FetchRequest, FetchResponse, FetchStreamRequest, FetchStreamResponse, SaveRequest,
    SaveResponse,
};

use crate::transport::{ChunkStream, VideostoreTransport};

/// Scripted outcome of one streaming call.
#[derive(Debug)]
pub enum StreamScript {
    Chunks(Vec<Bytes>),
    FailAfter(Vec<Bytes>, Status),
    Refuse(Status),
}

impl StreamScript {
    pub fn chunks(chunks: Vec<Bytes>) -> Self {
        StreamScript::Chunks(chunks)
    }

    pub fn fail_after(chunks: Vec<Bytes>, status: Status) -> Self {
        StreamScript::FailAfter(chunks, status)
    }

    pub fn refuse(status: Status) -> Self {
        StreamScript::Refuse(status)
    }
}

type FetchHook = Arc<dyn Fn() -> usize + Send + Sync>;

/// Mock transport answering from queued responses and recording every request.
#[derive(Clone, Default)]
#[allow(clippy::type_complexity)]
pub struct MockTransport {
    fetch_results: Arc<Mutex<VecDeque<Result<Bytes, Status>>>>,
    save_results: Arc<Mutex<VecDeque<Result<String, Status>>>>,
    streams: Arc<Mutex<VecDeque<StreamScript>>>,
    fetch_requests: Arc<Mutex<Vec<FetchRequest>>>,
    save_requests: Arc<Mutex<Vec<SaveRequest>>>,
    stream_requests: Arc<Mutex<Vec<FetchStreamRequest>>>,
    stream_items_pulled: Arc<AtomicUsize>,
    fetch_hook: Option<FetchHook>,
    hook_samples: Arc<Mutex<Vec<usize>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fetch_response(self, video: Bytes) -> Self {
        self.fetch_results.lock().unwrap().push_back(Ok(video));
        self
    }

    pub fn with_fetch_error(self, status: Status) -> Self {
        self.fetch_results.lock().unwrap().push_back(Err(status));
        self
    }

    pub fn with_save_response(self, filename: &str) -> Self {
        self.save_results
            .lock()
            .unwrap()
            .push_back(Ok(filename.to_string()));
        self
    }

    pub fn with_stream(self, script: StreamScript) -> Self {
        self.streams.lock().unwrap().push_back(script);
        self
    }

    /// Run `hook` whenever a fetch reaches the transport and keep its result.
    pub fn on_fetch<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> usize + Send + Sync + 'static,
    {
        self.fetch_hook = Some(Arc::new(hook));
        self
    }

    pub fn fetch_requests(&self) -> Vec<FetchRequest> {
        self.fetch_requests.lock().unwrap().clone()
    }

    pub fn save_requests(&self) -> Vec<SaveRequest> {
        self.save_requests.lock().unwrap().clone()
    }

    pub fn stream_requests(&self) -> Vec<FetchStreamRequest> {
        self.stream_requests.lock().unwrap().clone()
    }

    /// Stream items (chunks and errors) the client has consumed so far.
    pub fn stream_items_pulled(&self) -> usize {
        self.stream_items_pulled.load(Ordering::SeqCst)
    }

    pub fn logged_before_fetch(&self) -> Vec<usize> {
        self.hook_samples.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideostoreTransport for MockTransport {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, Status> {
        if let Some(hook) = &self.fetch_hook {
            self.hook_samples.lock().unwrap().push(hook());
        }
        let request_id = request.request_id.clone();
        self.fetch_requests.lock().unwrap().push(request);
        let video_data = self
            .fetch_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Status::unimplemented("no fetch response queued")))?;
        Ok(FetchResponse {
            video_data,
            request_id,
        })
    }

    async fn save(&self, request: SaveRequest) -> Result<SaveResponse, Status> {
        let request_id = request.request_id.clone();
        self.save_requests.lock().unwrap().push(request);
        let filename = self
            .save_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Status::unimplemented("no save response queued")))?;
        Ok(SaveResponse {
            filename,
            request_id,
        })
    }

    async fn fetch_stream(&self, request: FetchStreamRequest) -> Result<ChunkStream, Status> {
        let request_id = request.request_id.clone();
        self.stream_requests.lock().unwrap().push(request);
        let script = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| StreamScript::Refuse(Status::unimplemented("no stream queued")));

        let to_response = move |video_data: Bytes| FetchStreamResponse {
            video_data,
            request_id: request_id.clone(),
        };
        let items: Vec<Result<FetchStreamResponse, Status>> = match script {
            StreamScript::Chunks(chunks) => {
                chunks.into_iter().map(|c| Ok(to_response(c))).collect()
            }
            StreamScript::FailAfter(chunks, status) => chunks
                .into_iter()
                .map(|c| Ok(to_response(c)))
                .chain(std::iter::once(Err(status)))
                .collect(),
            StreamScript::Refuse(status) => return Err(status),
        };
        let pulled = self.stream_items_pulled.clone();
        Ok(futures::stream::iter(items)
            .inspect(move |_| {
                pulled.fetch_add(1, Ordering::SeqCst);
            })
            .boxed())
    }
}
