//! Client options.

use std::fmt;
use std::sync::Arc;

use videostore_proto::{FetchRequest, FetchStreamRequest, SaveRequest};

/// What the request logger is shown.
#[derive(Debug, Clone, Copy)]
pub enum RequestEvent<'a> {
    Fetch(&'a FetchRequest),
    Save(&'a SaveRequest),
    FetchStream(&'a FetchStreamRequest),
    /// The streaming call failed, either when opening or mid-stream.
    StreamError(&'a tonic::Status),
}

pub type RequestLogger = Arc<dyn Fn(RequestEvent<'_>) + Send + Sync>;

/// Options fixed at client construction.
#[derive(Clone, Default)]
pub struct ClientOptions {
    /// Called with every outgoing request before the call is awaited, and with
    /// any error raised by the streaming call. Purely informational.
    pub request_logger: Option<RequestLogger>,
}

impl ClientOptions {
    pub fn with_request_logger<F>(mut self, logger: F) -> Self
    where
        F: Fn(RequestEvent<'_>) + Send + Sync + 'static,
    {
        self.request_logger = Some(Arc::new(logger));
        self
    }

    pub(crate) fn log(&self, event: RequestEvent<'_>) {
        if let Some(logger) = &self.request_logger {
            logger(event);
        }
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("request_logger", &self.request_logger.is_some())
            .finish()
    }
}
