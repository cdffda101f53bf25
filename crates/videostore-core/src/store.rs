//! The videostore capability set.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::resource::Resource;

/// Free-form command payload for `do_command`.
pub type Command = serde_json::Map<String, serde_json::Value>;

/// Extra parameters accepted by `save`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Tag stored alongside the saved file.
    pub metadata: String,
    /// Return as soon as the save is scheduled instead of when the file is written.
    pub r#async: bool,
}

impl SaveOptions {
    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = metadata.into();
        self
    }

    pub fn asynchronous(mut self, r#async: bool) -> Self {
        self.r#async = r#async;
        self
    }
}

/// A named video store serving time ranges of recorded video.
///
/// `from` and `to` are timestamps and `container` names the output format.
/// All three are passed through as-is; the store decides what they mean.
#[async_trait]
pub trait VideoStore: Resource {
    /// Fetch a range as a single encoded clip.
    async fn fetch(&self, from: &str, to: &str, container: &str) -> Result<Bytes>;

    /// Save a range on the store and return the resulting filename.
    async fn save(&self, from: &str, to: &str, container: &str) -> Result<String> {
        self.save_with(from, to, container, SaveOptions::default())
            .await
    }

    async fn save_with(
        &self,
        from: &str,
        to: &str,
        container: &str,
        options: SaveOptions,
    ) -> Result<String>;

    /// Stream a range, handing each chunk to `on_chunk` in arrival order.
    async fn fetch_stream(
        &self,
        from: &str,
        to: &str,
        container: &str,
        on_chunk: &mut (dyn FnMut(Bytes) + Send),
    ) -> Result<()>;

    async fn do_command(&self, command: &Command) -> Result<Command>;
}
