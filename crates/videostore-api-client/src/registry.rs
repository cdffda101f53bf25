//! API registry: maps resource APIs to the constructors that build their clients.
//!
//! Hosts look up a client by resource name and hand over the channel the
//! resource is reachable on; the registry owns no connections itself.

use std::collections::HashMap;
use std::sync::Arc;

use tonic::transport::Channel;
use tracing::debug;
use videostore_core::{
    Api, ResourceName, Result, VideoStore, VideostoreError, MAX_MESSAGE_BYTES,
};

use crate::client::{service_stub, VideostoreClient};
use crate::options::ClientOptions;

/// Builds a client for `name` reached through `remote_name` over `channel`.
pub type ClientConstructor =
    Arc<dyn Fn(Channel, &str, &ResourceName, ClientOptions) -> Arc<dyn VideoStore> + Send + Sync>;

#[derive(Default)]
pub struct ApiRegistry {
    constructors: HashMap<Api, ClientConstructor>,
}

impl ApiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the videostore API already registered.
    pub fn with_videostore() -> Self {
        let mut registry = Self::new();
        registry
            .constructors
            .insert(Api::videostore(), Arc::new(new_client_from_channel));
        registry
    }

    pub fn register(&mut self, api: Api, constructor: ClientConstructor) -> Result<()> {
        if self.constructors.contains_key(&api) {
            return Err(VideostoreError::DuplicateRegistration(api.to_string()));
        }
        debug!(api = %api, "Registered client constructor");
        self.constructors.insert(api, constructor);
        Ok(())
    }

    pub fn is_registered(&self, api: &Api) -> bool {
        self.constructors.contains_key(api)
    }

    /// Build the client for `name`, as seen through `remote_name` (empty for local).
    pub fn client_from_channel(
        &self,
        channel: Channel,
        remote_name: &str,
        name: &ResourceName,
        options: ClientOptions,
    ) -> Result<Arc<dyn VideoStore>> {
        let constructor = self
            .constructors
            .get(&name.api)
            .ok_or_else(|| VideostoreError::UnknownApi(name.api.to_string()))?;
        Ok(constructor(channel, remote_name, name, options))
    }
}

/// Register the videostore client constructor under `viam-modules:service:videostore`.
pub fn register_videostore_api(registry: &mut ApiRegistry) -> Result<()> {
    registry.register(Api::videostore(), Arc::new(new_client_from_channel))
}

/// The client answers to the remote-prefixed name but addresses the server by
/// the name the remote knows it under.
pub fn new_client_from_channel(
    channel: Channel,
    remote_name: &str,
    name: &ResourceName,
    options: ClientOptions,
) -> Arc<dyn VideoStore> {
    Arc::new(VideostoreClient::from_parts(
        service_stub(channel, MAX_MESSAGE_BYTES),
        name.prepend_remote(remote_name),
        name.short_name(),
        options,
    ))
}
