//! Resource identity and lifecycle capabilities.
//!
//! A resource is addressed by an API triplet (`namespace:kind:subtype`) plus a
//! name, optionally prefixed by the remotes it is reached through. The string
//! form is `namespace:kind:subtype/remote:name`.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::error::{Result, VideostoreError};

pub const VIDEOSTORE_NAMESPACE: &str = "viam-modules";
pub const VIDEOSTORE_SUBTYPE: &str = "videostore";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiKind {
    Component,
    Service,
}

impl ApiKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiKind::Component => "component",
            ApiKind::Service => "service",
        }
    }
}

impl FromStr for ApiKind {
    type Err = VideostoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "component" => Ok(ApiKind::Component),
            "service" => Ok(ApiKind::Service),
            other => Err(VideostoreError::InvalidResourceName(format!(
                "unknown API kind '{}'",
                other
            ))),
        }
    }
}

/// API triplet identifying a family of resources.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Api {
    pub namespace: String,
    pub kind: ApiKind,
    pub subtype: String,
}

impl Api {
    pub fn service(namespace: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            kind: ApiKind::Service,
            subtype: subtype.into(),
        }
    }

    /// `viam-modules:service:videostore`
    pub fn videostore() -> Self {
        Self::service(VIDEOSTORE_NAMESPACE, VIDEOSTORE_SUBTYPE)
    }
}

impl fmt::Display for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.kind.as_str(), self.subtype)
    }
}

impl FromStr for Api {
    type Err = VideostoreError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [namespace, kind, subtype] if !namespace.is_empty() && !subtype.is_empty() => {
                Ok(Self {
                    namespace: namespace.to_string(),
                    kind: kind.parse()?,
                    subtype: subtype.to_string(),
                })
            }
            _ => Err(VideostoreError::InvalidResourceName(format!(
                "API must be namespace:kind:subtype, got '{}'",
                s
            ))),
        }
    }
}

/// Fully qualified name of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceName {
    pub api: Api,
    /// Remote path, outermost first, joined with `:`. Empty for local resources.
    pub remote: String,
    pub name: String,
}

impl ResourceName {
    pub fn new(api: Api, name: impl Into<String>) -> Self {
        Self {
            api,
            remote: String::new(),
            name: name.into(),
        }
    }

    /// Name of a videostore resource.
    pub fn videostore(name: impl Into<String>) -> Self {
        Self::new(Api::videostore(), name)
    }

    /// `remote:name`, or just `name` for a local resource.
    pub fn short_name(&self) -> String {
        if self.remote.is_empty() {
            self.name.clone()
        } else {
            format!("{}:{}", self.remote, self.name)
        }
    }

    /// Returns this name as seen through `remote`.
    pub fn prepend_remote(&self, remote: &str) -> Self {
        if remote.is_empty() {
            return self.clone();
        }
        let remote = if self.remote.is_empty() {
            remote.to_string()
        } else {
            format!("{}:{}", remote, self.remote)
        };
        Self {
            api: self.api.clone(),
            remote,
            name: self.name.clone(),
        }
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.api, self.short_name())
    }
}

impl FromStr for ResourceName {
    type Err = VideostoreError;

    fn from_str(s: &str) -> Result<Self> {
        let (api, short) = s.split_once('/').ok_or_else(|| {
            VideostoreError::InvalidResourceName(format!("missing '/' in '{}'", s))
        })?;
        let api: Api = api.parse()?;
        let (remote, name) = match short.rsplit_once(':') {
            Some((remote, name)) if !remote.split(':').any(str::is_empty) => (remote, name),
            Some(_) => {
                return Err(VideostoreError::InvalidResourceName(format!(
                    "empty remote segment in '{}'",
                    s
                )))
            }
            None => ("", short),
        };
        if name.is_empty() {
            return Err(VideostoreError::InvalidResourceName(format!(
                "empty name segment in '{}'",
                s
            )));
        }
        Ok(Self {
            api,
            remote: remote.to_string(),
            name: name.to_string(),
        })
    }
}

/// Capabilities every resource exposes to its host: a stable identity and a
/// close hook run when the host tears the resource down.
#[async_trait]
pub trait Resource: Send + Sync {
    fn name(&self) -> &ResourceName;

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
