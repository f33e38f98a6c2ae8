// src/system/remote.rs

use crate::core::engine::EngineKind;
use crate::system::platform::{self, Platform};
use thiserror::Error;
use url::Url;

/// Path of the downloadable-engines listing, resolved against the base URL.
const ENGINES_PATH: &str = "/engines";

/// Errors raised while building catalog URLs.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The base URL does not parse.
    #[error("Invalid remote catalog URL '{url}': {source}")]
    InvalidUrl {
        /// URL as given.
        url: String,
        /// Parse error.
        #[source]
        source: url::ParseError,
    },
}

/// Request builder for the remote engine catalog.
///
/// Only the request contract lives here; fetching and decoding the listing is
/// left to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCatalog {
    base: Url,
    platform: Platform,
    x64: bool,
}

impl RemoteCatalog {
    /// Builds a catalog for the running platform and architecture.
    pub fn new(base_url: &str) -> Result<Self, RemoteError> {
        Self::for_platform(base_url, Platform::current(), platform::is_arch_x64())
    }

    /// Builds a catalog for an explicit platform and architecture.
    pub fn for_platform(base_url: &str, platform: Platform, x64: bool) -> Result<Self, RemoteError> {
        let base = Url::parse(base_url).map_err(|e| RemoteError::InvalidUrl {
            url: base_url.to_string(),
            source: e,
        })?;
        Ok(Self {
            base,
            platform,
            x64,
        })
    }

    /// Parsed base URL.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// URL listing the downloadable engines, optionally restricted to one kind.
    ///
    /// Any query already present on the base URL is kept ahead of the catalog
    /// parameters.
    pub fn engines_url(&self, kind: Option<EngineKind>) -> Result<Url, RemoteError> {
        let mut url = self
            .base
            .join(ENGINES_PATH)
            .map_err(|e| RemoteError::InvalidUrl {
                url: self.base.to_string(),
                source: e,
            })?;
        url.set_query(self.base.query());

        let engine_type = kind.map_or("all", |kind| kind.as_query_value());
        url.query_pairs_mut()
            .append_pair("platform", self.platform.os_name())
            .append_pair("x64", if self.x64 { "1" } else { "0" })
            .append_pair("type", engine_type);

        log::debug!("Remote engines URL: {}", url);
        Ok(url)
    }
}
