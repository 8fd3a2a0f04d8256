use async_trait::async_trait;
use thiserror::Error;

mod cache;
mod youtube;

pub use cache::*;
pub use youtube::*;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Link did not match a supported source")]
    NoMatch,

    #[error("Video was not found")]
    NotFound,

    #[error("Video was found but cannot be embedded")]
    NotEmbeddable,

    #[error("Failed to fetch video: {0}")]
    FetchError(String),

    #[error("Failed to parse video: {0}")]
    ParseError(String),

    #[error("{0}")]
    Other(String),
}

/// Metadata of a video, as returned by the external catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVideo {
    /// The canonical identifier of the video
    pub link: String,
    pub name: String,
    /// ISO-8601 duration
    pub duration: String,
}

/// Represents a type that looks up video metadata in an external catalog.
#[async_trait]
pub trait VideoResolver
where
    Self: Send + Sync + 'static,
{
    /// Extracts the canonical identifier from a link.
    fn identify(&self, link: &str) -> Result<String, ResolveError>;

    /// Fetches the metadata of a video by its canonical identifier.
    async fn resolve(&self, id: &str) -> Result<ResolvedVideo, ResolveError>;
}
