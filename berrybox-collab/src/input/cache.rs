use async_trait::async_trait;
use dashmap::DashMap;
use log::debug;

use super::{ResolveError, ResolvedVideo, VideoResolver};

/// Remembers resolved videos by identifier, so each video is only fetched once.
pub struct CachedResolver<R> {
    inner: R,
    cache: DashMap<String, ResolvedVideo>,
}

impl<R> CachedResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: Default::default(),
        }
    }
}

#[async_trait]
impl<R> VideoResolver for CachedResolver<R>
where
    R: VideoResolver,
{
    fn identify(&self, link: &str) -> Result<String, ResolveError> {
        self.inner.identify(link)
    }

    async fn resolve(&self, id: &str) -> Result<ResolvedVideo, ResolveError> {
        if let Some(video) = self.cache.get(id) {
            debug!("Resolved {} from cache", id);
            return Ok(video.clone());
        }

        let video = self.inner.resolve(id).await?;
        self.cache.insert(id.to_string(), video.clone());

        Ok(video)
    }
}
