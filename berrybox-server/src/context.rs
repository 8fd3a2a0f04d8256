use std::{convert::Infallible, sync::Arc, thread};

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use berrybox_collab::{CachedResolver, Collab, MemoryDatabase, YouTubeResolver};
use log::info;

use crate::sse::ServerSentEvents;

pub type ServerCollab = Collab<MemoryDatabase, CachedResolver<YouTubeResolver>>;

#[derive(Clone)]
pub struct ServerContext {
    pub collab: Arc<ServerCollab>,
    pub sse: Arc<ServerSentEvents>,
}

impl ServerContext {
    pub fn new(collab: ServerCollab) -> Self {
        let context = Self {
            collab: Arc::new(collab),
            sse: ServerSentEvents::new(),
        };

        context.forward_events();
        context
    }

    /// Broadcasts collab events to connected clients while the event channel is open
    fn forward_events(&self) {
        let collab = self.collab.clone();
        let sse = self.sse.clone();

        thread::spawn(move || {
            while let Some(event) = collab.wait_for_event() {
                sse.broadcast(event.into());
            }

            info!("Stopped forwarding events");
        });
    }
}

#[async_trait]
impl FromRequestParts<ServerContext> for ServerContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &ServerContext,
    ) -> Result<Self, Self::Rejection> {
        Ok(state.clone())
    }
}
