use axum::{
    extract::Query,
    response::{
        sse::{Event, KeepAlive},
        Sse,
    },
    routing::get,
};
use berrybox_collab::CollabEvent;
use berrybox_core::{Id, PrimaryKey};
use futures_util::Stream;
use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{
    collections::VecDeque,
    convert::Infallible,
    pin::Pin,
    sync::{Arc, Weak},
    task::{Context, Poll, Waker},
};
use utoipa::{IntoParams, ToSchema};

use crate::{
    context::ServerContext,
    serialized::{BoxInfo, Feedback, QueueItem, ToSerialized},
    Router,
};

type ConnectionId = Id<Connection>;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum ServerEvent {
    /// The queue of a box changed
    QueueUpdate {
        box_id: PrimaryKey,
        items: Vec<QueueItem>,
        feedback: Feedback,
    },
    /// The playing item of a box changed
    Sync {
        box_id: PrimaryKey,
        item: Option<QueueItem>,
        /// The playback offset, in seconds.
        offset: f32,
    },
    /// The berries of a subscriber changed
    BerriesUpdate {
        box_id: PrimaryKey,
        user_id: PrimaryKey,
        berries: i64,
    },
    /// The settings of a box changed
    BoxUpdate { box_id: PrimaryKey, data: BoxInfo },
    /// A box was deleted
    BoxDeleted { box_id: PrimaryKey },
}

impl ServerEvent {
    fn box_id(&self) -> PrimaryKey {
        match self {
            Self::QueueUpdate { box_id, .. }
            | Self::Sync { box_id, .. }
            | Self::BerriesUpdate { box_id, .. }
            | Self::BoxUpdate { box_id, .. }
            | Self::BoxDeleted { box_id } => *box_id,
        }
    }
}

impl From<CollabEvent> for ServerEvent {
    fn from(value: CollabEvent) -> Self {
        match value {
            CollabEvent::QueueUpdate {
                box_id,
                items,
                feedback,
            } => Self::QueueUpdate {
                box_id,
                items: items.to_serialized(),
                feedback: feedback.to_serialized(),
            },
            CollabEvent::Sync(packet) => Self::Sync {
                box_id: packet.box_id,
                item: packet.item.to_serialized(),
                offset: packet.offset,
            },
            CollabEvent::BerriesUpdate {
                box_id,
                user_id,
                berries,
            } => Self::BerriesUpdate {
                box_id,
                user_id,
                berries,
            },
            CollabEvent::BoxUpdate { box_id, data } => Self::BoxUpdate {
                box_id,
                data: data.to_serialized(),
            },
            CollabEvent::BoxDeleted { box_id } => Self::BoxDeleted { box_id },
        }
    }
}

/// Manages server sent event connections
pub struct ServerSentEvents {
    me: Weak<Self>,
    connections: Mutex<Vec<Connection>>,
}

struct Connection {
    id: ConnectionId,
    /// Only events of this box are sent, if set
    box_id: Option<PrimaryKey>,
    pending_messages: Arc<Mutex<VecDeque<ServerEvent>>>,
    waker: Arc<Mutex<Option<Waker>>>,
}

pub struct ConnectionHandle {
    id: ConnectionId,
    /// A reference to [Connection]'s pending messages
    pending_messages: Arc<Mutex<VecDeque<ServerEvent>>>,
    /// A reference to [Connection]'s stored [Waker]
    waker: Arc<Mutex<Option<Waker>>>,
    /// Required to remove connection when dropped
    manager: Weak<ServerSentEvents>,
}

impl ServerSentEvents {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            connections: Default::default(),
        })
    }

    pub fn broadcast(&self, event: ServerEvent) {
        let connections = self.connections.lock();
        let box_id = event.box_id();

        for connection in connections.iter() {
            if connection.box_id.map_or(true, |id| id == box_id) {
                connection.send(event.clone())
            }
        }
    }

    fn connect(&self, box_id: Option<PrimaryKey>) -> ConnectionHandle {
        let connection = Connection::new(box_id);
        let handle = connection.handle(self.me.clone());

        debug!("Connection {} listening to events", connection.id);

        self.connections.lock().push(connection);
        handle
    }

    fn disconnect(&self, id: ConnectionId) {
        self.connections.lock().retain(|c| c.id != id)
    }
}

impl Connection {
    fn new(box_id: Option<PrimaryKey>) -> Self {
        Self {
            id: ConnectionId::new(),
            box_id,
            pending_messages: Default::default(),
            waker: Default::default(),
        }
    }

    fn send(&self, message: ServerEvent) {
        self.pending_messages.lock().push_back(message);

        if let Some(waker) = self.waker.lock().take() {
            waker.wake()
        }
    }

    fn handle(&self, manager: Weak<ServerSentEvents>) -> ConnectionHandle {
        ConnectionHandle {
            id: self.id,
            pending_messages: self.pending_messages.clone(),
            waker: self.waker.clone(),
            manager,
        }
    }
}

impl Stream for ConnectionHandle {
    type Item = Result<Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut pending_messages = self.pending_messages.lock();

        while let Some(message) = pending_messages.pop_front() {
            match Event::default().json_data(&message) {
                Ok(event) => return Poll::Ready(Some(Ok(event))),
                Err(error) => warn!("Dropped an event that failed to serialize: {}", error),
            }
        }

        // Stored while the queue is locked, so a concurrent send cannot be missed
        *self.waker.lock() = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.disconnect(self.id)
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventFilter {
    /// Only receive events of this box
    box_id: Option<PrimaryKey>,
}

#[utoipa::path(
    get,
    path = "/v1/events",
    tag = "events",
    params(EventFilter),
    responses(
        (
            status = 200,
            content_type = "text/event-stream",
            description = "A stream of events from berrybox",
            body = ServerEvent
        )
    )
)]
pub async fn event_stream(
    context: ServerContext,
    Query(filter): Query<EventFilter>,
) -> Sse<ConnectionHandle> {
    Sse::new(context.sse.connect(filter.box_id)).keep_alive(KeepAlive::default())
}

pub fn router() -> Router {
    Router::new().route("/", get(event_stream))
}

#[cfg(test)]
mod test {
    use berrybox_collab::CollabEvent;
    use futures_util::StreamExt;

    use super::{ServerEvent, ServerSentEvents};

    #[tokio::test]
    async fn test_box_filter() {
        let sse = ServerSentEvents::new();

        let mut everything = sse.connect(None);
        let mut second_box = sse.connect(Some(2));

        sse.broadcast(CollabEvent::BoxDeleted { box_id: 1 }.into());
        sse.broadcast(ServerEvent::BerriesUpdate {
            box_id: 2,
            user_id: 1,
            berries: 3,
        });

        assert!(everything.next().await.is_some());
        assert!(everything.next().await.is_some());
        assert!(second_box.next().await.is_some());
        assert!(second_box.pending_messages.lock().is_empty());

        drop(everything);
        assert_eq!(sse.connections.lock().len(), 1);
    }
}
