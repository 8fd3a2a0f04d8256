use berrybox_core::{BoxData, FeedbackMessage, PrimaryKey, QueueItem};
use crossbeam::channel::{Receiver, Sender};

pub type EventSender = Sender<CollabEvent>;
pub type EventReceiver = Receiver<CollabEvent>;

/// Tells clients what to play, and from where
#[derive(Debug, Clone, PartialEq)]
pub struct SyncPacket {
    pub box_id: PrimaryKey,
    /// The playing item, or [None] if the queue ended
    pub item: Option<QueueItem>,
    /// The playback offset in seconds
    pub offset: f32,
}

/// Events emitted by the collab system, to be fanned out to the sessions of a box.
#[derive(Debug, Clone)]
pub enum CollabEvent {
    /// The queue of a box changed
    QueueUpdate {
        box_id: PrimaryKey,
        items: Vec<QueueItem>,
        feedback: FeedbackMessage,
    },
    /// The playing item of a box changed
    Sync(SyncPacket),
    /// The berries of a subscriber changed
    BerriesUpdate {
        box_id: PrimaryKey,
        user_id: PrimaryKey,
        berries: i64,
    },
    /// The settings of a box changed
    BoxUpdate { box_id: PrimaryKey, data: BoxData },
    BoxDeleted { box_id: PrimaryKey },
}

impl CollabEvent {
    /// Returns the box the event is about
    pub fn box_id(&self) -> PrimaryKey {
        match self {
            CollabEvent::QueueUpdate { box_id, .. } => *box_id,
            CollabEvent::Sync(packet) => packet.box_id,
            CollabEvent::BerriesUpdate { box_id, .. } => *box_id,
            CollabEvent::BoxUpdate { box_id, .. } => *box_id,
            CollabEvent::BoxDeleted { box_id } => *box_id,
        }
    }
}

impl SyncPacket {
    /// A packet for an item that just started playing
    pub fn started(box_id: PrimaryKey, item: Option<QueueItem>) -> Self {
        Self {
            box_id,
            item,
            offset: 0.,
        }
    }
}
