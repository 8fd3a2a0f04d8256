use chrono::{DateTime, Utc};

use crate::{Id, UserData, VideoData};

pub type QueueItemId = Id<QueueItem>;

/// One entry in a box's queue
#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem {
    pub id: QueueItemId,
    pub video: VideoData,
    pub submitted_at: DateTime<Utc>,
    /// The user who submitted the video, or [None] if the system did
    pub submitter: Option<UserData>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Forced to be the next item to play. Only meaningful while upcoming.
    pub is_preselected: bool,
    /// Set when a paid action placed this item, which locks it against overrides
    pub state_forced_with_berries: bool,
}

/// Where an item is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueItemState {
    Upcoming,
    Playing,
    Played,
}

impl QueueItem {
    /// Creates a new upcoming item
    pub fn new(video: VideoData, submitter: Option<UserData>, now: DateTime<Utc>) -> Self {
        Self {
            id: QueueItemId::new(),
            video,
            submitted_at: now,
            submitter,
            start_time: None,
            end_time: None,
            is_preselected: false,
            state_forced_with_berries: false,
        }
    }

    pub fn state(&self) -> QueueItemState {
        match (self.start_time, self.end_time) {
            (None, _) => QueueItemState::Upcoming,
            (Some(_), None) => QueueItemState::Playing,
            (Some(_), Some(_)) => QueueItemState::Played,
        }
    }

    pub fn is_upcoming(&self) -> bool {
        self.state() == QueueItemState::Upcoming
    }

    pub fn is_playing(&self) -> bool {
        self.state() == QueueItemState::Playing
    }

    pub fn is_played(&self) -> bool {
        self.state() == QueueItemState::Played
    }

    /// Returns a fresh upcoming copy of this item, used when replaying history.
    pub fn requeued(&self, now: DateTime<Utc>) -> Self {
        Self::new(self.video.clone(), self.submitter.clone(), now)
    }

    /// Returns how long the item has been playing, if it is playing.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<std::time::Duration> {
        match self.state() {
            QueueItemState::Playing => self
                .start_time
                .and_then(|start| (now - start).to_std().ok())
                .or(Some(std::time::Duration::ZERO)),
            _ => None,
        }
    }
}
