use crate::{Acl, PrimaryKey, QueueItem, UserData};

/// A berrybox, a room where a queue of videos is watched together
#[derive(Debug, Clone)]
pub struct BoxData {
    pub id: PrimaryKey,
    pub name: String,
    pub creator: UserData,
    /// Closed boxes refuse every queue action
    pub open: bool,
    pub private: bool,
    pub options: BoxOptions,
    pub acl: Acl,
    /// The queue, newest first. See [crate::Playlist] for the ordering.
    pub playlist: Vec<QueueItem>,
    /// Incremented by the store every time the queue is replaced
    pub version: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoxOptions {
    /// Pick the next video randomly instead of in submission order
    pub random: bool,
    /// Replay the history when the queue runs out
    pub loop_queue: bool,
    /// Allow subscribers to buy actions with berries
    pub berries: bool,
    /// Longest allowed video in minutes, 0 for no limit
    pub video_max_duration: u32,
}

impl BoxData {
    pub fn is_creator(&self, user_id: PrimaryKey) -> bool {
        self.creator.id == user_id
    }
}
