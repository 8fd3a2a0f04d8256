use berrybox_core::QueueItemId;

/// A queue action requested by a user or the system
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueRequest {
    /// Add a video to the queue by link
    Submit { link: String },
    /// Remove an item from the queue
    Cancel { item_id: QueueItemId },
    /// Make an item play next, or unselect it if it already will
    Preselect { item_id: QueueItemId },
    /// Play an item right now
    ForcePlay { item_id: QueueItemId },
    /// End the playing item
    Skip,
}
