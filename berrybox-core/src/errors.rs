use thiserror::Error;

use crate::Permission;

/// A rejected queue action. Every variant is meant to be shown to the acting user.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("This box is closed. Submission is disabled.")]
    BoxClosed,
    #[error("This box does not exist.")]
    BoxNotFound,
    #[error("The item could not be found in the queue.")]
    ItemNotFound,
    #[error("This video is already playing.")]
    ItemAlreadyPlaying,
    #[error("This video has already been played. Enable loop mode to play it again.")]
    ItemAlreadyPlayed,
    #[error("This video exceeds the limit of {limit} minutes.")]
    DurationExceeded { limit: u32 },
    #[error("You do not have enough berries to use this action. You need {missing} more.")]
    InsufficientBerries { missing: i64 },
    #[error("Another video has been preselected with berries and cannot be replaced.")]
    PreselectionLocked,
    #[error("The current video has been forced with berries and cannot be overridden.")]
    ForcePlayLocked,
    #[error("The current video has been forced with berries and cannot be skipped.")]
    SkipLocked,
    #[error("The video could not be found or cannot be embedded: {0}")]
    VideoUnresolvable(String),
    #[error("You do not have the {0} permission.")]
    Unauthorized(Permission),
}
