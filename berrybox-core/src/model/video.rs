use std::time::Duration;

use crate::{parse_iso_duration, PrimaryKey};

/// Deduplicated metadata of a video, shared by every queue item that references it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoData {
    pub id: PrimaryKey,
    /// The canonical identifier of the video in the external catalog
    pub link: String,
    pub name: String,
    /// ISO-8601 duration, e.g. `PT4M13S`
    pub duration: String,
}

impl VideoData {
    /// Returns the playback length, treating a missing or malformed duration as zero.
    pub fn length(&self) -> Duration {
        parse_iso_duration(&self.duration).unwrap_or_default()
    }

    /// Returns true if the video is longer than the given limit.
    /// A limit of zero means there is no limit.
    pub fn exceeds_minutes(&self, limit_in_minutes: u32) -> bool {
        limit_in_minutes > 0 && self.length() > Duration::from_secs(limit_in_minutes as u64 * 60)
    }
}
