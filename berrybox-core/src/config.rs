use crate::{GainTier, Permission};

/// The configuration of the queue engine and its economy
#[derive(Debug, Clone)]
pub struct Config {
    /// Berries spent to preselect the next video
    pub play_next_cost: u32,
    /// Berries spent to force a video to play immediately
    pub play_now_cost: u32,
    /// Berries spent to skip the current video
    pub skip_cost: u32,
    /// Actions that can be bought with berries when the role does not grant them
    pub berries_overridable: Vec<Permission>,
    /// Random berry gains, checked in order against a single draw
    pub gain_table: Vec<GainTier>,
    /// How many times a failed natural transition is attempted before the job is dropped
    pub transition_attempts: u32,
    /// How long to wait before retrying a failed natural transition
    pub transition_retry_delay_in_seconds: f32,
}

impl Config {
    pub const PLAY_NEXT_BERRY_COST: u32 = 10;
    pub const PLAY_NOW_BERRY_COST: u32 = 50;
    pub const SKIP_BERRY_COST: u32 = 30;
}

impl Default for Config {
    fn default() -> Self {
        Self {
            play_next_cost: Self::PLAY_NEXT_BERRY_COST,
            play_now_cost: Self::PLAY_NOW_BERRY_COST,
            skip_cost: Self::SKIP_BERRY_COST,
            berries_overridable: vec![
                Permission::ForceNext,
                Permission::ForcePlay,
                Permission::SkipVideo,
            ],
            // 0.05% for 6, the next 1% for 2, the next 25% for 1
            gain_table: vec![
                GainTier::new(0.0005, 6),
                GainTier::new(0.0105, 2),
                GainTier::new(0.2605, 1),
            ],
            transition_attempts: 5,
            transition_retry_delay_in_seconds: 1.0,
        }
    }
}
