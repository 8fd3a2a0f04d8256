use chrono::{DateTime, Utc};
use log::debug;
use rand::{seq::SliceRandom, Rng};

use crate::{BoxOptions, PrimaryKey, QueueError, QueueItem, QueueItemId, UserData, VideoData};

mod preselection;
pub use preselection::*;

/// The queue of a box, as a working copy that actions are applied to before it is persisted.
///
/// Items are stored newest first. Since submissions are prepended, the queue always reads
/// `upcoming (newest to oldest), playing, played (most recent to oldest)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Playlist {
    items: Vec<QueueItem>,
}

/// How a transition picks the next item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The playing video ended or was skipped
    Natural,
    /// A specific item was forced to play
    Pinned {
        item_id: QueueItemId,
        with_berries: bool,
    },
}

/// What a transition did to the playlist
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    /// The item that stopped playing, if any
    pub ended: Option<QueueItem>,
    /// The item that is now playing, or [None] if the queue ran out
    pub playing: Option<QueueItem>,
    /// The queue was rebuilt from its history
    pub regenerated: bool,
}

impl Playlist {
    pub fn new(items: Vec<QueueItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<QueueItem> {
        self.items
    }

    pub fn get(&self, item_id: QueueItemId) -> Option<&QueueItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn playing(&self) -> Option<&QueueItem> {
        self.items.iter().find(|i| i.is_playing())
    }

    /// Returns the upcoming item that will play next, if one was chosen
    pub fn preselected(&self) -> Option<&QueueItem> {
        self.items
            .iter()
            .find(|i| i.is_upcoming() && i.is_preselected)
    }

    pub fn upcoming(&self) -> impl Iterator<Item = &QueueItem> {
        self.items.iter().filter(|i| i.is_upcoming())
    }

    /// Returns the upcoming or playing item referencing the video, if any
    pub fn pending(&self, video_id: PrimaryKey) -> Option<&QueueItem> {
        self.items
            .iter()
            .find(|i| i.video.id == video_id && !i.is_played())
    }

    /// Adds a video to the queue, unless it is already upcoming or playing.
    /// Returns the new item, or [None] if nothing was added.
    pub fn submit(
        &mut self,
        video: VideoData,
        submitter: Option<UserData>,
        now: DateTime<Utc>,
    ) -> Option<&QueueItem> {
        if self.pending(video.id).is_some() {
            return None;
        }

        self.items.insert(0, QueueItem::new(video, submitter, now));
        self.items.first()
    }

    /// Removes an item from the queue, whatever state it is in.
    pub fn cancel(&mut self, item_id: QueueItemId) -> Result<QueueItem, QueueError> {
        let index = self
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or(QueueError::ItemNotFound)?;

        Ok(self.items.remove(index))
    }

    /// Returns the item if it can be preselected or forced to play.
    fn check_target(&self, item_id: QueueItemId, loop_queue: bool) -> Result<&QueueItem, QueueError> {
        let item = self.get(item_id).ok_or(QueueError::ItemNotFound)?;

        if item.is_playing() {
            return Err(QueueError::ItemAlreadyPlaying);
        }

        if item.is_played() && !loop_queue {
            return Err(QueueError::ItemAlreadyPlayed);
        }

        Ok(item)
    }

    /// Makes sure a played item can be targeted by returning an upcoming item with the same video.
    /// An existing upcoming item is reused, otherwise a fresh copy is submitted.
    pub fn requeue(&mut self, item_id: QueueItemId, now: DateTime<Utc>) -> Option<QueueItemId> {
        let item = self.get(item_id)?;

        if item.is_upcoming() {
            return Some(item.id);
        }

        if let Some(existing) = self.upcoming().find(|i| i.video.id == item.video.id) {
            return Some(existing.id);
        }

        let copy = item.requeued(now);
        let id = copy.id;

        self.items.insert(0, copy);
        Some(id)
    }

    /// Checks whether the item can be forced to play right now.
    pub fn check_force_play(&self, item_id: QueueItemId, loop_queue: bool) -> Result<(), QueueError> {
        if self.is_locked() {
            return Err(QueueError::ForcePlayLocked);
        }

        self.check_target(item_id, loop_queue).map(|_| ())
    }

    /// Checks whether the playing item can be skipped.
    pub fn check_skip(&self) -> Result<(), QueueError> {
        if self.is_locked() {
            return Err(QueueError::SkipLocked);
        }

        Ok(())
    }

    /// Returns true if the playing item was forced with berries
    pub fn is_locked(&self) -> bool {
        self.playing()
            .map(|i| i.state_forced_with_berries)
            .unwrap_or_default()
    }

    /// Replaces the queue with a fresh upcoming copy of every video in its history.
    /// Videos appearing more than once keep their most recent position.
    pub fn regenerate(&mut self, now: DateTime<Utc>) {
        let mut seen = Vec::with_capacity(self.items.len());

        self.items = self
            .items
            .iter()
            .filter(|item| {
                if seen.contains(&item.video.id) {
                    return false;
                }

                seen.push(item.video.id);
                true
            })
            .map(|item| item.requeued(now))
            .collect();

        debug!("Regenerated a queue of {} videos", self.items.len());
    }

    /// Ends the playing item and starts the next one.
    pub fn transition<R>(
        &mut self,
        transition: Transition,
        options: &BoxOptions,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> TransitionOutcome
    where
        R: Rng + ?Sized,
    {
        let mut ended = None;

        for item in self.items.iter_mut().filter(|i| i.is_playing()) {
            item.end_time = Some(now);
            item.state_forced_with_berries = false;

            ended.get_or_insert_with(|| item.clone());
        }

        let mut regenerated = false;

        if self.upcoming().count() == 0 && options.loop_queue && !self.items.is_empty() {
            self.regenerate(now);
            regenerated = true;
        }

        let (pinned, with_berries) = match transition {
            Transition::Natural => (None, false),
            Transition::Pinned {
                item_id,
                with_berries,
            } => (
                self.items
                    .iter()
                    .position(|i| i.id == item_id && i.is_upcoming()),
                with_berries,
            ),
        };

        // Berries only pay for the pinned item
        let with_berries = with_berries && pinned.is_some();

        let index = pinned
            .or_else(|| {
                self.items
                    .iter()
                    .position(|i| i.is_upcoming() && i.is_preselected)
            })
            .or_else(|| self.random_index(options, rng))
            .or_else(|| self.items.iter().rposition(|i| i.is_upcoming()));

        let Some(index) = index else {
            return TransitionOutcome {
                ended,
                playing: None,
                regenerated,
            };
        };

        let mut selected = self.items.remove(index);

        selected.start_time = Some(now);
        selected.end_time = None;
        selected.is_preselected = false;
        selected.state_forced_with_berries = with_berries || selected.state_forced_with_berries;

        let (mut items, rest): (Vec<_>, Vec<_>) =
            self.items.drain(..).partition(|i| i.is_upcoming());

        items.push(selected.clone());
        items.extend(rest);
        self.items = items;

        TransitionOutcome {
            ended,
            playing: Some(selected),
            regenerated,
        }
    }

    fn random_index<R>(&self, options: &BoxOptions, rng: &mut R) -> Option<usize>
    where
        R: Rng + ?Sized,
    {
        if !options.random {
            return None;
        }

        let candidates: Vec<_> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, i)| i.is_upcoming())
            .map(|(index, _)| index)
            .collect();

        candidates.choose(rng).copied()
    }
}

impl From<Vec<QueueItem>> for Playlist {
    fn from(items: Vec<QueueItem>) -> Self {
        Self::new(items)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use chrono::Duration;
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    pub fn video(id: PrimaryKey) -> VideoData {
        VideoData {
            id,
            link: format!("video-{}", id),
            name: format!("Video {}", id),
            duration: "PT3M".to_string(),
        }
    }

    pub fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default()
    }

    /// Submits the videos in order, so the last one ends up first
    pub fn playlist(video_ids: &[PrimaryKey]) -> Playlist {
        let mut playlist = Playlist::default();

        for (offset, id) in video_ids.iter().enumerate() {
            playlist.submit(video(*id), None, now() + Duration::seconds(offset as i64));
        }

        playlist
    }

    pub fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn playing_count(playlist: &Playlist) -> usize {
        playlist.items().iter().filter(|i| i.is_playing()).count()
    }

    fn video_ids(playlist: &Playlist) -> Vec<PrimaryKey> {
        playlist.items().iter().map(|i| i.video.id).collect()
    }

    #[test]
    fn test_oldest_submission_plays_first() {
        // B is submitted first, then A
        let mut playlist = playlist(&[2, 1]);
        assert_eq!(video_ids(&playlist), vec![1, 2]);

        let outcome = playlist.transition(
            Transition::Natural,
            &BoxOptions::default(),
            &mut rng(),
            now(),
        );

        let playing = outcome.playing.expect("something plays");
        assert_eq!(playing.video.id, 2);
        assert_eq!(playing.start_time, Some(now()));
        assert!(playlist.items()[0].is_upcoming());
        assert_eq!(playlist.items()[0].video.id, 1);
    }

    #[test]
    fn test_only_one_item_plays() {
        let mut playlist = playlist(&[1, 2, 3, 4]);
        let options = BoxOptions::default();
        let mut rng = rng();

        for step in 0..6 {
            let time = now() + Duration::minutes(step);
            playlist.transition(Transition::Natural, &options, &mut rng, time);

            assert!(playing_count(&playlist) <= 1);
        }

        assert_eq!(playing_count(&playlist), 0);
        assert!(playlist.items().iter().all(|i| i.is_played()));
    }

    #[test]
    fn test_queue_keeps_state_order() {
        let mut playlist = playlist(&[1, 2, 3, 4]);
        let options = BoxOptions {
            random: true,
            ..Default::default()
        };
        let mut rng = rng();

        for _ in 0..2 {
            playlist.transition(Transition::Natural, &options, &mut rng, now());
        }

        let states: Vec<_> = playlist.items().iter().map(|i| i.state()).collect();
        let mut sorted = states.clone();
        sorted.sort_by_key(|s| match s {
            crate::QueueItemState::Upcoming => 0,
            crate::QueueItemState::Playing => 1,
            crate::QueueItemState::Played => 2,
        });

        assert_eq!(states, sorted);
        assert_eq!(playing_count(&playlist), 1);
    }

    #[test]
    fn test_random_selection_is_seeded() {
        let options = BoxOptions {
            random: true,
            ..Default::default()
        };

        let pick = |seed| {
            let mut playlist = playlist(&[1, 2, 3, 4, 5, 6, 7, 8]);
            let mut rng = StdRng::seed_from_u64(seed);

            playlist
                .transition(Transition::Natural, &options, &mut rng, now())
                .playing
                .map(|i| i.video.id)
        };

        assert_eq!(pick(3), pick(3));

        let picks: Vec<_> = (0..20).filter_map(pick).collect();
        assert!(picks.iter().any(|id| *id != picks[0]));
    }

    #[test]
    fn test_preselected_item_plays_before_oldest() {
        let mut playlist = playlist(&[1, 2, 3]);
        let target = playlist.items()[0].id;

        let selection = playlist.check_preselect(target, false).unwrap();
        playlist.apply_preselection(selection, false, now()).unwrap();

        let outcome = playlist.transition(
            Transition::Natural,
            &BoxOptions::default(),
            &mut rng(),
            now(),
        );

        let playing = outcome.playing.unwrap();
        assert_eq!(playing.id, target);
        assert!(!playing.is_preselected);
        assert!(playlist.preselected().is_none());
    }

    #[test]
    fn test_transition_clears_forced_flag() {
        let mut playlist = playlist(&[1, 2, 3]);
        let target = playlist.items()[0].id;
        let options = BoxOptions::default();

        let outcome = playlist.transition(
            Transition::Pinned {
                item_id: target,
                with_berries: true,
            },
            &options,
            &mut rng(),
            now(),
        );

        assert!(outcome.playing.unwrap().state_forced_with_berries);
        assert!(playlist.is_locked());
        assert_eq!(playlist.check_skip(), Err(QueueError::SkipLocked));

        let outcome = playlist.transition(Transition::Natural, &options, &mut rng(), now());
        let ended = outcome.ended.unwrap();

        assert_eq!(ended.id, target);
        assert!(!ended.state_forced_with_berries);
        assert!(!playlist.get(target).unwrap().state_forced_with_berries);
        assert!(!playlist.is_locked());
    }

    #[test]
    fn test_paid_preselection_stays_forced_when_playing() {
        let mut playlist = playlist(&[1, 2]);
        let target = playlist.items()[0].id;

        let selection = playlist.check_preselect(target, false).unwrap();
        playlist.apply_preselection(selection, true, now()).unwrap();

        let outcome = playlist.transition(
            Transition::Natural,
            &BoxOptions::default(),
            &mut rng(),
            now(),
        );

        assert!(outcome.playing.unwrap().state_forced_with_berries);
    }

    #[test]
    fn test_exhausted_queue_ends() {
        let mut playlist = playlist(&[1]);
        let options = BoxOptions::default();

        playlist.transition(Transition::Natural, &options, &mut rng(), now());
        let outcome = playlist.transition(Transition::Natural, &options, &mut rng(), now());

        assert!(outcome.playing.is_none());
        assert!(!outcome.regenerated);
        assert_eq!(outcome.ended.map(|i| i.video.id), Some(1));
    }

    #[test]
    fn test_loop_regenerates_history() {
        let mut playlist = playlist(&[1, 2, 3]);
        let options = BoxOptions {
            loop_queue: true,
            ..Default::default()
        };

        for _ in 0..3 {
            playlist.transition(Transition::Natural, &options, &mut rng(), now());
        }

        let later = now() + Duration::minutes(10);
        let outcome = playlist.transition(Transition::Natural, &options, &mut rng(), later);

        assert!(outcome.regenerated);
        assert_eq!(playlist.items().len(), 3);
        assert_eq!(playing_count(&playlist), 1);
        assert_eq!(playlist.upcoming().count(), 2);
        assert!(playlist.items().iter().all(|i| !i.is_played()));
        // Replays in the original order
        assert_eq!(outcome.playing.map(|i| i.video.id), Some(1));
    }

    #[test]
    fn test_regeneration_deduplicates_videos() {
        let mut playlist = playlist(&[1, 2]);
        let options = BoxOptions::default();

        for _ in 0..2 {
            playlist.transition(Transition::Natural, &options, &mut rng(), now());
        }

        // Video 1 is played twice
        playlist.submit(video(1), None, now());
        for _ in 0..2 {
            playlist.transition(Transition::Natural, &options, &mut rng(), now());
        }

        assert_eq!(playlist.items().len(), 3);

        playlist.regenerate(now());

        let mut ids = video_ids(&playlist);
        assert_eq!(ids, vec![1, 2]);
        ids.dedup();
        assert_eq!(ids.len(), 2);
        assert!(playlist
            .items()
            .iter()
            .all(|i| i.is_upcoming() && !i.is_preselected && !i.state_forced_with_berries));
    }

    #[test]
    fn test_duplicate_submission_is_ignored() {
        let mut playlist = playlist(&[1]);

        assert!(playlist.submit(video(1), None, now()).is_none());
        assert_eq!(playlist.upcoming().count(), 1);

        playlist.transition(
            Transition::Natural,
            &BoxOptions::default(),
            &mut rng(),
            now(),
        );

        // Still playing
        assert!(playlist.submit(video(1), None, now()).is_none());

        playlist.transition(
            Transition::Natural,
            &BoxOptions::default(),
            &mut rng(),
            now(),
        );

        // Played videos can be submitted again
        assert!(playlist.submit(video(1), None, now()).is_some());
    }

    #[test]
    fn test_cancel_any_state() {
        let mut playlist = playlist(&[1, 2]);
        playlist.transition(
            Transition::Natural,
            &BoxOptions::default(),
            &mut rng(),
            now(),
        );

        let playing = playlist.playing().unwrap().id;
        let removed = playlist.cancel(playing).unwrap();

        assert_eq!(removed.video.id, 1);
        assert_eq!(playlist.cancel(playing), Err(QueueError::ItemNotFound));
        assert_eq!(playlist.items().len(), 1);
    }

    #[test]
    fn test_force_play_targets() {
        let mut playlist = playlist(&[1, 2]);
        let options = BoxOptions::default();

        playlist.transition(Transition::Natural, &options, &mut rng(), now());
        playlist.transition(Transition::Natural, &options, &mut rng(), now());

        let playing = playlist.playing().unwrap().id;
        let played = playlist.items()[1].id;

        assert_eq!(
            playlist.check_force_play(playing, false),
            Err(QueueError::ItemAlreadyPlaying)
        );
        assert_eq!(
            playlist.check_force_play(played, false),
            Err(QueueError::ItemAlreadyPlayed)
        );
        assert_eq!(playlist.check_force_play(played, true), Ok(()));
    }

    #[test]
    fn test_requeue_reuses_upcoming_copy() {
        let mut playlist = playlist(&[1, 2]);
        let options = BoxOptions::default();

        playlist.transition(Transition::Natural, &options, &mut rng(), now());
        playlist.transition(Transition::Natural, &options, &mut rng(), now());

        let played = playlist.items()[1].id;
        let copy = playlist.requeue(played, now()).unwrap();

        assert_ne!(copy, played);
        assert!(playlist.get(copy).unwrap().is_upcoming());
        assert_eq!(playlist.requeue(played, now()), Some(copy));
        assert_eq!(playlist.items().len(), 3);
    }
}
