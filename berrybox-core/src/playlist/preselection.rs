use chrono::{DateTime, Utc};

use super::Playlist;
use crate::{QueueError, QueueItemId, VideoData};

/// What a preselect request on an item will do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preselection {
    /// The item becomes the next to play, unselecting `replaces` if set
    Select {
        item_id: QueueItemId,
        replaces: Option<QueueItemId>,
    },
    /// The item was already preselected and is unselected
    Deselect { item_id: QueueItemId },
}

/// The result of an applied [Preselection]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreselectOutcome {
    Selected {
        video: VideoData,
        replaced: Option<VideoData>,
    },
    Deselected {
        video: VideoData,
    },
}

impl Preselection {
    pub fn is_select(&self) -> bool {
        matches!(self, Preselection::Select { .. })
    }
}

impl Playlist {
    /// Decides what preselecting the item would do, without changing anything.
    ///
    /// A played item in loop mode resolves to an upcoming item with the same video, if one exists.
    /// A preselection that was paid for with berries can neither be replaced nor toggled off.
    pub fn check_preselect(
        &self,
        item_id: QueueItemId,
        loop_queue: bool,
    ) -> Result<Preselection, QueueError> {
        let target = self.check_target(item_id, loop_queue)?;

        let target_id = if target.is_played() {
            self.upcoming()
                .find(|i| i.video.id == target.video.id)
                .map(|i| i.id)
                .unwrap_or(target.id)
        } else {
            target.id
        };

        match self.preselected() {
            Some(current) if current.state_forced_with_berries => {
                Err(QueueError::PreselectionLocked)
            }
            Some(current) if current.id == target_id => {
                Ok(Preselection::Deselect { item_id: target_id })
            }
            current => Ok(Preselection::Select {
                item_id: target_id,
                replaces: current.map(|i| i.id),
            }),
        }
    }

    /// Applies a checked preselection. Played items are requeued first.
    pub fn apply_preselection(
        &mut self,
        preselection: Preselection,
        with_berries: bool,
        now: DateTime<Utc>,
    ) -> Result<PreselectOutcome, QueueError> {
        match preselection {
            Preselection::Deselect { item_id } => {
                let item = self
                    .items
                    .iter_mut()
                    .find(|i| i.id == item_id)
                    .ok_or(QueueError::ItemNotFound)?;

                item.is_preselected = false;
                item.state_forced_with_berries = false;

                Ok(PreselectOutcome::Deselected {
                    video: item.video.clone(),
                })
            }
            Preselection::Select { item_id, replaces } => {
                let item_id = self.requeue(item_id, now).ok_or(QueueError::ItemNotFound)?;

                let mut replaced = None;

                if let Some(previous) = replaces
                    .and_then(|id| self.items.iter().position(|i| i.id == id))
                    .map(|index| &mut self.items[index])
                {
                    previous.is_preselected = false;
                    replaced = Some(previous.video.clone());
                }

                let item = self
                    .items
                    .iter_mut()
                    .find(|i| i.id == item_id)
                    .ok_or(QueueError::ItemNotFound)?;

                item.is_preselected = true;
                item.state_forced_with_berries = with_berries;

                Ok(PreselectOutcome::Selected {
                    video: item.video.clone(),
                    replaced,
                })
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::playlist::test::{now, playlist, rng};
    use crate::{BoxOptions, Transition};

    #[test]
    fn test_preselect_toggles() {
        let mut playlist = playlist(&[1, 2, 3]);
        let original = playlist.clone();
        let target = playlist.items()[1].id;

        let selection = playlist.check_preselect(target, false).unwrap();
        assert!(selection.is_select());
        playlist.apply_preselection(selection, false, now()).unwrap();
        assert_eq!(playlist.preselected().map(|i| i.id), Some(target));

        let selection = playlist.check_preselect(target, false).unwrap();
        assert_eq!(selection, Preselection::Deselect { item_id: target });
        playlist.apply_preselection(selection, false, now()).unwrap();

        assert_eq!(playlist, original);
    }

    #[test]
    fn test_preselect_replaces_free_selection() {
        let mut playlist = playlist(&[1, 2, 3]);
        let first = playlist.items()[0].id;
        let second = playlist.items()[1].id;

        let selection = playlist.check_preselect(first, false).unwrap();
        playlist.apply_preselection(selection, false, now()).unwrap();

        let selection = playlist.check_preselect(second, false).unwrap();
        assert_eq!(
            selection,
            Preselection::Select {
                item_id: second,
                replaces: Some(first)
            }
        );

        let outcome = playlist.apply_preselection(selection, false, now()).unwrap();
        let PreselectOutcome::Selected { video, replaced } = outcome else {
            panic!("expected a selection");
        };

        assert_eq!(video.id, 2);
        assert_eq!(replaced.map(|v| v.id), Some(3));
        assert_eq!(playlist.preselected().map(|i| i.id), Some(second));
        assert!(!playlist.get(first).unwrap().is_preselected);
    }

    #[test]
    fn test_paid_preselection_is_locked() {
        let mut playlist = playlist(&[1, 2, 3]);
        let x = playlist.items()[0].id;
        let y = playlist.items()[1].id;

        let selection = playlist.check_preselect(x, false).unwrap();
        playlist.apply_preselection(selection, true, now()).unwrap();

        assert_eq!(
            playlist.check_preselect(y, false),
            Err(QueueError::PreselectionLocked)
        );
        assert_eq!(
            playlist.check_preselect(x, false),
            Err(QueueError::PreselectionLocked)
        );
    }

    #[test]
    fn test_preselect_played_item_needs_loop() {
        let mut playlist = playlist(&[1, 2]);
        let options = BoxOptions::default();

        playlist.transition(Transition::Natural, &options, &mut rng(), now());
        playlist.transition(Transition::Natural, &options, &mut rng(), now());

        let playing = playlist.playing().unwrap().id;
        let played = playlist.items()[1].id;

        assert_eq!(
            playlist.check_preselect(playing, true),
            Err(QueueError::ItemAlreadyPlaying)
        );
        assert_eq!(
            playlist.check_preselect(played, false),
            Err(QueueError::ItemAlreadyPlayed)
        );

        let selection = playlist.check_preselect(played, true).unwrap();
        playlist.apply_preselection(selection, false, now()).unwrap();

        let preselected = playlist.preselected().unwrap();
        assert_ne!(preselected.id, played);
        assert_eq!(preselected.video.id, 1);
        assert!(playlist.get(played).unwrap().is_played());
    }
}
