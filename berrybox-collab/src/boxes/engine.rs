use std::time::Duration;

use berrybox_core::{
    feedback, BoxData, FeedbackMessage, Permission, Playlist, PreselectOutcome, PrimaryKey,
    QueueError, QueueItem, QueueItemId, SubscriberData, Transition, TransitionOutcome, VideoData,
};
use chrono::{DateTime, Utc};
use log::{debug, info};
use rand::thread_rng;
use thiserror::Error;

use crate::{
    Charge, CollabContext, CollabEvent, Database, DatabaseError, Ledger, NewVideo,
    PermissionEvaluator, QueueRequest, ResolveError, SyncPacket, TransitionJob, VideoResolver,
};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Database(DatabaseError),
}

impl From<DatabaseError> for EngineError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::NotFound { resource: "box", .. } => QueueError::BoxNotFound.into(),
            error => EngineError::Database(error),
        }
    }
}

impl From<ResolveError> for EngineError {
    fn from(error: ResolveError) -> Self {
        QueueError::VideoUnresolvable(error.to_string()).into()
    }
}

/// The result of a successful queue action
#[derive(Debug, Clone)]
pub struct QueueOutcome {
    pub items: Vec<QueueItem>,
    pub feedback: FeedbackMessage,
    /// Set when the playing item changed
    pub sync: Option<SyncPacket>,
}

/// Applies queue actions to boxes.
///
/// Every action on a box runs under that box's lock: the queue is read, changed as a
/// [Playlist], written back with a version check, and only then are berries debited,
/// the timer re-armed, and events emitted.
pub struct QueueEngine<Db, R> {
    context: CollabContext<Db, R>,
    permissions: PermissionEvaluator<Db, R>,
    ledger: Ledger<Db, R>,
}

impl<Db, R> QueueEngine<Db, R>
where
    Db: Database,
    R: VideoResolver,
{
    pub fn new(context: &CollabContext<Db, R>) -> Self {
        Self {
            context: context.clone(),
            permissions: PermissionEvaluator::new(context),
            ledger: Ledger::new(context),
        }
    }

    pub fn context(&self) -> &CollabContext<Db, R> {
        &self.context
    }

    /// Dispatches a request to the matching action
    pub async fn handle(
        &self,
        box_id: PrimaryKey,
        user_id: Option<PrimaryKey>,
        request: QueueRequest,
    ) -> Result<QueueOutcome, EngineError> {
        match request {
            QueueRequest::Submit { link } => self.submit(box_id, user_id, &link).await,
            QueueRequest::Cancel { item_id } => self.cancel(box_id, user_id, item_id).await,
            QueueRequest::Preselect { item_id } => self.preselect(box_id, user_id, item_id).await,
            QueueRequest::ForcePlay { item_id } => self.force_play(box_id, user_id, item_id).await,
            QueueRequest::Skip => self.skip(box_id, user_id).await,
        }
    }

    /// Returns the queue of a box
    pub async fn items(&self, box_id: PrimaryKey) -> Result<Vec<QueueItem>, EngineError> {
        Ok(self.context.database.box_by_id(box_id).await?.playlist)
    }

    /// Adds a video to the queue of a box.
    /// Submitting a video that is already upcoming or playing changes nothing.
    pub async fn submit(
        &self,
        box_id: PrimaryKey,
        user_id: Option<PrimaryKey>,
        link: &str,
    ) -> Result<QueueOutcome, EngineError> {
        let video = self.video_by_link(link).await?;

        let _guard = self.context.locks.acquire(box_id).await;
        let box_data = self.open_box(box_id).await?;
        let subscriber = self.subscriber(&box_data, user_id).await?;

        self.permissions
            .charge(&box_data, subscriber.as_ref(), Permission::AddVideo, 0)?;

        let limit = box_data.options.video_max_duration;
        if video.exceeds_minutes(limit) && !self.bypasses_duration(&box_data, subscriber.as_ref()) {
            return Err(QueueError::DurationExceeded { limit }.into());
        }

        let submitter = subscriber.map(|s| s.user);
        let mut playlist = Playlist::new(box_data.playlist.clone());

        if playlist
            .submit(video.clone(), submitter.clone(), Utc::now())
            .is_none()
        {
            debug!("Video {} is already pending in box {}", video.link, box_id);

            return Ok(QueueOutcome {
                items: playlist.into_items(),
                feedback: feedback::video_already_queued(&video),
                sync: None,
            });
        }

        let stored = self.persist(&box_data, playlist).await?;
        self.wake(&stored);

        info!("Video {} submitted to box {}", video.name, box_data.name);

        Ok(self.publish(
            stored,
            feedback::video_submitted(submitter.as_ref(), &video),
            None,
        ))
    }

    /// Removes an item from the queue, whatever its state.
    /// Removing the playing item moves on to the next one.
    pub async fn cancel(
        &self,
        box_id: PrimaryKey,
        user_id: Option<PrimaryKey>,
        item_id: QueueItemId,
    ) -> Result<QueueOutcome, EngineError> {
        let _guard = self.context.locks.acquire(box_id).await;
        let box_data = self.open_box(box_id).await?;
        let subscriber = self.subscriber(&box_data, user_id).await?;

        let mut playlist = Playlist::new(box_data.playlist.clone());
        let removed = playlist.cancel(item_id)?;

        self.permissions
            .charge(&box_data, subscriber.as_ref(), Permission::RemoveVideo, 0)?;

        let stored = self.persist(&box_data, playlist).await?;

        if removed.is_playing() {
            self.context.scheduler.arm(box_id, Duration::ZERO);
        }

        let actor = subscriber.map(|s| s.user);
        Ok(self.publish(
            stored,
            feedback::video_removed(actor.as_ref(), &removed.video),
            None,
        ))
    }

    /// Makes an item the next to play, or unselects it if it already is.
    pub async fn preselect(
        &self,
        box_id: PrimaryKey,
        user_id: Option<PrimaryKey>,
        item_id: QueueItemId,
    ) -> Result<QueueOutcome, EngineError> {
        let _guard = self.context.locks.acquire(box_id).await;
        let box_data = self.open_box(box_id).await?;
        let subscriber = self.subscriber(&box_data, user_id).await?;

        let mut playlist = Playlist::new(box_data.playlist.clone());
        let selection = playlist.check_preselect(item_id, box_data.options.loop_queue)?;

        // Unselecting is free
        let cost = if selection.is_select() {
            self.context.config.play_next_cost
        } else {
            0
        };

        let charge = self.permissions.charge(
            &box_data,
            subscriber.as_ref(),
            Permission::ForceNext,
            cost,
        )?;

        let outcome = playlist.apply_preselection(selection, charge.is_paid(), Utc::now())?;
        let stored = self.persist(&box_data, playlist).await?;

        self.settle(&box_data, subscriber.as_ref(), charge).await?;
        self.wake(&stored);

        let actor = subscriber.map(|s| s.user);
        let feedback = match &outcome {
            PreselectOutcome::Selected { video, replaced } => {
                feedback::preselected(actor.as_ref(), video, replaced.as_ref(), charge.is_paid())
            }
            PreselectOutcome::Deselected { video } => {
                feedback::preselection_removed(actor.as_ref(), video)
            }
        };

        Ok(self.publish(stored, feedback, None))
    }

    /// Plays an item right now, ending the playing one.
    pub async fn force_play(
        &self,
        box_id: PrimaryKey,
        user_id: Option<PrimaryKey>,
        item_id: QueueItemId,
    ) -> Result<QueueOutcome, EngineError> {
        let _guard = self.context.locks.acquire(box_id).await;
        let box_data = self.open_box(box_id).await?;
        let subscriber = self.subscriber(&box_data, user_id).await?;

        let mut playlist = Playlist::new(box_data.playlist.clone());
        playlist.check_force_play(item_id, box_data.options.loop_queue)?;

        let charge = self.permissions.charge(
            &box_data,
            subscriber.as_ref(),
            Permission::ForcePlay,
            self.context.config.play_now_cost,
        )?;

        let now = Utc::now();
        let item_id = playlist
            .requeue(item_id, now)
            .ok_or(QueueError::ItemNotFound)?;

        let outcome = self.transition(
            &mut playlist,
            &box_data,
            Transition::Pinned {
                item_id,
                with_berries: charge.is_paid(),
            },
            now,
        );

        let stored = self.persist(&box_data, playlist).await?;
        self.settle(&box_data, subscriber.as_ref(), charge).await?;
        self.arm(box_id, &outcome);

        let actor = subscriber.map(|s| s.user);
        let feedback = match &outcome.playing {
            Some(item) => feedback::force_played(actor.as_ref(), &item.video, charge.is_paid()),
            None => feedback::queue_ended(),
        };

        Ok(self.publish(
            stored,
            feedback,
            Some(SyncPacket::started(box_id, outcome.playing)),
        ))
    }

    /// Ends the playing item and moves on to the next one.
    pub async fn skip(
        &self,
        box_id: PrimaryKey,
        user_id: Option<PrimaryKey>,
    ) -> Result<QueueOutcome, EngineError> {
        let _guard = self.context.locks.acquire(box_id).await;
        let box_data = self.open_box(box_id).await?;
        let subscriber = self.subscriber(&box_data, user_id).await?;

        let mut playlist = Playlist::new(box_data.playlist.clone());
        playlist.check_skip()?;

        let charge = self.permissions.charge(
            &box_data,
            subscriber.as_ref(),
            Permission::SkipVideo,
            self.context.config.skip_cost,
        )?;

        let outcome = self.transition(&mut playlist, &box_data, Transition::Natural, Utc::now());

        let stored = self.persist(&box_data, playlist).await?;
        self.settle(&box_data, subscriber.as_ref(), charge).await?;
        self.arm(box_id, &outcome);

        let actor = subscriber.map(|s| s.user);
        let next = outcome.playing.as_ref().map(|i| &i.video);

        Ok(self.publish(
            stored,
            feedback::skipped(actor.as_ref(), next, charge.is_paid()),
            Some(SyncPacket::started(box_id, outcome.playing)),
        ))
    }

    /// Moves on to the next item when the playing one ends.
    /// Returns [None] if the job was stale or the box is closed or gone.
    pub async fn natural_transition(
        &self,
        job: TransitionJob,
    ) -> Result<Option<QueueOutcome>, EngineError> {
        let box_id = job.box_id;
        let _guard = self.context.locks.acquire(box_id).await;

        if !self.context.scheduler.is_current(&job) {
            debug!("Dropped stale transition {} of box {}", job.generation, box_id);
            return Ok(None);
        }

        let box_data = match self.context.database.box_by_id(box_id).await {
            Ok(box_data) => box_data,
            Err(e) if e.is_not_found() => {
                self.context.scheduler.cancel(box_id);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if !box_data.open {
            self.context.scheduler.cancel(box_id);
            return Ok(None);
        }

        let mut playlist = Playlist::new(box_data.playlist.clone());
        let outcome = self.transition(&mut playlist, &box_data, Transition::Natural, Utc::now());

        if outcome.ended.is_none() && outcome.playing.is_none() {
            self.context.scheduler.cancel(box_id);
            return Ok(None);
        }

        let stored = self.persist(&box_data, playlist).await?;
        self.arm(box_id, &outcome);

        let feedback = match &outcome.playing {
            Some(item) => feedback::now_playing(&item.video),
            None => feedback::queue_ended(),
        };

        Ok(Some(self.publish(
            stored,
            feedback,
            Some(SyncPacket::started(box_id, outcome.playing)),
        )))
    }

    /// Finds the stored video for a link, resolving and storing it on first use.
    async fn video_by_link(&self, link: &str) -> Result<VideoData, EngineError> {
        let id = self.context.resolver.identify(link)?;

        match self.context.database.video_by_link(&id).await {
            Ok(video) => return Ok(video),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        let resolved = self.context.resolver.resolve(&id).await?;
        let created = self
            .context
            .database
            .create_video(NewVideo {
                link: resolved.link,
                name: resolved.name,
                duration: resolved.duration,
            })
            .await;

        match created {
            Ok(video) => Ok(video),
            // Someone else stored it in the meantime
            Err(DatabaseError::Conflict { .. }) => {
                Ok(self.context.database.video_by_link(&id).await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn open_box(&self, box_id: PrimaryKey) -> Result<BoxData, EngineError> {
        let box_data = self.context.database.box_by_id(box_id).await?;

        if !box_data.open {
            return Err(QueueError::BoxClosed.into());
        }

        Ok(box_data)
    }

    async fn subscriber(
        &self,
        box_data: &BoxData,
        user_id: Option<PrimaryKey>,
    ) -> Result<Option<SubscriberData>, EngineError> {
        match user_id {
            Some(user_id) => Ok(Some(self.context.subscriber(box_data, user_id).await?)),
            None => Ok(None),
        }
    }

    fn bypasses_duration(&self, box_data: &BoxData, subscriber: Option<&SubscriberData>) -> bool {
        self.permissions
            .require(box_data, subscriber, Permission::BypassVideoDurationLimit)
            .is_ok()
    }

    fn transition(
        &self,
        playlist: &mut Playlist,
        box_data: &BoxData,
        transition: Transition,
        now: DateTime<Utc>,
    ) -> TransitionOutcome {
        let outcome = playlist.transition(transition, &box_data.options, &mut thread_rng(), now);

        if outcome.regenerated {
            info!("Queue of box {} looped", box_data.name);
        }

        outcome
    }

    async fn persist(&self, box_data: &BoxData, playlist: Playlist) -> Result<BoxData, EngineError> {
        Ok(self
            .context
            .database
            .replace_queue(box_data.id, playlist.into_items(), Some(box_data.version))
            .await?)
    }

    /// Debits the berries an action was paid with
    async fn settle(
        &self,
        box_data: &BoxData,
        subscriber: Option<&SubscriberData>,
        charge: Charge,
    ) -> Result<(), EngineError> {
        if let (Charge::Berries(cost), Some(subscriber)) = (charge, subscriber) {
            self.ledger
                .debit(box_data.id, subscriber.user.id, cost)
                .await?;
        }

        Ok(())
    }

    /// Starts the clock of an idle box that has something to play
    fn wake(&self, box_data: &BoxData) {
        let idle = !box_data.playlist.iter().any(|i| i.is_playing());
        let pending = box_data.playlist.iter().any(|i| i.is_upcoming());

        if idle && pending && !self.context.scheduler.is_armed(box_data.id) {
            self.context.scheduler.arm(box_data.id, Duration::ZERO);
        }
    }

    fn arm(&self, box_id: PrimaryKey, outcome: &TransitionOutcome) {
        match &outcome.playing {
            Some(item) => {
                self.context.scheduler.arm(box_id, item.video.length());
            }
            None => self.context.scheduler.cancel(box_id),
        }
    }

    fn publish(
        &self,
        box_data: BoxData,
        feedback: FeedbackMessage,
        sync: Option<SyncPacket>,
    ) -> QueueOutcome {
        self.context.emit(CollabEvent::QueueUpdate {
            box_id: box_data.id,
            items: box_data.playlist.clone(),
            feedback: feedback.clone(),
        });

        if let Some(packet) = &sync {
            self.context.emit(CollabEvent::Sync(packet.clone()));
        }

        QueueOutcome {
            items: box_data.playlist,
            feedback,
            sync,
        }
    }
}

impl<Db, R> Clone for QueueEngine<Db, R> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            permissions: self.permissions.clone(),
            ledger: self.ledger.clone(),
        }
    }
}
