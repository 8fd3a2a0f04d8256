mod boxes;
mod db;
mod events;
mod input;
mod ledger;
mod permissions;
mod scheduler;
mod util;

use std::{sync::Arc, time::Duration};

use berrybox_core::{BoxData, Config, PrimaryKey, Role, SubscriberData};
use crossbeam::channel::unbounded;
use log::{error, warn};

pub use boxes::*;
pub use db::*;
pub use events::*;
pub use input::*;
pub use ledger::*;
pub use permissions::*;
pub use scheduler::*;

/// The berrybox collab system, facilitating boxes, their queues, and the berries economy.
pub struct Collab<Db, R> {
    context: CollabContext<Db, R>,
    event_receiver: EventReceiver,

    pub boxes: BoxManager<Db, R>,
    pub queue: QueueEngine<Db, R>,
    pub ledger: Ledger<Db, R>,
    pub permissions: PermissionEvaluator<Db, R>,
}

/// A type passed to various components of the collab system, to access state and emit events.
pub struct CollabContext<Db, R> {
    pub config: Config,
    pub database: Arc<Db>,
    pub resolver: Arc<R>,

    pub scheduler: TransitionScheduler,
    pub locks: BoxLocks,

    event_sender: EventSender,
}

impl<Db, R> Collab<Db, R>
where
    Db: Database,
    R: VideoResolver,
{
    /// Creates the collab system and starts handling transition timers.
    /// Must be called within a tokio runtime.
    pub fn new(config: Config, database: Db, resolver: R) -> Self {
        let (collab, job_receiver) = Self::without_handler(config, database, resolver);
        spawn_transition_handler(collab.queue.clone(), job_receiver);

        collab
    }

    /// Creates the collab system without handling transition timers.
    /// The caller is responsible for passing fired jobs to [QueueEngine::natural_transition].
    pub fn without_handler(config: Config, database: Db, resolver: R) -> (Self, JobReceiver) {
        let (event_sender, event_receiver) = unbounded();
        let (scheduler, job_receiver) = TransitionScheduler::new();

        let context = CollabContext {
            config,
            database: Arc::new(database),
            resolver: Arc::new(resolver),
            scheduler,
            locks: Default::default(),
            event_sender,
        };

        let collab = Self {
            boxes: BoxManager::new(&context),
            queue: QueueEngine::new(&context),
            ledger: Ledger::new(&context),
            permissions: PermissionEvaluator::new(&context),
            event_receiver,
            context,
        };

        (collab, job_receiver)
    }

    pub fn context(&self) -> &CollabContext<Db, R> {
        &self.context
    }

    /// Waits for the next event. Returns [None] once the system is gone.
    pub fn wait_for_event(&self) -> Option<CollabEvent> {
        self.event_receiver.recv().ok()
    }

    /// Receives an event if one is pending
    pub fn try_event(&self) -> Option<CollabEvent> {
        self.event_receiver.try_recv().ok()
    }
}

impl<Db, R> CollabContext<Db, R>
where
    Db: Database,
    R: VideoResolver,
{
    pub fn emit(&self, event: CollabEvent) {
        if self.event_sender.send(event).is_err() {
            warn!("Event was emitted with no receiver");
        }
    }

    /// Returns the subscriber of a user in a box, subscribing them on first access.
    /// The creator of the box joins as an admin.
    pub async fn subscriber(
        &self,
        box_data: &BoxData,
        user_id: PrimaryKey,
    ) -> Result<SubscriberData> {
        match self.database.subscriber(box_data.id, user_id).await {
            Err(e) if e.is_not_found() => {
                let role = if box_data.is_creator(user_id) {
                    Role::Admin
                } else {
                    Role::Simple
                };

                self.database
                    .create_subscriber(NewSubscriber {
                        box_id: box_data.id,
                        user_id,
                        role,
                    })
                    .await
            }
            result => result,
        }
    }
}

impl<Db, R> Clone for CollabContext<Db, R> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            database: self.database.clone(),
            resolver: self.resolver.clone(),
            scheduler: self.scheduler.clone(),
            locks: self.locks.clone(),
            event_sender: self.event_sender.clone(),
        }
    }
}

/// Runs natural transitions as their timers fire.
/// Failed transitions are retried a few times before the job is dropped.
fn spawn_transition_handler<Db, R>(queue: QueueEngine<Db, R>, mut job_receiver: JobReceiver)
where
    Db: Database,
    R: VideoResolver,
{
    tokio::spawn(async move {
        while let Some(job) = job_receiver.recv().await {
            let queue = queue.clone();

            tokio::spawn(async move {
                let config = &queue.context().config;
                let attempts = config.transition_attempts.max(1);
                let delay = Duration::try_from_secs_f32(config.transition_retry_delay_in_seconds)
                    .unwrap_or_default();

                for attempt in 1..=attempts {
                    match queue.natural_transition(job).await {
                        Ok(_) => return,
                        Err(e) => {
                            warn!(
                                "Transition of box {} failed (attempt {}/{}): {}",
                                job.box_id, attempt, attempts, e
                            );

                            if attempt < attempts {
                                tokio::time::sleep(delay).await;
                            }
                        }
                    }
                }

                error!(
                    "Dropped transition of box {} after {} attempts",
                    job.box_id, attempts
                );
            });
        }
    });
}

#[cfg(test)]
mod test_support;
