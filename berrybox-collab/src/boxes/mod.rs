mod engine;
mod request;

use std::{sync::Arc, time::Duration};

use berrybox_core::{BoxData, Permission, PrimaryKey, QueueError, Role, SubscriberData};
use chrono::Utc;
use dashmap::DashMap;
use log::info;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    CollabContext, CollabEvent, Database, Ledger, NewBox, PermissionEvaluator, UpdatedBox,
    VideoResolver,
};

pub use engine::*;
pub use request::*;

/// One async lock per box, held while its queue is read, changed, and written back.
#[derive(Clone, Default)]
pub struct BoxLocks {
    locks: Arc<DashMap<PrimaryKey, Arc<Mutex<()>>>>,
}

impl BoxLocks {
    pub async fn acquire(&self, box_id: PrimaryKey) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(box_id).or_default().clone();
        lock.lock_owned().await
    }

    pub fn remove(&self, box_id: PrimaryKey) {
        self.locks.remove(&box_id);
    }
}

/// Creates, configures, and deletes boxes, and manages their subscribers.
pub struct BoxManager<Db, R> {
    context: CollabContext<Db, R>,
    permissions: PermissionEvaluator<Db, R>,
    ledger: Ledger<Db, R>,
}

impl<Db, R> BoxManager<Db, R>
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

    /// Re-arms the timers of open boxes on startup
    pub async fn restore(&self) -> Result<(), EngineError> {
        let boxes = self.context.database.list_boxes().await?;
        let mut restored = 0;

        for box_data in boxes.iter().filter(|b| b.open) {
            if self.restore_timer(box_data) {
                restored += 1;
            }
        }

        info!("Restored {} of {} boxes", restored, boxes.len());
        Ok(())
    }

    /// Creates a new box. The creator subscribes to it as an admin.
    pub async fn create_box(&self, new_box: NewBox) -> Result<BoxData, EngineError> {
        let box_data = self.context.database.create_box(new_box).await?;
        self.context.subscriber(&box_data, box_data.creator.id).await?;

        info!("Box {} created by {}", box_data.name, box_data.creator.name);

        self.context.emit(CollabEvent::BoxUpdate {
            box_id: box_data.id,
            data: box_data.clone(),
        });

        Ok(box_data)
    }

    pub async fn get(&self, box_id: PrimaryKey) -> Result<BoxData, EngineError> {
        Ok(self.context.database.box_by_id(box_id).await?)
    }

    pub async fn list(&self) -> Result<Vec<BoxData>, EngineError> {
        Ok(self.context.database.list_boxes().await?)
    }

    /// Changes the settings of a box. Closing a box stops its playback clock,
    /// opening it again resumes from where the playing item is.
    pub async fn update_box(
        &self,
        user_id: PrimaryKey,
        updated_box: UpdatedBox,
    ) -> Result<BoxData, EngineError> {
        let _guard = self.context.locks.acquire(updated_box.id).await;

        let box_data = self.context.database.box_by_id(updated_box.id).await?;
        let subscriber = self.context.subscriber(&box_data, user_id).await?;

        self.permissions
            .require(&box_data, Some(&subscriber), Permission::EditBox)?;

        let was_open = box_data.open;
        let box_data = self.context.database.update_box(updated_box).await?;

        match (was_open, box_data.open) {
            (true, false) => {
                info!("Box {} closed", box_data.name);
                self.context.scheduler.cancel(box_data.id);
            }
            (false, true) => {
                info!("Box {} opened", box_data.name);
                self.restore_timer(&box_data);
            }
            _ => {}
        }

        self.context.emit(CollabEvent::BoxUpdate {
            box_id: box_data.id,
            data: box_data.clone(),
        });

        Ok(box_data)
    }

    /// Deletes a box. Only its creator can do this.
    pub async fn delete_box(&self, box_id: PrimaryKey, user_id: PrimaryKey) -> Result<(), EngineError> {
        let guard = self.context.locks.acquire(box_id).await;
        let box_data = self.context.database.box_by_id(box_id).await?;

        if !box_data.is_creator(user_id) {
            return Err(QueueError::Unauthorized(Permission::EditBox).into());
        }

        self.context.scheduler.cancel(box_id);
        self.context.database.delete_box(box_id).await?;

        drop(guard);
        self.context.locks.remove(box_id);

        info!("Box {} deleted", box_data.name);
        self.context.emit(CollabEvent::BoxDeleted { box_id });

        Ok(())
    }

    /// Returns the subscriber of the user, subscribing them if this is their first visit
    pub async fn join(&self, box_id: PrimaryKey, user_id: PrimaryKey) -> Result<SubscriberData, EngineError> {
        let box_data = self.context.database.box_by_id(box_id).await?;
        Ok(self.context.subscriber(&box_data, user_id).await?)
    }

    /// Changes the role of a subscriber.
    ///
    /// Moving between simple and vip needs the matching permission. Only admins
    /// can promote to, or demote from, moderator and admin. The creator keeps their role.
    pub async fn set_role(
        &self,
        box_id: PrimaryKey,
        actor_id: PrimaryKey,
        target_id: PrimaryKey,
        role: Role,
    ) -> Result<SubscriberData, EngineError> {
        let box_data = self.context.database.box_by_id(box_id).await?;
        let actor = self.context.subscriber(&box_data, actor_id).await?;
        let target = self.context.subscriber(&box_data, target_id).await?;

        let permission = match role {
            Role::Simple => Permission::UnsetVip,
            _ => Permission::SetVip,
        };

        if box_data.is_creator(target_id) {
            return Err(QueueError::Unauthorized(permission).into());
        }

        let privileged = |r: Role| matches!(r, Role::Admin | Role::Moderator);

        if (privileged(role) || privileged(target.role)) && actor.role != Role::Admin {
            return Err(QueueError::Unauthorized(permission).into());
        }

        self.permissions
            .require(&box_data, Some(&actor), permission)?;

        let subscriber = self
            .context
            .database
            .update_subscriber_role(box_id, target_id, role)
            .await?;

        info!(
            "{} is now {} in box {}",
            subscriber.user.name, role, box_data.name
        );

        Ok(subscriber)
    }

    /// Gives berries to a subscriber and returns their new balance.
    /// Only admins can do this. Without an amount, a random gain is rolled.
    pub async fn grant_berries(
        &self,
        box_id: PrimaryKey,
        actor_id: PrimaryKey,
        target_id: PrimaryKey,
        amount: Option<u32>,
    ) -> Result<i64, EngineError> {
        let box_data = self.context.database.box_by_id(box_id).await?;
        let actor = self.context.subscriber(&box_data, actor_id).await?;

        if actor.role != Role::Admin {
            return Err(QueueError::Unauthorized(Permission::EditBox).into());
        }

        self.context.subscriber(&box_data, target_id).await?;
        let berries = self.ledger.credit(box_id, target_id, amount).await?;

        info!(
            "{} gave berries to user {} in box {}",
            actor.user.name, target_id, box_data.name
        );

        Ok(berries)
    }

    /// Arms the timer of an open box from the state of its queue.
    /// Returns false if there is nothing to play.
    fn restore_timer(&self, box_data: &BoxData) -> bool {
        let now = Utc::now();

        if let Some(playing) = box_data.playlist.iter().find(|i| i.is_playing()) {
            let elapsed = playing.elapsed(now).unwrap_or_default();
            let remaining = playing.video.length().saturating_sub(elapsed);

            self.context.scheduler.arm(box_data.id, remaining);
            return true;
        }

        if box_data.playlist.iter().any(|i| i.is_upcoming()) {
            self.context.scheduler.arm(box_data.id, Duration::ZERO);
            return true;
        }

        false
    }
}
