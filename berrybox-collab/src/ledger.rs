use berrybox_core::{roll_gain, PrimaryKey};
use log::debug;
use rand::thread_rng;

use crate::{CollabContext, CollabEvent, Database, DatabaseError, VideoResolver};

/// Keeps the berries balance of every subscriber.
pub struct Ledger<Db, R> {
    context: CollabContext<Db, R>,
}

impl<Db, R> Ledger<Db, R>
where
    Db: Database,
    R: VideoResolver,
{
    pub fn new(context: &CollabContext<Db, R>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Adds berries to a subscriber and returns the new balance.
    /// Without an amount, a random gain is rolled.
    pub async fn credit(
        &self,
        box_id: PrimaryKey,
        user_id: PrimaryKey,
        amount: Option<u32>,
    ) -> Result<i64, DatabaseError> {
        let amount =
            amount.unwrap_or_else(|| roll_gain(&self.context.config.gain_table, &mut thread_rng()));

        self.change(box_id, user_id, amount as i64).await
    }

    /// Removes berries from a subscriber and returns the new balance.
    /// The balance can go negative, callers check it beforehand.
    pub async fn debit(
        &self,
        box_id: PrimaryKey,
        user_id: PrimaryKey,
        amount: u32,
    ) -> Result<i64, DatabaseError> {
        self.change(box_id, user_id, -(amount as i64)).await
    }

    /// Returns the balance of a user in a box, which is zero if they never joined it
    pub async fn balance(&self, box_id: PrimaryKey, user_id: PrimaryKey) -> Result<i64, DatabaseError> {
        match self.context.database.subscriber(box_id, user_id).await {
            Ok(subscriber) => Ok(subscriber.berries),
            Err(e) if e.is_not_found() => Ok(0),
            Err(e) => Err(e),
        }
    }

    async fn change(
        &self,
        box_id: PrimaryKey,
        user_id: PrimaryKey,
        amount: i64,
    ) -> Result<i64, DatabaseError> {
        let subscriber = self
            .context
            .database
            .add_berries(box_id, user_id, amount)
            .await?;

        debug!(
            "Berries of user {} in box {} changed by {} to {}",
            user_id, box_id, amount, subscriber.berries
        );

        self.context.emit(CollabEvent::BerriesUpdate {
            box_id,
            user_id,
            berries: subscriber.berries,
        });

        Ok(subscriber.berries)
    }
}

impl<Db, R> Clone for Ledger<Db, R> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
        }
    }
}
