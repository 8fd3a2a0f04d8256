use berrybox_core::{
    authorize, missing_berries, Authorization, BoxData, Permission, PrimaryKey, QueueError,
    SubscriberData,
};

use crate::{CollabContext, Database, EngineError, VideoResolver};

/// How an authorized action is paid for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charge {
    Free,
    Berries(u32),
}

impl Charge {
    pub fn is_paid(&self) -> bool {
        matches!(self, Charge::Berries(_))
    }
}

/// Decides what subscribers are allowed to do in a box, and what it costs them.
pub struct PermissionEvaluator<Db, R> {
    context: CollabContext<Db, R>,
}

impl<Db, R> PermissionEvaluator<Db, R>
where
    Db: Database,
    R: VideoResolver,
{
    pub fn new(context: &CollabContext<Db, R>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Resolves the authorization of a subscriber.
    /// The system and the creator of the box are always allowed.
    pub fn authorize(
        &self,
        box_data: &BoxData,
        subscriber: Option<&SubscriberData>,
        permission: Permission,
    ) -> Authorization {
        let Some(subscriber) = subscriber else {
            return Authorization::Allowed;
        };

        if box_data.is_creator(subscriber.user.id) {
            return Authorization::Allowed;
        }

        authorize(
            subscriber.role,
            &box_data.acl,
            &box_data.options,
            permission,
            &self.context.config.berries_overridable,
        )
    }

    /// Fails unless the permission is granted outright
    pub fn require(
        &self,
        box_data: &BoxData,
        subscriber: Option<&SubscriberData>,
        permission: Permission,
    ) -> Result<(), QueueError> {
        match self.authorize(box_data, subscriber, permission) {
            Authorization::Allowed => Ok(()),
            _ => Err(QueueError::Unauthorized(permission)),
        }
    }

    /// Decides how an action is paid for, checking the balance when berries are needed.
    /// Nothing is debited here.
    pub fn charge(
        &self,
        box_data: &BoxData,
        subscriber: Option<&SubscriberData>,
        permission: Permission,
        cost: u32,
    ) -> Result<Charge, QueueError> {
        match self.authorize(box_data, subscriber, permission) {
            Authorization::Allowed => Ok(Charge::Free),
            Authorization::Denied => Err(QueueError::Unauthorized(permission)),
            Authorization::AllowedViaBerries if cost == 0 => Ok(Charge::Free),
            Authorization::AllowedViaBerries => {
                let balance = subscriber.map(|s| s.berries).unwrap_or_default();

                match missing_berries(balance, cost) {
                    Some(missing) => Err(QueueError::InsufficientBerries { missing }),
                    None => Ok(Charge::Berries(cost)),
                }
            }
        }
    }

    /// Returns the authorization of every permission for a user in a box
    pub async fn summary(
        &self,
        box_id: PrimaryKey,
        user_id: PrimaryKey,
    ) -> Result<Vec<(Permission, Authorization)>, EngineError> {
        let box_data = self.context.database.box_by_id(box_id).await?;
        let subscriber = self.context.subscriber(&box_data, user_id).await?;

        Ok(Permission::ALL
            .into_iter()
            .map(|p| (p, self.authorize(&box_data, Some(&subscriber), p)))
            .collect())
    }
}

impl<Db, R> Clone for PermissionEvaluator<Db, R> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
        }
    }
}

#[cfg(test)]
mod test {
    use berrybox_core::{Authorization, Permission, QueueError, Role};

    use super::Charge;
    use crate::test_support::{setup, with_berries};

    #[tokio::test]
    async fn test_charges() {
        let setup = setup().await;
        let permissions = &setup.collab.permissions;
        let box_data = with_berries(&setup).await;

        let mut guest = setup
            .collab
            .context()
            .subscriber(&box_data, setup.guest.id)
            .await
            .unwrap();
        let creator = setup
            .collab
            .context()
            .subscriber(&box_data, setup.creator.id)
            .await
            .unwrap();

        assert_eq!(creator.role, Role::Admin);
        assert_eq!(
            permissions.charge(&box_data, Some(&creator), Permission::SkipVideo, 30),
            Ok(Charge::Free)
        );
        assert_eq!(
            permissions.charge(&box_data, None, Permission::SkipVideo, 30),
            Ok(Charge::Free)
        );

        guest.berries = 5;
        assert_eq!(
            permissions.charge(&box_data, Some(&guest), Permission::ForceNext, 10),
            Err(QueueError::InsufficientBerries { missing: 5 })
        );

        guest.berries = 10;
        assert_eq!(
            permissions.charge(&box_data, Some(&guest), Permission::ForceNext, 10),
            Ok(Charge::Berries(10))
        );
        assert_eq!(
            permissions.charge(&box_data, Some(&guest), Permission::EditBox, 0),
            Err(QueueError::Unauthorized(Permission::EditBox))
        );
    }

    #[tokio::test]
    async fn test_summary() {
        let setup = setup().await;
        with_berries(&setup).await;

        let summary = setup
            .collab
            .permissions
            .summary(setup.box_data.id, setup.guest.id)
            .await
            .unwrap();

        assert_eq!(summary.len(), Permission::ALL.len());
        assert!(summary.contains(&(Permission::AddVideo, Authorization::Allowed)));
        assert!(summary.contains(&(Permission::SkipVideo, Authorization::AllowedViaBerries)));
        assert!(summary.contains(&(Permission::SetVip, Authorization::Denied)));
    }
}
