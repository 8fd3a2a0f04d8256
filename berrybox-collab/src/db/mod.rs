use async_trait::async_trait;
use berrybox_core::{Acl, BoxData, BoxOptions, PrimaryKey, QueueItem, Role, SubscriberData, UserData, VideoData};
use thiserror::Error;

mod memory;
pub use memory::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: String,
    },
    /// A write was based on an outdated read
    #[error("{resource} was modified concurrently (expected version {expected}, found {found})")]
    Stale {
        resource: &'static str,
        expected: u64,
        found: u64,
    },
}

impl DatabaseError {
    pub fn not_found(resource: &'static str, identifier: impl ToString) -> Self {
        Self::NotFound {
            resource,
            identifier: identifier.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound { .. })
    }
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult {
    /// Turns the Result into a conflict error if it's Ok()
    fn conflict_or_ok(self, resource: &'static str, field: &'static str, value: &str)
        -> Result<()>;
}

impl<T> DatabaseResult for Result<T> {
    fn conflict_or_ok(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<()> {
        match self {
            Ok(_) => Err(DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Represents a type that can store berrybox data.
///
/// Every method is a single atomic operation. Queue writes are checked against
/// the version the caller read, so concurrent writers cannot overwrite each other.
#[async_trait]
pub trait Database
where
    Self: Send + Sync + 'static,
{
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData>;
    async fn create_user(&self, new_user: NewUser) -> Result<UserData>;

    async fn video_by_link(&self, link: &str) -> Result<VideoData>;
    async fn create_video(&self, new_video: NewVideo) -> Result<VideoData>;

    async fn box_by_id(&self, box_id: PrimaryKey) -> Result<BoxData>;
    async fn list_boxes(&self) -> Result<Vec<BoxData>>;
    async fn create_box(&self, new_box: NewBox) -> Result<BoxData>;
    async fn update_box(&self, updated_box: UpdatedBox) -> Result<BoxData>;
    /// Deletes a box along with its queue and subscribers
    async fn delete_box(&self, box_id: PrimaryKey) -> Result<()>;
    /// Replaces the whole queue of a box.
    /// Fails with [DatabaseError::Stale] if `expected_version` is given and no longer matches.
    async fn replace_queue(
        &self,
        box_id: PrimaryKey,
        items: Vec<QueueItem>,
        expected_version: Option<u64>,
    ) -> Result<BoxData>;

    async fn subscriber(&self, box_id: PrimaryKey, user_id: PrimaryKey) -> Result<SubscriberData>;
    async fn create_subscriber(&self, new_subscriber: NewSubscriber) -> Result<SubscriberData>;
    async fn update_subscriber_role(
        &self,
        box_id: PrimaryKey,
        user_id: PrimaryKey,
        role: Role,
    ) -> Result<SubscriberData>;
    /// Adds to the berries of a subscriber, creating a simple subscriber if none exists.
    /// The amount can be negative.
    async fn add_berries(
        &self,
        box_id: PrimaryKey,
        user_id: PrimaryKey,
        amount: i64,
    ) -> Result<SubscriberData>;
}

#[derive(Debug)]
pub struct NewUser {
    pub name: String,
}

#[derive(Debug)]
pub struct NewVideo {
    pub link: String,
    pub name: String,
    pub duration: String,
}

#[derive(Debug)]
pub struct NewBox {
    pub name: String,
    pub private: bool,
    pub options: BoxOptions,
    /// The creator of the new box
    pub user_id: PrimaryKey,
}

#[derive(Debug, Default)]
pub struct UpdatedBox {
    pub id: PrimaryKey,
    pub name: Option<String>,
    pub open: Option<bool>,
    pub private: Option<bool>,
    pub options: Option<BoxOptions>,
    pub acl: Option<Acl>,
}

#[derive(Debug)]
pub struct NewSubscriber {
    pub box_id: PrimaryKey,
    pub user_id: PrimaryKey,
    pub role: Role,
}
