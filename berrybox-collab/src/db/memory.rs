use async_trait::async_trait;
use berrybox_core::{
    Acl, BoxData, PrimaryKey, QueueItem, Role, SubscriberData, UserData, VideoData,
};
use crossbeam::atomic::AtomicCell;
use dashmap::DashMap;

use super::{
    Database, DatabaseError, DatabaseResult, NewBox, NewSubscriber, NewUser, NewVideo, Result,
    UpdatedBox,
};

/// A [Database] that keeps everything in memory.
/// Used when running without persistence, and in tests.
#[derive(Default)]
pub struct MemoryDatabase {
    counter: AtomicCell<PrimaryKey>,

    users: DashMap<PrimaryKey, UserData>,
    videos: DashMap<PrimaryKey, VideoData>,
    boxes: DashMap<PrimaryKey, BoxData>,
    subscribers: DashMap<(PrimaryKey, PrimaryKey), SubscriberData>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_key(&self) -> PrimaryKey {
        self.counter.fetch_add(1) + 1
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        self.users
            .get(&user_id)
            .map(|u| u.clone())
            .ok_or_else(|| DatabaseError::not_found("user", user_id))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        let user = UserData {
            id: self.next_key(),
            name: new_user.name,
        };

        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn video_by_link(&self, link: &str) -> Result<VideoData> {
        self.videos
            .iter()
            .find(|v| v.link == link)
            .map(|v| v.clone())
            .ok_or_else(|| DatabaseError::not_found("video", link))
    }

    async fn create_video(&self, new_video: NewVideo) -> Result<VideoData> {
        self.video_by_link(&new_video.link)
            .await
            .conflict_or_ok("video", "link", &new_video.link)?;

        let video = VideoData {
            id: self.next_key(),
            link: new_video.link,
            name: new_video.name,
            duration: new_video.duration,
        };

        self.videos.insert(video.id, video.clone());
        Ok(video)
    }

    async fn box_by_id(&self, box_id: PrimaryKey) -> Result<BoxData> {
        self.boxes
            .get(&box_id)
            .map(|b| b.clone())
            .ok_or_else(|| DatabaseError::not_found("box", box_id))
    }

    async fn list_boxes(&self) -> Result<Vec<BoxData>> {
        let mut boxes: Vec<_> = self.boxes.iter().map(|b| b.clone()).collect();
        boxes.sort_by_key(|b| b.id);

        Ok(boxes)
    }

    async fn create_box(&self, new_box: NewBox) -> Result<BoxData> {
        let creator = self.user_by_id(new_box.user_id).await?;

        let box_data = BoxData {
            id: self.next_key(),
            name: new_box.name,
            creator,
            open: true,
            private: new_box.private,
            options: new_box.options,
            acl: Acl::default(),
            playlist: vec![],
            version: 0,
        };

        self.boxes.insert(box_data.id, box_data.clone());
        Ok(box_data)
    }

    async fn update_box(&self, updated_box: UpdatedBox) -> Result<BoxData> {
        let mut box_data = self
            .boxes
            .get_mut(&updated_box.id)
            .ok_or_else(|| DatabaseError::not_found("box", updated_box.id))?;

        if let Some(name) = updated_box.name {
            box_data.name = name;
        }
        if let Some(open) = updated_box.open {
            box_data.open = open;
        }
        if let Some(private) = updated_box.private {
            box_data.private = private;
        }
        if let Some(options) = updated_box.options {
            box_data.options = options;
        }
        if let Some(acl) = updated_box.acl {
            box_data.acl = acl;
        }

        Ok(box_data.clone())
    }

    async fn delete_box(&self, box_id: PrimaryKey) -> Result<()> {
        self.boxes
            .remove(&box_id)
            .ok_or_else(|| DatabaseError::not_found("box", box_id))?;

        self.subscribers.retain(|(id, _), _| *id != box_id);
        Ok(())
    }

    async fn replace_queue(
        &self,
        box_id: PrimaryKey,
        items: Vec<QueueItem>,
        expected_version: Option<u64>,
    ) -> Result<BoxData> {
        let mut box_data = self
            .boxes
            .get_mut(&box_id)
            .ok_or_else(|| DatabaseError::not_found("box", box_id))?;

        if let Some(expected) = expected_version {
            if box_data.version != expected {
                return Err(DatabaseError::Stale {
                    resource: "box",
                    expected,
                    found: box_data.version,
                });
            }
        }

        box_data.playlist = items;
        box_data.version += 1;

        Ok(box_data.clone())
    }

    async fn subscriber(&self, box_id: PrimaryKey, user_id: PrimaryKey) -> Result<SubscriberData> {
        self.subscribers
            .get(&(box_id, user_id))
            .map(|s| s.clone())
            .ok_or_else(|| DatabaseError::not_found("subscriber", format!("{box_id}/{user_id}")))
    }

    async fn create_subscriber(&self, new_subscriber: NewSubscriber) -> Result<SubscriberData> {
        let NewSubscriber {
            box_id,
            user_id,
            role,
        } = new_subscriber;

        self.box_by_id(box_id).await?;
        let user = self.user_by_id(user_id).await?;

        let subscriber = self
            .subscribers
            .entry((box_id, user_id))
            .or_insert_with(|| SubscriberData {
                box_id,
                user,
                role,
                berries: 0,
            });

        Ok(subscriber.clone())
    }

    async fn update_subscriber_role(
        &self,
        box_id: PrimaryKey,
        user_id: PrimaryKey,
        role: Role,
    ) -> Result<SubscriberData> {
        let mut subscriber = self
            .subscribers
            .get_mut(&(box_id, user_id))
            .ok_or_else(|| DatabaseError::not_found("subscriber", format!("{box_id}/{user_id}")))?;

        subscriber.role = role;
        Ok(subscriber.clone())
    }

    async fn add_berries(
        &self,
        box_id: PrimaryKey,
        user_id: PrimaryKey,
        amount: i64,
    ) -> Result<SubscriberData> {
        self.box_by_id(box_id).await?;
        let user = self.user_by_id(user_id).await?;

        let mut subscriber = self
            .subscribers
            .entry((box_id, user_id))
            .or_insert_with(|| SubscriberData {
                box_id,
                user,
                role: Role::Simple,
                berries: 0,
            });

        subscriber.berries += amount;
        Ok(subscriber.clone())
    }
}
