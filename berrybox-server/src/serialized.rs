//! All schemas that are exposed from endpoints are defined here
//! along with the From<T> impls

use berrybox_collab::{QueueOutcome, SyncPacket as CollabSyncPacket};
use berrybox_core::{
    Acl as CoreAcl, Authorization, BoxData, BoxOptions as CoreBoxOptions, FeedbackContext,
    FeedbackMessage, Permission, QueueItem as CoreQueueItem, QueueItemState, SubscriberData,
    UserData, VideoData,
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct User {
    id: u32,
    name: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Video {
    id: u32,
    link: String,
    name: String,
    /// ISO 8601 duration
    duration: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QueueItem {
    id: u64,
    video: Video,
    state: String,
    submitter: Option<User>,
    /// RFC 3339 timestamps
    submitted_at: String,
    start_time: Option<String>,
    end_time: Option<String>,
    is_preselected: bool,
    state_forced_with_berries: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BoxOptions {
    random: bool,
    loop_queue: bool,
    berries: bool,
    video_max_duration: u32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Acl {
    moderator: Vec<String>,
    vip: Vec<String>,
    simple: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BoxInfo {
    id: u32,
    name: String,
    creator: User,
    open: bool,
    private: bool,
    options: BoxOptions,
    acl: Acl,
    playlist: Vec<QueueItem>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Subscriber {
    box_id: u32,
    user: User,
    role: String,
    berries: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Feedback {
    /// Either "info", or "berries" when the action was paid for
    context: String,
    contents: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SyncPacket {
    item: Option<QueueItem>,
    /// Playback offset in seconds
    offset: f32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QueueUpdate {
    items: Vec<QueueItem>,
    feedback: Feedback,
    sync: Option<SyncPacket>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PermissionGrant {
    permission: String,
    /// One of `allowed`, `denied` and `berries`
    authorization: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Balance {
    user_id: u32,
    berries: i64,
}

impl Balance {
    pub fn new(user_id: u32, berries: i64) -> Self {
        Self { user_id, berries }
    }
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl<I, O> ToSerialized<Option<O>> for Option<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Option<O> {
        self.as_ref().map(|x| x.to_serialized())
    }
}

impl ToSerialized<User> for UserData {
    fn to_serialized(&self) -> User {
        User {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

impl ToSerialized<Video> for VideoData {
    fn to_serialized(&self) -> Video {
        Video {
            id: self.id,
            link: self.link.clone(),
            name: self.name.clone(),
            duration: self.duration.clone(),
        }
    }
}

impl ToSerialized<QueueItem> for CoreQueueItem {
    fn to_serialized(&self) -> QueueItem {
        let state = match self.state() {
            QueueItemState::Upcoming => "upcoming",
            QueueItemState::Playing => "playing",
            QueueItemState::Played => "played",
        };

        QueueItem {
            id: self.id.value(),
            video: self.video.to_serialized(),
            state: state.to_string(),
            submitter: self.submitter.to_serialized(),
            submitted_at: self.submitted_at.to_rfc3339(),
            start_time: self.start_time.map(|t| t.to_rfc3339()),
            end_time: self.end_time.map(|t| t.to_rfc3339()),
            is_preselected: self.is_preselected,
            state_forced_with_berries: self.state_forced_with_berries,
        }
    }
}

impl ToSerialized<BoxOptions> for CoreBoxOptions {
    fn to_serialized(&self) -> BoxOptions {
        BoxOptions {
            random: self.random,
            loop_queue: self.loop_queue,
            berries: self.berries,
            video_max_duration: self.video_max_duration,
        }
    }
}

impl ToSerialized<Acl> for CoreAcl {
    fn to_serialized(&self) -> Acl {
        let names = |permissions: &[Permission]| {
            permissions.iter().map(|p| p.as_str().to_string()).collect::<Vec<_>>()
        };

        Acl {
            moderator: names(&self.moderator),
            vip: names(&self.vip),
            simple: names(&self.simple),
        }
    }
}

impl ToSerialized<BoxInfo> for BoxData {
    fn to_serialized(&self) -> BoxInfo {
        BoxInfo {
            id: self.id,
            name: self.name.clone(),
            creator: self.creator.to_serialized(),
            open: self.open,
            private: self.private,
            options: self.options.to_serialized(),
            acl: self.acl.to_serialized(),
            playlist: self.playlist.to_serialized(),
        }
    }
}

impl ToSerialized<Subscriber> for SubscriberData {
    fn to_serialized(&self) -> Subscriber {
        Subscriber {
            box_id: self.box_id,
            user: self.user.to_serialized(),
            role: self.role.to_string(),
            berries: self.berries,
        }
    }
}

impl ToSerialized<Feedback> for FeedbackMessage {
    fn to_serialized(&self) -> Feedback {
        let context = match self.context {
            FeedbackContext::Info => "info",
            FeedbackContext::Berries => "berries",
        };

        Feedback {
            context: context.to_string(),
            contents: self.contents.clone(),
        }
    }
}

impl ToSerialized<SyncPacket> for CollabSyncPacket {
    fn to_serialized(&self) -> SyncPacket {
        SyncPacket {
            item: self.item.to_serialized(),
            offset: self.offset,
        }
    }
}

impl ToSerialized<QueueUpdate> for QueueOutcome {
    fn to_serialized(&self) -> QueueUpdate {
        QueueUpdate {
            items: self.items.to_serialized(),
            feedback: self.feedback.to_serialized(),
            sync: self.sync.to_serialized(),
        }
    }
}

impl ToSerialized<PermissionGrant> for (Permission, Authorization) {
    fn to_serialized(&self) -> PermissionGrant {
        let (permission, authorization) = self;

        let authorization = match authorization {
            Authorization::Allowed => "allowed",
            Authorization::Denied => "denied",
            Authorization::AllowedViaBerries => "berries",
        };

        PermissionGrant {
            permission: permission.as_str().to_string(),
            authorization: authorization.to_string(),
        }
    }
}

#[cfg(test)]
mod test {
    use berrybox_core::FeedbackMessage;
    use serde_json::json;

    use super::ToSerialized;

    #[test]
    fn test_feedback_contexts() {
        let free = FeedbackMessage::info("Skipped").with_berries(false);
        let paid = FeedbackMessage::info("Skipped").with_berries(true);

        assert_eq!(
            serde_json::to_value(free.to_serialized()).unwrap(),
            json!({ "context": "info", "contents": "Skipped" })
        );
        assert_eq!(
            serde_json::to_value(paid.to_serialized()).unwrap(),
            json!({ "context": "berries", "contents": "Skipped" })
        );
    }
}
