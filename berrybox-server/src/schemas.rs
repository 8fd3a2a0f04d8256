//! Request bodies accepted by endpoints, and their validation

use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    Json,
};
use berrybox_collab::QueueRequest;
use berrybox_core::{Acl, BoxOptions, Permission, QueueItemId, Role};
use serde::{de::DeserializeOwned, Deserialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::errors::ServerError;

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewUserSchema {
    #[validate(length(min = 2, max = 64))]
    pub name: String,
}

#[derive(Debug, Clone, Default, ToSchema, Validate, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoxOptionsSchema {
    pub random: bool,
    pub loop_queue: bool,
    pub berries: bool,
    /// In minutes, 0 disables the limit
    #[validate(range(max = 1440))]
    pub video_max_duration: u32,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewBoxSchema {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    #[validate(nested)]
    pub options: BoxOptionsSchema,
}

/// Permission names per role. Admins always have every permission.
#[derive(Debug, ToSchema, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AclSchema {
    pub moderator: Vec<String>,
    pub vip: Vec<String>,
    pub simple: Vec<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateBoxSchema {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub open: Option<bool>,
    pub private: Option<bool>,
    #[validate(nested)]
    pub options: Option<BoxOptionsSchema>,
    pub acl: Option<AclSchema>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitVideoSchema {
    #[validate(length(min = 1, max = 2048))]
    pub link: String,
}

#[derive(Debug, ToSchema, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum QueueActionSchema {
    /// Add a video by link
    Submit { link: String },
    /// Remove an item from the queue
    Cancel { item_id: u64 },
    /// Play an item next, or unselect it
    Preselect { item_id: u64 },
    /// Play an item right now
    ForcePlay { item_id: u64 },
    /// End the playing item
    Skip,
}

/// Berries given by an admin of the box
#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreditSchema {
    /// The user to credit, defaults to the acting user
    pub user_id: Option<u32>,
    /// A fixed amount. Without it, a random gain is rolled.
    #[validate(range(min = 1, max = 1000))]
    pub amount: Option<u32>,
}

#[derive(Debug, Clone, Copy, ToSchema, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleName {
    Admin,
    Moderator,
    Vip,
    Simple,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetRoleSchema {
    pub role: RoleName,
}

impl Validate for QueueActionSchema {
    fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            Self::Submit { link } => SubmitVideoSchema { link: link.clone() }.validate(),
            _ => Ok(()),
        }
    }
}

impl From<QueueActionSchema> for QueueRequest {
    fn from(value: QueueActionSchema) -> Self {
        let item = QueueItemId::from_value;

        match value {
            QueueActionSchema::Submit { link } => Self::Submit { link },
            QueueActionSchema::Cancel { item_id } => Self::Cancel {
                item_id: item(item_id),
            },
            QueueActionSchema::Preselect { item_id } => Self::Preselect {
                item_id: item(item_id),
            },
            QueueActionSchema::ForcePlay { item_id } => Self::ForcePlay {
                item_id: item(item_id),
            },
            QueueActionSchema::Skip => Self::Skip,
        }
    }
}

impl From<BoxOptionsSchema> for BoxOptions {
    fn from(value: BoxOptionsSchema) -> Self {
        Self {
            random: value.random,
            loop_queue: value.loop_queue,
            berries: value.berries,
            video_max_duration: value.video_max_duration,
        }
    }
}

impl TryFrom<AclSchema> for Acl {
    type Error = ServerError;

    fn try_from(value: AclSchema) -> Result<Self, Self::Error> {
        let parse = |names: Vec<String>| {
            names
                .iter()
                .map(|name| name.parse::<Permission>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(ServerError::BadRequest)
        };

        Ok(Self {
            moderator: parse(value.moderator)?,
            vip: parse(value.vip)?,
            simple: parse(value.simple)?,
        })
    }
}

impl From<RoleName> for Role {
    fn from(value: RoleName) -> Self {
        match value {
            RoleName::Admin => Self::Admin,
            RoleName::Moderator => Self::Moderator,
            RoleName::Vip => Self::Vip,
            RoleName::Simple => Self::Simple,
        }
    }
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = (StatusCode, String);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, e.body_text()))?;

        extracted_json
            .0
            .validate()
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("Request body is invalid: {}", e)))?;

        Ok(Self(extracted_json.0))
    }
}

#[cfg(test)]
mod test {
    use berrybox_collab::QueueRequest;
    use berrybox_core::{Acl, Permission, QueueItemId};
    use validator::Validate;

    use super::{AclSchema, NewBoxSchema, QueueActionSchema};

    #[test]
    fn test_queue_actions() {
        let action: QueueActionSchema =
            serde_json::from_str(r#"{ "type": "force-play", "item_id": 12 }"#).unwrap();
        assert_eq!(
            QueueRequest::from(action),
            QueueRequest::ForcePlay {
                item_id: QueueItemId::from_value(12)
            }
        );

        let action: QueueActionSchema = serde_json::from_str(r#"{ "type": "skip" }"#).unwrap();
        assert_eq!(QueueRequest::from(action), QueueRequest::Skip);

        let action: QueueActionSchema =
            serde_json::from_str(r#"{ "type": "submit", "link": "" }"#).unwrap();
        assert!(action.validate().is_err());

        assert!(serde_json::from_str::<QueueActionSchema>(r#"{ "type": "rewind" }"#).is_err());
    }

    #[test]
    fn test_box_defaults() {
        let schema: NewBoxSchema = serde_json::from_str(r#"{ "name": "Cerulean" }"#).unwrap();

        assert!(schema.validate().is_ok());
        assert!(!schema.private);
        assert_eq!(schema.options.video_max_duration, 0);

        let schema: NewBoxSchema = serde_json::from_str(
            r#"{ "name": "Cerulean", "options": { "video_max_duration": 5000 } }"#,
        )
        .unwrap();
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_acl() {
        let acl = Acl::try_from(AclSchema {
            moderator: vec!["skipVideo".to_string(), "setVIP".to_string()],
            vip: vec!["forceNext".to_string()],
            simple: vec![],
        })
        .unwrap();

        assert_eq!(acl.moderator, vec![Permission::SkipVideo, Permission::SetVip]);

        let result = Acl::try_from(AclSchema {
            moderator: vec!["fly".to_string()],
            vip: vec![],
            simple: vec![],
        });
        assert!(result.is_err());
    }
}
