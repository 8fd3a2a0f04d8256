use axum::{response::IntoResponse, Json};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};

use crate::{
    actor::ACTOR_HEADER,
    boxes, schemas, serialized, sse, users,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        boxes::list_boxes,
        boxes::create_box,
        boxes::get_box,
        boxes::update_box,
        boxes::delete_box,
        boxes::queue,
        boxes::queue_action,
        boxes::permissions,
        boxes::credit_berries,
        boxes::set_role,
        users::create_user,
        users::user,
        sse::event_stream,
    ),
    components(schemas(
        schemas::NewUserSchema,
        schemas::NewBoxSchema,
        schemas::BoxOptionsSchema,
        schemas::UpdateBoxSchema,
        schemas::AclSchema,
        schemas::QueueActionSchema,
        schemas::CreditSchema,
        schemas::SetRoleSchema,
        schemas::RoleName,
        serialized::User,
        serialized::Video,
        serialized::QueueItem,
        serialized::BoxOptions,
        serialized::Acl,
        serialized::BoxInfo,
        serialized::Subscriber,
        serialized::Feedback,
        serialized::SyncPacket,
        serialized::QueueUpdate,
        serialized::PermissionGrant,
        serialized::Balance,
        sse::ServerEvent,
    )),
    modifiers(&Security),
    info(
        description = "berrybox-server exposes endpoints to interact with the boxes of this berrybox instance"
    )
)]
pub struct ApiDoc;

struct Security;

impl Modify for Security {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            let scheme = ApiKey::Header(ApiKeyValue::with_description(
                ACTOR_HEADER,
                "The id of the acting user",
            ));

            components.add_security_scheme("UserHeader", SecurityScheme::ApiKey(scheme))
        }
    }
}

pub async fn docs() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod test {
    use utoipa::OpenApi;

    use super::ApiDoc;

    #[test]
    fn test_documents_every_route() {
        let api = ApiDoc::openapi();
        let paths = &api.paths.paths;

        for path in [
            "/v1/boxes",
            "/v1/boxes/{id}",
            "/v1/boxes/{id}/queue",
            "/v1/boxes/{id}/permissions",
            "/v1/boxes/{id}/berries",
            "/v1/boxes/{id}/subscribers/{user_id}",
            "/v1/users",
            "/v1/users/{id}",
            "/v1/events",
        ] {
            assert!(paths.contains_key(path), "{} is documented", path);
        }

        let components = api.components.unwrap();
        assert!(components.security_schemes.contains_key("UserHeader"));
    }
}
