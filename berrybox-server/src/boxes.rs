use axum::{
    extract::Path,
    routing::{get, post, put},
    Json,
};
use berrybox_collab::{NewBox, UpdatedBox};
use berrybox_core::Acl;

use crate::{
    actor::Actor,
    context::ServerContext,
    errors::{ServerError, ServerResult},
    schemas::{
        CreditSchema, NewBoxSchema, QueueActionSchema, SetRoleSchema, UpdateBoxSchema,
        ValidatedJson,
    },
    serialized::{
        Balance, BoxInfo, PermissionGrant, QueueItem, QueueUpdate, Subscriber, ToSerialized,
    },
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/boxes",
    tag = "boxes",
    security(
        ("UserHeader" = [])
    ),
    responses(
        (status = 200, body = Vec<BoxInfo>, description = "Public boxes, and private boxes created by the user")
    )
)]
pub async fn list_boxes(Actor(user): Actor, context: ServerContext) -> ServerResult<Json<Vec<BoxInfo>>> {
    let boxes: Vec<_> = context
        .collab
        .boxes
        .list()
        .await?
        .into_iter()
        .filter(|b| !b.private || b.is_creator(user.id))
        .map(|b| b.to_serialized())
        .collect();

    Ok(Json(boxes))
}

#[utoipa::path(
    post,
    path = "/v1/boxes",
    tag = "boxes",
    request_body = NewBoxSchema,
    security(
        ("UserHeader" = [])
    ),
    responses(
        (status = 200, body = BoxInfo)
    )
)]
pub async fn create_box(
    Actor(user): Actor,
    context: ServerContext,
    ValidatedJson(body): ValidatedJson<NewBoxSchema>,
) -> ServerResult<Json<BoxInfo>> {
    let box_data = context
        .collab
        .boxes
        .create_box(NewBox {
            name: body.name,
            private: body.private,
            options: body.options.into(),
            user_id: user.id,
        })
        .await?;

    Ok(Json(box_data.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/boxes/{id}",
    tag = "boxes",
    params(("id" = u32, Path, description = "The id of the box")),
    security(
        ("UserHeader" = [])
    ),
    responses(
        (status = 200, body = BoxInfo)
    )
)]
pub async fn get_box(
    _actor: Actor,
    context: ServerContext,
    Path(box_id): Path<u32>,
) -> ServerResult<Json<BoxInfo>> {
    let box_data = context.collab.boxes.get(box_id).await?;

    Ok(Json(box_data.to_serialized()))
}

#[utoipa::path(
    patch,
    path = "/v1/boxes/{id}",
    tag = "boxes",
    params(("id" = u32, Path, description = "The id of the box")),
    request_body = UpdateBoxSchema,
    security(
        ("UserHeader" = [])
    ),
    responses(
        (status = 200, body = BoxInfo),
        (status = 403, description = "The user cannot edit the box")
    )
)]
pub async fn update_box(
    Actor(user): Actor,
    context: ServerContext,
    Path(box_id): Path<u32>,
    ValidatedJson(body): ValidatedJson<UpdateBoxSchema>,
) -> ServerResult<Json<BoxInfo>> {
    let acl = body.acl.map(Acl::try_from).transpose()?;

    let box_data = context
        .collab
        .boxes
        .update_box(
            user.id,
            UpdatedBox {
                id: box_id,
                name: body.name,
                open: body.open,
                private: body.private,
                options: body.options.map(Into::into),
                acl,
            },
        )
        .await?;

    Ok(Json(box_data.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/boxes/{id}",
    tag = "boxes",
    params(("id" = u32, Path, description = "The id of the box")),
    security(
        ("UserHeader" = [])
    ),
    responses(
        (status = 200, description = "The box was deleted"),
        (status = 403, description = "Only the creator can delete a box")
    )
)]
pub async fn delete_box(
    Actor(user): Actor,
    context: ServerContext,
    Path(box_id): Path<u32>,
) -> ServerResult<()> {
    context.collab.boxes.delete_box(box_id, user.id).await?;
    Ok(())
}

#[utoipa::path(
    get,
    path = "/v1/boxes/{id}/queue",
    tag = "boxes",
    params(("id" = u32, Path, description = "The id of the box")),
    security(
        ("UserHeader" = [])
    ),
    responses(
        (status = 200, body = Vec<QueueItem>, description = "The queue, newest submission first")
    )
)]
pub async fn queue(
    _actor: Actor,
    context: ServerContext,
    Path(box_id): Path<u32>,
) -> ServerResult<Json<Vec<QueueItem>>> {
    let items = context.collab.queue.items(box_id).await?;

    Ok(Json(items.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/boxes/{id}/queue",
    tag = "boxes",
    params(("id" = u32, Path, description = "The id of the box")),
    request_body = QueueActionSchema,
    security(
        ("UserHeader" = [])
    ),
    responses(
        (status = 200, body = QueueUpdate, description = "The action was performed"),
        (status = 402, description = "The user does not have enough berries"),
        (status = 403, description = "The user is not allowed to perform the action"),
        (status = 409, description = "The action conflicts with the state of the queue")
    )
)]
pub async fn queue_action(
    Actor(user): Actor,
    context: ServerContext,
    Path(box_id): Path<u32>,
    ValidatedJson(body): ValidatedJson<QueueActionSchema>,
) -> ServerResult<Json<QueueUpdate>> {
    let outcome = context
        .collab
        .queue
        .handle(box_id, Some(user.id), body.into())
        .await?;

    Ok(Json(outcome.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/boxes/{id}/permissions",
    tag = "boxes",
    params(("id" = u32, Path, description = "The id of the box")),
    security(
        ("UserHeader" = [])
    ),
    responses(
        (status = 200, body = Vec<PermissionGrant>, description = "What the user can do in the box")
    )
)]
pub async fn permissions(
    Actor(user): Actor,
    context: ServerContext,
    Path(box_id): Path<u32>,
) -> ServerResult<Json<Vec<PermissionGrant>>> {
    let summary = context.collab.permissions.summary(box_id, user.id).await?;

    Ok(Json(summary.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/boxes/{id}/berries",
    tag = "boxes",
    params(("id" = u32, Path, description = "The id of the box")),
    request_body = CreditSchema,
    security(
        ("UserHeader" = [])
    ),
    responses(
        (status = 200, body = Balance, description = "The new balance of the credited user"),
        (status = 403, description = "The acting user is not an admin of the box")
    )
)]
pub async fn credit_berries(
    Actor(user): Actor,
    context: ServerContext,
    Path(box_id): Path<u32>,
    ValidatedJson(body): ValidatedJson<CreditSchema>,
) -> ServerResult<Json<Balance>> {
    let box_data = context.collab.boxes.get(box_id).await?;

    if !box_data.options.berries {
        return Err(ServerError::BadRequest(
            "Berries are disabled in this box".to_string(),
        ));
    }

    let target_id = body.user_id.unwrap_or(user.id);
    let berries = context
        .collab
        .boxes
        .grant_berries(box_id, user.id, target_id, body.amount)
        .await?;

    Ok(Json(Balance::new(target_id, berries)))
}

#[utoipa::path(
    put,
    path = "/v1/boxes/{id}/subscribers/{user_id}",
    tag = "boxes",
    params(
        ("id" = u32, Path, description = "The id of the box"),
        ("user_id" = u32, Path, description = "The user whose role changes")
    ),
    request_body = SetRoleSchema,
    security(
        ("UserHeader" = [])
    ),
    responses(
        (status = 200, body = Subscriber),
        (status = 403, description = "The user cannot give this role")
    )
)]
pub async fn set_role(
    Actor(user): Actor,
    context: ServerContext,
    Path((box_id, target_id)): Path<(u32, u32)>,
    ValidatedJson(body): ValidatedJson<SetRoleSchema>,
) -> ServerResult<Json<Subscriber>> {
    let subscriber = context
        .collab
        .boxes
        .set_role(box_id, user.id, target_id, body.role.into())
        .await?;

    Ok(Json(subscriber.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_boxes).post(create_box))
        .route("/:id", get(get_box).patch(update_box).delete(delete_box))
        .route("/:id/queue", get(queue).post(queue_action))
        .route("/:id/permissions", get(permissions))
        .route("/:id/berries", post(credit_berries))
        .route("/:id/subscribers/:user_id", put(set_role))
}
