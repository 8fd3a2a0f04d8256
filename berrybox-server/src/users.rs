use axum::{extract::Path, routing::get, routing::post, Json};
use berrybox_collab::{Database, NewUser};
use log::info;

use crate::{
    context::ServerContext,
    errors::ServerResult,
    schemas::{NewUserSchema, ValidatedJson},
    serialized::{ToSerialized, User},
    Router,
};

#[utoipa::path(
    post,
    path = "/v1/users",
    tag = "users",
    request_body = NewUserSchema,
    responses(
        (status = 200, body = User)
    )
)]
pub async fn create_user(
    context: ServerContext,
    ValidatedJson(body): ValidatedJson<NewUserSchema>,
) -> ServerResult<Json<User>> {
    let user = context
        .collab
        .context()
        .database
        .create_user(NewUser { name: body.name })
        .await?;

    info!("User {} registered", user.name);

    Ok(Json(user.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/users/{id}",
    tag = "users",
    params(("id" = u32, Path, description = "The id of the user")),
    responses(
        (status = 200, body = User)
    )
)]
pub async fn user(context: ServerContext, Path(user_id): Path<u32>) -> ServerResult<Json<User>> {
    let user = context.collab.context().database.user_by_id(user_id).await?;

    Ok(Json(user.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_user))
        .route("/:id", get(user))
}
