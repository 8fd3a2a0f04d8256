use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use berrybox_collab::Database;
use berrybox_core::UserData;

use crate::ServerContext;

/// The header identifying the user performing a request
pub const ACTOR_HEADER: &str = "X-Berrybox-User";

/// The user performing a request
pub struct Actor(pub UserData);

#[async_trait]
impl FromRequestParts<ServerContext> for Actor {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerContext,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|x| x.to_str().ok())
            .ok_or((StatusCode::UNAUTHORIZED, "Missing user header"))?
            .trim()
            .parse()
            .map_err(|_| (StatusCode::BAD_REQUEST, "User header must be a user id"))?;

        let user = state
            .collab
            .context()
            .database
            .user_by_id(user_id)
            .await
            .map_err(|_| (StatusCode::UNAUTHORIZED, "User does not exist"))?;

        Ok(Self(user))
    }
}
