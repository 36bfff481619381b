/// Profile endpoints for the authenticated account
use crate::{
    account::{UpdateProfileRequest, UserProfile},
    auth::AuthContext,
    context::AppContext,
    error::QueueResult,
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};

pub fn routes() -> Router<AppContext> {
    Router::new().route(
        "/users/profile",
        get(get_profile).put(update_profile).delete(delete_profile),
    )
}

async fn get_profile(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> QueueResult<Json<UserProfile>> {
    let account = ctx.account_manager.get_account(&auth.account_id).await?;
    Ok(Json(UserProfile::from(&account)))
}

async fn update_profile(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<UpdateProfileRequest>,
) -> QueueResult<Json<UserProfile>> {
    let account = ctx
        .account_manager
        .update_profile(&auth.account_id, req)
        .await?;
    Ok(Json(UserProfile::from(&account)))
}

async fn delete_profile(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> QueueResult<StatusCode> {
    ctx.account_manager
        .deactivate_account(&auth.account_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
