/// Registration, login and password recovery endpoints
use crate::{
    account::{
        AuthResponse, ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
        UserProfile,
    },
    auth::AuthContext,
    context::AppContext,
    error::QueueResult,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterRequest>,
) -> QueueResult<impl IntoResponse> {
    let (account, session) = ctx
        .account_manager
        .register(req.name, req.email, req.phone, req.password, req.role)
        .await?;

    let response = AuthResponse {
        token: session.token,
        user: UserProfile::from(&account),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> QueueResult<Json<AuthResponse>> {
    let (account, session) = ctx.account_manager.login(&req.email, &req.password).await?;

    Ok(Json(AuthResponse {
        token: session.token,
        user: UserProfile::from(&account),
    }))
}

async fn logout(State(ctx): State<AppContext>, auth: AuthContext) -> QueueResult<StatusCode> {
    ctx.account_manager
        .delete_session(&auth.session.session_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn forgot_password(
    State(ctx): State<AppContext>,
    Json(req): Json<ForgotPasswordRequest>,
) -> QueueResult<StatusCode> {
    if let Some((token, account)) = ctx
        .account_manager
        .generate_password_reset_token(&req.email)
        .await?
    {
        if ctx.mailer.is_configured() {
            if let Err(err) = ctx
                .mailer
                .send_password_reset_email(&account.email, &account.name, &token, &ctx.service_url())
                .await
            {
                tracing::warn!(error = %err, "Failed to send password reset email");
            }
        } else {
            tracing::info!(
                account_id = %account.id,
                "Password reset requested but no mailer is configured"
            );
        }
    }

    // Same response whether or not the email exists
    Ok(StatusCode::NO_CONTENT)
}

async fn reset_password(
    State(ctx): State<AppContext>,
    Json(req): Json<ResetPasswordRequest>,
) -> QueueResult<StatusCode> {
    ctx.account_manager
        .reset_password(&req.token, &req.password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
