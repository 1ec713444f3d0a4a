use super::models::{Credentials, LoginResponse};
use crate::common::auth::{
    ACCESS_COOKIE, INVALID_TOKEN, REFRESH_COOKIE, TokenKind, auth_cookie, removal_cookie,
};
use crate::common::errors::BusinessError;
use crate::common::models::Detail;
use crate::common::state::AppState;
use crate::routes::users::services::{authenticate, find_active};
use crate::{unauthenticated, validation_error};
use axum::{Json, extract::State, routing::post};
use axum_extra::extract::cookie::CookieJar;
use utoipa_axum::{router::OpenApiRouter, routes};

const NO_ACTIVE_ACCOUNT: &str = "No active account found with the given credentials";

pub fn router(state: &AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(login))
        .routes(routes!(refresh))
        .routes(routes!(logout))
        // Trailing-slash spellings used by older clients
        .route("/token/", post(login))
        .route("/token/refresh/", post(refresh))
        .route("/logout/", post(logout))
        .with_state(state.clone())
}

#[utoipa::path(
    post,
    path = "/token",
    request_body = Credentials,
    responses(
        (status = OK, description = "Access and refresh cookies set", body = LoginResponse),
        (status = BAD_REQUEST, description = "Missing username or password"),
        (status = UNAUTHORIZED, description = "Unknown user, wrong password or inactive account")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(credentials): Json<Credentials>,
) -> Result<(CookieJar, Json<LoginResponse>), BusinessError> {
    let (username, password) = credentials.require()?;
    let Some(user) = authenticate(&state.db, &username, &password).await? else {
        tracing::warn!("Failed login for {username}");
        return Err(unauthenticated!(NO_ACTIVE_ACCOUNT));
    };

    let settings = state.config.cookies;
    let access = state.jwt.issue(user.id, TokenKind::Access)?;
    let refresh = state.jwt.issue(user.id, TokenKind::Refresh)?;
    let jar = jar
        .add(auth_cookie(
            ACCESS_COOKIE,
            access,
            state.jwt.lifetime(TokenKind::Access),
            settings,
        ))
        .add(auth_cookie(
            REFRESH_COOKIE,
            refresh,
            state.jwt.lifetime(TokenKind::Refresh),
            settings,
        ));

    tracing::info!("User {} logged in", user.username);
    Ok((
        jar,
        Json(LoginResponse {
            status: "success".to_string(),
            detail: "Login successful".to_string(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/token/refresh",
    responses(
        (status = OK, description = "Access cookie replaced", body = Detail),
        (status = BAD_REQUEST, description = "No refresh cookie"),
        (status = UNAUTHORIZED, description = "Refresh token invalid or expired")
    ),
    tag = "auth"
)]
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Detail>), BusinessError> {
    let token = jar
        .get(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| validation_error!("refresh", "This field may not be null."))?;

    let claims = state
        .jwt
        .verify(&token, TokenKind::Refresh)
        .map_err(|_| unauthenticated!(INVALID_TOKEN))?;
    let user = find_active(&state.db, claims.sub)
        .await?
        .ok_or_else(|| unauthenticated!(INVALID_TOKEN))?;

    let access = state.jwt.issue(user.id, TokenKind::Access)?;
    let jar = jar.add(auth_cookie(
        ACCESS_COOKIE,
        access,
        state.jwt.lifetime(TokenKind::Access),
        state.config.cookies,
    ));

    Ok((jar, Json(Detail::new("Token refreshed"))))
}

#[utoipa::path(
    post,
    path = "/logout",
    responses((status = OK, description = "Both auth cookies cleared", body = Detail)),
    tag = "auth"
)]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<Detail>) {
    let settings = state.config.cookies;
    let jar = jar
        .add(removal_cookie(ACCESS_COOKIE, settings))
        .add(removal_cookie(REFRESH_COOKIE, settings));

    (jar, Json(Detail::new("Logged out")))
}
