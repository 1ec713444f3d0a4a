pub mod auth;
pub mod deliveries;
pub mod lookups;
pub mod users;

use crate::common::auth::ACCESS_COOKIE;
use crate::common::state::AppState;
use crate::config::Config;
use axum::{Json, Router, extract::DefaultBodyLimit, routing::get};
use sea_orm::DatabaseConnection;
use utoipa::OpenApi;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable};

pub fn build_router(db: &DatabaseConnection, config: &Config) -> Router {
    #[derive(OpenApi)]
    #[openapi(
        modifiers(&SecurityAddon),
        security(
            ("cookieAuth" = [])
        )
    )]
    struct ApiDoc;

    struct SecurityAddon;

    impl utoipa::Modify for SecurityAddon {
        fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
            openapi
                .components
                .get_or_insert_with(Default::default)
                .add_security_scheme(
                    "cookieAuth",
                    SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(ACCESS_COOKIE))),
                );
        }
    }

    let app_state = AppState::new(db, config);

    let api = OpenApiRouter::new()
        .merge(auth::views::router(&app_state))
        .nest("/deliveries", deliveries::views::router(&app_state))
        .merge(lookups::router(&app_state));

    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(crate::common::views::router(&app_state)) // Root routes
        .nest("/api/v1", api)
        .layer(DefaultBodyLimit::max(30 * 1024 * 1024))
        .split_for_parts();

    let document = api.clone();
    router
        .route(
            "/api/openapi.json",
            get(move || {
                let document = document.clone();
                async move { Json(document) }
            }),
        )
        .merge(Scalar::with_url("/api/docs", api))
}
