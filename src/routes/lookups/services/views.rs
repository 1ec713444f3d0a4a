use super::models::{self, Service, ServiceCreate, ServiceUpdate};
use crate::common::auth::require_auth;
use crate::common::errors::BusinessError;
use crate::common::state::AppState;
use crate::routes::deliveries::models::ServiceSummary;
use crate::routes::lookups::{LookupPage, PageParams, list_page};
use axum::{
    Json,
    extract::{Query, State},
    middleware::from_fn_with_state,
};
use crudcrate::{CRUDResource, crud_handlers};
use sea_orm::DatabaseConnection;
use utoipa_axum::{router::OpenApiRouter, routes};

crud_handlers!(Service, ServiceUpdate, ServiceCreate);

/// Read-only listing; rows are managed from the command line.
pub fn router(state: &AppState) -> OpenApiRouter
where
    Service: CRUDResource,
{
    OpenApiRouter::new()
        .routes(routes!(get_one_handler))
        .routes(routes!(list_services))
        .with_state(state.db.clone())
        .layer(from_fn_with_state(state.clone(), require_auth))
}

#[utoipa::path(
    get,
    path = "/",
    params(PageParams),
    responses(
        (status = OK, description = "Services, one page", body = LookupPage<ServiceSummary>),
        (status = NOT_FOUND, description = "Invalid page"),
        (status = UNAUTHORIZED, description = "Not authenticated")
    ),
    tag = "services"
)]
pub async fn list_services(
    State(db): State<DatabaseConnection>,
    Query(params): Query<PageParams>,
) -> Result<Json<LookupPage<ServiceSummary>>, BusinessError> {
    let page = list_page::<models::Entity, ServiceSummary>(
        &db,
        &params,
        models::Column::Name,
        models::Column::Id,
    )
    .await?;
    Ok(Json(page))
}
