use super::models::{self, CargoType, CargoTypeCreate, CargoTypeUpdate};
use crate::common::auth::require_auth;
use crate::common::errors::BusinessError;
use crate::common::state::AppState;
use crate::routes::deliveries::models::CargoSummary;
use crate::routes::lookups::{LookupPage, PageParams, list_page};
use axum::{
    Json,
    extract::{Query, State},
    middleware::from_fn_with_state,
};
use crudcrate::{CRUDResource, crud_handlers};
use sea_orm::DatabaseConnection;
use utoipa_axum::{router::OpenApiRouter, routes};

crud_handlers!(CargoType, CargoTypeUpdate, CargoTypeCreate);

/// Read-only listing; rows are managed from the command line.
pub fn router(state: &AppState) -> OpenApiRouter
where
    CargoType: CRUDResource,
{
    OpenApiRouter::new()
        .routes(routes!(get_one_handler))
        .routes(routes!(list_cargo))
        .with_state(state.db.clone())
        .layer(from_fn_with_state(state.clone(), require_auth))
}

#[utoipa::path(
    get,
    path = "/",
    params(PageParams),
    responses(
        (status = OK, description = "Cargo types, one page", body = LookupPage<CargoSummary>),
        (status = NOT_FOUND, description = "Invalid page"),
        (status = UNAUTHORIZED, description = "Not authenticated")
    ),
    tag = "cargo types"
)]
pub async fn list_cargo(
    State(db): State<DatabaseConnection>,
    Query(params): Query<PageParams>,
) -> Result<Json<LookupPage<CargoSummary>>, BusinessError> {
    let page = list_page::<models::Entity, CargoSummary>(
        &db,
        &params,
        models::Column::Name,
        models::Column::Id,
    )
    .await?;
    Ok(Json(page))
}
