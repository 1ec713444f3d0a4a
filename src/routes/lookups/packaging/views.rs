use super::models::{self, PackagingType, PackagingTypeCreate, PackagingTypeUpdate};
use crate::common::auth::require_auth;
use crate::common::errors::BusinessError;
use crate::common::state::AppState;
use crate::routes::deliveries::models::PackagingSummary;
use crate::routes::lookups::{LookupPage, PageParams, list_page};
use axum::{
    Json,
    extract::{Query, State},
    middleware::from_fn_with_state,
};
use crudcrate::{CRUDResource, crud_handlers};
use sea_orm::DatabaseConnection;
use utoipa_axum::{router::OpenApiRouter, routes};

crud_handlers!(PackagingType, PackagingTypeUpdate, PackagingTypeCreate);

/// Read-only listing; rows are managed from the command line.
pub fn router(state: &AppState) -> OpenApiRouter
where
    PackagingType: CRUDResource,
{
    OpenApiRouter::new()
        .routes(routes!(get_one_handler))
        .routes(routes!(list_packaging))
        .with_state(state.db.clone())
        .layer(from_fn_with_state(state.clone(), require_auth))
}

#[utoipa::path(
    get,
    path = "/",
    params(PageParams),
    responses(
        (status = OK, description = "Packaging types, one page", body = LookupPage<PackagingSummary>),
        (status = NOT_FOUND, description = "Invalid page"),
        (status = UNAUTHORIZED, description = "Not authenticated")
    ),
    tag = "packaging"
)]
pub async fn list_packaging(
    State(db): State<DatabaseConnection>,
    Query(params): Query<PageParams>,
) -> Result<Json<LookupPage<PackagingSummary>>, BusinessError> {
    let page = list_page::<models::Entity, PackagingSummary>(
        &db,
        &params,
        models::Column::Title,
        models::Column::Id,
    )
    .await?;
    Ok(Json(page))
}
