use super::models::{self, TransportModel, TransportModelCreate, TransportModelUpdate};
use crate::common::auth::require_auth;
use crate::common::errors::BusinessError;
use crate::common::state::AppState;
use crate::routes::deliveries::models::TransportSummary;
use crate::routes::lookups::{LookupPage, PageParams, list_page};
use axum::{
    Json,
    extract::{Query, State},
    middleware::from_fn_with_state,
};
use crudcrate::{CRUDResource, crud_handlers};
use sea_orm::DatabaseConnection;
use utoipa_axum::{router::OpenApiRouter, routes};

crud_handlers!(TransportModel, TransportModelUpdate, TransportModelCreate);

/// Read-only listing; rows are managed from the command line.
pub fn router(state: &AppState) -> OpenApiRouter
where
    TransportModel: CRUDResource,
{
    OpenApiRouter::new()
        .routes(routes!(get_one_handler))
        .routes(routes!(list_transports))
        .with_state(state.db.clone())
        .layer(from_fn_with_state(state.clone(), require_auth))
}

#[utoipa::path(
    get,
    path = "/",
    params(PageParams),
    responses(
        (status = OK, description = "Transport plates, one page", body = LookupPage<TransportSummary>),
        (status = NOT_FOUND, description = "Invalid page"),
        (status = UNAUTHORIZED, description = "Not authenticated")
    ),
    tag = "transports"
)]
pub async fn list_transports(
    State(db): State<DatabaseConnection>,
    Query(params): Query<PageParams>,
) -> Result<Json<LookupPage<TransportSummary>>, BusinessError> {
    let page = list_page::<models::Entity, TransportSummary>(
        &db,
        &params,
        models::Column::PlateNumber,
        models::Column::Id,
    )
    .await?;
    Ok(Json(page))
}
