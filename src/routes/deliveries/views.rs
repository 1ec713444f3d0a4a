use super::form::DeliveryForm;
use super::models::{DaySummary, Delivery, DeliveryListParams, DeliveryPage, DeliveryUpload};
use super::query::DeliveryQuery;
use super::services;
use crate::common::auth::{CurrentUser, require_auth};
use crate::common::errors::BusinessError;
use crate::common::state::AppState;
use crate::not_found;
use axum::{
    Extension, Json,
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::get,
};
use tokio_util::io::ReaderStream;
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

pub fn router(state: &AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_deliveries, create_delivery))
        .routes(routes!(delivery_summary))
        .routes(routes!(
            get_delivery,
            replace_delivery,
            update_delivery,
            delete_delivery
        ))
        .routes(routes!(download_media))
        // Trailing-slash spellings used by older clients
        .route("/summary/", get(delivery_summary))
        .route(
            "/{id}/",
            get(get_delivery)
                .put(replace_delivery)
                .patch(update_delivery)
                .delete(delete_delivery),
        )
        .with_state(state.clone())
        .layer(from_fn_with_state(state.clone(), require_auth))
}

#[utoipa::path(
    get,
    path = "/",
    params(DeliveryListParams),
    responses(
        (status = OK, description = "One page of the caller's deliveries", body = DeliveryPage),
        (status = BAD_REQUEST, description = "Malformed filter value"),
        (status = NOT_FOUND, description = "Invalid page"),
        (status = UNAUTHORIZED, description = "Not authenticated")
    ),
    tag = "deliveries"
)]
pub async fn list_deliveries(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<DeliveryListParams>,
) -> Result<Json<DeliveryPage>, BusinessError> {
    let query = DeliveryQuery::parse(params)?;
    Ok(Json(services::list_deliveries(&state, &user, &query).await?))
}

#[utoipa::path(
    get,
    path = "/summary",
    params(DeliveryListParams),
    responses(
        (status = OK, description = "Delivery count per departure day", body = Vec<DaySummary>),
        (status = BAD_REQUEST, description = "Malformed filter value"),
        (status = UNAUTHORIZED, description = "Not authenticated")
    ),
    tag = "deliveries"
)]
pub async fn delivery_summary(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<DeliveryListParams>,
) -> Result<Json<Vec<DaySummary>>, BusinessError> {
    let query = DeliveryQuery::parse(params)?;
    Ok(Json(services::summarize_by_day(&state, &user, &query).await?))
}

#[utoipa::path(
    post,
    path = "/",
    request_body(content = DeliveryUpload, content_type = "multipart/form-data"),
    responses(
        (status = CREATED, description = "Delivery created", body = Delivery),
        (status = BAD_REQUEST, description = "Invalid fields"),
        (status = UNAUTHORIZED, description = "Not authenticated")
    ),
    tag = "deliveries"
)]
pub async fn create_delivery(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Delivery>), BusinessError> {
    let changes = DeliveryForm::from_multipart(multipart)
        .await?
        .validate(&state.db, false)
        .await?;
    let delivery = services::create_delivery(&state, &user, changes).await?;
    Ok((StatusCode::CREATED, Json(delivery)))
}

#[utoipa::path(
    get,
    path = "/{id}",
    params(("id" = Uuid, Path, description = "Delivery id")),
    responses(
        (status = OK, body = Delivery),
        (status = NOT_FOUND, description = "No such delivery for the caller"),
        (status = UNAUTHORIZED, description = "Not authenticated")
    ),
    tag = "deliveries"
)]
pub async fn get_delivery(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Delivery>, BusinessError> {
    Ok(Json(services::get_delivery(&state, &user, id).await?))
}

#[utoipa::path(
    put,
    path = "/{id}",
    params(("id" = Uuid, Path, description = "Delivery id")),
    request_body(content = DeliveryUpload, content_type = "multipart/form-data"),
    responses(
        (status = OK, body = Delivery),
        (status = BAD_REQUEST, description = "Invalid or missing fields"),
        (status = NOT_FOUND, description = "No such delivery for the caller"),
        (status = UNAUTHORIZED, description = "Not authenticated")
    ),
    tag = "deliveries"
)]
pub async fn replace_delivery(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<Delivery>, BusinessError> {
    write_delivery(&state, &user, id, multipart, false).await
}

#[utoipa::path(
    patch,
    path = "/{id}",
    params(("id" = Uuid, Path, description = "Delivery id")),
    request_body(content = DeliveryUpload, content_type = "multipart/form-data"),
    responses(
        (status = OK, body = Delivery),
        (status = BAD_REQUEST, description = "Invalid fields"),
        (status = NOT_FOUND, description = "No such delivery for the caller"),
        (status = UNAUTHORIZED, description = "Not authenticated")
    ),
    tag = "deliveries"
)]
pub async fn update_delivery(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<Delivery>, BusinessError> {
    write_delivery(&state, &user, id, multipart, true).await
}

async fn write_delivery(
    state: &AppState,
    user: &CurrentUser,
    id: Uuid,
    multipart: Multipart,
    partial: bool,
) -> Result<Json<Delivery>, BusinessError> {
    // Ownership first, so a foreign id is a 404 even with an invalid body
    services::find_owned(state, user, id).await?;
    let changes = DeliveryForm::from_multipart(multipart)
        .await?
        .validate(&state.db, partial)
        .await?;
    Ok(Json(services::update_delivery(state, user, id, changes).await?))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    params(("id" = Uuid, Path, description = "Delivery id")),
    responses(
        (status = NO_CONTENT, description = "Delivery and its attachment removed"),
        (status = NOT_FOUND, description = "No such delivery for the caller"),
        (status = UNAUTHORIZED, description = "Not authenticated")
    ),
    tag = "deliveries"
)]
pub async fn delete_delivery(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, BusinessError> {
    services::delete_delivery(&state, &user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn content_type_for(path: &str) -> mime::Mime {
    match path.rsplit('.').next().map(str::to_ascii_lowercase).as_deref() {
        Some("pdf") => mime::APPLICATION_PDF,
        Some("jpg" | "jpeg") => mime::IMAGE_JPEG,
        Some("png") => mime::IMAGE_PNG,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

#[utoipa::path(
    get,
    path = "/{id}/media",
    params(("id" = Uuid, Path, description = "Delivery id")),
    responses(
        (status = OK, description = "The attachment file", content_type = "application/octet-stream"),
        (status = NOT_FOUND, description = "No such delivery or file"),
        (status = UNAUTHORIZED, description = "Not authenticated")
    ),
    tag = "deliveries"
)]
pub async fn download_media(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Response, BusinessError> {
    let relative = services::media_path(&state, &user, id).await?;
    let file = tokio::fs::File::open(state.attachments.path_of(&relative))
        .await
        .map_err(|e| {
            tracing::warn!("Attachment {relative} of delivery {id} unreadable: {e}");
            not_found!("attachment", id)
        })?;

    let file_name = relative.rsplit('/').next().unwrap_or(&relative).to_string();
    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(&relative).to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{file_name}\""),
            ),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}
