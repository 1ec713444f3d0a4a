use super::db;
use super::delivery_services;
use super::form::DeliveryChanges;
use super::models::{
    DaySummary, Delivery, DeliveryPage, DeliveryStatus, TechnicalState, normalize_distance,
};
use super::query::{DeliveryQuery, page_count};
use crate::common::auth::CurrentUser;
use crate::common::errors::{BusinessError, BusinessResult, DbErrorExt};
use crate::common::state::AppState;
use crate::external::storage::AttachmentStore;
use crate::not_found;
use crate::routes::lookups::{cargo, packaging, services, transports};
use crate::routes::users::db as users;
use chrono::NaiveDate;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    LoaderTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

const CONTEXT: &str = "delivery";

/// Builds read models for a batch of rows with one query per relation.
pub async fn present(
    db: &DatabaseConnection,
    attachments: &AttachmentStore,
    rows: Vec<db::Model>,
) -> BusinessResult<Vec<Delivery>> {
    let map_err = |e: sea_orm::DbErr| e.to_business_error(CONTEXT);
    let transports = rows
        .load_one(transports::models::Entity, db)
        .await
        .map_err(map_err)?;
    let packagings = rows
        .load_one(packaging::models::Entity, db)
        .await
        .map_err(map_err)?;
    let cargo_types = rows.load_one(cargo::models::Entity, db).await.map_err(map_err)?;
    let owners = rows.load_one(users::Entity, db).await.map_err(map_err)?;
    let linked_services = rows
        .load_many_to_many(services::models::Entity, delivery_services::Entity, db)
        .await
        .map_err(map_err)?;

    rows.into_iter()
        .zip(transports)
        .zip(packagings)
        .zip(cargo_types)
        .zip(owners)
        .zip(linked_services)
        .map(
            |(((((row, transport), packaging), cargo_type), owner), mut linked)| -> BusinessResult<Delivery> {
                let transport = transport.ok_or_else(|| dangling(row.id, "transport"))?;
                let packaging = packaging.ok_or_else(|| dangling(row.id, "packaging"))?;
                let owner = owner.ok_or_else(|| dangling(row.id, "user"))?;
                linked.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

                Ok(Delivery {
                    id: row.id,
                    duration_seconds: row.duration().num_seconds(),
                    transport_model: transport.into(),
                    departure_datetime: row.departure_datetime,
                    arrival_datetime: row.arrival_datetime,
                    distance_km: normalize_distance(row.distance_km),
                    media_file: attachments.url_of(&row.media_file),
                    services: linked.into_iter().map(Into::into).collect(),
                    status: row.status,
                    status_display: row.status.label().to_string(),
                    packaging: packaging.into(),
                    cargo_type: cargo_type.map(Into::into),
                    technical_state: row.technical_state,
                    technical_state_display: row.technical_state.label().to_string(),
                    user: owner.username,
                })
            },
        )
        .collect()
}

fn dangling(id: Uuid, relation: &str) -> BusinessError {
    BusinessError::InternalError {
        message: format!("delivery {id} points at a missing {relation}"),
    }
}

pub async fn list_deliveries(
    state: &AppState,
    user: &CurrentUser,
    query: &DeliveryQuery,
) -> BusinessResult<DeliveryPage> {
    let select = query.listing(user.id);
    let count = select
        .clone()
        .count(&state.db)
        .await
        .map_err(|e| e.to_business_error(CONTEXT))?;

    let pages = page_count(count, query.page_size);
    if query.page > pages {
        return Err(BusinessError::InvalidPage {
            page: query.page.to_string(),
        });
    }

    let rows = select
        .offset(query.offset())
        .limit(query.page_size)
        .all(&state.db)
        .await
        .map_err(|e| e.to_business_error(CONTEXT))?;

    Ok(DeliveryPage {
        count,
        next: (query.page < pages).then_some(query.page + 1),
        previous: (query.page > 1).then_some(query.page - 1),
        results: present(&state.db, &state.attachments, rows).await?,
    })
}

/// SQL expression for the UTC calendar day of the departure, rendered as `YYYY-MM-DD`.
fn departure_day_sql(backend: DbBackend) -> &'static str {
    match backend {
        DbBackend::Postgres => {
            "TO_CHAR(\"deliveries\".\"departure_datetime\" AT TIME ZONE 'UTC', 'YYYY-MM-DD')"
        }
        DbBackend::MySql => "DATE_FORMAT(`deliveries`.`departure_datetime`, '%Y-%m-%d')",
        DbBackend::Sqlite => "DATE(\"deliveries\".\"departure_datetime\")",
    }
}

/// Deliveries per departure day, oldest day first. Days without deliveries
/// are absent.
pub async fn summarize_by_day(
    state: &AppState,
    user: &CurrentUser,
    query: &DeliveryQuery,
) -> BusinessResult<Vec<DaySummary>> {
    let day = departure_day_sql(state.db.get_database_backend());
    let rows: Vec<(String, i64)> = query
        .filtered(user.id)
        .select_only()
        .column_as(Expr::cust(day), "day")
        .column_as(db::Column::Id.count(), "count")
        .group_by(Expr::cust(day))
        .order_by_asc(Expr::cust(day))
        .into_tuple()
        .all(&state.db)
        .await
        .map_err(|e| e.to_business_error(CONTEXT))?;

    rows.into_iter()
        .map(|(day, count)| {
            NaiveDate::parse_from_str(&day, "%Y-%m-%d")
                .map(|day| DaySummary { day, count })
                .map_err(|e| BusinessError::InternalError {
                    message: format!("unexpected day value {day:?}: {e}"),
                })
        })
        .collect()
}

/// The caller's delivery; someone else's is reported as missing.
pub async fn find_owned(state: &AppState, user: &CurrentUser, id: Uuid) -> BusinessResult<db::Model> {
    db::Entity::find_by_id(id)
        .filter(db::Column::UserId.eq(user.id))
        .one(&state.db)
        .await
        .map_err(|e| e.to_business_error(CONTEXT))?
        .ok_or_else(|| not_found!(CONTEXT, id))
}

pub async fn get_delivery(state: &AppState, user: &CurrentUser, id: Uuid) -> BusinessResult<Delivery> {
    let row = find_owned(state, user, id).await?;
    present(&state.db, &state.attachments, vec![row])
        .await?
        .pop()
        .ok_or_else(|| not_found!(CONTEXT, id))
}

/// Path of the caller's attachment relative to the media root.
pub async fn media_path(state: &AppState, user: &CurrentUser, id: Uuid) -> BusinessResult<String> {
    Ok(find_owned(state, user, id).await?.media_file)
}

async fn replace_services<C: ConnectionTrait>(
    conn: &C,
    delivery_id: Uuid,
    service_ids: &[Uuid],
) -> Result<(), sea_orm::DbErr> {
    delivery_services::Entity::delete_many()
        .filter(delivery_services::Column::DeliveryId.eq(delivery_id))
        .exec(conn)
        .await?;

    let links = service_ids.iter().map(|service_id| delivery_services::ActiveModel {
        delivery_id: Set(delivery_id),
        service_id: Set(*service_id),
    });
    delivery_services::Entity::insert_many(links)
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

/// Stores the attachment, then writes the row and its service links in one
/// transaction. The file is removed again when the transaction fails.
pub async fn create_delivery(
    state: &AppState,
    user: &CurrentUser,
    changes: DeliveryChanges,
) -> BusinessResult<Delivery> {
    let (
        Some(transport_model_id),
        Some(departure_datetime),
        Some(arrival_datetime),
        Some(distance_km),
        Some(packaging_id),
        Some(service_ids),
        Some(media_file),
    ) = (
        changes.transport_model_id,
        changes.departure_datetime,
        changes.arrival_datetime,
        changes.distance_km,
        changes.packaging_id,
        changes.service_ids,
        changes.media_file,
    )
    else {
        return Err(BusinessError::InternalError {
            message: "create called with an incomplete form".to_string(),
        });
    };

    let status = changes.status.unwrap_or(DeliveryStatus::Pending);
    let cargo_type_id = changes.cargo_type_id.flatten();
    let technical_state = changes.technical_state.unwrap_or(TechnicalState::Ok);

    let stored = state
        .attachments
        .save(&media_file.file_name, &media_file.bytes)
        .await?;
    let id = Uuid::new_v4();

    let result = async {
        let txn = state.db.begin().await?;
        db::ActiveModel {
            id: Set(id),
            transport_model_id: Set(transport_model_id),
            departure_datetime: Set(departure_datetime),
            arrival_datetime: Set(arrival_datetime),
            distance_km: Set(distance_km),
            media_file: Set(stored.clone()),
            status: Set(status),
            packaging_id: Set(packaging_id),
            cargo_type_id: Set(cargo_type_id),
            technical_state: Set(technical_state),
            user_id: Set(user.id),
        }
        .insert(&txn)
        .await?;
        replace_services(&txn, id, &service_ids).await?;
        txn.commit().await
    }
    .await;

    if let Err(e) = result {
        state.attachments.remove(&stored).await;
        return Err(e.to_business_error(CONTEXT));
    }

    tracing::info!("User {} created delivery {id}", user.username);
    get_delivery(state, user, id).await
}

/// Applies the sent fields. A new attachment replaces the old file only once
/// the transaction has committed.
pub async fn update_delivery(
    state: &AppState,
    user: &CurrentUser,
    id: Uuid,
    changes: DeliveryChanges,
) -> BusinessResult<Delivery> {
    let existing = find_owned(state, user, id).await?;
    let previous_file = existing.media_file.clone();

    let stored = match changes.media_file.as_ref() {
        Some(file) => Some(state.attachments.save(&file.file_name, &file.bytes).await?),
        None => None,
    };

    let result = async {
        let txn = state.db.begin().await?;
        let mut active: db::ActiveModel = existing.into();
        if let Some(value) = changes.transport_model_id {
            active.transport_model_id = Set(value);
        }
        if let Some(value) = changes.departure_datetime {
            active.departure_datetime = Set(value);
        }
        if let Some(value) = changes.arrival_datetime {
            active.arrival_datetime = Set(value);
        }
        if let Some(value) = changes.distance_km {
            active.distance_km = Set(value);
        }
        if let Some(value) = changes.status {
            active.status = Set(value);
        }
        if let Some(value) = changes.packaging_id {
            active.packaging_id = Set(value);
        }
        if let Some(value) = changes.cargo_type_id {
            active.cargo_type_id = Set(value);
        }
        if let Some(value) = changes.technical_state {
            active.technical_state = Set(value);
        }
        if let Some(path) = stored.as_ref() {
            active.media_file = Set(path.clone());
        }
        if active.is_changed() {
            active.update(&txn).await?;
        }
        if let Some(service_ids) = changes.service_ids.as_deref() {
            replace_services(&txn, id, service_ids).await?;
        }
        txn.commit().await
    }
    .await;

    match (result, stored) {
        (Err(e), Some(path)) => {
            state.attachments.remove(&path).await;
            return Err(e.to_business_error(CONTEXT));
        }
        (Err(e), None) => return Err(e.to_business_error(CONTEXT)),
        (Ok(()), Some(_)) => state.attachments.remove(&previous_file).await,
        (Ok(()), None) => {}
    }

    tracing::info!("User {} updated delivery {id}", user.username);
    get_delivery(state, user, id).await
}

pub async fn delete_delivery(state: &AppState, user: &CurrentUser, id: Uuid) -> BusinessResult<()> {
    let existing = find_owned(state, user, id).await?;

    let txn = state
        .db
        .begin()
        .await
        .map_err(|e| e.to_business_error(CONTEXT))?;
    delivery_services::Entity::delete_many()
        .filter(delivery_services::Column::DeliveryId.eq(id))
        .exec(&txn)
        .await
        .map_err(|e| e.to_business_error(CONTEXT))?;
    db::Entity::delete_by_id(id)
        .exec(&txn)
        .await
        .map_err(|e| e.to_business_error(CONTEXT))?;
    txn.commit()
        .await
        .map_err(|e| e.to_business_error(CONTEXT))?;

    state.attachments.remove(&existing.media_file).await;
    tracing::info!("User {} deleted delivery {id}", user.username);
    Ok(())
}
