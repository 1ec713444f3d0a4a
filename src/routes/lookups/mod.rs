pub mod cargo;
pub mod packaging;
pub mod services;
pub mod transports;

#[cfg(test)]
mod tests;

use crate::common::errors::{BusinessError, BusinessResult, DbErrorExt};
use crate::common::state::AppState;
use crate::routes::deliveries::query::{page_count, parse_page, parse_page_size};
use crate::routes::deliveries::{db as deliveries, delivery_services};
use crate::{business_rule_violation, duplicate_resource, not_found, validation_error};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityName, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

/// The four reference tables a delivery points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LookupKind {
    Transport,
    Packaging,
    Cargo,
    Service,
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LookupKind::Transport => "transport",
            LookupKind::Packaging => "packaging",
            LookupKind::Cargo => "cargo type",
            LookupKind::Service => "service",
        })
    }
}

pub fn router(state: &AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .nest("/transports", transports::views::router(state))
        .nest("/packaging", packaging::views::router(state))
        .nest("/cargo", cargo::views::router(state))
        .nest("/services", services::views::router(state))
}

/// Paging parameters of a lookup listing
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    pub page: Option<String>,
    /// Defaults to 10, capped at 100
    pub page_size: Option<String>,
}

/// Page of lookup rows in the `{count, next, previous, results}` envelope
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LookupPage<T> {
    pub count: u64,
    pub next: Option<u64>,
    pub previous: Option<u64>,
    pub results: Vec<T>,
}

/// One page of a lookup table ordered by its identifying column, then id.
pub async fn list_page<E, T>(
    db: &DatabaseConnection,
    params: &PageParams,
    label: E::Column,
    id: E::Column,
) -> BusinessResult<LookupPage<T>>
where
    E: EntityTrait,
    E::Model: Sync,
    T: From<E::Model>,
{
    let page = parse_page(params.page.as_deref())?;
    let page_size = parse_page_size(params.page_size.as_deref());
    let context = E::default().table_name().to_string();

    let count = E::find()
        .count(db)
        .await
        .map_err(|e| e.to_business_error(&context))?;
    let pages = page_count(count, page_size);
    if page > pages {
        return Err(BusinessError::InvalidPage {
            page: page.to_string(),
        });
    }

    let rows = E::find()
        .order_by_asc(label)
        .order_by_asc(id)
        .offset((page - 1) * page_size)
        .limit(page_size)
        .all(db)
        .await
        .map_err(|e| e.to_business_error(&context))?;

    Ok(LookupPage {
        count,
        next: (page < pages).then_some(page + 1),
        previous: (page > 1).then_some(page - 1),
        results: rows.into_iter().map(T::from).collect(),
    })
}

/// Inserts a lookup row; `value` is the plate, title or name depending on the kind.
pub async fn create_lookup(
    db: &DatabaseConnection,
    kind: LookupKind,
    value: &str,
) -> BusinessResult<Uuid> {
    let value = value.trim();
    if value.is_empty() {
        return Err(validation_error!(kind, "This field may not be blank."));
    }

    let id = Uuid::new_v4();
    let context = kind.to_string();
    match kind {
        LookupKind::Transport => {
            transports::models::validate_plate_number(value)?;
            let taken = transports::models::Entity::find()
                .filter(transports::models::Column::PlateNumber.eq(value))
                .count(db)
                .await
                .map_err(|e| e.to_business_error(&context))?;
            if taken > 0 {
                return Err(duplicate_resource!("transport", "plate_number"));
            }
            transports::models::ActiveModel {
                id: Set(id),
                plate_number: Set(value.to_string()),
            }
            .insert(db)
            .await
            .map_err(|e| e.to_business_error(&context))?;
        }
        LookupKind::Packaging => {
            packaging::models::ActiveModel {
                id: Set(id),
                title: Set(value.to_string()),
            }
            .insert(db)
            .await
            .map_err(|e| e.to_business_error(&context))?;
        }
        LookupKind::Cargo => {
            cargo::models::ActiveModel {
                id: Set(id),
                name: Set(Some(value.to_string())),
            }
            .insert(db)
            .await
            .map_err(|e| e.to_business_error(&context))?;
        }
        LookupKind::Service => {
            services::models::ActiveModel {
                id: Set(id),
                name: Set(value.to_string()),
            }
            .insert(db)
            .await
            .map_err(|e| e.to_business_error(&context))?;
        }
    }

    tracing::info!("Created {kind} {value} ({id})");
    Ok(id)
}

/// Deletes a lookup row unless a delivery still references it.
pub async fn delete_lookup(
    db: &DatabaseConnection,
    kind: LookupKind,
    id: Uuid,
) -> BusinessResult<()> {
    let context = kind.to_string();
    let references = match kind {
        LookupKind::Transport => {
            deliveries::Entity::find()
                .filter(deliveries::Column::TransportModelId.eq(id))
                .count(db)
                .await
        }
        LookupKind::Packaging => {
            deliveries::Entity::find()
                .filter(deliveries::Column::PackagingId.eq(id))
                .count(db)
                .await
        }
        LookupKind::Cargo => {
            deliveries::Entity::find()
                .filter(deliveries::Column::CargoTypeId.eq(id))
                .count(db)
                .await
        }
        LookupKind::Service => {
            delivery_services::Entity::find()
                .filter(delivery_services::Column::ServiceId.eq(id))
                .count(db)
                .await
        }
    }
    .map_err(|e| e.to_business_error(&context))?;

    if references > 0 {
        return Err(business_rule_violation!(
            "protected reference",
            format!("Cannot delete {kind} {id}: referenced by {references} deliveries")
        ));
    }

    let result = match kind {
        LookupKind::Transport => transports::models::Entity::delete_by_id(id).exec(db).await,
        LookupKind::Packaging => packaging::models::Entity::delete_by_id(id).exec(db).await,
        LookupKind::Cargo => cargo::models::Entity::delete_by_id(id).exec(db).await,
        LookupKind::Service => services::models::Entity::delete_by_id(id).exec(db).await,
    }
    .map_err(|e| e.to_business_error(&context))?;

    if result.rows_affected == 0 {
        return Err(not_found!(kind, id));
    }

    tracing::info!("Deleted {kind} {id}");
    Ok(())
}
