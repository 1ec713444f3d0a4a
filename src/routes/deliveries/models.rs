use crate::routes::lookups::{cargo, packaging, services, transports};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, ToSchema, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "in_transit")]
    InTransit,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl DeliveryStatus {
    pub fn code(self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::InTransit => "in_transit",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Cancelled => "cancelled",
        }
    }

    /// Human readable label shown next to the raw code
    pub fn label(self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "Ожидает",
            DeliveryStatus::InTransit => "В пути",
            DeliveryStatus::Delivered => "Доставлено",
            DeliveryStatus::Cancelled => "Отменено",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        <Self as sea_orm::Iterable>::iter().find(|status| status.code() == code)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, ToSchema, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(3))")]
#[serde(rename_all = "snake_case")]
pub enum TechnicalState {
    #[sea_orm(string_value = "ok")]
    Ok,
    #[sea_orm(string_value = "nok")]
    Nok,
}

impl TechnicalState {
    pub fn code(self) -> &'static str {
        match self {
            TechnicalState::Ok => "ok",
            TechnicalState::Nok => "nok",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TechnicalState::Ok => "Исправно",
            TechnicalState::Nok => "Неисправно",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        <Self as sea_orm::Iterable>::iter().find(|state| state.code() == code)
    }
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TransportSummary {
    pub id: Uuid,
    pub plate_number: String,
}

impl From<transports::models::Model> for TransportSummary {
    fn from(model: transports::models::Model) -> Self {
        Self {
            id: model.id,
            plate_number: model.plate_number,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PackagingSummary {
    pub id: Uuid,
    pub title: String,
}

impl From<packaging::models::Model> for PackagingSummary {
    fn from(model: packaging::models::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CargoSummary {
    pub id: Uuid,
    pub name: Option<String>,
}

impl From<cargo::models::Model> for CargoSummary {
    fn from(model: cargo::models::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ServiceSummary {
    pub id: Uuid,
    pub name: String,
}

impl From<services::models::Model> for ServiceSummary {
    fn from(model: services::models::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

/// Read model of a delivery: lookups are nested objects, the owner is only
/// a display string.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug)]
pub struct Delivery {
    pub id: Uuid,
    pub transport_model: TransportSummary,
    pub departure_datetime: DateTime<Utc>,
    pub arrival_datetime: DateTime<Utc>,
    pub duration_seconds: i64,
    #[schema(value_type = String, example = "123.45")]
    pub distance_km: Decimal,
    pub media_file: String,
    pub services: Vec<ServiceSummary>,
    pub status: DeliveryStatus,
    pub status_display: String,
    pub packaging: PackagingSummary,
    pub cargo_type: Option<CargoSummary>,
    pub technical_state: TechnicalState,
    pub technical_state_display: String,
    pub user: String,
}

/// Distances are always rendered with two fractional digits.
pub fn normalize_distance(distance: Decimal) -> Decimal {
    let mut distance = distance.round_dp(2);
    distance.rescale(2);
    distance
}

/// Page of results in the `{count, next, previous, results}` envelope
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct DeliveryPage {
    pub count: u64,
    pub next: Option<u64>,
    pub previous: Option<u64>,
    pub results: Vec<Delivery>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DaySummary {
    pub day: NaiveDate,
    pub count: i64,
}

/// Query parameters accepted by the list and summary endpoints.
///
/// Values stay raw strings here; `query::DeliveryQuery::parse` validates them
/// so malformed input becomes a per-field error instead of a rejected request.
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeliveryListParams {
    /// Keep deliveries departing on or after this date
    #[serde(rename = "departure_datetime__gte")]
    pub departure_from: Option<String>,
    /// Keep deliveries departing on or before this date
    #[serde(rename = "departure_datetime__lte")]
    pub departure_to: Option<String>,
    /// Cargo type id
    pub cargo_type: Option<String>,
    /// Service id the delivery must include
    pub services: Option<String>,
    /// Status code (`pending`, `in_transit`, `delivered`, `cancelled`)
    pub status: Option<String>,
    /// Matched against the plate number and the owner's username
    pub search: Option<String>,
    /// `departure_datetime` or `distance_km`, prefix with `-` for descending
    pub ordering: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

#[derive(ToSchema, Serialize)]
pub struct DeliveryUpload {
    /// Transport id
    pub transport_model: Uuid,
    pub departure_datetime: DateTime<Utc>,
    pub arrival_datetime: DateTime<Utc>,
    #[schema(value_type = String, example = "123.45")]
    pub distance_km: Decimal,
    pub status: Option<DeliveryStatus>,
    /// Packaging id
    pub packaging: Uuid,
    /// Cargo type id, empty for none
    pub cargo_type: Option<Uuid>,
    pub technical_state: Option<TechnicalState>,
    /// Repeat the field once per service id
    pub services: Vec<Uuid>,
    /// PDF, JPG, JPEG or PNG
    #[schema(value_type = String, format = Binary)]
    pub media_file: Vec<u8>,
}
