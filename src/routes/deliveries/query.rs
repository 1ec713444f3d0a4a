use super::db;
use super::delivery_services;
use super::models::{DeliveryListParams, DeliveryStatus};
use crate::common::errors::BusinessError;
use crate::routes::lookups::transports;
use crate::routes::users::db as users;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sea_orm::sea_query::{Expr, Query, SimpleExpr};
use sea_orm::{
    ColumnTrait, EntityName, EntityTrait, JoinType, Order, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Select,
};
use std::collections::BTreeMap;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Fields a listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    DepartureDatetime,
    DistanceKm,
}

impl OrderField {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "departure_datetime" => Some(OrderField::DepartureDatetime),
            "distance_km" => Some(OrderField::DistanceKm),
            _ => None,
        }
    }

    fn column(self) -> db::Column {
        match self {
            OrderField::DepartureDatetime => db::Column::DepartureDatetime,
            OrderField::DistanceKm => db::Column::DistanceKm,
        }
    }
}

/// Validated form of [`DeliveryListParams`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryQuery {
    /// Inclusive lower bound, midnight UTC of the requested day
    pub departure_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound, midnight UTC of the day after the requested one
    pub departure_before: Option<DateTime<Utc>>,
    pub cargo_type: Option<Uuid>,
    pub service: Option<Uuid>,
    pub status: Option<DeliveryStatus>,
    pub search_terms: Vec<String>,
    pub ordering: Vec<(OrderField, Order)>,
    pub page: u64,
    pub page_size: u64,
}

impl DeliveryQuery {
    pub fn parse(params: DeliveryListParams) -> Result<Self, BusinessError> {
        let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut reject = |field: &str, message: String| {
            fields.entry(field.to_string()).or_default().push(message);
        };

        let departure_from = match non_empty(params.departure_from.as_deref()).map(parse_day) {
            Some(Ok(day)) => Some(start_of_day(day)),
            Some(Err(message)) => {
                reject("departure_datetime__gte", message);
                None
            }
            None => None,
        };
        let departure_before = match non_empty(params.departure_to.as_deref()).map(parse_day) {
            Some(Ok(day)) => day.succ_opt().map(start_of_day),
            Some(Err(message)) => {
                reject("departure_datetime__lte", message);
                None
            }
            None => None,
        };

        let cargo_type = match non_empty(params.cargo_type.as_deref()).map(parse_uuid) {
            Some(Ok(id)) => Some(id),
            Some(Err(message)) => {
                reject("cargo_type", message);
                None
            }
            None => None,
        };
        let service = match non_empty(params.services.as_deref()).map(parse_uuid) {
            Some(Ok(id)) => Some(id),
            Some(Err(message)) => {
                reject("services", message);
                None
            }
            None => None,
        };

        let status = match non_empty(params.status.as_deref()) {
            Some(code) => match DeliveryStatus::from_code(code) {
                Some(status) => Some(status),
                None => {
                    reject(
                        "status",
                        format!(
                            "Select a valid choice. {code} is not one of the available choices."
                        ),
                    );
                    None
                }
            },
            None => None,
        };

        if !fields.is_empty() {
            return Err(BusinessError::InvalidFields { fields });
        }

        Ok(Self {
            departure_from,
            departure_before,
            cargo_type,
            service,
            status,
            search_terms: search_terms(params.search.as_deref().unwrap_or("")),
            ordering: parse_ordering(params.ordering.as_deref().unwrap_or("")),
            page: parse_page(params.page.as_deref())?,
            page_size: parse_page_size(params.page_size.as_deref()),
        })
    }

    /// Deliveries owned by `user_id` narrowed by the filters. Search, ordering
    /// and paging are left to the caller.
    pub fn filtered(&self, user_id: Uuid) -> Select<db::Entity> {
        let mut select = db::Entity::find().filter(db::Column::UserId.eq(user_id));

        if let Some(from) = self.departure_from {
            select = select.filter(db::Column::DepartureDatetime.gte(from));
        }
        if let Some(before) = self.departure_before {
            select = select.filter(db::Column::DepartureDatetime.lt(before));
        }
        if let Some(cargo_type) = self.cargo_type {
            select = select.filter(db::Column::CargoTypeId.eq(cargo_type));
        }
        if let Some(service) = self.service {
            select = select.filter(
                db::Column::Id.in_subquery(
                    Query::select()
                        .column(delivery_services::Column::DeliveryId)
                        .from(delivery_services::Entity)
                        .and_where(delivery_services::Column::ServiceId.eq(service))
                        .to_owned(),
                ),
            );
        }
        if let Some(status) = self.status {
            select = select.filter(db::Column::Status.eq(status));
        }

        select
    }

    /// The filtered listing with search terms applied, ordered and ready to page.
    pub fn listing(&self, user_id: Uuid) -> Select<db::Entity> {
        let mut select = self.filtered(user_id);

        if !self.search_terms.is_empty() {
            tracing::debug!("Searching deliveries for {:?}", self.search_terms);
            select = select
                .join(JoinType::InnerJoin, db::Relation::TransportModel.def())
                .join(JoinType::InnerJoin, db::Relation::User.def());
            for term in &self.search_terms {
                select = select.filter(
                    icontains(&column_sql(transports::models::Entity, "plate_number"), term)
                        .or(icontains(&column_sql(users::Entity, "username"), term)),
                );
            }
        }

        for (field, order) in &self.ordering {
            select = select.order_by(field.column(), order.clone());
        }
        select.order_by(db::Column::Id, Order::Asc)
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.page_size
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Calendar day of a bare date or of an ISO-8601 datetime, with or without offset.
pub fn parse_day(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.date_naive()))
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date()))
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M").map(|dt| dt.date()))
        .map_err(|_| "Enter a valid date.".to_string())
}

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

fn parse_uuid(value: &str) -> Result<Uuid, String> {
    Uuid::parse_str(value).map_err(|_| {
        "Select a valid choice. That choice is not one of the available choices.".to_string()
    })
}

/// Splits free text into terms on whitespace and commas.
pub fn search_terms(search: &str) -> Vec<String> {
    search
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|term| !term.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Known fields in request order, `-` prefix for descending. Falls back to
/// newest departures first.
pub fn parse_ordering(ordering: &str) -> Vec<(OrderField, Order)> {
    let mut parsed: Vec<(OrderField, Order)> = Vec::new();
    for name in ordering.split(',').map(str::trim) {
        let (name, order) = match name.strip_prefix('-') {
            Some(name) => (name, Order::Desc),
            None => (name, Order::Asc),
        };
        if let Some(field) = OrderField::from_name(name) {
            if !parsed.iter().any(|(existing, _)| *existing == field) {
                parsed.push((field, order));
            }
        }
    }

    if parsed.is_empty() {
        parsed.push((OrderField::DepartureDatetime, Order::Desc));
    }
    parsed
}

pub fn parse_page(page: Option<&str>) -> Result<u64, BusinessError> {
    match non_empty(page) {
        None => Ok(1),
        Some(raw) => match raw.parse::<u64>() {
            Ok(page) if page >= 1 => Ok(page),
            _ => Err(BusinessError::InvalidPage {
                page: raw.to_string(),
            }),
        },
    }
}

pub fn parse_page_size(page_size: Option<&str>) -> u64 {
    match non_empty(page_size).map(str::parse::<u64>) {
        Some(Ok(size)) if size >= 1 => size.min(MAX_PAGE_SIZE),
        _ => DEFAULT_PAGE_SIZE,
    }
}

/// Number of pages needed for `count` rows; an empty result still has one page.
pub fn page_count(count: u64, page_size: u64) -> u64 {
    count.div_ceil(page_size).max(1)
}

fn column_sql<E: EntityTrait>(entity: E, column: &str) -> String {
    format!("\"{}\".\"{column}\"", entity.table_name())
}

/// Case-insensitive substring match. Both sides are lowered by the database
/// so stored and searched text go through the same case folding. `!` escapes
/// the LIKE wildcards.
fn icontains(column: &str, term: &str) -> SimpleExpr {
    let escaped = term
        .replace('!', "!!")
        .replace('%', "!%")
        .replace('_', "!_");
    Expr::cust_with_values(
        format!("LOWER({column}) LIKE LOWER(?) ESCAPE '!'"),
        [format!("%{escaped}%")],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn params() -> DeliveryListParams {
        DeliveryListParams::default()
    }

    #[test]
    fn defaults_when_nothing_is_given() {
        let query = DeliveryQuery::parse(params()).unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(
            query.ordering,
            vec![(OrderField::DepartureDatetime, Order::Desc)]
        );
        assert!(query.search_terms.is_empty());
        assert_eq!(query.departure_from, None);
    }

    #[rstest]
    #[case("2024-05-01")]
    #[case("2024-05-01T13:45:00")]
    #[case("2024-05-01T13:45")]
    #[case("2024-05-01T23:59:59+03:00")]
    #[case("2024-05-01T00:00:00Z")]
    fn date_bounds_use_the_calendar_day(#[case] raw: &str) {
        let query = DeliveryQuery::parse(DeliveryListParams {
            departure_from: Some(raw.to_string()),
            departure_to: Some(raw.to_string()),
            ..params()
        })
        .unwrap();

        assert_eq!(
            query.departure_from.unwrap().to_rfc3339(),
            "2024-05-01T00:00:00+00:00"
        );
        assert_eq!(
            query.departure_before.unwrap().to_rfc3339(),
            "2024-05-02T00:00:00+00:00"
        );
    }

    #[test]
    fn malformed_filters_are_reported_per_field() {
        let err = DeliveryQuery::parse(DeliveryListParams {
            departure_from: Some("01/05/2024".to_string()),
            cargo_type: Some("42".to_string()),
            status: Some("lost".to_string()),
            ..params()
        })
        .unwrap_err();

        let fields = err.field_errors().unwrap();
        assert_eq!(fields["departure_datetime__gte"], vec!["Enter a valid date."]);
        assert!(fields.contains_key("cargo_type"));
        assert!(fields["status"][0].contains("lost"));
        assert!(!fields.contains_key("departure_datetime__lte"));
    }

    #[test]
    fn search_splits_on_whitespace_and_commas() {
        assert_eq!(search_terms(" А123, ivan  petrov "), vec!["А123", "ivan", "petrov"]);
        assert!(search_terms(" , ").is_empty());
    }

    #[rstest]
    #[case("distance_km", vec![(OrderField::DistanceKm, Order::Asc)])]
    #[case("-distance_km", vec![(OrderField::DistanceKm, Order::Desc)])]
    #[case(
        "distance_km,-departure_datetime",
        vec![(OrderField::DistanceKm, Order::Asc), (OrderField::DepartureDatetime, Order::Desc)]
    )]
    #[case("user,-status", vec![(OrderField::DepartureDatetime, Order::Desc)])]
    #[case("", vec![(OrderField::DepartureDatetime, Order::Desc)])]
    #[case("distance_km,-distance_km", vec![(OrderField::DistanceKm, Order::Asc)])]
    fn ordering_keeps_known_fields(#[case] raw: &str, #[case] expected: Vec<(OrderField, Order)>) {
        assert_eq!(parse_ordering(raw), expected);
    }

    #[rstest]
    #[case(None, DEFAULT_PAGE_SIZE)]
    #[case(Some("25"), 25)]
    #[case(Some("500"), MAX_PAGE_SIZE)]
    #[case(Some("0"), DEFAULT_PAGE_SIZE)]
    #[case(Some("-3"), DEFAULT_PAGE_SIZE)]
    #[case(Some("many"), DEFAULT_PAGE_SIZE)]
    fn page_size_is_clamped(#[case] raw: Option<&str>, #[case] expected: u64) {
        assert_eq!(parse_page_size(raw), expected);
    }

    #[rstest]
    #[case("0")]
    #[case("-1")]
    #[case("two")]
    fn bad_page_numbers_are_invalid_pages(#[case] raw: &str) {
        assert!(matches!(
            parse_page(Some(raw)),
            Err(BusinessError::InvalidPage { .. })
        ));
    }

    #[test]
    fn page_count_has_a_floor_of_one() {
        assert_eq!(page_count(0, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
    }
}
