use super::models::{DeliveryStatus, TechnicalState};
use crate::common::errors::{BusinessError, BusinessResult, DbErrorExt};
use crate::external::storage::allowed_extension;
use crate::routes::lookups::{cargo, packaging, services, transports};
use axum::extract::Multipart;
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

const REQUIRED: &str = "This field is required.";
const MAX_DIGITS: u32 = 7;
const DECIMAL_PLACES: u32 = 2;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Raw multipart fields of a delivery write, as sent by the client.
#[derive(Debug, Default, Clone)]
pub struct DeliveryForm {
    pub transport_model: Option<String>,
    pub departure_datetime: Option<String>,
    pub arrival_datetime: Option<String>,
    pub distance_km: Option<String>,
    pub status: Option<String>,
    pub packaging: Option<String>,
    pub cargo_type: Option<String>,
    pub technical_state: Option<String>,
    pub services: Option<Vec<String>>,
    pub media_file: Option<UploadedFile>,
}

/// Validated values. `None` means "not sent"; for `cargo_type` the inner
/// `None` clears the reference.
#[derive(Debug, Default, Clone)]
pub struct DeliveryChanges {
    pub transport_model_id: Option<Uuid>,
    pub departure_datetime: Option<DateTime<Utc>>,
    pub arrival_datetime: Option<DateTime<Utc>>,
    pub distance_km: Option<Decimal>,
    pub status: Option<DeliveryStatus>,
    pub packaging_id: Option<Uuid>,
    pub cargo_type_id: Option<Option<Uuid>>,
    pub technical_state: Option<TechnicalState>,
    pub service_ids: Option<Vec<Uuid>>,
    pub media_file: Option<UploadedFile>,
}

#[derive(Default)]
struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    fn into_result<T>(self, value: T) -> BusinessResult<T> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(BusinessError::InvalidFields { fields: self.0 })
        }
    }
}

impl DeliveryForm {
    pub async fn from_multipart(mut multipart: Multipart) -> BusinessResult<Self> {
        let mut form = DeliveryForm::default();

        while let Some(field) = multipart.next_field().await.map_err(|e| invalid_form(&e))? {
            let name = field.name().unwrap_or("").to_string();

            if name == "media_file" {
                let file_name = field.file_name().unwrap_or("").to_string();
                let bytes = field.bytes().await.map_err(|e| invalid_form(&e))?;
                form.media_file = Some(UploadedFile {
                    file_name,
                    bytes: bytes.to_vec(),
                });
                continue;
            }

            let value = field.text().await.map_err(|e| invalid_form(&e))?;
            match name.as_str() {
                "transport_model" => form.transport_model = Some(value),
                "departure_datetime" => form.departure_datetime = Some(value),
                "arrival_datetime" => form.arrival_datetime = Some(value),
                "distance_km" => form.distance_km = Some(value),
                "status" => form.status = Some(value),
                "packaging" => form.packaging = Some(value),
                "cargo_type" => form.cargo_type = Some(value),
                "technical_state" => form.technical_state = Some(value),
                "services" => form.services.get_or_insert_with(Vec::new).push(value),
                _ => {} // ignore unknown fields
            }
        }

        Ok(form)
    }

    /// Checks formats and lookup references. With `partial` (PATCH) only the
    /// fields present are validated; otherwise the required ones must be sent.
    pub async fn validate(
        self,
        db: &DatabaseConnection,
        partial: bool,
    ) -> BusinessResult<DeliveryChanges> {
        let mut errors = FieldErrors::default();
        let mut changes = DeliveryChanges::default();

        if !partial {
            for (field, present) in [
                ("transport_model", self.transport_model.is_some()),
                ("departure_datetime", self.departure_datetime.is_some()),
                ("arrival_datetime", self.arrival_datetime.is_some()),
                ("distance_km", self.distance_km.is_some()),
                ("packaging", self.packaging.is_some()),
                ("services", self.services.is_some()),
                ("media_file", self.media_file.is_some()),
            ] {
                if !present {
                    errors.add(field, REQUIRED);
                }
            }
        }

        if let Some(raw) = self.transport_model.as_deref() {
            changes.transport_model_id = parse_pk(&mut errors, "transport_model", raw);
        }
        if let Some(raw) = self.departure_datetime.as_deref() {
            changes.departure_datetime = parse_datetime(&mut errors, "departure_datetime", raw);
        }
        if let Some(raw) = self.arrival_datetime.as_deref() {
            changes.arrival_datetime = parse_datetime(&mut errors, "arrival_datetime", raw);
        }
        if let Some(raw) = self.distance_km.as_deref() {
            match parse_distance(raw) {
                Ok(distance) => changes.distance_km = Some(distance),
                Err(message) => errors.add("distance_km", message),
            }
        }
        if let Some(raw) = self.status.as_deref() {
            changes.status = parse_choice(&mut errors, "status", raw, DeliveryStatus::from_code);
        }
        if let Some(raw) = self.technical_state.as_deref() {
            changes.technical_state =
                parse_choice(&mut errors, "technical_state", raw, TechnicalState::from_code);
        }
        if let Some(raw) = self.packaging.as_deref() {
            changes.packaging_id = parse_pk(&mut errors, "packaging", raw);
        }
        if let Some(raw) = self.cargo_type.as_deref() {
            changes.cargo_type_id = if raw.trim().is_empty() {
                Some(None)
            } else {
                parse_pk(&mut errors, "cargo_type", raw).map(Some)
            };
        }
        if let Some(raw) = self.services.as_deref() {
            changes.service_ids = parse_services(&mut errors, raw);
        }
        if let Some(file) = self.media_file {
            if file.file_name.is_empty() && file.bytes.is_empty() {
                errors.add("media_file", "No file was submitted.");
            } else if file.bytes.is_empty() {
                errors.add("media_file", "The submitted file is empty.");
            } else if let Err(e) = allowed_extension(&file.file_name) {
                for message in e.field_errors().into_iter().flat_map(|f| f.into_values()).flatten() {
                    errors.add("media_file", message);
                }
            } else {
                changes.media_file = Some(file);
            }
        }

        check_references(db, &mut errors, &changes).await?;
        errors.into_result(changes)
    }
}

fn invalid_form(e: &axum::extract::multipart::MultipartError) -> BusinessError {
    crate::validation_error!("non_field_errors", format!("Invalid form data: {}", e.body_text()))
}

fn parse_pk(errors: &mut FieldErrors, field: &str, raw: &str) -> Option<Uuid> {
    match Uuid::parse_str(raw.trim()) {
        Ok(id) => Some(id),
        Err(_) => {
            errors.add(field, format!("“{raw}” is not a valid UUID."));
            None
        }
    }
}

/// RFC 3339, or a naive ISO-8601 datetime taken as UTC.
pub fn parse_datetime_value(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
                .map(|naive| naive.and_utc())
        })
}

fn parse_datetime(errors: &mut FieldErrors, field: &str, raw: &str) -> Option<DateTime<Utc>> {
    let parsed = parse_datetime_value(raw);
    if parsed.is_none() {
        errors.add(
            field,
            "Datetime has wrong format. Use one of these formats instead: \
             YYYY-MM-DDThh:mm[:ss[.uuuuuu]][+HH:MM|-HH:MM|Z].",
        );
    }
    parsed
}

/// Up to 7 digits in total, 2 of them after the decimal point.
pub fn parse_distance(raw: &str) -> Result<Decimal, String> {
    let value = Decimal::from_str(raw.trim()).map_err(|_| "A valid number is required.".to_string())?;
    let normalized = value.normalize();

    if normalized.scale() > DECIMAL_PLACES {
        return Err(format!(
            "Ensure that there are no more than {DECIMAL_PLACES} decimal places."
        ));
    }
    let whole_digits = normalized.trunc().abs().to_string().trim_start_matches('0').len();
    let whole_digits = u32::try_from(whole_digits).unwrap_or(u32::MAX);
    if whole_digits > MAX_DIGITS - DECIMAL_PLACES {
        return Err(format!(
            "Ensure that there are no more than {} digits before the decimal point.",
            MAX_DIGITS - DECIMAL_PLACES
        ));
    }

    Ok(value.round_dp(DECIMAL_PLACES))
}

fn parse_choice<T>(
    errors: &mut FieldErrors,
    field: &str,
    raw: &str,
    from_code: fn(&str) -> Option<T>,
) -> Option<T> {
    let parsed = from_code(raw.trim());
    if parsed.is_none() {
        errors.add(field, format!("\"{raw}\" is not a valid choice."));
    }
    parsed
}

fn parse_services(errors: &mut FieldErrors, raw: &[String]) -> Option<Vec<Uuid>> {
    let values: Vec<&str> = raw
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .collect();
    if values.is_empty() {
        errors.add("services", "This list may not be empty.");
        return None;
    }

    let mut ids = Vec::with_capacity(values.len());
    for value in values {
        if let Some(id) = parse_pk(errors, "services", value) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    (!errors.has("services")).then_some(ids)
}

fn does_not_exist(id: Uuid) -> String {
    format!("Invalid pk \"{id}\" - object does not exist.")
}

/// Every referenced lookup row must exist.
async fn check_references(
    db: &DatabaseConnection,
    errors: &mut FieldErrors,
    changes: &DeliveryChanges,
) -> BusinessResult<()> {
    if let Some(id) = changes.transport_model_id {
        let found = transports::models::Entity::find_by_id(id)
            .count(db)
            .await
            .map_err(|e| e.to_business_error("transport"))?;
        if found == 0 {
            errors.add("transport_model", does_not_exist(id));
        }
    }
    if let Some(id) = changes.packaging_id {
        let found = packaging::models::Entity::find_by_id(id)
            .count(db)
            .await
            .map_err(|e| e.to_business_error("packaging"))?;
        if found == 0 {
            errors.add("packaging", does_not_exist(id));
        }
    }
    if let Some(Some(id)) = changes.cargo_type_id {
        let found = cargo::models::Entity::find_by_id(id)
            .count(db)
            .await
            .map_err(|e| e.to_business_error("cargo_type"))?;
        if found == 0 {
            errors.add("cargo_type", does_not_exist(id));
        }
    }
    if let Some(ids) = changes.service_ids.as_ref() {
        let existing: Vec<Uuid> = services::models::Entity::find()
            .filter(services::models::Column::Id.is_in(ids.clone()))
            .all(db)
            .await
            .map_err(|e| e.to_business_error("service"))?
            .into_iter()
            .map(|service| service.id)
            .collect();
        for id in ids.iter().filter(|id| !existing.contains(id)) {
            errors.add("services", does_not_exist(*id));
        }
    }
    Ok(())
}
