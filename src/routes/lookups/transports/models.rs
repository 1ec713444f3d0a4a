use crate::common::errors::BusinessError;
use crate::validation_error;
use crudcrate::{CRUDResource, EntityToModels};
use sea_orm::entity::prelude::*;

/// Letters allowed on a registration plate: the Cyrillic letters that have a
/// Latin look-alike.
pub const PLATE_LETTERS: &str = "АВЕКМНОРСТУХ";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, EntityToModels)]
#[sea_orm(table_name = "transport_models")]
#[crudcrate(
    api_struct = "TransportModel",
    name_singular = "transport",
    name_plural = "transports",
    description = "Vehicles available for deliveries, identified by their registration plate.",
)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[crudcrate(primary_key, update_model = false, create_model = false, on_create = Uuid::new_v4())]
    pub id: Uuid,
    #[sea_orm(unique, column_type = "String(StringLen::N(6))")]
    #[crudcrate(sortable, filterable, fulltext)]
    pub plate_number: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "crate::routes::deliveries::db::Entity")]
    Deliveries,
}

impl Related<crate::routes::deliveries::db::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deliveries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

fn is_plate_letter(c: char) -> bool {
    PLATE_LETTERS.contains(c)
}

/// Checks the plate against the `letter, three digits, two letters` layout,
/// e.g. `А123ВС`.
pub fn validate_plate_number(plate: &str) -> Result<(), BusinessError> {
    let chars: Vec<char> = plate.chars().collect();
    let well_formed = chars.len() == 6
        && is_plate_letter(chars[0])
        && chars[1..4].iter().all(char::is_ascii_digit)
        && chars[4..].iter().copied().all(is_plate_letter);

    if well_formed {
        Ok(())
    } else {
        Err(validation_error!(
            "plate_number",
            format!(
                "Plate must be 1 letter, 3 digits and 2 letters (letters from {}).",
                PLATE_LETTERS
                    .chars()
                    .map(String::from)
                    .collect::<Vec<_>>()
                    .join(",")
            )
        ))
    }
}
