use crudcrate::{CRUDResource, EntityToModels};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, EntityToModels)]
#[sea_orm(table_name = "cargo_types")]
#[crudcrate(
    api_struct = "CargoType",
    name_singular = "cargo type",
    name_plural = "cargo types",
    description = "Kinds of cargo. A delivery may leave its cargo type unset.",
)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[crudcrate(primary_key, update_model = false, create_model = false, on_create = Uuid::new_v4())]
    pub id: Uuid,
    #[sea_orm(column_type = "String(StringLen::N(100))", nullable)]
    #[crudcrate(sortable, filterable, fulltext)]
    pub name: Option<String>,
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
