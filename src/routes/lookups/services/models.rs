use crudcrate::{CRUDResource, EntityToModels};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, EntityToModels)]
#[sea_orm(table_name = "services")]
#[crudcrate(
    api_struct = "Service",
    name_singular = "service",
    name_plural = "services",
    description = "Extra services that can be attached to a delivery, e.g. express or insurance.",
)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[crudcrate(primary_key, update_model = false, create_model = false, on_create = Uuid::new_v4())]
    pub id: Uuid,
    #[sea_orm(column_type = "String(StringLen::N(100))")]
    #[crudcrate(sortable, filterable, fulltext)]
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "crate::routes::deliveries::delivery_services::Entity")]
    DeliveryServices,
}

impl Related<crate::routes::deliveries::delivery_services::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeliveryServices.def()
    }
}

impl Related<crate::routes::deliveries::db::Entity> for Entity {
    fn to() -> RelationDef {
        crate::routes::deliveries::delivery_services::Relation::Delivery.def()
    }

    fn via() -> Option<RelationDef> {
        Some(crate::routes::deliveries::delivery_services::Relation::Service.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
