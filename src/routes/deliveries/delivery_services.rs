use sea_orm::entity::prelude::*;

/// Link rows for the many-to-many between deliveries and services.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "delivery_services")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub delivery_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub service_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::db::Entity",
        from = "Column::DeliveryId",
        to = "super::db::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Delivery,
    #[sea_orm(
        belongs_to = "crate::routes::lookups::services::models::Entity",
        from = "Column::ServiceId",
        to = "crate::routes::lookups::services::models::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Service,
}

impl Related<super::db::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Delivery.def()
    }
}

impl Related<crate::routes::lookups::services::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Service.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
