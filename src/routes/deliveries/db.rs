use super::models::{DeliveryStatus, TechnicalState};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "deliveries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub transport_model_id: Uuid,
    pub departure_datetime: DateTime<Utc>,
    pub arrival_datetime: DateTime<Utc>,
    #[sea_orm(column_type = "Decimal(Some((7, 2)))")]
    pub distance_km: Decimal,
    /// Path of the attachment relative to the media root
    pub media_file: String,
    pub status: DeliveryStatus,
    pub packaging_id: Uuid,
    pub cargo_type_id: Option<Uuid>,
    pub technical_state: TechnicalState,
    pub user_id: Uuid,
}

impl Model {
    /// Time spent between departure and arrival. Never stored.
    pub fn duration(&self) -> chrono::TimeDelta {
        self.arrival_datetime - self.departure_datetime
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::routes::lookups::transports::models::Entity",
        from = "Column::TransportModelId",
        to = "crate::routes::lookups::transports::models::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    TransportModel,
    #[sea_orm(
        belongs_to = "crate::routes::lookups::packaging::models::Entity",
        from = "Column::PackagingId",
        to = "crate::routes::lookups::packaging::models::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Packaging,
    #[sea_orm(
        belongs_to = "crate::routes::lookups::cargo::models::Entity",
        from = "Column::CargoTypeId",
        to = "crate::routes::lookups::cargo::models::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    CargoType,
    #[sea_orm(
        belongs_to = "crate::routes::users::db::Entity",
        from = "Column::UserId",
        to = "crate::routes::users::db::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    User,
    #[sea_orm(has_many = "super::delivery_services::Entity")]
    DeliveryServices,
}

impl Related<crate::routes::lookups::transports::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransportModel.def()
    }
}

impl Related<crate::routes::lookups::packaging::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Packaging.def()
    }
}

impl Related<crate::routes::lookups::cargo::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CargoType.def()
    }
}

impl Related<crate::routes::users::db::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::delivery_services::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeliveryServices.def()
    }
}

impl Related<crate::routes::lookups::services::models::Entity> for Entity {
    fn to() -> RelationDef {
        super::delivery_services::Relation::Service.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::delivery_services::Relation::Delivery.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
