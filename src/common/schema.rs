use crate::routes::deliveries::{db as deliveries, delivery_services};
use crate::routes::lookups::{cargo, packaging, services, transports};
use crate::routes::users::db as users;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Schema};

/// Creates every table that does not exist yet, parents before children so
/// the foreign keys resolve.
pub async fn create_tables(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut statements = vec![
        schema.create_table_from_entity(users::Entity),
        schema.create_table_from_entity(transports::models::Entity),
        schema.create_table_from_entity(packaging::models::Entity),
        schema.create_table_from_entity(cargo::models::Entity),
        schema.create_table_from_entity(services::models::Entity),
        schema.create_table_from_entity(deliveries::Entity),
        schema.create_table_from_entity(delivery_services::Entity),
    ];

    for statement in &mut statements {
        statement.if_not_exists();
        db.execute(backend.build(&*statement)).await?;
    }

    tracing::info!("Schema ready ({} tables checked)", statements.len());
    Ok(())
}
