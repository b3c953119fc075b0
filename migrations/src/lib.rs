pub use sea_orm_migration::prelude::*;

mod m20240301_000001_create_identity_tables;
mod m20240301_000002_create_catalog_tables;
mod m20240301_000003_create_orders_tables;
mod m20240301_000004_create_fulfillment_tables;
mod m20240301_000005_create_notifications_table;
mod m20240301_000006_create_outbox_table;
mod m20240301_000007_add_workflow_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_identity_tables::Migration),
            Box::new(m20240301_000002_create_catalog_tables::Migration),
            Box::new(m20240301_000003_create_orders_tables::Migration),
            Box::new(m20240301_000004_create_fulfillment_tables::Migration),
            Box::new(m20240301_000005_create_notifications_table::Migration),
            Box::new(m20240301_000006_create_outbox_table::Migration),
            Box::new(m20240301_000007_add_workflow_indexes::Migration),
        ]
    }
}
