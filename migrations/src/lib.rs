pub use sea_orm_migration::prelude::*;

mod m20240301_000001_create_reference_tables;
mod m20240301_000002_create_school_requests_table;
mod m20240301_000003_create_quotes_table;
mod m20240301_000004_create_quotations_table;
mod m20240301_000005_create_assignments_and_payments_tables;
mod m20240301_000006_create_notices_and_notifications_tables;
mod m20240301_000007_create_document_sequences_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_reference_tables::Migration),
            Box::new(m20240301_000002_create_school_requests_table::Migration),
            Box::new(m20240301_000003_create_quotes_table::Migration),
            Box::new(m20240301_000004_create_quotations_table::Migration),
            Box::new(m20240301_000005_create_assignments_and_payments_tables::Migration),
            Box::new(m20240301_000006_create_notices_and_notifications_tables::Migration),
            Box::new(m20240301_000007_create_document_sequences_table::Migration),
        ]
    }
}
