pub use sea_orm_migration::prelude::*;

mod m20240105_000001_create_accounts;
mod m20240112_000002_create_invoices;
mod m20240120_000003_index_invoices_by_account;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240105_000001_create_accounts::Migration),
            Box::new(m20240112_000002_create_invoices::Migration),
            Box::new(m20240120_000003_index_invoices_by_account::Migration),
        ]
    }
}
