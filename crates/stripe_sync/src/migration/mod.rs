//! Database migrations for the mirror schema.
//!
//! Migrations are applied in name order and recorded once each in the
//! `_migrations` ledger. Every migration is individually idempotent
//! (`IF NOT EXISTS` throughout) so an operator can re-run after a crash that
//! left the ledger write uncommitted.

pub use sea_orm_migration::prelude::*;

mod m20250612_000001_create_mirror_tables;
mod m20250612_000002_create_sync_tables;
mod m20250612_000003_create_dashboard_view;

/// The migrator that runs all migrations.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250612_000001_create_mirror_tables::Migration),
            Box::new(m20250612_000002_create_sync_tables::Migration),
            Box::new(m20250612_000003_create_dashboard_view::Migration),
        ]
    }

    fn migration_table_name() -> SeaRc<dyn Iden> {
        SeaRc::new(Alias::new("_migrations"))
    }
}
