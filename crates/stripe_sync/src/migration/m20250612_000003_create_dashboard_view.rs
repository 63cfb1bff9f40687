//! The `sync_dashboard` view: run rows with a derived status column.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

const VIEW_BODY: &str = "SELECT \
     r.id AS run_id, \
     r.account_id, \
     r.started_at, \
     r.completed_at, \
     r.closed_at, \
     r.max_concurrent, \
     r.triggered_by, \
     CASE \
       WHEN r.closed_at IS NULL THEN 'running' \
       WHEN EXISTS ( \
         SELECT 1 FROM _sync_obj_run o \
         WHERE o.run_id = r.id AND o.status = 'error' \
       ) THEN 'error' \
       ELSE 'complete' \
     END AS status \
   FROM _sync_run r";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Postgres has no CREATE VIEW IF NOT EXISTS; SQLite has no OR REPLACE.
        let create = match manager.get_database_backend() {
            DatabaseBackend::Postgres => "CREATE OR REPLACE VIEW sync_dashboard AS",
            _ => "CREATE VIEW IF NOT EXISTS sync_dashboard AS",
        };
        manager
            .get_connection()
            .execute_unprepared(&format!("{} {}", create, VIEW_BODY))
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP VIEW IF EXISTS sync_dashboard")
            .await?;
        Ok(())
    }
}
