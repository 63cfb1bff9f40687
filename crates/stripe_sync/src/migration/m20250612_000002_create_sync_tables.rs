//! Sync bookkeeping tables: cursors, runs, per-object runs, managed webhooks.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_sync_status(manager).await?;
        self.create_sync_run(manager).await?;
        self.create_sync_obj_run(manager).await?;
        self.create_managed_webhooks(manager).await?;

        // At most one open run per account. sea_query cannot express a
        // partial unique index, and the same SQL is valid on both Postgres
        // and SQLite.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS _sync_run_one_open \
                 ON _sync_run (account_id) WHERE closed_at IS NULL",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in ["_managed_webhooks", "_sync_obj_run", "_sync_run", "_sync_status"] {
            manager
                .drop_table(Table::drop().table(Alias::new(table)).if_exists().to_owned())
                .await?;
        }
        Ok(())
    }
}

impl Migration {
    async fn create_sync_status(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("_sync_status"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("resource")).text().not_null())
                    .col(ColumnDef::new(Alias::new("account_id")).text().not_null())
                    .col(
                        ColumnDef::new(Alias::new("last_synced_object_id"))
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("updated_at"))
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(Alias::new("resource"))
                            .col(Alias::new("account_id")),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn create_sync_run(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("_sync_run"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alias::new("account_id")).text().not_null())
                    .col(
                        ColumnDef::new(Alias::new("started_at"))
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Alias::new("completed_at"))
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("closed_at"))
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("max_concurrent"))
                            .integer()
                            .not_null()
                            .default(4),
                    )
                    .col(ColumnDef::new(Alias::new("triggered_by")).text().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_sync_run_account")
                    .table(Alias::new("_sync_run"))
                    .col(Alias::new("account_id"))
                    .to_owned(),
            )
            .await
    }

    async fn create_sync_obj_run(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("_sync_obj_run"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("run_id")).big_integer().not_null())
                    .col(ColumnDef::new(Alias::new("resource")).text().not_null())
                    .col(
                        ColumnDef::new(Alias::new("status"))
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Alias::new("processed_count"))
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Alias::new("error_message")).text().null())
                    .col(
                        ColumnDef::new(Alias::new("updated_at"))
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(Alias::new("run_id"))
                            .col(Alias::new("resource")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sync_obj_run_run")
                            .from(Alias::new("_sync_obj_run"), Alias::new("run_id"))
                            .to(Alias::new("_sync_run"), Alias::new("id")),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn create_managed_webhooks(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("_managed_webhooks"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .text()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alias::new("account_id")).text().not_null())
                    .col(ColumnDef::new(Alias::new("url")).text().not_null())
                    .col(
                        ColumnDef::new(Alias::new("enabled_events"))
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_managed_webhooks_account_url")
                    .table(Alias::new("_managed_webhooks"))
                    .col(Alias::new("account_id"))
                    .col(Alias::new("url"))
                    .unique()
                    .to_owned(),
            )
            .await
    }
}
