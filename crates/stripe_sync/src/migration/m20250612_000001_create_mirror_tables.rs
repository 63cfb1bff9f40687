//! Initial migration: the accounts table plus one mirror table per object kind.
//!
//! Every mirror table shares the same column spine (id, account_id, object,
//! created, ..., metadata, raw, deleted, last_synced_at, updated_at) with a
//! composite primary key `(account_id, id)`. Kind-specific typed columns are
//! declared in `MIRROR_TABLES`; the full payload always lands in `raw`.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Extra typed columns a mirror table carries beyond the shared spine.
enum Extra {
    Text(&'static str),
    Big(&'static str),
    Bool(&'static str),
    Ts(&'static str),
}

use Extra::{Big, Bool, Text, Ts};

const MIRROR_TABLES: &[(&str, &[Extra])] = &[
    (
        "products",
        &[Text("name"), Text("description"), Bool("active")],
    ),
    (
        "prices",
        &[
            Text("product"),
            Text("currency"),
            Big("unit_amount"),
            Text("type"),
            Bool("active"),
        ],
    ),
    (
        "plans",
        &[
            Text("product"),
            Text("currency"),
            Big("amount"),
            Text("interval"),
            Bool("active"),
        ],
    ),
    (
        "customers",
        &[
            Text("email"),
            Text("name"),
            Text("description"),
            Text("currency"),
            Big("balance"),
            Bool("delinquent"),
        ],
    ),
    ("payment_methods", &[Text("customer"), Text("type")]),
    (
        "subscriptions",
        &[
            Text("customer"),
            Text("status"),
            Text("currency"),
            Ts("current_period_start"),
            Ts("current_period_end"),
            Bool("cancel_at_period_end"),
        ],
    ),
    (
        "subscription_items",
        &[Text("subscription"), Text("price"), Big("quantity")],
    ),
    (
        "subscription_schedules",
        &[Text("customer"), Text("subscription"), Text("status")],
    ),
    (
        "checkout_sessions",
        &[
            Text("customer"),
            Text("subscription"),
            Text("payment_intent"),
            Text("status"),
            Text("mode"),
        ],
    ),
    (
        "invoices",
        &[
            Text("customer"),
            Text("subscription"),
            Text("status"),
            Text("currency"),
            Big("total"),
            Big("amount_due"),
            Big("amount_paid"),
        ],
    ),
    (
        "payment_intents",
        &[
            Text("customer"),
            Text("invoice"),
            Text("status"),
            Text("currency"),
            Big("amount"),
        ],
    ),
    (
        "charges",
        &[
            Text("customer"),
            Text("invoice"),
            Text("payment_intent"),
            Text("status"),
            Text("currency"),
            Big("amount"),
            Bool("paid"),
            Bool("refunded"),
        ],
    ),
    (
        "setup_intents",
        &[Text("customer"), Text("payment_method"), Text("status")],
    ),
    (
        "refunds",
        &[
            Text("charge"),
            Text("payment_intent"),
            Text("status"),
            Text("currency"),
            Big("amount"),
        ],
    ),
    (
        "disputes",
        &[
            Text("charge"),
            Text("payment_intent"),
            Text("status"),
            Text("reason"),
            Text("currency"),
            Big("amount"),
        ],
    ),
    (
        "credit_notes",
        &[
            Text("customer"),
            Text("invoice"),
            Text("status"),
            Text("currency"),
            Big("total"),
        ],
    ),
    (
        "early_fraud_warnings",
        &[
            Text("charge"),
            Text("payment_intent"),
            Text("fraud_type"),
            Bool("actionable"),
        ],
    ),
    (
        "tax_ids",
        &[
            Text("customer"),
            Text("type"),
            Text("value"),
            Text("country"),
        ],
    ),
];

/// Lookup indexes on the most commonly joined parent-reference columns.
const PARENT_INDEXES: &[(&str, &str)] = &[
    ("prices", "product"),
    ("subscriptions", "customer"),
    ("invoices", "customer"),
    ("charges", "customer"),
    ("payment_methods", "customer"),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_accounts(manager).await?;

        for (name, extras) in MIRROR_TABLES {
            manager.create_table(mirror_table(name, extras)).await?;
        }

        for (table, column) in PARENT_INDEXES {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(format!("idx_{}_{}", table, column))
                        .table(Alias::new(*table))
                        .col(Alias::new(*column))
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, _) in MIRROR_TABLES.iter().rev() {
            manager
                .drop_table(Table::drop().table(Alias::new(*name)).if_exists().to_owned())
                .await?;
        }
        manager
            .drop_table(
                Table::drop()
                    .table(Alias::new("accounts"))
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}

impl Migration {
    async fn create_accounts(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("accounts"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .text()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alias::new("object")).text().null())
                    .col(
                        ColumnDef::new(Alias::new("created"))
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Alias::new("business_type")).text().null())
                    .col(ColumnDef::new(Alias::new("country")).text().null())
                    .col(ColumnDef::new(Alias::new("email")).text().null())
                    .col(ColumnDef::new(Alias::new("metadata")).json_binary().null())
                    .col(ColumnDef::new(Alias::new("raw")).json_binary().null())
                    .col(
                        ColumnDef::new(Alias::new("deleted"))
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Alias::new("last_synced_at"))
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Alias::new("updated_at"))
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await
    }
}

/// Build the create-table statement for one mirror table.
fn mirror_table(name: &str, extras: &[Extra]) -> TableCreateStatement {
    let mut table = Table::create();
    table
        .table(Alias::new(name))
        .if_not_exists()
        .col(ColumnDef::new(Alias::new("id")).text().not_null())
        .col(ColumnDef::new(Alias::new("account_id")).text().not_null())
        .col(ColumnDef::new(Alias::new("object")).text().null())
        .col(
            ColumnDef::new(Alias::new("created"))
                .timestamp_with_time_zone()
                .null(),
        );

    for extra in extras {
        match extra {
            Extra::Text(col) => table.col(ColumnDef::new(Alias::new(*col)).text().null()),
            Extra::Big(col) => table.col(ColumnDef::new(Alias::new(*col)).big_integer().null()),
            Extra::Bool(col) => table.col(ColumnDef::new(Alias::new(*col)).boolean().null()),
            Extra::Ts(col) => table.col(
                ColumnDef::new(Alias::new(*col))
                    .timestamp_with_time_zone()
                    .null(),
            ),
        };
    }

    table
        .col(ColumnDef::new(Alias::new("metadata")).json_binary().null())
        .col(ColumnDef::new(Alias::new("raw")).json_binary().null())
        .col(
            ColumnDef::new(Alias::new("deleted"))
                .boolean()
                .not_null()
                .default(false),
        )
        .col(
            ColumnDef::new(Alias::new("last_synced_at"))
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .col(
            ColumnDef::new(Alias::new("updated_at"))
                .timestamp_with_time_zone()
                .null(),
        )
        .primary_key(
            Index::create()
                .col(Alias::new("account_id"))
                .col(Alias::new("id")),
        )
        .foreign_key(
            ForeignKey::create()
                .name(format!("fk_{}_account", name))
                .from(Alias::new(name), Alias::new("account_id"))
                .to(Alias::new("accounts"), Alias::new("id")),
        );

    table.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::object_kind::{BACKFILL_ORDER, ObjectKind};

    #[test]
    fn every_object_kind_has_a_mirror_table() {
        for kind in BACKFILL_ORDER
            .iter()
            .chain([ObjectKind::SubscriptionItem].iter())
        {
            assert!(
                MIRROR_TABLES.iter().any(|(name, _)| *name == kind.table_name()),
                "missing mirror table for {kind}"
            );
        }
        assert_eq!(MIRROR_TABLES.len(), 18);
    }
}
