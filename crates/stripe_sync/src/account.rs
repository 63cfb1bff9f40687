//! Acting-account resolution and `accounts` row maintenance.
//!
//! The resolver asks the provider once per engine lifetime who the
//! credential acts as; webhook-observed accounts are upserted as id-only
//! stubs and filled in when their full payload shows up.

use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, EntityTrait, Set};
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::entity::account;
use crate::error::SyncError;
use crate::project::fields;
use crate::project::mirror_on_conflict;
use crate::stripe::StripeClient;

/// Resolves and caches the acting account id for the engine's lifetime.
#[derive(Debug, Default)]
pub struct AccountResolver {
    cached: OnceCell<String>,
}

impl AccountResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The acting account id, fetched from the provider on first call.
    pub async fn account_id(&self, client: &StripeClient) -> Result<String, SyncError> {
        let id = self
            .cached
            .get_or_try_init(|| async {
                let account = client.retrieve_account().await?;
                tracing::info!(account_id = %account.id, "Resolved acting account");
                Ok::<_, SyncError>(account.id)
            })
            .await?;
        Ok(id.clone())
    }

    /// The cached id, if the provider has been asked already.
    pub fn cached(&self) -> Option<&str> {
        self.cached.get().map(String::as_str)
    }
}

/// Make sure an `accounts` row exists for `id`, inserting a stub if needed.
///
/// Mirror rows reference `accounts.id`, so this runs before any projection
/// for a newly observed account.
pub(crate) async fn ensure_account(
    conn: &impl ConnectionTrait,
    id: &str,
) -> Result<(), SyncError> {
    let model = account::ActiveModel {
        id: Set(id.to_string()),
        last_synced_at: Set(fields::now()),
        ..Default::default()
    };
    account::Entity::insert(model)
        .on_conflict(
            OnConflict::column(account::Column::Id)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

/// Project a full account payload into the `accounts` row.
pub(crate) async fn upsert_account(
    conn: &impl ConnectionTrait,
    obj: &Value,
) -> Result<(), SyncError> {
    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| SyncError::Provider("account payload has no string id".to_string()))?;

    let model = account::ActiveModel {
        id: Set(id.to_string()),
        object: Set(fields::str_field(obj, "object")),
        created: Set(fields::ts_field(obj, "created")),
        business_type: Set(fields::str_field(obj, "business_type")),
        country: Set(fields::str_field(obj, "country")),
        email: Set(fields::str_field(obj, "email")),
        metadata: Set(fields::metadata(obj)),
        raw: Set(Some(obj.clone())),
        deleted: Set(fields::is_deleted(obj)),
        last_synced_at: Set(fields::now()),
        updated_at: Set(Some(fields::now())),
    };
    account::Entity::insert(model)
        .on_conflict(mirror_on_conflict::<account::Entity>())
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpMethod, MockTransport};
    use std::sync::Arc;

    #[tokio::test]
    async fn resolver_caches_the_first_answer() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Get,
            "https://api.stripe.com/v1/account",
            &serde_json::json!({"id": "acct_cached", "object": "account"}),
        );
        let client =
            StripeClient::with_transport(Arc::new(transport.clone()), "sk_test", None);

        let resolver = AccountResolver::new();
        assert_eq!(resolver.cached(), None);

        let first = resolver.account_id(&client).await.expect("first resolve");
        // A second call must not hit the provider again; the mock has no
        // second response registered, so a re-fetch would error.
        let second = resolver.account_id(&client).await.expect("cached resolve");

        assert_eq!(first, "acct_cached");
        assert_eq!(second, "acct_cached");
        assert_eq!(resolver.cached(), Some("acct_cached"));
        assert_eq!(transport.requests().len(), 1);
    }
}
