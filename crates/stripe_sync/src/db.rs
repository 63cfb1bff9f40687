//! Database connection utilities and advisory locking.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, OnceLock};

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr,
    Statement, TransactionTrait,
};

use crate::config::SyncConfig;
use crate::migration::{Migrator, MigratorTrait};

/// Configure SQLite-specific pragmas for better concurrency.
///
/// This sets:
/// - `journal_mode=WAL` - readers don't block writers
/// - `busy_timeout=5000` - wait up to 5 seconds for locks instead of failing
/// - `foreign_keys=ON` - mirror tables reference `accounts`
async fn configure_sqlite(db: &DatabaseConnection) -> Result<(), DbErr> {
    for pragma in [
        "PRAGMA journal_mode=WAL",
        "PRAGMA busy_timeout=5000",
        "PRAGMA foreign_keys=ON",
    ] {
        db.execute(Statement::from_string(
            db.get_database_backend(),
            pragma.to_string(),
        ))
        .await?;
    }
    Ok(())
}

/// Establish a connection to the database.
///
/// On Postgres the configured schema is pinned via `search_path`, so the
/// unqualified table names used throughout the crate resolve inside it. An
/// empty schema leaves the search path alone.
///
/// # Errors
/// Returns `DbErr` if the connection cannot be established.
pub async fn connect(config: &SyncConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(&config.database_url);
    options.max_connections(config.pool_max);

    if config.database_url.starts_with("postgres") && !config.schema.is_empty() {
        options.set_schema_search_path(format!("{},public", config.schema));
    }

    let db = Database::connect(options).await?;

    if config.database_url.starts_with("sqlite") {
        configure_sqlite(&db).await?;
    }

    Ok(db)
}

/// Establish a connection and run all pending migrations.
///
/// This is the recommended way to initialize the database. On Postgres the
/// configured schema is created first so migrations land inside it.
///
/// # Errors
/// Returns `DbErr` if the connection cannot be established or migrations
/// fail; a failed migration leaves the ledger unchanged for that migration.
pub async fn connect_and_migrate(config: &SyncConfig) -> Result<DatabaseConnection, DbErr> {
    let db = connect(config).await?;
    migrate(&db, config).await?;
    Ok(db)
}

/// Apply all pending migrations, creating the Postgres schema first.
pub async fn migrate(db: &DatabaseConnection, config: &SyncConfig) -> Result<(), DbErr> {
    if db.get_database_backend() == DatabaseBackend::Postgres && !config.schema.is_empty() {
        // The schema name is validated by SyncConfig::validate, so it is
        // safe to interpolate.
        db.execute_unprepared(&format!("CREATE SCHEMA IF NOT EXISTS {}", config.schema))
            .await?;
    }

    Migrator::up(db, None).await
}

/// Derive a signed 64-bit advisory-lock key from an account id and a scope
/// string (e.g. a webhook base URL).
pub fn lock_key(account_id: &str, scope: &str) -> i64 {
    let mut hasher = DefaultHasher::new();
    account_id.hash(&mut hasher);
    scope.hash(&mut hasher);
    hasher.finish() as i64
}

fn local_lock(key: i64) -> Arc<tokio::sync::Mutex<()>> {
    static LOCKS: OnceLock<Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>> = OnceLock::new();
    let locks = LOCKS.get_or_init(|| Mutex::new(HashMap::new()));
    let mut map = locks.lock().unwrap_or_else(|e| e.into_inner());
    Arc::clone(map.entry(key).or_default())
}

/// Run `f` while holding the advisory lock identified by `key`.
///
/// On Postgres this takes `pg_advisory_xact_lock` inside a dedicated
/// transaction, which releases the lock at commit even if `f` fails. Other
/// backends are single-process in practice, so the lock degrades to a
/// process-local keyed mutex.
pub async fn with_advisory_lock<T, E, F, Fut>(
    db: &DatabaseConnection,
    key: i64,
    f: F,
) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<DbErr>,
{
    match db.get_database_backend() {
        DatabaseBackend::Postgres => {
            let lock_txn = db.begin().await.map_err(E::from)?;
            lock_txn
                .execute(Statement::from_sql_and_values(
                    DatabaseBackend::Postgres,
                    "SELECT pg_advisory_xact_lock($1)",
                    [key.into()],
                ))
                .await
                .map_err(E::from)?;

            let result = f().await;

            // Commit releases the lock regardless of the outcome of f.
            lock_txn.commit().await.map_err(E::from)?;
            result
        }
        _ => {
            let lock = local_lock(key);
            let _guard = lock.lock().await;
            f().await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;

    #[test]
    fn lock_key_is_stable_and_scope_sensitive() {
        let a = lock_key("acct_1", "https://x.example/hook");
        assert_eq!(a, lock_key("acct_1", "https://x.example/hook"));
        assert_ne!(a, lock_key("acct_2", "https://x.example/hook"));
        assert_ne!(a, lock_key("acct_1", "https://y.example/hook"));
    }

    #[tokio::test]
    async fn connect_returns_error_for_invalid_database_url() {
        let config = SyncConfig::new("sk_test", "this-is-not-a-db-url");
        let err = connect(&config).await.expect_err("invalid URL should error");
        let msg = err.to_string().to_ascii_lowercase();
        assert!(
            msg.contains("error") || msg.contains("invalid"),
            "unexpected error message: {err}"
        );
    }

    #[tokio::test]
    async fn advisory_lock_serializes_local_critical_sections() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let config = SyncConfig::new("sk_test", "sqlite::memory:");
        let db = connect(&config).await.expect("sqlite connect");
        let db = std::sync::Arc::new(db);

        let in_flight = std::sync::Arc::new(AtomicUsize::new(0));
        let peak = std::sync::Arc::new(AtomicUsize::new(0));
        let key = lock_key("acct_test", "serialize");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let db = std::sync::Arc::clone(&db);
            let in_flight = std::sync::Arc::clone(&in_flight);
            let peak = std::sync::Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                with_advisory_lock::<_, DbErr, _, _>(&db, key, || async {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
            }));
        }
        for handle in handles {
            handle.await.expect("task").expect("lock section");
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1, "critical sections overlapped");
    }
}
