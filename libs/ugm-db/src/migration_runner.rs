//! Migration runner with applied-version bookkeeping.
//!
//! Applied migration names are recorded in [`MIGRATIONS_TABLE`]; a migration
//! whose name is already recorded is skipped, so running the same list twice
//! is a no-op. Each migration runs in its own transaction together with its
//! bookkeeping row, so a failing migration leaves neither schema changes nor
//! a record behind on backends with transactional DDL.

use std::collections::HashSet;

use sea_orm::sea_query::{Alias, ColumnDef, Expr, Query, Table};
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use sea_orm_migration::{MigrationTrait, SchemaManager};
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::error::DbError;

pub const MIGRATIONS_TABLE: &str = "ugm_migrations";

async fn ensure_table(conn: &DatabaseConnection) -> Result<(), DbError> {
    let manager = SchemaManager::new(conn);
    manager
        .create_table(
            Table::create()
                .table(Alias::new(MIGRATIONS_TABLE))
                .if_not_exists()
                .col(
                    ColumnDef::new(Alias::new("version"))
                        .string()
                        .not_null()
                        .primary_key(),
                )
                .col(
                    ColumnDef::new(Alias::new("applied_at"))
                        .big_integer()
                        .not_null(),
                )
                .to_owned(),
        )
        .await?;
    Ok(())
}

async fn applied_versions(conn: &DatabaseConnection) -> Result<HashSet<String>, DbError> {
    let backend = conn.get_database_backend();
    let select = Query::select()
        .column(Alias::new("version"))
        .from(Alias::new(MIGRATIONS_TABLE))
        .to_owned();
    let rows = conn.query_all(backend.build(&select)).await?;
    let mut versions = HashSet::with_capacity(rows.len());
    for row in rows {
        versions.insert(row.try_get::<String>("", "version")?);
    }
    Ok(versions)
}

async fn record_version<C: ConnectionTrait>(conn: &C, name: &str) -> Result<(), DbError> {
    let backend = conn.get_database_backend();
    let insert = Query::insert()
        .into_table(Alias::new(MIGRATIONS_TABLE))
        .columns([Alias::new("version"), Alias::new("applied_at")])
        .values([
            Expr::value(name.to_owned()),
            Expr::value(OffsetDateTime::now_utc().unix_timestamp()),
        ])
        .map_err(|e| DbError::Query(e.to_string()))?
        .to_owned();
    conn.execute(backend.build(&insert)).await?;
    Ok(())
}

/// Apply `migrations` in order, skipping the ones already recorded.
///
/// Returns the number of migrations applied by this call.
///
/// # Errors
/// Returns [`DbError::Migration`] naming the first failing migration. Its
/// transaction is rolled back; the migrations before it stay applied.
pub async fn run_migrations(
    conn: &DatabaseConnection,
    migrations: Vec<Box<dyn MigrationTrait>>,
) -> Result<usize, DbError> {
    ensure_table(conn).await?;
    let applied = applied_versions(conn).await?;

    let mut count = 0;
    for migration in migrations {
        let name = migration.name().to_owned();
        if applied.contains(&name) {
            debug!(migration = %name, "already applied");
            continue;
        }
        let txn = conn.begin().await?;
        migration
            .up(&SchemaManager::new(&txn))
            .await
            .map_err(|source| DbError::Migration {
                name: name.clone(),
                source,
            })?;
        record_version(&txn, &name).await?;
        txn.commit().await?;
        info!(migration = %name, "migration applied");
        count += 1;
    }
    Ok(count)
}

/// Entry point used by test fixtures.
///
/// # Errors
/// See [`run_migrations`].
pub async fn run_migrations_for_testing(
    conn: &DatabaseConnection,
    migrations: Vec<Box<dyn MigrationTrait>>,
) -> Result<usize, DbError> {
    run_migrations(conn, migrations).await
}
