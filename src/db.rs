use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, Statement,
    TransactionTrait,
};
use sqlx::postgres::PgPoolOptions;
use tokio::fs;

pub type DbPool = sqlx::PgPool;

const MIGRATIONS_DIR: &str = "migrations";

/// SeaORM connection used by the repositories.
pub async fn create_orm_conn(database_url: &str, max_connections: u32) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .max_connections(max_connections)
        .connect_timeout(Duration::from_secs(5))
        .sqlx_logging(false);
    let conn = Database::connect(options).await?;
    Ok(conn)
}

/// Raw sqlx pool, used for the audit trail.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Applies every `migrations/*.sql` file not yet recorded in `schema_migrations`, in filename
/// order. Each file runs in its own transaction together with its bookkeeping row.
pub async fn run_migrations(conn: &DatabaseConnection) -> Result<()> {
    let backend = conn.get_database_backend();
    conn.execute(Statement::from_string(
        backend,
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
    ))
    .await?;

    for file in migration_files(Path::new(MIGRATIONS_DIR)).await? {
        let version = file
            .file_name()
            .and_then(|name| name.to_str())
            .context("migration file name is not valid UTF-8")?
            .to_string();

        let applied = conn
            .query_one(Statement::from_sql_and_values(
                backend,
                "SELECT version FROM schema_migrations WHERE version = $1",
                [version.clone().into()],
            ))
            .await?;
        if applied.is_some() {
            continue;
        }

        let sql = fs::read_to_string(&file).await?;
        let txn = conn.begin().await?;
        for stmt in split_statements(&sql) {
            txn.execute(Statement::from_string(backend, format!("{stmt};")))
                .await
                .with_context(|| format!("migration {version} failed"))?;
        }
        txn.execute(record_version(backend, &version)).await?;
        txn.commit().await?;
        tracing::info!(%version, "migration applied");
    }

    Ok(())
}

async fn migration_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("cannot read {}", dir.display()))?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "sql") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn record_version(backend: DbBackend, version: &str) -> Statement {
    Statement::from_sql_and_values(
        backend,
        "INSERT INTO schema_migrations (version) VALUES ($1)",
        [version.into()],
    )
}

/// Postgres prepared statements hold a single command, so files are split on `;`.
/// Migration files therefore keep semicolons out of string literals and bodies.
fn split_statements(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(';').map(str::trim).filter(|stmt| !stmt.is_empty())
}
