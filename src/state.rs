use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    audit::AuditLog,
    config::{AppConfig, StorageBackend},
    db::{DbPool, create_orm_conn, create_pool, run_migrations},
    repository::{
        InMemoryCartRepository, InMemoryUserRepository, InMemoryWarehouseRepository,
        SeaOrmCartRepository, SeaOrmUserRepository, SeaOrmWarehouseRepository, UserRepository,
    },
    services::{CartService, WarehouseLedger},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub carts: CartService,
    pub warehouse: WarehouseLedger,
    pub users: Arc<dyn UserRepository>,
    pub audit: AuditLog,
}

impl AppState {
    pub fn postgres(config: AppConfig, orm: DatabaseConnection, pool: DbPool) -> Self {
        let audit = AuditLog::postgres(pool);
        Self {
            config: Arc::new(config),
            carts: CartService::new(Arc::new(SeaOrmCartRepository::new(orm.clone())), audit.clone()),
            warehouse: WarehouseLedger::new(
                Arc::new(SeaOrmWarehouseRepository::new(orm.clone())),
                audit.clone(),
            ),
            users: Arc::new(SeaOrmUserRepository::new(orm)),
            audit,
        }
    }

    pub fn in_memory(config: AppConfig) -> Self {
        let audit = AuditLog::disabled();
        Self {
            config: Arc::new(config),
            carts: CartService::new(Arc::new(InMemoryCartRepository::new()), audit.clone()),
            warehouse: WarehouseLedger::new(
                Arc::new(InMemoryWarehouseRepository::new()),
                audit.clone(),
            ),
            users: Arc::new(InMemoryUserRepository::new()),
            audit,
        }
    }

    /// Connects and migrates as the configured backend requires.
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        match config.storage {
            StorageBackend::Memory => Ok(Self::in_memory(config)),
            StorageBackend::Postgres => {
                let url = config.database_url()?.to_owned();
                let orm = create_orm_conn(&url, config.db_max_connections).await?;
                run_migrations(&orm).await?;
                let pool = create_pool(&url, config.db_max_connections).await?;
                Ok(Self::postgres(config, orm, pool))
            }
        }
    }
}
