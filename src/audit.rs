use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

/// Append-only trail of cart and stock mutations.
///
/// Without a pool (memory backend) entries only go to the tracing subscriber.
#[derive(Clone, Default)]
pub struct AuditLog {
    pool: Option<DbPool>,
}

impl AuditLog {
    pub fn postgres(pool: DbPool) -> Self {
        Self { pool: Some(pool) }
    }

    pub fn disabled() -> Self {
        Self { pool: None }
    }

    pub async fn record(
        &self,
        actor: Option<&str>,
        action: &str,
        resource: Option<&str>,
        metadata: Option<Value>,
    ) -> AppResult<()> {
        let Some(pool) = &self.pool else {
            tracing::debug!(actor, action, resource, ?metadata, "audit");
            return Ok(());
        };

        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, actor, action, resource, metadata)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(actor)
        .bind(action)
        .bind(resource)
        .bind(metadata)
        .execute(pool)
        .await?;

        Ok(())
    }
}
