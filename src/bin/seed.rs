use cart_ledger_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    services::auth_service::hash_password,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    let url = config.database_url()?;

    let orm = create_orm_conn(url, config.db_max_connections).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;
    let pool = create_pool(url, config.db_max_connections).await?;

    let admin_id = ensure_user_with_role(&pool, "admin@example.com", "admin123", "admin").await?;
    let user_id = ensure_user_with_role(&pool, "user@example.com", "user123", "user").await?;
    seed_warehouse(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user_with_role(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(id)
}

async fn seed_warehouse(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    // (product, variant, sku, name, color, size, location, current, reserved, reorder)
    let items = vec![
        ("hoodie", "hoodie-black-m", "HD-BLK-M", "Axum Hoodie", "black", "M", "A-01-1", 40, 4, 10),
        ("hoodie", "hoodie-black-l", "HD-BLK-L", "Axum Hoodie", "black", "L", "A-01-2", 6, 1, 10),
        ("tee", "tee-orange-s", "TE-ORG-S", "Ferris Tee", "orange", "S", "B-03-1", 0, 0, 5),
        ("tee", "tee-orange-m", "TE-ORG-M", "Ferris Tee", "orange", "M", "B-03-2", 120, 20, 15),
        ("cap", "cap-grey-os", "CP-GRY-OS", "Crab Cap", "grey", "OS", "C-07-4", 12, 0, 12),
    ];

    for (product, variant, sku, name, color, size, location, current, reserved, reorder) in items {
        sqlx::query(
            r#"
            INSERT INTO warehouse_items
                (id, product_id, variant_id, sku, product_name, color, size, location,
                 current_stock, reserved_stock, reorder_level)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (product_id, variant_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(product)
        .bind(variant)
        .bind(sku)
        .bind(name)
        .bind(color)
        .bind(size)
        .bind(location)
        .bind(current)
        .bind(reserved)
        .bind(reorder)
        .execute(pool)
        .await?;
    }

    println!("Seeded warehouse items");
    Ok(())
}
