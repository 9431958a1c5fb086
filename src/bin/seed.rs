use fashion_storefront_api::{
    config::AppConfig,
    db::{DbPool, create_pool, run_migrations},
    services::auth_service::hash_password,
};
use uuid::Uuid;

struct DemoProduct {
    name: &'static str,
    description: &'static str,
    price: i64,
    category: &'static str,
    image_url: &'static str,
    stock_quantity: i32,
}

const CATALOG: &[DemoProduct] = &[
    DemoProduct {
        name: "Premium Cotton Hoodie",
        description: "Ultra-soft cotton blend hoodie with a relaxed fit.",
        price: 8999,
        category: "Hoodies",
        image_url: "https://images.unsplash.com/photo-1556821840-3a63f95609a7?w=400&h=500&fit=crop",
        stock_quantity: 15,
    },
    DemoProduct {
        name: "Classic Denim Jacket",
        description: "Timeless denim jacket with a vintage wash, made for layering.",
        price: 12999,
        category: "Jackets",
        image_url: "https://images.unsplash.com/photo-1544966503-7cc5ac882d5f?w=400&h=500&fit=crop",
        stock_quantity: 8,
    },
    DemoProduct {
        name: "Silk Blouse",
        description: "Elegant silk blouse with a flowing cut for office or evening.",
        price: 14999,
        category: "Blouses",
        image_url: "https://images.unsplash.com/photo-1594633312681-425c7b97ccd1?w=400&h=500&fit=crop",
        stock_quantity: 12,
    },
    DemoProduct {
        name: "High-Waist Jeans",
        description: "Premium denim with a high-waist cut that pairs with any top.",
        price: 11999,
        category: "Jeans",
        image_url: "https://images.unsplash.com/photo-1541099649105-f69ad21f3246?w=400&h=500&fit=crop",
        stock_quantity: 20,
    },
    DemoProduct {
        name: "Casual T-Shirt",
        description: "Comfortable cotton t-shirt with a modern fit.",
        price: 2999,
        category: "T-Shirts",
        image_url: "https://images.unsplash.com/photo-1521572163474-6864f9cf17ab?w=400&h=500&fit=crop",
        stock_quantity: 0,
    },
    DemoProduct {
        name: "Formal Blazer",
        description: "Sophisticated blazer for business meetings and formal events.",
        price: 19999,
        category: "Blazers",
        image_url: "https://images.unsplash.com/photo-1507003211169-0a1dd7228f2d?w=400&h=500&fit=crop",
        stock_quantity: 6,
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url, 2).await?;
    run_migrations(&pool).await?;

    let admin_id = ensure_user(
        &pool,
        "admin@example.com",
        "admin1234",
        "Store",
        "Admin",
        "admin",
    )
    .await?;
    let user_id = ensure_user(
        &pool,
        "shopper@example.com",
        "shopper1234",
        "Demo",
        "Shopper",
        "user",
    )
    .await?;
    seed_products(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &DbPool,
    email: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, first_name, last_name, role)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role, updated_at = now()
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(first_name)
    .bind(last_name)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_products(pool: &DbPool) -> anyhow::Result<()> {
    for product in CATALOG {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, category, image_url, stock_quantity)
            SELECT $1, $2, $3, $4, $5, $6, $7
            WHERE NOT EXISTS (SELECT 1 FROM products WHERE name = $2)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(product.name)
        .bind(product.description)
        .bind(product.price)
        .bind(product.category)
        .bind(product.image_url)
        .bind(product.stock_quantity)
        .execute(pool)
        .await?;
    }

    println!("Seeded {} products", CATALOG.len());
    Ok(())
}
