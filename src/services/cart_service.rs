use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::cart::{
        AddToCartRequest, CartItemWithProduct, CartWithProducts, ClearedCart, RemovedFromCart,
        UpdateCartItemRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{CartItem, Product},
    response::{ApiResponse, Meta},
    services::{user_service, validate},
};

#[derive(FromRow)]
struct CartWithProductRow {
    cart_id: Uuid,
    user_id: Uuid,
    quantity: i32,
    cart_created_at: DateTime<Utc>,
    cart_updated_at: DateTime<Utc>,
    product_id: Uuid,
    name: String,
    description: String,
    price: i64,
    category: String,
    image_url: String,
    stock_quantity: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartWithProductRow> for CartItemWithProduct {
    fn from(row: CartWithProductRow) -> Self {
        CartItemWithProduct {
            item: CartItem {
                id: row.cart_id,
                user_id: row.user_id,
                product_id: row.product_id,
                quantity: row.quantity,
                created_at: row.cart_created_at,
                updated_at: row.cart_updated_at,
            },
            product: Product {
                id: row.product_id,
                name: row.name,
                description: row.description,
                price: row.price,
                category: row.category,
                image_url: row.image_url,
                stock_quantity: row.stock_quantity,
                is_active: row.is_active,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

pub async fn get_cart(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<CartWithProducts>> {
    let rows = sqlx::query_as::<_, CartWithProductRow>(
        r#"
        SELECT ci.id AS cart_id, ci.user_id, ci.quantity,
               ci.created_at AS cart_created_at, ci.updated_at AS cart_updated_at,
               p.id AS product_id, p.name, p.description, p.price, p.category,
               p.image_url, p.stock_quantity, p.is_active, p.created_at, p.updated_at
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.user_id = $1
        ORDER BY ci.created_at ASC, ci.id ASC
        "#,
    )
    .bind(user.user_id)
    .fetch_all(pool)
    .await?;

    let items: Vec<CartItemWithProduct> = rows.into_iter().map(Into::into).collect();
    let total_amount = cart_total(&items);
    let meta = Meta::new(items.len() as i64);

    Ok(ApiResponse::success(
        "OK",
        CartWithProducts {
            items,
            total_amount,
        },
        Some(meta),
    ))
}

/// Adds `quantity` to the caller's line for the product, creating it when absent.
pub async fn add_to_cart(
    pool: &DbPool,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    validate::positive_quantity(payload.quantity)?;

    if !user_service::user_exists(pool, user.user_id).await? {
        return Err(AppError::not_found("User not found"));
    }

    let product_exist: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM products WHERE id = $1 AND is_active")
            .bind(payload.product_id)
            .fetch_optional(pool)
            .await?;
    if product_exist.is_none() {
        return Err(AppError::not_found("Product not found or inactive"));
    }

    let cart_item = sqlx::query_as::<_, CartItem>(
        r#"
        INSERT INTO cart_items (id, user_id, product_id, quantity)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, product_id)
        DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity,
                      updated_at = now()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(payload.product_id)
    .bind(payload.quantity)
    .fetch_one(pool)
    .await
    .map_err(quantity_overflow)?;

    tracing::debug!(
        user_id = %user.user_id,
        product_id = %payload.product_id,
        quantity = cart_item.quantity,
        "cart updated"
    );

    Ok(ApiResponse::success("OK", cart_item, None))
}

pub async fn update_cart_item(
    pool: &DbPool,
    user: &AuthUser,
    item_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartItem>> {
    validate::positive_quantity(payload.quantity)?;

    let cart_item = sqlx::query_as::<_, CartItem>(
        r#"
        UPDATE cart_items
        SET quantity = $3, updated_at = now()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(item_id)
    .bind(user.user_id)
    .bind(payload.quantity)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Cart item not found"))?;

    Ok(ApiResponse::success("Updated", cart_item, None))
}

pub async fn remove_from_cart(
    pool: &DbPool,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<ApiResponse<RemovedFromCart>> {
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
        .bind(item_id)
        .bind(user.user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Cart item not found"));
    }

    Ok(ApiResponse::success(
        "Removed from cart",
        RemovedFromCart { removed: true },
        Some(Meta::empty()),
    ))
}

pub async fn clear_cart(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<ClearedCart>> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user.user_id)
        .execute(pool)
        .await?;

    let removed = result.rows_affected();
    Ok(ApiResponse::success(
        "Cart cleared",
        ClearedCart {
            cleared: removed > 0,
        },
        Some(Meta::new(removed as i64)),
    ))
}

// 22003 is numeric_value_out_of_range: the merged quantity no longer fits an INTEGER.
fn quantity_overflow(err: sqlx::Error) -> AppError {
    let overflow = matches!(
        &err,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("22003")
    );
    if overflow {
        AppError::bad_request("quantity is too large")
    } else {
        AppError::DbError(err)
    }
}

pub fn cart_total(items: &[CartItemWithProduct]) -> i64 {
    items
        .iter()
        .map(|line| line.product.price * i64::from(line.item.quantity))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(price: i64, quantity: i32) -> CartItemWithProduct {
        let now = Utc::now();
        let product_id = Uuid::new_v4();
        CartItemWithProduct {
            item: CartItem {
                id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                product_id,
                quantity,
                created_at: now,
                updated_at: now,
            },
            product: Product {
                id: product_id,
                name: "Silk Blouse".into(),
                description: String::new(),
                price,
                category: "Blouses".into(),
                image_url: "https://example.com/blouse.jpg".into(),
                stock_quantity: 10,
                is_active: true,
                created_at: now,
                updated_at: now,
            },
        }
    }

    #[test]
    fn empty_cart_totals_zero() {
        assert_eq!(cart_total(&[]), 0);
    }

    #[test]
    fn total_is_price_times_quantity() {
        let items = vec![line(8999, 2), line(2999, 1)];
        assert_eq!(cart_total(&items), 8999 * 2 + 2999);
    }

    #[test]
    fn cart_line_serializes_flat_with_nested_product() {
        let json = serde_json::to_value(line(1000, 3)).unwrap();
        assert_eq!(json["quantity"], 3);
        assert_eq!(json["product"]["price"], 1000);
        assert!(json.get("item").is_none());
    }
}
