use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::orders::{
        CheckoutRequest, CreateOrderRequest, OrderHistory, OrderItemWithProduct, OrderLine,
        OrderWithItems, UpdateOrderStatusRequest,
    },
    entity::{
        Users,
        cart_items::{Column as CartCol, Entity as CartItems},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
        },
        products::{Column as ProdCol, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderItem, OrderStatus},
    response::{ApiResponse, Meta},
    services::{product_service::product_from_entity, validate},
    state::AppState,
};

/// One validated order line, priced at the product's current unit price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
}

struct Addresses {
    shipping: String,
    billing: String,
}

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    let addresses = Addresses {
        shipping: validate::non_empty("shipping_address", &payload.shipping_address)?,
        billing: validate::non_empty("billing_address", &payload.billing_address)?,
    };
    if payload.items.is_empty() {
        return Err(AppError::bad_request("Order must contain at least one item"));
    }
    let lines = merge_lines(&payload.items)?;

    let txn = state.orm.begin().await?;

    if Users::find_by_id(user.user_id).one(&txn).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    let order = place_order(&txn, user.user_id, addresses, &lines).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %user.user_id,
        total = order.total_amount,
        "order placed"
    );

    Ok(ApiResponse::success(
        "Order created",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

/// Turns the caller's cart into an order and empties the cart in the same transaction.
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<Order>> {
    let addresses = Addresses {
        shipping: validate::non_empty("shipping_address", &payload.shipping_address)?,
        billing: validate::non_empty("billing_address", &payload.billing_address)?,
    };
    let payment_method = validate::non_empty("payment_method", &payload.payment_method)?;

    let txn = state.orm.begin().await?;

    let cart = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .order_by_asc(CartCol::CreatedAt)
        .lock(LockType::Update)
        .all(&txn)
        .await?;

    if cart.is_empty() {
        tracing::warn!(user_id = %user.user_id, "checkout rejected: empty cart");
        return Err(AppError::bad_request("Cart is empty"));
    }

    let requested: Vec<OrderLine> = cart
        .iter()
        .map(|item| OrderLine {
            product_id: item.product_id,
            quantity: item.quantity,
        })
        .collect();
    let lines = merge_lines(&requested)?;

    let order = place_order(&txn, user.user_id, addresses, &lines).await?;

    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %user.user_id,
        total = order.total_amount,
        payment_method = %payment_method,
        "checkout completed"
    );

    Ok(ApiResponse::success(
        "Checkout success",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<OrderHistory>> {
    let orders = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut items_by_order = items_with_products(&state.orm, order_ids).await?;

    let items: Vec<OrderWithItems> = orders
        .into_iter()
        .map(|order| OrderWithItems {
            items: items_by_order.remove(&order.id).unwrap_or_default(),
            order: order_from_entity(order),
        })
        .collect();

    let meta = Meta::new(items.len() as i64);
    Ok(ApiResponse::success("Ok", OrderHistory { items }, Some(meta)))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::not_found("Order not found")),
    };

    let items = items_with_products(&state.orm, vec![order.id])
        .await?
        .remove(&order.id)
        .unwrap_or_default();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order_from_entity(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Overwrites the status label; any of the five values may follow any other.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;

    let order = Orders::find_by_id(id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::not_found("Order not found")),
    };

    let previous = order.status;
    let mut active: OrderActive = order.into();
    active.status = Set(payload.status);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    tracing::info!(
        order_id = %order.id,
        from = previous.as_str(),
        to = order.status.as_str(),
        "order status changed"
    );

    Ok(ApiResponse::success(
        "Order status updated",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

/// Locks the products, checks stock, then writes the order, its items and the
/// stock decrements. Must run inside the caller's transaction.
async fn place_order<C>(
    txn: &C,
    user_id: Uuid,
    addresses: Addresses,
    lines: &[OrderLine],
) -> AppResult<OrderModel>
where
    C: ConnectionTrait,
{
    let product_ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
    let products: HashMap<Uuid, ProductModel> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .order_by_asc(ProdCol::Id)
        .lock(LockType::Update)
        .all(txn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let (priced, total_amount) = price_lines(lines, &products)?;

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        total_amount: Set(total_amount),
        status: Set(OrderStatus::Pending),
        shipping_address: Set(addresses.shipping),
        billing_address: Set(addresses.billing),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(txn)
    .await?;

    let rows = priced.iter().map(|line| OrderItemActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        product_id: Set(line.product_id),
        quantity: Set(line.quantity),
        price: Set(line.unit_price),
        created_at: NotSet,
    });
    OrderItems::insert_many(rows)
        .exec_without_returning(txn)
        .await?;

    for line in &priced {
        Products::update_many()
            .col_expr(
                ProdCol::StockQuantity,
                Expr::col(ProdCol::StockQuantity).sub(line.quantity),
            )
            .col_expr(ProdCol::UpdatedAt, Expr::current_timestamp().into())
            .filter(ProdCol::Id.eq(line.product_id))
            .exec(txn)
            .await?;
    }

    Ok(order)
}

/// Collapses repeated products into one line each, ordered by product id so
/// row locks are always taken in the same order.
pub fn merge_lines(lines: &[OrderLine]) -> AppResult<Vec<OrderLine>> {
    let mut merged: BTreeMap<Uuid, i32> = BTreeMap::new();
    for line in lines {
        validate::positive_quantity(line.quantity)?;
        let quantity = merged.entry(line.product_id).or_insert(0);
        *quantity = quantity
            .checked_add(line.quantity)
            .ok_or_else(|| AppError::bad_request("quantity is too large"))?;
    }
    Ok(merged
        .into_iter()
        .map(|(product_id, quantity)| OrderLine {
            product_id,
            quantity,
        })
        .collect())
}

/// Checks availability and stock for every line and returns the priced lines
/// with their total.
pub fn price_lines(
    lines: &[OrderLine],
    products: &HashMap<Uuid, ProductModel>,
) -> AppResult<(Vec<PricedLine>, i64)> {
    let mut priced = Vec::with_capacity(lines.len());
    let mut total: i64 = 0;

    for line in lines {
        let product = products
            .get(&line.product_id)
            .filter(|p| p.is_active)
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "Product {} not found or inactive",
                    line.product_id
                ))
            })?;

        if product.stock_quantity < line.quantity {
            return Err(AppError::bad_request(format!(
                "Insufficient stock for product {}. Available: {}, Requested: {}",
                product.name, product.stock_quantity, line.quantity
            )));
        }

        let subtotal = product
            .price
            .checked_mul(i64::from(line.quantity))
            .ok_or_else(|| AppError::bad_request("Order total is too large"))?;
        total = total
            .checked_add(subtotal)
            .ok_or_else(|| AppError::bad_request("Order total is too large"))?;

        priced.push(PricedLine {
            product_id: product.id,
            quantity: line.quantity,
            unit_price: product.price,
        });
    }

    Ok((priced, total))
}

async fn items_with_products<C>(
    conn: &C,
    order_ids: Vec<Uuid>,
) -> AppResult<HashMap<Uuid, Vec<OrderItemWithProduct>>>
where
    C: ConnectionTrait,
{
    let mut grouped: HashMap<Uuid, Vec<OrderItemWithProduct>> = HashMap::new();
    if order_ids.is_empty() {
        return Ok(grouped);
    }

    let rows = OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(order_ids))
        .order_by_asc(OrderItemCol::CreatedAt)
        .order_by_asc(OrderItemCol::Id)
        .find_also_related(Products)
        .all(conn)
        .await?;

    for (item, product) in rows {
        // order_items.product_id is a foreign key, so the product is always present.
        let Some(product) = product else {
            tracing::warn!(order_item_id = %item.id, "order item without product");
            continue;
        };
        grouped
            .entry(item.order_id)
            .or_default()
            .push(OrderItemWithProduct {
                item: order_item_from_entity(item),
                product: product_from_entity(product),
            });
    }

    Ok(grouped)
}

fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        total_amount: model.total_amount,
        status: model.status,
        shipping_address: model.shipping_address,
        billing_address: model.billing_address,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        quantity: model.quantity,
        price: model.price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(price: i64, stock: i32, is_active: bool) -> ProductModel {
        let now = Utc::now().fixed_offset();
        ProductModel {
            id: Uuid::new_v4(),
            name: "Classic Denim Jacket".into(),
            description: String::new(),
            price,
            category: "Jackets".into(),
            image_url: "https://example.com/jacket.jpg".into(),
            stock_quantity: stock,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }

    fn catalog(products: &[ProductModel]) -> HashMap<Uuid, ProductModel> {
        products.iter().map(|p| (p.id, p.clone())).collect()
    }

    #[test]
    fn duplicate_lines_are_merged() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let merged = merge_lines(&[
            OrderLine {
                product_id: a,
                quantity: 1,
            },
            OrderLine {
                product_id: b,
                quantity: 4,
            },
            OrderLine {
                product_id: a,
                quantity: 2,
            },
        ])
        .unwrap();
        assert_eq!(merged.len(), 2);
        let a_line = merged.iter().find(|l| l.product_id == a).unwrap();
        assert_eq!(a_line.quantity, 3);
        assert!(merged.windows(2).all(|w| w[0].product_id < w[1].product_id));
    }

    #[test]
    fn non_positive_quantities_are_rejected() {
        let err = merge_lines(&[OrderLine {
            product_id: Uuid::new_v4(),
            quantity: 0,
        }])
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn total_sums_price_times_quantity() {
        let jacket = product(12999, 8, true);
        let tee = product(2999, 20, true);
        let lines = merge_lines(&[
            OrderLine {
                product_id: jacket.id,
                quantity: 2,
            },
            OrderLine {
                product_id: tee.id,
                quantity: 3,
            },
        ])
        .unwrap();
        let (priced, total) = price_lines(&lines, &catalog(&[jacket.clone(), tee])).unwrap();
        assert_eq!(total, 12999 * 2 + 2999 * 3);
        let jacket_line = priced.iter().find(|l| l.product_id == jacket.id).unwrap();
        assert_eq!(jacket_line.unit_price, 12999);
    }

    #[test]
    fn stock_must_cover_the_request() {
        let blazer = product(19999, 1, true);
        let lines = vec![OrderLine {
            product_id: blazer.id,
            quantity: 2,
        }];
        let err = price_lines(&lines, &catalog(&[blazer])).unwrap_err();
        match err {
            AppError::BadRequest(msg) => {
                assert!(msg.starts_with("Insufficient stock"));
                assert!(msg.contains("Available: 1, Requested: 2"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn exact_stock_is_enough() {
        let blazer = product(19999, 2, true);
        let lines = vec![OrderLine {
            product_id: blazer.id,
            quantity: 2,
        }];
        assert!(price_lines(&lines, &catalog(&[blazer])).is_ok());
    }

    #[test]
    fn missing_or_inactive_products_are_not_found() {
        let retired = product(5000, 10, false);
        let lines = vec![OrderLine {
            product_id: retired.id,
            quantity: 1,
        }];
        let err = price_lines(&lines, &catalog(&[retired])).unwrap_err();
        assert!(matches!(err, AppError::NotFound(msg) if msg.contains("not found or inactive")));

        let lines = vec![OrderLine {
            product_id: Uuid::new_v4(),
            quantity: 1,
        }];
        assert!(matches!(
            price_lines(&lines, &HashMap::new()),
            Err(AppError::NotFound(_))
        ));
    }
}
