use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{CartItem, Product};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartItemRequest {
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemWithProduct {
    #[serde(flatten)]
    pub item: CartItem,
    pub product: Product,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartWithProducts {
    pub items: Vec<CartItemWithProduct>,
    pub total_amount: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RemovedFromCart {
    pub removed: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClearedCart {
    pub cleared: bool,
}
