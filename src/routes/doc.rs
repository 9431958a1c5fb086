use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{AuthResponse, LoginRequest, RegisterRequest},
        cart::{
            AddToCartRequest, CartItemWithProduct, CartWithProducts, ClearedCart,
            RemovedFromCart, UpdateCartItemRequest,
        },
        orders::{
            CheckoutRequest, CreateOrderRequest, OrderHistory, OrderItemWithProduct, OrderLine,
            OrderWithItems, UpdateOrderStatusRequest,
        },
        products::{CategoryList, CreateProductRequest, ProductList, UpdateProductRequest},
    },
    models::{CartItem, Order, OrderItem, OrderStatus, Product, UserProfile},
    response::{ApiResponse, Meta},
    routes::{admin, auth, cart, health, orders, products, users},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::me,
        users::get_user,
        products::list_products,
        products::search_products,
        products::list_categories,
        products::list_by_category,
        products::get_product,
        products::create_product,
        products::update_product,
        cart::get_cart,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        cart::clear_cart,
        orders::list_orders,
        orders::create_order,
        orders::checkout,
        orders::get_order,
        admin::update_order_status
    ),
    components(
        schemas(
            UserProfile,
            Product,
            CartItem,
            Order,
            OrderItem,
            OrderStatus,
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            CategoryList,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartItemWithProduct,
            CartWithProducts,
            RemovedFromCart,
            ClearedCart,
            OrderLine,
            CreateOrderRequest,
            CheckoutRequest,
            UpdateOrderStatusRequest,
            OrderItemWithProduct,
            OrderWithItems,
            OrderHistory,
            health::HealthData,
            Meta,
            ApiResponse<AuthResponse>,
            ApiResponse<UserProfile>,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CategoryList>,
            ApiResponse<CartItem>,
            ApiResponse<CartWithProducts>,
            ApiResponse<Order>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderHistory>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and the current user"),
        (name = "Users", description = "Public user profiles"),
        (name = "Products", description = "Catalog browsing and admin product management"),
        (name = "Cart", description = "Shopping cart of the caller"),
        (name = "Orders", description = "Order placement and history"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/auth/register",
            "/api/auth/login",
            "/api/auth/me",
            "/api/users/{id}",
            "/api/products",
            "/api/products/search",
            "/api/products/categories",
            "/api/products/category/{category}",
            "/api/products/{id}",
            "/api/cart",
            "/api/cart/{item_id}",
            "/api/orders",
            "/api/orders/checkout",
            "/api/orders/{id}",
            "/api/admin/orders/{id}/status",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn bearer_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
