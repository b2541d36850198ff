//! Route configuration.

use crate::auth::identity_middleware;
use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::middleware;
use axum::routing::{get, post};
use tower_cookies::CookieManagerLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        // Health check (intentionally unauthenticated for deploy probes)
        .route("/health", get(handlers::health_check))
        // Cart surface
        .route("/cart", get(handlers::get_cart))
        .route("/cart/items", post(handlers::add_cart_item))
        .route(
            "/cart/items/{item_id}",
            axum::routing::patch(handlers::update_cart_item).delete(handlers::remove_cart_item),
        )
        .route("/cart/clear", post(handlers::clear_cart))
        .route("/cart/checkout", post(handlers::checkout))
        // Auth surface
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/me", get(handlers::me))
        // Order history
        .route("/orders", get(handlers::list_orders))
        // Catalog reads
        .route("/products", get(handlers::list_products))
        .route("/products/homepage", get(handlers::homepage_products))
        .route("/products/{product_id}", get(handlers::get_product))
        .route(
            "/products/{product_id}/similar",
            get(handlers::similar_products),
        )
        .route("/meta/product-groups", get(handlers::product_groups));

    let cors = cors_layer(&state);

    // Middleware layers are applied in reverse order (outermost last).
    // Order of execution: TraceLayer -> CORS -> cookies -> identity -> handler.
    router
        .layer(middleware::from_fn_with_state(
            state.clone(),
            identity_middleware,
        ))
        .layer(CookieManagerLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the browser storefront. Credentials are allowed, so origins must
/// be listed explicitly; unparseable entries are skipped.
fn cors_layer(state: &AppState) -> CorsLayer {
    let origins: Vec<HeaderValue> = state
        .config
        .server
        .allow_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "skipping unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}
