//! Product catalog read endpoints.
//!
//! All of these serve from the in-memory snapshot; nothing here touches
//! carts or writes to the datastore.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::catalog::{CatalogEntry, GroupCount, ProductFilter};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Query parameters for the product listing.
#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    #[serde(default = "default_list_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    pub q: Option<String>,
    /// Comma-separated audience labels.
    pub index_group: Option<String>,
    /// Comma-separated product-group labels.
    pub category: Option<String>,
}

fn default_list_limit() -> usize {
    20
}

/// Response for the product listing.
#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub items: Vec<Arc<CatalogEntry>>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

fn split_labels(raw: Option<String>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

/// GET /products - filtered catalog page.
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListProductsQuery>,
) -> Json<ProductListResponse> {
    let limit = query.limit.clamp(1, 200);
    let filter = ProductFilter {
        q: query.q,
        index_groups: split_labels(query.index_group),
        categories: split_labels(query.category),
        limit,
        offset: query.offset,
    };

    let (items, total) = state.catalog.page(&filter).await;
    Json(ProductListResponse {
        items,
        total,
        limit,
        offset: filter.offset,
    })
}

/// Query parameters for the homepage sample.
#[derive(Debug, Deserialize)]
pub struct HomepageQuery {
    #[serde(default = "default_homepage_limit")]
    pub limit: usize,
    #[serde(default = "default_homepage_group")]
    pub group: String,
    pub mode: Option<String>,
    pub seed: Option<u64>,
}

fn default_homepage_limit() -> usize {
    12
}

fn default_homepage_group() -> String {
    "Garment Upper body".to_string()
}

/// Response for the homepage sample.
#[derive(Debug, Serialize)]
pub struct HomepageResponse {
    pub items: Vec<Arc<CatalogEntry>>,
    pub total: usize,
    pub limit: usize,
    pub group: String,
    pub mode: Option<String>,
}

/// GET /products/homepage - random sample of one product group.
/// The response is marked no-store so every page load gets a fresh mix.
pub async fn homepage_products(
    State(state): State<AppState>,
    Query(query): Query<HomepageQuery>,
) -> impl IntoResponse {
    let limit = query.limit.clamp(1, 100);
    let (items, total) = state
        .catalog
        .sample_group(&query.group, query.mode.as_deref(), limit, query.seed)
        .await;

    (
        [(header::CACHE_CONTROL, "no-store")],
        Json(HomepageResponse {
            items,
            total,
            limit,
            group: query.group,
            mode: query.mode,
        }),
    )
}

/// GET /products/{product_id} - one catalog entry.
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<Arc<CatalogEntry>>> {
    state
        .catalog
        .get(&product_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("product {product_id} not found")))
}

/// Query parameters for the similar-products endpoint.
#[derive(Debug, Deserialize)]
pub struct SimilarQuery {
    #[serde(default = "default_similar_limit")]
    pub limit: usize,
    pub seed: Option<u64>,
}

fn default_similar_limit() -> usize {
    8
}

/// Response for the similar-products endpoint.
#[derive(Debug, Serialize)]
pub struct SimilarResponse {
    pub base_id: String,
    pub group: Option<String>,
    pub color: Option<String>,
    pub items: Vec<Arc<CatalogEntry>>,
}

/// GET /products/{product_id}/similar - same-group picks, same color first.
pub async fn similar_products(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    Query(query): Query<SimilarQuery>,
) -> ApiResult<Json<SimilarResponse>> {
    let limit = query.limit.clamp(1, 50);
    let (base, items) = state
        .catalog
        .similar_to(&product_id, limit, query.seed)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("product {product_id} not found")))?;

    Ok(Json(SimilarResponse {
        base_id: base.id.clone(),
        group: base.category.clone(),
        color: base.color.clone(),
        items,
    }))
}

/// GET /meta/product-groups - product-group counts per audience label.
pub async fn product_groups(
    State(state): State<AppState>,
) -> Json<BTreeMap<String, Vec<GroupCount>>> {
    Json(state.catalog.group_counts().await)
}
