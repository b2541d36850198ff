//! In-memory product catalog snapshot.
//!
//! The catalog is loaded from the datastore at startup and served from
//! memory; cart operations never write to it. Loading is failure-tolerant:
//! the server boots with an empty catalog and the health endpoint reports
//! the load error.

use bazaar_store::models::ProductRow;
use bazaar_store::{ShopStore, StoreResult};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One product as served by the catalog read API.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    /// Major-unit price for display.
    pub price: f64,
    pub image_url: String,
    pub category: Option<String>,
    pub index_group: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
    /// Audience shorthand ("men" / "women") derived from the index group.
    pub mode: Option<String>,
    pub has_image: bool,
}

/// Filters for the product listing endpoint.
#[derive(Debug, Default)]
pub struct ProductFilter {
    /// Case-insensitive substring match on the product name.
    pub q: Option<String>,
    /// Audience labels to keep (empty = all).
    pub index_groups: Vec<String>,
    /// Product-group labels to keep (empty = all).
    pub categories: Vec<String>,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Default)]
struct CatalogInner {
    products: Vec<Arc<CatalogEntry>>,
    by_id: HashMap<String, Arc<CatalogEntry>>,
    load_err: Option<String>,
}

/// Shared catalog snapshot.
#[derive(Default)]
pub struct Catalog {
    inner: RwLock<CatalogInner>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Rebuild the snapshot from the datastore.
    ///
    /// On failure the previous snapshot is kept and the error is recorded
    /// for the health endpoint.
    pub async fn reload(
        &self,
        store: &dyn ShopStore,
        image_base_url: Option<&str>,
    ) -> StoreResult<usize> {
        let rows = match store.list_products().await {
            Ok(rows) => rows,
            Err(e) => {
                let mut inner = self.inner.write().await;
                inner.load_err = Some(e.to_string());
                return Err(e);
            }
        };

        let products: Vec<Arc<CatalogEntry>> = rows
            .into_iter()
            .map(|row| Arc::new(entry_from_row(row, image_base_url)))
            .collect();
        let by_id = products
            .iter()
            .map(|p| (p.id.clone(), p.clone()))
            .collect();

        let mut inner = self.inner.write().await;
        inner.products = products;
        inner.by_id = by_id;
        inner.load_err = None;
        Ok(inner.products.len())
    }

    /// Number of products in the snapshot.
    pub async fn len(&self) -> usize {
        self.inner.read().await.products.len()
    }

    /// The recorded load error, if the last reload failed.
    pub async fn load_error(&self) -> Option<String> {
        self.inner.read().await.load_err.clone()
    }

    /// Look up a product by id.
    pub async fn get(&self, product_id: &str) -> Option<Arc<CatalogEntry>> {
        self.inner.read().await.by_id.get(product_id).cloned()
    }

    /// Filtered page of products plus the filtered total.
    pub async fn page(&self, filter: &ProductFilter) -> (Vec<Arc<CatalogEntry>>, usize) {
        let inner = self.inner.read().await;

        let index_groups: Vec<String> =
            filter.index_groups.iter().map(|s| norm(s)).collect();
        let categories: Vec<String> = filter.categories.iter().map(|s| norm(s)).collect();
        let q = filter.q.as_deref().map(norm);

        let matched: Vec<Arc<CatalogEntry>> = inner
            .products
            .iter()
            .filter(|p| {
                index_groups.is_empty()
                    || index_groups.contains(&norm(p.index_group.as_deref().unwrap_or("")))
            })
            .filter(|p| {
                categories.is_empty()
                    || categories.contains(&norm(p.category.as_deref().unwrap_or("")))
            })
            .filter(|p| match &q {
                Some(q) => norm(&p.name).contains(q.as_str()),
                None => true,
            })
            .cloned()
            .collect();

        let total = matched.len();
        let page = matched
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit)
            .collect();
        (page, total)
    }

    /// Random sample from one product group, optionally audience-filtered.
    /// Returns the sample and the full pool size.
    pub async fn sample_group(
        &self,
        group: &str,
        mode: Option<&str>,
        limit: usize,
        seed: Option<u64>,
    ) -> (Vec<Arc<CatalogEntry>>, usize) {
        let inner = self.inner.read().await;
        let target = norm(group);
        let mode = mode.map(norm);

        let pool: Vec<&Arc<CatalogEntry>> = inner
            .products
            .iter()
            .filter(|p| norm(p.category.as_deref().unwrap_or("")) == target)
            .filter(|p| audience_matches(p.index_group.as_deref(), mode.as_deref()))
            .collect();

        let total = pool.len();
        let k = limit.min(total);
        let mut rng = seeded_rng(seed);
        let sample = pool
            .choose_multiple(&mut rng, k)
            .map(|p| (*p).clone())
            .collect();
        (sample, total)
    }

    /// Products similar to the given one: same group and color first, then
    /// same group. Returns `None` for an unknown id.
    pub async fn similar_to(
        &self,
        product_id: &str,
        limit: usize,
        seed: Option<u64>,
    ) -> Option<(Arc<CatalogEntry>, Vec<Arc<CatalogEntry>>)> {
        let inner = self.inner.read().await;
        let base = inner.by_id.get(product_id)?.clone();

        let group = norm(base.category.as_deref().unwrap_or(""));
        let color = norm(base.color.as_deref().unwrap_or(""));

        let primary: Vec<&Arc<CatalogEntry>> = inner
            .products
            .iter()
            .filter(|p| p.id != base.id)
            .filter(|p| norm(p.category.as_deref().unwrap_or("")) == group)
            .filter(|p| norm(p.color.as_deref().unwrap_or("")) == color)
            .collect();
        let secondary: Vec<&Arc<CatalogEntry>> = inner
            .products
            .iter()
            .filter(|p| p.id != base.id)
            .filter(|p| norm(p.category.as_deref().unwrap_or("")) == group)
            .collect();

        let mut rng = seeded_rng(seed);

        // Weight toward same-color picks, then fill from the wider group.
        let take_primary = primary.len().min(limit * 6 / 10);
        let mut chosen: Vec<Arc<CatalogEntry>> = primary
            .choose_multiple(&mut rng, take_primary)
            .map(|p| (*p).clone())
            .collect();

        let remaining = limit.saturating_sub(chosen.len());
        if remaining > 0 {
            let chosen_ids: Vec<&str> = chosen.iter().map(|p| p.id.as_str()).collect();
            let fill: Vec<&Arc<CatalogEntry>> = secondary
                .into_iter()
                .filter(|p| !chosen_ids.contains(&p.id.as_str()))
                .collect();
            chosen.extend(
                fill.choose_multiple(&mut rng, remaining.min(fill.len()))
                    .map(|p| (*p).clone()),
            );
        }

        Some((base, chosen))
    }

    /// Product-group counts per audience label.
    pub async fn group_counts(&self) -> BTreeMap<String, Vec<GroupCount>> {
        let inner = self.inner.read().await;
        let mut by_mode: BTreeMap<String, HashMap<String, usize>> = BTreeMap::new();

        for p in &inner.products {
            let audience = p
                .index_group
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or("UNKNOWN")
                .to_string();
            let group = p
                .category
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or("UNKNOWN")
                .to_string();
            *by_mode.entry(audience).or_default().entry(group).or_default() += 1;
        }

        by_mode
            .into_iter()
            .map(|(audience, counts)| {
                let mut groups: Vec<GroupCount> = counts
                    .into_iter()
                    .map(|(group, count)| GroupCount { group, count })
                    .collect();
                groups.sort_by(|a, b| b.count.cmp(&a.count).then(a.group.cmp(&b.group)));
                (audience, groups)
            })
            .collect()
    }
}

/// One product-group count in the meta endpoint.
#[derive(Debug, Serialize)]
pub struct GroupCount {
    pub group: String,
    pub count: usize,
}

fn norm(s: &str) -> String {
    s.trim().to_lowercase()
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Whether a product's audience label passes the mode filter. Products
/// without a label always pass.
fn audience_matches(index_group: Option<&str>, mode: Option<&str>) -> bool {
    let group = index_group.map(str::trim).unwrap_or("");
    if group.is_empty() {
        return true;
    }
    match mode {
        Some("men") => group == "Menswear",
        Some("women") => group == "Ladieswear" || group == "Divided",
        _ => true,
    }
}

fn derive_mode(index_group: Option<&str>) -> Option<String> {
    match index_group.map(str::trim) {
        Some("Menswear") => Some("men".to_string()),
        Some("Ladieswear") | Some("Divided") => Some("women".to_string()),
        _ => None,
    }
}

/// Image key layout used by the bucket: images_data/<first-3>/<padded-id>.jpg
fn build_image_key(product_id: &str) -> String {
    let aid = format!("{:0>10}", product_id.trim());
    let prefix = aid.get(..3).unwrap_or("000");
    format!("images_data/{prefix}/{aid}.jpg")
}

fn image_url_for(base: Option<&str>, image_key: Option<&str>, product_id: &str) -> String {
    let key = match image_key.map(str::trim) {
        Some(k) if !k.is_empty() => k.to_string(),
        _ => build_image_key(product_id),
    };
    // Rows migrated from older data may already hold a full URL.
    if key.starts_with("http://") || key.starts_with("https://") {
        return key;
    }
    match base {
        Some(base) => format!("{}/{}", base.trim_end_matches('/'), key.trim_start_matches('/')),
        None => {
            let aid = format!("{:0>10}", product_id.trim());
            let prefix = aid.get(..3).unwrap_or("000");
            format!("/images/{prefix}/{aid}.jpg")
        }
    }
}

fn entry_from_row(row: ProductRow, image_base_url: Option<&str>) -> CatalogEntry {
    let price = row
        .price
        .or_else(|| row.price_cents.map(|cents| cents as f64 / 100.0))
        .unwrap_or(0.0);

    CatalogEntry {
        image_url: image_url_for(image_base_url, row.image_key.as_deref(), &row.id),
        mode: derive_mode(row.index_group.as_deref()),
        id: row.id,
        name: row.name,
        price,
        category: row.category,
        index_group: row.index_group,
        color: row.color,
        description: row.description,
        has_image: row.has_image,
    }
}

/// One product in a JSON seed file.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub index_group: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub price_cents: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub image_key: Option<String>,
    #[serde(default)]
    pub has_image: bool,
}

impl From<SeedProduct> for ProductRow {
    fn from(seed: SeedProduct) -> Self {
        Self {
            id: seed.id,
            name: seed.name,
            category: seed.category,
            index_group: seed.index_group,
            color: seed.color,
            description: seed.description,
            price: seed.price,
            price_cents: seed.price_cents,
            currency: seed.currency,
            image_key: seed.image_key,
            has_image: seed.has_image,
        }
    }
}

/// Load products from a JSON seed file into the datastore.
/// Existing product ids are left untouched. Returns the inserted count.
pub async fn seed_products_from_file(
    store: &dyn ShopStore,
    path: &Path,
) -> anyhow::Result<u64> {
    use anyhow::Context;

    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read seed file: {}", path.display()))?;
    let seeds: Vec<SeedProduct> =
        serde_json::from_slice(&data).context("failed to parse seed file")?;
    let rows: Vec<ProductRow> = seeds.into_iter().map(ProductRow::from).collect();

    let inserted = store
        .insert_products(&rows)
        .await
        .context("failed to insert seed products")?;
    Ok(inserted)
}
