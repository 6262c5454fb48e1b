//! Product catalog with a read-through cache.
//!
//! Products are cached for 5 minutes using `moka`. Writes through this service
//! invalidate the affected entries; writes made directly against the database
//! (e.g. `boutique seed`) show up once the TTL expires.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::debug;

use boutique_core::ProductId;

use crate::db::{ProductRepository, RepositoryError};
use crate::models::{NewProduct, Product};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Product(ProductId),
    Products,
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Product(Box<Product>),
    Products(Arc<Vec<Product>>),
}

/// Cached access to the product catalog.
#[derive(Clone)]
pub struct Catalog {
    pool: PgPool,
    cache: Cache<CacheKey, CacheValue>,
}

impl Catalog {
    /// Create a catalog over `pool`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self { pool, cache }
    }

    fn products(&self) -> ProductRepository<'_> {
        ProductRepository::new(&self.pool)
    }

    /// All products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the database read fails.
    pub async fn list(&self) -> Result<Arc<Vec<Product>>, RepositoryError> {
        if let Some(CacheValue::Products(products)) = self.cache.get(&CacheKey::Products).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let products = Arc::new(self.products().list().await?);
        self.cache
            .insert(CacheKey::Products, CacheValue::Products(Arc::clone(&products)))
            .await;
        Ok(products)
    }

    /// A single product, or `None` if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the database read fails.
    pub async fn get(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let key = CacheKey::Product(id.clone());
        if let Some(CacheValue::Product(product)) = self.cache.get(&key).await {
            debug!(product_id = %id, "Cache hit for product");
            return Ok(Some(*product));
        }

        let product = self.products().get(id).await?;
        if let Some(product) = &product {
            self.cache
                .insert(key, CacheValue::Product(Box::new(product.clone())))
                .await;
        }
        Ok(product)
    }

    /// Create a product. A missing `id` is replaced by a random one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the ID is taken.
    pub async fn create(&self, name: &str, input: &NewProduct) -> Result<Product, RepositoryError> {
        let id = match &input.id {
            Some(id) => id.clone(),
            None => ProductId::parse(&uuid::Uuid::new_v4().simple().to_string())
                .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?,
        };

        let product = self.products().create(&id, name, input).await?;
        self.cache.invalidate(&CacheKey::Products).await;
        Ok(product)
    }

    /// Replace a product's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn update(
        &self,
        id: &ProductId,
        name: &str,
        input: &NewProduct,
    ) -> Result<Product, RepositoryError> {
        let product = self.products().update(id, name, input).await?;
        self.invalidate(id).await;
        Ok(product)
    }

    /// Delete a product. Returns `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the database write fails.
    pub async fn delete(&self, id: &ProductId) -> Result<bool, RepositoryError> {
        let deleted = self.products().delete(id).await?;
        self.invalidate(id).await;
        Ok(deleted)
    }

    async fn invalidate(&self, id: &ProductId) {
        self.cache.invalidate(&CacheKey::Product(id.clone())).await;
        self.cache.invalidate(&CacheKey::Products).await;
    }
}
