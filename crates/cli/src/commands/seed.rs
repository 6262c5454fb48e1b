//! Seed the product catalog from a YAML file.
//!
//! Products are upserted by ID, so the command can be re-run after editing
//! the file. Products missing from the file are left alone.
//!
//! # File Format
//!
//! ```yaml
//! products:
//!   - id: mug-01
//!     name: Ceramic Mug
//!     description: 350ml stoneware mug
//!     price: "12.50"
//!     image: https://cdn.example.com/mug.jpg
//! ```

use std::collections::HashSet;
use std::path::Path;

use boutique_storefront::db::ProductRepository;
use boutique_storefront::models::NewProduct;
use serde::Deserialize;
use tracing::{error, info};

use super::connect;

/// Top-level shape of the seed file.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub products: Vec<NewProduct>,
}

/// Problems that would make a seed run partial or ambiguous.
fn validate(catalog: &CatalogFile) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (index, product) in catalog.products.iter().enumerate() {
        let label = product
            .id
            .as_ref()
            .map_or_else(|| format!("#{index}"), ToString::to_string);

        match &product.id {
            None => errors.push(format!("{label}: id is required for seeding")),
            Some(id) if !seen.insert(id.clone()) => {
                errors.push(format!("{label}: duplicate id"));
            }
            Some(_) => {}
        }
        if product.name().is_none() {
            errors.push(format!("{label}: name is required"));
        }
    }

    errors
}

/// Upsert every product in `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, validation fails,
/// or a database write fails.
pub async fn products(file_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !file_path.exists() {
        return Err(format!("File not found: {}", file_path.display()).into());
    }

    info!(path = %file_path.display(), "Loading products from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(file_path).await?;
    let catalog: CatalogFile = serde_yaml::from_str(&content)?;

    let errors = validate(&catalog);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    info!(products = catalog.products.len(), "Catalog validated successfully");

    let pool = connect().await?;
    let repo = ProductRepository::new(&pool);

    for product in &catalog.products {
        let (Some(id), Some(name)) = (&product.id, product.name()) else {
            continue;
        };
        repo.upsert(id, name, product).await?;
        info!(product_id = %id, "Upserted product");
    }

    info!("Seeding complete!");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_catalog_is_valid() {
        let content = include_str!("../../seed/products.yaml");
        let catalog: CatalogFile = serde_yaml::from_str(content).unwrap();
        assert!(!catalog.products.is_empty());
        assert!(validate(&catalog).is_empty());
    }

    #[test]
    fn test_validate_reports_missing_and_duplicate_ids() {
        let catalog: CatalogFile = serde_yaml::from_str(
            r#"
products:
  - id: mug-01
    name: Mug
    price: "12.50"
  - id: mug-01
    name: Other Mug
    price: 3
  - name: "  "
    price: 1
"#,
        )
        .unwrap();

        let errors = validate(&catalog);
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&"mug-01: duplicate id".to_string()));
        assert!(errors.contains(&"#2: id is required for seeding".to_string()));
        assert!(errors.contains(&"#2: name is required".to_string()));
    }
}
