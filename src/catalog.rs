//! Product catalog client
//!
//! Reads products from a dummyjson-compatible REST API. A product record is
//! kept verbatim so it can be handed to the assistant as opaque context.

use crate::chat::ProductContext;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CATALOG_URL: &str = "https://dummyjson.com";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Invalid product id: {0:?}")]
    InvalidId(String),
    #[error("Product {0} not found")]
    NotFound(u64),
    #[error("Catalog returned HTTP {0}")]
    Status(u16),
    #[error("Catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected catalog payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Fields the front-end shows; everything else stays in `record`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: Option<f64>,
    /// Percent taken off the list price; `price` is already discounted
    #[serde(default)]
    pub discount_percentage: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub availability_status: Option<String>,
    #[serde(default)]
    pub warranty_information: Option<String>,
    #[serde(default)]
    pub return_policy: Option<String>,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    /// The full record as returned by the catalog
    #[serde(skip)]
    pub record: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}W × {}H × {}D", self.width, self.height, self.depth)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub reviewer_name: String,
}

impl Product {
    /// # Errors
    ///
    /// [`CatalogError::Decode`] when the record lacks an id or title.
    pub fn from_record(record: Value) -> Result<Self, CatalogError> {
        let mut product = Product::deserialize(&record)?;
        product.record = record;
        Ok(product)
    }

    /// Price before the discount, when there is one.
    ///
    /// `None` without a price or without a usable discount (`0 < pct < 100`).
    #[must_use]
    pub fn original_price(&self) -> Option<f64> {
        let price = self.price?;
        let pct = self.discount_percentage?;
        (pct > 0.0 && pct < 100.0).then(|| price / (1.0 - pct / 100.0))
    }

    /// Conversation context: the serialized record is the metadata blob
    #[must_use]
    pub fn context(&self) -> ProductContext {
        ProductContext::new(&self.title, &self.description, self.record.to_string())
    }
}

impl From<&Product> for ProductContext {
    fn from(product: &Product) -> Self {
        product.context()
    }
}

/// One page of the product listing
#[derive(Debug, Clone)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: u64,
    pub skip: u64,
    pub limit: u64,
}

#[derive(Deserialize)]
struct RawPage {
    products: Vec<Value>,
    #[serde(default)]
    total: u64,
    #[serde(default)]
    skip: u64,
    #[serde(default)]
    limit: u64,
}

impl ProductPage {
    fn from_raw(raw: RawPage) -> Result<Self, CatalogError> {
        let products = raw
            .products
            .into_iter()
            .map(Product::from_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            products,
            total: raw.total,
            skip: raw.skip,
            limit: raw.limit,
        })
    }

    /// Products whose title contains `term`, ignoring case
    #[must_use]
    pub fn search(&self, term: &str) -> Vec<&Product> {
        let term = term.to_lowercase();
        self.products
            .iter()
            .filter(|p| p.title.to_lowercase().contains(&term))
            .collect()
    }
}

/// Reduce a route slug such as `12-red-lipstick` to its numeric id
///
/// # Errors
///
/// [`CatalogError::InvalidId`] when the slug does not start with a number.
pub fn parse_product_id(slug: &str) -> Result<u64, CatalogError> {
    let head = slug.trim().split('-').next().unwrap_or_default();
    head.parse()
        .map_err(|_| CatalogError::InvalidId(slug.to_string()))
}

#[derive(Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: String,
}

impl CatalogClient {
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch one product by id or slug
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotFound`] for an unknown id, otherwise transport,
    /// status or decode failures.
    pub async fn product(&self, id_or_slug: &str) -> Result<Product, CatalogError> {
        let id = parse_product_id(id_or_slug)?;
        let url = format!("{}/products/{id}", self.base_url);
        tracing::debug!(url = %url, "Fetching product");

        let response = self.client.get(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => return Err(CatalogError::NotFound(id)),
            status if !status.is_success() => return Err(CatalogError::Status(status.as_u16())),
            _ => {}
        }

        let record: Value = response.json().await?;
        Product::from_record(record)
    }

    /// Fetch a page of the listing
    ///
    /// # Errors
    ///
    /// Transport, status or decode failures.
    pub async fn list(&self, limit: u32, skip: u32) -> Result<ProductPage, CatalogError> {
        let url = format!("{}/products", self.base_url);
        tracing::debug!(url = %url, limit, skip, "Listing products");

        let response = self
            .client
            .get(&url)
            .query(&[("limit", limit), ("skip", skip)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CatalogError::Status(response.status().as_u16()));
        }

        let raw: RawPage = response.json().await?;
        ProductPage::from_raw(raw)
    }
}
