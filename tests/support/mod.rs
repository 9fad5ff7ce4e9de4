#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use skincare_catalog::model::{CategoryRef, Review};
use skincare_catalog::{
    CatalogError, CatalogSource, CatalogStore, Category, CategoryId, DerivationPolicy, ProductId,
    RawProduct,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Semaphore;

/// In-memory catalog backend whose responses can be swapped between fetches
/// and whose product fetch can be held open until released.
pub struct ScriptedSource {
    products: Mutex<Result<Vec<RawProduct>, CatalogError>>,
    categories: Mutex<Result<Vec<Category>, CatalogError>>,
    product_calls: AtomicUsize,
    category_calls: AtomicUsize,
    panic_next: AtomicBool,
    gate: Option<Semaphore>,
}

impl ScriptedSource {
    pub fn new(products: Vec<RawProduct>, categories: Vec<Category>) -> Arc<Self> {
        Arc::new(Self::build(products, categories, None))
    }

    /// Product fetches block until [`ScriptedSource::release`] is called.
    pub fn gated(products: Vec<RawProduct>, categories: Vec<Category>) -> Arc<Self> {
        Arc::new(Self::build(products, categories, Some(Semaphore::new(0))))
    }

    fn build(products: Vec<RawProduct>, categories: Vec<Category>, gate: Option<Semaphore>) -> Self {
        Self {
            products: Mutex::new(Ok(products)),
            categories: Mutex::new(Ok(categories)),
            product_calls: AtomicUsize::new(0),
            category_calls: AtomicUsize::new(0),
            panic_next: AtomicBool::new(false),
            gate,
        }
    }

    pub fn set_products(&self, products: Result<Vec<RawProduct>, CatalogError>) {
        *self.products.lock() = products;
    }

    pub fn set_categories(&self, categories: Result<Vec<Category>, CatalogError>) {
        *self.categories.lock() = categories;
    }

    /// The next product fetch panics instead of answering.
    pub fn panic_on_next_fetch(&self) {
        self.panic_next.store(true, Ordering::SeqCst);
    }

    pub fn product_calls(&self) -> usize {
        self.product_calls.load(Ordering::SeqCst)
    }

    pub fn category_calls(&self) -> usize {
        self.category_calls.load(Ordering::SeqCst)
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub async fn wait_for_product_calls(&self, expected: usize) {
        while self.product_calls() < expected {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl CatalogSource for ScriptedSource {
    async fn fetch_products(&self) -> Result<Vec<RawProduct>, CatalogError> {
        self.product_calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_next.swap(false, Ordering::SeqCst) {
            panic!("product decoder blew up");
        }
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        self.products.lock().clone()
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>, CatalogError> {
        self.category_calls.fetch_add(1, Ordering::SeqCst);
        self.categories.lock().clone()
    }
}

pub fn store_for(source: &Arc<ScriptedSource>) -> CatalogStore {
    CatalogStore::new(source.clone(), DerivationPolicy::default())
}

pub fn product(id: &str, name: &str, brand: &str, price: f64, sale: &str) -> RawProduct {
    RawProduct {
        id: ProductId::new(id),
        name: name.to_string(),
        brand: brand.to_string(),
        description: String::new(),
        selling_price: price,
        sale_percentage: Some(sale.to_string()),
        images: vec![format!("https://cdn.example.com/{id}.jpg")],
        reviews: vec![],
        categories: vec![],
        stock: Some(40),
    }
}

pub fn in_categories(mut product: RawProduct, ids: &[&str]) -> RawProduct {
    product.categories = ids
        .iter()
        .map(|id| CategoryRef::Id(CategoryId::new(*id)))
        .collect();
    product
}

pub fn with_reviews(mut product: RawProduct, scores: &[f64]) -> RawProduct {
    product.reviews = scores
        .iter()
        .map(|&rating| Review {
            rating,
            comment: None,
            author: None,
        })
        .collect();
    product
}

pub fn category(id: &str, name: &str) -> Category {
    Category {
        id: CategoryId::new(id),
        name: name.to_string(),
    }
}

/// Products A (100000, 20% off) and B (50000, no sale).
pub fn sale_scenario() -> (Vec<RawProduct>, Vec<Category>) {
    (
        vec![
            in_categories(product("A", "Cleanser Foam", "Glowlab", 100_000.0, "20"), &["face"]),
            in_categories(product("B", "Moisturizer", "CleanCo", 50_000.0, "0"), &["face", "body"]),
        ],
        vec![category("face", "Face"), category("body", "Body")],
    )
}

pub fn ids(products: &[Arc<skincare_catalog::Product>]) -> Vec<String> {
    products.iter().map(|p| p.id().to_string()).collect()
}
