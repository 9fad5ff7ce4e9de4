use crate::derivation::{
    DerivationPolicy, apply_discount, average_rating, effective_sale_percentage, stock_status,
};
use crate::model::{Category, CategoryId, Product, ProductId, RawProduct};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Immutable catalog held in memory after a successful fetch.
///
/// Derived fields, the sale view, the lookup indices and the lowercased
/// search haystacks are all built once here so reads never allocate per item.
#[derive(Debug, Default)]
pub struct CatalogSnapshot {
    products: Vec<Arc<Product>>,
    categories: Vec<Arc<Category>>,
    sale_products: Vec<Arc<Product>>,
    by_id: HashMap<ProductId, usize>,
    by_category: HashMap<CategoryId, Vec<usize>>,
    category_positions: HashMap<CategoryId, usize>,
    haystacks: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: CategoryId,
    pub name: String,
    pub products: usize,
}

impl CatalogSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn build(
        raw_products: Vec<RawProduct>,
        categories: Vec<Category>,
        policy: &DerivationPolicy,
    ) -> Self {
        let categories: Vec<Arc<Category>> = categories.into_iter().map(Arc::new).collect();
        let category_positions: HashMap<CategoryId, usize> = categories
            .iter()
            .enumerate()
            .map(|(position, category)| (category.id.clone(), position))
            .collect();

        let mut products = Vec::with_capacity(raw_products.len());
        let mut sale_products = Vec::new();
        let mut by_id = HashMap::with_capacity(raw_products.len());
        let mut by_category: HashMap<CategoryId, Vec<usize>> = HashMap::new();
        let mut haystacks = Vec::with_capacity(raw_products.len());

        for raw in raw_products {
            let index = products.len();
            let percentage = effective_sale_percentage(&raw);
            let product = Arc::new(Product {
                discounted_price: apply_discount(
                    raw.selling_price,
                    percentage,
                    policy.minor_unit_digits,
                ),
                average_rating: average_rating(&raw),
                stock_status: stock_status(&raw, &policy.stock),
                on_sale: percentage > 0.0,
                raw,
            });

            haystacks.push(Self::haystack(&product, &categories, &category_positions));

            // First occurrence wins if upstream repeats an id.
            by_id.entry(product.raw.id.clone()).or_insert(index);
            for membership in &product.raw.categories {
                let members = by_category.entry(membership.id().clone()).or_default();
                if members.last() != Some(&index) {
                    members.push(index);
                }
            }

            if product.on_sale {
                sale_products.push(product.clone());
            }
            products.push(product);
        }

        Self {
            products,
            categories,
            sale_products,
            by_id,
            by_category,
            category_positions,
            haystacks,
        }
    }

    fn haystack(
        product: &Product,
        categories: &[Arc<Category>],
        positions: &HashMap<CategoryId, usize>,
    ) -> Vec<String> {
        let raw = &product.raw;
        let mut fields = vec![
            raw.name.to_lowercase(),
            raw.description.to_lowercase(),
            raw.brand.to_lowercase(),
        ];
        for membership in &raw.categories {
            let name = positions
                .get(membership.id())
                .map(|&position| categories[position].name.as_str())
                .or_else(|| membership.embedded_name());
            if let Some(name) = name {
                fields.push(name.to_lowercase());
            }
        }
        fields
    }

    pub fn products(&self) -> &[Arc<Product>] {
        &self.products
    }

    pub fn categories(&self) -> &[Arc<Category>] {
        &self.categories
    }

    pub fn sale_products(&self) -> &[Arc<Product>] {
        &self.sale_products
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty() && self.categories.is_empty()
    }

    /// Case-insensitive substring search over name, description, brand and
    /// category names. A blank query returns every product in catalog order.
    pub fn search(&self, query: &str) -> Vec<Arc<Product>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.products.clone();
        }

        self.products
            .iter()
            .zip(&self.haystacks)
            .filter(|(_, fields)| fields.iter().any(|field| field.contains(&needle)))
            .map(|(product, _)| product.clone())
            .collect()
    }

    pub fn find_by_id(&self, id: &ProductId) -> Option<Arc<Product>> {
        self.by_id
            .get(id)
            .map(|&index| self.products[index].clone())
    }

    pub fn category(&self, id: &CategoryId) -> Option<Arc<Category>> {
        self.category_positions
            .get(id)
            .map(|&position| self.categories[position].clone())
    }

    /// Products in a known category, in catalog order. `None` when the
    /// category is not part of the catalog.
    pub fn by_category(&self, id: &CategoryId) -> Option<Vec<Arc<Product>>> {
        if !self.category_positions.contains_key(id) {
            return None;
        }
        let members: Vec<Arc<Product>> = self
            .by_category
            .get(id)
            .map(|indices| {
                indices
                    .iter()
                    .map(|&index| self.products[index].clone())
                    .collect()
            })
            .unwrap_or_default();
        Some(members)
    }

    pub fn category_counts(&self) -> Vec<CategoryCount> {
        self.categories
            .iter()
            .map(|category| CategoryCount {
                category: category.id.clone(),
                name: category.name.clone(),
                products: self
                    .by_category
                    .get(&category.id)
                    .map(Vec::len)
                    .unwrap_or(0),
            })
            .collect()
    }
}
